//! Strided iteration over a tensor within a window.
//!
//! A [`TensorIterator`] tracks a byte offset into a tensor's allocation. It
//! does not borrow the tensor: kernels build one iterator per operand from
//! the operand's [`TensorInfo`], drive them in lock-step with
//! [`execute_window_loop`], and use the offsets with
//! [`crate::tensor::Tensor::load`] / [`crate::tensor::Tensor::store`].
//!
//! # Example
//!
//! ```rust
//! use tilewise_core::dimensions::{Coordinates, Steps, TensorShape};
//! use tilewise_core::helpers::calculate_max_window_for_shape;
//! use tilewise_core::iterator::{execute_window_loop, TensorIterator};
//! use tilewise_core::tensor_info::TensorInfo;
//! use tilewise_core::types::DataType;
//!
//! let info = TensorInfo::new(TensorShape::from([4, 2]), DataType::U8);
//! let window = calculate_max_window_for_shape(info.tensor_shape(), &Steps::new(&[2]));
//! let mut visited = Vec::new();
//! execute_window_loop(&window, &mut [TensorIterator::new(&info, &window)], |id: &Coordinates, it: &[TensorIterator]| {
//!     visited.push((id.x(), id.y(), it[0].offset()));
//! });
//! assert_eq!(visited, vec![(0, 0, 0), (2, 0, 2), (0, 1, 4), (2, 1, 6)]);
//! ```

use crate::dimensions::{Coordinates, MAX_DIMS};
use crate::tensor_info::TensorInfo;
use crate::window::Window;

#[derive(Debug, Clone, Copy, Default)]
struct IterDimension {
    /// Bytes advanced per window step.
    stride: isize,
    /// Offset of the current position at this axis, lower axes reset.
    dim_start: isize,
}

#[derive(Debug, Clone)]
pub struct TensorIterator {
    dims: [IterDimension; MAX_DIMS],
}

impl TensorIterator {
    /// Iterator positioned at the first element of `window` in a tensor
    /// laid out as `info`. Broadcast (step 0) axes never advance.
    pub fn new(info: &TensorInfo, window: &Window) -> Self {
        let strides = info.strides_in_bytes();
        let mut start = info.offset_first_element_in_bytes() as isize;
        let mut dims = [IterDimension::default(); MAX_DIMS];
        for (n, dim) in dims.iter_mut().enumerate() {
            dim.stride = window[n].step() as isize * strides[n] as isize;
            start += window[n].start() as isize * strides[n] as isize;
        }
        for dim in dims.iter_mut() {
            dim.dim_start = start;
        }
        Self { dims }
    }

    /// Byte offset of the current position from the allocation start.
    pub fn offset(&self) -> isize {
        self.dims[0].dim_start
    }

    /// [`TensorIterator::offset`] plus a relative byte offset, for
    /// neighbourhood reads.
    pub fn offset_by(&self, delta: isize) -> isize {
        self.offset() + delta
    }

    /// Advance `dim` by one step and move every lower axis to it.
    pub fn increment(&mut self, dim: usize) {
        debug_assert!(dim < MAX_DIMS);
        self.dims[dim].dim_start += self.dims[dim].stride;
        let start = self.dims[dim].dim_start;
        for lower in &mut self.dims[..dim] {
            lower.dim_start = start;
        }
    }

    /// Move `dim` (and the axes below it) back to where the next higher
    /// axis currently is.
    pub fn reset(&mut self, dim: usize) {
        debug_assert!(dim + 1 < MAX_DIMS);
        let start = self.dims[dim + 1].dim_start;
        for d in &mut self.dims[..=dim] {
            d.dim_start = start;
        }
    }
}

/// Visit every position of `window`, innermost axis fastest.
///
/// `f` receives the absolute coordinates of the position and the iterators,
/// which are then all advanced together. Partial vectors at the end of an
/// axis are the closure's problem.
///
/// # Panics
///
/// If any axis of `window` has a zero step.
pub fn execute_window_loop<F>(window: &Window, iterators: &mut [TensorIterator], mut f: F)
where
    F: FnMut(&Coordinates, &[TensorIterator]),
{
    window.validate();
    for d in 0..MAX_DIMS {
        assert!(window[d].step() != 0, "axis {d} has a zero step and cannot be iterated");
    }
    let mut id = Coordinates::new(&[0; MAX_DIMS]);
    unroll(MAX_DIMS, window, &mut id, iterators, &mut f);
}

fn unroll<F>(dim: usize, window: &Window, id: &mut Coordinates, iterators: &mut [TensorIterator], f: &mut F)
where
    F: FnMut(&Coordinates, &[TensorIterator]),
{
    if dim == 0 {
        f(id, iterators);
        return;
    }
    let axis = dim - 1;
    let d = window[axis];
    let mut v = d.start();
    while v < d.end() {
        id.set(axis, v);
        unroll(axis, window, id, iterators, f);
        v += d.step();
        for it in iterators.iter_mut() {
            it.increment(axis);
        }
    }
}

//! Iteration space of a kernel.
//!
//! A [`Window`] holds one [`Dimension`] (`start`, `end`, `step`) per axis,
//! axis 0 innermost. Kernels compute a maximal window at configure time,
//! negotiate it against their access patterns, store it, and hand the
//! scheduler a copy that it cuts into partitions with
//! [`Window::split_window`]. GPU backends walk it slice by slice with
//! [`Window::first_slice_window_2d`] and [`Window::slide_window_slice_2d`].
//!
//! Derived windows are always new values; nothing here mutates a window
//! behind the caller's back.
//!
//! # Example
//!
//! ```rust
//! use tilewise_core::window::{Dimension, Window};
//!
//! let mut window = Window::new();
//! window.set(0, Dimension::new(0, 16, 8));
//! window.set(1, Dimension::new(0, 4, 1));
//!
//! let top = window.split_window(1, 0, 2);
//! assert_eq!(top.y(), Dimension::new(0, 2, 1));
//! ```

use std::fmt;
use std::ops::Index;

use crate::dimensions::{TensorShape, DIM_X, DIM_Y, DIM_Z, MAX_DIMS};
use crate::helpers::ceil_to_multiple;

/// Half-open range `[start, end)` walked with `step`.
///
/// A step of 0 marks a broadcast axis: iterators built from it never move
/// along that axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimension {
    start: i32,
    end: i32,
    step: i32,
}

impl Dimension {
    pub const fn new(start: i32, end: i32, step: i32) -> Self {
        Self { start, end, step }
    }

    pub const fn start(&self) -> i32 {
        self.start
    }

    pub const fn end(&self) -> i32 {
        self.end
    }

    pub const fn step(&self) -> i32 {
        self.step
    }

    pub fn set_end(&mut self, end: i32) {
        self.end = end;
    }

    /// Number of elements covered (not iterations).
    pub const fn extent(&self) -> i32 {
        self.end - self.start
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) step {}", self.start, self.end, self.step)
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Window {
    dims: [Dimension; MAX_DIMS],
}

impl Window {
    /// Every axis set to `[0, 1)` step 1.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, dim: usize, dimension: Dimension) {
        debug_assert!(dim < MAX_DIMS, "axis {dim} out of range");
        self.dims[dim] = dimension;
    }

    pub fn x(&self) -> Dimension {
        self.dims[DIM_X]
    }

    pub fn y(&self) -> Dimension {
        self.dims[DIM_Y]
    }

    pub fn z(&self) -> Dimension {
        self.dims[DIM_Z]
    }

    pub fn dims(&self) -> &[Dimension; MAX_DIMS] {
        &self.dims
    }

    pub fn set_dimension_step(&mut self, dim: usize, step: i32) {
        debug_assert!(dim < MAX_DIMS, "axis {dim} out of range");
        self.dims[dim].step = step;
    }

    /// Move `dim` by `delta` elements, keeping its extent.
    pub fn shift(&mut self, dim: usize, delta: i32) {
        debug_assert!(dim < MAX_DIMS, "axis {dim} out of range");
        let d = &mut self.dims[dim];
        *d = Dimension::new(d.start + delta, d.end + delta, d.step);
    }

    /// Add `delta` to the start (`at_start`) or the end of `dim`.
    pub fn adjust(&mut self, dim: usize, delta: i32, at_start: bool) {
        debug_assert!(dim < MAX_DIMS, "axis {dim} out of range");
        let d = &mut self.dims[dim];
        if at_start {
            d.start += delta;
        } else {
            d.end += delta;
        }
    }

    /// Map `dim` through a sub-sampling ratio: start, step and extent are
    /// scaled, then the end is rounded up to a whole number of steps.
    pub fn scale(&mut self, dim: usize, factor: f32) {
        debug_assert!(dim < MAX_DIMS, "axis {dim} out of range");
        let d = self.dims[dim];
        let scaled_step = ((d.step as f32 * factor) as i32).max(1);
        let scaled_start = (d.start as f32 * factor) as i32;
        let scaled_extent = (d.extent() as f32 * factor) as i32;
        let scaled_end = scaled_start + ceil_to_multiple(scaled_extent, scaled_step);
        self.dims[dim] = Dimension::new(scaled_start, scaled_end, scaled_step);
    }

    /// Use `[0, shape[d])` step 1 for every axis `d >= first` the shape has.
    pub fn use_tensor_dimensions(&mut self, shape: &TensorShape, first: usize) {
        for d in first..shape.num_dimensions() {
            self.set(d, Dimension::new(0, shape[d].max(1) as i32, 1));
        }
    }

    /// Turn every axis where `shape` has extent <= 1 into a broadcast axis.
    pub fn broadcast_if_dimension_le_one(&self, shape: &TensorShape) -> Window {
        let mut out = *self;
        for d in 0..MAX_DIMS {
            if shape[d] <= 1 {
                out.set(d, Dimension::new(0, 0, 0));
            }
        }
        out
    }

    /// Iterations along `dim`; broadcast axes report 0.
    pub fn num_iterations(&self, dim: usize) -> usize {
        let d = self.dims[dim];
        if d.step == 0 {
            return 0;
        }
        (d.extent() / d.step).max(0) as usize
    }

    pub fn num_iterations_total(&self) -> usize {
        (0..MAX_DIMS)
            .filter(|&d| self.dims[d].step != 0)
            .map(|d| self.num_iterations(d))
            .product()
    }

    /// True when some iterated axis has no iterations.
    pub fn is_empty(&self) -> bool {
        (0..MAX_DIMS).any(|d| self.dims[d].step != 0 && self.num_iterations(d) == 0)
    }

    /// Iteration counts as a shape.
    pub fn shape(&self) -> TensorShape {
        let mut shape = TensorShape::default();
        for d in 0..MAX_DIMS {
            shape.set_uncorrected(d, self.num_iterations(d));
        }
        TensorShape::new(shape.as_slice())
    }

    /// Panics (debug) on axes whose end precedes the start or whose extent
    /// is not a whole number of steps.
    pub fn validate(&self) {
        for (n, d) in self.dims.iter().enumerate() {
            debug_assert!(d.end >= d.start, "axis {n}: end {} < start {}", d.end, d.start);
            debug_assert!(
                d.step == 0 || d.extent() % d.step == 0,
                "axis {n}: extent {} not a multiple of step {}",
                d.extent(),
                d.step
            );
        }
    }

    /// Partition `id` of `total` contiguous, non-overlapping partitions of
    /// `dim`. The first `num_iterations % total` partitions take one extra
    /// iteration; trailing partitions may be empty.
    pub fn split_window(&self, dim: usize, id: usize, total: usize) -> Window {
        debug_assert!(total > 0 && id < total, "partition {id} of {total}");
        let mut out = *self;
        let d = self.dims[dim];
        let num_it = self.num_iterations(dim);
        let rem = num_it % total;
        let mut work = num_it / total;
        let mut it_start = work * id;
        if id < rem {
            work += 1;
            it_start += id;
        } else {
            it_start += rem;
        }
        let start = d.start + it_start as i32 * d.step;
        let end = d.end.min(start + work as i32 * d.step);
        out.set(dim, Dimension::new(start, end, d.step));
        out
    }

    /// Keep axes `< N` whole and pin every higher axis to its first position.
    pub fn first_slice_window<const N: usize>(&self) -> Window {
        let mut slice = Window::new();
        slice.dims[..N].copy_from_slice(&self.dims[..N]);
        for n in N..MAX_DIMS {
            let start = self.dims[n].start;
            slice.dims[n] = Dimension::new(start, start + 1, 1);
        }
        slice
    }

    /// Advance `slice` to the next position over the axes `>= N`, innermost
    /// first, resetting the lower ones. Returns false after the last slice.
    pub fn slide_window_slice<const N: usize>(&self, slice: &mut Window) -> bool {
        for n in N..MAX_DIMS {
            let next = slice.dims[n].start + self.dims[n].step.max(1);
            if next < self.dims[n].end {
                slice.dims[n] = Dimension::new(next, next + 1, 1);
                for lower in N..n {
                    let start = self.dims[lower].start;
                    slice.dims[lower] = Dimension::new(start, start + 1, 1);
                }
                return true;
            }
        }
        false
    }

    pub fn first_slice_window_1d(&self) -> Window {
        self.first_slice_window::<1>()
    }

    pub fn first_slice_window_2d(&self) -> Window {
        self.first_slice_window::<2>()
    }

    pub fn first_slice_window_3d(&self) -> Window {
        self.first_slice_window::<3>()
    }

    pub fn first_slice_window_4d(&self) -> Window {
        self.first_slice_window::<4>()
    }

    pub fn slide_window_slice_1d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<1>(slice)
    }

    pub fn slide_window_slice_2d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<2>(slice)
    }

    pub fn slide_window_slice_3d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<3>(slice)
    }

    pub fn slide_window_slice_4d(&self, slice: &mut Window) -> bool {
        self.slide_window_slice::<4>(slice)
    }

    /// Merge axes `first..last` into `first` when every merged axis above
    /// `first` starts at 0, has step <= 1 and spans the whole of
    /// `full_window`. Returns the result and whether it collapsed.
    pub fn collapse_if_possible(&self, full_window: &Window, first: usize, last: usize) -> (Window, bool) {
        let mut collapsed = *self;
        let mut collapsed_end = self.dims[first].end;
        let mut collapsable = true;
        for d in (first + 1)..last {
            let dim = self.dims[d];
            let full = full_window.dims[d];
            collapsable = dim.start == 0 && full.start == 0 && dim.step <= 1 && dim.end == full.end;
            if !collapsable {
                break;
            }
            collapsed_end *= dim.end;
        }
        if collapsable {
            collapsed.dims[first].set_end(collapsed_end);
            for d in (first + 1)..last {
                collapsed.set(d, Dimension::default());
            }
        }
        (collapsed, collapsable)
    }

    /// [`Window::collapse_if_possible`] over every axis from `first` up.
    pub fn collapse(&self, full_window: &Window, first: usize) -> Window {
        self.collapse_if_possible(full_window, first, MAX_DIMS).0
    }

    /// Drop the `n` innermost axes, shifting the rest down.
    pub fn shift_dimensions(&self, n: usize) -> Window {
        let mut shifted = Window::new();
        for d in 0..MAX_DIMS.saturating_sub(n) {
            shifted.set(d, self.dims[d + n]);
        }
        shifted
    }
}

impl Index<usize> for Window {
    type Output = Dimension;

    fn index(&self, dim: usize) -> &Dimension {
        &self.dims[dim]
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.dims.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_2d(x: Dimension, y: Dimension) -> Window {
        let mut w = Window::new();
        w.set(DIM_X, x);
        w.set(DIM_Y, y);
        w
    }

    #[test]
    fn test_default_dimension() {
        let w = Window::new();
        for d in w.dims() {
            assert_eq!(*d, Dimension::new(0, 1, 1));
        }
        assert_eq!(w.num_iterations_total(), 1);
    }

    #[test]
    fn test_shift_and_adjust() {
        let mut w = window_2d(Dimension::new(0, 16, 8), Dimension::new(0, 4, 1));
        w.shift(DIM_X, 8);
        assert_eq!(w.x(), Dimension::new(8, 24, 8));
        w.adjust(DIM_Y, 1, true);
        w.adjust(DIM_Y, -1, false);
        assert_eq!(w.y(), Dimension::new(1, 3, 1));
        w.set_dimension_step(DIM_Y, 2);
        assert_eq!(w.y().step(), 2);
    }

    #[test]
    fn test_scale_rounds_end_to_step() {
        let mut w = window_2d(Dimension::new(0, 16, 16), Dimension::default());
        w.scale(DIM_X, 0.5);
        assert_eq!(w.x(), Dimension::new(0, 8, 8));

        let mut w = window_2d(Dimension::new(2, 12, 2), Dimension::default());
        w.scale(DIM_X, 1.5);
        assert_eq!(w.x(), Dimension::new(3, 18, 3));
    }

    #[test]
    fn test_split_window_balances() {
        let w = window_2d(Dimension::new(0, 16, 1), Dimension::new(0, 10, 1));
        let parts: Vec<_> = (0..3).map(|id| w.split_window(DIM_Y, id, 3).y()).collect();
        assert_eq!(parts[0], Dimension::new(0, 4, 1));
        assert_eq!(parts[1], Dimension::new(4, 7, 1));
        assert_eq!(parts[2], Dimension::new(7, 10, 1));
    }

    #[test]
    fn test_split_window_more_threads_than_work() {
        let w = window_2d(Dimension::new(0, 24, 8), Dimension::default());
        let parts: Vec<_> = (0..4).map(|id| w.split_window(DIM_X, id, 4).x()).collect();
        assert_eq!(parts[0], Dimension::new(0, 8, 8));
        assert_eq!(parts[2], Dimension::new(16, 24, 8));
        assert_eq!(parts[3].extent(), 0);
    }

    #[test]
    fn test_slices_visit_higher_axes_innermost_first() {
        let mut w = window_2d(Dimension::new(0, 4, 1), Dimension::new(0, 4, 1));
        w.set(DIM_Z, Dimension::new(0, 2, 1));
        w.set(3, Dimension::new(5, 7, 1));

        let mut slice = w.first_slice_window_2d();
        assert_eq!(slice.x(), w.x());
        assert_eq!(slice.y(), w.y());
        let mut visited = vec![(slice.z().start(), slice[3].start())];
        while w.slide_window_slice_2d(&mut slice) {
            visited.push((slice.z().start(), slice[3].start()));
        }
        assert_eq!(visited, vec![(0, 5), (1, 5), (0, 6), (1, 6)]);
    }

    #[test]
    fn test_single_slice() {
        let w = window_2d(Dimension::new(0, 4, 1), Dimension::new(0, 4, 1));
        let mut slice = w.first_slice_window_2d();
        assert!(!w.slide_window_slice_2d(&mut slice));
        let mut slice = w.first_slice_window_1d();
        assert!(w.slide_window_slice_1d(&mut slice));
        assert_eq!(slice.y(), Dimension::new(1, 2, 1));
    }

    #[test]
    fn test_collapse_if_possible() {
        let mut full = window_2d(Dimension::new(0, 8, 1), Dimension::new(0, 4, 1));
        full.set(DIM_Z, Dimension::new(0, 3, 1));
        let (collapsed, did) = full.collapse_if_possible(&full, DIM_Y, MAX_DIMS);
        assert!(did);
        assert_eq!(collapsed.y(), Dimension::new(0, 12, 1));
        assert_eq!(collapsed.z(), Dimension::default());

        let mut partial = full;
        partial.set(DIM_Z, Dimension::new(1, 3, 1));
        let (same, did) = partial.collapse_if_possible(&full, DIM_Y, MAX_DIMS);
        assert!(!did);
        assert_eq!(same, partial);
    }

    #[test]
    fn test_shift_dimensions() {
        let mut w = Window::new();
        w.set(DIM_Z, Dimension::new(0, 5, 1));
        let shifted = w.shift_dimensions(2);
        assert_eq!(shifted.x(), Dimension::new(0, 5, 1));
        assert_eq!(shifted[5], Dimension::default());
    }

    #[test]
    fn test_broadcast_and_shape() {
        let w = window_2d(Dimension::new(0, 8, 4), Dimension::new(0, 3, 1));
        assert_eq!(w.shape(), TensorShape::from([2, 3]));
        assert_eq!(w.num_iterations_total(), 6);

        let b = w.broadcast_if_dimension_le_one(&TensorShape::from([8, 1]));
        assert_eq!(b.x(), w.x());
        assert_eq!(b.y(), Dimension::new(0, 0, 0));
        assert_eq!(b.num_iterations(DIM_Y), 0);
        assert_eq!(b.num_iterations_total(), 2);
    }

    #[test]
    fn test_is_empty() {
        let w = window_2d(Dimension::new(3, 3, 1), Dimension::new(0, 3, 1));
        assert!(w.is_empty());
        assert!(!Window::new().is_empty());
    }

    #[test]
    fn test_use_tensor_dimensions() {
        let mut w = Window::new();
        w.use_tensor_dimensions(&TensorShape::from([7, 5, 2]), DIM_Y);
        assert_eq!(w.x(), Dimension::default());
        assert_eq!(w.y(), Dimension::new(0, 5, 1));
        assert_eq!(w.z(), Dimension::new(0, 2, 1));
    }
}

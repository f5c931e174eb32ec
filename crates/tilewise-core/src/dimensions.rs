//! Fixed-capacity per-axis vectors.
//!
//! Every tensor and window in tilewise has at most [`MAX_DIMS`] axes; axis 0
//! is the innermost (fastest-varying in memory). [`Dimensions`] stores the
//! values inline together with the number of axes in use. The aliases and
//! newtypes in this module give it meaning:
//!
//! - [`Coordinates`]: signed positions (anchors, iteration ids)
//! - [`Strides`]: byte strides
//! - [`Steps`]: per-axis iteration step, unspecified axes default to 1
//! - [`TensorShape`]: extents, unspecified axes default to 1 and trailing
//!   unit axes are not counted

use std::fmt;
use std::ops::{Deref, Index, IndexMut};

/// Maximum number of axes of any tensor or window.
pub const MAX_DIMS: usize = 6;

/// Axis indices with a conventional meaning.
pub const DIM_X: usize = 0;
pub const DIM_Y: usize = 1;
pub const DIM_Z: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions<T> {
    values: [T; MAX_DIMS],
    num_dimensions: usize,
}

impl<T: Copy + Default> Default for Dimensions<T> {
    fn default() -> Self {
        Self {
            values: [T::default(); MAX_DIMS],
            num_dimensions: 0,
        }
    }
}

impl<T: Copy + Default> Dimensions<T> {
    /// Build from leading values; panics on more than [`MAX_DIMS`] values.
    pub fn new(values: &[T]) -> Self {
        Self::with_fill(values, T::default())
    }

    /// Build from leading values, setting the unused axes to `fill`.
    pub fn with_fill(values: &[T], fill: T) -> Self {
        assert!(
            values.len() <= MAX_DIMS,
            "{} dimensions exceed the maximum of {MAX_DIMS}",
            values.len()
        );
        let mut out = [fill; MAX_DIMS];
        out[..values.len()].copy_from_slice(values);
        Self {
            values: out,
            num_dimensions: values.len(),
        }
    }

    /// Set `dim`, growing the number of axes in use when needed.
    pub fn set(&mut self, dim: usize, value: T) {
        debug_assert!(dim < MAX_DIMS, "axis {dim} out of range");
        self.values[dim] = value;
        self.num_dimensions = self.num_dimensions.max(dim + 1);
    }

    pub fn get(&self, dim: usize) -> T {
        self.values[dim]
    }

    pub fn num_dimensions(&self) -> usize {
        self.num_dimensions
    }

    pub fn set_num_dimensions(&mut self, n: usize) {
        debug_assert!(n <= MAX_DIMS);
        self.num_dimensions = n;
    }

    pub fn x(&self) -> T {
        self.values[DIM_X]
    }

    pub fn y(&self) -> T {
        self.values[DIM_Y]
    }

    pub fn z(&self) -> T {
        self.values[DIM_Z]
    }

    /// Values of the axes in use.
    pub fn as_slice(&self) -> &[T] {
        &self.values[..self.num_dimensions]
    }

    /// All [`MAX_DIMS`] values, including unused axes.
    pub fn all(&self) -> &[T; MAX_DIMS] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.as_slice().iter().copied()
    }
}

impl<T> Index<usize> for Dimensions<T> {
    type Output = T;

    fn index(&self, dim: usize) -> &T {
        &self.values[dim]
    }
}

impl<T> IndexMut<usize> for Dimensions<T> {
    fn index_mut(&mut self, dim: usize) -> &mut T {
        &mut self.values[dim]
    }
}

impl<T: Copy + Default, const N: usize> From<[T; N]> for Dimensions<T> {
    fn from(values: [T; N]) -> Self {
        Self::new(&values)
    }
}

impl<T: fmt::Debug> fmt::Debug for Dimensions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.values[..self.num_dimensions]).finish()
    }
}

/// Signed per-axis positions.
pub type Coordinates = Dimensions<i32>;

/// Per-axis strides in bytes.
pub type Strides = Dimensions<usize>;

/// Per-axis iteration steps; axes not given default to 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Steps(Dimensions<i32>);

impl Steps {
    pub fn new(steps: &[i32]) -> Self {
        Self(Dimensions::with_fill(steps, 1))
    }

    pub fn set(&mut self, dim: usize, step: i32) {
        self.0.set(dim, step);
    }
}

impl Default for Steps {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Deref for Steps {
    type Target = Dimensions<i32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> From<[i32; N]> for Steps {
    fn from(steps: [i32; N]) -> Self {
        Self::new(&steps)
    }
}

/// Tensor extents. Axes beyond [`TensorShape::num_dimensions`] are 1, and
/// trailing unit axes are dropped from the count (a `[4, 1]` shape is 1-D)
/// but at least one axis is always counted once any is set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorShape(Dimensions<usize>);

impl TensorShape {
    pub fn new(extents: &[usize]) -> Self {
        let mut shape = Self(Dimensions::with_fill(extents, 1));
        shape.apply_dimension_correction();
        shape
    }

    /// Set one extent and re-derive the number of axes.
    pub fn set(&mut self, dim: usize, extent: usize) {
        self.0.set(dim, extent);
        self.apply_dimension_correction();
    }

    /// Set one extent keeping trailing unit axes counted.
    pub fn set_uncorrected(&mut self, dim: usize, extent: usize) {
        self.0.set(dim, extent);
    }

    fn apply_dimension_correction(&mut self) {
        let mut n = self.0.num_dimensions();
        while n > 1 && self.0.get(n - 1) == 1 {
            n -= 1;
        }
        self.0.set_num_dimensions(n);
    }

    /// Product of every extent.
    pub fn total_size(&self) -> usize {
        self.0.all().iter().product()
    }

    /// Product of the extents of axes `dim..`.
    pub fn total_size_upper(&self, dim: usize) -> usize {
        self.0.all()[dim..].iter().product()
    }

    /// Product of the extents of axes `..dim`.
    pub fn total_size_lower(&self, dim: usize) -> usize {
        self.0.all()[..dim].iter().product()
    }

    /// Merge `n` axes starting at `first` into one.
    pub fn collapse(&mut self, n: usize, first: usize) {
        assert!(first + n <= MAX_DIMS, "cannot collapse {n} axes from {first}");
        if n < 2 {
            return;
        }
        let merged: usize = self.0.all()[first..first + n].iter().product();
        let mut extents = *self.0.all();
        extents[first] = merged;
        extents.copy_within(first + n.., first + 1);
        for extent in extents.iter_mut().skip(MAX_DIMS - (n - 1)) {
            *extent = 1;
        }
        let num = self.0.num_dimensions().saturating_sub(n - 1).max(1);
        *self = Self::new(&extents[..num]);
    }

    /// Drop axis `dim`, shifting the higher axes down.
    pub fn remove_dimension(&mut self, dim: usize) {
        assert!(dim < MAX_DIMS);
        let mut extents = *self.0.all();
        extents.copy_within(dim + 1.., dim);
        extents[MAX_DIMS - 1] = 1;
        let num = self.0.num_dimensions().saturating_sub(1);
        *self = Self::new(&extents[..num]);
    }
}

impl Default for TensorShape {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Deref for TensorShape {
    type Target = Dimensions<usize>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> From<[usize; N]> for TensorShape {
    fn from(extents: [usize; N]) -> Self {
        Self::new(&extents)
    }
}

impl fmt::Debug for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorShape{:?}", self.0)
    }
}

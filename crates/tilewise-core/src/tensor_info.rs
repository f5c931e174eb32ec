//! Tensor metadata: shape, element type, padding and the strides derived
//! from them.
//!
//! Byte layout of a tensor with padding `p` and element size `es`:
//!
//! ```text
//! stride[0] = es
//! stride[1] = (p.left + shape[0] + p.right) * stride[0]
//! stride[2] = (p.top + shape[1] + p.bottom) * stride[1]
//! stride[d] = shape[d - 1] * stride[d - 1]            (d >= 3)
//! offset of element (0, 0, ..) = p.left * stride[0] + p.top * stride[1]
//! ```
//!
//! Padding can only grow, and only while the info is resizable. Allocating
//! a [`crate::tensor::Tensor`] freezes it.

use tracing::trace;

use crate::dimensions::{Coordinates, Strides, TensorShape, MAX_DIMS};
use crate::types::{DataType, PaddingSize, ValidRegion};

/// Minimum padding on every side added by [`TensorInfo::auto_padding`].
pub const AUTO_PADDING: u32 = 4;
/// Extra right padding added by [`TensorInfo::auto_padding`] for kernels
/// reading whole vectors past the last element.
pub const AUTO_PADDING_EXTRA_X: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    tensor_shape: TensorShape,
    data_type: DataType,
    padding: PaddingSize,
    strides_in_bytes: Strides,
    offset_first_element_in_bytes: usize,
    total_size: usize,
    is_resizable: bool,
    valid_region: ValidRegion,
}

impl Default for TensorInfo {
    /// An uninitialised (empty) info, see [`TensorInfo::auto_init_if_empty`].
    fn default() -> Self {
        Self {
            tensor_shape: TensorShape::default(),
            data_type: DataType::U8,
            padding: PaddingSize::empty(),
            strides_in_bytes: Strides::default(),
            offset_first_element_in_bytes: 0,
            total_size: 0,
            is_resizable: true,
            valid_region: ValidRegion::default(),
        }
    }
}

impl TensorInfo {
    /// Unpadded, resizable info covering the whole shape.
    pub fn new(tensor_shape: TensorShape, data_type: DataType) -> Self {
        let mut info = Self::default();
        info.init(tensor_shape, data_type);
        info
    }

    /// Same as [`TensorInfo::new`] followed by [`TensorInfo::auto_padding`].
    pub fn with_auto_padding(tensor_shape: TensorShape, data_type: DataType) -> Self {
        let mut info = Self::new(tensor_shape, data_type);
        info.auto_padding();
        info
    }

    fn init(&mut self, tensor_shape: TensorShape, data_type: DataType) {
        self.tensor_shape = tensor_shape;
        self.data_type = data_type;
        self.padding = PaddingSize::empty();
        self.valid_region = ValidRegion::from_shape(tensor_shape);
        self.update_strides_and_offset();
    }

    /// Initialise from `shape`/`data_type` if nothing was set yet. Returns
    /// whether it did.
    pub fn auto_init_if_empty(&mut self, tensor_shape: TensorShape, data_type: DataType) -> bool {
        if self.is_empty() {
            self.init(tensor_shape, data_type);
            true
        } else {
            false
        }
    }

    fn update_strides_and_offset(&mut self) {
        let es = self.data_type.element_size();
        let shape = &self.tensor_shape;
        let pad = &self.padding;

        let mut strides = [0usize; MAX_DIMS + 1];
        strides[0] = es;
        strides[1] = (pad.left as usize + shape[0] + pad.right as usize) * strides[0];
        strides[2] = (pad.top as usize + shape[1] + pad.bottom as usize) * strides[1];
        for d in 3..=MAX_DIMS {
            strides[d] = shape[d - 1] * strides[d - 1];
        }

        let n = shape.num_dimensions();
        self.strides_in_bytes = Strides::new(&strides[..MAX_DIMS]);
        self.strides_in_bytes.set_num_dimensions(n.max(1));
        self.offset_first_element_in_bytes = pad.left as usize * strides[0] + pad.top as usize * strides[1];
        self.total_size = if n == 0 { 0 } else { strides[n.max(2)] };
    }

    pub fn tensor_shape(&self) -> &TensorShape {
        &self.tensor_shape
    }

    pub fn num_dimensions(&self) -> usize {
        self.tensor_shape.num_dimensions()
    }

    pub fn dimension(&self, dim: usize) -> usize {
        self.tensor_shape[dim]
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn element_size(&self) -> usize {
        self.data_type.element_size()
    }

    pub fn padding(&self) -> PaddingSize {
        self.padding
    }

    pub fn has_padding(&self) -> bool {
        !self.padding.is_empty()
    }

    pub fn strides_in_bytes(&self) -> &Strides {
        &self.strides_in_bytes
    }

    pub fn offset_first_element_in_bytes(&self) -> usize {
        self.offset_first_element_in_bytes
    }

    /// Byte offset of `coords` relative to the start of the allocation.
    /// Negative coordinates address padding.
    pub fn offset_element_in_bytes(&self, coords: &Coordinates) -> isize {
        let mut offset = self.offset_first_element_in_bytes as isize;
        for d in 0..MAX_DIMS {
            offset += coords[d] as isize * self.strides_in_bytes[d] as isize;
        }
        offset
    }

    /// Bytes needed for the allocation, padding included.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    pub fn is_resizable(&self) -> bool {
        self.is_resizable
    }

    pub fn set_is_resizable(&mut self, is_resizable: bool) {
        self.is_resizable = is_resizable;
    }

    pub fn valid_region(&self) -> ValidRegion {
        self.valid_region
    }

    pub fn set_valid_region(&mut self, valid_region: ValidRegion) {
        self.valid_region = valid_region;
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
        self.update_strides_and_offset();
    }

    /// Replace the shape, keeping the padding. The valid region is reset to
    /// the whole new shape.
    pub fn set_tensor_shape(&mut self, tensor_shape: TensorShape) {
        self.tensor_shape = tensor_shape;
        self.valid_region = ValidRegion::from_shape(tensor_shape);
        self.update_strides_and_offset();
    }

    /// Grow each edge of the padding to at least `padding`'s. Returns
    /// whether any edge grew.
    ///
    /// # Panics
    ///
    /// If the info is no longer resizable.
    pub fn extend_padding(&mut self, padding: &PaddingSize) -> bool {
        assert!(self.is_resizable, "cannot extend the padding of a fixed tensor");
        let grown = self.padding.max(padding);
        if grown == self.padding {
            return false;
        }
        trace!(from = ?self.padding, to = ?grown, "extend_padding");
        self.padding = grown;
        self.update_strides_and_offset();
        true
    }

    /// Conservative padding for kernels that did not negotiate any.
    pub fn auto_padding(&mut self) -> bool {
        let n = self.num_dimensions();
        let pad_x = if n < 1 { 0 } else { AUTO_PADDING };
        let extra_x = if n < 1 { 0 } else { AUTO_PADDING_EXTRA_X };
        let pad_y = if n < 2 { 0 } else { AUTO_PADDING };
        self.extend_padding(&PaddingSize::new(pad_y, pad_x + extra_x, pad_y, pad_x))
    }
}

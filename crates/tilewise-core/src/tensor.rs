//! Host tensors: a [`TensorInfo`] plus a cache-line aligned allocation.
//!
//! Configuration works on [`TensorInfo`] alone; a [`Tensor`] only matters
//! at run time. Its allocation covers the padded layout, so every access a
//! negotiated window produces is in bounds. Accesses outside the allocation
//! panic: they mean a kernel ran a window it never negotiated.
//!
//! # Concurrent writes
//!
//! Scheduler partitions share `&Tensor` and write to disjoint sub-windows of
//! the destination. [`Tensor::store`] therefore takes `&self` and is
//! `unsafe`: the caller guarantees nothing else reads or writes the same
//! bytes during the call.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use bytemuck::Pod;
use tracing::debug;

use crate::dimensions::{Coordinates, TensorShape};
use crate::error::{Error, Result};
use crate::helpers::index2coords;
use crate::tensor_info::TensorInfo;
use crate::types::DataType;

/// Alignment of every tensor allocation.
pub const CACHE_LINE_SIZE: usize = 64;

struct Allocation {
    data: NonNull<u8>,
    layout: Layout,
    len: usize,
}

impl Allocation {
    fn zeroed(len: usize) -> Result<Self> {
        let layout = Layout::from_size_align(len.max(1), CACHE_LINE_SIZE)
            .map_err(|_| Error::OutOfMemory { requested: len })?;
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let data = NonNull::new(ptr).ok_or(Error::OutOfMemory { requested: len })?;
        Ok(Self { data, layout, len })
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        // SAFETY: allocated in `zeroed` with this layout.
        unsafe { dealloc(self.data.as_ptr(), self.layout) }
    }
}

// SAFETY: the allocation is plain bytes owned by the tensor; cross-thread
// writes go through `Tensor::store`, whose contract forbids overlap.
unsafe impl Send for Allocation {}
unsafe impl Sync for Allocation {}

pub struct Tensor {
    info: TensorInfo,
    allocation: Option<Allocation>,
}

impl Tensor {
    /// Unallocated tensor described by `info`.
    pub fn new(info: TensorInfo) -> Self {
        Self { info, allocation: None }
    }

    pub fn with_shape(shape: TensorShape, data_type: DataType) -> Self {
        Self::new(TensorInfo::new(shape, data_type))
    }

    pub fn info(&self) -> &TensorInfo {
        &self.info
    }

    /// Metadata for configuration. Padding changes after [`Tensor::allocate`]
    /// panic because the info is frozen.
    pub fn info_mut(&mut self) -> &mut TensorInfo {
        &mut self.info
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    /// Allocate zeroed storage for the padded layout and freeze the info.
    pub fn allocate(&mut self) -> Result<()> {
        if self.allocation.is_some() {
            return Ok(());
        }
        let len = self.info.total_size();
        self.allocation = Some(Allocation::zeroed(len)?);
        self.info.set_is_resizable(false);
        debug!(bytes = len, padding = ?self.info.padding(), "tensor allocated");
        Ok(())
    }

    fn allocation(&self) -> &Allocation {
        match &self.allocation {
            Some(a) => a,
            None => panic!("tensor accessed before allocate()"),
        }
    }

    fn checked_offset<T>(&self, offset: isize) -> usize {
        let len = self.allocation().len;
        let size = std::mem::size_of::<T>();
        assert!(
            offset >= 0 && offset as usize + size <= len,
            "access of {size} bytes at offset {offset} outside allocation of {len} bytes"
        );
        offset as usize
    }

    /// Read one element at a byte offset into the allocation.
    pub fn load<T: Pod>(&self, offset: isize) -> T {
        let offset = self.checked_offset::<T>(offset);
        // SAFETY: bounds checked above; unaligned read of a Pod type.
        unsafe { self.allocation().data.as_ptr().add(offset).cast::<T>().read_unaligned() }
    }

    /// Read `N` consecutive elements starting at a byte offset.
    pub fn load_array<T: Pod, const N: usize>(&self, offset: isize) -> [T; N] {
        let offset = self.checked_offset::<[T; N]>(offset);
        // SAFETY: bounds checked above; arrays of Pod are Pod.
        unsafe {
            self.allocation()
                .data
                .as_ptr()
                .add(offset)
                .cast::<[T; N]>()
                .read_unaligned()
        }
    }

    /// Write one element at a byte offset into the allocation.
    ///
    /// # Safety
    ///
    /// No other thread may access `offset..offset + size_of::<T>()` for the
    /// duration of the call. Kernels satisfy this by writing only inside
    /// their own partition of the destination window.
    pub unsafe fn store<T: Pod>(&self, offset: isize, value: T) {
        let offset = self.checked_offset::<T>(offset);
        self.allocation().data.as_ptr().add(offset).cast::<T>().write_unaligned(value);
    }

    /// Write `N` consecutive elements.
    ///
    /// # Safety
    ///
    /// Same contract as [`Tensor::store`].
    pub unsafe fn store_array<T: Pod, const N: usize>(&self, offset: isize, values: [T; N]) {
        let offset = self.checked_offset::<[T; N]>(offset);
        self.allocation()
            .data
            .as_ptr()
            .add(offset)
            .cast::<[T; N]>()
            .write_unaligned(values);
    }

    /// Element at `coords` (negative coordinates read padding).
    pub fn get<T: Pod>(&self, coords: &Coordinates) -> T {
        self.load(self.info.offset_element_in_bytes(coords))
    }

    /// Raw bytes of the whole allocation, padding included.
    pub fn as_bytes(&mut self) -> Result<&[u8]> {
        let a = self.allocation.as_ref().ok_or(Error::NotAllocated)?;
        // SAFETY: `&mut self` excludes concurrent `store`s.
        Ok(unsafe { std::slice::from_raw_parts(a.data.as_ptr(), a.len) })
    }

    /// Fill the logical elements (padding untouched) from `values`, given
    /// in row-major order with axis 0 fastest.
    pub fn import<T: Pod>(&mut self, values: &[T]) -> Result<()> {
        self.check_logical_len::<T>(values.len())?;
        let shape = *self.info.tensor_shape();
        for (index, value) in values.iter().enumerate() {
            let offset = self.info.offset_element_in_bytes(&index2coords(&shape, index));
            // SAFETY: `&mut self` gives exclusive access.
            unsafe { self.store(offset, *value) };
        }
        Ok(())
    }

    /// Logical elements in row-major order, axis 0 fastest.
    pub fn export<T: Pod>(&self) -> Result<Vec<T>> {
        self.check_logical_len::<T>(self.info.tensor_shape().total_size())?;
        let shape = *self.info.tensor_shape();
        Ok((0..shape.total_size())
            .map(|index| self.get(&index2coords(&shape, index)))
            .collect())
    }

    fn check_logical_len<T>(&self, len: usize) -> Result<()> {
        if self.allocation.is_none() {
            return Err(Error::NotAllocated);
        }
        if std::mem::size_of::<T>() != self.info.element_size() {
            return Err(Error::BufferSizeMismatch {
                expected: self.info.element_size(),
                actual: std::mem::size_of::<T>(),
            });
        }
        let expected = self.info.tensor_shape().total_size();
        if len != expected {
            return Err(Error::BufferSizeMismatch { expected, actual: len });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("info", &self.info)
            .field("allocated", &self.is_allocated())
            .finish()
    }
}

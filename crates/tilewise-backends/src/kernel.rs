//! Kernel contract between kernel authors and schedulers.
//!
//! A kernel is built by an inherent `configure()` that negotiates its
//! window against the operands' [`TensorInfo`](tilewise_core::TensorInfo)s
//! and stores it. Each kernel also offers a `validate()` with the same
//! checks that only touches clones. Schedulers then split
//! [`Kernel::window`] and call [`Kernel::run`] once per partition with the
//! live tensors in a [`TensorPack`].
//!
//! ```text
//!   configure(&mut TensorInfo..)        validate(&TensorInfo..)
//!            │                                   │
//!            ▼                                   ▼
//!   update_window_and_padding           same checks on clones
//!            │
//!            ▼
//!   Kernel { window } ── Scheduler::schedule ── split_window ── run()
//! ```

use tilewise_core::{BorderSize, Error, Status, Tensor, Window};

use crate::error::{BackendError, Result};

/// Operand position in a [`TensorPack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorSlot {
    Src0,
    Src1,
    Dst,
}

impl TensorSlot {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            TensorSlot::Src0 => 0,
            TensorSlot::Src1 => 1,
            TensorSlot::Dst => 2,
        }
    }
}

/// Run-time operands of one kernel invocation.
///
/// Holds shared references only: partitions running concurrently write to
/// disjoint parts of the destination through
/// [`Tensor::store`](tilewise_core::Tensor::store).
#[derive(Debug, Default, Clone, Copy)]
pub struct TensorPack<'a> {
    slots: [Option<&'a Tensor>; TensorSlot::COUNT],
}

impl<'a> TensorPack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`TensorPack::add_tensor`].
    pub fn with(mut self, slot: TensorSlot, tensor: &'a Tensor) -> Self {
        self.add_tensor(slot, tensor);
        self
    }

    pub fn add_tensor(&mut self, slot: TensorSlot, tensor: &'a Tensor) {
        self.slots[slot.index()] = Some(tensor);
    }

    pub fn get(&self, slot: TensorSlot) -> Option<&'a Tensor> {
        self.slots[slot.index()]
    }

    /// The allocated tensor in `slot`.
    pub fn require(&self, slot: TensorSlot) -> Result<&'a Tensor> {
        let tensor = self.get(slot).ok_or(BackendError::MissingTensor(slot))?;
        if !tensor.is_allocated() {
            return Err(BackendError::NotAllocated(slot));
        }
        Ok(tensor)
    }
}

/// Which partition of how many a [`Kernel::run`] call processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo {
    pub thread_id: usize,
    pub num_threads: usize,
}

impl Default for ThreadInfo {
    fn default() -> Self {
        Self {
            thread_id: 0,
            num_threads: 1,
        }
    }
}

/// A configured CPU kernel.
pub trait Kernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Window negotiated by `configure()`; schedulers split this one.
    fn window(&self) -> &Window;

    /// Border the kernel reads around each output element.
    fn border_size(&self) -> BorderSize {
        BorderSize::empty()
    }

    /// Whether [`Kernel::run`] may be called concurrently on partitions of
    /// [`Kernel::window`].
    fn is_parallelisable(&self) -> bool {
        true
    }

    /// Process `window`, a sub-window of [`Kernel::window`].
    fn run(&self, tensors: &TensorPack<'_>, window: &Window, info: &ThreadInfo) -> Result<()>;
}

/// `Err(InsufficientPadding)` when negotiation had to shrink the window.
pub fn window_unchanged(window_changed: bool) -> Status {
    if window_changed {
        Err(Error::InsufficientPadding)
    } else {
        Ok(())
    }
}

/// Error unless both types match.
pub fn ensure_same_data_type(expected: tilewise_core::DataType, actual: tilewise_core::DataType) -> Status {
    tilewise_core::ensure!(expected == actual, Error::DataTypeMismatch { expected, actual });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewise_core::{DataType, TensorShape};

    #[test]
    fn test_pack_require() -> Result<()> {
        let mut allocated = Tensor::with_shape(TensorShape::from([2]), DataType::U8);
        allocated.allocate()?;
        let bare = Tensor::with_shape(TensorShape::from([2]), DataType::U8);

        let pack = TensorPack::new()
            .with(TensorSlot::Src0, &allocated)
            .with(TensorSlot::Dst, &bare);
        assert!(pack.require(TensorSlot::Src0).is_ok());
        assert!(matches!(
            pack.require(TensorSlot::Src1),
            Err(BackendError::MissingTensor(TensorSlot::Src1))
        ));
        assert!(matches!(
            pack.require(TensorSlot::Dst),
            Err(BackendError::NotAllocated(TensorSlot::Dst))
        ));
        Ok(())
    }

    #[test]
    fn test_window_unchanged() {
        assert_eq!(window_unchanged(false), Ok(()));
        assert_eq!(window_unchanged(true), Err(Error::InsufficientPadding));
    }

    #[test]
    fn test_ensure_same_data_type() {
        assert!(ensure_same_data_type(DataType::U8, DataType::U8).is_ok());
        assert_eq!(
            ensure_same_data_type(DataType::U8, DataType::S16),
            Err(Error::DataTypeMismatch {
                expected: DataType::U8,
                actual: DataType::S16
            })
        );
    }
}

//! Error types for kernel dispatch

use crate::kernel::TensorSlot;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur while configuring or running kernels
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Validation or configuration error from the core
    #[error(transparent)]
    Core(#[from] tilewise_core::Error),

    /// The pack has no tensor in a slot the kernel reads or writes
    #[error("missing tensor in slot {0:?}")]
    MissingTensor(TensorSlot),

    /// The tensor in a slot has no storage yet
    #[error("tensor in slot {0:?} is not allocated")]
    NotAllocated(TensorSlot),

    /// Worker pool could not be created
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),

    /// Invalid scheduler configuration
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// Kernel failed on one partition
    #[error("kernel {kernel} failed on partition {thread_id}: {message}")]
    PartitionFailed {
        kernel: &'static str,
        thread_id: usize,
        message: String,
    },
}

impl BackendError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// The core error behind this one, if any.
    pub fn as_core(&self) -> Option<&tilewise_core::Error> {
        match self {
            Self::Core(e) => Some(e),
            _ => None,
        }
    }
}

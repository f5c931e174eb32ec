//! Error types for kernel validation and configuration

/// Result type for tilewise-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a `validate()` or `configure()` call.
pub type Status = Result<()>;

/// Coarse classification carried by every [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Argument-level contract violation (shape, type, parameter)
    RuntimeError,
    /// Operation exists but is not implemented for these arguments
    UnsupportedConfig,
}

/// Errors surfaced by `validate()` / `configure()` and tensor accessors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Padding negotiation had to shrink a window the kernel cannot shrink
    #[error("Insufficient Padding!")]
    InsufficientPadding,

    /// Operands disagree on data type
    #[error("Data type mismatch: expected {expected:?}, got {actual:?}")]
    DataTypeMismatch {
        expected: crate::types::DataType,
        actual: crate::types::DataType,
    },

    /// Data type not implemented by a kernel
    #[error("Unsupported data type {data_type:?} for {operation}")]
    UnsupportedDataType {
        operation: &'static str,
        data_type: crate::types::DataType,
    },

    /// Operands disagree on shape
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid parameter value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Tensor was used before `allocate()`
    #[error("Tensor is not allocated")]
    NotAllocated,

    /// Allocation failed
    #[error("Out of memory: requested {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Host buffer size does not match the tensor allocation
    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::UnsupportedDataType { .. } => ErrorCode::UnsupportedConfig,
            _ => ErrorCode::RuntimeError,
        }
    }

    pub fn shape_mismatch(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Error::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

/// Return `Err($err)` from the enclosing function when `$cond` is false.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_insufficient_padding_message() {
        let err = Error::InsufficientPadding;
        assert_eq!(err.to_string(), "Insufficient Padding!");
        assert_eq!(err.code(), ErrorCode::RuntimeError);
    }

    #[test]
    fn test_unsupported_code() {
        let err = Error::UnsupportedDataType {
            operation: "box3x3",
            data_type: DataType::F32,
        };
        assert_eq!(err.code(), ErrorCode::UnsupportedConfig);
        assert!(err.to_string().contains("box3x3"));
    }

    #[test]
    fn test_ensure_macro() {
        fn check(v: i32) -> Status {
            ensure!(v > 0, Error::InvalidArgument(format!("{v} must be positive")));
            Ok(())
        }
        assert!(check(1).is_ok());
        assert_eq!(check(-2), Err(Error::InvalidArgument("-2 must be positive".into())));
    }
}

//! Error taxonomy surfaced by array construction and layout negotiation.

use thiserror::Error;

use crate::backend::spec::BackendError;

/// Failure returned by creation routines and array views.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// An argument value is outside the accepted set (e.g. an unknown order token).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The request names a feature this layer does not provide.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// An operand has the wrong kind, e.g. a scalar where an array is required.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("axis {axis} is out of bounds for array of dimension {ndim}")]
    Axis { axis: isize, ndim: usize },
    #[error("array size overflows the address space")]
    ShapeOverflow,
    /// Allocation, layout, or copy failure reported by the backend, passed through unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ArrayError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ArrayError::InvalidArgument(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        ArrayError::NotSupported(message.into())
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        ArrayError::TypeMismatch(message.into())
    }
}

/// Convenience alias for results returned by creation routines.
pub type ArrayResult<T> = Result<T, ArrayError>;

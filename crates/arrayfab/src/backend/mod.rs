//! Backend collaborator contract.

pub mod spec;

pub use spec::{
    validate_copy, ArrayBackend, BackendError, BackendResult, CopySource, StridedView,
};

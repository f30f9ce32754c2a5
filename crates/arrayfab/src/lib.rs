//! Layout-aware array construction over pluggable device backends.
//!
//! Creation routines decide the memory layout of a new array (row-major,
//! column-major, or mirroring an existing array) and populate it through the
//! [`ArrayBackend`] collaborator, which owns device buffers and orders
//! asynchronous fills on its execution stream.

pub mod array;
pub mod backend;
pub mod creation;
mod env;
pub mod error;
pub mod layout;
pub mod tensor;

pub use array::Array;
pub use backend::spec::{ArrayBackend, BackendError, BackendResult};
pub use creation::{
    astype, empty, empty_like, eye, full, full_like, identity, ones, ones_like, zeros,
    zeros_like, FillValue, LikeOptions, Operand,
};
pub use error::{ArrayError, ArrayResult};
pub use layout::{Order, ResolvedOrder};
pub use tensor::{infer_dtype, Casting, DType, Element, Scalar, Shape};

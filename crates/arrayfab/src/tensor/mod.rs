//! Core element abstractions shared by arrays and backends.
//!
//! The tensor module defines the closed dtype enumeration, shapes, host scalars
//! with their dtype inference rule, and the element trait used for host
//! readback and uploads.

pub mod dtype;
pub mod element;
pub mod scalar;
pub mod shape;

pub use dtype::{Casting, DType, DTypeKind};
pub use element::Element;
pub use scalar::{infer_dtype, Scalar};
pub use shape::Shape;

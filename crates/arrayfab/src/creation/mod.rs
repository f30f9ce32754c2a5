//! Array creation routines.

pub mod basic;
pub mod factory;

pub use basic::{
    astype, empty, empty_like, eye, full, full_like, identity, ones, ones_like, zeros,
    zeros_like, FillValue, LikeOptions, Operand,
};
pub use factory::make;

//! Host-memory reference implementation of the arrayfab backend contract.

pub mod cpu;

pub use cpu::{CpuBackend, CpuBuffer, UNINIT_BYTE};

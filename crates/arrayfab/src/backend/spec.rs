//! Contract between the array layer and the device memory collaborator.
//!
//! A backend owns raw byte buffers and an execution stream. The array layer
//! describes every access as a [`StridedView`] over a buffer; the backend is
//! responsible for ordering enqueued work and performing element casts.

use std::fmt;

use thiserror::Error;

use crate::layout::strides::{byte_bounds, for_each_offset};
use crate::tensor::{infer_dtype, Casting, DType, Scalar};

/// Backend error surfaced to higher layers.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("out of memory allocating {requested} bytes: {reason}")]
    OutOfMemory { requested: usize, reason: String },
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("could not broadcast source of shape {src:?} into destination of shape {dst:?}")]
    ShapeMismatch { src: Vec<usize>, dst: Vec<usize> },
    #[error("cannot cast from {from} to {to} under {casting:?} casting")]
    CastNotAllowed {
        from: DType,
        to: DType,
        casting: Casting,
    },
    #[error("backend execution failure: {0}")]
    Execution(String),
}

impl BackendError {
    pub fn out_of_memory(requested: usize, reason: impl Into<String>) -> Self {
        BackendError::OutOfMemory {
            requested,
            reason: reason.into(),
        }
    }

    pub fn invalid_layout(message: impl Into<String>) -> Self {
        BackendError::InvalidLayout(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        BackendError::Execution(message.into())
    }
}

/// Convenience alias for results returned by backend routines.
pub type BackendResult<T> = Result<T, BackendError>;

/// Strided description of the elements an operation touches inside a buffer.
pub struct StridedView<'a, H> {
    pub buffer: &'a H,
    /// Byte offset of the element at index `[0, 0, ..]`.
    pub offset: usize,
    pub shape: &'a [usize],
    /// Signed byte strides, one per axis.
    pub strides: &'a [isize],
    pub dtype: DType,
}

impl<H> Clone for StridedView<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for StridedView<'_, H> {}

impl<H> fmt::Debug for StridedView<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StridedView")
            .field("offset", &self.offset)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("dtype", &self.dtype)
            .finish()
    }
}

impl<'a, H> StridedView<'a, H> {
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Byte offsets of every element in logical row-major order.
    pub fn element_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.num_elements());
        for_each_offset(self.shape, self.strides, self.offset as isize, |offset| {
            offsets.push(offset as usize)
        });
        offsets
    }

    /// Checks that every element of the view lies inside a buffer of `buffer_len` bytes.
    pub fn check_bounds(&self, buffer_len: usize) -> BackendResult<()> {
        if self.strides.len() != self.shape.len() {
            return Err(BackendError::invalid_layout(format!(
                "strides {:?} do not match rank {} of shape {:?}",
                self.strides,
                self.shape.len(),
                self.shape
            )));
        }
        let Some((low, high)) = byte_bounds(self.shape, self.strides, self.dtype.size_in_bytes())
        else {
            return Ok(());
        };
        let start = self.offset as isize + low;
        let end = self.offset as isize + high;
        if start < 0 || end > buffer_len as isize {
            return Err(BackendError::invalid_layout(format!(
                "view with offset {} shape {:?} strides {:?} addresses bytes [{start}, {end}) outside buffer of {buffer_len} bytes",
                self.offset, self.shape, self.strides
            )));
        }
        Ok(())
    }
}

/// Source operand of a broadcast copy.
#[derive(Debug)]
pub enum CopySource<'a, H> {
    Scalar(Scalar),
    View(StridedView<'a, H>),
}

impl<H> Clone for CopySource<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for CopySource<'_, H> {}

impl<H> CopySource<'_, H> {
    pub fn dtype(&self) -> DType {
        match self {
            CopySource::Scalar(value) => infer_dtype(value),
            CopySource::View(view) => view.dtype,
        }
    }
}

/// Validates the dtype and shape compatibility of a copy before it is enqueued.
///
/// A view source must either match the destination shape exactly or hold a
/// single element, which is repeated into every destination slot.
pub fn validate_copy<H>(
    dst: &StridedView<'_, H>,
    src: &CopySource<'_, H>,
    casting: Casting,
) -> BackendResult<()> {
    let from = src.dtype();
    if !from.can_cast(dst.dtype, casting) {
        return Err(BackendError::CastNotAllowed {
            from,
            to: dst.dtype,
            casting,
        });
    }
    if let CopySource::View(view) = src {
        if view.shape != dst.shape && view.num_elements() != 1 {
            return Err(BackendError::ShapeMismatch {
                src: view.shape.to_vec(),
                dst: dst.shape.to_vec(),
            });
        }
    }
    Ok(())
}

/// Device memory and execution collaborator consumed by the array layer.
///
/// Methods suffixed `_async` and [`copy_to`](ArrayBackend::copy_to) enqueue
/// work on the backend stream and return without waiting. Work enqueued on the
/// same backend executes in enqueue order.
pub trait ArrayBackend: Send + Sync {
    type Buffer: Clone + Send + Sync + 'static;

    /// Returns a human-readable backend identifier (e.g., `"cpu"`, `"cuda"`).
    fn backend_name(&self) -> &str;

    /// Allocates an uninitialised buffer of `nbytes` bytes.
    ///
    /// May block while the allocator reclaims memory.
    fn allocate(&self, nbytes: usize) -> BackendResult<Self::Buffer>;

    /// Size of the buffer in bytes.
    fn buffer_len(&self, buffer: &Self::Buffer) -> usize;

    /// Returns `true` when both handles refer to the same allocation.
    fn same_buffer(&self, lhs: &Self::Buffer, rhs: &Self::Buffer) -> bool;

    /// Enqueues a byte fill of `nbytes` bytes starting at `offset`.
    fn memset_async(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        value: u8,
        nbytes: usize,
    ) -> BackendResult<()>;

    /// Enqueues a host-to-device copy of raw bytes starting at `offset`.
    fn upload_async(&self, buffer: &Self::Buffer, offset: usize, bytes: Vec<u8>)
        -> BackendResult<()>;

    /// Enqueues an element-wise cast copy of `src` into every element of `dst`.
    fn copy_to(
        &self,
        dst: StridedView<'_, Self::Buffer>,
        src: CopySource<'_, Self::Buffer>,
        casting: Casting,
    ) -> BackendResult<()>;

    /// Reads the view back as packed row-major bytes after all previously enqueued work.
    fn read_to_host(&self, src: StridedView<'_, Self::Buffer>) -> BackendResult<Vec<u8>>;

    /// Blocks until all enqueued work has completed.
    fn synchronize(&self) -> BackendResult<()>;
}

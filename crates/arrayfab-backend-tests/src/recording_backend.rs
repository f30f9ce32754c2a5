use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use arrayfab::backend::spec::{
    validate_copy, ArrayBackend, BackendError, BackendResult, CopySource, StridedView,
};
use arrayfab::tensor::{Casting, DType, Scalar};

/// Opaque buffer handle issued by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBuffer {
    pub id: usize,
    pub len: usize,
}

/// Source side of a recorded copy.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSource {
    Scalar(Scalar),
    View {
        buffer: usize,
        shape: Vec<usize>,
        dtype: DType,
    },
}

/// One backend call, in the order it was issued.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Allocate {
        buffer: usize,
        nbytes: usize,
    },
    Memset {
        buffer: usize,
        offset: usize,
        value: u8,
        nbytes: usize,
    },
    Upload {
        buffer: usize,
        offset: usize,
        len: usize,
    },
    CopyTo {
        buffer: usize,
        shape: Vec<usize>,
        strides: Vec<isize>,
        dtype: DType,
        source: RecordedSource,
        casting: Casting,
    },
    Read {
        buffer: usize,
    },
    Synchronize,
}

/// Test-only backend that records every call instead of executing it.
#[derive(Default)]
pub struct RecordingBackend {
    next_buffer: AtomicUsize,
    events: Mutex<Vec<BackendEvent>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: BackendEvent) {
        self.events
            .lock()
            .expect("backend mutex poisoned")
            .push(event);
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().expect("backend mutex poisoned").clone()
    }

    pub fn clear(&self) {
        self.events.lock().expect("backend mutex poisoned").clear();
    }

    /// Number of allocations recorded so far.
    pub fn allocation_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, BackendEvent::Allocate { .. }))
            .count()
    }

    pub fn synchronize_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, BackendEvent::Synchronize))
            .count()
    }
}

impl ArrayBackend for RecordingBackend {
    type Buffer = RecordedBuffer;

    fn backend_name(&self) -> &str {
        "recording"
    }

    fn allocate(&self, nbytes: usize) -> BackendResult<Self::Buffer> {
        let id = self.next_buffer.fetch_add(1, Ordering::SeqCst);
        self.record(BackendEvent::Allocate { buffer: id, nbytes });
        Ok(RecordedBuffer { id, len: nbytes })
    }

    fn buffer_len(&self, buffer: &Self::Buffer) -> usize {
        buffer.len
    }

    fn same_buffer(&self, lhs: &Self::Buffer, rhs: &Self::Buffer) -> bool {
        lhs.id == rhs.id
    }

    fn memset_async(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        value: u8,
        nbytes: usize,
    ) -> BackendResult<()> {
        self.record(BackendEvent::Memset {
            buffer: buffer.id,
            offset,
            value,
            nbytes,
        });
        Ok(())
    }

    fn upload_async(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        bytes: Vec<u8>,
    ) -> BackendResult<()> {
        self.record(BackendEvent::Upload {
            buffer: buffer.id,
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn copy_to(
        &self,
        dst: StridedView<'_, Self::Buffer>,
        src: CopySource<'_, Self::Buffer>,
        casting: Casting,
    ) -> BackendResult<()> {
        validate_copy(&dst, &src, casting)?;
        let source = match src {
            CopySource::Scalar(value) => RecordedSource::Scalar(value),
            CopySource::View(view) => RecordedSource::View {
                buffer: view.buffer.id,
                shape: view.shape.to_vec(),
                dtype: view.dtype,
            },
        };
        self.record(BackendEvent::CopyTo {
            buffer: dst.buffer.id,
            shape: dst.shape.to_vec(),
            strides: dst.strides.to_vec(),
            dtype: dst.dtype,
            source,
            casting,
        });
        Ok(())
    }

    fn read_to_host(&self, src: StridedView<'_, Self::Buffer>) -> BackendResult<Vec<u8>> {
        self.record(BackendEvent::Read {
            buffer: src.buffer.id,
        });
        Err(BackendError::execution(
            "recording backend does not hold element data",
        ))
    }

    fn synchronize(&self) -> BackendResult<()> {
        self.record(BackendEvent::Synchronize);
        Ok(())
    }
}

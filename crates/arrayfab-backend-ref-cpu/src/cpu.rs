use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use arrayfab::backend::spec::{
    validate_copy, ArrayBackend, BackendError, BackendResult, CopySource, StridedView,
};
use arrayfab::tensor::{Casting, DType, Scalar};
use tracing::{debug, trace, warn};

/// Byte pattern written into fresh allocations so reads of uninitialised memory stand out.
pub const UNINIT_BYTE: u8 = 0xA5;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct BufferStorage {
    bytes: Mutex<Vec<u8>>,
    /// Bytes charged against the backend's live counter.
    charged: usize,
    live_bytes: Arc<AtomicUsize>,
}

impl Drop for BufferStorage {
    fn drop(&mut self) {
        self.live_bytes.fetch_sub(self.charged, Ordering::SeqCst);
    }
}

/// Host allocation owned by [`CpuBackend`].
#[derive(Clone)]
pub struct CpuBuffer {
    storage: Arc<BufferStorage>,
    len: usize,
}

impl fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuBuffer")
            .field("len", &self.len)
            .field("storage", &Arc::as_ptr(&self.storage))
            .finish()
    }
}

impl CpuBuffer {
    fn lock(&self) -> BackendResult<MutexGuard<'_, Vec<u8>>> {
        self.storage
            .bytes
            .lock()
            .map_err(|_| BackendError::execution("buffer mutex poisoned"))
    }
}

/// In-order execution queue served by a dedicated worker thread.
struct Stream {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    fault: Arc<Mutex<Option<String>>>,
}

impl Stream {
    fn spawn() -> Self {
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("arrayfab-cpu-stream".to_string())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .ok();
        Stream {
            sender: Some(sender),
            worker,
            fault: Arc::new(Mutex::new(None)),
        }
    }

    fn enqueue(&self, job: Job) -> BackendResult<()> {
        if self.worker.is_none() {
            // No worker thread could be started; run inline to keep ordering.
            job();
            return Ok(());
        }
        self.sender
            .as_ref()
            .ok_or_else(|| BackendError::execution("stream is shut down"))?
            .send(job)
            .map_err(|_| BackendError::execution("stream worker has exited"))
    }

    /// Enqueues `job` and blocks until it has produced a value.
    fn run_blocking<T, F>(&self, job: F) -> BackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (reply, result) = mpsc::channel();
        self.enqueue(Box::new(move || {
            let _ = reply.send(job());
        }))?;
        result
            .recv()
            .map_err(|_| BackendError::execution("stream worker dropped a pending reply"))
    }

    fn record_fault(fault: &Mutex<Option<String>>, err: BackendError) {
        warn!(error = %err, "cpu stream operation failed");
        if let Ok(mut slot) = fault.lock() {
            slot.get_or_insert_with(|| err.to_string());
        }
    }

    /// Returns and clears the first failure recorded by an asynchronous job.
    fn take_fault(&self) -> BackendResult<()> {
        let mut slot = self
            .fault
            .lock()
            .map_err(|_| BackendError::execution("stream fault slot poisoned"))?;
        match slot.take() {
            Some(message) => Err(BackendError::execution(message)),
            None => Ok(()),
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Reference backend keeping buffers in host memory.
///
/// Asynchronous operations run on one worker thread in enqueue order. Errors
/// raised while executing them are sticky and surface on the next
/// [`synchronize`](ArrayBackend::synchronize) or host read.
pub struct CpuBackend {
    stream: Stream,
    live_bytes: Arc<AtomicUsize>,
    memory_limit: Option<usize>,
}

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend {
            stream: Stream::spawn(),
            live_bytes: Arc::new(AtomicUsize::new(0)),
            memory_limit: None,
        }
    }

    /// Backend whose allocations fail once `limit` live bytes would be exceeded.
    pub fn with_memory_limit(limit: usize) -> Self {
        CpuBackend {
            memory_limit: Some(limit),
            ..CpuBackend::new()
        }
    }

    /// Bytes currently held by live buffers.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    fn enqueue_fallible<F>(&self, op: &'static str, job: F) -> BackendResult<()>
    where
        F: FnOnce() -> BackendResult<()> + Send + 'static,
    {
        trace!(op, "enqueue");
        let fault = Arc::clone(&self.stream.fault);
        self.stream.enqueue(Box::new(move || {
            if let Err(err) = job() {
                Stream::record_fault(&fault, err);
            }
        }))
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Elements pulled from a copy source, already encoded in the destination dtype.
enum PreparedSource {
    Repeated(Vec<u8>),
    Strided {
        buffer: CpuBuffer,
        offsets: Vec<usize>,
        dtype: DType,
    },
}

fn gather(bytes: &[u8], offsets: &[usize], from: DType, to: DType) -> Vec<u8> {
    let src_width = from.size_in_bytes();
    let dst_width = to.size_in_bytes();
    let mut out = vec![0u8; offsets.len() * dst_width];
    for (&offset, chunk) in offsets.iter().zip(out.chunks_exact_mut(dst_width)) {
        let element = &bytes[offset..offset + src_width];
        if from == to {
            chunk.copy_from_slice(element);
        } else {
            Scalar::decode(from, element).encode(to, chunk);
        }
    }
    out
}

impl ArrayBackend for CpuBackend {
    type Buffer = CpuBuffer;

    fn backend_name(&self) -> &str {
        "cpu"
    }

    fn allocate(&self, nbytes: usize) -> BackendResult<Self::Buffer> {
        let live = self.live_bytes.fetch_add(nbytes, Ordering::SeqCst);
        if let Some(limit) = self.memory_limit {
            if live.saturating_add(nbytes) > limit {
                self.live_bytes.fetch_sub(nbytes, Ordering::SeqCst);
                return Err(BackendError::out_of_memory(
                    nbytes,
                    format!("{live} of {limit} bytes already in use"),
                ));
            }
        }
        debug!(nbytes, live_bytes = live + nbytes, "cpu allocate");
        Ok(CpuBuffer {
            storage: Arc::new(BufferStorage {
                bytes: Mutex::new(vec![UNINIT_BYTE; nbytes]),
                charged: nbytes,
                live_bytes: Arc::clone(&self.live_bytes),
            }),
            len: nbytes,
        })
    }

    fn buffer_len(&self, buffer: &Self::Buffer) -> usize {
        buffer.len
    }

    fn same_buffer(&self, lhs: &Self::Buffer, rhs: &Self::Buffer) -> bool {
        Arc::ptr_eq(&lhs.storage, &rhs.storage)
    }

    fn memset_async(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        value: u8,
        nbytes: usize,
    ) -> BackendResult<()> {
        let end = offset
            .checked_add(nbytes)
            .filter(|&end| end <= buffer.len)
            .ok_or_else(|| {
                BackendError::invalid_layout(format!(
                    "memset of {nbytes} bytes at offset {offset} exceeds buffer of {} bytes",
                    buffer.len
                ))
            })?;
        let buffer = buffer.clone();
        self.enqueue_fallible("memset", move || {
            buffer.lock()?[offset..end].fill(value);
            Ok(())
        })
    }

    fn upload_async(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        bytes: Vec<u8>,
    ) -> BackendResult<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|&end| end <= buffer.len)
            .ok_or_else(|| {
                BackendError::invalid_layout(format!(
                    "upload of {} bytes at offset {offset} exceeds buffer of {} bytes",
                    bytes.len(),
                    buffer.len
                ))
            })?;
        let buffer = buffer.clone();
        self.enqueue_fallible("upload", move || {
            buffer.lock()?[offset..end].copy_from_slice(&bytes);
            Ok(())
        })
    }

    fn copy_to(
        &self,
        dst: StridedView<'_, Self::Buffer>,
        src: CopySource<'_, Self::Buffer>,
        casting: Casting,
    ) -> BackendResult<()> {
        validate_copy(&dst, &src, casting)?;
        dst.check_bounds(dst.buffer.len)?;
        let dst_dtype = dst.dtype;
        let source = match src {
            CopySource::Scalar(value) => {
                let mut element = vec![0u8; dst_dtype.size_in_bytes()];
                value.encode(dst_dtype, &mut element);
                PreparedSource::Repeated(element)
            }
            CopySource::View(view) => {
                view.check_bounds(view.buffer.len)?;
                PreparedSource::Strided {
                    buffer: view.buffer.clone(),
                    offsets: view.element_offsets(),
                    dtype: view.dtype,
                }
            }
        };
        let dst_offsets = dst.element_offsets();
        let dst_buffer = dst.buffer.clone();
        let width = dst_dtype.size_in_bytes();
        self.enqueue_fallible("copy_to", move || {
            let values = match source {
                PreparedSource::Repeated(element) => element,
                PreparedSource::Strided {
                    buffer,
                    offsets,
                    dtype,
                } => {
                    let bytes = buffer.lock()?;
                    gather(&bytes, &offsets, dtype, dst_dtype)
                }
            };
            let repeated = values.len() == width;
            let mut bytes = dst_buffer.lock()?;
            for (index, &offset) in dst_offsets.iter().enumerate() {
                let element = if repeated {
                    &values[..]
                } else {
                    &values[index * width..(index + 1) * width]
                };
                bytes[offset..offset + width].copy_from_slice(element);
            }
            Ok(())
        })
    }

    fn read_to_host(&self, src: StridedView<'_, Self::Buffer>) -> BackendResult<Vec<u8>> {
        src.check_bounds(src.buffer.len)?;
        let buffer = src.buffer.clone();
        let offsets = src.element_offsets();
        let dtype = src.dtype;
        let bytes = self.stream.run_blocking(move || -> BackendResult<Vec<u8>> {
            let bytes = buffer.lock()?;
            Ok(gather(&bytes, &offsets, dtype, dtype))
        })??;
        self.stream.take_fault()?;
        Ok(bytes)
    }

    fn synchronize(&self) -> BackendResult<()> {
        self.stream.run_blocking(|| ())?;
        self.stream.take_fault()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view<'a>(
        buffer: &'a CpuBuffer,
        shape: &'a [usize],
        strides: &'a [isize],
        dtype: DType,
    ) -> StridedView<'a, CpuBuffer> {
        StridedView {
            buffer,
            offset: 0,
            shape,
            strides,
            dtype,
        }
    }

    #[test]
    fn fresh_buffers_hold_the_uninit_pattern() {
        let backend = CpuBackend::new();
        let buffer = backend.allocate(4).expect("allocate");
        let bytes = backend
            .read_to_host(view(&buffer, &[4], &[1], DType::U8))
            .expect("read");
        assert_eq!(bytes, vec![UNINIT_BYTE; 4]);
    }

    #[test]
    fn memset_then_read_observes_enqueue_order() {
        let backend = CpuBackend::new();
        let buffer = backend.allocate(8).expect("allocate");
        backend.memset_async(&buffer, 0, 0, 8).expect("memset");
        backend.memset_async(&buffer, 4, 7, 4).expect("memset");
        let bytes = backend
            .read_to_host(view(&buffer, &[8], &[1], DType::U8))
            .expect("read");
        assert_eq!(bytes, vec![0, 0, 0, 0, 7, 7, 7, 7]);
    }

    #[test]
    fn memset_past_end_is_rejected_before_enqueue() {
        let backend = CpuBackend::new();
        let buffer = backend.allocate(8).expect("allocate");
        let err = backend
            .memset_async(&buffer, 4, 0, 8)
            .expect_err("out of range memset");
        assert!(matches!(err, BackendError::InvalidLayout(_)));
    }

    #[test]
    fn copy_between_views_of_one_buffer_does_not_deadlock() {
        let backend = CpuBackend::new();
        let buffer = backend.allocate(4).expect("allocate");
        backend
            .upload_async(&buffer, 0, vec![1, 2, 3, 4])
            .expect("upload");
        let src = StridedView {
            buffer: &buffer,
            offset: 3,
            shape: &[1],
            strides: &[1],
            dtype: DType::U8,
        };
        backend
            .copy_to(
                view(&buffer, &[3], &[1], DType::U8),
                CopySource::View(src),
                Casting::No,
            )
            .expect("copy");
        let bytes = backend
            .read_to_host(view(&buffer, &[4], &[1], DType::U8))
            .expect("read");
        assert_eq!(bytes, vec![4, 4, 4, 4]);
    }

    #[test]
    fn memory_limit_reports_out_of_memory_and_releases_on_drop() {
        let backend = CpuBackend::with_memory_limit(16);
        let first = backend.allocate(12).expect("allocate");
        let err = backend.allocate(8).expect_err("limit exceeded");
        assert!(matches!(err, BackendError::OutOfMemory { requested: 8, .. }));
        drop(first);
        assert_eq!(backend.live_bytes(), 0);
        assert!(backend.allocate(16).is_ok());
    }

    #[test]
    fn poisoned_buffer_still_releases_its_bytes() {
        let backend = CpuBackend::with_memory_limit(16);
        let buffer = backend.allocate(16).expect("allocate");
        let poisoner = buffer.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.storage.bytes.lock();
            panic!("poison the buffer");
        })
        .join();
        assert!(buffer.lock().is_err());
        drop(buffer);
        assert_eq!(backend.live_bytes(), 0);
        assert!(backend.allocate(16).is_ok());
    }

    #[test]
    fn buffer_debug_reports_length() {
        let backend = CpuBackend::new();
        let buffer = backend.allocate(3).expect("allocate");
        assert!(format!("{buffer:?}").contains("len: 3"));
    }
}

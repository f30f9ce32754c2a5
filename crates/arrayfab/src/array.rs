//! Device array object: a typed, strided window into a backend buffer.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use crate::backend::spec::{ArrayBackend, CopySource, StridedView};
use crate::env;
use crate::error::{ArrayError, ArrayResult};
use crate::layout::order::{Order, ResolvedOrder};
use crate::layout::resolver::plan_like;
use crate::layout::strides::{contiguous_strides_or_error, ContiguityFlags};
use crate::tensor::element::{decode_elements, encode_elements};
use crate::tensor::{Casting, DType, Element, Scalar, Shape};

/// N-dimensional array whose elements live in a backend buffer.
///
/// Cloning an array or taking a view shares the underlying buffer.
pub struct Array<B: ArrayBackend> {
    backend: Arc<B>,
    buffer: B::Buffer,
    offset: usize,
    shape: Shape,
    strides: Vec<isize>,
    dtype: DType,
    flags: ContiguityFlags,
}

impl<B: ArrayBackend> Clone for Array<B> {
    fn clone(&self) -> Self {
        Array {
            backend: Arc::clone(&self.backend),
            buffer: self.buffer.clone(),
            offset: self.offset,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            dtype: self.dtype,
            flags: self.flags,
        }
    }
}

impl<B: ArrayBackend> fmt::Debug for Array<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("backend", &self.backend.backend_name())
            .field("shape", &self.shape.dims())
            .field("dtype", &self.dtype)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<B: ArrayBackend> Array<B> {
    /// Creates an array, allocating a buffer and computing strides when not supplied.
    ///
    /// Explicit `strides` override `order`. A supplied `buffer` must be large
    /// enough for every element the strides address.
    pub fn new(
        backend: &Arc<B>,
        shape: impl Into<Shape>,
        dtype: DType,
        buffer: Option<B::Buffer>,
        strides: Option<Vec<isize>>,
        order: ResolvedOrder,
    ) -> ArrayResult<Self> {
        let shape = shape.into();
        let itemsize = dtype.size_in_bytes();
        let nbytes = shape
            .checked_num_elements()
            .and_then(|count| count.checked_mul(itemsize))
            .ok_or(ArrayError::ShapeOverflow)?;
        let strides = match strides {
            Some(strides) => strides,
            None => contiguous_strides_or_error(shape.dims(), itemsize, order, || {
                ArrayError::ShapeOverflow
            })?,
        };
        let buffer = match buffer {
            Some(buffer) => buffer,
            None => backend.allocate(nbytes)?,
        };
        let array = Array::from_parts(Arc::clone(backend), buffer, 0, shape, strides, dtype);
        array.view().check_bounds(backend.buffer_len(&array.buffer))?;
        trace!(
            backend = backend.backend_name(),
            shape = %array.shape,
            dtype = %dtype,
            strides = ?array.strides,
            "created array"
        );
        Ok(array)
    }

    /// Uploads host data into a new row-major array.
    pub fn from_vec<T: Element>(
        backend: &Arc<B>,
        shape: impl Into<Shape>,
        data: Vec<T>,
    ) -> ArrayResult<Self> {
        let shape = shape.into();
        if Some(data.len()) != shape.checked_num_elements() {
            return Err(ArrayError::invalid_argument(format!(
                "data length ({}) does not match shape {shape}",
                data.len()
            )));
        }
        let array = Array::new(backend, shape, T::DTYPE, None, None, ResolvedOrder::RowMajor)?;
        backend.upload_async(&array.buffer, 0, encode_elements(&data))?;
        Ok(array)
    }

    fn from_parts(
        backend: Arc<B>,
        buffer: B::Buffer,
        offset: usize,
        shape: Shape,
        strides: Vec<isize>,
        dtype: DType,
    ) -> Self {
        let flags = ContiguityFlags::compute(shape.dims(), &strides, dtype.size_in_bytes());
        Array {
            backend,
            buffer,
            offset,
            shape,
            strides,
            dtype,
            flags,
        }
    }

    fn with_layout(&self, offset: usize, dims: Vec<usize>, strides: Vec<isize>) -> Self {
        Array::from_parts(
            Arc::clone(&self.backend),
            self.buffer.clone(),
            offset,
            Shape::new(dims),
            strides,
            self.dtype,
        )
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn buffer(&self) -> &B::Buffer {
        &self.buffer
    }

    /// Byte offset of the first element inside the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Byte strides, one per axis.
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.rank()
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.shape.num_elements()
    }

    pub fn itemsize(&self) -> usize {
        self.dtype.size_in_bytes()
    }

    /// Bytes spanned by the elements, `size * itemsize`.
    pub fn nbytes(&self) -> usize {
        self.size() * self.itemsize()
    }

    pub fn flags(&self) -> ContiguityFlags {
        self.flags
    }

    pub fn is_c_contiguous(&self) -> bool {
        self.flags.c_contiguous
    }

    pub fn is_f_contiguous(&self) -> bool {
        self.flags.f_contiguous
    }

    /// Describes the array as a strided view for backend calls.
    pub fn view(&self) -> StridedView<'_, B::Buffer> {
        StridedView {
            buffer: &self.buffer,
            offset: self.offset,
            shape: self.shape.dims(),
            strides: &self.strides,
            dtype: self.dtype,
        }
    }

    /// Returns `true` when both arrays are the same view of the same buffer.
    pub fn same_array(&self, other: &Array<B>) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
            && self.backend.same_buffer(&self.buffer, &other.buffer)
            && self.offset == other.offset
            && self.shape == other.shape
            && self.strides == other.strides
            && self.dtype == other.dtype
    }

    /// Returns `true` when both arrays live on the same backend allocation.
    pub fn shares_buffer_with(&self, other: &Array<B>) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
            && self.backend.same_buffer(&self.buffer, &other.buffer)
    }

    fn normalize_axis(&self, axis: isize) -> ArrayResult<usize> {
        let ndim = self.ndim();
        let resolved = if axis < 0 { axis + ndim as isize } else { axis };
        if resolved < 0 || resolved >= ndim as isize {
            return Err(ArrayError::Axis { axis, ndim });
        }
        Ok(resolved as usize)
    }

    fn normalize_axes(&self, axes: &[isize], what: &str) -> ArrayResult<SmallVec<[usize; 8]>> {
        let mut seen: SmallVec<[usize; 8]> = SmallVec::with_capacity(axes.len());
        for &axis in axes {
            let axis = self.normalize_axis(axis)?;
            if seen.contains(&axis) {
                return Err(ArrayError::invalid_argument(format!(
                    "repeated axis in `{what}` argument"
                )));
            }
            seen.push(axis);
        }
        Ok(seen)
    }

    /// Permutes the axes; `None` reverses them.
    pub fn transpose(&self, axes: Option<&[isize]>) -> ArrayResult<Self> {
        let perm: SmallVec<[usize; 8]> = match axes {
            None => (0..self.ndim()).rev().collect(),
            Some(axes) => {
                if axes.len() != self.ndim() {
                    return Err(ArrayError::invalid_argument("axes don't match array"));
                }
                self.normalize_axes(axes, "axes")?
            }
        };
        let dims = perm.iter().map(|&axis| self.shape.dims()[axis]).collect();
        let strides = perm.iter().map(|&axis| self.strides[axis]).collect();
        Ok(self.with_layout(self.offset, dims, strides))
    }

    /// Interchanges two axes.
    pub fn swapaxes(&self, axis1: isize, axis2: isize) -> ArrayResult<Self> {
        let axis1 = self.normalize_axis(axis1)?;
        let axis2 = self.normalize_axis(axis2)?;
        let mut dims = self.shape.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(axis1, axis2);
        strides.swap(axis1, axis2);
        Ok(self.with_layout(self.offset, dims, strides))
    }

    /// Moves axes at `source` positions to `destination` positions, keeping
    /// the remaining axes in their original order.
    pub fn moveaxis(&self, source: &[isize], destination: &[isize]) -> ArrayResult<Self> {
        let source = self.normalize_axes(source, "source")?;
        let destination = self.normalize_axes(destination, "destination")?;
        if source.len() != destination.len() {
            return Err(ArrayError::invalid_argument(
                "`source` and `destination` arguments must have the same number of elements",
            ));
        }
        let mut order: Vec<usize> = (0..self.ndim())
            .filter(|axis| !source.contains(axis))
            .collect();
        let mut moves: SmallVec<[(usize, usize); 8]> =
            destination.iter().copied().zip(source.iter().copied()).collect();
        moves.sort_unstable();
        for (dest, src) in moves {
            order.insert(dest, src);
        }
        let perm: Vec<isize> = order.into_iter().map(|axis| axis as isize).collect();
        self.transpose(Some(&perm))
    }

    /// View of the `k`-th diagonal over the first two axes.
    ///
    /// The diagonal becomes the last axis of the result; positive `k` selects
    /// diagonals above the main one.
    pub fn diagonal(&self, k: isize) -> ArrayResult<Self> {
        if self.ndim() < 2 {
            return Err(ArrayError::invalid_argument(
                "diagonal requires an array of at least two dimensions",
            ));
        }
        let rows = self.shape.dims()[0];
        let cols = self.shape.dims()[1];
        let skip = k.unsigned_abs();
        let (len, axis) = if k >= 0 {
            (cols.saturating_sub(skip).min(rows), 1)
        } else {
            (rows.saturating_sub(skip).min(cols), 0)
        };
        // `skip` is below the skipped axis extent whenever the diagonal is non-empty.
        let offset = if len > 0 {
            (self.offset as isize + skip as isize * self.strides[axis]) as usize
        } else {
            self.offset
        };
        let mut dims = self.shape.dims()[2..].to_vec();
        let mut strides = self.strides[2..].to_vec();
        dims.push(len);
        strides.push(self.strides[0] + self.strides[1]);
        Ok(self.with_layout(offset, dims, strides))
    }

    /// Enqueues a fill of every element with `value`, casting unsafely.
    ///
    /// Waits for the fill to complete when `ARRAYFAB_EAGER` is set.
    pub fn fill(&self, value: impl Into<Scalar>) -> ArrayResult<()> {
        self.backend
            .copy_to(self.view(), CopySource::Scalar(value.into()), Casting::Unsafe)?;
        env::settle(self.backend.as_ref())?;
        Ok(())
    }

    /// Enqueues an element-wise copy from `src`, which must match this shape
    /// or hold a single element.
    pub fn copy_from(&self, src: &Array<B>, casting: Casting) -> ArrayResult<()> {
        if !Arc::ptr_eq(&self.backend, &src.backend) {
            return Err(ArrayError::invalid_argument(
                "source and destination arrays live on different backends",
            ));
        }
        self.backend
            .copy_to(self.view(), CopySource::View(src.view()), casting)?;
        Ok(())
    }

    /// Casts to `dtype`, keeping the memory layout as closely as possible.
    ///
    /// With `copy == false` and a matching dtype the array itself is returned.
    pub fn astype(&self, dtype: DType, copy: bool) -> ArrayResult<Self> {
        if !copy && dtype == self.dtype {
            return Ok(self.clone());
        }
        let plan = plan_like(self, dtype, Order::Keep, None)?;
        let out = Array::new(
            &self.backend,
            self.shape.clone(),
            dtype,
            plan.buffer,
            plan.strides,
            plan.order,
        )?;
        out.copy_from(self, Casting::Unsafe)?;
        Ok(out)
    }

    /// Reads the elements back in logical row-major order, converting to `T`.
    pub fn to_vec<T: Element>(&self) -> ArrayResult<Vec<T>> {
        let bytes = self.backend.read_to_host(self.view())?;
        Ok(decode_elements(self.dtype, &bytes))
    }
}

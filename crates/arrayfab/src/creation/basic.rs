//! Shape-based and prototype-based constructors.
//!
//! The `*_like` routines take their layout from the order resolver, so a
//! transposed prototype yields a result with the same per-axis memory order
//! unless the caller asks for a specific order or changes the rank.

use std::sync::Arc;

use half::{bf16, f16};

use super::factory::make;
use crate::array::Array;
use crate::backend::spec::{ArrayBackend, CopySource};
use crate::env;
use crate::error::{ArrayError, ArrayResult};
use crate::layout::order::{Order, ResolvedOrder};
use crate::layout::resolver::{plan_like, LayoutPlan};
use crate::tensor::{infer_dtype, Casting, DType, Scalar, Shape};

/// Dtype used by shape-based constructors when the caller has no preference.
pub const DEFAULT_DTYPE: DType = DType::F64;

/// Options shared by the `*_like` constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeOptions {
    /// Overrides the prototype's dtype.
    pub dtype: Option<DType>,
    /// Requested order; defaults to `'K'`.
    pub order: Order,
    /// Array subclass request. Only the default (`None`) is supported.
    pub subok: Option<bool>,
    /// Overrides the prototype's shape. An empty override keeps the prototype shape.
    pub shape: Option<Shape>,
}

impl Default for LikeOptions {
    fn default() -> Self {
        LikeOptions {
            dtype: None,
            order: Order::Keep,
            subok: None,
            shape: None,
        }
    }
}

impl LikeOptions {
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn with_subok(mut self, subok: bool) -> Self {
        self.subok = Some(subok);
        self
    }

    pub fn with_shape(mut self, shape: impl Into<Shape>) -> Self {
        self.shape = Some(shape.into());
        self
    }
}

/// Value written into every element by [`full`] and [`full_like`].
pub enum FillValue<'a, B: ArrayBackend> {
    Scalar(Scalar),
    /// An array with the destination's shape or a single element.
    Array(&'a Array<B>),
}

impl<B: ArrayBackend> FillValue<'_, B> {
    /// The dtype a fill of this value produces when none is requested.
    pub fn natural_dtype(&self) -> DType {
        match self {
            FillValue::Scalar(value) => infer_dtype(value),
            FillValue::Array(array) => array.dtype(),
        }
    }
}

impl<B: ArrayBackend> From<Scalar> for FillValue<'_, B> {
    fn from(value: Scalar) -> Self {
        FillValue::Scalar(value)
    }
}

impl<'a, B: ArrayBackend> From<&'a Array<B>> for FillValue<'a, B> {
    fn from(array: &'a Array<B>) -> Self {
        FillValue::Array(array)
    }
}

/// Input accepted by [`astype`]; only arrays can be cast.
pub enum Operand<'a, B: ArrayBackend> {
    Array(&'a Array<B>),
    Scalar(Scalar),
}

impl<'a, B: ArrayBackend> From<&'a Array<B>> for Operand<'a, B> {
    fn from(array: &'a Array<B>) -> Self {
        Operand::Array(array)
    }
}

impl<B: ArrayBackend> From<Scalar> for Operand<'_, B> {
    fn from(value: Scalar) -> Self {
        Operand::Scalar(value)
    }
}

macro_rules! host_scalar_conversions {
    ($($ty:ty),*) => {
        $(
            impl<B: ArrayBackend> From<$ty> for FillValue<'_, B> {
                fn from(value: $ty) -> Self {
                    FillValue::Scalar(Scalar::from(value))
                }
            }

            impl<B: ArrayBackend> From<$ty> for Operand<'_, B> {
                fn from(value: $ty) -> Self {
                    Operand::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

host_scalar_conversions!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f16, bf16, f32, f64);

fn finish_fill<B: ArrayBackend>(array: &Array<B>) -> ArrayResult<()> {
    env::settle(array.backend().as_ref())?;
    Ok(())
}

fn zero_fill<B: ArrayBackend>(array: &Array<B>) -> ArrayResult<()> {
    array
        .backend()
        .memset_async(array.buffer(), array.offset(), 0, array.nbytes())?;
    finish_fill(array)
}

fn value_fill<B: ArrayBackend>(array: &Array<B>, value: &FillValue<'_, B>) -> ArrayResult<()> {
    match value {
        FillValue::Scalar(scalar) => {
            array
                .backend()
                .copy_to(array.view(), CopySource::Scalar(*scalar), Casting::Unsafe)?;
        }
        FillValue::Array(src) => array.copy_from(src, Casting::Unsafe)?,
    }
    finish_fill(array)
}

fn new_like<B: ArrayBackend>(prototype: &Array<B>, options: &LikeOptions) -> ArrayResult<Array<B>> {
    if options.subok.is_some() {
        return Err(ArrayError::not_supported("subok is not supported yet"));
    }
    let dtype = options.dtype.unwrap_or(prototype.dtype());
    let plan = plan_like(prototype, dtype, options.order, options.shape.as_ref())?;
    let shape = match &options.shape {
        Some(shape) if shape.rank() > 0 => shape.clone(),
        _ => prototype.shape().clone(),
    };
    make(prototype.backend(), shape, dtype, plan)
}

/// Returns an array without initializing the elements.
pub fn empty<B: ArrayBackend>(
    backend: &Arc<B>,
    shape: impl Into<Shape>,
    dtype: DType,
    order: ResolvedOrder,
) -> ArrayResult<Array<B>> {
    make(backend, shape, dtype, LayoutPlan::standard(order))
}

/// Returns an uninitialized array laid out like `prototype`.
pub fn empty_like<B: ArrayBackend>(
    prototype: &Array<B>,
    options: &LikeOptions,
) -> ArrayResult<Array<B>> {
    new_like(prototype, options)
}

/// Returns an array filled with zeros.
///
/// The fill is enqueued as a memset over the whole allocation and is not
/// waited on.
pub fn zeros<B: ArrayBackend>(
    backend: &Arc<B>,
    shape: impl Into<Shape>,
    dtype: DType,
    order: ResolvedOrder,
) -> ArrayResult<Array<B>> {
    let array = empty(backend, shape, dtype, order)?;
    zero_fill(&array)?;
    Ok(array)
}

pub fn zeros_like<B: ArrayBackend>(
    prototype: &Array<B>,
    options: &LikeOptions,
) -> ArrayResult<Array<B>> {
    let array = new_like(prototype, options)?;
    zero_fill(&array)?;
    Ok(array)
}

/// Returns an array filled with ones.
pub fn ones<B: ArrayBackend>(
    backend: &Arc<B>,
    shape: impl Into<Shape>,
    dtype: DType,
    order: ResolvedOrder,
) -> ArrayResult<Array<B>> {
    let array = empty(backend, shape, dtype, order)?;
    value_fill(&array, &FillValue::Scalar(Scalar::one()))?;
    Ok(array)
}

pub fn ones_like<B: ArrayBackend>(
    prototype: &Array<B>,
    options: &LikeOptions,
) -> ArrayResult<Array<B>> {
    let array = new_like(prototype, options)?;
    value_fill(&array, &FillValue::Scalar(Scalar::one()))?;
    Ok(array)
}

/// Returns an array filled with `fill_value`.
///
/// Without an explicit dtype the result takes the fill array's dtype, or the
/// dtype inferred from the host scalar. Values are cast unsafely.
pub fn full<'a, B: ArrayBackend + 'a>(
    backend: &Arc<B>,
    shape: impl Into<Shape>,
    fill_value: impl Into<FillValue<'a, B>>,
    dtype: Option<DType>,
    order: ResolvedOrder,
) -> ArrayResult<Array<B>> {
    let fill_value = fill_value.into();
    let dtype = dtype.unwrap_or_else(|| fill_value.natural_dtype());
    let array = empty(backend, shape, dtype, order)?;
    value_fill(&array, &fill_value)?;
    Ok(array)
}

/// Returns an array laid out like `prototype` and filled with `fill_value`.
///
/// The dtype defaults to the prototype's, not the fill value's.
pub fn full_like<'a, B: ArrayBackend + 'a>(
    prototype: &Array<B>,
    fill_value: impl Into<FillValue<'a, B>>,
    options: &LikeOptions,
) -> ArrayResult<Array<B>> {
    let fill_value = fill_value.into();
    let array = new_like(prototype, options)?;
    value_fill(&array, &fill_value)?;
    Ok(array)
}

/// Returns a 2-D array with ones on the `k`-th diagonal and zeros elsewhere.
///
/// `m` defaults to `n`. Positive `k` selects an upper diagonal, negative `k`
/// a lower one.
pub fn eye<B: ArrayBackend>(
    backend: &Arc<B>,
    n: usize,
    m: Option<usize>,
    k: isize,
    dtype: DType,
    order: ResolvedOrder,
) -> ArrayResult<Array<B>> {
    let m = m.unwrap_or(n);
    let array = zeros(backend, [n, m], dtype, order)?;
    if k <= -(n as isize) || k >= m as isize {
        return Ok(array);
    }
    value_fill(&array.diagonal(k)?, &FillValue::Scalar(Scalar::one()))?;
    Ok(array)
}

/// Returns the `n`×`n` identity matrix.
pub fn identity<B: ArrayBackend>(
    backend: &Arc<B>,
    n: usize,
    dtype: DType,
) -> ArrayResult<Array<B>> {
    eye(backend, n, None, 0, dtype, ResolvedOrder::RowMajor)
}

/// Copies an array to `dtype`.
///
/// With `copy == false` and a matching dtype the input array is returned
/// without allocating. Non-array operands are rejected.
pub fn astype<'a, B: ArrayBackend + 'a>(
    x: impl Into<Operand<'a, B>>,
    dtype: DType,
    copy: bool,
) -> ArrayResult<Array<B>> {
    match x.into() {
        Operand::Array(array) => array.astype(dtype, copy),
        Operand::Scalar(value) => Err(ArrayError::type_mismatch(format!(
            "input should be an array, got scalar {value:?}"
        ))),
    }
}

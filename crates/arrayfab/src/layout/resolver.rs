//! Turns an order request against an existing array into an allocation plan.

use tracing::debug;

use super::order::{resolve_order, Order, OrderResolution, ResolvedOrder};
use super::strides::keep_order_strides;
use crate::array::Array;
use crate::backend::spec::ArrayBackend;
use crate::error::{ArrayError, ArrayResult};
use crate::tensor::{DType, Shape};

/// Layout decided for a new array.
///
/// When `strides` is present it overrides `order`, and `buffer` is a fresh
/// allocation sized for the target element count.
pub struct LayoutPlan<B: ArrayBackend> {
    pub order: ResolvedOrder,
    pub strides: Option<Vec<isize>>,
    pub buffer: Option<B::Buffer>,
}

impl<B: ArrayBackend> LayoutPlan<B> {
    /// Plan using the standard strides of `order`.
    pub fn standard(order: ResolvedOrder) -> Self {
        LayoutPlan {
            order,
            strides: None,
            buffer: None,
        }
    }

    pub fn has_explicit_strides(&self) -> bool {
        self.strides.is_some()
    }
}

impl<B: ArrayBackend> std::fmt::Debug for LayoutPlan<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutPlan")
            .field("order", &self.order)
            .field("strides", &self.strides)
            .field("buffer", &self.buffer.is_some())
            .finish()
    }
}

/// Plans the layout of a new `dtype` array modelled on `source`.
///
/// `shape` is the caller's shape override, passed through as given; an empty
/// override still participates in the rank comparison for `'K'`.
pub fn plan_like<B: ArrayBackend>(
    source: &Array<B>,
    dtype: DType,
    order: Order,
    shape: Option<&Shape>,
) -> ArrayResult<LayoutPlan<B>> {
    let resolution = resolve_order(source.flags(), order, source.ndim(), shape.map(Shape::rank));
    match resolution {
        OrderResolution::Standard(resolved) => {
            debug!(requested = %order, resolved = ?resolved, "resolved array order");
            Ok(LayoutPlan::standard(resolved))
        }
        OrderResolution::KeepSourceLayout => {
            let itemsize = dtype.size_in_bytes();
            let strides = keep_order_strides(
                source.shape().dims(),
                source.strides(),
                itemsize,
                shape.map(Shape::dims),
            )
            .ok_or(ArrayError::ShapeOverflow)?;
            let count = shape
                .unwrap_or(source.shape())
                .checked_num_elements()
                .ok_or(ArrayError::ShapeOverflow)?;
            let nbytes = count
                .checked_mul(itemsize)
                .ok_or(ArrayError::ShapeOverflow)?;
            let buffer = source.backend().allocate(nbytes)?;
            debug!(
                requested = %order,
                source_strides = ?source.strides(),
                ?strides,
                nbytes,
                "kept source layout with explicit strides"
            );
            Ok(LayoutPlan {
                order: ResolvedOrder::RowMajor,
                strides: Some(strides),
                buffer: Some(buffer),
            })
        }
    }
}

//! Allocation of arrays from a resolved layout plan.

use std::sync::Arc;

use tracing::debug;

use crate::array::Array;
use crate::backend::spec::ArrayBackend;
use crate::error::ArrayResult;
use crate::layout::resolver::LayoutPlan;
use crate::tensor::{DType, Shape};

/// Allocates an array for `plan`, passing explicit buffer and strides through.
///
/// Without explicit strides the array gets the standard strides of
/// `plan.order`. Backend failures (out of memory, invalid layout) propagate
/// unchanged.
pub fn make<B: ArrayBackend>(
    backend: &Arc<B>,
    shape: impl Into<Shape>,
    dtype: DType,
    plan: LayoutPlan<B>,
) -> ArrayResult<Array<B>> {
    let shape = shape.into();
    debug!(
        shape = %shape,
        dtype = %dtype,
        order = ?plan.order,
        explicit_strides = plan.has_explicit_strides(),
        "allocating array"
    );
    Array::new(backend, shape, dtype, plan.buffer, plan.strides, plan.order)
}

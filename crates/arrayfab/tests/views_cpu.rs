use std::sync::Arc;

use anyhow::Result;
use arrayfab::{
    astype, full, Array, ArrayError, BackendError, DType, Operand, Order, ResolvedOrder, Scalar,
};
use arrayfab_backend_ref_cpu::CpuBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn arange(backend: &Arc<CpuBackend>, dims: &[usize]) -> Result<Array<CpuBackend>> {
    let count = dims.iter().product::<usize>();
    let data: Vec<i32> = (0..count as i32).collect();
    Ok(Array::from_vec(backend, dims, data)?)
}

#[test]
fn order_tokens_parse_case_insensitively() {
    assert_eq!(Order::parse("c").ok(), Some(Order::RowMajor));
    assert_eq!(Order::parse("F").ok(), Some(Order::ColMajor));
    assert_eq!(Order::parse("a").ok(), Some(Order::AsSource));
    assert_eq!(Order::parse("K").ok(), Some(Order::Keep));
    let err = Order::parse("Z").expect_err("unknown order token");
    assert!(matches!(err, ArrayError::InvalidArgument(_)));
}

#[test]
fn transpose_and_swapaxes_read_back_permuted() -> Result<()> {
    let backend = Arc::new(CpuBackend::new());
    let base = arange(&backend, &[2, 3])?;

    let transposed = base.transpose(None)?;
    assert_eq!(transposed.shape().dims(), &[3, 2]);
    assert_eq!(transposed.to_vec::<i32>()?, vec![0, 3, 1, 4, 2, 5]);
    assert!(transposed.shares_buffer_with(&base));

    let swapped = base.swapaxes(0, -1)?;
    assert_eq!(swapped.strides(), transposed.strides());
    Ok(())
}

#[test]
fn moveaxis_keeps_remaining_axes_in_order() -> Result<()> {
    let backend = Arc::new(CpuBackend::new());
    let base = arange(&backend, &[2, 3, 4, 5])?;

    let moved = base.moveaxis(&[0], &[-1])?;
    assert_eq!(moved.shape().dims(), &[3, 4, 5, 2]);

    let moved = base.moveaxis(&[3, 0], &[0, 2])?;
    assert_eq!(moved.shape().dims(), &[5, 3, 2, 4]);
    Ok(())
}

#[test]
fn view_axis_errors_are_reported() -> Result<()> {
    let backend = Arc::new(CpuBackend::new());
    let base = arange(&backend, &[2, 3, 4])?;

    let err = base.transpose(Some(&[0, 1])).expect_err("axes length");
    assert!(matches!(err, ArrayError::InvalidArgument(_)), "{err}");

    let err = base.transpose(Some(&[0, 0, 1])).expect_err("repeated axis");
    assert!(matches!(err, ArrayError::InvalidArgument(_)), "{err}");

    let err = base.swapaxes(0, 3).expect_err("axis out of range");
    assert!(matches!(err, ArrayError::Axis { axis: 3, ndim: 3 }), "{err}");

    let err = base.moveaxis(&[-4], &[0]).expect_err("axis out of range");
    assert!(matches!(err, ArrayError::Axis { axis: -4, ndim: 3 }), "{err}");

    let err = base.moveaxis(&[0, 1], &[2]).expect_err("length mismatch");
    assert!(matches!(err, ArrayError::InvalidArgument(_)), "{err}");

    let err = base.moveaxis(&[0, 0], &[1, 2]).expect_err("repeated source");
    assert!(matches!(err, ArrayError::InvalidArgument(_)), "{err}");
    Ok(())
}

#[test]
fn random_transposes_round_trip() -> Result<()> {
    let backend = Arc::new(CpuBackend::new());
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..16 {
        let rank = rng.gen_range(1..=4);
        let dims: Vec<usize> = (0..rank).map(|_| rng.gen_range(1..=3)).collect();
        let mut perm: Vec<isize> = (0..rank as isize).collect();
        perm.shuffle(&mut rng);
        let mut inverse = vec![0isize; rank];
        for (position, &axis) in perm.iter().enumerate() {
            inverse[axis as usize] = position as isize;
        }

        let base = arange(&backend, &dims)?;
        let restored = base.transpose(Some(&perm))?.transpose(Some(&inverse))?;
        assert!(restored.same_array(&base), "dims {dims:?} perm {perm:?}");
    }
    Ok(())
}

#[test]
fn diagonal_views_select_offsets() -> Result<()> {
    let backend = Arc::new(CpuBackend::new());
    let base = arange(&backend, &[3, 4])?;

    assert_eq!(base.diagonal(0)?.to_vec::<i32>()?, vec![0, 5, 10]);
    assert_eq!(base.diagonal(2)?.to_vec::<i32>()?, vec![2, 7]);
    assert_eq!(base.diagonal(-1)?.to_vec::<i32>()?, vec![4, 9]);
    assert_eq!(base.diagonal(5)?.size(), 0);
    assert_eq!(base.diagonal(-3)?.size(), 0);
    for k in [isize::MAX, isize::MAX / 4, isize::MIN, isize::MIN + 1] {
        let empty = base.diagonal(k)?;
        assert_eq!(empty.shape().dims(), &[0], "k = {k}");
        assert_eq!(empty.offset(), base.offset());
    }

    let row = arange(&backend, &[4])?;
    assert!(matches!(row.diagonal(0), Err(ArrayError::InvalidArgument(_))));
    Ok(())
}

#[test]
fn astype_rejects_non_array_operand() {
    let err = astype(Operand::<CpuBackend>::from(Scalar::from(3i64)), DType::F32, false)
        .expect_err("scalars cannot be cast");
    assert!(matches!(err, ArrayError::TypeMismatch(_)));
}

#[test]
fn allocation_failure_propagates_from_creation() {
    let backend = Arc::new(CpuBackend::with_memory_limit(64));
    let err = full(&backend, [16], 1.0f64, None, ResolvedOrder::RowMajor)
        .expect_err("128 bytes exceeds the limit");
    assert!(matches!(
        err,
        ArrayError::Backend(BackendError::OutOfMemory { requested: 128, .. })
    ));
}

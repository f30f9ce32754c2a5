//! Backend-agnostic checks for array creation semantics.
//!
//! Every check takes a shared backend handle and returns an error describing
//! the first violated expectation.

use std::sync::Arc;

use anyhow::{bail, ensure, Result};
use arrayfab::backend::spec::ArrayBackend;
use arrayfab::creation::basic::DEFAULT_DTYPE;
use arrayfab::{
    astype, empty, empty_like, eye, full, full_like, identity, ones, ones_like, zeros,
    zeros_like, Array, ArrayError, BackendError, DType, LikeOptions, Operand, Order,
    ResolvedOrder, Scalar, Shape,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const SHAPES: &[&[usize]] = &[&[], &[0], &[3], &[2, 3, 4], &[1, 5, 1]];

/// Row-major `f64` array holding `0, 1, 2, ...`.
pub fn arange<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
    shape: impl Into<Shape>,
) -> Result<Array<B>> {
    let shape = shape.into();
    let data: Vec<f64> = (0..shape.num_elements()).map(|v| v as f64).collect();
    Ok(Array::from_vec(backend, shape, data)?)
}

fn expect_all(array: &Array<impl ArrayBackend>, expected: f64, what: &str) -> Result<()> {
    let values = array.to_vec::<f64>()?;
    ensure!(
        values.len() == array.size(),
        "{what}: read back {} values for size {}",
        values.len(),
        array.size()
    );
    ensure!(
        values.iter().all(|&v| v == expected),
        "{what}: expected every element to be {expected}, got {values:?}"
    );
    Ok(())
}

pub fn zeros_fill_every_dtype<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    for &dtype in DType::ALL.iter() {
        for &dims in SHAPES {
            for order in [ResolvedOrder::RowMajor, ResolvedOrder::ColMajor] {
                let array = zeros(backend, dims, dtype, order)?;
                ensure!(array.shape().dims() == dims, "zeros shape mismatch");
                ensure!(array.dtype() == dtype, "zeros dtype mismatch");
                expect_all(&array, 0.0, &format!("zeros({dims:?}, {dtype}, {order:?})"))?;
            }
        }
    }
    Ok(())
}

pub fn ones_fill_every_dtype<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    for &dtype in DType::ALL.iter() {
        for &dims in SHAPES {
            let array = ones(backend, dims, dtype, ResolvedOrder::ColMajor)?;
            ensure!(array.dtype() == dtype, "ones dtype mismatch");
            expect_all(&array, 1.0, &format!("ones({dims:?}, {dtype})"))?;
        }
    }
    Ok(())
}

pub fn full_casts_fill_value<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    let truncated = full(backend, [2, 3], 2.75f64, Some(DType::I32), ResolvedOrder::RowMajor)?;
    expect_all(&truncated, 2.0, "full 2.75 as int32")?;

    let wrapped = full(backend, [4], -1i64, Some(DType::U8), ResolvedOrder::RowMajor)?;
    expect_all(&wrapped, 255.0, "full -1 as uint8")?;

    let rounded = full(backend, [2], 0.1f64, Some(DType::F16), ResolvedOrder::RowMajor)?;
    let expected = half::f16::from_f64(0.1).to_f64();
    expect_all(&rounded, expected, "full 0.1 as float16")?;

    let flags = full(backend, [3], 0.5f32, Some(DType::Bool), ResolvedOrder::RowMajor)?;
    ensure!(flags.to_vec::<bool>()? == vec![true; 3], "full 0.5 as bool");
    Ok(())
}

pub fn full_infers_dtype<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    let int = full(backend, [2], 7i32, None, ResolvedOrder::RowMajor)?;
    ensure!(int.dtype().is_integer(), "integer fill should give an integer dtype");
    expect_all(&int, 7.0, "full 7")?;

    let float = full(backend, [2], 0.5f64, None, ResolvedOrder::RowMajor)?;
    ensure!(float.dtype().is_float(), "float fill should give a float dtype");

    let flag = full(backend, [2], true, None, ResolvedOrder::RowMajor)?;
    ensure!(flag.dtype() == DType::Bool, "bool fill should give bool");

    let source = Array::from_vec(backend, [1], vec![3.5f32])?;
    let from_array = full(backend, [2, 2], &source, None, ResolvedOrder::RowMajor)?;
    ensure!(from_array.dtype() == DType::F32, "array fill should take its dtype");
    expect_all(&from_array, 3.5, "full from one-element array")?;

    let like = full_like(&int, 2.5f64, &LikeOptions::default())?;
    ensure!(like.dtype() == int.dtype(), "full_like keeps the prototype dtype");
    expect_all(&like, 2.0, "full_like 2.5 into int")?;
    Ok(())
}

pub fn full_with_array_fill_copies_elements<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
) -> Result<()> {
    let source = arange(backend, [2, 2])?;
    let filled = full(backend, [2, 2], &source, Some(DType::I32), ResolvedOrder::ColMajor)?;
    ensure!(filled.is_f_contiguous(), "full honours the requested order");
    ensure!(
        filled.to_vec::<i32>()? == vec![0, 1, 2, 3],
        "full copies a same-shape fill array element-wise"
    );

    let wrong = arange(backend, [3])?;
    match full(backend, [2, 2], &wrong, None, ResolvedOrder::RowMajor) {
        Err(ArrayError::Backend(BackendError::ShapeMismatch { .. })) => Ok(()),
        other => bail!("expected a shape mismatch, got {other:?}"),
    }
}

pub fn zeros_like_keeps_contiguous_layouts<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
) -> Result<()> {
    let c_source = empty(backend, [2, 3, 4], DType::F32, ResolvedOrder::RowMajor)?;
    let c_like = zeros_like(&c_source, &LikeOptions::default())?;
    ensure!(c_like.is_c_contiguous(), "C source should give C result");
    ensure!(c_like.strides() == c_source.strides(), "C strides differ");
    expect_all(&c_like, 0.0, "zeros_like of C source")?;

    let f_source = empty(backend, [2, 3, 4], DType::F32, ResolvedOrder::ColMajor)?;
    let f_like = zeros_like(&f_source, &LikeOptions::default().with_dtype(DType::F64))?;
    ensure!(f_like.is_f_contiguous(), "F source should give F result");
    ensure!(f_like.strides() == [8, 16, 48], "F strides {:?}", f_like.strides());
    expect_all(&f_like, 0.0, "zeros_like of F source")?;
    Ok(())
}

pub fn zeros_like_keeps_permuted_layout<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
) -> Result<()> {
    let base = arange(backend, [2, 3, 4])?;
    let permuted = base.transpose(Some(&[1, 0, 2]))?;
    ensure!(
        !permuted.is_c_contiguous() && !permuted.is_f_contiguous(),
        "permuted view should not be contiguous"
    );

    let like = zeros_like(&permuted, &LikeOptions::default())?;
    ensure!(like.shape() == permuted.shape(), "shape should follow the prototype");
    ensure!(
        like.strides() == permuted.strides(),
        "same dtype keeps identical strides, got {:?}",
        like.strides()
    );
    ensure!(!like.shares_buffer_with(&permuted), "result must be a new allocation");
    expect_all(&like, 0.0, "zeros_like of permuted view")?;

    let narrowed = ones_like(&permuted, &LikeOptions::default().with_dtype(DType::F32))?;
    ensure!(
        narrowed.strides() == [16, 48, 4],
        "float32 keep-order strides {:?}",
        narrowed.strides()
    );
    expect_all(&narrowed, 1.0, "ones_like of permuted view")?;

    let reversed = base.transpose(None)?;
    let reversed_like = empty_like(&reversed, &LikeOptions::default())?;
    ensure!(reversed_like.is_f_contiguous(), "reversed C view is F-contiguous");
    Ok(())
}

pub fn keep_order_matches_random_permutations<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..32 {
        let rank = rng.gen_range(1..=5);
        let dims: Vec<usize> = (0..rank).map(|_| rng.gen_range(1..=4)).collect();
        let mut perm: Vec<usize> = (0..rank).collect();
        perm.shuffle(&mut rng);
        let axes: Vec<isize> = perm.iter().map(|&axis| axis as isize).collect();
        let mut inverse = vec![0isize; rank];
        for (position, &axis) in perm.iter().enumerate() {
            inverse[axis] = position as isize;
        }

        let base = empty(backend, dims.clone(), DType::I16, ResolvedOrder::RowMajor)?;
        let view = base.transpose(Some(&axes))?;
        let like = empty_like(&view, &LikeOptions::default().with_dtype(DType::F64))?;
        let restored = like.transpose(Some(&inverse))?;
        ensure!(
            restored.is_c_contiguous(),
            "dims {dims:?} perm {perm:?}: keep-order strides {:?} do not mirror the source",
            like.strides()
        );
    }
    Ok(())
}

pub fn empty_like_rank_change_is_row_major<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
) -> Result<()> {
    let f_source = empty(backend, [3, 4], DType::F32, ResolvedOrder::ColMajor)?;
    let reshaped = empty_like(&f_source, &LikeOptions::default().with_shape([2, 3, 2]))?;
    ensure!(reshaped.shape().dims() == [2, 3, 2], "shape override ignored");
    ensure!(
        reshaped.is_c_contiguous(),
        "rank change with order K must fall back to C, got strides {:?}",
        reshaped.strides()
    );

    let permuted = arange(backend, [2, 3, 4])?.transpose(Some(&[2, 0, 1]))?;
    let flattened = empty_like(&permuted, &LikeOptions::default().with_shape([24]))?;
    ensure!(flattened.is_c_contiguous(), "1-d override is C-contiguous");

    let same_rank = empty_like(&permuted, &LikeOptions::default().with_shape([5, 1, 2]))?;
    ensure!(same_rank.shape().dims() == [5, 1, 2], "shape override ignored");
    ensure!(
        same_rank.transpose(Some(&[1, 2, 0]))?.is_c_contiguous(),
        "same-rank override keeps the source axis order, got strides {:?}",
        same_rank.strides()
    );

    let unchanged = empty_like(&f_source, &LikeOptions::default().with_shape(Shape::scalar()))?;
    ensure!(
        unchanged.shape() == f_source.shape(),
        "an empty shape override keeps the prototype shape"
    );
    Ok(())
}

pub fn explicit_orders_override_source<B: ArrayBackend + 'static>(
    backend: &Arc<B>,
) -> Result<()> {
    let f_source = empty(backend, [3, 4], DType::F64, ResolvedOrder::ColMajor)?;
    let c_source = empty(backend, [3, 4], DType::F64, ResolvedOrder::RowMajor)?;
    let permuted = arange(backend, [2, 3, 4])?.transpose(Some(&[1, 0, 2]))?;

    let with = |order| LikeOptions::default().with_order(order);
    ensure!(empty_like(&f_source, &with(Order::AsSource))?.is_f_contiguous(), "A on F");
    ensure!(
        !empty_like(&f_source, &with(Order::AsSource))?.is_c_contiguous(),
        "A on F should not be C"
    );
    ensure!(empty_like(&c_source, &with(Order::AsSource))?.is_c_contiguous(), "A on C");
    ensure!(empty_like(&permuted, &with(Order::AsSource))?.is_c_contiguous(), "A on view");
    ensure!(empty_like(&c_source, &with(Order::ColMajor))?.is_f_contiguous(), "F on C");
    ensure!(empty_like(&f_source, &with(Order::RowMajor))?.is_c_contiguous(), "C on F");
    ensure!(empty_like(&permuted, &with(Order::ColMajor))?.is_f_contiguous(), "F on view");
    ensure!(empty_like(&f_source, &with(Order::Keep))?.is_f_contiguous(), "K on F");
    Ok(())
}

pub fn like_rejects_subok<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    let prototype = zeros(backend, [2, 2], DEFAULT_DTYPE, ResolvedOrder::RowMajor)?;
    for subok in [true, false] {
        let options = LikeOptions::default().with_subok(subok);
        let results = [
            ("empty_like", empty_like(&prototype, &options)),
            ("zeros_like", zeros_like(&prototype, &options)),
            ("ones_like", ones_like(&prototype, &options)),
            ("full_like", full_like(&prototype, 1.0f64, &options)),
        ];
        for (name, result) in results {
            ensure!(
                matches!(result, Err(ArrayError::NotSupported(_))),
                "{name} with subok={subok} should be rejected, got {result:?}"
            );
        }
    }
    Ok(())
}

pub fn astype_copy_semantics<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    let source = Array::from_vec(backend, [2, 3], vec![0.5f32, 1.5, -2.5, 3.0, 4.25, 5.0])?;

    let same = astype(&source, DType::F32, false)?;
    ensure!(same.same_array(&source), "copy=false with same dtype returns the input");

    let copied = astype(&source, DType::F32, true)?;
    ensure!(!copied.shares_buffer_with(&source), "copy=true allocates");
    ensure!(
        copied.to_vec::<f32>()? == source.to_vec::<f32>()?,
        "copy=true preserves contents"
    );

    let cast = astype(&source, DType::I32, false)?;
    ensure!(!cast.shares_buffer_with(&source), "dtype change allocates");
    ensure!(cast.to_vec::<i32>()? == vec![0, 1, -2, 3, 4, 5], "astype truncates");

    let transposed = source.transpose(None)?;
    let kept = transposed.astype(DType::F64, true)?;
    ensure!(kept.is_f_contiguous(), "astype keeps the source layout");
    ensure!(
        kept.to_vec::<f64>()? == vec![0.5, 3.0, 1.5, 4.25, -2.5, 5.0],
        "astype copies logical order"
    );

    match astype(Operand::<B>::from(Scalar::from(1.0f64)), DType::F32, true) {
        Err(ArrayError::TypeMismatch(_)) => Ok(()),
        other => bail!("scalar input should be a type mismatch, got {other:?}"),
    }
}

pub fn eye_and_identity<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    let id = eye(backend, 3, None, 0, DEFAULT_DTYPE, ResolvedOrder::RowMajor)?;
    ensure!(id.shape().dims() == [3, 3], "eye shape");
    ensure!(
        id.to_vec::<f64>()? == vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        "eye(3) is the identity"
    );

    let upper = eye(backend, 3, None, 1, DType::I32, ResolvedOrder::RowMajor)?;
    ensure!(
        upper.to_vec::<i32>()? == vec![0, 1, 0, 0, 0, 1, 0, 0, 0],
        "eye(3, k=1) fills the superdiagonal"
    );

    let lower = eye(backend, 2, Some(4), -1, DType::U8, ResolvedOrder::ColMajor)?;
    ensure!(lower.is_f_contiguous(), "eye honours order");
    ensure!(
        lower.to_vec::<u8>()? == vec![0, 0, 0, 0, 1, 0, 0, 0],
        "eye(2, 4, k=-1)"
    );

    for k in [3, -3, 10] {
        let empty_diag = eye(backend, 3, None, k, DType::F32, ResolvedOrder::RowMajor)?;
        expect_all(&empty_diag, 0.0, &format!("eye(3, k={k})"))?;
    }

    let ident = identity(backend, 4, DType::F32)?;
    let values = ident.to_vec::<f32>()?;
    for (index, value) in values.iter().enumerate() {
        let expected = if index % 5 == 0 { 1.0 } else { 0.0 };
        ensure!(*value == expected, "identity(4)[{index}] = {value}");
    }
    Ok(())
}

pub fn fills_observe_stream_order<B: ArrayBackend + 'static>(backend: &Arc<B>) -> Result<()> {
    let array = zeros(backend, [16], DType::I64, ResolvedOrder::RowMajor)?;
    array.fill(5i64)?;
    let fresh = zeros_like(&array, &LikeOptions::default())?;
    expect_all(&array, 5.0, "fill after zeros")?;
    expect_all(&fresh, 0.0, "zeros_like after fill")?;

    let uploaded = arange(backend, [4])?;
    uploaded.fill(-1.0f64)?;
    expect_all(&uploaded, -1.0, "fill after upload")?;
    backend.synchronize()?;
    Ok(())
}

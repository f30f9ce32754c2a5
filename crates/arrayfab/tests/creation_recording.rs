use std::sync::Arc;

use arrayfab::{
    astype, empty, empty_like, eye, ones, zeros, ArrayError, Casting, DType, LikeOptions,
    ResolvedOrder, Scalar,
};
use arrayfab_backend_tests::{BackendEvent, RecordedSource, RecordingBackend};

fn backend() -> Arc<RecordingBackend> {
    Arc::new(RecordingBackend::new())
}

#[test]
fn zeros_enqueues_single_memset_without_waiting() {
    let backend = backend();
    let array = zeros(&backend, [4, 5], DType::F32, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("zeros failed: {err}"));
    assert_eq!(array.nbytes(), 80);
    assert_eq!(
        backend.events(),
        vec![
            BackendEvent::Allocate {
                buffer: 0,
                nbytes: 80
            },
            BackendEvent::Memset {
                buffer: 0,
                offset: 0,
                value: 0,
                nbytes: 80
            },
        ]
    );
    assert_eq!(backend.synchronize_count(), 0);
}

#[test]
fn ones_enqueues_unsafe_scalar_copy() {
    let backend = backend();
    ones(&backend, [3], DType::U16, ResolvedOrder::ColMajor)
        .unwrap_or_else(|err| panic!("ones failed: {err}"));
    let events = backend.events();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        BackendEvent::CopyTo {
            buffer: 0,
            shape: vec![3],
            strides: vec![2],
            dtype: DType::U16,
            source: RecordedSource::Scalar(Scalar::one()),
            casting: Casting::Unsafe,
        }
    );
}

#[test]
fn like_with_subok_rejects_before_allocating() {
    let backend = backend();
    let prototype = empty(&backend, [2, 2], DType::F64, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("empty failed: {err}"));
    backend.clear();

    let err = empty_like(&prototype, &LikeOptions::default().with_subok(false))
        .expect_err("subok should be rejected");
    assert!(matches!(err, ArrayError::NotSupported(_)), "{err}");
    assert_eq!(backend.allocation_count(), 0);
}

#[test]
fn keep_order_like_allocates_exact_size_once() {
    let backend = backend();
    let prototype = empty(&backend, [2, 3, 4], DType::F32, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("empty failed: {err}"));
    let permuted = prototype
        .transpose(Some(&[1, 0, 2]))
        .unwrap_or_else(|err| panic!("transpose failed: {err}"));
    backend.clear();

    let like = empty_like(&permuted, &LikeOptions::default().with_dtype(DType::F64))
        .unwrap_or_else(|err| panic!("empty_like failed: {err}"));
    assert_eq!(like.strides(), &[32, 96, 8]);
    assert_eq!(
        backend.events(),
        vec![BackendEvent::Allocate {
            buffer: 1,
            nbytes: 192
        }]
    );
}

#[test]
fn eye_fills_only_the_selected_diagonal() {
    let backend = backend();
    eye(&backend, 3, None, 0, DType::F64, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("eye failed: {err}"));
    let events = backend.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[1], BackendEvent::Memset { nbytes: 72, .. }));
    match &events[2] {
        BackendEvent::CopyTo { shape, strides, .. } => {
            assert_eq!(shape, &vec![3]);
            assert_eq!(strides, &vec![32]);
        }
        other => panic!("expected a diagonal fill, got {other:?}"),
    }
}

#[test]
fn eye_out_of_range_diagonal_skips_fill() {
    let backend = backend();
    eye(&backend, 2, Some(3), -2, DType::I8, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("eye failed: {err}"));
    assert_eq!(backend.events().len(), 2);
}

#[test]
fn astype_without_copy_issues_no_backend_calls() {
    let backend = backend();
    let array = empty(&backend, [8], DType::I32, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("empty failed: {err}"));
    backend.clear();

    let same = astype(&array, DType::I32, false).unwrap_or_else(|err| panic!("{err}"));
    assert!(same.same_array(&array));
    assert!(backend.events().is_empty());

    let cast = astype(&array, DType::I64, false).unwrap_or_else(|err| panic!("{err}"));
    assert!(!cast.shares_buffer_with(&array));
    let events = backend.events();
    assert!(matches!(events[0], BackendEvent::Allocate { nbytes: 64, .. }));
    assert!(matches!(
        events[1],
        BackendEvent::CopyTo {
            casting: Casting::Unsafe,
            source: RecordedSource::View { .. },
            ..
        }
    ));
}

#[test]
fn overflowing_shape_is_rejected_before_allocation() {
    let backend = backend();
    let err = zeros(&backend, [usize::MAX, 2], DType::U8, ResolvedOrder::RowMajor)
        .expect_err("overflow should be reported");
    assert!(matches!(err, ArrayError::ShapeOverflow));
    assert_eq!(backend.allocation_count(), 0);
}

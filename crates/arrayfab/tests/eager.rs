use std::env;
use std::sync::Arc;

use arrayfab::{full, ones_like, zeros, DType, LikeOptions, ResolvedOrder};
use arrayfab_backend_tests::RecordingBackend;

// The switch is read once per process, so this binary holds a single test.
#[test]
fn eager_mode_synchronizes_after_every_fill() {
    env::set_var("ARRAYFAB_EAGER", "1");
    let backend = Arc::new(RecordingBackend::new());

    let first = zeros(&backend, [4], DType::I64, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("zeros failed: {err}"));
    assert_eq!(backend.synchronize_count(), 1);

    zeros(&backend, [2, 2], DType::F32, ResolvedOrder::ColMajor)
        .unwrap_or_else(|err| panic!("zeros failed: {err}"));
    assert_eq!(backend.synchronize_count(), 2);

    first
        .fill(3i64)
        .unwrap_or_else(|err| panic!("fill failed: {err}"));
    assert_eq!(backend.synchronize_count(), 3);

    ones_like(&first, &LikeOptions::default())
        .unwrap_or_else(|err| panic!("ones_like failed: {err}"));
    full(&backend, [3], 2.5f64, None, ResolvedOrder::RowMajor)
        .unwrap_or_else(|err| panic!("full failed: {err}"));
    assert_eq!(backend.synchronize_count(), 5);
}

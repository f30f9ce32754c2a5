pub mod conformance;
pub mod recording_backend;

pub use anyhow;
pub use recording_backend::{BackendEvent, RecordedBuffer, RecordedSource, RecordingBackend};

#[macro_export]
macro_rules! define_backend_tests {
    ($module:ident, $backend_ctor:expr) => {
        #[cfg(test)]
        mod $module {
            #[allow(unused_imports)]
            use super::*;

            use std::sync::Arc;

            use $crate::conformance;

            #[test]
            fn conformance_zeros_fill_every_dtype() -> $crate::anyhow::Result<()> {
                conformance::zeros_fill_every_dtype(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_ones_fill_every_dtype() -> $crate::anyhow::Result<()> {
                conformance::ones_fill_every_dtype(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_full_casts_fill_value() -> $crate::anyhow::Result<()> {
                conformance::full_casts_fill_value(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_full_infers_dtype() -> $crate::anyhow::Result<()> {
                conformance::full_infers_dtype(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_full_with_array_fill_copies_elements() -> $crate::anyhow::Result<()> {
                conformance::full_with_array_fill_copies_elements(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_zeros_like_keeps_contiguous_layouts() -> $crate::anyhow::Result<()> {
                conformance::zeros_like_keeps_contiguous_layouts(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_zeros_like_keeps_permuted_layout() -> $crate::anyhow::Result<()> {
                conformance::zeros_like_keeps_permuted_layout(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_keep_order_matches_random_permutations() -> $crate::anyhow::Result<()>
            {
                conformance::keep_order_matches_random_permutations(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_empty_like_rank_change_is_row_major() -> $crate::anyhow::Result<()> {
                conformance::empty_like_rank_change_is_row_major(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_explicit_orders_override_source() -> $crate::anyhow::Result<()> {
                conformance::explicit_orders_override_source(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_like_rejects_subok() -> $crate::anyhow::Result<()> {
                conformance::like_rejects_subok(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_astype_copy_semantics() -> $crate::anyhow::Result<()> {
                conformance::astype_copy_semantics(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_eye_and_identity() -> $crate::anyhow::Result<()> {
                conformance::eye_and_identity(&Arc::new(($backend_ctor)()))
            }

            #[test]
            fn conformance_fills_observe_stream_order() -> $crate::anyhow::Result<()> {
                conformance::fills_observe_stream_order(&Arc::new(($backend_ctor)()))
            }
        }
    };
}

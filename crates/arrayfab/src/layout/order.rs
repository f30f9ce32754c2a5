//! Memory-order tokens and their resolution against a source array.

use std::fmt;
use std::str::FromStr;

use super::strides::ContiguityFlags;
use crate::error::ArrayError;

/// Requested memory order, as accepted by creation routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// `'C'`: row-major, last axis varies fastest.
    RowMajor,
    /// `'F'`: column-major, first axis varies fastest.
    ColMajor,
    /// `'A'`: column-major if the source is column-major only, row-major otherwise.
    AsSource,
    /// `'K'`: match the source layout as closely as possible.
    Keep,
}

/// Concrete layout an allocation is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolvedOrder {
    #[default]
    RowMajor,
    ColMajor,
}

impl Order {
    /// Parses a single-character order token, ignoring case.
    pub fn parse(token: &str) -> Result<Self, ArrayError> {
        match token.to_ascii_uppercase().as_str() {
            "C" => Ok(Order::RowMajor),
            "F" => Ok(Order::ColMajor),
            "A" => Ok(Order::AsSource),
            "K" => Ok(Order::Keep),
            _ => Err(ArrayError::invalid_argument(format!(
                "order not understood: {token}"
            ))),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Order::RowMajor => 'C',
            Order::ColMajor => 'F',
            Order::AsSource => 'A',
            Order::Keep => 'K',
        }
    }

    /// Applies the source contiguity flags to the `'A'` and `'K'` states.
    ///
    /// `'K'` stays unresolved when the source is neither row- nor column-major.
    pub fn update_with_flags(self, flags: ContiguityFlags) -> Order {
        let only_f = flags.f_contiguous && !flags.c_contiguous;
        match self {
            Order::AsSource if only_f => Order::ColMajor,
            Order::AsSource => Order::RowMajor,
            Order::Keep if only_f => Order::ColMajor,
            Order::Keep if flags.c_contiguous => Order::RowMajor,
            other => other,
        }
    }
}

impl FromStr for Order {
    type Err = ArrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Order::parse(s)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Outcome of resolving a requested order against a source array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderResolution {
    /// Allocate with the standard strides of this order.
    Standard(ResolvedOrder),
    /// Allocate with explicit strides mirroring the source's axis ordering.
    KeepSourceLayout,
}

/// Resolves `order` for a new array modelled on a source of rank `source_rank`.
///
/// Requesting `'K'` together with a target rank different from the source
/// rank falls back to row-major.
pub fn resolve_order(
    flags: ContiguityFlags,
    order: Order,
    source_rank: usize,
    target_rank: Option<usize>,
) -> OrderResolution {
    if order == Order::Keep && target_rank.is_some_and(|rank| rank != source_rank) {
        return OrderResolution::Standard(ResolvedOrder::RowMajor);
    }
    match order.update_with_flags(flags) {
        Order::RowMajor => OrderResolution::Standard(ResolvedOrder::RowMajor),
        Order::ColMajor => OrderResolution::Standard(ResolvedOrder::ColMajor),
        Order::AsSource | Order::Keep => OrderResolution::KeepSourceLayout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C_ONLY: ContiguityFlags = ContiguityFlags {
        c_contiguous: true,
        f_contiguous: false,
    };
    const F_ONLY: ContiguityFlags = ContiguityFlags {
        c_contiguous: false,
        f_contiguous: true,
    };
    const BOTH: ContiguityFlags = ContiguityFlags {
        c_contiguous: true,
        f_contiguous: true,
    };

    #[test]
    fn parse_accepts_known_tokens_case_insensitively() {
        assert_eq!(Order::parse("c").ok(), Some(Order::RowMajor));
        assert_eq!("F".parse::<Order>().ok(), Some(Order::ColMajor));
        assert_eq!(Order::parse("a").ok(), Some(Order::AsSource));
        assert_eq!(Order::parse("K").ok(), Some(Order::Keep));
    }

    #[test]
    fn parse_rejects_unknown_tokens() {
        for token in ["", "X", "CF", "#"] {
            assert!(matches!(
                Order::parse(token),
                Err(ArrayError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn as_source_prefers_row_major_unless_only_f() {
        let resolve = |flags| resolve_order(flags, Order::AsSource, 2, None);
        assert_eq!(resolve(F_ONLY), OrderResolution::Standard(ResolvedOrder::ColMajor));
        assert_eq!(resolve(C_ONLY), OrderResolution::Standard(ResolvedOrder::RowMajor));
        assert_eq!(resolve(BOTH), OrderResolution::Standard(ResolvedOrder::RowMajor));
        assert_eq!(
            resolve(ContiguityFlags::NONE),
            OrderResolution::Standard(ResolvedOrder::RowMajor)
        );
    }

    #[test]
    fn keep_mirrors_source_or_requests_explicit_strides() {
        let resolve = |flags| resolve_order(flags, Order::Keep, 3, Some(3));
        assert_eq!(resolve(F_ONLY), OrderResolution::Standard(ResolvedOrder::ColMajor));
        assert_eq!(resolve(C_ONLY), OrderResolution::Standard(ResolvedOrder::RowMajor));
        assert_eq!(resolve(BOTH), OrderResolution::Standard(ResolvedOrder::RowMajor));
        assert_eq!(resolve(ContiguityFlags::NONE), OrderResolution::KeepSourceLayout);
    }

    #[test]
    fn keep_with_rank_change_falls_back_to_row_major() {
        assert_eq!(
            resolve_order(F_ONLY, Order::Keep, 2, Some(3)),
            OrderResolution::Standard(ResolvedOrder::RowMajor)
        );
        assert_eq!(
            resolve_order(F_ONLY, Order::AsSource, 2, Some(3)),
            OrderResolution::Standard(ResolvedOrder::ColMajor)
        );
    }

    #[test]
    fn explicit_orders_pass_through() {
        assert_eq!(
            resolve_order(ContiguityFlags::NONE, Order::ColMajor, 2, None),
            OrderResolution::Standard(ResolvedOrder::ColMajor)
        );
        assert_eq!(
            resolve_order(F_ONLY, Order::RowMajor, 2, Some(5)),
            OrderResolution::Standard(ResolvedOrder::RowMajor)
        );
    }
}

//! Enumerates the scalar element types an array can hold and the casting rules between them.

use std::fmt;

/// Logical dtype identifier shared between arrays and backend buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// One byte per element, `0` or `1`.
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    /// 16-bit floating point with full mantissa (fp16).
    F16,
    /// 16-bit bfloat16 precision as used by many accelerators.
    BF16,
    F32,
    /// Host float type; default dtype for shape-based constructors.
    F64,
}

/// Broad category of a dtype, ordered from least to most general.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DTypeKind {
    Bool,
    Unsigned,
    Signed,
    Float,
}

/// Rules applied when a copy converts between dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Casting {
    /// Source and destination dtypes must be identical.
    No,
    /// Same as `No` for the dtypes supported here (no byte-order variants).
    Equiv,
    /// Only conversions that preserve every value.
    Safe,
    /// Safe conversions plus narrowing within a kind or towards a more general kind.
    #[default]
    SameKind,
    /// Any conversion, including lossy ones.
    Unsafe,
}

impl DType {
    /// Every supported dtype, in declaration order.
    pub const ALL: [DType; 13] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F16,
        DType::BF16,
        DType::F32,
        DType::F64,
    ];

    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 | DType::F16 | DType::BF16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }

    pub fn kind(self) -> DTypeKind {
        match self {
            DType::Bool => DTypeKind::Bool,
            DType::U8 | DType::U16 | DType::U32 | DType::U64 => DTypeKind::Unsigned,
            DType::I8 | DType::I16 | DType::I32 | DType::I64 => DTypeKind::Signed,
            DType::F16 | DType::BF16 | DType::F32 | DType::F64 => DTypeKind::Float,
        }
    }

    /// Returns `true` when the dtype is any signed or unsigned integer.
    pub fn is_integer(self) -> bool {
        matches!(self.kind(), DTypeKind::Signed | DTypeKind::Unsigned)
    }

    /// Returns `true` when the dtype is a floating-point representation.
    pub fn is_float(self) -> bool {
        self.kind() == DTypeKind::Float
    }

    /// Short lowercase name, e.g. `"float32"`.
    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::F16 => "float16",
            DType::BF16 => "bfloat16",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }

    /// Number of mantissa bits plus one, i.e. the widest integer a float holds exactly.
    fn float_precision_bits(self) -> Option<u32> {
        match self {
            DType::BF16 => Some(8),
            DType::F16 => Some(11),
            DType::F32 => Some(24),
            DType::F64 => Some(53),
            _ => None,
        }
    }

    /// Returns `true` when every value of `self` is representable in `to`.
    pub fn can_cast_safely(self, to: DType) -> bool {
        if self == to {
            return true;
        }
        let from_bits = self.size_in_bytes() * 8;
        let to_bits = to.size_in_bytes() * 8;
        match (self.kind(), to.kind()) {
            (DTypeKind::Bool, _) => true,
            (_, DTypeKind::Bool) => false,
            (DTypeKind::Unsigned, DTypeKind::Unsigned) => from_bits <= to_bits,
            (DTypeKind::Unsigned, DTypeKind::Signed) => from_bits < to_bits,
            (DTypeKind::Signed, DTypeKind::Signed) => from_bits <= to_bits,
            (DTypeKind::Signed, DTypeKind::Unsigned) => false,
            (DTypeKind::Unsigned, DTypeKind::Float) => to
                .float_precision_bits()
                .is_some_and(|bits| from_bits as u32 <= bits),
            (DTypeKind::Signed, DTypeKind::Float) => to
                .float_precision_bits()
                .is_some_and(|bits| from_bits as u32 <= bits + 1),
            (DTypeKind::Float, DTypeKind::Float) => {
                // bf16 and f16 trade range for precision; neither contains the other.
                match (self, to) {
                    (DType::F16 | DType::BF16, DType::F32 | DType::F64) => true,
                    (DType::F32, DType::F64) => true,
                    _ => false,
                }
            }
            (DTypeKind::Float, _) => false,
        }
    }

    /// Returns `true` when a copy from `self` to `to` is allowed under `casting`.
    pub fn can_cast(self, to: DType, casting: Casting) -> bool {
        match casting {
            Casting::No | Casting::Equiv => self == to,
            Casting::Safe => self.can_cast_safely(to),
            Casting::SameKind => self.can_cast_safely(to) || self.kind() <= to.kind(),
            Casting::Unsafe => true,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_casts_follow_widening_rules() {
        assert!(DType::Bool.can_cast_safely(DType::U8));
        assert!(DType::U8.can_cast_safely(DType::I16));
        assert!(!DType::U8.can_cast_safely(DType::I8));
        assert!(DType::I32.can_cast_safely(DType::F64));
        assert!(!DType::I32.can_cast_safely(DType::F32));
        assert!(DType::I16.can_cast_safely(DType::F32));
        assert!(!DType::F16.can_cast_safely(DType::BF16));
        assert!(!DType::F64.can_cast_safely(DType::I64));
    }

    #[test]
    fn same_kind_allows_narrowing_within_kind() {
        assert!(DType::F64.can_cast(DType::F16, Casting::SameKind));
        assert!(DType::I64.can_cast(DType::I8, Casting::SameKind));
        assert!(DType::I64.can_cast(DType::F32, Casting::SameKind));
        assert!(!DType::F32.can_cast(DType::I32, Casting::SameKind));
        assert!(!DType::I8.can_cast(DType::U64, Casting::SameKind));
        assert!(DType::F32.can_cast(DType::I32, Casting::Unsafe));
        assert!(!DType::F32.can_cast(DType::F64, Casting::No));
    }
}

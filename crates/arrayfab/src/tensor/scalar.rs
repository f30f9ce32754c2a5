//! Host-side scalar values, dtype inference, and element byte conversion.

use half::{bf16, f16};

use super::dtype::DType;

/// A host value used to fill arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Returns the natural dtype of a host scalar.
///
/// Booleans map to `Bool`, signed integers to `I64`, unsigned integers to `U64`
/// and floats to `F64`, matching the widest host representation of each kind.
pub fn infer_dtype(value: &Scalar) -> DType {
    match value {
        Scalar::Bool(_) => DType::Bool,
        Scalar::Int(_) => DType::I64,
        Scalar::UInt(_) => DType::U64,
        Scalar::Float(_) => DType::F64,
    }
}

impl Scalar {
    pub fn one() -> Self {
        Scalar::Int(1)
    }

    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(value) => value,
            Scalar::Int(value) => value != 0,
            Scalar::UInt(value) => value != 0,
            Scalar::Float(value) => value != 0.0,
        }
    }

    /// Converts to `i64`, wrapping unsigned values and truncating floats.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Bool(value) => i64::from(value),
            Scalar::Int(value) => value,
            Scalar::UInt(value) => value as i64,
            Scalar::Float(value) => value as i64,
        }
    }

    /// Converts to `u64`, wrapping negative values modulo 2^64.
    pub fn as_u64(self) -> u64 {
        match self {
            Scalar::Bool(value) => u64::from(value),
            Scalar::Int(value) => value as u64,
            Scalar::UInt(value) => value,
            Scalar::Float(value) if value < 0.0 => (value as i64) as u64,
            Scalar::Float(value) => value as u64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(value) => f64::from(u8::from(value)),
            Scalar::Int(value) => value as f64,
            Scalar::UInt(value) => value as f64,
            Scalar::Float(value) => value,
        }
    }

    /// Writes the value as one element of `dtype` in native byte order.
    ///
    /// `out` must be exactly `dtype.size_in_bytes()` long.
    pub fn encode(self, dtype: DType, out: &mut [u8]) {
        match dtype {
            DType::Bool => out.copy_from_slice(&[u8::from(self.as_bool())]),
            DType::I8 => out.copy_from_slice(&(self.as_i64() as i8).to_ne_bytes()),
            DType::I16 => out.copy_from_slice(&(self.as_i64() as i16).to_ne_bytes()),
            DType::I32 => out.copy_from_slice(&(self.as_i64() as i32).to_ne_bytes()),
            DType::I64 => out.copy_from_slice(&self.as_i64().to_ne_bytes()),
            DType::U8 => out.copy_from_slice(&(self.as_u64() as u8).to_ne_bytes()),
            DType::U16 => out.copy_from_slice(&(self.as_u64() as u16).to_ne_bytes()),
            DType::U32 => out.copy_from_slice(&(self.as_u64() as u32).to_ne_bytes()),
            DType::U64 => out.copy_from_slice(&self.as_u64().to_ne_bytes()),
            DType::F16 => out.copy_from_slice(&f16::from_f64(self.as_f64()).to_ne_bytes()),
            DType::BF16 => out.copy_from_slice(&bf16::from_f64(self.as_f64()).to_ne_bytes()),
            DType::F32 => out.copy_from_slice(&(self.as_f64() as f32).to_ne_bytes()),
            DType::F64 => out.copy_from_slice(&self.as_f64().to_ne_bytes()),
        }
    }

    /// Reads one element of `dtype` from native-order bytes.
    ///
    /// `bytes` must be at least `dtype.size_in_bytes()` long.
    pub fn decode(dtype: DType, bytes: &[u8]) -> Scalar {
        match dtype {
            DType::Bool => Scalar::Bool(bytes[0] != 0),
            DType::I8 => Scalar::Int(i64::from(i8::from_ne_bytes(take(bytes)))),
            DType::I16 => Scalar::Int(i64::from(i16::from_ne_bytes(take(bytes)))),
            DType::I32 => Scalar::Int(i64::from(i32::from_ne_bytes(take(bytes)))),
            DType::I64 => Scalar::Int(i64::from_ne_bytes(take(bytes))),
            DType::U8 => Scalar::UInt(u64::from(bytes[0])),
            DType::U16 => Scalar::UInt(u64::from(u16::from_ne_bytes(take(bytes)))),
            DType::U32 => Scalar::UInt(u64::from(u32::from_ne_bytes(take(bytes)))),
            DType::U64 => Scalar::UInt(u64::from_ne_bytes(take(bytes))),
            DType::F16 => Scalar::Float(f16::from_ne_bytes(take(bytes)).to_f64()),
            DType::BF16 => Scalar::Float(bf16::from_ne_bytes(take(bytes)).to_f64()),
            DType::F32 => Scalar::Float(f64::from(f32::from_ne_bytes(take(bytes)))),
            DType::F64 => Scalar::Float(f64::from_ne_bytes(take(bytes))),
        }
    }
}

fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

macro_rules! scalar_from {
    ($variant:ident, $wide:ty, $($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(<$wide>::from(value))
                }
            }
        )*
    };
}

scalar_from!(Int, i64, i8, i16, i32, i64);
scalar_from!(UInt, u64, u8, u16, u32, u64);
scalar_from!(Float, f64, f32, f64);

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<f16> for Scalar {
    fn from(value: f16) -> Self {
        Scalar::Float(value.to_f64())
    }
}

impl From<bf16> for Scalar {
    fn from(value: bf16) -> Self {
        Scalar::Float(value.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_dtype_uses_widest_host_type() {
        assert_eq!(infer_dtype(&Scalar::from(3i32)), DType::I64);
        assert_eq!(infer_dtype(&Scalar::from(3u8)), DType::U64);
        assert_eq!(infer_dtype(&Scalar::from(0.5f32)), DType::F64);
        assert_eq!(infer_dtype(&Scalar::from(true)), DType::Bool);
    }

    fn stored_as(value: Scalar, dtype: DType) -> Scalar {
        let mut bytes = vec![0u8; dtype.size_in_bytes()];
        value.encode(dtype, &mut bytes);
        Scalar::decode(dtype, &bytes)
    }

    #[test]
    fn encoding_wraps_and_truncates() {
        assert_eq!(stored_as(Scalar::Int(300), DType::U8), Scalar::UInt(44));
        assert_eq!(stored_as(Scalar::Int(-1), DType::U16), Scalar::UInt(65535));
        assert_eq!(stored_as(Scalar::Float(2.75), DType::I32), Scalar::Int(2));
        assert_eq!(stored_as(Scalar::Float(0.1), DType::Bool), Scalar::Bool(true));
        assert_eq!(stored_as(Scalar::Float(1.5), DType::F16), Scalar::Float(1.5));
    }

    #[test]
    fn encode_decode_preserves_representable_values() {
        for dtype in DType::ALL {
            let mut buf = vec![0u8; dtype.size_in_bytes()];
            Scalar::one().encode(dtype, &mut buf);
            let value = Scalar::decode(dtype, &buf);
            assert_eq!(value.as_f64(), 1.0, "dtype {dtype}");
        }
    }
}

//! Defines the host element trait used to move typed data in and out of arrays.

use half::{bf16, f16};

use super::{dtype::DType, scalar::Scalar};

/// Rust scalar type with a matching [`DType`].
///
/// Implementations convert through [`Scalar`] so readback can apply the same
/// lossy casting rules as device-side copies.
pub trait Element: Copy + Send + Sync + 'static {
    /// The dtype whose element layout matches `Self`.
    const DTYPE: DType;

    /// Converts a host scalar into this element type with unsafe casting.
    fn from_scalar(value: Scalar) -> Self;

    /// Widens the element into a host scalar.
    fn into_scalar(self) -> Scalar;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident, |$value:ident| $from:expr) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn from_scalar($value: Scalar) -> Self {
                $from
            }

            fn into_scalar(self) -> Scalar {
                Scalar::from(self)
            }
        }
    };
}

impl_element!(bool, Bool, |value| value.as_bool());
impl_element!(i8, I8, |value| value.as_i64() as i8);
impl_element!(i16, I16, |value| value.as_i64() as i16);
impl_element!(i32, I32, |value| value.as_i64() as i32);
impl_element!(i64, I64, |value| value.as_i64());
impl_element!(u8, U8, |value| value.as_u64() as u8);
impl_element!(u16, U16, |value| value.as_u64() as u16);
impl_element!(u32, U32, |value| value.as_u64() as u32);
impl_element!(u64, U64, |value| value.as_u64());
impl_element!(f16, F16, |value| f16::from_f64(value.as_f64()));
impl_element!(bf16, BF16, |value| bf16::from_f64(value.as_f64()));
impl_element!(f32, F32, |value| value.as_f64() as f32);
impl_element!(f64, F64, |value| value.as_f64());

/// Encodes a typed slice into native-order element bytes.
pub fn encode_elements<T: Element>(values: &[T]) -> Vec<u8> {
    let width = T::DTYPE.size_in_bytes();
    let mut bytes = vec![0u8; values.len() * width];
    for (value, chunk) in values.iter().zip(bytes.chunks_exact_mut(width)) {
        value.into_scalar().encode(T::DTYPE, chunk);
    }
    bytes
}

/// Decodes packed elements of `dtype` and converts each into `T`.
pub fn decode_elements<T: Element>(dtype: DType, bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(dtype.size_in_bytes())
        .map(|chunk| T::from_scalar(Scalar::decode(dtype, chunk)))
        .collect()
}

//! Scalar access for the scan hot loop.
//!
//! Every value read off a scan buffer is unaligned; loads go through
//! byte copies (`from_le_bytes`), never pointer casts. Operand buffers
//! are read the same way, taking the typed prefix of the 8-byte
//! discriminated scalar.

use crate::types::SearchValue;

/// A scalar the scanner can load, compare and do tolerance math on.
///
/// `wadd`/`wsub` wrap for integers; candidate files produced under the
/// original wrap-around tolerance semantics must refine identically.
pub(crate) trait Scalar: Copy + PartialEq + PartialOrd {
    /// Stored width in bytes.
    const WIDTH: usize;
    /// Whether this is an IEEE float kind.
    const IS_FLOAT: bool;
    /// The tolerance unit for increment/decrement modes.
    const ONE: Self;

    /// Unaligned load from the first `WIDTH` bytes of `bytes`.
    fn load(bytes: &[u8]) -> Self;

    /// Typed view of a condition operand.
    fn from_operand(value: &SearchValue) -> Self;

    /// Widening view used by pointer-likeness and bitmask tests.
    /// Signed values sign-extend; floats truncate.
    fn as_u64(self) -> u64;

    /// Wrapping addition (plain addition for floats).
    fn wadd(self, rhs: Self) -> Self;

    /// Wrapping subtraction (plain subtraction for floats).
    fn wsub(self, rhs: Self) -> Self;

    /// Whether the value has no fractional part. Always true for
    /// integers; false for NaN.
    fn is_whole(self) -> bool;
}

macro_rules! impl_scalar_int {
    ($ty:ty, $width:expr) => {
        impl Scalar for $ty {
            const WIDTH: usize = $width;
            const IS_FLOAT: bool = false;
            const ONE: Self = 1;

            #[inline(always)]
            fn load(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $width];
                raw.copy_from_slice(&bytes[..$width]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline(always)]
            fn from_operand(value: &SearchValue) -> Self {
                Self::load(value.raw())
            }

            #[inline(always)]
            fn as_u64(self) -> u64 {
                self as u64
            }

            #[inline(always)]
            fn wadd(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline(always)]
            fn wsub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            #[inline(always)]
            fn is_whole(self) -> bool {
                true
            }
        }
    };
}

macro_rules! impl_scalar_float {
    ($ty:ty, $width:expr) => {
        impl Scalar for $ty {
            const WIDTH: usize = $width;
            const IS_FLOAT: bool = true;
            const ONE: Self = 1.0;

            #[inline(always)]
            fn load(bytes: &[u8]) -> Self {
                let mut raw = [0u8; $width];
                raw.copy_from_slice(&bytes[..$width]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline(always)]
            fn from_operand(value: &SearchValue) -> Self {
                Self::load(value.raw())
            }

            #[inline(always)]
            fn as_u64(self) -> u64 {
                self as u64
            }

            #[inline(always)]
            fn wadd(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline(always)]
            fn wsub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline(always)]
            fn is_whole(self) -> bool {
                self.trunc() == self
            }
        }
    };
}

impl_scalar_int!(u8, 1);
impl_scalar_int!(i8, 1);
impl_scalar_int!(u16, 2);
impl_scalar_int!(i16, 2);
impl_scalar_int!(u32, 4);
impl_scalar_int!(i32, 4);
impl_scalar_int!(u64, 8);
impl_scalar_int!(i64, 8);
impl_scalar_float!(f32, 4);
impl_scalar_float!(f64, 8);

/// Record-value bytes for a narrow match: the typed width, zero-padded.
#[inline(always)]
pub(crate) fn narrow_record_value(bytes: &[u8], width: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw[..width].copy_from_slice(&bytes[..width]);
    u64::from_le_bytes(raw)
}

/// Record-value bytes for an EQ+/EQ++ match: the full 8 bytes.
#[inline(always)]
pub(crate) fn wide_record_value(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unaligned_load() {
        let bytes = [0xFF, 0x2A, 0x00, 0x00, 0x00, 0x80];
        assert_eq!(u32::load(&bytes[1..]), 42);
        assert_eq!(i8::load(&bytes), -1);
        assert_eq!(u16::load(&bytes[4..]), 0x8000);
    }

    #[test]
    fn test_operand_prefix() {
        let value = SearchValue::from_u64(0xFFFF_FFFF_0000_002A);
        assert_eq!(u32::from_operand(&value), 42);
        assert_eq!(u64::from_operand(&value), 0xFFFF_FFFF_0000_002A);
    }

    #[test]
    fn test_signed_widening() {
        assert_eq!((-1i8).as_u64(), u64::MAX);
        assert_eq!((-2i64).as_u64(), u64::MAX - 1);
        assert_eq!(3.9f32.as_u64(), 3);
    }

    #[test]
    fn test_wrapping() {
        assert_eq!(255u8.wadd(1), 0);
        assert_eq!(0u8.wsub(1), 255);
        assert_eq!(1.5f64.wadd(1.0), 2.5);
    }

    #[test]
    fn test_is_whole() {
        assert!(5u32.is_whole());
        assert!(2.0f32.is_whole());
        assert!(!2.5f32.is_whole());
        assert!(!f64::NAN.is_whole());
    }

    #[test]
    fn test_record_values() {
        let bytes = [0x2A, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert_eq!(narrow_record_value(&bytes, 1), 0x2A);
        assert_eq!(narrow_record_value(&bytes, 2), 0x002A);
        assert_eq!(wide_record_value(&bytes), 0x0605_0403_0201_002A);
    }
}

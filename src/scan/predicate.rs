//! Mode predicates evaluated by the scanners.
//!
//! Each predicate is a zero-sized op type; scanners are monomorphized
//! over `(Scalar, ModeOp)` pairs so the hot loop carries no runtime
//! branch on mode or type. Typed operands are derived once per window.

use crate::process::ProcessMetadata;
use crate::scan::value::Scalar;
use crate::types::SearchCondition;

/// Condition operands resolved to a concrete scalar type, plus the
/// extents used by the pointer-likeness modes.
pub(crate) struct TypedOperands<T> {
    pub a: T,
    pub b: T,
    pub a_u32: u32,
    pub heap_base: u64,
    pub heap_end: u64,
    pub main_base: u64,
    pub main_end: u64,
}

impl<T: Scalar> TypedOperands<T> {
    pub fn new(condition: &SearchCondition, metadata: &ProcessMetadata) -> Self {
        TypedOperands {
            a: T::from_operand(&condition.value_a),
            b: T::from_operand(&condition.value_b),
            a_u32: condition.operand_a_as_u32(),
            heap_base: metadata.heap_extents.base,
            heap_end: metadata.heap_extents.end(),
            main_base: metadata.main_extents.base,
            main_end: metadata.main_extents.end(),
        }
    }

    #[inline(always)]
    fn pointer_like(&self, value: u64) -> bool {
        (value >= self.heap_base && value < self.heap_end)
            || (value >= self.main_base && value < self.main_end)
    }
}

/// A predicate specialized into a scanner.
///
/// `previous` is the recorded value from the source file; only the
/// secondary-pass modes look at it. `WIDE` ops reinterpret the full 8
/// bytes at the offset and store all 8 in the record.
pub(crate) trait ModeOp<T: Scalar> {
    const WIDE: bool = false;

    fn matches(ops: &TypedOperands<T>, bytes: &[u8], previous: Option<T>) -> bool;
}

macro_rules! cmp_op {
    ($name:ident, $cmp:tt) => {
        pub(crate) struct $name;

        impl<T: Scalar> ModeOp<T> for $name {
            #[inline(always)]
            fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
                T::load(bytes) $cmp ops.a
            }
        }
    };
}

cmp_op!(OpEq, ==);
cmp_op!(OpNe, !=);
cmp_op!(OpGt, >);
cmp_op!(OpLt, <);
cmp_op!(OpGe, >=);
cmp_op!(OpLe, <=);

pub(crate) struct OpRangeEq;

impl<T: Scalar> ModeOp<T> for OpRangeEq {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        let current = T::load(bytes);
        current >= ops.a && current <= ops.b
    }
}

pub(crate) struct OpRangeLt;

impl<T: Scalar> ModeOp<T> for OpRangeLt {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        let current = T::load(bytes);
        current > ops.a && current < ops.b
    }
}

/// Integer `v & b == a`; always false on float types.
pub(crate) struct OpBitmaskEq;

impl<T: Scalar> ModeOp<T> for OpBitmaskEq {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        if T::IS_FLOAT {
            return false;
        }
        (T::load(bytes).as_u64() & ops.b.as_u64()) == ops.a.as_u64()
    }
}

/// Value-in-heap-or-main test.
pub(crate) struct OpPtr;

impl<T: Scalar> ModeOp<T> for OpPtr {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        ops.pointer_like(T::load(bytes).as_u64())
    }
}

pub(crate) struct OpNotPtr;

impl<T: Scalar> ModeOp<T> for OpNotPtr {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        !ops.pointer_like(T::load(bytes).as_u64())
    }
}

/// Float in `[a, b]` with no fractional part; false on integer types
/// and on NaN.
pub(crate) struct OpNoDecimal;

impl<T: Scalar> ModeOp<T> for OpNoDecimal {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        if !T::IS_FLOAT {
            return false;
        }
        let current = T::load(bytes);
        current >= ops.a && current <= ops.b && current.is_whole()
    }
}

/// Operand-as-u32 equals the 8 bytes reinterpreted as u32, f32 or f64.
pub(crate) struct OpEqPlus;

impl<T: Scalar> ModeOp<T> for OpEqPlus {
    const WIDE: bool = true;

    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        let v_u32 = u32::load(bytes);
        let v_f32 = f32::load(bytes);
        let v_f64 = f64::load(bytes);
        ops.a_u32 == v_u32 || ops.a_u32 as f32 == v_f32 || f64::from(ops.a_u32) == v_f64
    }
}

/// As `OpEqPlus` with a ±1.0 open tolerance on the float views.
pub(crate) struct OpEqPlusPlus;

impl<T: Scalar> ModeOp<T> for OpEqPlusPlus {
    const WIDE: bool = true;

    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], _previous: Option<T>) -> bool {
        let v_u32 = u32::load(bytes);
        let v_f32 = f32::load(bytes);
        let v_f64 = f64::load(bytes);
        let a_f32 = ops.a_u32 as f32;
        let a_f64 = f64::from(ops.a_u32);
        ops.a_u32 == v_u32
            || (v_f32 > a_f32 - 1.0 && v_f32 < a_f32 + 1.0)
            || (v_f64 > a_f64 - 1.0 && v_f64 < a_f64 + 1.0)
    }
}

macro_rules! prev_op {
    ($name:ident, $cmp:tt) => {
        pub(crate) struct $name;

        impl<T: Scalar> ModeOp<T> for $name {
            #[inline(always)]
            fn matches(_ops: &TypedOperands<T>, bytes: &[u8], previous: Option<T>) -> bool {
                match previous {
                    Some(previous) => T::load(bytes) $cmp previous,
                    None => false,
                }
            }
        }
    };
}

prev_op!(OpMore, >);
prev_op!(OpLess, <);
prev_op!(OpDiff, !=);
prev_op!(OpSame, ==);

/// `previous + a` within an exclusive ±1 tolerance. Integer arithmetic
/// wraps; files written under the wrapped semantics must refine the
/// same way.
pub(crate) struct OpIncBy;

impl<T: Scalar> ModeOp<T> for OpIncBy {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], previous: Option<T>) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        let current = T::load(bytes);
        let target = previous.wadd(ops.a);
        current > target.wsub(T::ONE) && current < target.wadd(T::ONE)
    }
}

/// `previous - a` within an exclusive ±1 tolerance, wrapping like
/// `OpIncBy`.
pub(crate) struct OpDecBy;

impl<T: Scalar> ModeOp<T> for OpDecBy {
    #[inline(always)]
    fn matches(ops: &TypedOperands<T>, bytes: &[u8], previous: Option<T>) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        let current = T::load(bytes);
        let target = previous.wsub(ops.a);
        current > target.wsub(T::ONE) && current < target.wadd(T::ONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RegionExtents;
    use crate::types::{SearchMode, SearchType, SearchValue};

    fn ops<T: Scalar>(a: SearchValue, b: SearchValue) -> TypedOperands<T> {
        let condition = SearchCondition::with_range(SearchMode::Eq, SearchType::U32, a, b);
        let mut metadata = ProcessMetadata::default();
        metadata.heap_extents = RegionExtents {
            base: 0x6000,
            size: 0x1000,
        };
        metadata.main_extents = RegionExtents {
            base: 0x8000,
            size: 0x1000,
        };
        TypedOperands::new(&condition, &metadata)
    }

    #[test]
    fn test_ordered_ops() {
        let o = ops::<u32>(SearchValue::from_u64(10), SearchValue::default());
        let bytes = 11u32.to_le_bytes();
        assert!(OpGt::matches(&o, &bytes, None));
        assert!(OpGe::matches(&o, &bytes, None));
        assert!(OpNe::matches(&o, &bytes, None));
        assert!(!OpEq::matches(&o, &bytes, None));
        assert!(!OpLe::matches(&o, &bytes, None));
    }

    #[test]
    fn test_signed_comparison() {
        let o = ops::<i16>(SearchValue::from_i64(-5), SearchValue::default());
        let bytes = (-3i16).to_le_bytes();
        assert!(OpGt::matches(&o, &bytes, None));
        let bytes = (-7i16).to_le_bytes();
        assert!(OpLt::matches(&o, &bytes, None));
    }

    #[test]
    fn test_nan_never_ordered() {
        let o = ops::<f32>(SearchValue::from_f32(1.0), SearchValue::from_f32(10.0));
        let bytes = f32::NAN.to_le_bytes();
        assert!(!OpEq::matches(&o, &bytes, None));
        assert!(!OpGe::matches(&o, &bytes, None));
        assert!(!OpLe::matches(&o, &bytes, None));
        assert!(!OpRangeEq::matches(&o, &bytes, None));
        assert!(!OpNoDecimal::matches(&o, &bytes, None));
        // != is the one comparison NaN satisfies.
        assert!(OpNe::matches(&o, &bytes, None));
    }

    #[test]
    fn test_bitmask_int_only() {
        let o = ops::<u32>(SearchValue::from_u64(0x20), SearchValue::from_u64(0xF0));
        let bytes = 0x2Fu32.to_le_bytes();
        assert!(OpBitmaskEq::matches(&o, &bytes, None));
        let o = ops::<f32>(SearchValue::from_u64(0x20), SearchValue::from_u64(0xF0));
        assert!(!OpBitmaskEq::matches(&o, &bytes, None));
    }

    #[test]
    fn test_pointer_likeness() {
        let o = ops::<u64>(SearchValue::default(), SearchValue::default());
        assert!(OpPtr::matches(&o, &0x6800u64.to_le_bytes(), None));
        assert!(OpPtr::matches(&o, &0x8000u64.to_le_bytes(), None));
        assert!(!OpPtr::matches(&o, &0x9000u64.to_le_bytes(), None));
        assert!(OpNotPtr::matches(&o, &0x9000u64.to_le_bytes(), None));
    }

    #[test]
    fn test_no_decimal() {
        let o = ops::<f32>(SearchValue::from_f32(0.0), SearchValue::from_f32(100.0));
        assert!(OpNoDecimal::matches(&o, &42.0f32.to_le_bytes(), None));
        assert!(!OpNoDecimal::matches(&o, &42.5f32.to_le_bytes(), None));
        assert!(!OpNoDecimal::matches(&o, &(-1.0f32).to_le_bytes(), None));
    }

    #[test]
    fn test_eq_plus_reinterpretations() {
        let o = ops::<u32>(SearchValue::from_u64(42), SearchValue::default());
        let mut bytes = [0u8; 8];

        bytes[..4].copy_from_slice(&42u32.to_le_bytes());
        assert!(OpEqPlus::matches(&o, &bytes, None));

        bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&42.0f32.to_le_bytes());
        assert!(OpEqPlus::matches(&o, &bytes, None));

        bytes = 42.0f64.to_le_bytes();
        assert!(OpEqPlus::matches(&o, &bytes, None));

        bytes = 43.0f64.to_le_bytes();
        assert!(!OpEqPlus::matches(&o, &bytes, None));
        // Within the ±1.0 tolerance only for EQ++.
        bytes = 42.5f64.to_le_bytes();
        assert!(OpEqPlusPlus::matches(&o, &bytes, None));
    }

    #[test]
    fn test_previous_ops() {
        let o = ops::<u16>(SearchValue::default(), SearchValue::default());
        let bytes = 8u16.to_le_bytes();
        assert!(OpMore::matches(&o, &bytes, Some(7)));
        assert!(OpDiff::matches(&o, &bytes, Some(7)));
        assert!(!OpSame::matches(&o, &bytes, Some(7)));
        assert!(OpSame::matches(&o, &bytes, Some(8)));
        assert!(!OpMore::matches(&o, &bytes, None));
    }

    #[test]
    fn test_inc_by_wraps() {
        let o = ops::<u8>(SearchValue::from_u64(100), SearchValue::default());
        // 200 + 100 wraps to 44 in u8 arithmetic.
        assert!(OpIncBy::matches(&o, &[44], Some(200)));
        assert!(!OpIncBy::matches(&o, &[45], Some(200)));
        // Plain case without wrap.
        let o = ops::<u8>(SearchValue::from_u64(5), SearchValue::default());
        assert!(OpIncBy::matches(&o, &[15], Some(10)));
        assert!(!OpIncBy::matches(&o, &[16], Some(10)));
    }

    #[test]
    fn test_dec_by_underflow_wraps() {
        let o = ops::<u8>(SearchValue::from_u64(5), SearchValue::default());
        // 2 - 5 wraps to 253.
        assert!(OpDecBy::matches(&o, &[253], Some(2)));
        assert!(!OpDecBy::matches(&o, &[0], Some(2)));
    }

    #[test]
    fn test_float_inc_by_tolerance() {
        let o = ops::<f32>(SearchValue::from_f32(2.0), SearchValue::default());
        assert!(OpIncBy::matches(&o, &12.5f32.to_le_bytes(), Some(10.9)));
        assert!(!OpIncBy::matches(&o, &14.0f32.to_le_bytes(), Some(10.9)));
    }
}

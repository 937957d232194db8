//! Candidate-refinement window scanners.
//!
//! Same monomorphization scheme as the primary pass, extended with the
//! modes that compare against the previously recorded value.

use crate::error::Result;
use crate::format::CandidateRecord;
use crate::scan::predicate::{
    ModeOp, OpBitmaskEq, OpDecBy, OpDiff, OpEq, OpEqPlus, OpEqPlusPlus, OpGe, OpGt, OpIncBy, OpLe,
    OpLess, OpLt, OpMore, OpNe, OpNoDecimal, OpNotPtr, OpPtr, OpRangeEq, OpRangeLt, OpSame,
    TypedOperands,
};
use crate::scan::value::{narrow_record_value, wide_record_value, Scalar};
use crate::scan::{RecordSink, ScanEnv};
use crate::types::{SearchMode, SearchType};

/// A resolved secondary-pass scanner over one read window covering a
/// run of nearby candidates.
pub(crate) type SecondaryWindowFn =
    fn(&ScanEnv, &[CandidateRecord], u64, &[u8], usize, &mut RecordSink) -> Result<()>;

fn scan_window<T: Scalar, M: ModeOp<T>>(
    env: &ScanEnv,
    records: &[CandidateRecord],
    window_base: u64,
    window: &[u8],
    value_width: usize,
    sink: &mut RecordSink,
) -> Result<()> {
    let ops = TypedOperands::<T>::new(&env.condition, &env.metadata);

    for record in records {
        let offset = (record.address - window_base) as usize;
        let bytes = &window[offset..];
        let previous = T::load(&record.value.to_le_bytes());

        sink.note_scanned(value_width as u64);
        if M::matches(&ops, bytes, Some(previous)) {
            let value = if M::WIDE {
                wide_record_value(bytes)
            } else {
                narrow_record_value(bytes, T::WIDTH)
            };
            sink.push(CandidateRecord {
                address: record.address,
                value,
            })?;
        }
    }
    Ok(())
}

fn for_type<T: Scalar>(mode: SearchMode) -> Option<SecondaryWindowFn> {
    Some(match mode {
        SearchMode::Eq => scan_window::<T, OpEq>,
        SearchMode::Ne => scan_window::<T, OpNe>,
        SearchMode::Gt => scan_window::<T, OpGt>,
        SearchMode::Lt => scan_window::<T, OpLt>,
        SearchMode::Ge => scan_window::<T, OpGe>,
        SearchMode::Le => scan_window::<T, OpLe>,
        SearchMode::RangeEq => scan_window::<T, OpRangeEq>,
        SearchMode::RangeLt => scan_window::<T, OpRangeLt>,
        SearchMode::BitmaskEq => scan_window::<T, OpBitmaskEq>,
        SearchMode::More => scan_window::<T, OpMore>,
        SearchMode::Less => scan_window::<T, OpLess>,
        SearchMode::Diff => scan_window::<T, OpDiff>,
        SearchMode::Same => scan_window::<T, OpSame>,
        SearchMode::IncBy => scan_window::<T, OpIncBy>,
        SearchMode::DecBy => scan_window::<T, OpDecBy>,
        SearchMode::EqPlus => scan_window::<T, OpEqPlus>,
        SearchMode::EqPlusPlus => scan_window::<T, OpEqPlusPlus>,
        SearchMode::Ptr => scan_window::<T, OpPtr>,
        SearchMode::NotPtr => scan_window::<T, OpNotPtr>,
        SearchMode::NoDecimal => scan_window::<T, OpNoDecimal>,
        _ => return None,
    })
}

/// Resolve the window scanner for a condition's `(type, mode)` pair.
pub(crate) fn resolve(ty: SearchType, mode: SearchMode) -> Option<SecondaryWindowFn> {
    match ty {
        SearchType::U8 => for_type::<u8>(mode),
        SearchType::S8 => for_type::<i8>(mode),
        SearchType::U16 => for_type::<u16>(mode),
        SearchType::S16 => for_type::<i16>(mode),
        SearchType::U32 => for_type::<u32>(mode),
        SearchType::S32 => for_type::<i32>(mode),
        SearchType::U64 | SearchType::Pointer | SearchType::U40 => for_type::<u64>(mode),
        SearchType::S64 => for_type::<i64>(mode),
        SearchType::F32 => for_type::<f32>(mode),
        SearchType::F64 => for_type::<f64>(mode),
        _ => for_type::<u32>(mode),
    }
}

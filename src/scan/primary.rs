//! Full-sweep chunk scanners.
//!
//! One generic body, monomorphized per `(scalar, mode)` pair and
//! resolved to a plain function pointer before the memory walk starts.

use crate::error::Result;
use crate::format::CandidateRecord;
use crate::scan::predicate::{
    ModeOp, OpBitmaskEq, OpEq, OpEqPlus, OpEqPlusPlus, OpGe, OpGt, OpLe, OpLt, OpNe, OpNoDecimal,
    OpNotPtr, OpPtr, OpRangeEq, OpRangeLt, TypedOperands,
};
use crate::scan::value::{narrow_record_value, wide_record_value, Scalar};
use crate::scan::{RecordSink, ScanEnv};
use crate::types::{SearchMode, SearchType};

/// A resolved primary-pass scanner over one filled scan window.
pub(crate) type PrimaryChunkFn =
    fn(&ScanEnv, &[u8], usize, u64, &mut RecordSink) -> Result<()>;

fn scan_chunk<T: Scalar, M: ModeOp<T>>(
    env: &ScanEnv,
    chunk: &[u8],
    step: usize,
    read_addr: u64,
    sink: &mut RecordSink,
) -> Result<()> {
    let ops = TypedOperands::<T>::new(&env.condition, &env.metadata);

    let mut off = 0usize;
    while off + T::WIDTH <= chunk.len() {
        // The 8-byte reinterpretation modes cannot match in the last
        // seven bytes of a window.
        if M::WIDE && off + 8 > chunk.len() {
            break;
        }
        let bytes = &chunk[off..];
        if M::matches(&ops, bytes, None) {
            let value = if M::WIDE {
                wide_record_value(bytes)
            } else {
                narrow_record_value(bytes, T::WIDTH)
            };
            sink.push(CandidateRecord {
                address: read_addr + off as u64,
                value,
            })?;
        }
        off += step;
    }
    Ok(())
}

fn for_type<T: Scalar>(mode: SearchMode) -> Option<PrimaryChunkFn> {
    Some(match mode {
        SearchMode::Eq => scan_chunk::<T, OpEq>,
        SearchMode::Ne => scan_chunk::<T, OpNe>,
        SearchMode::Gt => scan_chunk::<T, OpGt>,
        SearchMode::Lt => scan_chunk::<T, OpLt>,
        SearchMode::Ge => scan_chunk::<T, OpGe>,
        SearchMode::Le => scan_chunk::<T, OpLe>,
        SearchMode::RangeEq => scan_chunk::<T, OpRangeEq>,
        SearchMode::RangeLt => scan_chunk::<T, OpRangeLt>,
        SearchMode::BitmaskEq => scan_chunk::<T, OpBitmaskEq>,
        SearchMode::EqPlus => scan_chunk::<T, OpEqPlus>,
        SearchMode::EqPlusPlus => scan_chunk::<T, OpEqPlusPlus>,
        SearchMode::Ptr => scan_chunk::<T, OpPtr>,
        SearchMode::NotPtr => scan_chunk::<T, OpNotPtr>,
        SearchMode::NoDecimal => scan_chunk::<T, OpNoDecimal>,
        _ => return None,
    })
}

/// Resolve the scanner for a condition's `(type, mode)` pair.
///
/// Non-scalar types fall back to a u32 view, matching the width and
/// step defaults.
pub(crate) fn resolve(ty: SearchType, mode: SearchMode) -> Option<PrimaryChunkFn> {
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

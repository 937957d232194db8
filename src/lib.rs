//! Breeze Engine - Live Memory Search and Cheat Execution Core
//!
//! This library is the scan core behind a console cheat-management
//! overlay: it sweeps a live process for values matching a user
//! condition, persists candidate sets in a self-describing binary
//! format, narrows them against live memory, compiles textual cheat
//! scripts into the platform cheat-VM opcode stream, and renders that
//! stream back as human-readable notes.
//!
//! # Features
//!
//! - **Scan engine**: typed, mode-specialized scanners over unaligned
//!   memory windows with primary (full-sweep) and secondary
//!   (candidate-refinement) passes
//! - **Candidate files**: fixed-header binary format with streaming
//!   record I/O and header-rewrite-on-finalize
//! - **Cheat codec**: tolerant text compiler and round-tripping
//!   serializer for the cheat-VM format, with master-code semantics
//! - **Combo gates**: wrap and unwrap cheat bodies in button-mask
//!   conditionals
//! - **Opcode annotator**: total structural decoder with optional
//!   inline ARM64 disassembly of 32-bit literals
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use breeze_engine::{ScanSession, SearchCondition, SearchMode, SearchType, SearchValue};
//! # use breeze_engine::process::CheatProcess;
//! # fn demo(process: &dyn CheatProcess) -> Result<(), breeze_engine::EngineError> {
//! let condition = SearchCondition::new(
//!     SearchMode::Eq,
//!     SearchType::U32,
//!     SearchValue::from_u64(42),
//! );
//! let session = ScanSession::new(process, "/switch/Breeze");
//! let stats = session.start_search(&condition, "1")?;
//! println!("{} candidates", stats.entries_written);
//! # Ok(())
//! # }
//! ```
//!
//! # Capabilities
//!
//! The engine never owns platform resources. The embedding application
//! injects them at call time:
//!
//! - [`process::CheatProcess`] - process metadata, memory map queries,
//!   memory reads
//! - [`cheat::CheatService`] - the process-global cheat registry
//! - [`annotate::Disassembler`] - ARM64 rendering of 32-bit literals
//! - [`cheat::download::HttpFetcher`] - cheat file downloads
//! - [`process::Notifier`] - best-effort user notifications
//!
//! Everything in the core is synchronous and single-threaded; callers
//! serialize runs and observe progress through
//! [`process::ProgressSink`].

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod annotate;
pub mod cheat;
pub mod error;
pub mod format;
pub mod index;
pub mod process;
pub mod scan;
pub mod types;

pub use error::{EngineError, Result};
pub use format::{
    CandidateHeader, CandidateRecord, CandidateSummary, CandidateWriter, FileType,
};
pub use scan::{ScanSession, SearchRunStats};
pub use types::{SearchCondition, SearchMode, SearchPass, SearchType, SearchValue};

use std::path::Path;

/// Read and validate a candidate file header and digest it for display.
///
/// # Arguments
///
/// * `path` - Path to a `.dat` candidate file
///
/// # Returns
///
/// * `Ok(CandidateSummary)` - Digest of the validated header
/// * `Err(EngineError)` - If the file cannot be read or fails
///   validation
pub fn summarize_candidate<P: AsRef<Path>>(path: P) -> Result<CandidateSummary> {
    let header = format::read_header(path)?;
    Ok(CandidateSummary::from_header(&header))
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
    }

    #[test]
    fn test_summarize_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.dat");
        let condition = SearchCondition::new(
            SearchMode::RangeEq,
            SearchType::F32,
            SearchValue::from_f32(1.0),
        );
        let header = CandidateHeader::for_search(condition, Default::default());
        CandidateWriter::create(&path, header)
            .unwrap()
            .finalize(0)
            .unwrap();

        let summary = summarize_candidate(&path).unwrap();
        assert_eq!(summary.mode, "[A..B]");
        assert_eq!(summary.ty, "f32");
        assert_eq!(summary.records, 0);
    }

    #[test]
    fn test_summarize_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.dat");
        std::fs::write(&path, vec![0u8; 1024]).unwrap();
        assert!(summarize_candidate(&path).is_err());
    }
}

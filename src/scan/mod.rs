//! Scan engine.
//!
//! Two passes over the attached process: a primary full sweep of every
//! readable mapping, and a secondary pass that re-reads the candidates
//! of a previous file and keeps the ones still matching. Both stream
//! records through a bounded buffer into a candidate file whose header
//! is finalized on completion.
//!
//! The engine is single-threaded and not reentrant: it owns its scan
//! and record buffers only for the duration of a call, and callers must
//! serialize runs against the same process.

mod predicate;
mod primary;
mod secondary;
mod value;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::format::{CandidateHeader, CandidateRecord, CandidateWriter, RecordReader, RECORD_SIZE};
use crate::index;
use crate::process::{CheatProcess, MemoryPermission, Notifier, ProcessMetadata, ProgressSink};
use crate::types::{SearchCondition, SearchPass};

/// Scan buffer size for the primary pass.
pub const SCAN_BUFFER_BYTES: usize = 2 * 1024 * 1024;

/// Output record buffer size.
pub const OUTPUT_BUFFER_BYTES: usize = 512 * 1024;

/// Input record buffer size for the secondary pass.
pub const CONTINUE_INPUT_BYTES: usize = SCAN_BUFFER_BYTES / 2;

/// Per-window memory buffer size for the secondary pass.
pub const CONTINUE_WINDOW_BYTES: usize = SCAN_BUFFER_BYTES / 2;

/// Statistics of one completed scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchRunStats {
    /// Candidate records written to the output file.
    pub entries_written: u64,
    /// Payload bytes written to the output file.
    pub bytes_written: u64,
    /// Process-memory bytes inspected.
    pub bytes_scanned: u64,
    /// Wall-clock seconds the run took, clamped to 255.
    pub seconds_taken: u32,
    /// Size of the scan (or window) buffer the run used.
    pub scan_buffer_bytes: usize,
}

/// Condition and process context shared by every resolved scanner.
pub(crate) struct ScanEnv {
    pub condition: SearchCondition,
    pub metadata: ProcessMetadata,
}

/// Bounded record buffer in front of the output file.
///
/// Fills to capacity, then flushes before the scanner continues; the
/// scanner never over-commits it.
pub(crate) struct RecordSink {
    writer: CandidateWriter,
    buffer: Vec<CandidateRecord>,
    capacity: usize,
    bytes_scanned: u64,
}

impl RecordSink {
    fn new(writer: CandidateWriter) -> Self {
        let capacity = OUTPUT_BUFFER_BYTES / RECORD_SIZE;
        RecordSink {
            writer,
            buffer: Vec::with_capacity(capacity),
            capacity,
            bytes_scanned: 0,
        }
    }

    pub(crate) fn push(&mut self, record: CandidateRecord) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() == self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    pub(crate) fn note_scanned(&mut self, bytes: u64) {
        self.bytes_scanned += bytes;
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.write_records(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    fn entries_written(&self) -> u64 {
        self.writer.entries_written()
    }

    fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned
    }

    /// Flush, finalize the header, and report
    /// `(entries_written, bytes_written, bytes_scanned)`.
    fn finish(mut self, time_taken: u8) -> Result<(u64, u64, u64)> {
        self.flush()?;
        let entries = self.writer.entries_written();
        let bytes = self.writer.bytes_written();
        let scanned = self.bytes_scanned;
        self.writer.finalize(time_taken)?;
        Ok((entries, bytes, scanned))
    }
}

/// A scan run context: the attached process, the candidate directory,
/// and an optional progress observer.
pub struct ScanSession<'a> {
    process: &'a dyn CheatProcess,
    dir: PathBuf,
    progress: Option<&'a dyn ProgressSink>,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> ScanSession<'a> {
    /// Bind a session to a process capability and a candidate
    /// directory.
    pub fn new(process: &'a dyn CheatProcess, dir: impl Into<PathBuf>) -> Self {
        ScanSession {
            process,
            dir: dir.into(),
            progress: None,
            notifier: None,
        }
    }

    /// Attach a progress observer, called between windows.
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attach a best-effort completion notifier.
    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    fn report(&self, sink: &RecordSink) {
        if let Some(progress) = self.progress {
            progress.on_progress(sink.bytes_scanned(), sink.entries_written());
        }
    }

    /// Run a primary full sweep and write the candidates to
    /// `<dir>/<stem>.dat`.
    ///
    /// Walks the process memory map from address zero, reading each
    /// readable segment through the scan buffer and applying the
    /// resolved predicate at every step offset. Unreadable windows are
    /// skipped; output I/O errors abort the run. The output header is
    /// finalized with the payload size and elapsed seconds.
    pub fn start_search(&self, condition: &SearchCondition, stem: &str) -> Result<SearchRunStats> {
        if !condition.mode.executes_on(SearchPass::Primary) {
            return Err(unsupported(condition, SearchPass::Primary));
        }
        let scan_fn = primary::resolve(condition.ty, condition.mode)
            .ok_or_else(|| unsupported(condition, SearchPass::Primary))?;

        if !self.process.has_cheat_process() {
            self.process.force_open_cheat_process()?;
        }
        let metadata = self.process.metadata()?;
        let mut run_condition = *condition;
        run_condition.step = SearchPass::Primary.step_marker();
        let header = CandidateHeader::for_search(run_condition, metadata);

        let path = index::candidate_path(&self.dir, stem);
        let writer = CandidateWriter::create(path, header)?;
        let mut sink = RecordSink::new(writer);

        let env = ScanEnv {
            condition: run_condition,
            metadata,
        };
        let value_width = condition.ty.byte_width();
        let step = condition.ty.scan_step();
        let mut scan_buffer = vec![0u8; SCAN_BUFFER_BYTES];

        let started = Instant::now();
        let mut cursor = 0u64;
        loop {
            let info = match self.process.query_memory(cursor) {
                Ok(info) => info,
                Err(_) => break,
            };
            // The map is ordered; a non-advancing entry signals the end.
            if info.addr < cursor || info.size == 0 {
                break;
            }
            let seg_end = info.end();

            if info.perm.contains(MemoryPermission::READ) {
                let mut read_addr = info.addr;
                while read_addr < seg_end {
                    let to_read = (seg_end - read_addr).min(scan_buffer.len() as u64) as usize;
                    if to_read < value_width {
                        break;
                    }
                    let window = &mut scan_buffer[..to_read];
                    if self.process.read_memory(read_addr, window).is_err() {
                        // Unreadable window: drop the rest of the segment.
                        break;
                    }
                    scan_fn(&env, window, step, read_addr, &mut sink)?;
                    sink.note_scanned(to_read as u64);
                    self.report(&sink);
                    read_addr += to_read as u64;
                }
            }

            if seg_end <= cursor {
                break;
            }
            cursor = seg_end;
        }

        self.finish_run(sink, started, SCAN_BUFFER_BYTES)
    }

    /// Run a secondary pass over the candidates of `source`, writing
    /// the survivors to `<dir>/<stem>.dat`.
    ///
    /// Candidates are read in batches and grouped into read windows
    /// covering runs of nearby addresses; a failed window read retries
    /// a single 8-byte read before skipping the candidate. Output order
    /// is input order.
    pub fn continue_search(
        &self,
        condition: &SearchCondition,
        source: &Path,
        stem: &str,
    ) -> Result<SearchRunStats> {
        if !condition.mode.executes_on(SearchPass::Secondary) {
            return Err(unsupported(condition, SearchPass::Secondary));
        }
        let scan_fn = secondary::resolve(condition.ty, condition.mode)
            .ok_or_else(|| unsupported(condition, SearchPass::Secondary))?;

        let source_header = crate::format::read_header(source)?;
        if !self.process.has_cheat_process() {
            self.process.force_open_cheat_process()?;
        }
        let metadata = self.process.metadata()?;

        let mut run_condition = *condition;
        run_condition.step = SearchPass::Secondary.step_marker();
        let mut header = CandidateHeader::for_search(run_condition, metadata);
        header.from_to_size = source_header.data_size;
        header.set_pre_filename(&index::stem_of(source));

        let path = index::candidate_path(&self.dir, stem);
        let writer = CandidateWriter::create(path, header)?;
        let mut sink = RecordSink::new(writer);

        let env = ScanEnv {
            condition: run_condition,
            metadata,
        };
        let value_width = condition.ty.byte_width();

        let mut reader = RecordReader::open(source)?;
        let input_capacity = CONTINUE_INPUT_BYTES / RECORD_SIZE;
        let mut batch = Vec::with_capacity(input_capacity);
        let mut window_buffer = vec![0u8; CONTINUE_WINDOW_BYTES];
        // Bounded by the declared payload so an attached screenshot
        // blob is never read as records.
        let mut remaining = (source_header.data_size / RECORD_SIZE as u64) as usize;

        let started = Instant::now();
        loop {
            let want = input_capacity.min(remaining);
            if want == 0 {
                break;
            }
            let read_count = reader.read_batch(&mut batch, want)?;
            if read_count == 0 {
                break;
            }
            remaining -= read_count;

            let mut i = 0usize;
            while i < read_count {
                let window_base = batch[i].address;
                let max_span = (window_buffer.len() as u64).min(u64::MAX - window_base);

                // Extend the window while the next candidate still fits
                // with 8 readable bytes at its offset.
                let mut end = i;
                while end < read_count {
                    let addr = batch[end].address;
                    if addr < window_base {
                        break;
                    }
                    let delta = addr - window_base;
                    match delta.checked_add(8) {
                        Some(need) if need <= max_span => end += 1,
                        _ => break,
                    }
                }
                if end == i {
                    end = i + 1;
                }

                let last_addr = batch[end - 1].address;
                let bytes_to_read = (last_addr - window_base) as usize + 8;

                if self
                    .process
                    .read_memory(window_base, &mut window_buffer[..bytes_to_read])
                    .is_err()
                {
                    // Retry the first candidate alone before giving up
                    // on it.
                    if self
                        .process
                        .read_memory(window_base, &mut window_buffer[..8])
                        .is_err()
                    {
                        i += 1;
                        continue;
                    }
                    scan_fn(
                        &env,
                        &batch[i..i + 1],
                        window_base,
                        &window_buffer[..8],
                        value_width,
                        &mut sink,
                    )?;
                    i += 1;
                    continue;
                }

                scan_fn(
                    &env,
                    &batch[i..end],
                    window_base,
                    &window_buffer[..bytes_to_read],
                    value_width,
                    &mut sink,
                )?;
                i = end;
            }

            self.report(&sink);
            if read_count < want {
                break;
            }
        }

        self.finish_run(sink, started, CONTINUE_WINDOW_BYTES)
    }

    fn finish_run(
        &self,
        sink: RecordSink,
        started: Instant,
        scan_buffer_bytes: usize,
    ) -> Result<SearchRunStats> {
        let seconds = started.elapsed().as_secs().min(255) as u8;
        let (entries_written, bytes_written, bytes_scanned) = sink.finish(seconds)?;
        if let Some(notifier) = self.notifier {
            notifier.notify(&format!("search complete: {entries_written} candidates"));
        }
        Ok(SearchRunStats {
            entries_written,
            bytes_written,
            bytes_scanned,
            seconds_taken: u32::from(seconds),
            scan_buffer_bytes,
        })
    }
}

fn unsupported(condition: &SearchCondition, pass: SearchPass) -> EngineError {
    EngineError::Unsupported {
        mode: condition.mode.name().to_string(),
        ty: condition.ty.name().to_string(),
        pass,
    }
}

//! Candidate file format.
//!
//! A candidate file is a fixed 416-byte header followed by a packed
//! stream of `(address, value)` records and an optional screenshot
//! blob. The header embeds the search condition that produced the file
//! and the metadata of the process it was taken from, so a file is
//! self-describing and can seed a follow-up refinement pass.
//!
//! Layout (all integers little-endian, no padding):
//!
//! ```text
//! offset  size  field
//! 0       10    magic "BREEZE00E\0"
//! 10      4     file type
//! 14      100   pre_filename (stem of the previous pass, NUL-padded)
//! 114     83    b_filename (NUL-padded)
//! 197     2     ptr_search_range
//! 199     1     time_taken_seconds
//! 200     1     bit_mask
//! 201     1     current_level
//! 202     4     new_targets
//! 206     8     from_to_size
//! 214     72    search condition
//! 286     112   process metadata
//! 398     1     compressed
//! 399     1     has_screenshot
//! 400     8     data_size (record payload bytes)
//! 408     8     terminator "HEADER@\0"
//! 416     ...   records { u64 address, u64 value }, then screenshot
//! ```
//!
//! Files are written with a zero `data_size`, streamed, and finalized by
//! rewriting the header in place, so an interrupted run always leaves a
//! parseable file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::process::{ProcessMetadata, RegionExtents, BUILD_ID_LEN};
use crate::types::{SearchCondition, SearchMode, SearchType, SearchValue, SEARCH_TEXT_CAPACITY};

/// Magic literal at the start of every candidate file.
pub const FILE_MAGIC: [u8; 10] = *b"BREEZE00E\0";

/// Terminator literal at the end of every candidate header.
pub const HEADER_END: [u8; 8] = *b"HEADER@\0";

/// Size of the optional trailing screenshot blob.
pub const SCREENSHOT_BYTES: u64 = 0x38_4000;

/// Size of one packed candidate record.
pub const RECORD_SIZE: usize = 16;

/// Size of the embedded search condition blob.
pub const CONDITION_SIZE: usize = 72;

/// Size of the embedded process metadata blob.
pub const METADATA_SIZE: usize = 112;

/// Total header size.
pub const HEADER_SIZE: usize = 416;

/// Capacity of the `pre_filename` field.
pub const PRE_FILENAME_LEN: usize = 100;

/// Capacity of the `b_filename` field.
pub const B_FILENAME_LEN: usize = 83;

const OFF_FILETYPE: usize = 10;
const OFF_PRE_FILENAME: usize = 14;
const OFF_B_FILENAME: usize = 114;
const OFF_PTR_RANGE: usize = 197;
const OFF_TIME_TAKEN: usize = 199;
const OFF_BIT_MASK: usize = 200;
const OFF_CURRENT_LEVEL: usize = 201;
const OFF_NEW_TARGETS: usize = 202;
const OFF_FROM_TO_SIZE: usize = 206;
const OFF_CONDITION: usize = 214;
const OFF_METADATA: usize = 286;
const OFF_COMPRESSED: usize = 398;
const OFF_HAS_SCREENSHOT: usize = 399;
const OFF_DATA_SIZE: usize = 400;
const OFF_END: usize = 408;

/// Kinds of candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum FileType {
    FullDump = 0,
    Address = 1,
    AddressData = 2,
    FromTo32MainToHeap = 3,
    FromTo32MainToMain = 4,
    FromTo32HeapToHeap = 5,
    FromTo64 = 6,
    Bookmark = 7,
    SearchMission = 8,
    Undefined = 9,
    AdvancedList = 10,
}

impl FileType {
    /// Decode a raw discriminant; unknown values map to `Undefined`.
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => FileType::FullDump,
            1 => FileType::Address,
            2 => FileType::AddressData,
            3 => FileType::FromTo32MainToHeap,
            4 => FileType::FromTo32MainToMain,
            5 => FileType::FromTo32HeapToHeap,
            6 => FileType::FromTo64,
            7 => FileType::Bookmark,
            8 => FileType::SearchMission,
            10 => FileType::AdvancedList,
            _ => FileType::Undefined,
        }
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            FileType::FullDump => "full dump",
            FileType::Address => "address",
            FileType::AddressData => "address+data",
            FileType::FromTo32MainToHeap => "from-to-32 main-to-heap",
            FileType::FromTo32MainToMain => "from-to-32 main-to-main",
            FileType::FromTo32HeapToHeap => "from-to-32 heap-to-heap",
            FileType::FromTo64 => "from-to-64",
            FileType::Bookmark => "bookmark",
            FileType::SearchMission => "search mission",
            FileType::Undefined => "undefined",
            FileType::AdvancedList => "advanced list",
        }
    }
}

/// One candidate: the address matched and the bytes read there.
///
/// `value` holds the raw little-endian bytes at record time, zero-padded
/// for widths under 8. The EQ+/EQ++ modes store the full 8 bytes at the
/// address regardless of scan type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Matched address.
    pub address: u64,
    /// Raw bytes recorded at `address`.
    pub value: u64,
}

/// Decoded candidate file header.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateHeader {
    /// File kind tag.
    pub file_type: FileType,
    /// Stem of the pass this file was refined from, NUL-padded.
    pub pre_filename: [u8; PRE_FILENAME_LEN],
    /// Current filename field, NUL-padded.
    pub b_filename: [u8; B_FILENAME_LEN],
    /// Pointer-search range setting.
    pub ptr_search_range: u16,
    /// Wall-clock seconds the producing pass took, clamped to 255.
    pub time_taken: u8,
    /// Bitmask field.
    pub bit_mask: u8,
    /// Refinement level counter.
    pub current_level: u8,
    /// New target count.
    pub new_targets: u32,
    /// Payload size of the source file for a refinement pass.
    pub from_to_size: u64,
    /// Condition that produced this file.
    pub condition: SearchCondition,
    /// Metadata of the scanned process.
    pub metadata: ProcessMetadata,
    /// Whether the payload is compressed.
    pub compressed: bool,
    /// Whether a screenshot blob follows the payload.
    pub has_screenshot: bool,
    /// Record payload size in bytes.
    pub data_size: u64,
}

impl Default for CandidateHeader {
    fn default() -> Self {
        CandidateHeader {
            file_type: FileType::Undefined,
            pre_filename: [0u8; PRE_FILENAME_LEN],
            b_filename: [0u8; B_FILENAME_LEN],
            ptr_search_range: 0,
            time_taken: 0,
            bit_mask: 0,
            current_level: 0,
            new_targets: 0,
            from_to_size: 0,
            condition: SearchCondition::default(),
            metadata: ProcessMetadata::default(),
            compressed: false,
            has_screenshot: false,
            data_size: 0,
        }
    }
}

impl CandidateHeader {
    /// Build a search-mission header for a scan pass.
    pub fn for_search(condition: SearchCondition, metadata: ProcessMetadata) -> Self {
        CandidateHeader {
            file_type: FileType::SearchMission,
            condition,
            metadata,
            ..Default::default()
        }
    }

    /// Store `stem` into the `pre_filename` field, truncating to fit.
    pub fn set_pre_filename(&mut self, stem: &str) {
        self.pre_filename = [0u8; PRE_FILENAME_LEN];
        let bytes = stem.as_bytes();
        let len = bytes.len().min(PRE_FILENAME_LEN - 1);
        self.pre_filename[..len].copy_from_slice(&bytes[..len]);
    }

    /// `pre_filename` as text, up to the first NUL.
    pub fn pre_filename_str(&self) -> String {
        field_str(&self.pre_filename)
    }

    /// `b_filename` as text, up to the first NUL.
    pub fn b_filename_str(&self) -> String {
        field_str(&self.b_filename)
    }

    /// Number of records the payload holds.
    pub fn record_count(&self) -> u64 {
        self.data_size / RECORD_SIZE as u64
    }

    /// Total file size this header implies.
    pub fn expected_file_size(&self) -> u64 {
        let screenshot = if self.has_screenshot {
            SCREENSHOT_BYTES
        } else {
            0
        };
        HEADER_SIZE as u64 + self.data_size + screenshot
    }

    /// Encode into the on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..FILE_MAGIC.len()].copy_from_slice(&FILE_MAGIC);
        put_u32(&mut buf, OFF_FILETYPE, self.file_type as u32);
        buf[OFF_PRE_FILENAME..OFF_PRE_FILENAME + PRE_FILENAME_LEN]
            .copy_from_slice(&self.pre_filename);
        buf[OFF_B_FILENAME..OFF_B_FILENAME + B_FILENAME_LEN].copy_from_slice(&self.b_filename);
        buf[OFF_PTR_RANGE..OFF_PTR_RANGE + 2].copy_from_slice(&self.ptr_search_range.to_le_bytes());
        buf[OFF_TIME_TAKEN] = self.time_taken;
        buf[OFF_BIT_MASK] = self.bit_mask;
        buf[OFF_CURRENT_LEVEL] = self.current_level;
        put_u32(&mut buf, OFF_NEW_TARGETS, self.new_targets);
        put_u64(&mut buf, OFF_FROM_TO_SIZE, self.from_to_size);
        encode_condition(&self.condition, &mut buf[OFF_CONDITION..OFF_CONDITION + CONDITION_SIZE]);
        encode_metadata(&self.metadata, &mut buf[OFF_METADATA..OFF_METADATA + METADATA_SIZE]);
        buf[OFF_COMPRESSED] = u8::from(self.compressed);
        buf[OFF_HAS_SCREENSHOT] = u8::from(self.has_screenshot);
        put_u64(&mut buf, OFF_DATA_SIZE, self.data_size);
        buf[OFF_END..OFF_END + HEADER_END.len()].copy_from_slice(&HEADER_END);
        buf
    }

    /// Decode and validate a header blob.
    ///
    /// Checks the magic and terminator literals and that the embedded
    /// condition's mode, type and text length lie in their declared
    /// ranges. File-size consistency is checked by [`read_header`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(EngineError::FileTooSmall {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[..FILE_MAGIC.len()] != FILE_MAGIC {
            return Err(EngineError::InvalidMagic {
                expected: String::from_utf8_lossy(&FILE_MAGIC).into_owned(),
                actual: String::from_utf8_lossy(&data[..FILE_MAGIC.len()]).into_owned(),
            });
        }
        if data[OFF_END..OFF_END + HEADER_END.len()] != HEADER_END {
            return Err(EngineError::InvalidTerminator {
                expected: String::from_utf8_lossy(&HEADER_END).into_owned(),
                actual: String::from_utf8_lossy(&data[OFF_END..OFF_END + HEADER_END.len()])
                    .into_owned(),
            });
        }

        let condition =
            decode_condition(&data[OFF_CONDITION..OFF_CONDITION + CONDITION_SIZE])?;
        let metadata = decode_metadata(&data[OFF_METADATA..OFF_METADATA + METADATA_SIZE]);

        let mut pre_filename = [0u8; PRE_FILENAME_LEN];
        pre_filename.copy_from_slice(&data[OFF_PRE_FILENAME..OFF_PRE_FILENAME + PRE_FILENAME_LEN]);
        let mut b_filename = [0u8; B_FILENAME_LEN];
        b_filename.copy_from_slice(&data[OFF_B_FILENAME..OFF_B_FILENAME + B_FILENAME_LEN]);

        Ok(CandidateHeader {
            file_type: FileType::from_raw(get_u32(data, OFF_FILETYPE)),
            pre_filename,
            b_filename,
            ptr_search_range: u16::from_le_bytes([data[OFF_PTR_RANGE], data[OFF_PTR_RANGE + 1]]),
            time_taken: data[OFF_TIME_TAKEN],
            bit_mask: data[OFF_BIT_MASK],
            current_level: data[OFF_CURRENT_LEVEL],
            new_targets: get_u32(data, OFF_NEW_TARGETS),
            from_to_size: get_u64(data, OFF_FROM_TO_SIZE),
            condition,
            metadata,
            compressed: data[OFF_COMPRESSED] != 0,
            has_screenshot: data[OFF_HAS_SCREENSHOT] != 0,
            data_size: get_u64(data, OFF_DATA_SIZE),
        })
    }
}

fn field_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn get_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn get_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn encode_condition(condition: &SearchCondition, out: &mut [u8]) {
    put_u32(out, 0, condition.mode as u32);
    put_u32(out, 4, condition.ty as u32);
    put_u32(out, 8, condition.step);
    out[12..20].copy_from_slice(condition.value_a.raw());
    out[20..28].copy_from_slice(condition.value_b.raw());
    out[28..28 + SEARCH_TEXT_CAPACITY].copy_from_slice(&condition.text);
    put_u32(out, 68, condition.text_len);
}

fn decode_condition(data: &[u8]) -> Result<SearchCondition> {
    let mode_raw = get_u32(data, 0);
    let mode = SearchMode::from_raw(mode_raw)
        .ok_or(EngineError::ModeOutOfRange { value: mode_raw })?;
    let ty_raw = get_u32(data, 4);
    if ty_raw > SearchType::MAX_PERSISTED {
        return Err(EngineError::TypeOutOfRange { value: ty_raw });
    }
    let ty = SearchType::from_raw(ty_raw).ok_or(EngineError::TypeOutOfRange { value: ty_raw })?;
    let text_len = get_u32(data, 68);
    if text_len as usize >= SEARCH_TEXT_CAPACITY {
        return Err(EngineError::TextLenOutOfRange {
            len: text_len,
            capacity: SEARCH_TEXT_CAPACITY,
        });
    }

    let mut value_a = [0u8; 8];
    value_a.copy_from_slice(&data[12..20]);
    let mut value_b = [0u8; 8];
    value_b.copy_from_slice(&data[20..28]);
    let mut text = [0u8; SEARCH_TEXT_CAPACITY];
    text.copy_from_slice(&data[28..28 + SEARCH_TEXT_CAPACITY]);

    Ok(SearchCondition {
        mode,
        ty,
        step: get_u32(data, 8),
        value_a: SearchValue::from_raw(value_a),
        value_b: SearchValue::from_raw(value_b),
        text,
        text_len,
    })
}

fn encode_metadata(metadata: &ProcessMetadata, out: &mut [u8]) {
    put_u64(out, 0, metadata.process_id);
    put_u64(out, 8, metadata.title_id);
    for (i, extents) in [
        metadata.main_extents,
        metadata.heap_extents,
        metadata.alias_extents,
        metadata.address_space_extents,
    ]
    .iter()
    .enumerate()
    {
        put_u64(out, 16 + i * 16, extents.base);
        put_u64(out, 24 + i * 16, extents.size);
    }
    out[80..80 + BUILD_ID_LEN].copy_from_slice(&metadata.build_id);
}

fn decode_metadata(data: &[u8]) -> ProcessMetadata {
    let extents = |i: usize| RegionExtents {
        base: get_u64(data, 16 + i * 16),
        size: get_u64(data, 24 + i * 16),
    };
    let mut build_id = [0u8; BUILD_ID_LEN];
    build_id.copy_from_slice(&data[80..80 + BUILD_ID_LEN]);
    ProcessMetadata {
        process_id: get_u64(data, 0),
        title_id: get_u64(data, 8),
        main_extents: extents(0),
        heap_extents: extents(1),
        alias_extents: extents(2),
        address_space_extents: extents(3),
        build_id,
    }
}

/// Read and validate the header of a candidate file.
///
/// Fails on open/seek/short-read errors, bad magic or terminator, an
/// out-of-range mode/type/text-length, or a file size that does not
/// match the declared payload.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<CandidateHeader> {
    let mut file = File::open(path)?;
    let file_size = file.seek(SeekFrom::End(0))?;
    if file_size < HEADER_SIZE as u64 {
        return Err(EngineError::FileTooSmall {
            expected: HEADER_SIZE,
            actual: file_size as usize,
        });
    }
    file.seek(SeekFrom::Start(0))?;

    let mut buf = [0u8; HEADER_SIZE];
    file.read_exact(&mut buf)?;
    let header = CandidateHeader::from_bytes(&buf)?;

    let expected = header.expected_file_size();
    if file_size != expected {
        return Err(EngineError::SizeMismatch {
            expected,
            actual: file_size,
        });
    }
    Ok(header)
}

/// Streaming writer for a candidate file.
///
/// `create` writes the header immediately with its current (usually
/// zero) `data_size`; records are appended in batches; `finalize`
/// rewinds and rewrites the header with the final payload size and
/// elapsed time. Dropping an unfinalized writer leaves the initial
/// header in place, which is still well-formed.
#[derive(Debug)]
pub struct CandidateWriter {
    file: File,
    header: CandidateHeader,
    entries_written: u64,
    bytes_written: u64,
}

impl CandidateWriter {
    /// Create `path` (truncating), creating its parent directory if
    /// needed, and write the initial header.
    pub fn create<P: AsRef<Path>>(path: P, header: CandidateHeader) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&header.to_bytes())?;
        Ok(CandidateWriter {
            file,
            header,
            entries_written: 0,
            bytes_written: 0,
        })
    }

    /// Append a batch of records.
    pub fn write_records(&mut self, records: &[CandidateRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::with_capacity(records.len() * RECORD_SIZE);
        for record in records {
            buf.write_u64::<LittleEndian>(record.address)?;
            buf.write_u64::<LittleEndian>(record.value)?;
        }
        self.file.write_all(&buf)?;
        self.entries_written += records.len() as u64;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    /// Records written so far.
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Payload bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Rewrite the header with the final payload size and elapsed time.
    pub fn finalize(mut self, time_taken: u8) -> Result<()> {
        self.header.data_size = self.bytes_written;
        self.header.time_taken = time_taken;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.header.to_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

/// Streaming reader over a candidate file's record payload.
#[derive(Debug)]
pub struct RecordReader {
    reader: BufReader<File>,
}

impl RecordReader {
    /// Open `path` and seek past its header. The header is not
    /// re-validated here; callers validate with [`read_header`] first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        Ok(RecordReader {
            reader: BufReader::new(file),
        })
    }

    /// Read up to `max` records into `out`, replacing its contents.
    /// Returns the number read; zero at end of payload. A trailing
    /// partial record is dropped.
    pub fn read_batch(&mut self, out: &mut Vec<CandidateRecord>, max: usize) -> Result<usize> {
        out.clear();
        for _ in 0..max {
            let address = match self.reader.read_u64::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            let value = match self.reader.read_u64::<LittleEndian>() {
                Ok(v) => v,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            out.push(CandidateRecord { address, value });
        }
        Ok(out.len())
    }
}

/// Validate a candidate file and read its entire record payload.
pub fn read_all_records<P: AsRef<Path>>(path: P) -> Result<(CandidateHeader, Vec<CandidateRecord>)> {
    let header = read_header(&path)?;
    if header.data_size % RECORD_SIZE as u64 != 0 {
        return Err(EngineError::PayloadMisaligned {
            data_size: header.data_size,
            record_size: RECORD_SIZE as u64,
        });
    }
    let count = header.record_count() as usize;
    let mut reader = RecordReader::open(&path)?;
    let mut records = Vec::new();
    reader.read_batch(&mut records, count)?;
    Ok((header, records))
}

/// Serializable digest of a candidate header for display layers.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    /// File kind name.
    pub file_type: String,
    /// Stem of the pass this file was refined from.
    pub pre_filename: String,
    /// Search mode display name.
    pub mode: String,
    /// Search type display name.
    pub ty: String,
    /// Step marker of the producing pass.
    pub step: u32,
    /// Record payload bytes.
    pub data_size: u64,
    /// Number of candidate records.
    pub records: u64,
    /// Wall-clock seconds the pass took.
    pub time_taken: u8,
    /// Title id of the scanned process, as hex.
    pub title_id: String,
    /// Build id prefix of the scanned process, as hex.
    pub build_id: String,
    /// Whether the payload is compressed.
    pub compressed: bool,
    /// Whether a screenshot blob is attached.
    pub has_screenshot: bool,
}

impl CandidateSummary {
    /// Digest a decoded header.
    pub fn from_header(header: &CandidateHeader) -> Self {
        CandidateSummary {
            file_type: header.file_type.name().to_string(),
            pre_filename: header.pre_filename_str(),
            mode: header.condition.mode.name().to_string(),
            ty: header.condition.ty.name().to_string(),
            step: header.condition.step,
            data_size: header.data_size,
            records: header.record_count(),
            time_taken: header.time_taken,
            title_id: format!("{:016X}", header.metadata.title_id),
            build_id: header.metadata.build_id_hex(),
            compressed: header.compressed,
            has_screenshot: header.has_screenshot,
        }
    }
}

/// Mask a recorded value down to the displayed width of a scan type.
///
/// EQ+/EQ++ records carry the full 8 bytes at the address; consumers
/// rendering the value as the scanned type mask it here.
pub fn display_value(value: u64, ty: SearchType) -> u64 {
    match ty.byte_width() {
        1 => value & 0xFF,
        2 => value & 0xFFFF,
        4 => value & 0xFFFF_FFFF,
        _ => value,
    }
}

//! Core types for the search engine.
//!
//! This module defines the typed value model and the user search
//! condition: the scalar kinds the scanner understands, the predicate
//! modes, and the operand buffer they are evaluated against.

use std::fmt;

/// Bytes in the embedded search-text buffer of a condition.
pub const SEARCH_TEXT_CAPACITY: usize = 40;

/// Scalar kinds the scanner can be asked to match.
///
/// Discriminants are persisted in candidate file headers and must not be
/// reordered. `Hex`, `Text` and `None` are recognized syntactically but
/// rejected when resolving a scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SearchType {
    /// Unsigned 8-bit integer.
    U8 = 0,
    /// Signed 8-bit integer.
    S8 = 1,
    /// Unsigned 16-bit integer.
    U16 = 2,
    /// Signed 16-bit integer.
    S16 = 3,
    /// Unsigned 32-bit integer.
    U32 = 4,
    /// Signed 32-bit integer.
    S32 = 5,
    /// Unsigned 64-bit integer.
    U64 = 6,
    /// Signed 64-bit integer.
    S64 = 7,
    /// 32-bit IEEE float.
    F32 = 8,
    /// 64-bit IEEE float.
    F64 = 9,
    /// Pointer-sized value, read as u64.
    Pointer = 10,
    /// 40-bit value stored in 8 bytes, read as u64.
    U40 = 11,
    /// Raw hex input; not scannable.
    Hex = 12,
    /// Text input; not scannable.
    Text = 13,
    /// No type selected.
    None = 14,
}

impl SearchType {
    /// Largest discriminant accepted when validating a persisted header.
    pub const MAX_PERSISTED: u32 = SearchType::U40 as u32;

    /// Decode a raw discriminant.
    pub fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => SearchType::U8,
            1 => SearchType::S8,
            2 => SearchType::U16,
            3 => SearchType::S16,
            4 => SearchType::U32,
            5 => SearchType::S32,
            6 => SearchType::U64,
            7 => SearchType::S64,
            8 => SearchType::F32,
            9 => SearchType::F64,
            10 => SearchType::Pointer,
            11 => SearchType::U40,
            12 => SearchType::Hex,
            13 => SearchType::Text,
            14 => SearchType::None,
            _ => return None,
        })
    }

    /// Width in bytes of one value of this type as stored in memory.
    ///
    /// `Pointer` and `U40` are read as full 8-byte words. Non-scalar
    /// types report the 4-byte default.
    pub fn byte_width(self) -> usize {
        match self {
            SearchType::U8 | SearchType::S8 => 1,
            SearchType::U16 | SearchType::S16 => 2,
            SearchType::U32 | SearchType::S32 | SearchType::F32 => 4,
            SearchType::U64
            | SearchType::S64
            | SearchType::F64
            | SearchType::Pointer
            | SearchType::U40 => 8,
            _ => 4,
        }
    }

    /// Offset increment between successive read positions in a primary
    /// pass. 8- and 16-bit types step by one byte; wider types step by
    /// their width.
    pub fn scan_step(self) -> usize {
        match self {
            SearchType::U8 | SearchType::S8 | SearchType::U16 | SearchType::S16 => 1,
            SearchType::U32 | SearchType::S32 | SearchType::F32 => 4,
            SearchType::U64
            | SearchType::S64
            | SearchType::F64
            | SearchType::Pointer
            | SearchType::U40 => 8,
            _ => 4,
        }
    }

    /// True for the IEEE float kinds.
    pub fn is_float(self) -> bool {
        matches!(self, SearchType::F32 | SearchType::F64)
    }

    /// True for signed integer kinds.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            SearchType::S8 | SearchType::S16 | SearchType::S32 | SearchType::S64
        )
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            SearchType::U8 => "u8",
            SearchType::S8 => "s8",
            SearchType::U16 => "u16",
            SearchType::S16 => "s16",
            SearchType::U32 => "u32",
            SearchType::S32 => "s32",
            SearchType::U64 => "u64",
            SearchType::S64 => "s64",
            SearchType::F32 => "f32",
            SearchType::F64 => "f64",
            SearchType::Pointer => "pointer",
            SearchType::U40 => "u40",
            SearchType::Hex => "hex",
            SearchType::Text => "text",
            SearchType::None => "none",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Predicate modes over a candidate value.
///
/// The overlay UI exposes more tokens than the engine executes; every
/// token is representable here so files carrying them stay readable, but
/// scanner resolution rejects anything outside the executed set.
/// Discriminants are persisted and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum SearchMode {
    Eq = 0,
    Ne = 1,
    Gt = 2,
    Lt = 3,
    Ge = 4,
    Le = 5,
    RangeEq = 6,
    BitmaskEq = 7,
    RangeLt = 8,
    More = 9,
    Less = 10,
    Diff = 11,
    Same = 12,
    FromToA = 13,
    FromToGap = 14,
    Text = 15,
    IncBy = 16,
    DecBy = 17,
    EqPlus = 18,
    EqPlusPlus = 19,
    None = 20,
    DiffB = 21,
    SameB = 22,
    MoreB = 23,
    LessB = 24,
    NotAb = 25,
    TripleAbc = 26,
    BitFlip = 27,
    Advance = 28,
    Gap = 29,
    GapGroup = 30,
    Ptr = 31,
    NotPtr = 32,
    NoDecimal = 33,
    Gen2Data = 34,
    Gen2Code = 35,
    GetB = 36,
    Rebase = 37,
    Target = 38,
    PtrOffset = 39,
    Skip = 40,
    AbortedTarget = 41,
    BranchCode = 42,
    LdrxCode = 43,
    AdrpCode = 44,
    EorCode = 45,
    GetBEqA = 46,
    GetBZ = 47,
}

/// Display names indexed by mode discriminant, as shown by the overlay.
const MODE_NAMES: [&str; 47] = [
    "==A", "!=A", ">A", "<A", ">=A", "<=A", "[A..B]", "&B=A", "<A..B>", "++", "--", "DIFF", "SAME",
    "[A,B]", "[A,,B]", "STRING", "++Val", "--Val", "==*A", "==**A", "NONE", "DIFFB", "SAMEB",
    "B++", "B--", "NotAB", "[A.B.C]", "[A bflip B]", "Advance", "GAP", "{GAP}", "PTR", "~PTR",
    "[A..B]f.0", "Gen2 data", "Gen2 code", "GETB", "REBASE", "Target", "ptr and offset", "skip",
    "Aborted Target Search", "Branch code", "LDRx code", "ADRP code", "EOR code", "GETB==A",
];

impl SearchMode {
    /// Largest discriminant accepted when validating a persisted header.
    pub const MAX_PERSISTED: u32 = SearchMode::GetBZ as u32;

    /// Decode a raw discriminant.
    pub fn from_raw(value: u32) -> Option<Self> {
        if value > Self::MAX_PERSISTED {
            return None;
        }
        Some(match value {
            0 => SearchMode::Eq,
            1 => SearchMode::Ne,
            2 => SearchMode::Gt,
            3 => SearchMode::Lt,
            4 => SearchMode::Ge,
            5 => SearchMode::Le,
            6 => SearchMode::RangeEq,
            7 => SearchMode::BitmaskEq,
            8 => SearchMode::RangeLt,
            9 => SearchMode::More,
            10 => SearchMode::Less,
            11 => SearchMode::Diff,
            12 => SearchMode::Same,
            13 => SearchMode::FromToA,
            14 => SearchMode::FromToGap,
            15 => SearchMode::Text,
            16 => SearchMode::IncBy,
            17 => SearchMode::DecBy,
            18 => SearchMode::EqPlus,
            19 => SearchMode::EqPlusPlus,
            20 => SearchMode::None,
            21 => SearchMode::DiffB,
            22 => SearchMode::SameB,
            23 => SearchMode::MoreB,
            24 => SearchMode::LessB,
            25 => SearchMode::NotAb,
            26 => SearchMode::TripleAbc,
            27 => SearchMode::BitFlip,
            28 => SearchMode::Advance,
            29 => SearchMode::Gap,
            30 => SearchMode::GapGroup,
            31 => SearchMode::Ptr,
            32 => SearchMode::NotPtr,
            33 => SearchMode::NoDecimal,
            34 => SearchMode::Gen2Data,
            35 => SearchMode::Gen2Code,
            36 => SearchMode::GetB,
            37 => SearchMode::Rebase,
            38 => SearchMode::Target,
            39 => SearchMode::PtrOffset,
            40 => SearchMode::Skip,
            41 => SearchMode::AbortedTarget,
            42 => SearchMode::BranchCode,
            43 => SearchMode::LdrxCode,
            44 => SearchMode::AdrpCode,
            45 => SearchMode::EorCode,
            46 => SearchMode::GetBEqA,
            47 => SearchMode::GetBZ,
            _ => unreachable!(),
        })
    }

    /// Display name as shown by the overlay, `unknown` when unnamed.
    pub fn name(self) -> &'static str {
        MODE_NAMES
            .get(self as u32 as usize)
            .copied()
            .unwrap_or("unknown")
    }

    /// Whether the engine executes this mode on the given pass.
    ///
    /// The secondary pass adds the modes that compare against a
    /// previously recorded value.
    pub fn executes_on(self, pass: SearchPass) -> bool {
        match self {
            SearchMode::Eq
            | SearchMode::Ne
            | SearchMode::Gt
            | SearchMode::Lt
            | SearchMode::Ge
            | SearchMode::Le
            | SearchMode::RangeEq
            | SearchMode::RangeLt
            | SearchMode::BitmaskEq
            | SearchMode::EqPlus
            | SearchMode::EqPlusPlus
            | SearchMode::Ptr
            | SearchMode::NotPtr
            | SearchMode::NoDecimal => true,
            SearchMode::More
            | SearchMode::Less
            | SearchMode::Diff
            | SearchMode::Same
            | SearchMode::IncBy
            | SearchMode::DecBy => pass == SearchPass::Secondary,
            _ => false,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which scan pass an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPass {
    /// Full sweep of readable process memory.
    Primary,
    /// Refinement over a previous candidate set.
    Secondary,
}

impl SearchPass {
    /// Step marker persisted in the condition's `step` field.
    pub fn step_marker(self) -> u32 {
        match self {
            SearchPass::Primary => 0,
            SearchPass::Secondary => 1,
        }
    }
}

impl fmt::Display for SearchPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchPass::Primary => "primary",
            SearchPass::Secondary => "secondary",
        })
    }
}

/// Operand buffer of a search condition.
///
/// Holds the raw little-endian bytes of one operand, large enough for an
/// `f64`. Typed access loads the prefix without alignment assumptions; a
/// value narrower than 8 bytes leaves the tail zeroed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchValue([u8; 8]);

impl SearchValue {
    /// Wrap raw operand bytes.
    pub fn from_raw(bytes: [u8; 8]) -> Self {
        SearchValue(bytes)
    }

    /// Store an unsigned integer operand.
    pub fn from_u64(value: u64) -> Self {
        SearchValue(value.to_le_bytes())
    }

    /// Store a signed integer operand (sign-extended over all 8 bytes).
    pub fn from_i64(value: i64) -> Self {
        SearchValue(value.to_le_bytes())
    }

    /// Store a 32-bit float operand.
    pub fn from_f32(value: f32) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&value.to_le_bytes());
        SearchValue(bytes)
    }

    /// Store a 64-bit float operand.
    pub fn from_f64(value: f64) -> Self {
        SearchValue(value.to_le_bytes())
    }

    /// Raw operand bytes.
    pub fn raw(&self) -> &[u8; 8] {
        &self.0
    }
}

/// A user search condition: predicate mode, scalar type, pass step
/// marker, two operands and a small free-text buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchCondition {
    /// Predicate mode.
    pub mode: SearchMode,
    /// Scalar type scanned for.
    pub ty: SearchType,
    /// Step marker; written by the engine from the pass being run.
    pub step: u32,
    /// First operand (`a`).
    pub value_a: SearchValue,
    /// Second operand (`b`), used by range and bitmask modes.
    pub value_b: SearchValue,
    /// Free-text buffer, NUL-padded.
    pub text: [u8; SEARCH_TEXT_CAPACITY],
    /// Used length of `text`; always less than the buffer size.
    pub text_len: u32,
}

impl Default for SearchCondition {
    fn default() -> Self {
        SearchCondition {
            mode: SearchMode::Eq,
            ty: SearchType::U32,
            step: 0,
            value_a: SearchValue::default(),
            value_b: SearchValue::default(),
            text: [0u8; SEARCH_TEXT_CAPACITY],
            text_len: 0,
        }
    }
}

impl SearchCondition {
    /// Build a condition from mode, type and operand `a`.
    pub fn new(mode: SearchMode, ty: SearchType, value_a: SearchValue) -> Self {
        SearchCondition {
            mode,
            ty,
            value_a,
            ..Default::default()
        }
    }

    /// Build a condition carrying both operands.
    pub fn with_range(mode: SearchMode, ty: SearchType, a: SearchValue, b: SearchValue) -> Self {
        SearchCondition {
            mode,
            ty,
            value_a: a,
            value_b: b,
            ..Default::default()
        }
    }

    /// Operand `a` reinterpreted as a u32 for the EQ+/EQ++ modes.
    ///
    /// The operand is first read at its typed width, then converted:
    /// signed values via i64, floats by truncation.
    pub fn operand_a_as_u32(&self) -> u32 {
        let raw = self.value_a.raw();
        match self.ty {
            SearchType::U8 => raw[0] as u32,
            SearchType::S8 => i8::from_le_bytes([raw[0]]) as i64 as u32,
            SearchType::U16 => u16::from_le_bytes([raw[0], raw[1]]) as u32,
            SearchType::S16 => i16::from_le_bytes([raw[0], raw[1]]) as i64 as u32,
            SearchType::S32 => i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64 as u32,
            SearchType::U64 | SearchType::Pointer | SearchType::U40 => {
                u64::from_le_bytes(*raw) as u32
            }
            SearchType::S64 => i64::from_le_bytes(*raw) as u32,
            SearchType::F32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as u32,
            SearchType::F64 => f64::from_le_bytes(*raw) as u32,
            _ => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        }
    }

    /// Diagnostic line of the form `type=<n> mode=<name> step=<n>`.
    pub fn summary(&self) -> String {
        format!(
            "type={} mode={} step={}",
            self.ty as u32,
            self.mode.name(),
            self.step
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_byte_widths() {
        assert_eq!(SearchType::U8.byte_width(), 1);
        assert_eq!(SearchType::S16.byte_width(), 2);
        assert_eq!(SearchType::F32.byte_width(), 4);
        assert_eq!(SearchType::Pointer.byte_width(), 8);
        assert_eq!(SearchType::U40.byte_width(), 8);
        assert_eq!(SearchType::Hex.byte_width(), 4);
    }

    #[test]
    fn test_scan_steps() {
        assert_eq!(SearchType::U16.scan_step(), 1);
        assert_eq!(SearchType::S8.scan_step(), 1);
        assert_eq!(SearchType::F32.scan_step(), 4);
        assert_eq!(SearchType::U64.scan_step(), 8);
        assert_eq!(SearchType::F64.scan_step(), 8);
    }

    #[test]
    fn test_mode_round_trip() {
        for raw in 0..=SearchMode::MAX_PERSISTED {
            let mode = SearchMode::from_raw(raw).unwrap();
            assert_eq!(mode as u32, raw);
        }
        assert!(SearchMode::from_raw(SearchMode::MAX_PERSISTED + 1).is_none());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(SearchMode::Eq.name(), "==A");
        assert_eq!(SearchMode::BitmaskEq.name(), "&B=A");
        assert_eq!(SearchMode::NoDecimal.name(), "[A..B]f.0");
        assert_eq!(SearchMode::GetBEqA.name(), "GETB==A");
        assert_eq!(SearchMode::GetBZ.name(), "unknown");
    }

    #[test]
    fn test_pass_support() {
        assert!(SearchMode::Eq.executes_on(SearchPass::Primary));
        assert!(SearchMode::Eq.executes_on(SearchPass::Secondary));
        assert!(!SearchMode::Same.executes_on(SearchPass::Primary));
        assert!(SearchMode::Same.executes_on(SearchPass::Secondary));
        assert!(!SearchMode::Gen2Data.executes_on(SearchPass::Primary));
        assert!(!SearchMode::Gen2Data.executes_on(SearchPass::Secondary));
        assert!(!SearchMode::DiffB.executes_on(SearchPass::Secondary));
    }

    #[test]
    fn test_operand_a_as_u32() {
        let c = SearchCondition::new(
            SearchMode::EqPlus,
            SearchType::S16,
            SearchValue::from_i64(-2),
        );
        assert_eq!(c.operand_a_as_u32(), (-2i64) as u32);

        let c = SearchCondition::new(
            SearchMode::EqPlus,
            SearchType::F32,
            SearchValue::from_f32(41.9),
        );
        assert_eq!(c.operand_a_as_u32(), 41);

        let c = SearchCondition::new(
            SearchMode::EqPlus,
            SearchType::U64,
            SearchValue::from_u64(0x1_0000_002A),
        );
        assert_eq!(c.operand_a_as_u32(), 0x2A);
    }

    #[test]
    fn test_summary() {
        let mut c = SearchCondition::new(
            SearchMode::RangeEq,
            SearchType::F32,
            SearchValue::from_f32(1.5),
        );
        c.step = 1;
        assert_eq!(c.summary(), "type=8 mode=[A..B] step=1");
    }
}

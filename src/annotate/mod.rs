//! Cheat-VM opcode annotator.
//!
//! A structural walker over the variable-width cheat instruction
//! stream: a decode step producing one tagged instruction per 1-4
//! words, and a render step producing one human-readable note per
//! instruction. The walker is total: every word of any input is
//! consumed exactly once, unknown words advancing by one.
//!
//! Decoding is pure; rendering only calls out to the injected ARM64
//! disassembler for 4-byte literal values.

use std::fmt::Write as _;

/// Renders one 32-bit word as an ARM64 mnemonic; empty string on any
/// failure.
pub trait Disassembler {
    /// Disassemble `word` as if located at `address`.
    fn disassemble(&self, word: u32, address: u64) -> String;
}

/// Disassembler that renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisassembler;

impl Disassembler for NullDisassembler {
    fn disassemble(&self, _word: u32, _address: u64) -> String {
        String::new()
    }
}

/// Note verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStyle {
    /// Compact one-liners.
    Minimal,
    /// Adds widths, regions and value reinterpretations.
    Verbose,
}

/// Second operand of a register-conditional instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperand {
    /// Memory at a region base plus a relative offset.
    MemOffset {
        /// Region selector (0 main, 1 heap).
        mem: u8,
        /// Relative offset.
        addr: u64,
    },
    /// Memory at a region base plus an offset register.
    MemReg {
        /// Region selector.
        mem: u8,
        /// Offset register.
        reg: u8,
    },
    /// Memory at a register plus a static offset.
    RegOffset {
        /// Base register.
        reg: u8,
        /// Static offset.
        offset: u64,
    },
    /// Memory at a register plus an offset register.
    RegReg {
        /// Base register.
        base: u8,
        /// Offset register.
        offset: u8,
    },
    /// A static value.
    Value(u64),
    /// Another register.
    Register(u8),
}

/// One decoded cheat-VM instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Instruction {
    StoreStatic {
        width: u8,
        mem: u8,
        offset_reg: u8,
        address: u64,
        value: u64,
    },
    BeginCondition {
        width: u8,
        mem: u8,
        cond: u8,
        address: u64,
        value: u64,
    },
    EndCondition {
        is_else: bool,
    },
    LoopStart {
        reg: u8,
        count: u32,
    },
    LoopEnd {
        reg: u8,
    },
    LoadRegStatic {
        reg: u8,
        value: u64,
    },
    LoadRegMemory {
        width: u8,
        mem: u8,
        reg: u8,
        address: u64,
    },
    StoreStaticToRegAddress {
        width: u8,
        reg: u8,
        increment: bool,
        offset_reg: Option<u8>,
        value: u64,
    },
    ArithStatic {
        width: u8,
        reg: u8,
        op: u8,
        value: u32,
    },
    BeginKeypress {
        mask: u32,
    },
    ArithRegister {
        width: u8,
        op: u8,
        dst: u8,
        lhs: u8,
        rhs_reg: Option<u8>,
        rhs_value: Option<u32>,
    },
    StoreRegToAddress {
        width: u8,
        src: u8,
        addr_reg: u8,
        increment: bool,
        offset_type: u8,
        offset_reg: u8,
        offset_value: Option<u32>,
    },
    BeginRegisterCondition {
        width: u8,
        cond: u8,
        reg: u8,
        operand: CompareOperand,
    },
    SaveRestoreRegister {
        dst: u8,
        src: u8,
        op: u8,
    },
    SaveRestoreRegisterMask {
        op: u8,
        mask: u16,
    },
    StaticRegister {
        index: u8,
        reg: u8,
        write: bool,
    },
    BeginExtendedKeypress {
        mask: u64,
    },
    PauseProcess,
    ResumeProcess,
    DebugLog {
        id: u8,
    },
    Unknown {
        word: u32,
    },
}

/// A decoded instruction together with the words it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// The instruction.
    pub instruction: Instruction,
    /// Words consumed from the stream, clamped at stream end.
    pub word_count: usize,
}

#[inline]
fn nib(word: u32, index: u32) -> u8 {
    ((word >> (28 - index * 4)) & 0xF) as u8
}

fn word_at(opcodes: &[u32], index: usize) -> u32 {
    opcodes.get(index).copied().unwrap_or(0)
}

/// Decode one instruction starting at `at`.
///
/// Missing trailing words of a truncated instruction read as zero; the
/// reported word count never passes the end of the stream.
pub fn decode_one(opcodes: &[u32], at: usize) -> Decoded {
    let w0 = opcodes[at];
    let remaining = opcodes.len() - at;
    let w = |i: usize| word_at(opcodes, at + i);

    let (instruction, needed) = match nib(w0, 0) {
        0x0 => {
            let width = nib(w0, 1);
            let address = (u64::from(w0 & 0xFF) << 32) | u64::from(w(1));
            let (value, needed) = if width == 8 {
                ((u64::from(w(2)) << 32) | u64::from(w(3)), 4)
            } else {
                (u64::from(w(2)), 3)
            };
            (
                Instruction::StoreStatic {
                    width,
                    mem: nib(w0, 2),
                    offset_reg: nib(w0, 3),
                    address,
                    value,
                },
                needed,
            )
        }
        0x1 => {
            let width = nib(w0, 1);
            let address = (u64::from(w0 & 0xFF) << 32) | u64::from(w(1));
            let (value, needed) = if width == 8 {
                ((u64::from(w(2)) << 32) | u64::from(w(3)), 4)
            } else {
                (u64::from(w(2)), 3)
            };
            (
                Instruction::BeginCondition {
                    width,
                    mem: nib(w0, 2),
                    cond: nib(w0, 3),
                    address,
                    value,
                },
                needed,
            )
        }
        0x2 => (
            Instruction::EndCondition {
                is_else: nib(w0, 1) == 1,
            },
            1,
        ),
        0x3 => {
            if nib(w0, 1) == 0 {
                (
                    Instruction::LoopStart {
                        reg: nib(w0, 3),
                        count: w(1),
                    },
                    2,
                )
            } else {
                (Instruction::LoopEnd { reg: nib(w0, 3) }, 1)
            }
        }
        0x4 => (
            Instruction::LoadRegStatic {
                reg: nib(w0, 3),
                value: (u64::from(w(1)) << 32) | u64::from(w(2)),
            },
            3,
        ),
        0x5 => (
            Instruction::LoadRegMemory {
                width: nib(w0, 1),
                mem: nib(w0, 2),
                reg: nib(w0, 3),
                address: (u64::from(w0 & 0xFF) << 32) | u64::from(w(1)),
            },
            2,
        ),
        0x6 => (
            Instruction::StoreStaticToRegAddress {
                width: nib(w0, 1),
                reg: nib(w0, 3),
                increment: nib(w0, 4) != 0,
                offset_reg: (nib(w0, 5) != 0).then(|| nib(w0, 6)),
                value: (u64::from(w(1)) << 32) | u64::from(w(2)),
            },
            3,
        ),
        0x7 => (
            Instruction::ArithStatic {
                width: nib(w0, 1),
                reg: nib(w0, 3),
                op: nib(w0, 4),
                value: w(1),
            },
            2,
        ),
        0x8 => (
            Instruction::BeginKeypress {
                mask: w0 & 0x0FFF_FFFF,
            },
            1,
        ),
        0x9 => {
            let immediate = nib(w0, 5) != 0;
            (
                Instruction::ArithRegister {
                    width: nib(w0, 1),
                    op: nib(w0, 2),
                    dst: nib(w0, 3),
                    lhs: nib(w0, 4),
                    rhs_reg: (!immediate).then(|| nib(w0, 6)),
                    rhs_value: immediate.then(|| w(1)),
                },
                if immediate { 2 } else { 1 },
            )
        }
        0xA => {
            let offset_type = nib(w0, 5);
            let has_offset_word = matches!(offset_type, 2 | 4 | 5);
            (
                Instruction::StoreRegToAddress {
                    width: nib(w0, 1),
                    src: nib(w0, 2),
                    addr_reg: nib(w0, 3),
                    increment: nib(w0, 4) != 0,
                    offset_type,
                    offset_reg: nib(w0, 6),
                    offset_value: has_offset_word.then(|| w(1)),
                },
                if has_offset_word { 2 } else { 1 },
            )
        }
        0xC => match nib(w0, 1) {
            0x0 => {
                let width = nib(w0, 2);
                let (operand, needed) = match nib(w0, 5) {
                    0 => (
                        CompareOperand::MemOffset {
                            mem: nib(w0, 6),
                            addr: u64::from(w(1)),
                        },
                        2,
                    ),
                    1 => (
                        CompareOperand::MemReg {
                            mem: nib(w0, 6),
                            reg: nib(w0, 7),
                        },
                        1,
                    ),
                    2 => (
                        CompareOperand::RegOffset {
                            reg: nib(w0, 6),
                            offset: u64::from(w(1)),
                        },
                        2,
                    ),
                    3 => (
                        CompareOperand::RegReg {
                            base: nib(w0, 6),
                            offset: nib(w0, 7),
                        },
                        1,
                    ),
                    4 => {
                        if width == 8 {
                            (
                                CompareOperand::Value(
                                    (u64::from(w(1)) << 32) | u64::from(w(2)),
                                ),
                                3,
                            )
                        } else {
                            (CompareOperand::Value(u64::from(w(1))), 2)
                        }
                    }
                    5 => (CompareOperand::Register(nib(w0, 6)), 1),
                    _ => (CompareOperand::Value(0), 1),
                };
                (
                    Instruction::BeginRegisterCondition {
                        width,
                        cond: nib(w0, 3),
                        reg: nib(w0, 4),
                        operand,
                    },
                    needed,
                )
            }
            0x1 => (
                Instruction::SaveRestoreRegister {
                    dst: nib(w0, 3),
                    src: nib(w0, 5),
                    op: nib(w0, 6),
                },
                1,
            ),
            0x2 => (
                Instruction::SaveRestoreRegisterMask {
                    op: nib(w0, 2),
                    mask: (w0 & 0xFFFF) as u16,
                },
                1,
            ),
            0x3 => {
                let index = ((w0 >> 4) & 0xFF) as u8;
                (
                    Instruction::StaticRegister {
                        index,
                        reg: (w0 & 0xF) as u8,
                        write: index >= 0x80,
                    },
                    1,
                )
            }
            0x4 => (
                Instruction::BeginExtendedKeypress {
                    mask: (u64::from(w(1)) << 32) | u64::from(w(2)),
                },
                3,
            ),
            _ => (Instruction::Unknown { word: w0 }, 1),
        },
        0xF => match (w0 >> 20) & 0xFFF {
            0xFF0 => (Instruction::PauseProcess, 1),
            0xFF1 => (Instruction::ResumeProcess, 1),
            0xFFF => (
                Instruction::DebugLog {
                    id: ((w0 >> 16) & 0xF) as u8,
                },
                1,
            ),
            _ => (Instruction::Unknown { word: w0 }, 1),
        },
        _ => (Instruction::Unknown { word: w0 }, 1),
    };

    Decoded {
        instruction,
        word_count: needed.min(remaining),
    }
}

/// Words belonging to the instruction starting at `at`; used by the
/// text serializer to group words into lines.
pub fn instruction_len(opcodes: &[u32], at: usize) -> usize {
    decode_one(opcodes, at).word_count
}

/// Decode an entire opcode stream.
pub fn decode(opcodes: &[u32]) -> Vec<Decoded> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < opcodes.len() {
        let decoded = decode_one(opcodes, i);
        i += decoded.word_count;
        out.push(decoded);
    }
    out
}

/// Produce one note string per instruction of the stream.
pub fn notes(opcodes: &[u32], style: NoteStyle, disasm: &dyn Disassembler) -> Vec<String> {
    decode(opcodes)
        .iter()
        .map(|d| render(&d.instruction, style, disasm))
        .collect()
}

fn region(mem: u8) -> &'static str {
    match mem {
        0 => "main",
        1 => "heap",
        2 => "alias",
        3 => "aslr",
        _ => "main",
    }
}

fn cond_op(cond: u8) -> &'static str {
    match cond {
        1 => ">",
        2 => ">=",
        3 => "<",
        4 => "<=",
        5 => "==",
        6 => "!=",
        _ => "?",
    }
}

fn arith_op(op: u8) -> &'static str {
    match op {
        0 => "+",
        1 => "-",
        2 => "*",
        3 => "<<",
        4 => ">>",
        5 => "&",
        6 => "|",
        7 => "!",
        8 => "^",
        9 => "",
        _ => "?",
    }
}

fn asm_suffix(disasm: &dyn Disassembler, word: u32, address: u64) -> String {
    let text = disasm.disassemble(word, address);
    if text.is_empty() {
        String::new()
    } else {
        format!(" asm={text}")
    }
}

fn reinterp(value: u64, width: u8) -> String {
    match width {
        4 => format!(
            " (dec={} f32={})",
            value as u32,
            f32::from_bits(value as u32)
        ),
        8 => format!(" (dec={} f64={})", value, f64::from_bits(value)),
        _ => format!(" (dec={value})"),
    }
}

/// Render one instruction as a note.
pub fn render(instruction: &Instruction, style: NoteStyle, disasm: &dyn Disassembler) -> String {
    let verbose = style == NoteStyle::Verbose;
    match *instruction {
        Instruction::StoreStatic {
            width,
            mem,
            offset_reg,
            address,
            value,
        } => {
            let asm = if width == 4 {
                asm_suffix(disasm, value as u32, address)
            } else {
                String::new()
            };
            if verbose {
                format!(
                    "[{}+R{}+0x{:010X}] = 0x{:X} (W={}){}{}",
                    region(mem),
                    offset_reg,
                    address,
                    value,
                    width,
                    reinterp(value, width),
                    asm
                )
            } else {
                format!("[0x{address:010X}] = 0x{value:X}{asm}")
            }
        }
        Instruction::BeginCondition {
            width,
            mem,
            cond,
            address,
            value,
        } => {
            if verbose {
                format!(
                    "if [{}+0x{:010X}] {} 0x{:X} (W={})",
                    region(mem),
                    address,
                    cond_op(cond),
                    value,
                    width
                )
            } else {
                format!("if [0x{:010X}] {} 0x{:X}", address, cond_op(cond), value)
            }
        }
        Instruction::EndCondition { is_else } => {
            if is_else { "else" } else { "endif" }.to_string()
        }
        Instruction::LoopStart { reg, count } => {
            if verbose {
                format!("loop start R{reg} count={count}")
            } else {
                format!("loop R{reg} x{count}")
            }
        }
        Instruction::LoopEnd { reg } => format!("endloop R{reg}"),
        Instruction::LoadRegStatic { reg, value } => {
            if verbose {
                format!("R{} = 0x{:X}{}", reg, value, reinterp(value, 8))
            } else {
                format!("R{reg} = 0x{value:X}")
            }
        }
        Instruction::LoadRegMemory {
            width,
            mem,
            reg,
            address,
        } => {
            if verbose {
                format!(
                    "R{} = [{}+0x{:010X}] (W={})",
                    reg,
                    region(mem),
                    address,
                    width
                )
            } else {
                format!("R{reg} = [0x{address:010X}]")
            }
        }
        Instruction::StoreStaticToRegAddress {
            width,
            reg,
            increment,
            offset_reg,
            value,
        } => {
            let mut target = format!("R{reg}");
            if let Some(offset) = offset_reg {
                let _ = write!(target, "+R{offset}");
            }
            let inc = if increment { "++" } else { "" };
            let asm = if width == 4 {
                asm_suffix(disasm, value as u32, 0)
            } else {
                String::new()
            };
            if verbose {
                format!("[{target}{inc}] = 0x{value:X} (W={width}){asm}")
            } else {
                format!("[{target}{inc}] = 0x{value:X}{asm}")
            }
        }
        Instruction::ArithStatic {
            width,
            reg,
            op,
            value,
        } => {
            let asm = asm_suffix(disasm, value, 0);
            if verbose {
                format!(
                    "R{} = R{} {} 0x{:X} (W={}){}",
                    reg,
                    reg,
                    arith_op(op),
                    value,
                    width,
                    asm
                )
            } else {
                format!("R{} {}= 0x{:X}{}", reg, arith_op(op), value, asm)
            }
        }
        Instruction::BeginKeypress { mask } => {
            if verbose {
                format!("if keys held 0x{mask:07X}")
            } else {
                format!("if keys 0x{mask:07X}")
            }
        }
        Instruction::ArithRegister {
            width,
            op,
            dst,
            lhs,
            rhs_reg,
            rhs_value,
        } => {
            let rhs = match (rhs_reg, rhs_value) {
                (Some(reg), _) => format!("R{reg}"),
                (None, Some(value)) => format!("0x{value:X}"),
                (None, None) => "0x0".to_string(),
            };
            if verbose {
                format!("R{} = R{} {} {} (W={})", dst, lhs, arith_op(op), rhs, width)
            } else {
                format!("R{} = R{} {} {}", dst, lhs, arith_op(op), rhs)
            }
        }
        Instruction::StoreRegToAddress {
            width,
            src,
            addr_reg,
            increment,
            offset_type,
            offset_reg,
            offset_value,
        } => {
            let mut target = format!("R{addr_reg}");
            match offset_type {
                1 | 3 => {
                    let _ = write!(target, "+R{offset_reg}");
                }
                2 | 4 | 5 => {
                    let _ = write!(target, "+0x{:X}", offset_value.unwrap_or(0));
                }
                _ => {}
            }
            let inc = if increment { "++" } else { "" };
            if verbose {
                format!("[{target}{inc}] = R{src} (W={width})")
            } else {
                format!("[{target}{inc}] = R{src}")
            }
        }
        Instruction::BeginRegisterCondition {
            width,
            cond,
            reg,
            operand,
        } => {
            let rhs = match operand {
                CompareOperand::MemOffset { mem, addr } => {
                    format!("[{}+0x{:X}]", region(mem), addr)
                }
                CompareOperand::MemReg { mem, reg } => format!("[{}+R{}]", region(mem), reg),
                CompareOperand::RegOffset { reg, offset } => format!("[R{reg}+0x{offset:X}]"),
                CompareOperand::RegReg { base, offset } => format!("[R{base}+R{offset}]"),
                CompareOperand::Value(value) => format!("0x{value:X}"),
                CompareOperand::Register(other) => format!("R{other}"),
            };
            if verbose {
                format!("if R{} {} {} (W={})", reg, cond_op(cond), rhs, width)
            } else {
                format!("if R{} {} {}", reg, cond_op(cond), rhs)
            }
        }
        Instruction::SaveRestoreRegister { dst, src, op } => match op {
            0 => format!("R{dst} = saved[{src}]"),
            1 => format!("saved[{dst}] = R{src}"),
            2 => format!("saved[{dst}] = 0"),
            _ => format!("R{dst} = 0"),
        },
        Instruction::SaveRestoreRegisterMask { op, mask } => match op {
            0 => format!("restore mask 0x{mask:04X}"),
            1 => format!("save mask 0x{mask:04X}"),
            2 => format!("clear saved mask 0x{mask:04X}"),
            _ => format!("clear regs mask 0x{mask:04X}"),
        },
        Instruction::StaticRegister { index, reg, write } => {
            if write {
                format!("static[0x{index:02X}] = R{reg}")
            } else {
                format!("R{reg} = static[0x{index:02X}]")
            }
        }
        Instruction::BeginExtendedKeypress { mask } => {
            if verbose {
                format!("if keys held 0x{mask:016X}")
            } else {
                format!("if keys 0x{mask:016X}")
            }
        }
        Instruction::PauseProcess => "pause".to_string(),
        Instruction::ResumeProcess => "resume".to_string(),
        Instruction::DebugLog { id } => format!("log #{id}"),
        Instruction::Unknown { word } => format!("Opcode Type 0x{:X}", word >> 28),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FixedDisassembler(&'static str);

    impl Disassembler for FixedDisassembler {
        fn disassemble(&self, _word: u32, _address: u64) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_store_static_u32() {
        let ops = [0x0400_0000, 0x0000_1234, 0x0000_002A];
        let decoded = decode(&ops);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].word_count, 3);
        assert_eq!(
            decoded[0].instruction,
            Instruction::StoreStatic {
                width: 4,
                mem: 0,
                offset_reg: 0,
                address: 0x1234,
                value: 0x2A,
            }
        );

        let minimal = notes(&ops, NoteStyle::Minimal, &NullDisassembler);
        assert_eq!(minimal, vec!["[0x0000001234] = 0x2A"]);

        let verbose = notes(&ops, NoteStyle::Verbose, &NullDisassembler);
        assert!(verbose[0].starts_with("[main+R0+0x0000001234] = 0x2A (W=4"));
    }

    #[test]
    fn test_store_static_u64_takes_four_words() {
        let ops = [0x0800_00AB, 0x0000_1234, 0x0000_0001, 0x0000_0002];
        let decoded = decode(&ops);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].word_count, 4);
        assert_eq!(
            decoded[0].instruction,
            Instruction::StoreStatic {
                width: 8,
                mem: 0,
                offset_reg: 0,
                address: 0xAB_0000_1234,
                value: 0x1_0000_0002,
            }
        );
    }

    #[test]
    fn test_asm_suffix_on_four_byte_literal() {
        let ops = [0x0400_0000, 0x0000_1234, 0xD503_201F];
        let with = notes(&ops, NoteStyle::Minimal, &FixedDisassembler("nop"));
        assert_eq!(with, vec!["[0x0000001234] = 0xD503201F asm=nop"]);
        // Empty disassembly is suppressed silently.
        let without = notes(&ops, NoteStyle::Minimal, &NullDisassembler);
        assert_eq!(without, vec!["[0x0000001234] = 0xD503201F"]);
    }

    #[test]
    fn test_keypress_masks() {
        let ops = [0x8000_0200];
        assert_eq!(
            decode(&ops)[0].instruction,
            Instruction::BeginKeypress { mask: 0x200 }
        );
        assert_eq!(
            notes(&ops, NoteStyle::Minimal, &NullDisassembler),
            vec!["if keys 0x0000200"]
        );

        let extended = [0xC400_0000, 0x0000_0001, 0x8000_0000];
        let decoded = decode(&extended);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].word_count, 3);
        assert_eq!(
            decoded[0].instruction,
            Instruction::BeginExtendedKeypress {
                mask: 0x1_8000_0000
            }
        );
    }

    #[test]
    fn test_conditionals_and_loops() {
        let ops = [
            0x1400_0000,
            0x0000_0100,
            0x0000_0063, // if [0x100] > 0x63 (cond nibble 0 -> "?")
            0x2000_0000, // endif
            0x2100_0000, // else
            0x3000_0000,
            0x0000_000A, // loop R0 x10
            0x3100_0000, // endloop
        ];
        let decoded = decode(&ops);
        assert_eq!(decoded.len(), 5);
        assert_eq!(
            decoded[1].instruction,
            Instruction::EndCondition { is_else: false }
        );
        assert_eq!(
            decoded[2].instruction,
            Instruction::EndCondition { is_else: true }
        );
        assert_eq!(
            decoded[3].instruction,
            Instruction::LoopStart { reg: 0, count: 10 }
        );
        assert_eq!(decoded[4].instruction, Instruction::LoopEnd { reg: 0 });
    }

    #[test]
    fn test_arith_register_immediate_takes_extra_word() {
        let reg_form = [0x9401_2030];
        assert_eq!(instruction_len(&reg_form, 0), 1);
        assert_eq!(
            notes(&reg_form, NoteStyle::Minimal, &NullDisassembler),
            vec!["R1 = R2 + R3"]
        );

        let imm_form = [0x9401_2100, 0x0000_0005];
        let decoded = decode(&imm_form);
        assert_eq!(decoded[0].word_count, 2);
        assert_eq!(
            notes(&imm_form, NoteStyle::Minimal, &NullDisassembler),
            vec!["R1 = R2 + 0x5"]
        );
    }

    #[test]
    fn test_store_reg_offset_types() {
        // Offset type 0: no extra word.
        assert_eq!(instruction_len(&[0xA410_0000], 0), 1);
        // Offset type 1 (offset register): no extra word.
        assert_eq!(instruction_len(&[0xA410_1200], 0), 1);
        // Offset types 2, 4, 5 take the offset word.
        for ty in [2u32, 4, 5] {
            let ops = [0xA410_0000 | (ty << 12), 0x0000_0040];
            assert_eq!(instruction_len(&ops, 0), 2);
        }
    }

    #[test]
    fn test_register_condition_lengths() {
        // X=3 register+register: one word.
        assert_eq!(instruction_len(&[0xC045_0312], 0), 1);
        // X=0 memory base + offset: two words.
        assert_eq!(instruction_len(&[0xC045_0000, 0x40], 0), 2);
        // X=4 static value, width 8: three words.
        assert_eq!(instruction_len(&[0xC085_0400, 0x1, 0x2], 0), 3);
        // X=4 static value, width 4: two words.
        assert_eq!(instruction_len(&[0xC045_0400, 0x1], 0), 2);
    }

    #[test]
    fn test_pause_resume_log() {
        let ops = [0xFF00_0000, 0xFF10_0000, 0xFFF4_0000];
        let rendered = notes(&ops, NoteStyle::Minimal, &NullDisassembler);
        assert_eq!(rendered, vec!["pause", "resume", "log #4"]);
    }

    #[test]
    fn test_unknown_advances_one_word() {
        let ops = [0xB123_4567, 0xE000_0000];
        let decoded = decode(&ops);
        assert_eq!(decoded.len(), 2);
        let rendered = notes(&ops, NoteStyle::Minimal, &NullDisassembler);
        assert_eq!(rendered[0], "Opcode Type 0xB");
        assert_eq!(rendered[1], "Opcode Type 0xE");
    }

    #[test]
    fn test_walker_is_total() {
        // A grab bag of every family plus junk; every word must be
        // consumed exactly once.
        let ops = [
            0x0400_0000,
            0x1000,
            0x2A,
            0x8000_0003,
            0x4000_0000,
            0x1,
            0x2,
            0x5840_0000,
            0x100,
            0xB000_0000,
            0xC110_0010,
            0xC210_00FF,
            0xC300_0841,
            0x7010_0000,
            0x5,
            0x2000_0001,
        ];
        let decoded = decode(&ops);
        let total: usize = decoded.iter().map(|d| d.word_count).sum();
        assert_eq!(total, ops.len());
        assert_eq!(notes(&ops, NoteStyle::Minimal, &NullDisassembler).len(), decoded.len());
    }

    #[test]
    fn test_truncated_instruction_clamps() {
        // A store-static wanting 3 words with only 1 available.
        let ops = [0x0400_0000];
        let decoded = decode(&ops);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].word_count, 1);
    }

    #[test]
    fn test_folder_sentinels_decode_as_end_markers() {
        assert_eq!(
            decode_one(&[crate::cheat::FOLDER_START], 0).instruction,
            Instruction::EndCondition { is_else: false }
        );
        assert_eq!(
            decode_one(&[crate::cheat::FOLDER_END], 0).instruction,
            Instruction::EndCondition { is_else: false }
        );
    }
}

//! Cheat text compiler and serializer.
//!
//! The input grammar is tolerant and byte-oriented: `[name]` starts a
//! regular cheat, `{name}` the master cheat, `(note)` is discarded, and
//! every other token must be eight hex digits forming one opcode word.
//! Each header boundary flushes the previous cheat to the service, so a
//! malformed tail never unregisters what already parsed.
//!
//! The serializer emits the same format back, one decoded instruction
//! per line, preceded by a banner identifying the engine and the
//! process the list belongs to.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use chrono::Local;

use crate::annotate;
use crate::cheat::{CheatDefinition, CheatService, MAX_OPCODES};
use crate::error::{EngineError, Result};
use crate::process::ProcessMetadata;

/// Product tag written into the serializer banner.
pub const PRODUCT_TAG: &str = "Breeze";

struct Pending {
    master: bool,
    definition: CheatDefinition,
}

fn flush(
    pending: &mut Option<Pending>,
    service: &mut dyn CheatService,
    registered: &mut usize,
) -> Result<()> {
    if let Some(cheat) = pending.take() {
        if cheat.definition.opcodes.is_empty() {
            return Ok(());
        }
        if cheat.master {
            service.set_master_cheat(&cheat.definition)?;
        } else {
            service.add_cheat(&cheat.definition, false)?;
        }
        *registered += 1;
    }
    Ok(())
}

fn syntax(offset: usize, message: impl Into<String>) -> EngineError {
    EngineError::CheatSyntax {
        offset,
        message: message.into(),
    }
}

/// Compile cheat text and register the entries with the service.
///
/// Returns the number of cheats registered. On malformed input the
/// current cheat (if it has opcodes) is flushed first and the error
/// carries the byte offset; previously registered cheats stay
/// registered.
pub fn parse_cheat_text(data: &[u8], service: &mut dyn CheatService) -> Result<usize> {
    let mut pending: Option<Pending> = None;
    let mut registered = 0usize;
    let mut i = 0usize;

    while i < data.len() {
        let b = data[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        match b {
            b'[' | b'{' => {
                let close = if b == b'[' { b']' } else { b'}' };
                let start = i + 1;
                let Some(end) = data[start..].iter().position(|&c| c == close) else {
                    flush(&mut pending, service, &mut registered)?;
                    return Err(syntax(i, "unterminated cheat name"));
                };
                flush(&mut pending, service, &mut registered)?;
                pending = Some(Pending {
                    master: b == b'{',
                    definition: CheatDefinition::from_name_bytes(&data[start..start + end]),
                });
                i = start + end + 1;
            }
            b'(' => {
                let start = i + 1;
                let Some(end) = data[start..].iter().position(|&c| c == b')') else {
                    flush(&mut pending, service, &mut registered)?;
                    return Err(syntax(i, "unterminated note"));
                };
                i = start + end + 1;
            }
            _ => {
                let start = i;
                while i < data.len() && !data[i].is_ascii_whitespace() {
                    i += 1;
                }
                let token = &data[start..i];
                let opcode = parse_opcode(token).ok_or_else(|| syntax(start, "expected 8 hex digits"));
                let opcode = match opcode {
                    Ok(opcode) => opcode,
                    Err(e) => {
                        flush(&mut pending, service, &mut registered)?;
                        return Err(e);
                    }
                };

                let Some(cheat) = pending.as_mut() else {
                    return Err(syntax(start, "opcode before any cheat header"));
                };
                if cheat.definition.opcodes.len() >= MAX_OPCODES {
                    flush(&mut pending, service, &mut registered)?;
                    return Err(syntax(start, "cheat exceeds the opcode capacity"));
                }
                cheat.definition.opcodes.push(opcode);
            }
        }
    }

    flush(&mut pending, service, &mut registered)?;
    Ok(registered)
}

fn parse_opcode(token: &[u8]) -> Option<u32> {
    if token.len() != 8 || !token.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(token).ok()?;
    u32::from_str_radix(text, 16).ok()
}

/// Banner line identifying the engine and the target process.
pub fn banner(metadata: &ProcessMetadata) -> String {
    format!(
        "[{} {} TID: {:016X} BID: {}]",
        PRODUCT_TAG,
        env!("CARGO_PKG_VERSION"),
        metadata.title_id,
        metadata.build_id_hex()
    )
}

/// Serialize the service's cheat list back to the text format.
///
/// Re-parsing the output reproduces the same list: the master code is
/// written with braces, opcodes group one decoded instruction per line,
/// and a blank line separates cheats. The banner re-parses as an empty
/// cheat and is dropped.
pub fn render_cheat_list(
    service: &dyn CheatService,
    metadata: &ProcessMetadata,
) -> Result<String> {
    let mut out = banner(metadata);
    out.push('\n');

    let mut master_emitted = false;
    for entry in service.cheats()? {
        out.push('\n');
        let name = &entry.definition.name;
        if entry.id == 0 && !master_emitted {
            master_emitted = true;
            let _ = writeln!(out, "{{{name}}}");
        } else {
            let _ = writeln!(out, "[{name}]");
        }

        let opcodes = &entry.definition.opcodes;
        let mut i = 0usize;
        while i < opcodes.len() {
            let len = annotate::instruction_len(opcodes, i);
            let line = opcodes[i..i + len]
                .iter()
                .map(|w| format!("{w:08X}"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "{line}");
            i += len;
        }
    }
    Ok(out)
}

/// Write the cheat list to `path`, replacing its contents.
pub fn write_cheat_file(
    path: &Path,
    service: &dyn CheatService,
    metadata: &ProcessMetadata,
) -> Result<()> {
    let text = render_cheat_list(service, metadata)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Append the cheat list to a running log with a date-time stamp line.
pub fn append_cheat_log(
    path: &Path,
    service: &dyn CheatService,
    metadata: &ProcessMetadata,
) -> Result<()> {
    let text = render_cheat_list(service, metadata)?;
    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "({stamp})")?;
    file.write_all(text.as_bytes())?;
    writeln!(file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cheat::MemoryCheatService;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> (MemoryCheatService, Result<usize>) {
        let mut service = MemoryCheatService::new();
        let result = parse_cheat_text(text.as_bytes(), &mut service);
        (service, result)
    }

    #[test]
    fn test_parse_regular_and_master() {
        let (service, result) = parse(
            "{Master Code}\n\
             04000000 00001234 00000063\n\
             \n\
             [Gold (999)]\n\
             04000000 00005678 000003E7\n",
        );
        assert_eq!(result.unwrap(), 2);

        let cheats = service.cheats().unwrap();
        assert_eq!(cheats.len(), 2);
        assert!(cheats[0].is_master());
        assert_eq!(cheats[0].definition.name, "Master Code");
        assert_eq!(cheats[0].definition.opcodes, vec![0x0400_0000, 0x1234, 0x63]);
        assert_eq!(cheats[1].definition.name, "Gold (999)");
        assert_eq!(cheats[1].definition.opcodes, vec![0x0400_0000, 0x5678, 0x3E7]);
    }

    #[test]
    fn test_notes_discarded() {
        let (service, result) = parse("[A]\n(enable before loading a save)\n80000001 20000000\n");
        assert_eq!(result.unwrap(), 1);
        let cheats = service.cheats().unwrap();
        assert_eq!(cheats[0].definition.opcodes, vec![0x8000_0001, 0x2000_0000]);
    }

    #[test]
    fn test_hex_case_insensitive() {
        let (service, result) = parse("[A]\ndeadBEEF\n");
        assert_eq!(result.unwrap(), 1);
        assert_eq!(
            service.cheats().unwrap()[0].definition.opcodes,
            vec![0xDEAD_BEEF]
        );
    }

    #[test]
    fn test_empty_cheats_dropped() {
        let (service, result) = parse("[no body]\n[real]\n04000000 00000000 00000001\n");
        assert_eq!(result.unwrap(), 1);
        assert_eq!(service.cheats().unwrap()[0].definition.name, "real");
    }

    #[test]
    fn test_malformed_token_keeps_prior_cheats() {
        let (service, result) = parse(
            "[good]\n04000000 00000000 00000001\n\
             [bad]\n04000000 xyz\n",
        );
        assert!(matches!(result, Err(EngineError::CheatSyntax { .. })));
        // The good cheat and the partially parsed one both survive.
        let cheats = service.cheats().unwrap();
        assert_eq!(cheats.len(), 2);
        assert_eq!(cheats[0].definition.name, "good");
        assert_eq!(cheats[1].definition.opcodes, vec![0x0400_0000]);
    }

    #[test]
    fn test_seven_digit_token_rejected() {
        let (_, result) = parse("[a]\n0400000\n");
        assert!(matches!(result, Err(EngineError::CheatSyntax { .. })));
    }

    #[test]
    fn test_opcode_before_header_rejected() {
        let (_, result) = parse("04000000\n");
        assert!(matches!(result, Err(EngineError::CheatSyntax { .. })));
    }

    #[test]
    fn test_capacity_overflow_flushes_then_errors() {
        let mut text = String::from("[big]\n");
        for _ in 0..=MAX_OPCODES {
            text.push_str("00000001\n");
        }
        let (service, result) = parse(&text);
        assert!(matches!(result, Err(EngineError::CheatSyntax { .. })));
        let cheats = service.cheats().unwrap();
        assert_eq!(cheats.len(), 1);
        assert_eq!(cheats[0].definition.opcodes.len(), MAX_OPCODES);
    }

    #[test]
    fn test_render_groups_instructions() {
        let mut service = MemoryCheatService::new();
        service
            .add_cheat(
                &CheatDefinition {
                    name: "Moon Jump".into(),
                    opcodes: vec![0x8000_0002, 0x0400_0000, 0x1000, 0x42, 0x2000_0000],
                },
                false,
            )
            .unwrap();

        let text = render_cheat_list(&service, &ProcessMetadata::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("[Breeze "));
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "[Moon Jump]");
        assert_eq!(lines[3], "80000002");
        assert_eq!(lines[4], "04000000 00001000 00000042");
        assert_eq!(lines[5], "20000000");
    }

    #[test]
    fn test_round_trip() {
        let source = "{Master}\n04000000 00001234 00000063\n\n\
                      [Gold]\n80000200 04000000 00005678 000003E7 20000000\n";
        let mut first = MemoryCheatService::new();
        parse_cheat_text(source.as_bytes(), &mut first).unwrap();

        let rendered = render_cheat_list(&first, &ProcessMetadata::default()).unwrap();
        let mut second = MemoryCheatService::new();
        parse_cheat_text(rendered.as_bytes(), &mut second).unwrap();

        let a = first.cheats().unwrap();
        let b = second.cheats().unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.definition, y.definition);
        }

        // A second round trip is byte-identical.
        let rendered_again = render_cheat_list(&second, &ProcessMetadata::default()).unwrap();
        assert_eq!(rendered, rendered_again);
    }

    #[test]
    fn test_append_log_stamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let mut service = MemoryCheatService::new();
        service
            .add_cheat(
                &CheatDefinition {
                    name: "A".into(),
                    opcodes: vec![0x2000_0000],
                },
                false,
            )
            .unwrap();

        append_cheat_log(&path, &service, &ProcessMetadata::default()).unwrap();
        append_cheat_log(&path, &service, &ProcessMetadata::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("[A]").count(), 2);
        assert_eq!(text.lines().filter(|l| l.starts_with('(')).count(), 2);
    }
}

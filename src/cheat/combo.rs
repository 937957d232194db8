//! Combo gate: wrap a cheat body in a keypress conditional.
//!
//! A gated body is `0x8kkkkkkk <body> 0x20000000`; the rest of the
//! stream is preserved verbatim between prologue and epilogue. The
//! cheat service has no mutate-in-place, so the service-level wrappers
//! detach the entry, re-register the edited body, and re-serialize the
//! list to disk.

use std::path::Path;

use crate::cheat::{
    codec, CheatDefinition, CheatService, FOLDER_START, KEYPRESS_MASK, KEYPRESS_OPCODE,
    MAX_OPCODES,
};
use crate::error::{EngineError, Result};
use crate::process::ProcessMetadata;

/// Gate `definition` on `keymask`.
///
/// An existing keypress prologue has its mask replaced in place;
/// otherwise the body is wrapped in a fresh prologue/epilogue pair.
/// Fails if the wrapped body would exceed the opcode capacity.
pub fn add_combo(definition: &mut CheatDefinition, keymask: u32) -> Result<()> {
    let prologue = KEYPRESS_OPCODE | (keymask & KEYPRESS_MASK);
    if let Some(first) = definition.opcodes.first_mut() {
        if *first >> 28 == 0x8 {
            *first = prologue;
            return Ok(());
        }
    }
    if definition.opcodes.len() + 2 > MAX_OPCODES {
        return Err(EngineError::internal(
            "cheat too large to wrap in a combo gate",
        ));
    }
    definition.opcodes.insert(0, prologue);
    definition.opcodes.push(FOLDER_START);
    Ok(())
}

/// Strip a combo gate from `definition`.
///
/// Returns `false` (leaving the body unchanged) when the first and last
/// opcodes are not a keypress/terminator pair.
pub fn remove_combo(definition: &mut CheatDefinition) -> bool {
    let gated = definition.opcodes.len() >= 2
        && definition.opcodes.first().is_some_and(|w| w >> 28 == 0x8)
        && definition.opcodes.last().is_some_and(|w| w >> 28 == 0x2);
    if !gated {
        return false;
    }
    definition.opcodes.remove(0);
    definition.opcodes.pop();
    true
}

/// Button mask of a gated definition, if any.
pub fn combo_mask(definition: &CheatDefinition) -> Option<u32> {
    definition
        .opcodes
        .first()
        .filter(|&&w| w >> 28 == 0x8)
        .map(|w| w & KEYPRESS_MASK)
}

fn reregister(
    service: &mut dyn CheatService,
    id: u32,
    enabled: bool,
    definition: &CheatDefinition,
) -> Result<u32> {
    service.remove_cheat(id)?;
    if id == 0 {
        service.set_master_cheat(definition)?;
        Ok(0)
    } else {
        service.add_cheat(definition, enabled)
    }
}

/// Gate a registered cheat on `keymask` and persist the updated list.
///
/// Returns the cheat's new service id.
pub fn set_combo(
    service: &mut dyn CheatService,
    id: u32,
    keymask: u32,
    metadata: &ProcessMetadata,
    list_path: &Path,
) -> Result<u32> {
    let entry = service.get_cheat(id)?;
    let mut definition = entry.definition;
    add_combo(&mut definition, keymask)?;
    let new_id = reregister(service, id, entry.enabled, &definition)?;
    codec::write_cheat_file(list_path, service, metadata)?;
    Ok(new_id)
}

/// Strip a registered cheat's combo gate and persist the updated list.
///
/// Returns the new id, or `None` when the entry carried no gate (the
/// service is left untouched).
pub fn clear_combo(
    service: &mut dyn CheatService,
    id: u32,
    metadata: &ProcessMetadata,
    list_path: &Path,
) -> Result<Option<u32>> {
    let entry = service.get_cheat(id)?;
    let mut definition = entry.definition;
    if !remove_combo(&mut definition) {
        return Ok(None);
    }
    let new_id = reregister(service, id, entry.enabled, &definition)?;
    codec::write_cheat_file(list_path, service, metadata)?;
    Ok(Some(new_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cheat::MemoryCheatService;
    use pretty_assertions::assert_eq;

    fn body() -> CheatDefinition {
        CheatDefinition {
            name: "Jump".into(),
            opcodes: vec![0x0400_0010, 0x0000_0000, 0xDEAD_BEEF],
        }
    }

    #[test]
    fn test_add_then_remove_restores_body() {
        let mut definition = body();
        add_combo(&mut definition, 0x0000_0200).unwrap();
        assert_eq!(
            definition.opcodes,
            vec![0x8000_0200, 0x0400_0010, 0x0000_0000, 0xDEAD_BEEF, 0x2000_0000]
        );
        assert_eq!(combo_mask(&definition), Some(0x200));

        assert!(remove_combo(&mut definition));
        assert_eq!(definition, body());
    }

    #[test]
    fn test_add_replaces_existing_mask() {
        let mut definition = body();
        add_combo(&mut definition, 0x0000_0200).unwrap();
        add_combo(&mut definition, 0x0000_0003).unwrap();
        assert_eq!(definition.opcodes[0], 0x8000_0003);
        assert_eq!(definition.opcodes.len(), body().opcodes.len() + 2);
    }

    #[test]
    fn test_mask_clamped_to_28_bits() {
        let mut definition = body();
        add_combo(&mut definition, 0xF000_0001).unwrap();
        assert_eq!(definition.opcodes[0], 0x8000_0001);
    }

    #[test]
    fn test_remove_without_gate_is_noop() {
        let mut definition = body();
        assert!(!remove_combo(&mut definition));
        assert_eq!(definition, body());
    }

    #[test]
    fn test_add_rejects_overfull_body() {
        let mut definition = CheatDefinition {
            name: "big".into(),
            opcodes: vec![0x0100_0000; MAX_OPCODES - 1],
        };
        assert!(matches!(
            add_combo(&mut definition, 1),
            Err(EngineError::Internal { .. })
        ));
    }

    #[test]
    fn test_set_combo_reregisters_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let list_path = dir.path().join("cheats.txt");
        let mut service = MemoryCheatService::new();
        let id = service.add_cheat(&body(), true).unwrap();

        let new_id = set_combo(
            &mut service,
            id,
            0x0000_0200,
            &ProcessMetadata::default(),
            &list_path,
        )
        .unwrap();
        assert_ne!(new_id, id);

        let entry = service.get_cheat(new_id).unwrap();
        assert!(entry.enabled);
        assert_eq!(entry.definition.opcodes[0], 0x8000_0200);
        assert!(std::fs::read_to_string(&list_path)
            .unwrap()
            .contains("80000200"));

        let cleared = clear_combo(
            &mut service,
            new_id,
            &ProcessMetadata::default(),
            &list_path,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            service.get_cheat(cleared).unwrap().definition,
            body()
        );
    }

    #[test]
    fn test_clear_combo_reports_missing_gate() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = MemoryCheatService::new();
        let id = service.add_cheat(&body(), false).unwrap();
        let result = clear_combo(
            &mut service,
            id,
            &ProcessMetadata::default(),
            &dir.path().join("cheats.txt"),
        )
        .unwrap();
        assert_eq!(result, None);
        // Untouched entry keeps its id.
        assert!(service.get_cheat(id).is_ok());
    }
}

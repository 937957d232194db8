//! Cheat entries and the cheat-service capability.
//!
//! Cheat entries are owned by the platform cheat service; the engine
//! holds transient copies while parsing, editing or rendering them. The
//! in-memory service backs offline tooling and tests.

pub mod codec;
pub mod combo;
pub mod download;

use crate::error::{EngineError, Result};

/// Maximum opcode words in one cheat entry.
pub const MAX_OPCODES: usize = 0x100;

/// Capacity of a cheat name, including the terminating NUL.
pub const NAME_CAPACITY: usize = 0x40;

/// Opcode starting a folder group (also the combo-gate epilogue).
pub const FOLDER_START: u32 = 0x2000_0000;

/// Opcode closing the most recent unmatched folder start.
pub const FOLDER_END: u32 = 0x2000_0001;

/// Prefix word of a combo-gate prologue; the low 28 bits carry the
/// button mask.
pub const KEYPRESS_OPCODE: u32 = 0x8000_0000;

/// Mask of the button bits in a keypress opcode.
pub const KEYPRESS_MASK: u32 = 0x0FFF_FFFF;

/// Name and opcode body of a cheat, detached from any service identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheatDefinition {
    /// Display name, truncated to the fixed name buffer.
    pub name: String,
    /// Opcode words, at most [`MAX_OPCODES`].
    pub opcodes: Vec<u32>,
}

impl CheatDefinition {
    /// Build a definition from raw name bytes, truncating to the name
    /// buffer and passing non-UTF-8 bytes through lossily.
    pub fn from_name_bytes(name: &[u8]) -> Self {
        let len = name.len().min(NAME_CAPACITY - 1);
        CheatDefinition {
            name: String::from_utf8_lossy(&name[..len]).into_owned(),
            opcodes: Vec::new(),
        }
    }

    /// Append one opcode word; fails when the entry is full.
    pub fn push_opcode(&mut self, opcode: u32) -> Result<()> {
        if self.opcodes.len() >= MAX_OPCODES {
            return Err(EngineError::internal("cheat opcode buffer full"));
        }
        self.opcodes.push(opcode);
        Ok(())
    }
}

/// A cheat as registered with the cheat service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheatEntry {
    /// Service-assigned identity; zero is the master code.
    pub id: u32,
    /// Whether the cheat is currently enabled.
    pub enabled: bool,
    /// Name and opcode body.
    pub definition: CheatDefinition,
}

impl CheatEntry {
    /// Whether this is the master code.
    pub fn is_master(&self) -> bool {
        self.id == 0
    }
}

/// Capability handle onto the platform cheat service.
///
/// The service owns the entries; there is no mutate-in-place, so edits
/// detach and re-register. Implementations are not required to be
/// thread-safe; callers serialize.
pub trait CheatService {
    /// Enumerate all registered cheats, master code first.
    fn cheats(&self) -> Result<Vec<CheatEntry>>;

    /// Fetch one cheat by id.
    fn get_cheat(&self, id: u32) -> Result<CheatEntry>;

    /// Register a regular cheat; returns its assigned id.
    fn add_cheat(&mut self, definition: &CheatDefinition, enabled: bool) -> Result<u32>;

    /// Remove a cheat by id.
    fn remove_cheat(&mut self, id: u32) -> Result<()>;

    /// Install the master code (id zero, enabled on load).
    fn set_master_cheat(&mut self, definition: &CheatDefinition) -> Result<()>;

    /// Flip a cheat's enabled state.
    fn toggle_cheat(&mut self, id: u32) -> Result<()>;
}

/// In-memory cheat service for offline tooling and tests.
#[derive(Debug)]
pub struct MemoryCheatService {
    master: Option<CheatEntry>,
    cheats: Vec<CheatEntry>,
    next_id: u32,
}

impl Default for MemoryCheatService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCheatService {
    /// Empty service.
    pub fn new() -> Self {
        MemoryCheatService {
            master: None,
            cheats: Vec::new(),
            next_id: 1,
        }
    }
}

impl CheatService for MemoryCheatService {
    fn cheats(&self) -> Result<Vec<CheatEntry>> {
        let mut out = Vec::new();
        if let Some(master) = &self.master {
            out.push(master.clone());
        }
        out.extend(self.cheats.iter().cloned());
        Ok(out)
    }

    fn get_cheat(&self, id: u32) -> Result<CheatEntry> {
        if id == 0 {
            return self
                .master
                .clone()
                .ok_or_else(|| EngineError::process("no master cheat registered"));
        }
        self.cheats
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| EngineError::process(format!("no cheat with id {id}")))
    }

    fn add_cheat(&mut self, definition: &CheatDefinition, enabled: bool) -> Result<u32> {
        let id = self.next_id;
        self.next_id += 1;
        self.cheats.push(CheatEntry {
            id,
            enabled,
            definition: definition.clone(),
        });
        Ok(id)
    }

    fn remove_cheat(&mut self, id: u32) -> Result<()> {
        if id == 0 {
            self.master = None;
            return Ok(());
        }
        let before = self.cheats.len();
        self.cheats.retain(|c| c.id != id);
        if self.cheats.len() == before {
            return Err(EngineError::process(format!("no cheat with id {id}")));
        }
        Ok(())
    }

    fn set_master_cheat(&mut self, definition: &CheatDefinition) -> Result<()> {
        self.master = Some(CheatEntry {
            id: 0,
            enabled: true,
            definition: definition.clone(),
        });
        Ok(())
    }

    fn toggle_cheat(&mut self, id: u32) -> Result<()> {
        if id == 0 {
            if let Some(master) = &mut self.master {
                master.enabled = !master.enabled;
                return Ok(());
            }
            return Err(EngineError::process("no master cheat registered"));
        }
        self.cheats
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| c.enabled = !c.enabled)
            .ok_or_else(|| EngineError::process(format!("no cheat with id {id}")))
    }
}

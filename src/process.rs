//! Process-side types and the capabilities the engine consumes.
//!
//! The engine never talks to the platform cheat service directly; the
//! embedding application injects an implementation of [`CheatProcess`]
//! at call time. The engine treats the metadata record as opaque except
//! for the heap and main extents.

use bitflags::bitflags;

use crate::error::Result;

/// Length of the build-id blob in the process metadata.
pub const BUILD_ID_LEN: usize = 32;

bitflags! {
    /// Permission bits of a mapped memory region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryPermission: u32 {
        /// Region is readable.
        const READ = 1;
        /// Region is writable.
        const WRITE = 2;
        /// Region is executable.
        const EXECUTE = 4;
    }
}

/// Base and size of one mapped extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionExtents {
    /// Base address.
    pub base: u64,
    /// Size in bytes.
    pub size: u64,
}

impl RegionExtents {
    /// One-past-the-end address.
    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Whether `value` lies inside this extent.
    pub fn contains(&self, value: u64) -> bool {
        value >= self.base && value < self.end()
    }
}

/// Metadata of the attached cheat process as reported by the platform
/// cheat service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessMetadata {
    /// Kernel process id.
    pub process_id: u64,
    /// Title id of the running application.
    pub title_id: u64,
    /// Extents of the main executable module.
    pub main_extents: RegionExtents,
    /// Extents of the heap region.
    pub heap_extents: RegionExtents,
    /// Extents of the alias region.
    pub alias_extents: RegionExtents,
    /// Extents of the whole address space.
    pub address_space_extents: RegionExtents,
    /// Build id of the main module.
    pub build_id: [u8; BUILD_ID_LEN],
}

impl ProcessMetadata {
    /// Build id rendered as the conventional 16-digit uppercase prefix.
    pub fn build_id_hex(&self) -> String {
        hex::encode_upper(&self.build_id[..8])
    }
}

/// One entry of the process memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Region base address.
    pub addr: u64,
    /// Region size in bytes; zero signals the end of the map.
    pub size: u64,
    /// Region permissions.
    pub perm: MemoryPermission,
}

impl MemoryInfo {
    /// One-past-the-end address of the region.
    pub fn end(&self) -> u64 {
        self.addr + self.size
    }
}

/// Capability handle onto the attached cheat process.
///
/// `read_memory` and `query_memory` may fail transiently; the scanner
/// recovers by skipping the affected window or candidate. A failed
/// `metadata` call is fatal for a run.
pub trait CheatProcess {
    /// Whether a cheat process is currently attached.
    fn has_cheat_process(&self) -> bool {
        true
    }

    /// Ask the service to attach to the running application.
    fn force_open_cheat_process(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch the process metadata record.
    fn metadata(&self) -> Result<ProcessMetadata>;

    /// Query the memory map entry containing or following `address`.
    fn query_memory(&self, address: u64) -> Result<MemoryInfo>;

    /// Read `out.len()` bytes of process memory starting at `address`.
    fn read_memory(&self, address: u64, out: &mut [u8]) -> Result<()>;
}

/// Cold observer interface for scan progress.
///
/// Called from the scanning thread between windows; implementations must
/// not block.
pub trait ProgressSink {
    /// Observe cumulative progress of the current run.
    fn on_progress(&self, bytes_scanned: u64, entries_written: u64);
}

/// Best-effort user notification capability. Must never block or fail.
pub trait Notifier {
    /// Deliver a short message to the user.
    fn notify(&self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extents_contains() {
        let e = RegionExtents {
            base: 0x1000,
            size: 0x100,
        };
        assert!(e.contains(0x1000));
        assert!(e.contains(0x10FF));
        assert!(!e.contains(0x1100));
        assert!(!e.contains(0xFFF));
    }

    #[test]
    fn test_permissions() {
        let p = MemoryPermission::READ | MemoryPermission::WRITE;
        assert!(p.contains(MemoryPermission::READ));
        assert!(!p.contains(MemoryPermission::EXECUTE));
    }

    #[test]
    fn test_build_id_hex() {
        let mut meta = ProcessMetadata::default();
        meta.build_id[0] = 0xAB;
        meta.build_id[7] = 0x01;
        assert_eq!(meta.build_id_hex(), "AB00000000000001");
    }
}

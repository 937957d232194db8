//! Candidate file index.
//!
//! Candidate files live under aliased roots (the mounted card path and
//! its bare alias), so the same file can be visible twice. Listing
//! deduplicates by filename stem; the latest file by modification time
//! seeds the "continue last search" flow.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{EngineError, Result};
use crate::format;
use crate::types::SearchCondition;

/// The aliased roots candidate files conventionally live under: the
/// mounted card path and its bare alias.
pub fn default_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("sdmc:/switch/Breeze"),
        PathBuf::from("/switch/Breeze"),
    ]
}

/// Normalize a user-supplied stem: strip a trailing `.dat`, default an
/// empty stem to `1`.
pub fn sanitize_stem(stem: &str) -> String {
    let stem = stem.strip_suffix(".dat").unwrap_or(stem);
    if stem.is_empty() {
        "1".to_string()
    } else {
        stem.to_string()
    }
}

/// Filename stem of a path: basename minus a `.dat` extension.
pub fn stem_of(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file.strip_suffix(".dat").unwrap_or(&file).to_string()
}

/// Output path for a candidate stem under a root directory.
pub fn candidate_path(root: &Path, stem: &str) -> PathBuf {
    root.join(format!("{}.dat", sanitize_stem(stem)))
}

/// List `.dat` files across the given roots, sorted lexicographically
/// and deduplicated by stem (first occurrence wins).
///
/// Unreadable roots are skipped silently; aliased roots presenting the
/// same file twice collapse to one entry.
pub fn list_candidates(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dat = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("dat"))
                .unwrap_or(false);
            if is_dat {
                found.push(path);
            }
        }
    }

    found.sort();
    let mut stems = HashSet::new();
    found
        .into_iter()
        .filter(|path| stems.insert(stem_of(path)))
        .collect()
}

/// Find the most recently modified candidate file under the roots and
/// return its embedded condition together with its path.
pub fn load_latest_condition(roots: &[PathBuf]) -> Result<(SearchCondition, PathBuf)> {
    let files = list_candidates(roots);
    if files.is_empty() {
        return Err(EngineError::NoCandidates {
            roots: roots
                .iter()
                .map(|r| r.to_string_lossy().into_owned())
                .collect(),
        });
    }

    let mut latest: Option<(PathBuf, SystemTime)> = None;
    for file in files {
        let mtime = match std::fs::metadata(&file).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => continue,
        };
        match &latest {
            Some((_, best)) if mtime <= *best => {}
            _ => latest = Some((file, mtime)),
        }
    }
    let (path, _) = latest.ok_or_else(|| EngineError::NoCandidates {
        roots: roots
            .iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect(),
    })?;

    let header = format::read_header(&path)?;
    Ok((header.condition, path))
}

//! Cheat file download hook.
//!
//! Thin glue over an injected HTTP capability: a list of URL templates
//! is tried in order from a persistent cursor until one yields a file,
//! then versioned `.vN.txt` variants are laddered and the last success
//! wins. A sibling `notes.txt` is fetched best-effort.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::process::ProcessMetadata;

/// HTTP download capability supplied by the environment.
pub trait HttpFetcher {
    /// Download `url` to `dest`; returns success.
    fn download(&self, url: &str, dest: &Path, overwrite: bool, follow_redirects: bool) -> bool;
}

/// Highest `.vN.txt` variant probed after a base file succeeds.
pub const MAX_VERSION_PROBE: u32 = 15;

/// Ordered cheat-source templates with a persistent "try next source"
/// cursor.
#[derive(Debug, Clone, Default)]
pub struct SourceList {
    templates: Vec<String>,
    next: usize,
}

impl SourceList {
    /// Parse a template list: one URL per line, blanks and `#` comments
    /// skipped.
    pub fn parse(text: &str) -> Self {
        let templates = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        SourceList {
            templates,
            next: 0,
        }
    }

    /// Number of configured sources.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no sources are configured.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Index of the source the next fetch will start from.
    pub fn cursor(&self) -> usize {
        self.next
    }

    /// Move the cursor past the current source ("try next source").
    pub fn advance(&mut self) {
        if !self.templates.is_empty() {
            self.next = (self.next + 1) % self.templates.len();
        }
    }
}

/// Expand the `{TID}`, `{BID}`, `{bid}` and `{TITLE}` placeholders of a
/// source template.
pub fn expand_template(template: &str, metadata: &ProcessMetadata, title: &str) -> String {
    let bid = metadata.build_id_hex();
    template
        .replace("{TID}", &format!("{:016X}", metadata.title_id))
        .replace("{BID}", &bid)
        .replace("{bid}", &bid.to_lowercase())
        .replace("{TITLE}", title)
}

/// Fetch a cheat file for the process, trying sources from the cursor
/// onward.
///
/// The first template whose base URL downloads wins; its `.v1.txt`
/// through `.v15.txt` variants are then probed in ascending order and
/// the last success becomes the returned file. The cursor stays on the
/// winning source so a later [`SourceList::advance`] retries elsewhere.
pub fn fetch_cheat_file(
    http: &dyn HttpFetcher,
    sources: &mut SourceList,
    metadata: &ProcessMetadata,
    title: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    if sources.is_empty() {
        return Err(EngineError::NoSource {
            title_id: metadata.title_id,
        });
    }

    let count = sources.len();
    for attempt in 0..count {
        let index = (sources.next + attempt) % count;
        let url = expand_template(&sources.templates[index], metadata, title);

        let base_dest = dest_dir.join("download.txt");
        if !http.download(&url, &base_dest, true, true) {
            continue;
        }

        let mut best = base_dest;
        for version in 1..=MAX_VERSION_PROBE {
            let variant_url = format!("{url}.v{version}.txt");
            let variant_dest = dest_dir.join(format!("download.v{version}.txt"));
            if http.download(&variant_url, &variant_dest, true, true) {
                best = variant_dest;
            }
        }

        // Best-effort sibling notes file.
        if let Some(slash) = url.rfind('/') {
            let notes_url = format!("{}/notes.txt", &url[..slash]);
            let _ = http.download(&notes_url, &dest_dir.join("notes.txt"), true, true);
        }

        sources.next = index;
        return Ok(best);
    }

    Err(EngineError::NoSource {
        title_id: metadata.title_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    struct MockHttp {
        available: Vec<String>,
        requested: RefCell<Vec<String>>,
    }

    impl MockHttp {
        fn new(available: &[&str]) -> Self {
            MockHttp {
                available: available.iter().map(|s| s.to_string()).collect(),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl HttpFetcher for MockHttp {
        fn download(&self, url: &str, dest: &Path, _overwrite: bool, _redirects: bool) -> bool {
            self.requested.borrow_mut().push(url.to_string());
            if self.available.iter().any(|a| a == url) {
                std::fs::write(dest, url).unwrap();
                true
            } else {
                false
            }
        }
    }

    fn metadata() -> ProcessMetadata {
        let mut metadata = ProcessMetadata {
            title_id: 0x0100_0000_0000_1000,
            ..Default::default()
        };
        metadata.build_id[0] = 0xAB;
        metadata
    }

    #[test]
    fn test_template_expansion() {
        let expanded = expand_template(
            "https://host/c/{TID}/{BID}.txt?t={TITLE}&b={bid}",
            &metadata(),
            "Game",
        );
        assert_eq!(
            expanded,
            "https://host/c/0100000000001000/AB00000000000000.txt?t=Game&b=ab00000000000000"
        );
    }

    #[test]
    fn test_source_list_parse_skips_comments() {
        let list = SourceList::parse("# sources\nhttps://a/{TID}.txt\n\nhttps://b/{TID}.txt\n");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_fetch_prefers_latest_version_variant() {
        let http = MockHttp::new(&[
            "https://a/0100000000001000.txt",
            "https://a/0100000000001000.txt.v1.txt",
            "https://a/0100000000001000.txt.v3.txt",
        ]);
        let mut sources = SourceList::parse("https://a/{TID}.txt\n");
        let dir = tempfile::tempdir().unwrap();

        let path =
            fetch_cheat_file(&http, &mut sources, &metadata(), "Game", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "download.v3.txt");
        // Every variant up to the cap was probed.
        let requested = http.requested.borrow();
        assert!(requested
            .iter()
            .any(|u| u.ends_with(".v15.txt") && !u.contains("notes")));
    }

    #[test]
    fn test_fetch_tries_sources_in_order() {
        let http = MockHttp::new(&["https://b/0100000000001000.txt"]);
        let mut sources =
            SourceList::parse("https://a/{TID}.txt\nhttps://b/{TID}.txt\n");
        let dir = tempfile::tempdir().unwrap();

        let path =
            fetch_cheat_file(&http, &mut sources, &metadata(), "Game", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "download.txt");
        assert_eq!(sources.cursor(), 1);
    }

    #[test]
    fn test_fetch_resumes_from_cursor_after_advance() {
        let http = MockHttp::new(&[
            "https://a/0100000000001000.txt",
            "https://b/0100000000001000.txt",
        ]);
        let mut sources =
            SourceList::parse("https://a/{TID}.txt\nhttps://b/{TID}.txt\n");
        let dir = tempfile::tempdir().unwrap();

        fetch_cheat_file(&http, &mut sources, &metadata(), "Game", dir.path()).unwrap();
        assert_eq!(sources.cursor(), 0);
        sources.advance();
        fetch_cheat_file(&http, &mut sources, &metadata(), "Game", dir.path()).unwrap();
        assert_eq!(sources.cursor(), 1);
    }

    #[test]
    fn test_fetch_notes_best_effort() {
        let http = MockHttp::new(&["https://a/c/0100000000001000.txt"]);
        let mut sources = SourceList::parse("https://a/c/{TID}.txt\n");
        let dir = tempfile::tempdir().unwrap();

        fetch_cheat_file(&http, &mut sources, &metadata(), "Game", dir.path()).unwrap();
        assert!(http
            .requested
            .borrow()
            .contains(&"https://a/c/notes.txt".to_string()));
    }

    #[test]
    fn test_fetch_no_source() {
        let http = MockHttp::new(&[]);
        let mut sources = SourceList::parse("https://a/{TID}.txt\n");
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            fetch_cheat_file(&http, &mut sources, &metadata(), "Game", dir.path()),
            Err(EngineError::NoSource { .. })
        ));
    }
}

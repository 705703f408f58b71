//! Durable record of items handled in the current scan session.
//!
//! One `pdf_uri<TAB>parent_uri` line per completed item, appended and flushed
//! as each item finishes. Loaded fully at startup.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::PdfPair;

/// Append-only set of completed `(pdf_uri, parent_uri)` keys.
#[derive(Debug)]
pub struct CompletedScanSet {
    path: PathBuf,
    completed: HashSet<PdfPair>,
    file: File,
}

impl CompletedScanSet {
    /// Open the ledger at `path`, loading any entries from a previous run.
    ///
    /// A partially written final line (no trailing newline) is dropped, so an
    /// item interrupted mid-append is processed again.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        let complete = complete_prefix_len(&bytes);
        let completed = parse_ledger(&String::from_utf8_lossy(&bytes[..complete]));

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if complete < bytes.len() {
            warn!("Ledger {} ends with a partial entry, ignoring it", path.display());
            file.set_len(complete as u64)?;
            file.sync_data()?;
        }

        debug!("Loaded {} completed items from {}", completed.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            completed,
            file,
        })
    }

    /// Open the ledger after discarding everything in it.
    pub fn fresh(path: &Path) -> io::Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Self::open(path)
    }

    pub fn contains(&self, pair: &PdfPair) -> bool {
        self.completed.contains(pair)
    }

    /// Record a completed item and flush it to disk before returning.
    pub fn mark(&mut self, pair: &PdfPair) -> io::Result<()> {
        if self.completed.contains(pair) {
            return Ok(());
        }
        writeln!(self.file, "{}\t{}", pair.pdf_uri, pair.parent_uri)?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.completed.insert(pair.clone());
        Ok(())
    }

    /// Discard all entries, in memory and on disk.
    pub fn clear(&mut self) -> io::Result<()> {
        self.file.set_len(0)?;
        self.file.sync_data()?;
        self.completed.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Length of the ledger up to and including its last newline.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0)
}

fn parse_ledger(text: &str) -> HashSet<PdfPair> {
    text.lines()
        .filter_map(|line| {
            let (pdf_uri, parent_uri) = line.trim_end_matches('\r').split_once('\t')?;
            if pdf_uri.is_empty() {
                return None;
            }
            Some(PdfPair::new(pdf_uri, parent_uri))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: u32) -> PdfPair {
        PdfPair::new(
            format!("https://x.sfsu.edu/{n}.pdf"),
            "https://x.sfsu.edu/page1",
        )
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed_conformance");

        let mut ledger = CompletedScanSet::open(&path).unwrap();
        ledger.mark(&pair(1)).unwrap();
        ledger.mark(&pair(2)).unwrap();
        ledger.mark(&pair(1)).unwrap();
        drop(ledger);

        let ledger = CompletedScanSet::open(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&pair(1)));
        assert!(!ledger.contains(&pair(3)));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("https://x.sfsu.edu/1.pdf\thttps://x.sfsu.edu/page1\n"));
    }

    #[test]
    fn test_torn_last_line_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed_conformance");
        std::fs::write(
            &path,
            "https://x.sfsu.edu/1.pdf\thttps://x.sfsu.edu/page1\nhttps://x.sfsu.edu/2.pdf\thttps://x.sfsu.e",
        )
        .unwrap();

        let mut ledger = CompletedScanSet::open(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.contains(&pair(2)));

        ledger.mark(&pair(2)).unwrap();
        drop(ledger);

        let ledger = CompletedScanSet::open(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&pair(1)));
        assert!(ledger.contains(&pair(2)));
    }

    #[test]
    fn test_clear_and_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed_conformance");

        let mut ledger = CompletedScanSet::open(&path).unwrap();
        ledger.mark(&pair(1)).unwrap();
        ledger.clear().unwrap();
        assert!(ledger.is_empty());
        ledger.mark(&pair(2)).unwrap();
        drop(ledger);

        let ledger = CompletedScanSet::open(&path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&pair(2)));
        drop(ledger);

        let ledger = CompletedScanSet::fresh(&path).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_entry_without_parent_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed_conformance");
        let lonely = PdfPair::new("https://x.sfsu.edu/lonely.pdf", "");

        let mut ledger = CompletedScanSet::open(&path).unwrap();
        ledger.mark(&lonely).unwrap();
        drop(ledger);

        assert!(CompletedScanSet::open(&path).unwrap().contains(&lonely));
    }
}

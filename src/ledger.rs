//! Processed-image ledger.
//!
//! Persists the set of filenames already handled so repeated runs stay
//! idempotent. The record is a single JSON object with one field holding
//! the filenames as an unordered list.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default ledger location, next to the executable's working directory.
pub const LEDGER_FILE: &str = "processed.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerRecord {
    // A record without the field reads as an empty set; only actual
    // malformed JSON is a data error.
    #[serde(default)]
    processed_images: Vec<String>,
}

/// The on-disk set of filenames already processed.
///
/// Every operation does a full load or load+save round trip; there is no
/// in-memory cache across calls. Single writer assumed — two interleaved
/// read-modify-write cycles can lose an update.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Ledger { path: path.into() }
    }

    /// Reads the persisted set. A missing file is an empty set; a
    /// malformed record is a data error propagated to the caller.
    pub fn load(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let record: LedgerRecord = serde_json::from_str(&contents)?;
        Ok(record.processed_images.into_iter().collect())
    }

    /// Adds `filename` to the persisted set: fresh load, insert, save.
    pub fn mark_processed(&self, filename: &str) -> Result<()> {
        let mut processed = self.load()?;
        processed.insert(filename.to_string());

        let record = LedgerRecord {
            processed_images: processed.into_iter().collect(),
        };
        let payload = serde_json::to_string_pretty(&record)?;

        // Write to a sibling temp file and rename, so a crash mid-write
        // cannot leave a truncated record behind.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CopyStudioError;

    fn temp_ledger(name: &str) -> Ledger {
        let dir = std::env::temp_dir().join(format!("copy-studio-ledger-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{name}.json"));
        let _ = fs::remove_file(&path);
        Ledger::new(path)
    }

    #[test]
    fn test_missing_file_is_empty_set() {
        let ledger = temp_ledger("missing");
        assert!(ledger.load().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let ledger = temp_ledger("round_trip");
        ledger.mark_processed("a.jpg").unwrap();
        ledger.mark_processed("b.png").unwrap();

        let processed = ledger.load().unwrap();
        assert!(processed.contains("a.jpg"));
        assert!(processed.contains("b.png"));
        assert_eq!(processed.len(), 2);
    }

    #[test]
    fn test_marking_twice_is_idempotent() {
        let ledger = temp_ledger("idempotent");
        ledger.mark_processed("a.jpg").unwrap();
        ledger.mark_processed("a.jpg").unwrap();
        assert_eq!(ledger.load().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_field_is_empty_set() {
        let ledger = temp_ledger("missing_field");
        fs::write(&ledger.path, "{}").unwrap();
        assert!(ledger.load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let ledger = temp_ledger("malformed");
        fs::write(&ledger.path, "not json at all").unwrap();
        assert!(matches!(ledger.load(), Err(CopyStudioError::Json(_))));
    }

    #[test]
    fn test_record_shape_on_disk() {
        let ledger = temp_ledger("shape");
        ledger.mark_processed("a.jpg").unwrap();

        let raw = fs::read_to_string(&ledger.path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["processed_images"][0], "a.jpg");
    }
}

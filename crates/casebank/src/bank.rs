//! FileBank: filesystem-based case storage with directory sharding.
//!
//! Layout:
//! ```text
//! {base_path}/
//! └── cases/
//!     ├── ab/
//!     │   └── cde123....json   # CaseEntry (measure + provenance + cached scores)
//!     └── 12/
//!         └── 3456789....json
//! ```
//!
//! Entries are append-only and content-addressed: the id is the structural
//! hash of the measure, so inserting a duplicate measure is a no-op that
//! returns the existing id.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::BankConfig;
use crate::entry::CaseEntry;
use crate::hash::CaseId;

/// Trait for case storage backends.
///
/// Allows an in-memory implementation for tests alongside the filesystem
/// bank.
pub trait CaseStore: Send + Sync {
    /// Store a case, returning its content-derived id.
    ///
    /// If a structurally identical measure is already stored, returns the
    /// existing id without writing.
    fn add(&self, entry: &CaseEntry) -> Result<CaseId>;

    /// Retrieve a case by id. `Ok(None)` if the id doesn't exist.
    fn get(&self, id: &CaseId) -> Result<Option<CaseEntry>>;

    /// Check existence without reading the entry.
    fn contains(&self, id: &CaseId) -> bool;

    /// All stored ids, in no particular order.
    fn keys(&self) -> Result<Vec<CaseId>>;

    /// Ids of entries matching a predicate. Never returns more ids than
    /// the bank holds.
    fn query(&self, predicate: &dyn Fn(&CaseEntry) -> bool) -> Result<Vec<CaseId>>;

    /// Number of stored cases.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.keys()?.is_empty())
    }
}

/// Filesystem-backed case bank.
#[derive(Debug, Clone)]
pub struct FileBank {
    config: BankConfig,
}

impl FileBank {
    /// Open a bank with the given configuration, creating the cases
    /// directory unless read-only.
    pub fn new(config: BankConfig) -> Result<Self> {
        if !config.read_only {
            fs::create_dir_all(config.cases_dir())
                .context("failed to create case bank directory")?;
        }
        Ok(Self { config })
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(BankConfig::with_base_path(path))
    }

    pub fn read_only_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(BankConfig::read_only(path))
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    fn case_path(&self, id: &CaseId) -> PathBuf {
        self.config
            .cases_dir()
            .join(id.prefix())
            .join(format!("{}.json", id.remainder()))
    }

    /// Load every id currently in the bank. A convenience snapshot for
    /// callers that scan the whole bank repeatedly.
    pub fn load(&self) -> Result<Vec<CaseId>> {
        self.keys()
    }
}

impl CaseStore for FileBank {
    fn add(&self, entry: &CaseEntry) -> Result<CaseId> {
        if self.config.read_only {
            anyhow::bail!("case bank is in read-only mode");
        }

        let id = CaseId::from_measure(&entry.measure).context("hashing measure content")?;
        let path = self.case_path(&id);

        if path.exists() {
            // Structural duplicate - append-only store keeps the original.
            debug!(id = %id, "duplicate case, keeping existing entry");
            return Ok(id);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create case shard directory")?;
        }

        let json = serde_json::to_string(entry).context("failed to serialize case entry")?;
        fs::write(&path, json).context("failed to write case file")?;
        debug!(id = %id, source = %entry.provenance.source_file, "stored case");

        Ok(id)
    }

    fn get(&self, id: &CaseId) -> Result<Option<CaseEntry>> {
        let path = self.case_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).context("failed to read case file")?;
        let entry: CaseEntry =
            serde_json::from_str(&json).context("failed to parse case entry")?;
        Ok(Some(entry))
    }

    fn contains(&self, id: &CaseId) -> bool {
        self.case_path(id).exists()
    }

    fn keys(&self) -> Result<Vec<CaseId>> {
        let cases_dir = self.config.cases_dir();
        if !cases_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for shard in fs::read_dir(&cases_dir).context("failed to read cases directory")? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            let prefix = shard.file_name().to_string_lossy().into_owned();

            for file in fs::read_dir(shard.path()).context("failed to read shard directory")? {
                let file = file?;
                let name = file.file_name().to_string_lossy().into_owned();
                let Some(stem) = name.strip_suffix(".json") else {
                    continue;
                };
                if let Ok(id) = format!("{prefix}{stem}").parse::<CaseId>() {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    fn query(&self, predicate: &dyn Fn(&CaseEntry) -> bool) -> Result<Vec<CaseId>> {
        let mut matched = Vec::new();
        for id in self.keys()? {
            if let Some(entry) = self.get(&id)? {
                if predicate(&entry) {
                    matched.push(id);
                }
            }
        }
        Ok(matched)
    }
}

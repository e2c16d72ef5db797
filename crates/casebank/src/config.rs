//! Case bank configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `FRETWORK_BANK_PATH`: Base path for case storage
//! - `FRETWORK_BANK_READONLY`: Set to "true" for read-only mode
//!
//! Default path: `~/.fretwork/bank`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration for the filesystem case bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankConfig {
    /// Base path; cases are stored under `{base_path}/cases/`.
    pub base_path: PathBuf,

    /// Read-only mode - prevents any writes. Batch retrieval jobs open the
    /// bank read-only so a concurrent retain cannot slip in between scans.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            base_path: default_bank_path(),
            read_only: false,
        }
    }
}

fn default_bank_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".fretwork").join("bank"))
        .unwrap_or_else(|| PathBuf::from(".fretwork/bank"))
}

impl BankConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let base_path = env::var("FRETWORK_BANK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_bank_path());

        let read_only = env::var("FRETWORK_BANK_READONLY")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            base_path,
            read_only,
        })
    }

    /// Load configuration from a TOML file's `[bank]` section, falling back
    /// to the environment when the section is absent.
    ///
    /// ```toml
    /// [bank]
    /// base_path = "/srv/fretwork/bank"
    /// read_only = false
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(section) = table.get("bank") {
            let config: BankConfig = section
                .clone()
                .try_into()
                .context("failed to parse [bank] section")?;
            Ok(config)
        } else {
            Self::from_env()
        }
    }

    pub fn with_base_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            read_only: false,
        }
    }

    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            read_only: true,
        }
    }

    /// Directory holding the sharded case files.
    pub fn cases_dir(&self) -> PathBuf {
        self.base_path.join("cases")
    }

    /// Default output directory for retained songs.
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join("retained")
    }
}

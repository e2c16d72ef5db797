//! CaseId: a BLAKE3 structural content hash truncated to 128 bits.
//!
//! A case's identifier is the hash of the canonical JSON of its measure,
//! so two structurally equal measures always map to the same id. That is
//! the entire duplicate-detection mechanism: insert-by-id is idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use tabs::Measure;

/// A case identifier - 128 bits (32 hex chars) of BLAKE3.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid id length: expected 32 hex chars, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex character in id")]
    InvalidHex,

    #[error("serializing measure for hashing: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CaseId {
    /// Hash a measure's structural content.
    pub fn from_measure(measure: &Measure) -> Result<Self, IdError> {
        let canonical = serde_json::to_vec(measure)?;
        Ok(Self::from_bytes(&canonical))
    }

    fn from_bytes(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self(hex::encode(&hash.as_bytes()[..16]))
    }

    /// First 2 characters, used for directory sharding.
    pub fn prefix(&self) -> &str {
        &self.0[0..2]
    }

    /// Remainder after the prefix, used as the filename stem.
    pub fn remainder(&self) -> &str {
        &self.0[2..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CaseId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 {
            return Err(IdError::InvalidLength(s.len()));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidHex);
        }
        Ok(Self(s.to_lowercase()))
    }
}

impl AsRef<str> for CaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

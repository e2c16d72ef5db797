//! Case entries: a stored measure plus its provenance and cached scores.

use serde::{Deserialize, Serialize};

use tabs::Measure;

/// Where a case came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source file the measure was ingested from.
    pub source_file: String,
    /// Track index within the source file.
    pub track_index: usize,
    /// 1-based measure ordinal within the track.
    pub measure_number: u32,
    /// RFC 3339 ingestion timestamp.
    pub created_at: String,
}

impl Provenance {
    pub fn new(source_file: impl Into<String>, track_index: usize, measure_number: u32) -> Self {
        Self {
            source_file: source_file.into(),
            track_index,
            measure_number,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One stored case: the adorned measure, where it came from, and the
/// feature vector and scores cached at ingestion time so retrieval never
/// recomputes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEntry {
    pub measure: Measure,
    pub provenance: Provenance,
    /// Cached musiplectic feature vector (fixed width, computed by the caller).
    pub features: Vec<f64>,
    pub complexity: f64,
    pub difficulty: f64,
}

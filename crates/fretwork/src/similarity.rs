//! Feature-vector similarity.
//!
//! Normalized element-wise distance turned into a percentage: identical
//! vectors score 100, fully disjoint ones 0. The core only thresholds and
//! aggregates; the numbers inside the vectors come from the feature
//! classifier and the analyzer collaborators.

use tabs::Measure;

use crate::features::{measure_vector, FeatureAnalyzer, FeatureVector};

/// Similarity percentage between two raw feature vectors.
///
/// Vectors of different widths never match (0.0). Two all-zero vectors
/// are identical, hence 100.
pub fn similarity_pct(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut distance = 0.0;
    let mut magnitude = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        distance += (x - y).abs();
        magnitude += x.abs() + y.abs();
    }

    if magnitude == 0.0 {
        return 100.0;
    }
    100.0 * (1.0 - distance / magnitude)
}

/// Similarity between two measure-level feature vectors.
pub fn vector_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    similarity_pct(a.values(), b.values())
}

/// Similarity between two measures, deriving both vectors on the fly.
pub fn measure_similarity(a: &Measure, b: &Measure, analyzer: &dyn FeatureAnalyzer) -> f64 {
    vector_similarity(&measure_vector(a, analyzer), &measure_vector(b, analyzer))
}

/// Threshold test: a pair matches when its similarity percentage reaches
/// the threshold (0-100).
pub fn is_match(a: &[f64], b: &[f64], threshold: f64) -> bool {
    similarity_pct(a, b) >= threshold
}

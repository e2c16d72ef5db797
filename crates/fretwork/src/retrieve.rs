//! Retrieval: nearest-neighbor search over the case bank.
//!
//! Candidates pass through four gates - percentile window, structural
//! shape, similarity threshold, ranking - then identical score pairs are
//! consolidated and the requested slice is expanded back to ids. An empty
//! result is a value, not an error: the orchestrator owns the relaxation
//! retry loop.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use casebank::{CaseEntry, CaseId, CaseStore, Provenance};
use tabs::Measure;

use crate::features::{measure_vector, FeatureAnalyzer};
use crate::similarity::similarity_pct;

/// How many candidates the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieveMethod {
    /// Every matching candidate.
    All,
    /// Only the top-ranked candidate (all ids tied for rank 1).
    Best,
    /// The top N consolidated candidates, each expanded to all its ids.
    /// N = 0 behaves like N = 1.
    TopN(usize),
}

/// Retrieval parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Weight on the complexity ordering, in {-1, 0, 1}.
    pub complexity_weight: i8,
    /// Weight on the difficulty ordering, in {-1, 0, 1}.
    pub difficulty_weight: i8,
    pub method: RetrieveMethod,
    /// Minimum similarity percentage (0-100) for a case to qualify.
    pub similarity_threshold: f64,
    /// Optional window into the globally-sorted case-complexity
    /// distribution, as inclusive percentile bounds.
    pub percentile_range: Option<(f64, f64)>,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            complexity_weight: 1,
            difficulty_weight: 1,
            method: RetrieveMethod::Best,
            similarity_threshold: 95.0,
            percentile_range: None,
        }
    }
}

/// A ranked case before consolidation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCase {
    pub id: CaseId,
    pub complexity: f64,
    pub difficulty: f64,
}

/// Cases sharing an identical (complexity, difficulty) pair, coalesced.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub complexity: f64,
    pub difficulty: f64,
    pub ids: Vec<CaseId>,
}

/// One retrieved case with enough provenance to re-fetch it exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub id: CaseId,
    pub measure: Measure,
    pub provenance: Provenance,
}

/// Pairwise ranking heuristic. For any two adjacently-ranked candidates
/// the value is >= 0: the sort below is monotonic under it.
pub fn heuristic(a: &ScoredCase, b: &ScoredCase, complexity_weight: i8, difficulty_weight: i8) -> i32 {
    let dc = sign(a.complexity - b.complexity);
    let dd = sign(a.difficulty - b.difficulty);
    complexity_weight as i32 * dc + difficulty_weight as i32 * dd
}

fn sign(x: f64) -> i32 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

fn weighted_cmp(weight: i8, a: f64, b: f64) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match weight.signum() {
        1 => b.total_cmp(&a),
        -1 => a.total_cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Stable sort by the weighted orderings: complexity first, difficulty as
/// the tie-break, insertion order last. With both weights zero the input
/// order is the contract.
pub fn rank_cases(
    mut cases: Vec<ScoredCase>,
    complexity_weight: i8,
    difficulty_weight: i8,
) -> Vec<ScoredCase> {
    cases.sort_by(|a, b| {
        weighted_cmp(complexity_weight, a.complexity, b.complexity)
            .then(weighted_cmp(difficulty_weight, a.difficulty, b.difficulty))
    });
    cases
}

/// Coalesce cases with identical (complexity, difficulty) pairs into one
/// Candidate carrying the union of their ids, in first-seen order.
pub fn consolidate(ranked: &[ScoredCase]) -> Vec<Candidate> {
    let mut order: Vec<(u64, u64)> = Vec::new();
    let mut groups: HashMap<(u64, u64), Candidate> = HashMap::new();

    for case in ranked {
        let key = (case.complexity.to_bits(), case.difficulty.to_bits());
        let group = groups.entry(key).or_insert_with(|| {
            order.push(key);
            Candidate {
                complexity: case.complexity,
                difficulty: case.difficulty,
                ids: Vec::new(),
            }
        });
        group.ids.push(case.id.clone());
    }

    order
        .into_iter()
        .map(|key| groups.remove(&key).expect("group recorded in order"))
        .collect()
}

/// Expand the method's slice of the consolidated list back into ids,
/// depth-first: a candidate always contributes every id it carries.
pub fn select(candidates: &[Candidate], method: RetrieveMethod) -> Vec<CaseId> {
    let take = match method {
        RetrieveMethod::All => candidates.len(),
        RetrieveMethod::Best => 1,
        RetrieveMethod::TopN(n) => n.max(1),
    };
    candidates
        .iter()
        .take(take)
        .flat_map(|c| c.ids.iter().cloned())
        .collect()
}

/// Inclusive percentile of `value` within the sorted distribution.
fn percentile_of(sorted: &[f64], value: f64) -> f64 {
    if sorted.len() <= 1 {
        return 50.0;
    }
    let below = sorted.iter().filter(|&&v| v < value).count();
    below as f64 / (sorted.len() - 1) as f64 * 100.0
}

/// Retrieve candidate cases for an unadorned target measure.
///
/// Returns the ordered retrieved records, or an empty vector when nothing
/// clears the similarity threshold inside the percentile window.
pub fn retrieve(
    store: &dyn CaseStore,
    target: &Measure,
    params: &RetrievalParams,
    analyzer: &dyn FeatureAnalyzer,
) -> Result<Vec<Retrieved>> {
    let target_shape = target.tie_expanded().len();
    let target_vector = measure_vector(target, analyzer);

    let mut entries: Vec<(CaseId, CaseEntry)> = Vec::new();
    for id in store.keys().context("scanning case bank")? {
        if let Some(entry) = store.get(&id).context("reading case entry")? {
            entries.push((id, entry));
        }
    }

    // Percentile window over the global complexity distribution.
    let mut complexities: Vec<f64> = entries.iter().map(|(_, e)| e.complexity).collect();
    complexities.sort_by(|a, b| a.total_cmp(b));

    let mut scored = Vec::new();
    let mut by_id: HashMap<CaseId, CaseEntry> = HashMap::new();

    for (id, entry) in entries {
        if let Some((low, high)) = params.percentile_range {
            let pct = percentile_of(&complexities, entry.complexity);
            if pct < low || pct > high {
                continue;
            }
        }

        if entry.measure.tie_expanded().len() != target_shape {
            continue;
        }

        let pct = similarity_pct(target_vector.values(), &entry.features);
        if pct < params.similarity_threshold {
            continue;
        }
        debug!(id = %id, similarity = pct, "case qualified");

        scored.push(ScoredCase {
            id: id.clone(),
            complexity: entry.complexity,
            difficulty: entry.difficulty,
        });
        by_id.insert(id, entry);
    }

    if scored.is_empty() {
        info!(
            measure = target.meta.number,
            threshold = params.similarity_threshold,
            "no case cleared the similarity threshold"
        );
        return Ok(Vec::new());
    }

    let ranked = rank_cases(scored, params.complexity_weight, params.difficulty_weight);
    let consolidated = consolidate(&ranked);
    let selected = select(&consolidated, params.method);

    info!(
        measure = target.meta.number,
        candidates = consolidated.len(),
        returned = selected.len(),
        "retrieval complete"
    );

    Ok(selected
        .into_iter()
        .filter_map(|id| {
            by_id.remove(&id).map(|entry| Retrieved {
                id,
                measure: entry.measure,
                provenance: entry.provenance,
            })
        })
        .collect())
}

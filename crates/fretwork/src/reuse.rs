//! Reuse: transplant adornments from retrieved cases onto the target.
//!
//! Candidates are tried in ranked order; the first whose tie-expanded
//! note count matches the target's is copied position by position. When
//! none matches, the top-ranked candidate is mapped positionally: extra
//! candidate positions are dropped, uncovered target positions get the
//! neutral adornment. The target's notes are never mutated - a new
//! measure is built from replaced notes.

use tracing::debug;

use casebank::CaseId;
use tabs::{AdornedNote, Adornment, Measure};

use crate::retrieve::Retrieved;

/// Result of adapting one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedMeasure {
    pub measure: Measure,
    /// Case the adornments came from; `None` when no candidate was usable
    /// and the measure kept neutral adornments.
    pub source: Option<CaseId>,
}

/// Adornments of a candidate measure by logical (tie-expanded) position.
fn logical_adornments(candidate: &Measure) -> Vec<Adornment> {
    candidate
        .tie_expanded()
        .into_iter()
        .map(|n| n.adornment)
        .collect()
}

/// Map each target note to its logical position and pick the adornment
/// for it. Tie continuations and rests keep the neutral adornment; each
/// tie-group head takes the candidate's adornment at its logical index.
fn transplant(target: &Measure, donor: &[Adornment]) -> Vec<AdornedNote> {
    let mut out = Vec::with_capacity(target.notes.len());
    let mut logical: isize = -1;
    let mut head_is_rest = true;

    for note in &target.notes {
        let continues = note.note.tied && !note.note.rest && logical >= 0 && !head_is_rest;
        if !continues {
            logical += 1;
            head_is_rest = note.note.rest;
        }

        let adornment = if continues || note.note.rest {
            Adornment::default()
        } else {
            donor
                .get(logical as usize)
                .cloned()
                .unwrap_or_default()
        };
        out.push(note.with_adornment(adornment));
    }

    out
}

/// Adapt the target measure from the ranked candidate set.
pub fn adapt(target: &Measure, candidates: &[Retrieved]) -> AdaptedMeasure {
    let target_shape = target.tie_expanded().len();

    let exact = candidates
        .iter()
        .find(|c| c.measure.tie_expanded().len() == target_shape);

    let chosen = match exact {
        Some(candidate) => Some(candidate),
        None => {
            if let Some(first) = candidates.first() {
                debug!(
                    measure = target.meta.number,
                    candidate = %first.id,
                    "no shape-exact candidate, positional fallback"
                );
            }
            candidates.first()
        }
    };

    match chosen {
        None => AdaptedMeasure {
            measure: target.with_notes(
                target
                    .notes
                    .iter()
                    .map(|n| n.with_adornment(Adornment::default()))
                    .collect(),
            ),
            source: None,
        },
        Some(candidate) => {
            let donor = logical_adornments(&candidate.measure);
            AdaptedMeasure {
                measure: target.with_notes(transplant(target, &donor)),
                source: Some(candidate.id.clone()),
            }
        }
    }
}

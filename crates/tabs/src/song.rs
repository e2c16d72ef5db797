//! Measures and songs.
//!
//! A `Measure` owns an ordered sequence of adorned notes together with its
//! metadata; a `Song` owns an ordered, contiguously numbered sequence of
//! measures. Both are immutable values — transformations build new ones.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adornment::AdornedNote;
use crate::note::{Time, Tuning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    /// Length of one measure in whole-note units.
    pub fn measure_span(&self) -> Time {
        Ratio::new(self.numerator as i64, self.denominator as i64)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

/// Measure metadata. The `monophonic`, `only_tied` and `only_rests` flags
/// are derived from the note sequence by `Measure::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureMeta {
    pub title: String,
    /// 1-based ordinal within the song; contiguous across the song.
    pub number: u32,
    /// Sharps (positive) or flats (negative) in the key signature.
    pub key_signature: i8,
    pub time_signature: TimeSignature,
    pub tempo: u16,
    pub triplet_feel: bool,
    pub monophonic: bool,
    pub only_tied: bool,
    pub only_rests: bool,
}

impl MeasureMeta {
    pub fn numbered(number: u32) -> Self {
        Self {
            title: String::new(),
            number,
            key_signature: 0,
            time_signature: TimeSignature::default(),
            tempo: 120,
            triplet_feel: false,
            monophonic: true,
            only_tied: false,
            only_rests: false,
        }
    }
}

/// Structural problems found while validating a measure's time coverage.
#[derive(Debug, Error, PartialEq)]
pub enum SpanError {
    #[error("gap in measure {measure} at {at}")]
    Gap { measure: u32, at: Time },

    #[error("overlap in measure {measure} at {at}")]
    Overlap { measure: u32, at: Time },

    #[error("measure {measure} ends at {at}, expected {expected}")]
    ShortMeasure {
        measure: u32,
        at: Time,
        expected: Time,
    },
}

/// One measure of adorned notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub meta: MeasureMeta,
    pub start: Time,
    pub notes: Vec<AdornedNote>,
}

impl Measure {
    /// Build a measure, deriving the content flags from the notes.
    pub fn new(mut meta: MeasureMeta, start: Time, notes: Vec<AdornedNote>) -> Self {
        meta.monophonic = is_monophonic(&notes);
        meta.only_tied = !notes.is_empty() && notes.iter().all(|n| n.note.rest || n.note.tied);
        meta.only_rests = !notes.is_empty() && notes.iter().all(|n| n.note.rest);
        Self { meta, start, notes }
    }

    /// A copy of this measure with its notes replaced and content flags
    /// recomputed. Notes are never edited in place.
    pub fn with_notes(&self, notes: Vec<AdornedNote>) -> Self {
        Self::new(self.meta.clone(), self.start, notes)
    }

    /// Tie-expanded view of the notes: each run of tie continuations is
    /// merged into its head note with the summed duration.
    pub fn tie_expanded(&self) -> Vec<AdornedNote> {
        tie_expand(&self.notes)
    }

    /// Sounding notes only: not rests, not tie continuations.
    pub fn sounding_notes(&self) -> impl Iterator<Item = &AdornedNote> {
        self.notes.iter().filter(|n| !n.note.rest && !n.note.tied)
    }

    /// Check that the tie-expanded notes cover the measure's span with no
    /// gaps or overlaps.
    pub fn validate_span(&self) -> Result<(), SpanError> {
        let expected_end = self.start + self.meta.time_signature.measure_span();
        let mut cursor = self.start;

        for note in self.tie_expanded() {
            if note.note.start > cursor {
                return Err(SpanError::Gap {
                    measure: self.meta.number,
                    at: cursor,
                });
            }
            if note.note.start < cursor {
                return Err(SpanError::Overlap {
                    measure: self.meta.number,
                    at: note.note.start,
                });
            }
            cursor = note.note.end();
        }

        if cursor != expected_end {
            return Err(SpanError::ShortMeasure {
                measure: self.meta.number,
                at: cursor,
                expected: expected_end,
            });
        }
        Ok(())
    }

    /// Last sounding (non-rest) note, used for cross-measure continuity.
    pub fn last_sounding(&self) -> Option<&AdornedNote> {
        self.notes.iter().rev().find(|n| !n.note.rest)
    }
}

/// Merge each note with its following tie continuations.
///
/// The head note keeps its own fields with the summed duration; the result
/// carries `tied = false` since each entry is one logical sustained note.
pub fn tie_expand(notes: &[AdornedNote]) -> Vec<AdornedNote> {
    let mut expanded: Vec<AdornedNote> = Vec::with_capacity(notes.len());

    for note in notes {
        if note.note.tied && !note.note.rest {
            if let Some(head) = expanded.last_mut() {
                if !head.note.rest {
                    head.note.duration += note.note.duration;
                    continue;
                }
            }
        }
        let mut head = note.clone();
        head.note.tied = false;
        expanded.push(head);
    }

    expanded
}

fn is_monophonic(notes: &[AdornedNote]) -> bool {
    notes.windows(2).all(|pair| {
        pair[0].note.rest || pair[1].note.rest || pair[1].note.start >= pair[0].note.end()
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMeta {
    pub title: String,
    pub artist: String,
    pub tempo: u16,
    pub tuning: Tuning,
}

impl Default for SongMeta {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            tempo: 120,
            tuning: Tuning::standard_bass(),
        }
    }
}

/// One playable track of a decoded file. Multi-track input yields one
/// `Song` per playable track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub meta: SongMeta,
    pub measures: Vec<Measure>,
}

impl Song {
    /// Measure ordinals must run 1, 2, 3, ... with no holes.
    pub fn has_contiguous_measures(&self) -> bool {
        self.measures
            .iter()
            .enumerate()
            .all(|(i, m)| m.meta.number == i as u32 + 1)
    }
}

//! Complexity and difficulty scoring.
//!
//! Every sounding note contributes a weighted value derived from its
//! feature vector; a named weight set supplies the per-feature weight rows
//! and the polynomial exponent, and the calculation type decides how the
//! contributions combine: `Bgm` is the signed weighted sum, `Evc` the
//! Euclidean magnitude. Per-bar scores recombine exactly into the
//! whole-input score (sum for Bgm, root of sum-of-squares for Evc).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabs::{AdornedNote, Measure, Song};

use crate::features::{note_vector, FEATURE_DIM, REGION_COUNT, TAG_COUNT};

/// Which composite metric to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalcType {
    /// Signed weighted linear combination.
    Bgm,
    /// Euclidean-style vector magnitude.
    Evc,
}

#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("unknown weight set '{0}'")]
    Unknown(String),
}

/// A named weighting scheme: one weight row for complexity, one for
/// difficulty, and the exponent applied to feature values before
/// weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSet {
    pub name: String,
    pub exponent: f64,
    complexity: Vec<f64>,
    difficulty: Vec<f64>,
}

impl WeightSet {
    /// Look up a built-in weight set by name.
    pub fn named(name: &str) -> Result<Self, WeightError> {
        match name {
            "standard" => Ok(Self::standard()),
            "uniform" => Ok(Self::uniform()),
            other => Err(WeightError::Unknown(other.to_string())),
        }
    }

    /// The default bass-technique weighting: percussive and two-handed
    /// techniques cost more than plain plucks, harmonics and wide bends
    /// more than subtle expression, and the neck regions scale upward.
    pub fn standard() -> Self {
        // Tag order mirrors TechniqueTag::ALL.
        let tag_complexity = [
            1.0, // 2_finger_pluck
            1.0, // pick_up
            0.9, // pick_down
            2.0, // slap
            2.2, // pop
            3.2, // tap
            2.8, // double_thumb
            2.6, // double_thumb_downstroke
            2.9, // double_thumb_upstroke
            1.6, // dead_note_pluck
            2.4, // dead_note_slap
            2.6, // dead_note_pop
            1.5, // dead_note_pick
            3.4, // dead_note_tap
            3.0, // dead_note_thumb
            1.8, // palm_mute_thumb_pluck
            2.2, // natural_harmonic
            3.5, // artificial_harmonic
            1.4, // hammer_on
            1.5, // pull_off
            2.4, // left_hand_slap
            1.8, // quarter_bend
            2.2, // half_bend
            2.6, // whole_bend
            1.3, // vibrato
            2.4, // trill
            1.2, // slide
            1.1, // staccato
            0.8, // accent
        ];
        let tag_difficulty = [
            0.5, 0.5, 0.4, 1.4, 1.6, 2.8, 2.2, 2.0, 2.3, 1.0, 1.8, 2.0, 0.9, 3.0, 2.4, 1.2,
            1.8, 3.0, 1.0, 1.1, 2.0, 1.5, 1.9, 2.3, 0.8, 2.0, 0.9, 0.6, 0.4,
        ];
        let region_complexity = [0.5, 1.0, 1.5, 2.0];
        let region_difficulty = [1.0, 1.5, 2.5, 3.5];

        Self {
            name: "standard".into(),
            exponent: 1.0,
            complexity: assemble(&tag_complexity, &region_complexity),
            difficulty: assemble(&tag_difficulty, &region_difficulty),
        }
    }

    /// Every technique and region weighted 1.0; useful as a bare count.
    pub fn uniform() -> Self {
        let ones = [1.0; TAG_COUNT];
        let region_ones = [1.0; REGION_COUNT];
        Self {
            name: "uniform".into(),
            exponent: 1.0,
            complexity: assemble(&ones, &region_ones),
            difficulty: assemble(&ones, &region_ones),
        }
    }

    pub fn complexity_weights(&self) -> &[f64] {
        &self.complexity
    }

    pub fn difficulty_weights(&self) -> &[f64] {
        &self.difficulty
    }
}

/// Rhythm slots carry no score weight; they exist for similarity only.
fn assemble(tags: &[f64; TAG_COUNT], regions: &[f64; REGION_COUNT]) -> Vec<f64> {
    let mut weights = Vec::with_capacity(FEATURE_DIM);
    weights.extend_from_slice(tags);
    weights.extend_from_slice(regions);
    weights.resize(FEATURE_DIM, 0.0);
    weights
}

/// Scores for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarScores {
    pub number: u32,
    pub complexity: f64,
    pub difficulty: f64,
}

/// Composite score for a note sequence, measure, or song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub complexity: f64,
    pub difficulty: f64,
    /// Per-bar breakdown when scoring a song with `by_bar`.
    pub per_bar: Option<Vec<BarScores>>,
}

/// One note's (complexity, difficulty) contribution under the weight set.
///
/// For Bgm the contribution is the signed weighted sum itself; for Evc it
/// is the squared magnitude, so bars and songs combine under a square
/// root.
fn note_contribution(note: &AdornedNote, weights: &WeightSet, calc: CalcType) -> (f64, f64) {
    let vector = note_vector(note);
    let mut complexity = 0.0;
    let mut difficulty = 0.0;

    for (i, value) in vector.values().iter().enumerate() {
        let v = value.powf(weights.exponent);
        let wc = weights.complexity[i] * v;
        let wd = weights.difficulty[i] * v;
        match calc {
            CalcType::Bgm => {
                complexity += wc;
                difficulty += wd;
            }
            CalcType::Evc => {
                complexity += wc * wc;
                difficulty += wd * wd;
            }
        }
    }

    (complexity, difficulty)
}

fn combine(contributions: (f64, f64), calc: CalcType) -> (f64, f64) {
    match calc {
        CalcType::Bgm => contributions,
        CalcType::Evc => (contributions.0.sqrt(), contributions.1.sqrt()),
    }
}

fn raw_sum(notes: &[AdornedNote], weights: &WeightSet, calc: CalcType) -> (f64, f64) {
    notes
        .iter()
        .filter(|n| !n.note.rest)
        .map(|n| note_contribution(n, weights, calc))
        .fold((0.0, 0.0), |acc, c| (acc.0 + c.0, acc.1 + c.1))
}

/// Score a plain note sequence. `None` on an empty (or all-rest) input.
pub fn score_notes(notes: &[AdornedNote], weights: &WeightSet, calc: CalcType) -> Option<Scores> {
    if notes.iter().all(|n| n.note.rest) {
        return None;
    }
    let (complexity, difficulty) = combine(raw_sum(notes, weights, calc), calc);
    Some(Scores {
        complexity,
        difficulty,
        per_bar: None,
    })
}

/// Score one measure over its tie-expanded notes.
pub fn score_measure(measure: &Measure, weights: &WeightSet, calc: CalcType) -> Option<Scores> {
    score_notes(&measure.tie_expanded(), weights, calc)
}

/// Score a whole song, optionally keeping the per-bar breakdown.
///
/// The whole-song score always equals the recombination of the per-bar
/// scores; bars with nothing sounding contribute zero.
pub fn score_song(song: &Song, weights: &WeightSet, calc: CalcType, by_bar: bool) -> Option<Scores> {
    if song
        .measures
        .iter()
        .all(|m| m.notes.iter().all(|n| n.note.rest))
    {
        return None;
    }

    let mut whole = (0.0, 0.0);
    let mut bars = Vec::with_capacity(song.measures.len());

    for measure in &song.measures {
        let raw = raw_sum(&measure.tie_expanded(), weights, calc);
        whole.0 += raw.0;
        whole.1 += raw.1;

        let (complexity, difficulty) = combine(raw, calc);
        bars.push(BarScores {
            number: measure.meta.number,
            complexity,
            difficulty,
        });
    }

    let (complexity, difficulty) = combine(whole, calc);
    Some(Scores {
        complexity,
        difficulty,
        per_bar: by_bar.then_some(bars),
    })
}

/// Recombine per-bar scores into a whole-input score: a plain sum for
/// Bgm, the root of the sum of squares for Evc.
pub fn recombine(bars: &[BarScores], calc: CalcType) -> (f64, f64) {
    match calc {
        CalcType::Bgm => bars
            .iter()
            .fold((0.0, 0.0), |acc, b| (acc.0 + b.complexity, acc.1 + b.difficulty)),
        CalcType::Evc => {
            let (c, d) = bars.iter().fold((0.0, 0.0), |acc, b| {
                (
                    acc.0 + b.complexity * b.complexity,
                    acc.1 + b.difficulty * b.difficulty,
                )
            });
            (c.sqrt(), d.sqrt())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabs::{
        MeasureMeta, Note, PluckingTechnique, SongMeta, Time, Tuning,
    };

    fn note(technique: PluckingTechnique, start: Time) -> AdornedNote {
        let mut n = AdornedNote::unadorned(Note::fretted(
            Tuning::standard_bass(),
            2,
            5,
            start,
            Time::new(1, 4),
        ));
        n.adornment.plucking.technique = technique;
        n
    }

    fn two_bar_song() -> Song {
        let bar1 = Measure::new(
            MeasureMeta::numbered(1),
            Time::new(0, 1),
            vec![
                note(PluckingTechnique::Slap, Time::new(0, 1)),
                note(PluckingTechnique::Pop, Time::new(1, 4)),
            ],
        );
        let bar2 = Measure::new(
            MeasureMeta::numbered(2),
            Time::new(1, 1),
            vec![
                note(PluckingTechnique::Finger, Time::new(1, 1)),
                note(PluckingTechnique::Tap, Time::new(5, 4)),
            ],
        );
        Song {
            meta: SongMeta::default(),
            measures: vec![bar1, bar2],
        }
    }

    #[test]
    fn unknown_weight_set_is_an_error() {
        assert_eq!(
            WeightSet::named("nope"),
            Err(WeightError::Unknown("nope".into()))
        );
        assert!(WeightSet::named("standard").is_ok());
        assert!(WeightSet::named("uniform").is_ok());
    }

    #[test]
    fn empty_input_scores_none() {
        let ws = WeightSet::standard();
        assert!(score_notes(&[], &ws, CalcType::Bgm).is_none());

        let rests = vec![AdornedNote::unadorned(Note::rest(
            Time::new(0, 1),
            Time::new(1, 1),
        ))];
        assert!(score_notes(&rests, &ws, CalcType::Bgm).is_none());
    }

    #[test]
    fn bgm_score_is_the_weighted_sum() {
        let ws = WeightSet::uniform();
        let notes = vec![note(PluckingTechnique::Slap, Time::new(0, 1))];
        let scores = score_notes(&notes, &ws, CalcType::Bgm).unwrap();
        // One slap tag plus one fret-region mark, both weighted 1.0.
        assert_eq!(scores.complexity, 2.0);
        assert_eq!(scores.difficulty, 2.0);
    }

    #[test]
    fn evc_score_is_the_vector_magnitude() {
        let ws = WeightSet::uniform();
        let notes = vec![note(PluckingTechnique::Slap, Time::new(0, 1))];
        let scores = score_notes(&notes, &ws, CalcType::Evc).unwrap();
        assert!((scores.complexity - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn whole_song_equals_recombined_bars_bgm() {
        let song = two_bar_song();
        let ws = WeightSet::standard();

        let whole = score_song(&song, &ws, CalcType::Bgm, false).unwrap();
        let by_bar = score_song(&song, &ws, CalcType::Bgm, true).unwrap();
        let bars = by_bar.per_bar.as_ref().unwrap();
        assert_eq!(bars.len(), 2);

        let (complexity, difficulty) = recombine(bars, CalcType::Bgm);
        assert!((whole.complexity - complexity).abs() < 1e-9);
        assert!((whole.difficulty - difficulty).abs() < 1e-9);
    }

    #[test]
    fn whole_song_equals_recombined_bars_evc() {
        let song = two_bar_song();
        let ws = WeightSet::standard();

        let whole = score_song(&song, &ws, CalcType::Evc, false).unwrap();
        let bars = score_song(&song, &ws, CalcType::Evc, true)
            .unwrap()
            .per_bar
            .unwrap();

        let (complexity, difficulty) = recombine(&bars, CalcType::Evc);
        assert!((whole.complexity - complexity).abs() < 1e-9);
        assert!((whole.difficulty - difficulty).abs() < 1e-9);
    }

    #[test]
    fn harder_techniques_score_higher() {
        let ws = WeightSet::standard();
        let plain = score_notes(
            &[note(PluckingTechnique::Finger, Time::new(0, 1))],
            &ws,
            CalcType::Bgm,
        )
        .unwrap();
        let tapped = score_notes(
            &[note(PluckingTechnique::Tap, Time::new(0, 1))],
            &ws,
            CalcType::Bgm,
        )
        .unwrap();
        assert!(tapped.complexity > plain.complexity);
        assert!(tapped.difficulty > plain.difficulty);
    }

    #[test]
    fn tied_continuations_do_not_double_count() {
        let ws = WeightSet::uniform();
        let head = note(PluckingTechnique::Finger, Time::new(0, 1));
        let mut tail = note(PluckingTechnique::Finger, Time::new(1, 4));
        tail.note.tied = true;

        let single = Measure::new(
            MeasureMeta::numbered(1),
            Time::new(0, 1),
            vec![head.clone()],
        );
        let tied = Measure::new(MeasureMeta::numbered(1), Time::new(0, 1), vec![head, tail]);

        let a = score_measure(&single, &ws, CalcType::Bgm).unwrap();
        let b = score_measure(&tied, &ws, CalcType::Bgm).unwrap();
        assert_eq!(a.complexity, b.complexity);
    }
}

//! Musiplectic feature classification.
//!
//! Every adorned note maps deterministically to a set of named technique
//! tags and from there to a fixed-width numeric feature vector. The
//! plucking table is a pure function over the closed enum cross-product
//! {technique} x {palm mute} x {attack modifier} and is tested case by
//! case; fretting techniques, expression and articulation classify
//! independently.

use serde::{Deserialize, Serialize};

use tabs::{
    AdornedNote, FrettingModification, FrettingTechnique, Measure, Modulation,
    PluckingTechnique, TimeSignature,
};

/// Named musiplectic technique tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueTag {
    TwoFingerPluck,
    PickUp,
    PickDown,
    Slap,
    Pop,
    Tap,
    DoubleThumb,
    DoubleThumbDownstroke,
    DoubleThumbUpstroke,
    DeadNotePluck,
    DeadNoteSlap,
    DeadNotePop,
    DeadNotePick,
    DeadNoteTap,
    DeadNoteThumb,
    PalmMuteThumbPluck,
    NaturalHarmonic,
    ArtificialHarmonic,
    HammerOn,
    PullOff,
    LeftHandSlap,
    QuarterBend,
    HalfBend,
    WholeBend,
    Vibrato,
    Trill,
    Slide,
    Staccato,
    Accent,
}

pub const TAG_COUNT: usize = 29;

impl TechniqueTag {
    pub const ALL: [TechniqueTag; TAG_COUNT] = [
        TechniqueTag::TwoFingerPluck,
        TechniqueTag::PickUp,
        TechniqueTag::PickDown,
        TechniqueTag::Slap,
        TechniqueTag::Pop,
        TechniqueTag::Tap,
        TechniqueTag::DoubleThumb,
        TechniqueTag::DoubleThumbDownstroke,
        TechniqueTag::DoubleThumbUpstroke,
        TechniqueTag::DeadNotePluck,
        TechniqueTag::DeadNoteSlap,
        TechniqueTag::DeadNotePop,
        TechniqueTag::DeadNotePick,
        TechniqueTag::DeadNoteTap,
        TechniqueTag::DeadNoteThumb,
        TechniqueTag::PalmMuteThumbPluck,
        TechniqueTag::NaturalHarmonic,
        TechniqueTag::ArtificialHarmonic,
        TechniqueTag::HammerOn,
        TechniqueTag::PullOff,
        TechniqueTag::LeftHandSlap,
        TechniqueTag::QuarterBend,
        TechniqueTag::HalfBend,
        TechniqueTag::WholeBend,
        TechniqueTag::Vibrato,
        TechniqueTag::Trill,
        TechniqueTag::Slide,
        TechniqueTag::Staccato,
        TechniqueTag::Accent,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TechniqueTag::TwoFingerPluck => "2_finger_pluck",
            TechniqueTag::PickUp => "pick_up",
            TechniqueTag::PickDown => "pick_down",
            TechniqueTag::Slap => "slap",
            TechniqueTag::Pop => "pop",
            TechniqueTag::Tap => "tap",
            TechniqueTag::DoubleThumb => "double_thumb",
            TechniqueTag::DoubleThumbDownstroke => "double_thumb_downstroke",
            TechniqueTag::DoubleThumbUpstroke => "double_thumb_upstroke",
            TechniqueTag::DeadNotePluck => "dead_note_pluck",
            TechniqueTag::DeadNoteSlap => "dead_note_slap",
            TechniqueTag::DeadNotePop => "dead_note_pop",
            TechniqueTag::DeadNotePick => "dead_note_pick",
            TechniqueTag::DeadNoteTap => "dead_note_tap",
            TechniqueTag::DeadNoteThumb => "dead_note_thumb",
            TechniqueTag::PalmMuteThumbPluck => "palm_mute_thumb_pluck",
            TechniqueTag::NaturalHarmonic => "natural_harmonic",
            TechniqueTag::ArtificialHarmonic => "artificial_harmonic",
            TechniqueTag::HammerOn => "hammer_on",
            TechniqueTag::PullOff => "pull_off",
            TechniqueTag::LeftHandSlap => "left_hand_slap",
            TechniqueTag::QuarterBend => "quarter_bend",
            TechniqueTag::HalfBend => "half_bend",
            TechniqueTag::WholeBend => "whole_bend",
            TechniqueTag::Vibrato => "vibrato",
            TechniqueTag::Trill => "trill",
            TechniqueTag::Slide => "slide",
            TechniqueTag::Staccato => "staccato",
            TechniqueTag::Accent => "accent",
        }
    }
}

impl std::fmt::Display for TechniqueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Neck region a fret falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FretRegion {
    Open,
    Low,
    High,
    Upper,
}

pub const REGION_COUNT: usize = 4;

impl FretRegion {
    pub fn from_fret(fret: u8) -> Self {
        match fret {
            0..=4 => FretRegion::Open,
            5..=11 => FretRegion::Low,
            12..=17 => FretRegion::High,
            _ => FretRegion::Upper,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FretRegion::Open => "0-4",
            FretRegion::Low => "5-11",
            FretRegion::High => "12-17",
            FretRegion::Upper => "18+",
        }
    }
}

/// Attack modifier for the plucking decision table. Dead notes take
/// precedence over harmonics when both are marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackModifier {
    None,
    DeadNote,
    NaturalHarmonic,
    ArtificialHarmonic,
}

impl AttackModifier {
    pub fn of(note: &AdornedNote) -> Self {
        match note.adornment.fretting.modification {
            FrettingModification::DeadNote => AttackModifier::DeadNote,
            FrettingModification::NaturalHarmonic => AttackModifier::NaturalHarmonic,
            FrettingModification::None => {
                if note.adornment.plucking.artificial_harmonic.is_some() {
                    AttackModifier::ArtificialHarmonic
                } else {
                    AttackModifier::None
                }
            }
        }
    }
}

fn base_tag(technique: PluckingTechnique) -> TechniqueTag {
    match technique {
        PluckingTechnique::Finger => TechniqueTag::TwoFingerPluck,
        PluckingTechnique::PickUp => TechniqueTag::PickUp,
        PluckingTechnique::PickDown => TechniqueTag::PickDown,
        PluckingTechnique::Slap => TechniqueTag::Slap,
        PluckingTechnique::Pop => TechniqueTag::Pop,
        PluckingTechnique::Tap => TechniqueTag::Tap,
        PluckingTechnique::DoubleThumb => TechniqueTag::DoubleThumb,
        PluckingTechnique::DoubleThumbDownstroke => TechniqueTag::DoubleThumbDownstroke,
        PluckingTechnique::DoubleThumbUpstroke => TechniqueTag::DoubleThumbUpstroke,
    }
}

fn dead_note_tag(technique: PluckingTechnique) -> TechniqueTag {
    match technique {
        PluckingTechnique::Finger => TechniqueTag::DeadNotePluck,
        PluckingTechnique::PickUp | PluckingTechnique::PickDown => TechniqueTag::DeadNotePick,
        PluckingTechnique::Slap => TechniqueTag::DeadNoteSlap,
        PluckingTechnique::Pop => TechniqueTag::DeadNotePop,
        PluckingTechnique::Tap => TechniqueTag::DeadNoteTap,
        PluckingTechnique::DoubleThumb
        | PluckingTechnique::DoubleThumbDownstroke
        | PluckingTechnique::DoubleThumbUpstroke => TechniqueTag::DeadNoteThumb,
    }
}

/// The plucking decision table.
///
/// A dead note collapses to its dead-note family tag alone: the attack is
/// pitchless, so the palm-mute tag is suppressed. Harmonics keep the base
/// attack tag and add their own; palm muting adds its tag on top of any
/// non-dead attack.
pub fn plucking_tags(
    technique: PluckingTechnique,
    palm_mute: bool,
    modifier: AttackModifier,
) -> Vec<TechniqueTag> {
    match modifier {
        AttackModifier::DeadNote => vec![dead_note_tag(technique)],
        AttackModifier::NaturalHarmonic => {
            let mut tags = vec![base_tag(technique), TechniqueTag::NaturalHarmonic];
            if palm_mute {
                tags.push(TechniqueTag::PalmMuteThumbPluck);
            }
            tags
        }
        AttackModifier::ArtificialHarmonic => {
            let mut tags = vec![base_tag(technique), TechniqueTag::ArtificialHarmonic];
            if palm_mute {
                tags.push(TechniqueTag::PalmMuteThumbPluck);
            }
            tags
        }
        AttackModifier::None => {
            let mut tags = vec![base_tag(technique)];
            if palm_mute {
                tags.push(TechniqueTag::PalmMuteThumbPluck);
            }
            tags
        }
    }
}

/// Fretting techniques classify independently of the plucking hand.
pub fn fretting_tag(technique: FrettingTechnique) -> Option<TechniqueTag> {
    match technique {
        FrettingTechnique::None => None,
        FrettingTechnique::HammerOn => Some(TechniqueTag::HammerOn),
        FrettingTechnique::PullOff => Some(TechniqueTag::PullOff),
        FrettingTechnique::LeftHandSlap => Some(TechniqueTag::LeftHandSlap),
    }
}

/// Expression tags accumulate in fixed order: bend, vibrato, trill, slide.
///
/// Bend magnitude buckets on fractions of a whole tone: below a third is a
/// quarter bend, below two thirds a half bend, anything else a whole bend.
pub fn expression_tags(modulation: &Modulation) -> Vec<TechniqueTag> {
    let mut tags = Vec::new();

    if let Some(bend) = modulation.bend {
        let tag = if bend.amount < 0.33 {
            TechniqueTag::QuarterBend
        } else if bend.amount < 0.67 {
            TechniqueTag::HalfBend
        } else {
            TechniqueTag::WholeBend
        };
        tags.push(tag);
    }
    if modulation.vibrato {
        tags.push(TechniqueTag::Vibrato);
    }
    if modulation.trill.is_some() {
        tags.push(TechniqueTag::Trill);
    }
    if modulation.slide.map(|s| !s.is_empty()).unwrap_or(false) {
        tags.push(TechniqueTag::Slide);
    }

    tags
}

/// Articulation tags in fixed order: staccato (fretting accent), then
/// accent (plucking accent).
pub fn articulation_tags(note: &AdornedNote) -> Vec<TechniqueTag> {
    let mut tags = Vec::new();
    if note.adornment.fretting.accent {
        tags.push(TechniqueTag::Staccato);
    }
    if note.adornment.plucking.accent {
        tags.push(TechniqueTag::Accent);
    }
    tags
}

/// All technique tags for one adorned note, in classification order.
pub fn classify(note: &AdornedNote) -> Vec<TechniqueTag> {
    let mut tags = plucking_tags(
        note.adornment.plucking.technique,
        note.adornment.plucking.palm_mute,
        AttackModifier::of(note),
    );
    tags.extend(fretting_tag(note.adornment.fretting.technique));
    tags.extend(expression_tags(&note.adornment.fretting.modulation));
    tags.extend(articulation_tags(note));
    tags
}

/// Width of the full feature vector: technique tags, fret regions, and the
/// two rhythm slots supplied by the analyzer collaborators.
pub const RHYTHM_DIM: usize = 2;
pub const FEATURE_DIM: usize = TAG_COUNT + REGION_COUNT + RHYTHM_DIM;

/// Fixed-width numeric feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn zeros() -> Self {
        Self(vec![0.0; FEATURE_DIM])
    }

    /// Wrap a raw vector; `None` if the width is wrong.
    pub fn from_raw(values: Vec<f64>) -> Option<Self> {
        (values.len() == FEATURE_DIM).then_some(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn into_raw(self) -> Vec<f64> {
        self.0
    }

    pub fn tag(&self, tag: TechniqueTag) -> f64 {
        self.0[tag.index()]
    }

    pub fn region(&self, region: FretRegion) -> f64 {
        self.0[TAG_COUNT + region.index()]
    }

    fn accumulate(&mut self, other: &FeatureVector) {
        for (slot, value) in self.0.iter_mut().zip(other.0.iter()) {
            *slot += value;
        }
    }
}

/// Per-note feature vector: tag incidence plus a fret-region mark. The
/// rhythm slots stay zero at note level.
pub fn note_vector(note: &AdornedNote) -> FeatureVector {
    let mut vector = FeatureVector::zeros();
    for tag in classify(note) {
        vector.0[tag.index()] += 1.0;
    }
    if !note.note.rest {
        vector.0[TAG_COUNT + FretRegion::from_fret(note.note.fret).index()] += 1.0;
    }
    vector
}

/// External feature-analysis collaborators.
///
/// Both functions are pure from the core's point of view. Backends carry
/// any working-directory or toolkit configuration in their own state;
/// nothing here reads process-global state.
pub trait FeatureAnalyzer: Send + Sync {
    /// Meter-derived features: currently onset density per beat.
    fn meter_features(&self, notes: &[AdornedNote], time_signature: &TimeSignature) -> Vec<f64>;

    /// Syncopation features: currently the off-beat onset fraction.
    fn syncopation_features(
        &self,
        notes: &[AdornedNote],
        time_signature: &TimeSignature,
    ) -> Vec<f64>;
}

/// Deterministic built-in analyzer used as the default backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAnalyzer;

impl FeatureAnalyzer for BuiltinAnalyzer {
    fn meter_features(&self, notes: &[AdornedNote], time_signature: &TimeSignature) -> Vec<f64> {
        let beats = time_signature.numerator as f64;
        let onsets = notes
            .iter()
            .filter(|n| !n.note.rest && !n.note.tied)
            .count() as f64;
        vec![if beats > 0.0 { onsets / beats } else { 0.0 }]
    }

    fn syncopation_features(
        &self,
        notes: &[AdornedNote],
        time_signature: &TimeSignature,
    ) -> Vec<f64> {
        let beat = num_rational::Ratio::new(1i64, time_signature.denominator as i64);
        let mut onsets = 0usize;
        let mut off_beat = 0usize;

        for note in notes.iter().filter(|n| !n.note.rest && !n.note.tied) {
            onsets += 1;
            if (note.note.start / beat).is_integer() {
                continue;
            }
            off_beat += 1;
        }

        vec![if onsets > 0 {
            off_beat as f64 / onsets as f64
        } else {
            0.0
        }]
    }
}

/// Feature vector for a whole measure: summed per-note vectors over the
/// tie-expanded notes, with the analyzer's rhythm features in the trailing
/// slots.
pub fn measure_vector(measure: &Measure, analyzer: &dyn FeatureAnalyzer) -> FeatureVector {
    let expanded = measure.tie_expanded();
    let mut vector = FeatureVector::zeros();

    for note in expanded.iter().filter(|n| !n.note.rest) {
        let nv = note_vector(note);
        vector.accumulate(&nv);
    }

    let meter = analyzer.meter_features(&expanded, &measure.meta.time_signature);
    let syncopation = analyzer.syncopation_features(&expanded, &measure.meta.time_signature);
    let rhythm: Vec<f64> = meter.into_iter().chain(syncopation).collect();
    for (i, value) in rhythm.into_iter().take(RHYTHM_DIM).enumerate() {
        vector.0[TAG_COUNT + REGION_COUNT + i] = value;
    }

    vector
}

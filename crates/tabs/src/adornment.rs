//! Performance-technique metadata attached to bare notes.
//!
//! An `Adornment` describes *how* a note is played: the plucking-hand
//! technique, the fretting-hand technique and its modulations, an optional
//! grace note, and the ghost-note flag. All types here are immutable values
//! with structural equality.

use serde::{Deserialize, Serialize};

use crate::note::{Dynamic, Note, Time};

/// Plucking-hand technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluckingTechnique {
    Finger,
    PickUp,
    PickDown,
    Slap,
    Pop,
    Tap,
    DoubleThumb,
    DoubleThumbDownstroke,
    DoubleThumbUpstroke,
}

impl Default for PluckingTechnique {
    fn default() -> Self {
        PluckingTechnique::Finger
    }
}

impl PluckingTechnique {
    /// Slap-family techniques alternate between slap and pop.
    pub fn is_slap_family(&self) -> bool {
        matches!(self, PluckingTechnique::Slap | PluckingTechnique::Pop)
    }

    /// Pick-family techniques alternate stroke direction per onset.
    pub fn is_pick_family(&self) -> bool {
        matches!(self, PluckingTechnique::PickUp | PluckingTechnique::PickDown)
    }

    /// Directed double-thumb strokes alternate like pick strokes.
    pub fn is_thumb_stroke_family(&self) -> bool {
        matches!(
            self,
            PluckingTechnique::DoubleThumbDownstroke | PluckingTechnique::DoubleThumbUpstroke
        )
    }
}

/// Artificial harmonic: touch point expressed as an octave offset above
/// the fretted pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtificialHarmonic {
    pub octave: i8,
}

/// Everything the plucking hand contributes to one note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluckingAdornment {
    pub technique: PluckingTechnique,
    pub palm_mute: bool,
    pub artificial_harmonic: Option<ArtificialHarmonic>,
    pub accent: bool,
}

/// Fretting-hand technique. `None` is an ordinary fretted attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrettingTechnique {
    None,
    HammerOn,
    PullOff,
    LeftHandSlap,
}

impl Default for FrettingTechnique {
    fn default() -> Self {
        FrettingTechnique::None
    }
}

impl FrettingTechnique {
    /// Hammer-ons and pull-offs are legato transitions that depend on the
    /// previous note.
    pub fn is_legato(&self) -> bool {
        matches!(self, FrettingTechnique::HammerOn | FrettingTechnique::PullOff)
    }
}

/// Fretting-hand modification of the attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrettingModification {
    None,
    DeadNote,
    NaturalHarmonic,
}

impl Default for FrettingModification {
    fn default() -> Self {
        FrettingModification::None
    }
}

/// Bend amount as a fraction of a whole tone: 1.0 is a full bend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bend {
    pub amount: f32,
}

/// Trill to another fret.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trill {
    pub fret: u8,
    pub duration: Time,
}

/// How a note is approached by a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingSlide {
    FromBelow,
    FromAbove,
}

/// How a note leaves by a slide. `ShiftTo` and `Legato` chain into the next
/// note on the same string; `OutDown`/`OutUp` release into nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutgoingSlide {
    ShiftTo,
    Legato,
    OutDown,
    OutUp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub incoming: Option<IncomingSlide>,
    pub outgoing: Option<OutgoingSlide>,
}

impl Slide {
    pub fn is_empty(&self) -> bool {
        self.incoming.is_none() && self.outgoing.is_none()
    }
}

/// Pitch modulation applied while the note sounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Modulation {
    pub bend: Option<Bend>,
    pub vibrato: bool,
    pub trill: Option<Trill>,
    pub slide: Option<Slide>,
}

/// Everything the fretting hand contributes to one note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrettingAdornment {
    pub technique: FrettingTechnique,
    pub modification: FrettingModification,
    pub let_ring: bool,
    pub accent: bool,
    pub modulation: Modulation,
}

/// Transition from a grace note into its parent note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraceTransition {
    None,
    Slide,
    Bend,
    HammerOn,
}

/// A grace note attached ahead of (or on the beat of) its parent note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraceNote {
    pub fret: u8,
    pub duration: Time,
    pub dynamic: Dynamic,
    pub dead_note: bool,
    pub on_beat: bool,
    pub transition: GraceTransition,
}

/// Complete performance adornment for one note.
///
/// `Adornment::default()` is the neutral adornment: plain finger pluck, no
/// modifiers, no modulation. Reuse falls back to it whenever a candidate
/// has nothing to offer for a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adornment {
    pub plucking: PluckingAdornment,
    pub fretting: FrettingAdornment,
    pub grace: Option<GraceNote>,
    pub ghost: bool,
}

/// A note paired with its adornment. Equality is structural over every
/// field of both halves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdornedNote {
    pub note: Note,
    pub adornment: Adornment,
}

impl AdornedNote {
    pub fn new(note: Note, adornment: Adornment) -> Self {
        Self { note, adornment }
    }

    /// Pair a note with the neutral adornment.
    pub fn unadorned(note: Note) -> Self {
        Self {
            note,
            adornment: Adornment::default(),
        }
    }

    /// Replace the adornment, leaving the note untouched.
    pub fn with_adornment(&self, adornment: Adornment) -> Self {
        Self {
            note: self.note.clone(),
            adornment,
        }
    }
}

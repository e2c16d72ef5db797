use num_rational::Ratio;
use serde::{Deserialize, Serialize};

/// Rational time in whole-note units. A quarter note is 1/4.
pub type Time = Ratio<i64>;

/// Dynamic marking, quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dynamic {
    Ppp,
    Pp,
    P,
    Mp,
    Mf,
    F,
    Ff,
    Fff,
}

impl Dynamic {
    /// MIDI velocity equivalent, matching the usual notation-software mapping.
    pub fn velocity(&self) -> u8 {
        match self {
            Dynamic::Ppp => 15,
            Dynamic::Pp => 31,
            Dynamic::P => 47,
            Dynamic::Mp => 63,
            Dynamic::Mf => 79,
            Dynamic::F => 95,
            Dynamic::Ff => 111,
            Dynamic::Fff => 127,
        }
    }
}

impl Default for Dynamic {
    fn default() -> Self {
        Dynamic::Mf
    }
}

/// Written duration of a note: face value plus dot/tuplet markings.
///
/// `value` is the denominator of the plain note value: 1 = whole,
/// 2 = half, 4 = quarter, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotatedDuration {
    pub value: u8,
    pub dotted: bool,
    pub tuplet: Option<Tuplet>,
}

impl NotatedDuration {
    pub fn plain(value: u8) -> Self {
        Self {
            value,
            dotted: false,
            tuplet: None,
        }
    }

    /// Sounding length of this written duration in whole-note units.
    pub fn sounding(&self) -> Time {
        let mut length = Ratio::new(1, self.value as i64);
        if self.dotted {
            length += length / 2;
        }
        if let Some(t) = self.tuplet {
            length = length * Ratio::new(t.normal as i64, t.actual as i64);
        }
        length
    }
}

impl Default for NotatedDuration {
    fn default() -> Self {
        Self::plain(4)
    }
}

/// Tuplet marking: `actual` notes in the time of `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuplet {
    pub actual: u8,
    pub normal: u8,
}

/// Open-string pitches, index 0 = string 1 (the highest-pitched string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuning {
    pub open_pitches: Vec<u8>,
}

impl Tuning {
    /// Standard four-string bass: G2, D2, A1, E1.
    pub fn standard_bass() -> Self {
        Self {
            open_pitches: vec![43, 38, 33, 28],
        }
    }

    /// Open pitch of a 1-based string number.
    pub fn open_pitch(&self, string: u8) -> Option<u8> {
        if string == 0 {
            return None;
        }
        self.open_pitches.get(string as usize - 1).copied()
    }

    pub fn string_count(&self) -> usize {
        self.open_pitches.len()
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::standard_bass()
    }
}

/// A single tablature note: pitch and position, rational timing, and the
/// written duration it was notated with.
///
/// Immutable value type — any change produces a new `Note`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub fret: u8,
    /// 1-based string number; string 1 is the highest-pitched string.
    pub string: u8,
    pub tuning: Tuning,
    /// Onset in whole-note units from the start of the song.
    pub start: Time,
    /// Sounding duration in whole-note units.
    pub duration: Time,
    pub notated: NotatedDuration,
    pub dynamic: Dynamic,
    /// Tied to the previous note (a continuation, not a new attack).
    pub tied: bool,
    pub rest: bool,
}

impl Note {
    /// Construct a fretted note, deriving pitch from string and fret.
    pub fn fretted(tuning: Tuning, string: u8, fret: u8, start: Time, duration: Time) -> Self {
        let pitch = tuning
            .open_pitch(string)
            .map(|open| open.saturating_add(fret))
            .unwrap_or(0);
        Self {
            pitch,
            fret,
            string,
            tuning,
            start,
            duration,
            notated: NotatedDuration::default(),
            dynamic: Dynamic::default(),
            tied: false,
            rest: false,
        }
    }

    /// Construct a rest covering the given span.
    pub fn rest(start: Time, duration: Time) -> Self {
        Self {
            pitch: 0,
            fret: 0,
            string: 0,
            tuning: Tuning::default(),
            start,
            duration,
            notated: NotatedDuration::default(),
            dynamic: Dynamic::default(),
            tied: false,
            rest: true,
        }
    }

    pub fn end(&self) -> Time {
        self.start + self.duration
    }

    pub fn is_open_string(&self) -> bool {
        !self.rest && self.fret == 0
    }
}

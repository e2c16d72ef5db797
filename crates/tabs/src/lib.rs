//! Bass tablature data model and interchange codec.
//!
//! Everything here is an immutable value type with structural equality:
//! notes, adornments, measures and songs are never edited in place, only
//! rebuilt. The JSON interchange codec round-trips the whole model
//! losslessly, rational durations included.

pub mod adornment;
pub mod codec;
pub mod note;
pub mod song;

pub use adornment::{
    AdornedNote, Adornment, ArtificialHarmonic, Bend, FrettingAdornment, FrettingModification,
    FrettingTechnique, GraceNote, GraceTransition, IncomingSlide, Modulation, OutgoingSlide,
    PluckingAdornment, PluckingTechnique, Slide, Trill,
};
pub use codec::{verify_roundtrip, CodecError, JsonCodec, NotationCodec};
pub use note::{Dynamic, NotatedDuration, Note, Time, Tuning, Tuplet};
pub use song::{
    tie_expand, Measure, MeasureMeta, Song, SongMeta, SpanError, TimeSignature,
};

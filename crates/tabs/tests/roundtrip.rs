//! Interchange round-trip over a deliberately rich song fixture.
//!
//! Every adornment field the model carries appears at least once, so a
//! lossless pass here means the codec preserves the whole surface.

use pretty_assertions::assert_eq;

use tabs::{
    verify_roundtrip, AdornedNote, ArtificialHarmonic, Bend, Dynamic,
    FrettingModification, FrettingTechnique, GraceNote, GraceTransition, IncomingSlide, JsonCodec,
    Measure, MeasureMeta, NotatedDuration, Note, NotationCodec, OutgoingSlide, PluckingTechnique,
    Slide, Song, SongMeta, Time, Trill, Tuning, Tuplet,
};

fn note(string: u8, fret: u8, start: Time, duration: Time) -> Note {
    let mut n = Note::fretted(Tuning::standard_bass(), string, fret, start, duration);
    n.dynamic = Dynamic::F;
    n
}

fn rich_song() -> Song {
    let mut slapped = AdornedNote::unadorned(note(2, 5, Time::new(0, 1), Time::new(1, 4)));
    slapped.adornment.plucking.technique = PluckingTechnique::Slap;
    slapped.adornment.plucking.palm_mute = true;
    slapped.adornment.plucking.accent = true;
    slapped.adornment.ghost = true;

    let mut bent = AdornedNote::unadorned(note(2, 7, Time::new(1, 4), Time::new(1, 4)));
    bent.adornment.fretting.technique = FrettingTechnique::HammerOn;
    bent.adornment.fretting.modulation.bend = Some(Bend { amount: 0.75 });
    bent.adornment.fretting.modulation.vibrato = true;
    bent.adornment.fretting.let_ring = true;

    let mut harmonic = AdornedNote::unadorned(note(1, 12, Time::new(1, 2), Time::new(1, 4)));
    harmonic.adornment.fretting.modification = FrettingModification::NaturalHarmonic;
    harmonic.adornment.plucking.artificial_harmonic = Some(ArtificialHarmonic { octave: 1 });
    harmonic.adornment.fretting.modulation.trill = Some(Trill {
        fret: 14,
        duration: Time::new(1, 32),
    });
    harmonic.adornment.grace = Some(GraceNote {
        fret: 10,
        duration: Time::new(1, 64),
        dynamic: Dynamic::Pp,
        dead_note: true,
        on_beat: false,
        transition: GraceTransition::Slide,
    });

    let mut sliding = AdornedNote::unadorned(note(1, 14, Time::new(3, 4), Time::new(1, 4)));
    sliding.adornment.fretting.modulation.slide = Some(Slide {
        incoming: Some(IncomingSlide::FromBelow),
        outgoing: Some(OutgoingSlide::OutDown),
    });
    sliding.note.notated = NotatedDuration {
        value: 8,
        dotted: true,
        tuplet: Some(Tuplet {
            actual: 3,
            normal: 2,
        }),
    };

    let bar1 = Measure::new(
        MeasureMeta {
            title: "intro".into(),
            ..MeasureMeta::numbered(1)
        },
        Time::new(0, 1),
        vec![slapped, bent, harmonic, sliding],
    );

    // Second bar: a tie chain and a rest.
    let head = AdornedNote::unadorned(note(3, 3, Time::new(1, 1), Time::new(1, 2)));
    let mut tail = AdornedNote::unadorned(note(3, 3, Time::new(3, 2), Time::new(1, 4)));
    tail.note.tied = true;
    let rest = AdornedNote::unadorned(Note::rest(Time::new(7, 4), Time::new(1, 4)));
    let bar2 = Measure::new(
        MeasureMeta::numbered(2),
        Time::new(1, 1),
        vec![head, tail, rest],
    );

    Song {
        meta: SongMeta {
            title: "Fixture".into(),
            artist: "tests".into(),
            tempo: 104,
            tuning: Tuning::standard_bass(),
        },
        measures: vec![bar1, bar2],
    }
}

#[test]
fn rich_song_survives_encode_decode() {
    let songs = vec![rich_song()];
    let codec = JsonCodec;

    let encoded = codec.encode_string(&songs).unwrap();
    let decoded = codec.decode_str(&encoded).unwrap();
    assert_eq!(songs, decoded);
}

#[test]
fn rich_song_survives_a_file_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("fixture.json");
    let songs = vec![rich_song()];

    let codec = JsonCodec;
    codec.encode(&songs, &path).unwrap();
    assert_eq!(codec.decode(&path).unwrap(), songs);
}

#[test]
fn verify_roundtrip_passes_for_the_fixture() {
    assert!(verify_roundtrip(&[rich_song()]).is_ok());
}

#[test]
fn fixture_measures_cover_their_spans() {
    for measure in &rich_song().measures {
        assert!(measure.validate_span().is_ok(), "measure {}", measure.meta.number);
    }
}

#[test]
fn fixture_measure_numbers_are_contiguous() {
    assert!(rich_song().has_contiguous_measures());
}

//! Revision: repair transition-dependent adornments.
//!
//! A left-to-right pass over consecutive sounding notes applies a fixed
//! rule order per pair: fretting continuity, slap/pop alternation,
//! pick-stroke alternation, open-string restrictions, slide chaining,
//! and (when requested) well-formedness constraints of the target
//! notation encoding. Rules rewrite adornment fields only - pitches and
//! rhythms are never touched - and every rewrite builds new notes rather
//! than editing in place.

use tracing::debug;

use tabs::{
    AdornedNote, FrettingTechnique, Measure, Note, OutgoingSlide, PluckingTechnique,
    IncomingSlide, Song,
};

/// Revision options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviseOptions {
    /// Enforce the constraints the external notation encoding needs for a
    /// valid re-encode (strips unrepresentable modulation combinations).
    pub gp5_wellformed: bool,
    /// Technique a note falls back to when an adornment is demoted.
    pub base_plucking: PluckingTechnique,
}

impl Default for ReviseOptions {
    fn default() -> Self {
        Self {
            gp5_wellformed: false,
            base_plucking: PluckingTechnique::Finger,
        }
    }
}

/// String-crossing check: -1 when the current note moves to a lower
/// string number (the physically higher-pitched string), 0 otherwise.
pub fn string_crossing(prev: &Note, cur: &Note) -> i8 {
    if cur.string < prev.string {
        -1
    } else {
        0
    }
}

/// Rule 1: fretting continuity.
///
/// A hammer-on or pull-off only exists relative to the preceding note on
/// the same string: rising stays a hammer-on, falling becomes a pull-off,
/// anything else (string change, repeated fret, no predecessor) demotes
/// to none. Valid legato transitions force finger plucking; demotion
/// restores the base plucking technique.
fn apply_continuity(
    prev: Option<&AdornedNote>,
    cur: &mut AdornedNote,
    base_plucking: PluckingTechnique,
) {
    if !cur.adornment.fretting.technique.is_legato() {
        return;
    }

    let relation = prev
        .filter(|p| p.note.string == cur.note.string)
        .map(|p| cur.note.fret.cmp(&p.note.fret));

    let (technique, plucking) = match relation {
        Some(std::cmp::Ordering::Greater) => (FrettingTechnique::HammerOn, PluckingTechnique::Finger),
        Some(std::cmp::Ordering::Less) => (FrettingTechnique::PullOff, PluckingTechnique::Finger),
        _ => (FrettingTechnique::None, base_plucking),
    };

    if cur.adornment.fretting.technique != technique
        || cur.adornment.plucking.technique != plucking
    {
        debug!(
            from = ?cur.adornment.fretting.technique,
            to = ?technique,
            "fretting continuity rewrite"
        );
    }
    cur.adornment.fretting.technique = technique;
    cur.adornment.plucking.technique = plucking;
}

/// Rule 3: slap/pop alternation.
///
/// Consecutive slap-family notes flip between slap and pop when the line
/// crosses to a higher-pitched string; same-string repeats keep the
/// previous technique.
fn apply_slap_pop(prev: &AdornedNote, cur: &mut AdornedNote) {
    if !cur.adornment.plucking.technique.is_slap_family()
        || !prev.adornment.plucking.technique.is_slap_family()
    {
        return;
    }

    let technique = if string_crossing(&prev.note, &cur.note) == -1 {
        match prev.adornment.plucking.technique {
            PluckingTechnique::Slap => PluckingTechnique::Pop,
            _ => PluckingTechnique::Slap,
        }
    } else {
        prev.adornment.plucking.technique
    };

    if cur.adornment.plucking.technique != technique {
        debug!(to = ?technique, "slap/pop alternation rewrite");
        cur.adornment.plucking.technique = technique;
    }
}

/// Per-measure alternation state for stroke-direction families. Restarts
/// at every measure boundary.
#[derive(Default)]
struct StrokeState {
    last_pick: Option<PluckingTechnique>,
    last_thumb: Option<PluckingTechnique>,
}

/// Rule 4: pick-stroke alternation.
///
/// Pick strokes (and directed double-thumb strokes) strictly alternate
/// per onset within a measure. A grace-note carrier keeps its own
/// direction; the chain continues from whatever it played.
fn apply_stroke_alternation(state: &mut StrokeState, cur: &mut AdornedNote) {
    let technique = cur.adornment.plucking.technique;

    if technique.is_pick_family() {
        if cur.adornment.grace.is_none() {
            if let Some(last) = state.last_pick {
                let next = match last {
                    PluckingTechnique::PickDown => PluckingTechnique::PickUp,
                    _ => PluckingTechnique::PickDown,
                };
                if cur.adornment.plucking.technique != next {
                    debug!(to = ?next, "pick-stroke alternation rewrite");
                    cur.adornment.plucking.technique = next;
                }
            }
        }
        state.last_pick = Some(cur.adornment.plucking.technique);
    } else if technique.is_thumb_stroke_family() {
        if cur.adornment.grace.is_none() {
            if let Some(last) = state.last_thumb {
                let next = match last {
                    PluckingTechnique::DoubleThumbDownstroke => {
                        PluckingTechnique::DoubleThumbUpstroke
                    }
                    _ => PluckingTechnique::DoubleThumbDownstroke,
                };
                if cur.adornment.plucking.technique != next {
                    debug!(to = ?next, "thumb-stroke alternation rewrite");
                    cur.adornment.plucking.technique = next;
                }
            }
        }
        state.last_thumb = Some(cur.adornment.plucking.technique);
    }
}

/// Rule 5: open-string restrictions.
///
/// Fret 0 cannot be tapped and cannot slide in or out; offenders fall
/// back to the base technique and lose their slide.
fn apply_open_string(cur: &mut AdornedNote, base_plucking: PluckingTechnique) {
    if !cur.note.is_open_string() {
        return;
    }

    if cur.adornment.plucking.technique == PluckingTechnique::Tap {
        debug!("open string cannot be tapped, falling back");
        cur.adornment.plucking.technique = base_plucking;
    }
    if cur.adornment.fretting.modulation.slide.is_some() {
        debug!("open string cannot slide, suppressing");
        cur.adornment.fretting.modulation.slide = None;
    }
}

/// Rule 6: slide chaining.
///
/// An outgoing shift/legato slide needs a same-string, different-fret
/// successor; an incoming marker must agree with the approach direction
/// when the previous note sits on the same string. Inconsistent sides
/// are nulled, and a slide left with neither side disappears.
fn chain_slides(prev: &mut AdornedNote, cur: &mut AdornedNote) {
    if let Some(mut slide) = prev.adornment.fretting.modulation.slide {
        if matches!(
            slide.outgoing,
            Some(OutgoingSlide::ShiftTo) | Some(OutgoingSlide::Legato)
        ) {
            let chainable = !cur.note.rest
                && cur.note.string == prev.note.string
                && cur.note.fret != prev.note.fret;
            if !chainable {
                debug!("unchainable outgoing slide nulled");
                slide.outgoing = None;
                prev.adornment.fretting.modulation.slide =
                    (!slide.is_empty()).then_some(slide);
            }
        }
    }

    if let Some(mut slide) = cur.adornment.fretting.modulation.slide {
        if let Some(incoming) = slide.incoming {
            let consistent = if prev.note.rest || prev.note.string != cur.note.string {
                true
            } else {
                match incoming {
                    IncomingSlide::FromBelow => prev.note.fret < cur.note.fret,
                    IncomingSlide::FromAbove => prev.note.fret > cur.note.fret,
                }
            };
            if !consistent {
                debug!("inconsistent incoming slide nulled");
                slide.incoming = None;
                cur.adornment.fretting.modulation.slide =
                    (!slide.is_empty()).then_some(slide);
            }
        }
    }
}

/// Rule 7: well-formedness for the external notation encoding.
///
/// Combinations with no safe representation drop the modulation: a trill
/// on a dead note, a trill with a bend, a trill on a tie continuation,
/// and a slide on a dead note.
fn strip_unrepresentable(cur: &mut AdornedNote) {
    let dead = cur.adornment.fretting.modification == tabs::FrettingModification::DeadNote;

    if cur.adornment.fretting.modulation.trill.is_some()
        && (dead || cur.adornment.fretting.modulation.bend.is_some() || cur.note.tied)
    {
        debug!("trill has no safe representation, dropping");
        cur.adornment.fretting.modulation.trill = None;
    }
    if dead && cur.adornment.fretting.modulation.slide.is_some() {
        debug!("slide has no safe representation, dropping");
        cur.adornment.fretting.modulation.slide = None;
    }
}

/// Revise one measure. `prev_last` is the last sounding attack of the
/// previous measure, used for continuity and alternation across the
/// barline (stroke alternation itself restarts per measure).
pub fn revise_measure(
    measure: &Measure,
    prev_last: Option<&AdornedNote>,
    options: &ReviseOptions,
) -> Measure {
    let mut out: Vec<AdornedNote> = Vec::with_capacity(measure.notes.len());
    let mut state = StrokeState::default();

    for note in &measure.notes {
        // Rests and tie continuations are not attacks; pass them through.
        if note.note.rest || note.note.tied {
            out.push(note.clone());
            continue;
        }

        let mut cur = note.clone();
        let prev_idx = out
            .iter()
            .rposition(|n| !n.note.rest && !n.note.tied);

        {
            let prev = prev_idx.map(|i| &out[i]).or(prev_last);
            apply_continuity(prev, &mut cur, options.base_plucking);
            if let Some(p) = prev {
                apply_slap_pop(p, &mut cur);
            }
        }

        apply_stroke_alternation(&mut state, &mut cur);
        apply_open_string(&mut cur, options.base_plucking);

        if let Some(i) = prev_idx {
            chain_slides(&mut out[i], &mut cur);
        }

        if options.gp5_wellformed {
            strip_unrepresentable(&mut cur);
        }

        out.push(cur);
    }

    if options.gp5_wellformed {
        // Tie continuations still carry modulation fields worth checking.
        for note in out.iter_mut().filter(|n| n.note.tied) {
            strip_unrepresentable(note);
        }
    }

    measure.with_notes(out)
}

/// Revise a whole song: each measure in order, then slide chains across
/// each barline.
pub fn revise_song(song: &Song, options: &ReviseOptions) -> Song {
    let mut measures: Vec<Measure> = Vec::with_capacity(song.measures.len());
    let mut prev_last: Option<AdornedNote> = None;

    for measure in &song.measures {
        let revised = revise_measure(measure, prev_last.as_ref(), options);
        prev_last = revised.last_sounding().cloned();
        measures.push(revised);
    }

    for i in 1..measures.len() {
        stitch_barline(&mut measures, i);
    }

    Song {
        meta: song.meta.clone(),
        measures,
    }
}

/// Apply slide chaining between the last attack of measure `i - 1` and
/// the first attack of measure `i`.
fn stitch_barline(measures: &mut [Measure], i: usize) {
    let last_idx = measures[i - 1]
        .notes
        .iter()
        .rposition(|n| !n.note.rest && !n.note.tied);
    let first_idx = measures[i]
        .notes
        .iter()
        .position(|n| !n.note.rest && !n.note.tied);

    let (Some(last_idx), Some(first_idx)) = (last_idx, first_idx) else {
        return;
    };

    let mut last = measures[i - 1].notes[last_idx].clone();
    let mut first = measures[i].notes[first_idx].clone();
    chain_slides(&mut last, &mut first);

    if last != measures[i - 1].notes[last_idx] {
        let mut notes = measures[i - 1].notes.clone();
        notes[last_idx] = last;
        measures[i - 1] = measures[i - 1].with_notes(notes);
    }
    if first != measures[i].notes[first_idx] {
        let mut notes = measures[i].notes.clone();
        notes[first_idx] = first;
        measures[i] = measures[i].with_notes(notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabs::{
        Bend, FrettingModification, MeasureMeta, Slide, Time, Trill, Tuning,
    };

    fn attack(string: u8, fret: u8, slot: i64) -> AdornedNote {
        AdornedNote::unadorned(Note::fretted(
            Tuning::standard_bass(),
            string,
            fret,
            Time::new(slot, 4),
            Time::new(1, 4),
        ))
    }

    fn measure_of(notes: Vec<AdornedNote>) -> Measure {
        Measure::new(MeasureMeta::numbered(1), Time::new(0, 1), notes)
    }

    fn techniques(measure: &Measure) -> Vec<FrettingTechnique> {
        measure
            .notes
            .iter()
            .map(|n| n.adornment.fretting.technique)
            .collect()
    }

    #[test]
    fn string_crossing_signs() {
        let on_string_2 = attack(2, 5, 0);
        let on_string_1 = attack(1, 5, 1);
        assert_eq!(string_crossing(&on_string_2.note, &on_string_1.note), -1);
        assert_eq!(string_crossing(&on_string_1.note, &on_string_1.note), 0);
        assert_eq!(string_crossing(&on_string_1.note, &on_string_2.note), 0);
    }

    #[test]
    fn forced_hammer_ons_repair_to_physical_chain() {
        // Every note forced to hammer-on; the fret/string relationships
        // after the opening note are rising, falling, string change.
        let mut notes = vec![
            attack(2, 5, 0),
            attack(2, 7, 1),
            attack(2, 5, 2),
            attack(1, 5, 3),
        ];
        for n in &mut notes {
            n.adornment.fretting.technique = FrettingTechnique::HammerOn;
            n.adornment.plucking.technique = PluckingTechnique::Slap;
        }

        let revised = revise_measure(&measure_of(notes), None, &ReviseOptions::default());
        assert_eq!(
            techniques(&revised),
            vec![
                FrettingTechnique::None, // no predecessor
                FrettingTechnique::HammerOn,
                FrettingTechnique::PullOff,
                FrettingTechnique::None, // string change
            ]
        );

        // Legato transitions force finger plucking; demoted notes fall
        // back to the base technique.
        let plucking: Vec<PluckingTechnique> = revised
            .notes
            .iter()
            .map(|n| n.adornment.plucking.technique)
            .collect();
        assert_eq!(
            plucking,
            vec![
                PluckingTechnique::Finger,
                PluckingTechnique::Finger,
                PluckingTechnique::Finger,
                PluckingTechnique::Finger,
            ]
        );
    }

    #[test]
    fn continuity_uses_previous_measure_last_note() {
        let prev = attack(2, 5, 3);
        let mut first = attack(2, 7, 4);
        first.adornment.fretting.technique = FrettingTechnique::PullOff;

        let revised = revise_measure(
            &measure_of(vec![first]),
            Some(&prev),
            &ReviseOptions::default(),
        );
        // Rising on the same string: the pull-off becomes a hammer-on.
        assert_eq!(techniques(&revised), vec![FrettingTechnique::HammerOn]);
    }

    #[test]
    fn slap_pop_alternates_on_crossing_only() {
        let mut notes = vec![attack(2, 3, 0), attack(2, 5, 1), attack(1, 7, 2)];
        for n in &mut notes {
            n.adornment.plucking.technique = PluckingTechnique::Slap;
        }

        let revised = revise_measure(&measure_of(notes), None, &ReviseOptions::default());
        let plucking: Vec<PluckingTechnique> = revised
            .notes
            .iter()
            .map(|n| n.adornment.plucking.technique)
            .collect();
        // Same string keeps slap; crossing to string 1 flips to pop.
        assert_eq!(
            plucking,
            vec![
                PluckingTechnique::Slap,
                PluckingTechnique::Slap,
                PluckingTechnique::Pop,
            ]
        );
    }

    #[test]
    fn pick_strokes_alternate_and_restart_per_measure() {
        let mut notes = vec![
            attack(2, 3, 0),
            attack(2, 5, 1),
            attack(2, 7, 2),
            attack(2, 8, 3),
        ];
        for n in &mut notes {
            n.adornment.plucking.technique = PluckingTechnique::PickDown;
        }
        let bar1 = measure_of(notes.clone());

        let revised = revise_measure(&bar1, None, &ReviseOptions::default());
        let plucking: Vec<PluckingTechnique> = revised
            .notes
            .iter()
            .map(|n| n.adornment.plucking.technique)
            .collect();
        assert_eq!(
            plucking,
            vec![
                PluckingTechnique::PickDown,
                PluckingTechnique::PickUp,
                PluckingTechnique::PickDown,
                PluckingTechnique::PickUp,
            ]
        );

        // A second measure starts its own chain from its own first stroke.
        let second = revise_measure(&bar1, revised.last_sounding(), &ReviseOptions::default());
        assert_eq!(
            second.notes[0].adornment.plucking.technique,
            PluckingTechnique::PickDown
        );
    }

    #[test]
    fn grace_note_carrier_breaks_strict_alternation() {
        let mut notes = vec![attack(2, 3, 0), attack(2, 5, 1), attack(2, 7, 2)];
        for n in &mut notes {
            n.adornment.plucking.technique = PluckingTechnique::PickDown;
        }
        notes[1].adornment.grace = Some(tabs::GraceNote {
            fret: 4,
            duration: Time::new(1, 32),
            dynamic: tabs::Dynamic::P,
            dead_note: false,
            on_beat: false,
            transition: tabs::GraceTransition::HammerOn,
        });

        let revised = revise_measure(&measure_of(notes), None, &ReviseOptions::default());
        let plucking: Vec<PluckingTechnique> = revised
            .notes
            .iter()
            .map(|n| n.adornment.plucking.technique)
            .collect();
        // The grace carrier keeps its own down-stroke; the chain then
        // alternates from it.
        assert_eq!(
            plucking,
            vec![
                PluckingTechnique::PickDown,
                PluckingTechnique::PickDown,
                PluckingTechnique::PickUp,
            ]
        );
    }

    #[test]
    fn thumb_strokes_alternate_like_picks() {
        let mut notes = vec![attack(3, 3, 0), attack(3, 5, 1), attack(3, 7, 2)];
        for n in &mut notes {
            n.adornment.plucking.technique = PluckingTechnique::DoubleThumbDownstroke;
        }

        let revised = revise_measure(&measure_of(notes), None, &ReviseOptions::default());
        let plucking: Vec<PluckingTechnique> = revised
            .notes
            .iter()
            .map(|n| n.adornment.plucking.technique)
            .collect();
        assert_eq!(
            plucking,
            vec![
                PluckingTechnique::DoubleThumbDownstroke,
                PluckingTechnique::DoubleThumbUpstroke,
                PluckingTechnique::DoubleThumbDownstroke,
            ]
        );
    }

    #[test]
    fn open_string_loses_tap_and_slide() {
        let mut open = attack(2, 0, 0);
        open.adornment.plucking.technique = PluckingTechnique::Tap;
        open.adornment.fretting.modulation.slide = Some(Slide {
            incoming: Some(IncomingSlide::FromBelow),
            outgoing: None,
        });

        let revised = revise_measure(&measure_of(vec![open]), None, &ReviseOptions::default());
        assert_eq!(
            revised.notes[0].adornment.plucking.technique,
            PluckingTechnique::Finger
        );
        assert!(revised.notes[0].adornment.fretting.modulation.slide.is_none());
    }

    #[test]
    fn unchainable_outgoing_slide_is_nulled() {
        let mut first = attack(2, 5, 0);
        first.adornment.fretting.modulation.slide = Some(Slide {
            incoming: None,
            outgoing: Some(OutgoingSlide::ShiftTo),
        });
        // Next attack on a different string: the shift cannot chain.
        let second = attack(1, 7, 1);

        let revised = revise_measure(
            &measure_of(vec![first, second]),
            None,
            &ReviseOptions::default(),
        );
        assert!(revised.notes[0].adornment.fretting.modulation.slide.is_none());
    }

    #[test]
    fn chainable_outgoing_slide_survives() {
        let mut first = attack(2, 5, 0);
        first.adornment.fretting.modulation.slide = Some(Slide {
            incoming: None,
            outgoing: Some(OutgoingSlide::Legato),
        });
        let second = attack(2, 7, 1);

        let revised = revise_measure(
            &measure_of(vec![first, second]),
            None,
            &ReviseOptions::default(),
        );
        assert_eq!(
            revised.notes[0]
                .adornment
                .fretting
                .modulation
                .slide
                .unwrap()
                .outgoing,
            Some(OutgoingSlide::Legato)
        );
    }

    #[test]
    fn inconsistent_incoming_slide_is_nulled() {
        let first = attack(2, 7, 0);
        let mut second = attack(2, 5, 1);
        // Claims to arrive from below but the approach is from above.
        second.adornment.fretting.modulation.slide = Some(Slide {
            incoming: Some(IncomingSlide::FromBelow),
            outgoing: None,
        });

        let revised = revise_measure(
            &measure_of(vec![first, second]),
            None,
            &ReviseOptions::default(),
        );
        assert!(revised.notes[1].adornment.fretting.modulation.slide.is_none());
    }

    #[test]
    fn slide_chains_across_the_barline() {
        let mut last = attack(2, 5, 3);
        last.adornment.fretting.modulation.slide = Some(Slide {
            incoming: None,
            outgoing: Some(OutgoingSlide::ShiftTo),
        });
        let bar1 = measure_of(vec![attack(2, 3, 0), last]);

        // Next measure opens on a different string: the shift is impossible.
        let bar2 = Measure::new(
            MeasureMeta::numbered(2),
            Time::new(1, 1),
            vec![attack(1, 5, 4)],
        );

        let song = Song {
            meta: tabs::SongMeta::default(),
            measures: vec![bar1, bar2],
        };
        let revised = revise_song(&song, &ReviseOptions::default());
        assert!(revised.measures[0].notes[1]
            .adornment
            .fretting
            .modulation
            .slide
            .is_none());
    }

    #[test]
    fn wellformedness_strips_unrepresentable_modulations() {
        let options = ReviseOptions {
            gp5_wellformed: true,
            ..Default::default()
        };

        let mut trilled_bend = attack(2, 5, 0);
        trilled_bend.adornment.fretting.modulation.trill = Some(Trill {
            fret: 7,
            duration: Time::new(1, 16),
        });
        trilled_bend.adornment.fretting.modulation.bend = Some(Bend { amount: 0.5 });

        let mut dead_slide = attack(2, 7, 1);
        dead_slide.adornment.fretting.modification = FrettingModification::DeadNote;
        dead_slide.adornment.fretting.modulation.slide = Some(Slide {
            incoming: Some(IncomingSlide::FromBelow),
            outgoing: None,
        });

        let revised = revise_measure(&measure_of(vec![trilled_bend, dead_slide]), None, &options);
        assert!(revised.notes[0].adornment.fretting.modulation.trill.is_none());
        // The bend itself is representable and survives.
        assert!(revised.notes[0].adornment.fretting.modulation.bend.is_some());
        assert!(revised.notes[1].adornment.fretting.modulation.slide.is_none());
    }

    #[test]
    fn revision_never_touches_pitch_or_rhythm() {
        let mut notes = vec![attack(2, 5, 0), attack(2, 7, 1), attack(1, 3, 2)];
        for n in &mut notes {
            n.adornment.fretting.technique = FrettingTechnique::HammerOn;
            n.adornment.plucking.technique = PluckingTechnique::Slap;
        }
        let measure = measure_of(notes);

        let revised = revise_measure(&measure, None, &ReviseOptions::default());
        for (before, after) in measure.notes.iter().zip(revised.notes.iter()) {
            assert_eq!(before.note, after.note);
        }
    }
}

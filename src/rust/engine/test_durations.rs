use super::*;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn test_paired_notes_resolve_exactly() {
    let score = Score::from_absolute([
        (ms(0), 60, 100),
        (ms(120), 64, 90),
        (ms(370), 60, 0),
        (ms(1_120), 64, 0),
    ]);
    let table = resolve_durations(&score, PitchRange::PIANO);

    assert_eq!(table.len(), 2);
    assert_eq!(table.get(60), Some(ms(370)));
    assert_eq!(table.get(64), Some(ms(1_000)));
    assert_eq!(table.longest(), Some(ms(1_000)));
    assert_eq!(table.unclosed().count(), 0);
}

#[test]
fn test_unclosed_note_has_no_entry() {
    let score = Score::from_absolute([(ms(0), 60, 100), (ms(200), 62, 100), (ms(500), 62, 0)]);
    let table = resolve_durations(&score, PitchRange::PIANO);

    assert_eq!(table.get(60), None);
    assert_eq!(table.duration_or(60, ms(100)), ms(100));
    assert_eq!(table.get(62), Some(ms(300)));
    assert_eq!(table.unclosed().collect::<Vec<_>>(), vec![60]);
}

#[test]
fn test_last_open_wins_on_retrigger() {
    // Second note-on overwrites the pending start of the first.
    let score = Score::from_absolute([(ms(0), 60, 100), (ms(400), 60, 100), (ms(500), 60, 0)]);
    let table = resolve_durations(&score, PitchRange::PIANO);

    assert_eq!(table.get(60), Some(ms(100)));
}

#[test]
fn test_last_closed_duration_is_kept() {
    let score = Score::from_absolute([
        (ms(0), 60, 100),
        (ms(800), 60, 0),
        (ms(1_000), 60, 100),
        (ms(1_250), 60, 0),
    ]);
    let table = resolve_durations(&score, PitchRange::PIANO);

    assert_eq!(table.get(60), Some(ms(250)));
}

#[test]
fn test_orphan_note_off_and_out_of_range_pitches_are_ignored() {
    let score = Score::from_absolute([
        (ms(0), 70, 0),
        (ms(10), 12, 100),
        (ms(20), 12, 0),
        (ms(30), 70, 100),
        (ms(90), 70, 0),
    ]);
    let table = resolve_durations(&score, PitchRange::PIANO);

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(12), None);
    assert_eq!(table.get(70), Some(ms(60)));
}

#[test]
fn test_empty_score() {
    let table = resolve_durations(&Score::default(), PitchRange::PIANO);
    assert!(table.is_empty());
    assert_eq!(table.longest(), None);
}

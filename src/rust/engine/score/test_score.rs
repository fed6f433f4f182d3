use super::*;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Header, TrackEvent};

fn note(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        },
    }
}

fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(64),
            },
        },
    }
}

fn tempo(delta: u32, us_per_quarter: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us_per_quarter))),
    }
}

fn end(delta: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

fn encode(format: Format, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    let mut smf = Smf::new(Header::new(format, Timing::Metrical(u15::new(480))));
    smf.tracks = tracks;
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_single_track_at_default_tempo() {
    let bytes = encode(
        Format::SingleTrack,
        vec![vec![note(0, 60, 100), note_off(480, 60), end(0)]],
    );
    let score = parse_midi_bytes(&bytes).unwrap();

    assert_eq!(score.len(), 2);
    assert_eq!(
        score.events[0],
        ScoreEvent::NoteOn {
            pitch: 60,
            velocity: 100,
            delta: Duration::ZERO
        }
    );
    // One quarter note at 120 BPM.
    assert_eq!(
        score.events[1],
        ScoreEvent::NoteOff {
            pitch: 60,
            delta: Duration::from_millis(500)
        }
    );
    assert_eq!(score.tail, Duration::ZERO);
}

#[test]
fn test_zero_velocity_note_on_is_note_off() {
    let bytes = encode(
        Format::SingleTrack,
        vec![vec![note(0, 64, 90), note(240, 64, 0), end(0)]],
    );
    let score = parse_midi_bytes(&bytes).unwrap();

    assert!(matches!(
        score.events[1],
        ScoreEvent::NoteOff { pitch: 64, .. }
    ));
    assert_eq!(score.note_on_count(), 1);
}

#[test]
fn test_tempo_change_applies_to_following_ticks() {
    let bytes = encode(
        Format::SingleTrack,
        vec![vec![
            tempo(0, 1_000_000),
            note(0, 60, 100),
            note_off(480, 60),
            end(0),
        ]],
    );
    let score = parse_midi_bytes(&bytes).unwrap();

    assert_eq!(score.events[1].delta(), Duration::from_secs(1));
}

#[test]
fn test_tracks_are_merged_by_time() {
    let bytes = encode(
        Format::Parallel,
        vec![
            vec![tempo(0, 500_000), end(0)],
            vec![note(0, 60, 100), note_off(960, 60), end(0)],
            vec![note(480, 67, 100), note_off(960, 67), end(0)],
        ],
    );
    let score = parse_midi_bytes(&bytes).unwrap();
    let pitches: Vec<Pitch> = score.events.iter().map(ScoreEvent::pitch).collect();
    let deltas: Vec<Duration> = score.events.iter().map(ScoreEvent::delta).collect();

    assert_eq!(score.track_count, 3);
    assert_eq!(pitches, vec![60, 67, 60, 67]);
    assert_eq!(
        deltas,
        vec![
            Duration::ZERO,
            Duration::from_millis(500),
            Duration::from_millis(500),
            Duration::from_millis(500),
        ]
    );
    assert_eq!(score.length(), Duration::from_millis(1500));
}

#[test]
fn test_trailing_meta_time_becomes_tail() {
    let bytes = encode(
        Format::SingleTrack,
        vec![vec![note(0, 60, 100), note_off(480, 60), end(960)]],
    );
    let score = parse_midi_bytes(&bytes).unwrap();

    assert_eq!(score.tail, Duration::from_secs(1));
    assert_eq!(score.length(), Duration::from_millis(1500));
}

#[test]
fn test_sequential_format_is_rejected() {
    let bytes = encode(Format::Sequential, vec![vec![end(0)], vec![end(0)]]);
    assert!(matches!(
        parse_midi_bytes(&bytes),
        Err(ScoreError::UnsupportedFormat)
    ));
}

#[test]
fn test_garbage_is_a_parse_error() {
    assert!(matches!(
        parse_midi_bytes(b"definitely not a midi file"),
        Err(ScoreError::Parse(_))
    ));
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_midi_file(Path::new("/nonexistent/song.mid")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/song.mid"));
}

#[test]
fn test_from_absolute_computes_deltas() {
    let score = Score::from_absolute([
        (Duration::ZERO, 21, 100),
        (Duration::from_millis(500), 22, 100),
        (Duration::from_millis(1000), 21, 0),
    ]);

    assert_eq!(score.events[1].delta(), Duration::from_millis(500));
    assert_eq!(score.events[2].delta(), Duration::from_millis(500));
    assert!(!score.events[2].is_note_on());
}

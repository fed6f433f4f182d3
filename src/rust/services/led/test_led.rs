use super::*;
use crate::engine::clock::SimulatedClock;
use crate::engine::driver::MemoryTransport;
use crate::engine::layout::PitchRange;
use midly::num::{u4, u7, u15, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

fn key(delta: u32, pitch: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(vel),
            },
        },
    }
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

fn write_midi(dir: &std::path::Path, events: Vec<TrackEvent<'static>>) -> PathBuf {
    // 96 ticks per quarter at 120 bpm: one tick is ~5.2ms
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(96)),
    ));
    smf.tracks = vec![events];
    let path = dir.join("song.mid");
    smf.save(&path).unwrap();
    path
}

fn quiet_service() -> LedPlayService {
    LedPlayService::new(Arc::new(Logger::silent()))
}

#[tokio::test]
async fn test_dry_run_plays_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_midi(dir.path(), vec![key(0, 60, 90), key(4, 60, 0), end_of_track()]);

    let request = LedPlayRequest {
        score_path: path,
        layout_path: None,
        channel_count: 142,
        output: OutputTarget::DryRun,
        settle: Duration::from_secs(2),
        session: SessionConfig {
            command_delay: Duration::ZERO,
            drain_tick: Duration::from_millis(5),
            ..SessionConfig::default()
        },
    };
    let report = quiet_service().run(request).await.unwrap();

    assert_eq!(report.notes, 1);
    assert_eq!(report.transmissions, 2);
    assert_eq!(report.forced_off, 0);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_missing_score_is_fatal() {
    let request = LedPlayRequest {
        score_path: PathBuf::from("/definitely/not/here.mid"),
        layout_path: None,
        channel_count: 142,
        output: OutputTarget::DryRun,
        settle: Duration::ZERO,
        session: SessionConfig::default(),
    };
    let err = quiet_service().run(request).await.unwrap_err();
    assert!(format!("{:#}", err).contains("failed to load MIDI file"));
}

#[test]
fn test_layout_file_errors_carry_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strip.json");
    std::fs::write(&path, r#"{ "version": 7, "entries": [] }"#).unwrap();

    let err = quiet_service()
        .load_layout(Some(&path), PitchRange::PIANO, 142)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("strip.json"));
}

#[tokio::test]
async fn test_play_with_uses_given_transport_and_clock() {
    let service = quiet_service();
    let layout = service.load_layout(None, PitchRange::PIANO, 142).unwrap();
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new().with_clock(clock.clone());
    let score = Score::from_absolute(vec![
        (Duration::ZERO, 21, 80),
        (Duration::from_millis(300), 21, 0),
    ]);
    let config = SessionConfig {
        command_delay: Duration::ZERO,
        ..SessionConfig::default()
    };

    let report = service
        .play_with(
            &score,
            &layout,
            config,
            TransportHandle::owned(transport.clone()),
            clock.clone(),
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

    // key 1 sits on LED 2 of the built-in strip, the first channel
    assert_eq!(
        transport.timed_lines(),
        vec![
            (Duration::ZERO, "ON 0".to_string()),
            (Duration::from_millis(300), "OFF 0".to_string()),
        ]
    );
    assert_eq!(report.notes, 1);
    assert_eq!(transport.close_calls(), 1);
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    assert_eq!(format_duration(Duration::from_micros(2500)), "2.5ms");
}

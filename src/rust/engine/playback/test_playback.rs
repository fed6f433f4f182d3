use super::*;
use crate::engine::clock::{SimulatedClock, TokioClock};
use crate::engine::driver::{Command, MemoryTransport, Transport};
use crate::engine::layout::{LAYOUT_VERSION, LayoutEntry, LayoutFile};
use std::sync::Mutex;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn layout(entries: &[(Pitch, ChannelIndex)], channels: u16) -> KeyLayout {
    let file = LayoutFile {
        version: LAYOUT_VERSION,
        name: None,
        led_base: 0,
        entries: entries
            .iter()
            .map(|&(pitch, channel)| LayoutEntry::Pitch { pitch, channel })
            .collect(),
    };
    KeyLayout::from_file(&file, PitchRange::PIANO, channels).unwrap()
}

fn config() -> SessionConfig {
    SessionConfig {
        command_delay: Duration::ZERO,
        ..SessionConfig::default()
    }
}

fn session<'a>(
    layout: &'a KeyLayout,
    transport: &MemoryTransport,
    clock: &SimulatedClock,
) -> PlaybackSession<'a> {
    PlaybackSession::new(
        layout,
        config(),
        TransportHandle::owned(transport.clone()),
        clock.clone(),
        Arc::new(Logger::silent()),
    )
    .unwrap()
}

fn timed(lines: &[(u64, &str)]) -> Vec<(Duration, String)> {
    lines.iter().map(|(t, l)| (ms(*t), l.to_string())).collect()
}

/// Commands per channel must alternate ON, OFF, ON, ... and end with OFF.
fn assert_edge_triggered(lines: &[String]) {
    let mut last: std::collections::HashMap<ChannelIndex, bool> = Default::default();
    for line in lines {
        let command: Command = line.parse().unwrap();
        let previous = last.insert(command.channel(), command.is_on()).unwrap_or(false);
        assert_ne!(previous, command.is_on(), "redundant command {}", line);
    }
    assert!(last.values().all(|on| !on), "channel left on: {:?}", last);
}

#[tokio::test]
async fn test_single_note_turns_on_then_off() {
    let layout = layout(&[(21, 0)], 2);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new().with_clock(clock.clone());
    let score = Score::from_absolute([(ms(0), 21, 100), (ms(500), 21, 0)]);

    let report = session(&layout, &transport, &clock)
        .play(&score)
        .await
        .unwrap();

    assert_eq!(transport.timed_lines(), timed(&[(0, "ON 0"), (500, "OFF 0")]));
    assert_eq!(report.transmissions, 2);
    assert_eq!(report.forced_off, 0);
    assert_eq!(report.notes, 1);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_shared_channel_stays_on_until_both_notes_end() {
    let layout = layout(&[(21, 0), (22, 0)], 1);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new().with_clock(clock.clone());
    let score = Score::from_absolute([
        (ms(0), 21, 100),
        (ms(500), 22, 100),
        (ms(1_000), 21, 0),
        (ms(1_500), 22, 0),
    ]);

    session(&layout, &transport, &clock)
        .play(&score)
        .await
        .unwrap();

    assert_eq!(
        transport.timed_lines(),
        timed(&[(0, "ON 0"), (1_500, "OFF 0")])
    );
}

#[tokio::test]
async fn test_unclosed_note_uses_default_duration() {
    let layout = layout(&[(21, 0)], 1);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new().with_clock(clock.clone());
    let score = Score::from_absolute([(ms(0), 21, 100)]);

    let mut session = session(&layout, &transport, &clock);
    let report = session.play(&score).await.unwrap();

    // Default is 100 ms, drained in 50 ms ticks.
    assert_eq!(transport.timed_lines(), timed(&[(0, "ON 0"), (100, "OFF 0")]));
    assert_eq!(report.ended_at, ms(100));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_note_off_does_not_cut_live_interval() {
    // Retrigger: the table holds 100 ms for pitch 60 (last-open-wins), so the
    // first interval has expired by the second note-on.
    let layout = layout(&[(60, 3)], 4);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new().with_clock(clock.clone());
    let score = Score::from_absolute([(ms(0), 60, 100), (ms(400), 60, 100), (ms(500), 60, 0)]);

    session(&layout, &transport, &clock)
        .play(&score)
        .await
        .unwrap();

    assert_eq!(transport.timed_lines(), timed(&[(0, "ON 3"), (500, "OFF 3")]));
}

#[tokio::test]
async fn test_state_matches_sounding_notes_after_every_event() {
    let layout = layout(&[(21, 0), (22, 0), (23, 1), (24, 2)], 3);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    let score = Score::from_absolute([
        (ms(0), 21, 100),
        (ms(100), 23, 100),
        (ms(150), 22, 100),
        (ms(200), 21, 0),
        (ms(250), 24, 100),
        (ms(300), 23, 0),
        (ms(400), 22, 0),
        (ms(420), 21, 100),
        (ms(900), 24, 0),
    ]);
    let durations = resolve_durations(&score, PitchRange::PIANO);

    let mut session = session(&layout, &transport, &clock);
    session.start().unwrap();
    for event in &score.events {
        session.step(event, &durations).await;
        assert!(session.is_consistent(), "diverged at {:?}", session.now());
    }
    let report = session.play(&Score::default()).await.unwrap();

    assert_eq!(report.events, score.len());
    assert_edge_triggered(&transport.lines());
}

#[tokio::test]
async fn test_every_channel_ends_off() {
    let layout = KeyLayout::builtin(PitchRange::PIANO, 142).unwrap();
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    let score = Score::from_absolute([
        (ms(0), 21, 100),
        (ms(0), 25, 100),
        (ms(0), 29, 100),
        (ms(50), 60, 100),
        (ms(300), 21, 0),
        (ms(310), 93, 100),
        (ms(320), 108, 100),
        (ms(800), 25, 0),
    ]);

    let mut session = session(&layout, &transport, &clock);
    session.play(&score).await.unwrap();

    assert!((0..142).all(|c| !session.channel_state(c)));
    assert_edge_triggered(&transport.lines());
    // Key 73 drives the last LED of the strip.
    assert!(transport.lines().contains(&"ON 140".to_string()));
}

#[tokio::test]
async fn test_observer_sees_every_note_on_in_range() {
    let layout = layout(&[(21, 0)], 1);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let score = Score::from_absolute([
        (ms(0), 21, 100),
        (ms(10), 50, 100),
        (ms(20), 12, 100),
        (ms(30), 21, 0),
        (ms(40), 50, 0),
    ]);

    session(&layout, &transport, &clock)
        .with_observer(move |pitch| sink.lock().unwrap().push(pitch))
        .play(&score)
        .await
        .unwrap();

    // 50 is unmapped but still reported; 12 is outside the piano.
    assert_eq!(*seen.lock().unwrap(), vec![21, 50]);
}

#[tokio::test]
async fn test_stop_signal_still_switches_leds_off() {
    let layout = layout(&[(21, 0), (22, 1)], 2);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    let score = Score::from_absolute([
        (ms(0), 21, 100),
        (ms(5_000), 22, 100),
        (ms(6_000), 21, 0),
        (ms(7_000), 22, 0),
    ]);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let mut tx = Some(tx);

    let mut session = session(&layout, &transport, &clock).with_observer(move |_| {
        if let Some(tx) = tx.take() {
            let _ = tx.send(());
        }
    });
    let report = session
        .play_until(&score, async {
            let _ = rx.await;
        })
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(transport.lines(), vec!["ON 0", "OFF 0"]);
    assert_eq!(report.forced_off, 1);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!transport.is_open());
}

#[tokio::test]
async fn test_owned_transport_is_closed_on_teardown() {
    let layout = layout(&[(21, 0)], 1);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    let score = Score::from_absolute([(ms(0), 21, 100), (ms(50), 21, 0)]);

    session(&layout, &transport, &clock)
        .play(&score)
        .await
        .unwrap();

    assert!(!transport.is_open());
    assert_eq!(transport.close_calls(), 1);
}

#[tokio::test]
async fn test_borrowed_transport_stays_open() {
    let layout = layout(&[(21, 0)], 1);
    let mut transport = MemoryTransport::new();
    let probe = transport.clone();
    let score = Score::from_absolute([(ms(0), 21, 100), (ms(50), 21, 0)]);

    {
        let mut session = PlaybackSession::new(
            &layout,
            config(),
            TransportHandle::borrowed(&mut transport),
            SimulatedClock::new(),
            Arc::new(Logger::silent()),
        )
        .unwrap();
        session.play(&score).await.unwrap();
    }

    assert!(transport.is_open());
    assert_eq!(probe.close_calls(), 0);
    assert_eq!(probe.lines(), vec!["ON 0", "OFF 0"]);
}

#[tokio::test]
async fn test_write_failures_do_not_abort_playback() {
    let layout = layout(&[(21, 0), (23, 1)], 2);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    transport.fail_writes(true);
    let score = Score::from_absolute([
        (ms(0), 21, 100),
        (ms(100), 23, 100),
        (ms(200), 21, 0),
        (ms(300), 23, 0),
    ]);

    let mut session = session(&layout, &transport, &clock);
    let report = session.play(&score).await.unwrap();

    assert_eq!(report.transmissions, 4);
    assert_eq!(report.write_failures, 4);
    assert_eq!(report.events, 4);
    assert!(!session.channel_state(0) && !session.channel_state(1));
}

#[tokio::test]
async fn test_closed_session_cannot_replay() {
    let layout = layout(&[(21, 0)], 1);
    let clock = SimulatedClock::new();
    let transport = MemoryTransport::new();
    let mut session = session(&layout, &transport, &clock);

    session.play(&Score::default()).await.unwrap();
    assert!(matches!(
        session.play(&Score::default()).await,
        Err(SessionError::Closed)
    ));
}

#[test]
fn test_closed_transport_fails_before_playing() {
    let layout = layout(&[(21, 0)], 1);
    let result = PlaybackSession::new(
        &layout,
        config(),
        TransportHandle::owned(MemoryTransport::closed()),
        SimulatedClock::new(),
        Arc::new(Logger::silent()),
    );
    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::NotOpen(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_wall_clock_pacing() {
    let layout = layout(&[(21, 0)], 1);
    let transport = MemoryTransport::new();
    let score = Score::from_absolute([(ms(0), 21, 100), (ms(500), 21, 0)]);
    let start = tokio::time::Instant::now();

    let mut session = PlaybackSession::new(
        &layout,
        SessionConfig::default(),
        TransportHandle::owned(transport.clone()),
        TokioClock,
        Arc::new(Logger::silent()),
    )
    .unwrap();
    session.play(&score).await.unwrap();

    // 500 ms gap plus 10 ms after each of the two commands.
    assert!(start.elapsed() >= ms(520));
    assert_eq!(transport.lines(), vec!["ON 0", "OFF 0"]);
}

use super::*;
use crate::engine::clock::SimulatedClock;

fn driver_for(transport: &MemoryTransport, channels: u16) -> ChannelDriver<'static> {
    ChannelDriver::new(
        TransportHandle::owned(transport.clone()),
        channels,
        Duration::from_millis(10),
        Arc::new(Logger::silent()),
    )
    .unwrap()
}

#[test]
fn test_command_wire_format() {
    assert_eq!(Command::On(0).to_line(), "ON 0\n");
    assert_eq!(Command::Off(141).to_line(), "OFF 141\n");
    assert_eq!("ON 12".parse::<Command>(), Ok(Command::On(12)));
    assert_eq!("OFF 3\n".parse::<Command>(), Ok(Command::Off(3)));
    assert!("BLINK 3".parse::<Command>().is_err());
    assert!("ON".parse::<Command>().is_err());
    assert!("ON x".parse::<Command>().is_err());
}

#[tokio::test]
async fn test_send_writes_line_and_waits_delay() {
    let transport = MemoryTransport::new();
    let clock = SimulatedClock::new();
    let mut driver = driver_for(&transport, 4);

    driver.send(&clock, 2, true, Duration::ZERO).await;

    assert_eq!(transport.lines(), vec!["ON 2"]);
    assert!(driver.state(2));
    assert_eq!(clock.elapsed(), Duration::from_millis(10));
    driver.release().unwrap();
}

#[tokio::test]
async fn test_write_failure_still_tracks_state() {
    let transport = MemoryTransport::new();
    transport.fail_writes(true);
    let clock = SimulatedClock::new();
    let mut driver = driver_for(&transport, 4);

    driver.send(&clock, 1, true, Duration::ZERO).await;

    assert!(driver.state(1));
    assert_eq!(driver.sent(), 1);
    assert_eq!(driver.failed(), 1);
    assert!(transport.lines().is_empty());
    driver.release().unwrap();
}

#[tokio::test]
async fn test_unknown_channel_is_ignored() {
    let transport = MemoryTransport::new();
    let clock = SimulatedClock::new();
    let mut driver = driver_for(&transport, 4);

    driver.send(&clock, 9, true, Duration::ZERO).await;

    assert!(transport.lines().is_empty());
    assert_eq!(driver.sent(), 0);
    driver.release().unwrap();
}

#[tokio::test]
async fn test_force_off_only_touches_lit_channels() {
    let transport = MemoryTransport::new();
    let clock = SimulatedClock::new();
    let mut driver = driver_for(&transport, 4);

    driver.send(&clock, 0, true, Duration::ZERO).await;
    driver.send(&clock, 3, true, Duration::ZERO).await;
    let forced = driver.force_off(&clock, Duration::ZERO).await;

    assert_eq!(forced, 2);
    assert_eq!(transport.lines(), vec!["ON 0", "ON 3", "OFF 0", "OFF 3"]);
    assert_eq!(driver.lit_channels().count(), 0);
    driver.release().unwrap();
}

#[test]
fn test_closed_transport_is_rejected() {
    let transport = MemoryTransport::closed();
    let result = ChannelDriver::new(
        TransportHandle::owned(transport),
        4,
        Duration::ZERO,
        Arc::new(Logger::silent()),
    );
    assert!(matches!(result, Err(TransportError::NotOpen(_))));
}

#[test]
fn test_release_closes_owned_transport_once() {
    let transport = MemoryTransport::new();
    let mut driver = driver_for(&transport, 2);

    driver.release().unwrap();
    driver.release().unwrap();
    drop(driver);

    assert!(!transport.is_open());
    assert_eq!(transport.close_calls(), 1);
}

#[test]
fn test_release_leaves_borrowed_transport_open() {
    let mut transport = MemoryTransport::new();
    {
        let mut driver = ChannelDriver::new(
            TransportHandle::borrowed(&mut transport),
            2,
            Duration::ZERO,
            Arc::new(Logger::silent()),
        )
        .unwrap();
        driver.release().unwrap();
    }
    assert!(transport.is_open());
    assert_eq!(transport.close_calls(), 0);
}

#[tokio::test]
async fn test_drop_without_release_switches_everything_off() {
    let transport = MemoryTransport::new();
    let clock = SimulatedClock::new();
    {
        let mut driver = driver_for(&transport, 4);
        driver.send(&clock, 1, true, Duration::ZERO).await;
        driver.send(&clock, 2, true, Duration::ZERO).await;
    }

    assert_eq!(transport.lines(), vec!["ON 1", "ON 2", "OFF 1", "OFF 2"]);
    assert!(!transport.is_open());
}

use super::*;
use std::io::Write;

fn pitch_file(entries: &[(Pitch, ChannelIndex)]) -> LayoutFile {
    LayoutFile {
        version: LAYOUT_VERSION,
        name: None,
        led_base: 0,
        entries: entries
            .iter()
            .map(|&(pitch, channel)| LayoutEntry::Pitch { pitch, channel })
            .collect(),
    }
}

#[test]
fn test_piano_key_conversion() {
    assert_eq!(midi_to_piano_key(21), Some(1));
    assert_eq!(midi_to_piano_key(60), Some(40));
    assert_eq!(midi_to_piano_key(108), Some(88));
    assert_eq!(midi_to_piano_key(20), None);
    assert_eq!(midi_to_piano_key(109), None);

    assert_eq!(piano_key_to_midi(1), Some(21));
    assert_eq!(piano_key_to_midi(88), Some(108));
    assert_eq!(piano_key_to_midi(0), None);
    assert_eq!(piano_key_to_midi(89), None);
}

#[test]
fn test_builtin_layout_matches_strip() {
    let layout = KeyLayout::builtin(PitchRange::PIANO, 142).unwrap();

    // Key 1 (A0) sits on LED number 2, the first LED of the strip.
    assert_eq!(layout.channel_for(21), Some(0));
    // Key 9 on LED 17.
    assert_eq!(layout.channel_for(29), Some(15));
    // Key 73 on LED 142.
    assert_eq!(layout.channel_for(93), Some(140));
    // Keys 74..=88 have no LED.
    assert_eq!(layout.channel_for(94), None);
    assert_eq!(layout.channel_for(108), None);
    assert_eq!(layout.mapped_pitch_count(), 73);
    assert!(layout.dropped().is_empty());
    assert_eq!(layout.pitches_for(0), &[21]);
    assert!(layout.pitches_for(1).is_empty());
}

#[test]
fn test_builtin_layout_is_monotonic() {
    let layout = KeyLayout::builtin(PitchRange::PIANO, 142).unwrap();
    let channels: Vec<ChannelIndex> = (21..=108).filter_map(|p| layout.channel_for(p)).collect();
    assert!(channels.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_shorter_strip_drops_tail_entries() {
    let layout = KeyLayout::builtin(PitchRange::PIANO, 100).unwrap();

    // Key 52 on LED 100 is the last one that fits.
    assert_eq!(layout.channel_for(72), Some(98));
    assert_eq!(layout.channel_for(73), None);
    assert!(!layout.dropped().is_empty());
    assert!(layout.dropped().iter().all(|&(_, channel)| channel >= 100));
}

#[test]
fn test_many_to_one_reverse_lookup() {
    let layout = KeyLayout::from_file(
        &pitch_file(&[(21, 0), (22, 0), (23, 1)]),
        PitchRange::PIANO,
        4,
    )
    .unwrap();

    assert_eq!(layout.channel_for(21), Some(0));
    assert_eq!(layout.channel_for(22), Some(0));
    assert_eq!(layout.pitches_for(0), &[21, 22]);
    assert_eq!(layout.pitches_for(1), &[23]);
    assert!(layout.pitches_for(3).is_empty());
    assert!(layout.pitches_for(200).is_empty());
    assert_eq!(layout.channel_for(127), None);
}

#[test]
fn test_rejects_decreasing_channels() {
    let err = KeyLayout::from_file(&pitch_file(&[(21, 5), (22, 3)]), PitchRange::PIANO, 8)
        .unwrap_err();
    assert!(matches!(
        err,
        LayoutError::NotMonotonic {
            pitch: 22,
            channel: 3,
            previous: 5
        }
    ));
}

#[test]
fn test_rejects_duplicate_and_out_of_range_pitches() {
    assert!(matches!(
        KeyLayout::from_file(&pitch_file(&[(21, 0), (21, 1)]), PitchRange::PIANO, 8),
        Err(LayoutError::DuplicatePitch(21))
    ));
    assert!(matches!(
        KeyLayout::from_file(&pitch_file(&[(12, 0)]), PitchRange::PIANO, 8),
        Err(LayoutError::PitchOutOfRange(12))
    ));
}

#[test]
fn test_rejects_unknown_version() {
    let mut file = pitch_file(&[(21, 0)]);
    file.version = 7;
    assert!(matches!(
        KeyLayout::from_file(&file, PitchRange::PIANO, 8),
        Err(LayoutError::UnsupportedVersion(7))
    ));
}

#[test]
fn test_key_entry_below_led_base_is_invalid() {
    let file = LayoutFile {
        version: LAYOUT_VERSION,
        name: None,
        led_base: 2,
        entries: vec![LayoutEntry::Key { key: 1, led: 1 }],
    };
    assert!(matches!(
        KeyLayout::from_file(&file, PitchRange::PIANO, 8),
        Err(LayoutError::InvalidKey { key: 1, .. })
    ));
}

#[test]
fn test_load_json_and_toml_layouts() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("strip.json");
    let mut json = std::fs::File::create(&json_path).unwrap();
    write!(
        json,
        r#"{{"version": 1, "name": "tiny", "entries": [{{"pitch": 60, "channel": 0}}, {{"pitch": 62, "channel": 1}}]}}"#
    )
    .unwrap();
    let layout = KeyLayout::load(&json_path, PitchRange::PIANO, 2).unwrap();
    assert_eq!(layout.name(), "tiny");
    assert_eq!(layout.channel_for(62), Some(1));

    let toml_path = dir.path().join("strip.toml");
    std::fs::write(
        &toml_path,
        "version = 1\nled_base = 2\n\n[[entries]]\nkey = 1\nled = 2\n\n[[entries]]\nkey = 2\nled = 4\n",
    )
    .unwrap();
    let layout = KeyLayout::load(&toml_path, PitchRange::PIANO, 4).unwrap();
    assert_eq!(layout.channel_for(21), Some(0));
    assert_eq!(layout.channel_for(22), Some(2));
    assert_eq!(layout.name(), "custom");
}

#[test]
fn test_malformed_layout_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        KeyLayout::load(&path, PitchRange::PIANO, 8),
        Err(LayoutError::Format { .. })
    ));
}

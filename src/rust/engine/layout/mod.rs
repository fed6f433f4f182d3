//! Pitch-to-LED layout
//!
//! A layout is versioned configuration data describing which LED sits under
//! which key. It is validated once when built and read-only afterwards.

pub mod builtin;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{ChannelIndex, Pitch};

pub use builtin::builtin_layout_file;

pub const LAYOUT_VERSION: u32 = 1;

/// Inclusive pitch bounds of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRange {
    pub min: Pitch,
    pub max: Pitch,
}

impl PitchRange {
    /// A0 (21) to C8 (108).
    pub const PIANO: PitchRange = PitchRange { min: 21, max: 108 };

    pub fn new(min: Pitch, max: Pitch) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.min <= pitch && pitch <= self.max
    }

    /// Key number counted from 1 at the lowest pitch.
    pub fn key_of(&self, pitch: Pitch) -> Option<u8> {
        self.contains(pitch)
            .then(|| pitch - self.min)
            .and_then(|offset| offset.checked_add(1))
    }

    pub fn pitch_of_key(&self, key: u8) -> Option<Pitch> {
        let pitch = (self.min as u16 + key as u16).checked_sub(1)?;
        if key == 0 || pitch > self.max as u16 {
            return None;
        }
        Some(pitch as Pitch)
    }
}

impl Default for PitchRange {
    fn default() -> Self {
        Self::PIANO
    }
}

/// MIDI note to 88-key piano number (A0 = 1, C8 = 88).
pub fn midi_to_piano_key(pitch: Pitch) -> Option<u8> {
    PitchRange::PIANO.key_of(pitch)
}

/// 88-key piano number to MIDI note.
pub fn piano_key_to_midi(key: u8) -> Option<Pitch> {
    PitchRange::PIANO.pitch_of_key(key)
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read layout {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid layout {path}: {reason}")]
    Format { path: PathBuf, reason: String },
    #[error("unsupported layout version {0} (expected {LAYOUT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("pitch {0} is outside the instrument range")]
    PitchOutOfRange(Pitch),
    #[error("key {key} cannot be placed on LED {led} with base {led_base}")]
    InvalidKey { key: u8, led: u16, led_base: u16 },
    #[error("pitch {0} is mapped more than once")]
    DuplicatePitch(Pitch),
    #[error("pitch {pitch} maps to channel {channel}, below channel {previous} of a lower pitch")]
    NotMonotonic {
        pitch: Pitch,
        channel: ChannelIndex,
        previous: ChannelIndex,
    },
}

/// On-disk layout description (JSON or TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutFile {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Number printed on the first LED of the strip, used by `key`/`led` entries.
    #[serde(default)]
    pub led_base: u16,
    pub entries: Vec<LayoutEntry>,
}

/// A layout entry, either by MIDI pitch and channel index or by piano key
/// number and printed LED number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutEntry {
    Pitch { pitch: Pitch, channel: ChannelIndex },
    Key { key: u8, led: u16 },
}

impl LayoutFile {
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let raw = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        let parsed = if is_toml {
            toml::from_str(&raw).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| LayoutError::Format {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Validated pitch-to-channel lookup with its reverse index.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    name: String,
    range: PitchRange,
    forward: [Option<ChannelIndex>; 128],
    reverse: Vec<Vec<Pitch>>,
    dropped: Vec<(Pitch, ChannelIndex)>,
}

impl KeyLayout {
    /// Layout of the bundled 142-LED piano strip.
    pub fn builtin(range: PitchRange, channel_count: u16) -> Result<Self, LayoutError> {
        Self::from_file(&builtin_layout_file(), range, channel_count)
    }

    pub fn load(path: &Path, range: PitchRange, channel_count: u16) -> Result<Self, LayoutError> {
        let file = LayoutFile::load(path)?;
        Self::from_file(&file, range, channel_count)
    }

    pub fn from_file(
        file: &LayoutFile,
        range: PitchRange,
        channel_count: u16,
    ) -> Result<Self, LayoutError> {
        if file.version != LAYOUT_VERSION {
            return Err(LayoutError::UnsupportedVersion(file.version));
        }

        let mut pairs = Vec::with_capacity(file.entries.len());
        let mut seen = HashSet::new();
        for entry in &file.entries {
            let (pitch, channel) = resolve_entry(*entry, range, file.led_base)?;
            if !range.contains(pitch) || pitch > 127 {
                return Err(LayoutError::PitchOutOfRange(pitch));
            }
            if !seen.insert(pitch) {
                return Err(LayoutError::DuplicatePitch(pitch));
            }
            pairs.push((pitch, channel));
        }
        pairs.sort_by_key(|(pitch, _)| *pitch);

        for window in pairs.windows(2) {
            let (_, previous) = window[0];
            let (pitch, channel) = window[1];
            if channel < previous {
                return Err(LayoutError::NotMonotonic {
                    pitch,
                    channel,
                    previous,
                });
            }
        }

        let mut forward = [None; 128];
        let mut reverse = vec![Vec::new(); channel_count as usize];
        let mut dropped = Vec::new();
        for (pitch, channel) in pairs {
            if channel >= channel_count {
                dropped.push((pitch, channel));
                continue;
            }
            forward[pitch as usize] = Some(channel);
            reverse[channel as usize].push(pitch);
        }

        Ok(Self {
            name: file.name.clone().unwrap_or_else(|| "custom".to_string()),
            range,
            forward,
            reverse,
            dropped,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }

    pub fn channel_count(&self) -> u16 {
        self.reverse.len() as u16
    }

    pub fn channel_for(&self, pitch: Pitch) -> Option<ChannelIndex> {
        self.forward.get(pitch as usize).copied().flatten()
    }

    pub fn pitches_for(&self, channel: ChannelIndex) -> &[Pitch] {
        self.reverse
            .get(channel as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of pitches that reach an LED.
    pub fn mapped_pitch_count(&self) -> usize {
        self.forward.iter().filter(|c| c.is_some()).count()
    }

    /// Entries that pointed past the end of the strip.
    pub fn dropped(&self) -> &[(Pitch, ChannelIndex)] {
        &self.dropped
    }
}

fn resolve_entry(
    entry: LayoutEntry,
    range: PitchRange,
    led_base: u16,
) -> Result<(Pitch, ChannelIndex), LayoutError> {
    match entry {
        LayoutEntry::Pitch { pitch, channel } => Ok((pitch, channel)),
        LayoutEntry::Key { key, led } => {
            let invalid = || LayoutError::InvalidKey { key, led, led_base };
            let pitch = range.pitch_of_key(key).ok_or_else(invalid)?;
            let channel = led.checked_sub(led_base).ok_or_else(invalid)?;
            Ok((pitch, channel))
        }
    }
}

#[cfg(test)]
#[path = "test_layout.rs"]
mod tests;

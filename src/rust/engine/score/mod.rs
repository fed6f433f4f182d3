//! Score loading - decodes a Standard MIDI File into a flat note timeline

use std::path::{Path, PathBuf};
use std::time::Duration;

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use thiserror::Error;

use crate::engine::Pitch;

/// Tempo assumed until the first tempo meta event (120 BPM).
pub const DEFAULT_TEMPO_US_PER_QUARTER: u32 = 500_000;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("failed to read score {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid MIDI data: {0}")]
    Parse(#[from] midly::Error),
    #[error("sequential (format 2) MIDI files cannot be merged into one timeline")]
    UnsupportedFormat,
}

/// One note event of the timeline. `delta` is the time elapsed since the
/// previous event (or since the start of the score for the first one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEvent {
    NoteOn {
        pitch: Pitch,
        velocity: u8,
        delta: Duration,
    },
    NoteOff {
        pitch: Pitch,
        delta: Duration,
    },
}

impl ScoreEvent {
    pub fn pitch(&self) -> Pitch {
        match self {
            ScoreEvent::NoteOn { pitch, .. } | ScoreEvent::NoteOff { pitch, .. } => *pitch,
        }
    }

    pub fn delta(&self) -> Duration {
        match self {
            ScoreEvent::NoteOn { delta, .. } | ScoreEvent::NoteOff { delta, .. } => *delta,
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self, ScoreEvent::NoteOn { .. })
    }
}

/// An ordered note timeline, decoded once and replayed as-is.
#[derive(Debug, Clone, Default)]
pub struct Score {
    pub source: Option<PathBuf>,
    pub events: Vec<ScoreEvent>,
    /// Time between the last note event and the end of the file.
    pub tail: Duration,
    pub track_count: usize,
}

impl Score {
    pub fn from_events(events: Vec<ScoreEvent>) -> Self {
        Self {
            source: None,
            events,
            tail: Duration::ZERO,
            track_count: 1,
        }
    }

    /// Build a score from absolute onset times. Entries must be sorted by time;
    /// a velocity of zero produces a note-off.
    pub fn from_absolute<I>(notes: I) -> Self
    where
        I: IntoIterator<Item = (Duration, Pitch, u8)>,
    {
        let mut previous = Duration::ZERO;
        let mut events = Vec::new();
        for (at, pitch, velocity) in notes {
            let delta = at.saturating_sub(previous);
            previous = previous.max(at);
            events.push(note_event(pitch, velocity, delta));
        }
        Self::from_events(events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_note_on()).count()
    }

    /// Total length of the score including the trailing gap.
    pub fn length(&self) -> Duration {
        self.events.iter().map(ScoreEvent::delta).sum::<Duration>() + self.tail
    }
}

fn note_event(pitch: Pitch, velocity: u8, delta: Duration) -> ScoreEvent {
    if velocity > 0 {
        ScoreEvent::NoteOn {
            pitch,
            velocity,
            delta,
        }
    } else {
        ScoreEvent::NoteOff { pitch, delta }
    }
}

/// Load a MIDI file from disk.
pub fn load_midi_file(path: &Path) -> Result<Score, ScoreError> {
    let bytes = std::fs::read(path).map_err(|source| ScoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut score = parse_midi_bytes(&bytes)?;
    score.source = Some(path.to_path_buf());
    Ok(score)
}

enum Stamped {
    Note { pitch: Pitch, velocity: u8 },
    Tempo(u32),
    Other,
}

/// Decode SMF bytes into a score. Tracks are merged by absolute tick; events
/// sharing a tick keep track order, then file order.
pub fn parse_midi_bytes(bytes: &[u8]) -> Result<Score, ScoreError> {
    let smf = Smf::parse(bytes)?;
    if smf.header.format == Format::Sequential {
        return Err(ScoreError::UnsupportedFormat);
    }

    let mut merged: Vec<(u64, Stamped)> = Vec::new();
    for track in &smf.tracks {
        let mut ticks: u64 = 0;
        for event in track {
            ticks += u64::from(event.delta.as_int());
            let stamped = match event.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } => Stamped::Note {
                        pitch: key.as_int(),
                        velocity: vel.as_int(),
                    },
                    MidiMessage::NoteOff { key, .. } => Stamped::Note {
                        pitch: key.as_int(),
                        velocity: 0,
                    },
                    _ => Stamped::Other,
                },
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Stamped::Tempo(tempo.as_int()),
                _ => Stamped::Other,
            };
            merged.push((ticks, stamped));
        }
    }
    // Stable: ties stay in track order.
    merged.sort_by_key(|(tick, _)| *tick);

    let timing = smf.header.timing;
    let mut tempo = DEFAULT_TEMPO_US_PER_QUARTER;
    let mut last_tick: u64 = 0;
    let mut pending = Duration::ZERO;
    let mut events = Vec::new();

    for (tick, stamped) in merged {
        pending += ticks_to_duration(tick - last_tick, timing, tempo);
        last_tick = tick;
        match stamped {
            Stamped::Note { pitch, velocity } => {
                events.push(note_event(pitch, velocity, pending));
                pending = Duration::ZERO;
            }
            Stamped::Tempo(t) => tempo = t,
            Stamped::Other => {}
        }
    }

    Ok(Score {
        source: None,
        events,
        tail: pending,
        track_count: smf.tracks.len(),
    })
}

fn ticks_to_duration(ticks: u64, timing: Timing, tempo_us_per_quarter: u32) -> Duration {
    if ticks == 0 {
        return Duration::ZERO;
    }
    match timing {
        Timing::Metrical(tpb) => {
            let tpb = u128::from(tpb.as_int().max(1));
            let nanos = u128::from(ticks) * u128::from(tempo_us_per_quarter) * 1_000 / tpb;
            Duration::from_nanos(nanos.min(u128::from(u64::MAX)) as u64)
        }
        Timing::Timecode(fps, subframe) => {
            let ticks_per_second = f64::from(fps.as_f32()) * f64::from(subframe.max(1));
            Duration::from_secs_f64(ticks as f64 / ticks_per_second)
        }
    }
}

#[cfg(test)]
#[path = "test_score.rs"]
mod tests;

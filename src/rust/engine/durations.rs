//! Duration resolution - a pre-pass pairing note-ons with note-offs

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::engine::Pitch;
use crate::engine::layout::PitchRange;
use crate::engine::score::{Score, ScoreEvent};

/// Last resolved sounding duration per pitch.
///
/// A repeated note-on before the matching note-off replaces the pending start,
/// so overlapping retriggers of one pitch resolve to the most recently opened
/// note only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationTable {
    durations: BTreeMap<Pitch, Duration>,
    unclosed: BTreeSet<Pitch>,
}

impl DurationTable {
    pub fn get(&self, pitch: Pitch) -> Option<Duration> {
        self.durations.get(&pitch).copied()
    }

    /// Duration for `pitch`, or `fallback` when the pitch never closed.
    pub fn duration_or(&self, pitch: Pitch, fallback: Duration) -> Duration {
        self.get(pitch).unwrap_or(fallback)
    }

    pub fn insert(&mut self, pitch: Pitch, duration: Duration) {
        self.durations.insert(pitch, duration);
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pitch, Duration)> + '_ {
        self.durations.iter().map(|(p, d)| (*p, *d))
    }

    pub fn longest(&self) -> Option<Duration> {
        self.durations.values().copied().max()
    }

    /// Pitches whose last note-on was still open at the end of the score.
    pub fn unclosed(&self) -> impl Iterator<Item = Pitch> + '_ {
        self.unclosed.iter().copied()
    }
}

/// Walk the whole timeline once, without pacing, and build the duration table.
pub fn resolve_durations(score: &Score, range: PitchRange) -> DurationTable {
    let mut starts: BTreeMap<Pitch, Duration> = BTreeMap::new();
    let mut table = DurationTable::default();
    let mut now = Duration::ZERO;

    for event in &score.events {
        now += event.delta();
        let pitch = event.pitch();
        if !range.contains(pitch) {
            continue;
        }
        match event {
            ScoreEvent::NoteOn { .. } => {
                starts.insert(pitch, now);
            }
            ScoreEvent::NoteOff { .. } => {
                // Orphaned note-offs have no start and are skipped.
                if let Some(start) = starts.remove(&pitch) {
                    table.durations.insert(pitch, now - start);
                }
            }
        }
    }

    table.unclosed = starts.into_keys().collect();
    table
}

#[cfg(test)]
#[path = "test_durations.rs"]
mod tests;

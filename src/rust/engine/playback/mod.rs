//! Real-time scheduler - replays a score and keeps LED states edge-triggered

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::engine::clock::Clock;
use crate::engine::driver::{ChannelDriver, TransportError, TransportHandle};
use crate::engine::durations::{DurationTable, resolve_durations};
use crate::engine::layout::{KeyLayout, PitchRange};
use crate::engine::score::{Score, ScoreEvent};
use crate::engine::{ChannelIndex, Pitch};
use crate::tools::logger::Logger;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("playback session already closed")]
    Closed,
}

/// Timing knobs of a playback session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub pitch_range: PitchRange,
    /// Used for notes whose note-on is never closed in the score.
    pub default_duration: Duration,
    pub drain_tick: Duration,
    /// Pause after each command so the controller's input buffer keeps up.
    pub command_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pitch_range: PitchRange::PIANO,
            default_duration: Duration::from_millis(100),
            drain_tick: Duration::from_millis(50),
            command_delay: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
    Draining,
    Closed,
}

/// One sounding occurrence of a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveInterval {
    pub start: Duration,
    pub duration: Duration,
}

impl ActiveInterval {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }

    pub fn is_live(&self, now: Duration) -> bool {
        now < self.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    pub events: usize,
    pub notes: usize,
    /// Commands written during playback and drain.
    pub transmissions: usize,
    /// Commands written by the final switch-off.
    pub forced_off: usize,
    pub write_failures: usize,
    /// Session time at which teardown ran.
    pub ended_at: Duration,
    pub cancelled: bool,
}

type NoteObserver<'a> = Box<dyn FnMut(Pitch) + Send + 'a>;

/// A single playback of one score onto one LED strip.
///
/// Session time is logical: the sum of the event gaps and drain ticks that
/// have been waited. Channel states are recomputed at event instants and
/// drain ticks and transmitted only when they change.
pub struct PlaybackSession<'a> {
    layout: &'a KeyLayout,
    config: SessionConfig,
    clock: Box<dyn Clock + 'a>,
    driver: ChannelDriver<'a>,
    active: Vec<Vec<ActiveInterval>>,
    observer: Option<NoteObserver<'a>>,
    logger: Arc<Logger>,
    state: SessionState,
    now: Duration,
    report: SessionReport,
}

impl<'a> PlaybackSession<'a> {
    pub fn new(
        layout: &'a KeyLayout,
        config: SessionConfig,
        transport: TransportHandle<'a>,
        clock: impl Clock + 'a,
        logger: Arc<Logger>,
    ) -> Result<Self, SessionError> {
        let driver = ChannelDriver::new(
            transport,
            layout.channel_count(),
            config.command_delay,
            Arc::clone(&logger),
        )?;
        Ok(Self {
            layout,
            config,
            clock: Box::new(clock),
            driver,
            active: vec![Vec::new(); 256],
            observer: None,
            logger,
            state: SessionState::Idle,
            now: Duration::ZERO,
            report: SessionReport::default(),
        })
    }

    /// Called once per note-on with the pitch, before its LED is updated.
    pub fn with_observer(mut self, observer: impl FnMut(Pitch) + Send + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Last transmitted state of `channel`.
    pub fn channel_state(&self, channel: ChannelIndex) -> bool {
        self.driver.state(channel)
    }

    pub fn active_intervals(&self, pitch: Pitch) -> &[ActiveInterval] {
        self.active
            .get(pitch as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether any pitch of `channel` has a live interval at the current time.
    pub fn channel_desired(&self, channel: ChannelIndex) -> bool {
        self.layout
            .pitches_for(channel)
            .iter()
            .any(|&p| self.active[p as usize].iter().any(|i| i.is_live(self.now)))
    }

    /// True when every transmitted state matches the desired state.
    pub fn is_consistent(&self) -> bool {
        (0..self.layout.channel_count()).all(|c| self.channel_desired(c) == self.driver.state(c))
    }

    /// Play the whole score, drain and close.
    pub async fn play(&mut self, score: &Score) -> Result<SessionReport, SessionError> {
        self.play_until(score, std::future::pending::<()>()).await
    }

    /// Play until the score ends or `stop` completes. Teardown runs either way.
    pub async fn play_until<F>(
        &mut self,
        score: &Score,
        stop: F,
    ) -> Result<SessionReport, SessionError>
    where
        F: Future<Output = ()>,
    {
        self.start()?;

        self.logger.info("Scanning score for note durations...");
        let durations = resolve_durations(score, self.config.pitch_range);
        self.logger.debug(format!(
            "Resolved {} durations ({} unclosed)",
            durations.len(),
            durations.unclosed().count()
        ));

        let cancelled = {
            let run = self.run(score, &durations);
            tokio::pin!(stop);
            tokio::select! {
                biased;
                _ = &mut stop => true,
                _ = run => false,
            }
        };
        if cancelled {
            self.logger.warn("Playback interrupted, switching LEDs off");
        }
        self.report.cancelled = cancelled;
        Ok(self.close().await)
    }

    /// Idle → Playing.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Playing;
                Ok(())
            }
            SessionState::Closed => Err(SessionError::Closed),
            _ => Ok(()),
        }
    }

    async fn run(&mut self, score: &Score, durations: &DurationTable) {
        self.logger.action("Playing score and driving LEDs...");
        for event in &score.events {
            self.step(event, durations).await;
        }
        self.advance(score.tail).await;
        self.drain().await;
    }

    /// Wait for the event's gap, then apply it.
    pub async fn step(&mut self, event: &ScoreEvent, durations: &DurationTable) {
        self.advance(event.delta()).await;
        self.apply(event, durations).await;
    }

    async fn advance(&mut self, delta: Duration) {
        self.clock.sleep(delta).await;
        self.now += delta;
    }

    async fn apply(&mut self, event: &ScoreEvent, durations: &DurationTable) {
        self.report.events += 1;
        let pitch = event.pitch();
        if !self.config.pitch_range.contains(pitch) {
            return;
        }
        let slot = pitch as usize;

        match event {
            ScoreEvent::NoteOn { .. } => {
                let duration = durations.duration_or(pitch, self.config.default_duration);
                self.active[slot].push(ActiveInterval {
                    start: self.now,
                    duration,
                });
                self.report.notes += 1;
                self.logger.debug(format!(
                    "Active: pitch {}, LED {:?}, start {:.3}s, duration {:.3}s",
                    pitch,
                    self.layout.channel_for(pitch),
                    self.now.as_secs_f64(),
                    duration.as_secs_f64()
                ));
                if let Some(observer) = self.observer.as_mut() {
                    observer(pitch);
                }
            }
            ScoreEvent::NoteOff { .. } => {
                // Expiry is time based; a note-off never cuts a live interval short.
                let now = self.now;
                self.active[slot].retain(|i| i.is_live(now));
            }
        }

        if let Some(channel) = self.layout.channel_for(pitch) {
            self.refresh(channel).await;
        }
        // Channels lit by intervals that expired since the last event.
        let lit: Vec<ChannelIndex> = self.driver.lit_channels().collect();
        for channel in lit {
            self.refresh(channel).await;
        }
    }

    /// Recompute one channel and transmit on change.
    async fn refresh(&mut self, channel: ChannelIndex) {
        let now = self.now;
        let layout = self.layout;
        let mut desired = false;
        for &pitch in layout.pitches_for(channel) {
            let intervals = &mut self.active[pitch as usize];
            intervals.retain(|i| i.is_live(now));
            desired |= !intervals.is_empty();
        }
        if desired != self.driver.state(channel) {
            self.driver.send(&*self.clock, channel, desired, now).await;
            self.report.transmissions += 1;
        }
    }

    /// Playing → Draining: tick until the last live interval has ended,
    /// recomputing every channel on each tick.
    async fn drain(&mut self) {
        self.state = SessionState::Draining;
        let deadline = self
            .active
            .iter()
            .flatten()
            .map(ActiveInterval::end)
            .max()
            .unwrap_or(self.now);
        if deadline > self.now {
            self.logger.info(format!(
                "Waiting for remaining notes, {:.3}s left",
                (deadline - self.now).as_secs_f64()
            ));
        }

        let tick = self.config.drain_tick.max(Duration::from_millis(1));
        loop {
            for channel in 0..self.layout.channel_count() {
                self.refresh(channel).await;
            }
            if self.now >= deadline {
                break;
            }
            self.advance(tick).await;
        }
    }

    /// → Closed: switch off every lit channel and release an owned transport.
    /// Runs at most once.
    async fn close(&mut self) -> SessionReport {
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            self.logger.info("Turning off all LEDs...");
            self.report.forced_off = self.driver.force_off(&*self.clock, self.now).await;
            if let Err(err) = self.driver.release() {
                self.logger.warn(err.to_string());
            }
            self.report.write_failures = self.driver.failed();
            self.report.ended_at = self.now;
            for intervals in &mut self.active {
                intervals.clear();
            }
        }
        self.report.clone()
    }
}

#[cfg(test)]
#[path = "test_playback.rs"]
mod tests;

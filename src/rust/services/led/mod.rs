use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::engine::clock::{Clock, TokioClock};
use crate::engine::driver::{LogTransport, Transport, TransportHandle};
use crate::engine::layout::{KeyLayout, PitchRange};
use crate::engine::playback::{PlaybackSession, SessionConfig, SessionReport};
use crate::engine::score::{Score, load_midi_file};
use crate::tools::logger::Logger;
use crate::tools::logger::structured_error::StructuredError;

/// Where LED commands go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Serial { port: String, baud_rate: u32 },
    DryRun,
}

#[derive(Debug, Clone)]
pub struct LedPlayRequest {
    pub score_path: PathBuf,
    pub layout_path: Option<PathBuf>,
    pub channel_count: u16,
    pub output: OutputTarget,
    pub settle: Duration,
    pub session: SessionConfig,
}

/// Loads a score and a layout, acquires the output and runs one playback
/// session, stopping cleanly on Ctrl-C.
pub struct LedPlayService {
    logger: Arc<Logger>,
}

impl LedPlayService {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub async fn run(&self, request: LedPlayRequest) -> Result<SessionReport> {
        let started = Instant::now();
        let score = self.load_score(&request.score_path)?;
        let layout = self.load_layout(
            request.layout_path.as_deref(),
            request.session.pitch_range,
            request.channel_count,
        )?;

        let transport = self.acquire(&request.output, request.settle).await?;
        let report = self
            .play_with(
                &score,
                &layout,
                request.session,
                TransportHandle::Owned(transport),
                TokioClock,
                ctrl_c(),
            )
            .await?;

        self.summarize(&report, started.elapsed());
        Ok(report)
    }

    pub fn load_score(&self, path: &std::path::Path) -> Result<Score> {
        let score = match load_midi_file(path) {
            Ok(score) => score,
            Err(err) => {
                self.logger.log_structured_error(
                    &StructuredError::from_error(&err)
                        .with_file(path.display().to_string())
                        .with_type("ScoreError")
                        .with_suggestion("expected a Standard MIDI File, format 0 or 1"),
                );
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to load MIDI file {}", path.display())));
            }
        };
        self.logger.info(format!(
            "Loaded {} ({} tracks, {} note events, {})",
            path.display(),
            score.track_count,
            score.len(),
            format_duration(score.length())
        ));
        Ok(score)
    }

    pub fn load_layout(
        &self,
        path: Option<&std::path::Path>,
        range: PitchRange,
        channel_count: u16,
    ) -> Result<KeyLayout> {
        let layout = match path {
            Some(path) => match KeyLayout::load(path, range, channel_count) {
                Ok(layout) => layout,
                Err(err) => {
                    self.logger.log_structured_error(
                        &StructuredError::from_error(&err)
                            .with_file(path.display().to_string())
                            .with_type("LayoutError"),
                    );
                    return Err(anyhow::Error::new(err)
                        .context(format!("failed to load layout {}", path.display())));
                }
            },
            None => KeyLayout::builtin(range, channel_count)
                .context("built-in layout does not fit the configured pitch range")?,
        };
        for (pitch, channel) in layout.dropped() {
            self.logger.warn(format!(
                "Pitch {} points at LED {} beyond the {}-LED strip; it stays dark",
                pitch, channel, channel_count
            ));
        }
        self.logger.info(format!(
            "Layout '{}': {} pitches on {} LEDs",
            layout.name(),
            layout.mapped_pitch_count(),
            layout.channel_count()
        ));
        Ok(layout)
    }

    async fn acquire(&self, output: &OutputTarget, settle: Duration) -> Result<Box<dyn Transport>> {
        match output {
            OutputTarget::DryRun => {
                self.logger
                    .watch("Dry run: commands are printed, no serial port is opened");
                Ok(Box::new(LogTransport::new(Arc::clone(&self.logger))))
            }
            OutputTarget::Serial { port, baud_rate } => {
                let transport = open_serial(&self.logger, port, *baud_rate)?;
                self.logger
                    .success(format!("Connected to {} at {} baud", port, baud_rate));
                if !settle.is_zero() {
                    self.logger.debug(format!(
                        "Waiting {} for the controller to reset",
                        format_duration(settle)
                    ));
                    tokio::time::sleep(settle).await;
                }
                Ok(transport)
            }
        }
    }

    /// Run one session on an already acquired transport.
    pub async fn play_with<'a, F>(
        &self,
        score: &Score,
        layout: &'a KeyLayout,
        config: SessionConfig,
        transport: TransportHandle<'a>,
        clock: impl Clock + 'a,
        stop: F,
    ) -> Result<SessionReport>
    where
        F: std::future::Future<Output = ()>,
    {
        let logger = Arc::clone(&self.logger);
        let note_logger = Arc::clone(&self.logger);
        let range = config.pitch_range;
        let mut session = PlaybackSession::new(layout, config, transport, clock, logger)
            .context("failed to start playback session")?
            .with_observer(move |pitch| {
                if let Some(key) = range.key_of(pitch) {
                    note_logger.debug(format!("Note on: MIDI {}, key {}", pitch, key));
                }
            });
        let report = session.play_until(score, stop).await?;
        Ok(report)
    }

    fn summarize(&self, report: &SessionReport, wall: Duration) {
        if report.cancelled {
            self.logger.warn(format!(
                "Stopped after {} of score time; all LEDs switched off",
                format_duration(report.ended_at)
            ));
        } else {
            self.logger.success(format!(
                "Played {} notes in {} ({} LED commands, {} at shutdown)",
                report.notes,
                format_duration(wall),
                report.transmissions,
                report.forced_off
            ));
        }
        if report.write_failures > 0 {
            self.logger.warn(format!(
                "{} commands could not be written to the controller",
                report.write_failures
            ));
        }
    }
}

#[cfg(feature = "cli")]
fn open_serial(logger: &Logger, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>> {
    use crate::engine::driver::serial::{SerialTransport, available_ports};

    match available_ports() {
        Ok(ports) if !ports.is_empty() && !ports.iter().any(|p| p.name == port) => {
            let names: Vec<&str> = ports.iter().map(|p| p.name.as_str()).collect();
            logger.warn(format!(
                "{} is not among the available ports: {}",
                port,
                names.join(", ")
            ));
        }
        Ok(_) => {}
        Err(err) => logger.debug(format!("Could not list serial ports: {}", err)),
    }
    let transport = SerialTransport::open(port, baud_rate)?;
    Ok(Box::new(transport))
}

#[cfg(not(feature = "cli"))]
fn open_serial(_logger: &Logger, port: &str, _baud_rate: u32) -> Result<Box<dyn Transport>> {
    Err(crate::engine::driver::TransportError::Open {
        port: port.to_string(),
        reason: "serial support requires the `cli` feature".to_string(),
    }
    .into())
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let ms = duration.as_secs_f64() * 1000.0;
        if ms >= 100.0 {
            format!("{:.0}ms", ms)
        } else {
            format!("{:.1}ms", ms)
        }
    }
}

#[cfg(test)]
#[path = "test_led.rs"]
mod tests;

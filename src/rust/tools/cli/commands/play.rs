#![cfg(feature = "cli")]

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::platform::config::AppConfig;
use crate::services::led::{LedPlayRequest, LedPlayService, OutputTarget};
use crate::tools::cli::state::CliContext;

#[derive(Debug, Clone, Args)]
pub struct PlayCommand {
    /// MIDI file to play
    pub file: PathBuf,

    /// Serial port of the LED controller (overrides config)
    #[arg(long, short = 'p')]
    pub port: Option<String>,

    /// Baud rate (overrides config)
    #[arg(long)]
    pub baud: Option<u32>,

    /// Print LED commands instead of opening the serial port
    #[arg(long = "dry-run", default_value_t = false)]
    pub dry_run: bool,

    /// Number of LEDs on the strip
    #[arg(long)]
    pub channels: Option<u16>,

    /// Layout file mapping pitches or piano keys to LEDs
    #[arg(long)]
    pub layout: Option<PathBuf>,

    /// Light duration for notes that are never released, in milliseconds
    #[arg(long = "default-duration-ms")]
    pub default_duration_ms: Option<u64>,

    /// Polling interval once the score has ended, in milliseconds
    #[arg(long = "drain-tick-ms")]
    pub drain_tick_ms: Option<u64>,

    /// Pause after each LED command, in milliseconds
    #[arg(long = "command-delay-ms")]
    pub command_delay_ms: Option<u64>,

    /// Wait after opening the port before playing, in milliseconds
    #[arg(long = "settle-ms")]
    pub settle_ms: Option<u64>,
}

impl PlayCommand {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(settle_ms) = self.settle_ms {
            config.serial.settle_ms = settle_ms;
        }
        if let Some(channels) = self.channels {
            config.device.channels = channels;
        }
        if let Some(ms) = self.default_duration_ms {
            config.timing.default_duration_ms = ms;
        }
        if let Some(ms) = self.drain_tick_ms {
            config.timing.drain_tick_ms = ms;
        }
        if let Some(ms) = self.command_delay_ms {
            config.timing.command_delay_ms = ms;
        }
    }
}

pub async fn execute(command: PlayCommand, ctx: &CliContext) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut config = AppConfig::load(&cwd)?;
    command.apply(&mut config);
    config.validate()?;

    let logger = ctx.logger_with(config.log.verbose);
    let layout_path = command
        .layout
        .clone()
        .or_else(|| config.layout_path(&cwd));
    let output = if command.dry_run {
        OutputTarget::DryRun
    } else {
        OutputTarget::Serial {
            port: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
        }
    };

    let request = LedPlayRequest {
        score_path: command.file,
        layout_path,
        channel_count: config.device.channels,
        output,
        settle: config.settle_delay(),
        session: config.session_config(),
    };

    LedPlayService::new(logger).run(request).await?;
    Ok(())
}

#![cfg(feature = "cli")]

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::engine::durations::resolve_durations;
use crate::platform::config::AppConfig;
use crate::services::led::{LedPlayService, format_duration};
use crate::tools::cli::state::CliContext;

#[derive(Args, Debug)]
pub struct InspectCommand {
    /// MIDI file to inspect
    pub file: PathBuf,

    /// Layout file used to show the LED of each pitch
    #[arg(long)]
    pub layout: Option<PathBuf>,
}

/// Convert MIDI key number to note name (C4, C#4, etc.)
fn midi_note_to_name(note: u8) -> String {
    let names = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = (note as i32 / 12) - 1;
    let name = names[(note % 12) as usize];
    format!("{}{}", name, octave)
}

pub fn execute(cmd: InspectCommand, ctx: &CliContext) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = AppConfig::load(&cwd)?;
    let logger = ctx.logger_with(config.log.verbose);
    let range = config.pitch_range();

    let service = LedPlayService::new(logger.clone());
    let score = service.load_score(&cmd.file)?;
    let layout_path = cmd.layout.clone().or_else(|| config.layout_path(&cwd));
    let layout = service.load_layout(layout_path.as_deref(), range, config.device.channels)?;
    let durations = resolve_durations(&score, range);

    logger.log_with_details(
        crate::tools::logger::LogLevel::Info,
        format!("{}", cmd.file.display()),
        [
            format!("tracks: {}", score.track_count),
            format!("note events: {} ({} note-ons)", score.len(), score.note_on_count()),
            format!("length: {}", format_duration(score.length())),
            format!("trailing silence: {}", format_duration(score.tail)),
            format!("pitches with a duration: {}", durations.len()),
        ],
    );

    for (pitch, duration) in durations.iter() {
        let key = range
            .key_of(pitch)
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        let led = layout
            .channel_for(pitch)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4} {:<4} key {:>3}  led {:>4}  {}",
            pitch,
            midi_note_to_name(pitch),
            key,
            led,
            format_duration(duration)
        );
    }

    let unclosed: Vec<String> = durations
        .unclosed()
        .map(|p| format!("{} ({})", p, midi_note_to_name(p)))
        .collect();
    if !unclosed.is_empty() {
        logger.warn(format!(
            "Never released, will use the {} default: {}",
            format_duration(config.session_config().default_duration),
            unclosed.join(", ")
        ));
    }
    Ok(())
}

#![cfg(feature = "cli")]

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::engine::layout::midi_to_piano_key;
use crate::engine::score::Score;
use crate::services::led::LedPlayService;
use crate::tools::cli::state::CliContext;

#[derive(Args, Debug)]
pub struct KeysCommand {
    /// MIDI file to read
    pub file: PathBuf,
}

/// Piano key numbers (1..=88) of each note-on, in playback order.
/// Notes outside the keyboard are skipped.
pub fn piano_keys(score: &Score) -> Vec<u8> {
    score
        .events
        .iter()
        .filter(|event| event.is_note_on())
        .filter_map(|event| midi_to_piano_key(event.pitch()))
        .collect()
}

pub fn execute(cmd: KeysCommand, ctx: &CliContext) -> Result<()> {
    let service = LedPlayService::new(ctx.logger());
    let score = service.load_score(&cmd.file)?;

    let keys: Vec<String> = piano_keys(&score).iter().map(u8::to_string).collect();
    println!("{}", keys.join(" "));
    Ok(())
}

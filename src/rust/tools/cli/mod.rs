// Parent `tools` module controls `cli` gating; avoid duplicating crate-level cfg here.
mod commands;
pub mod state;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::inspect::InspectCommand;
use commands::keys::KeysCommand;
use commands::play::PlayCommand;
use commands::ports::PortsCommand;
use state::CliContext;

#[derive(Parser, Debug)]
#[command(name = "keylight")]
#[command(
    version,
    about = "Keylight – light up a piano LED strip from a MIDI file."
)]
pub struct Cli {
    /// Print every LED command and note as it happens
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a MIDI file on the LED strip
    Play(PlayCommand),
    /// List serial ports the controller could be on
    Ports(PortsCommand),
    /// Show a MIDI file's notes and resolved durations without touching hardware
    Inspect(InspectCommand),
    /// Print the piano key number of every note-on in playback order
    Keys(KeysCommand),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = CliContext::new(cli.verbose);
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Play(command) => commands::play::execute(command, &ctx).await?,
            Commands::Ports(command) => commands::ports::execute(command, &ctx)?,
            Commands::Inspect(command) => commands::inspect::execute(command, &ctx)?,
            Commands::Keys(command) => commands::keys::execute(command, &ctx)?,
        }
        Ok(())
    })
}

#![cfg(feature = "cli")]

use anyhow::Result;
use clap::Args;

use crate::engine::driver::serial::available_ports;
use crate::tools::cli::state::CliContext;

#[derive(Args, Debug)]
pub struct PortsCommand {}

pub fn execute(_cmd: PortsCommand, ctx: &CliContext) -> Result<()> {
    let logger = ctx.logger();
    let ports = available_ports()?;

    if ports.is_empty() {
        logger.warn("No serial ports found. Is the controller plugged in?");
        return Ok(());
    }

    logger.info("Serial ports:");
    for (i, port) in ports.iter().enumerate() {
        logger.info(format!("  [{}] {} ({})", i, port.name, port.kind));
    }
    Ok(())
}

//! Channel driver - turns LED state transitions into `ON <i>` / `OFF <i>` lines

pub mod transport;

#[cfg(feature = "cli")]
pub mod serial;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::engine::ChannelIndex;
use crate::engine::clock::Clock;
use crate::tools::logger::Logger;

pub use transport::{LogTransport, MemoryTransport, Transport, TransportHandle};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {reason}")]
    Open { port: String, reason: String },
    #[error("transport {0} is not open")]
    NotOpen(String),
    #[error("failed to list serial ports: {0}")]
    Enumerate(String),
    #[error("failed to close transport {name}: {source}")]
    Close {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// One line of the LED controller protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On(ChannelIndex),
    Off(ChannelIndex),
}

impl Command {
    pub fn new(channel: ChannelIndex, on: bool) -> Self {
        if on {
            Command::On(channel)
        } else {
            Command::Off(channel)
        }
    }

    pub fn channel(&self) -> ChannelIndex {
        match self {
            Command::On(c) | Command::Off(c) => *c,
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Command::On(_))
    }

    /// Wire form, newline terminated.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::On(c) => write!(f, "ON {}", c),
            Command::Off(c) => write!(f, "OFF {}", c),
        }
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(action), Some(index), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("malformed command: {:?}", s));
        };
        let channel = index
            .parse::<ChannelIndex>()
            .map_err(|e| format!("bad channel index {:?}: {}", index, e))?;
        match action {
            "ON" => Ok(Command::On(channel)),
            "OFF" => Ok(Command::Off(channel)),
            other => Err(format!("unknown action {:?}", other)),
        }
    }
}

/// Owns the transport and the last transmitted state of every channel.
///
/// Write failures are logged and the logical state is updated anyway: the
/// next transition on that channel resends its absolute state. If the driver
/// is dropped before `release`, lit channels are switched off synchronously
/// and an owned transport is closed.
pub struct ChannelDriver<'a> {
    transport: TransportHandle<'a>,
    states: Vec<bool>,
    command_delay: Duration,
    logger: Arc<Logger>,
    sent: usize,
    failed: usize,
    released: bool,
}

impl<'a> ChannelDriver<'a> {
    pub fn new(
        mut transport: TransportHandle<'a>,
        channel_count: u16,
        command_delay: Duration,
        logger: Arc<Logger>,
    ) -> Result<Self, TransportError> {
        if !transport.get().is_open() {
            return Err(TransportError::NotOpen(transport.describe()));
        }
        Ok(Self {
            transport,
            states: vec![false; channel_count as usize],
            command_delay,
            logger,
            sent: 0,
            failed: 0,
            released: false,
        })
    }

    pub fn channel_count(&self) -> u16 {
        self.states.len() as u16
    }

    pub fn state(&self, channel: ChannelIndex) -> bool {
        self.states.get(channel as usize).copied().unwrap_or(false)
    }

    pub fn lit_channels(&self) -> impl Iterator<Item = ChannelIndex> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(c, _)| c as ChannelIndex)
    }

    /// Commands written (including failed writes).
    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Transmit `on` for `channel` and wait the post-command delay. `at` is the
    /// session time, used for logging only.
    pub async fn send(&mut self, clock: &dyn Clock, channel: ChannelIndex, on: bool, at: Duration) {
        let Some(slot) = self.states.get_mut(channel as usize) else {
            self.logger
                .warn(format!("Ignoring command for unknown LED {}", channel));
            return;
        };
        *slot = on;

        let command = Command::new(channel, on);
        self.sent += 1;
        match self.transport.get().write_line(&command.to_line()) {
            Ok(()) => self
                .logger
                .debug(format!("Sent: {} at time {:.3}s", command, at.as_secs_f64())),
            Err(err) => {
                self.failed += 1;
                self.logger
                    .warn(format!("Failed to send {}: {}", command, err));
            }
        }
        clock.sleep(self.command_delay).await;
    }

    /// Switch off every channel whose last transmitted state is on.
    /// Returns the number of commands sent.
    pub async fn force_off(&mut self, clock: &dyn Clock, at: Duration) -> usize {
        let lit: Vec<ChannelIndex> = self.lit_channels().collect();
        for &channel in &lit {
            self.send(clock, channel, false, at).await;
        }
        lit.len()
    }

    /// Close an owned transport; a borrowed one is left open. Idempotent.
    pub fn release(&mut self) -> Result<(), TransportError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if self.transport.is_owned() {
            let name = self.transport.describe();
            self.transport
                .get()
                .close()
                .map_err(|source| TransportError::Close { name, source })?;
        }
        Ok(())
    }
}

impl Drop for ChannelDriver<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let lit: Vec<ChannelIndex> = self.lit_channels().collect();
        for channel in lit {
            self.states[channel as usize] = false;
            let _ = self
                .transport
                .get()
                .write_line(&Command::Off(channel).to_line());
        }
        if let Err(err) = self.release() {
            self.logger.warn(err.to_string());
        }
    }
}

#[cfg(test)]
#[path = "test_driver.rs"]
mod tests;

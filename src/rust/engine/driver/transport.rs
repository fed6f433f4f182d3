//! Byte-stream transports the channel driver writes to.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::clock::SimulatedClock;
use crate::tools::logger::Logger;

/// A line-oriented output link to the LED controller.
pub trait Transport: Send {
    /// Human readable name, e.g. the serial port path.
    fn describe(&self) -> String;

    fn is_open(&self) -> bool;

    /// Write one complete command line, newline included.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// A transport either opened by the session (closed on teardown) or lent by
/// the caller (left open).
pub enum TransportHandle<'a> {
    Owned(Box<dyn Transport + 'a>),
    Borrowed(&'a mut dyn Transport),
}

impl<'a> TransportHandle<'a> {
    pub fn owned(transport: impl Transport + 'a) -> Self {
        TransportHandle::Owned(Box::new(transport))
    }

    pub fn borrowed(transport: &'a mut dyn Transport) -> Self {
        TransportHandle::Borrowed(transport)
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, TransportHandle::Owned(_))
    }

    pub fn get(&mut self) -> &mut dyn Transport {
        match self {
            TransportHandle::Owned(t) => t.as_mut(),
            TransportHandle::Borrowed(t) => &mut **t,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TransportHandle::Owned(t) => t.describe(),
            TransportHandle::Borrowed(t) => t.describe(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    lines: Vec<(Duration, String)>,
    open: bool,
    fail_writes: bool,
    close_calls: usize,
}

/// In-memory transport recording every line. Clones share the same buffer,
/// so a clone kept by the caller can inspect what a session wrote.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
    clock: Option<SimulatedClock>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                open: true,
                ..MemoryInner::default()
            })),
            clock: None,
        }
    }

    /// Stamp each recorded line with the elapsed time of `clock`.
    pub fn with_clock(mut self, clock: SimulatedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn closed() -> Self {
        let transport = Self::new();
        transport.lock().open = false;
        transport
    }

    /// Make every following write fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn timed_lines(&self) -> Vec<(Duration, String)> {
        self.lock().lines.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemoryTransport {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let at = self
            .clock
            .as_ref()
            .map(SimulatedClock::elapsed)
            .unwrap_or_default();
        let mut inner = self.lock();
        if !inner.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closed"));
        }
        if inner.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write rejected"));
        }
        inner.lines.push((at, line.trim_end().to_string()));
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let mut inner = self.lock();
        inner.open = false;
        inner.close_calls += 1;
        Ok(())
    }
}

/// Transport that prints each command instead of sending it, for dry runs.
pub struct LogTransport {
    logger: Arc<Logger>,
    open: bool,
}

impl LogTransport {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger, open: true }
    }
}

impl Transport for LogTransport {
    fn describe(&self) -> String {
        "dry-run".to_string()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.logger.action(format!("→ {}", line.trim_end()));
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }
}

//! Host-side ports for simulation and tests.

use std::io::Write;

use tracing::debug;

use crate::port::TxPort;

/// A port that captures every written byte in memory.
///
/// The data register is always empty unless [`MemoryPort::set_busy`] says
/// otherwise, which lets tests hold off `trigger_transmit`.
#[derive(Debug, Default, Clone)]
pub struct MemoryPort {
    sent: Vec<u8>,
    interrupt_enabled: bool,
    busy: bool,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes written so far.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Take the captured bytes, leaving the port empty.
    pub fn take_sent(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    /// Simulate a data register that is still shifting out a byte.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }
}

impl TxPort for MemoryPort {
    fn tx_register_empty(&self) -> bool {
        !self.busy
    }

    fn tx_write_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn tx_enable_empty_interrupt(&mut self) {
        self.interrupt_enabled = true;
    }

    fn tx_disable_empty_interrupt(&mut self) {
        self.interrupt_enabled = false;
    }
}

/// A port draining into any [`Write`] sink (file, socket, stdout).
///
/// A hardware register cannot report failures, so the first I/O error is kept
/// and further bytes are dropped until [`WritePort::take_error`] clears it.
pub struct WritePort<W> {
    inner: W,
    written: usize,
    error: Option<std::io::Error>,
}

impl<W: Write> WritePort<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            error: None,
        }
    }

    /// Bytes successfully handed to the sink.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Take the pending I/O error, if any.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the port and return the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> TxPort for WritePort<W> {
    fn tx_register_empty(&self) -> bool {
        true
    }

    fn tx_write_byte(&mut self, byte: u8) {
        if self.error.is_some() {
            return;
        }
        match self.inner.write_all(&[byte]) {
            Ok(()) => self.written += 1,
            Err(err) => {
                debug!(error = %err, written = self.written, "write port failed");
                self.error = Some(err);
            }
        }
    }

    fn tx_enable_empty_interrupt(&mut self) {}

    fn tx_disable_empty_interrupt(&mut self) {}
}

impl<W> std::fmt::Debug for WritePort<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritePort")
            .field("written", &self.written)
            .field("error", &self.error)
            .finish()
    }
}

use bytes::Bytes;
use tracing::debug;

use crate::port::TxPort;

/// Observable state of a [`ChannelTransmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// No bytes pending.
    Idle,
    /// A buffer is registered and bytes remain.
    Draining,
}

/// Non-blocking cursor over one registered buffer, one per physical channel.
///
/// The buffer is a [`Bytes`] handle, so several channels can hold the same
/// encoded packet without copying it. The packet memory is released once the
/// last channel has drained it.
///
/// `register` belongs to the producer side, `serve_transmit` to the TX-empty
/// interrupt. Both take `&mut self`, so the two contexts cannot touch the same
/// transmitter at once; on a target this maps to registering from the priority
/// level that masks the channel's interrupt.
pub struct ChannelTransmitter<P> {
    port: P,
    buf: Bytes,
    index: usize,
    armed: bool,
    peak_backlog: usize,
    overruns: u64,
}

impl<P: TxPort> ChannelTransmitter<P> {
    /// Create an idle transmitter driving `port`.
    pub fn new(port: P) -> Self {
        Self {
            port,
            buf: Bytes::new(),
            index: 0,
            armed: false,
            peak_backlog: 0,
            overruns: 0,
        }
    }

    /// Register `buf` for transmission, replacing any previous registration.
    ///
    /// Remaining bytes of a buffer that is still draining are abandoned and
    /// counted as one overrun.
    pub fn register(&mut self, buf: Bytes) {
        let abandoned = self.depth();
        if abandoned > 0 {
            self.overruns = self.overruns.saturating_add(1);
            debug!(abandoned, overruns = self.overruns, "channel overrun");
        }
        self.buf = buf;
        self.index = 0;
        self.peak_backlog = self.peak_backlog.max(self.buf.len());
    }

    /// Bytes registered but not yet written to the port.
    pub fn depth(&self) -> usize {
        self.buf.len() - self.index
    }

    pub fn state(&self) -> TxState {
        if self.depth() == 0 {
            TxState::Idle
        } else {
            TxState::Draining
        }
    }

    /// Take the next pending byte, or `None` when the buffer is drained.
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.index)?;
        self.index += 1;
        Some(byte)
    }

    /// TX-empty interrupt body: write one byte and stop the interrupt after
    /// the last one.
    pub fn serve_transmit(&mut self) {
        if let Some(byte) = self.next_byte() {
            self.port.tx_write_byte(byte);
        }
        if self.depth() == 0 {
            self.port.tx_disable_empty_interrupt();
            self.armed = false;
            // Drop our handle so the packet memory can be reused.
            self.buf = Bytes::new();
            self.index = 0;
        }
    }

    /// Start ISR-driven draining if bytes are pending and the port is free.
    ///
    /// Returns true when the interrupt was enabled by this call.
    pub fn trigger_transmit(&mut self) -> bool {
        if self.depth() > 0 && self.port.tx_register_empty() {
            self.port.tx_enable_empty_interrupt();
            self.armed = true;
            return true;
        }
        false
    }

    /// Stand-in for the interrupt firing: serve one byte if the interrupt is
    /// enabled and the port can take it. Returns true when a byte was served.
    pub fn poll_transmit(&mut self) -> bool {
        if self.armed && self.port.tx_register_empty() {
            self.serve_transmit();
            return true;
        }
        false
    }

    /// True while this transmitter has the TX-empty interrupt enabled.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Largest buffer ever registered on this channel.
    pub fn peak_backlog(&self) -> usize {
        self.peak_backlog
    }

    /// Number of registrations that abandoned a still draining buffer.
    pub fn overrun_count(&self) -> u64 {
        self.overruns
    }

    /// Clear the high-water mark and overrun counter.
    pub fn reset_diagnostics(&mut self) {
        self.peak_backlog = 0;
        self.overruns = 0;
    }

    /// Borrow the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the transmitter and return the port.
    pub fn into_port(self) -> P {
        self.port
    }
}

impl<P> std::fmt::Debug for ChannelTransmitter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTransmitter")
            .field("len", &self.buf.len())
            .field("index", &self.index)
            .field("armed", &self.armed)
            .field("peak_backlog", &self.peak_backlog)
            .field("overruns", &self.overruns)
            .finish()
    }
}

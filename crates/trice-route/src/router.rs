use std::collections::HashSet;

use bytes::Bytes;
use tracing::trace;
use trice_transport::TxPort;

use crate::channel::Channel;
use crate::error::{Result, RouteError};

/// Fans encoded packets out to a fixed set of channels.
///
/// Routing clones the [`Bytes`] handle, never the packet bytes. Every
/// admitting channel holds the same packet until it has drained it, and the
/// memory is freed when the last handle goes away.
pub struct Router<P> {
    channels: Vec<Channel<P>>,
}

impl<P: TxPort> Router<P> {
    /// Build a router over `channels`. Names must be unique.
    pub fn new(channels: Vec<Channel<P>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for channel in &channels {
            if !seen.insert(channel.name()) {
                return Err(RouteError::DuplicateChannel(channel.name().to_string()));
            }
        }
        Ok(Self { channels })
    }

    /// Register `packet` with every channel whose filter admits `id`.
    /// Returns the number of channels that took it.
    pub fn route(&mut self, id: u16, packet: &Bytes) -> usize {
        let mut admitted = 0;
        for channel in &mut self.channels {
            if channel.offer(id, packet) {
                admitted += 1;
            }
        }
        trace!(id, len = packet.len(), admitted, "routed packet");
        admitted
    }

    /// Largest backlog over all channels; zero once every channel is idle.
    pub fn depth(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.transmitter().depth())
            .max()
            .unwrap_or(0)
    }

    pub fn is_idle(&self) -> bool {
        self.depth() == 0
    }

    /// Kick every channel with pending bytes and an empty TX register.
    /// Returns how many interrupts were enabled.
    pub fn trigger_all(&mut self) -> usize {
        self.channels
            .iter_mut()
            .map(|channel| channel.transmitter_mut().trigger_transmit())
            .filter(|fired| *fired)
            .count()
    }

    /// One polling pass: each armed channel with an empty register sends a
    /// byte. Returns the number of bytes written.
    pub fn poll_all(&mut self) -> usize {
        self.channels
            .iter_mut()
            .map(|channel| channel.transmitter_mut().poll_transmit())
            .filter(|fired| *fired)
            .count()
    }

    pub fn channels(&self) -> &[Channel<P>] {
        &self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&Channel<P>> {
        self.channels.iter().find(|channel| channel.name() == name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel<P>> {
        self.channels
            .iter_mut()
            .find(|channel| channel.name() == name)
    }

    /// Highest backlog seen on channel `name`.
    pub fn peak_backlog(&self, name: &str) -> Result<usize> {
        self.known(name)
            .map(|channel| channel.transmitter().peak_backlog())
    }

    /// Registrations on channel `name` that abandoned undrained bytes.
    pub fn overrun_count(&self, name: &str) -> Result<u64> {
        self.known(name)
            .map(|channel| channel.transmitter().overrun_count())
    }

    /// Clear backlog peaks and overrun counts on every channel.
    pub fn reset_diagnostics(&mut self) {
        for channel in &mut self.channels {
            channel.transmitter_mut().reset_diagnostics();
        }
    }

    pub fn into_channels(self) -> Vec<Channel<P>> {
        self.channels
    }

    fn known(&self, name: &str) -> Result<&Channel<P>> {
        self.channel(name)
            .ok_or_else(|| RouteError::UnknownChannel(name.to_string()))
    }
}

impl<P> std::fmt::Debug for Router<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("channels", &self.channels)
            .finish()
    }
}

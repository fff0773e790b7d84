use bytes::Bytes;
use trice_transport::{ChannelTransmitter, TxPort};

use crate::error::{Result, RouteError};

/// Record ID range a channel accepts.
///
/// Both bounds are exclusive: an ID is admitted when `min_id < id < max_id`.
/// This is not the half-open `[min_id, max_id)` range: `min_id` itself is
/// rejected, so a `[lo, hi)` range translates to `min_id = lo - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionFilter {
    min_id: u16,
    max_id: u16,
}

impl AdmissionFilter {
    /// Filter for `channel`. Fails when no ID could pass.
    pub fn new(channel: &str, min_id: u16, max_id: u16) -> Result<Self> {
        if max_id <= min_id.saturating_add(1) {
            return Err(RouteError::InvalidFilter {
                channel: channel.to_string(),
                reason: "range admits no id",
            });
        }
        Ok(Self { min_id, max_id })
    }

    pub fn min_id(&self) -> u16 {
        self.min_id
    }

    pub fn max_id(&self) -> u16 {
        self.max_id
    }

    pub fn admits(&self, id: u16) -> bool {
        self.min_id < id && id < self.max_id
    }
}

/// One named output: an optional filter and its transmitter.
///
/// The set of channels is fixed once they are handed to a
/// [`Router`](crate::Router).
pub struct Channel<P> {
    name: String,
    filter: Option<AdmissionFilter>,
    tx: ChannelTransmitter<P>,
}

impl<P: TxPort> Channel<P> {
    /// Channel that admits every ID.
    pub fn new(name: impl Into<String>, port: P) -> Self {
        Self {
            name: name.into(),
            filter: None,
            tx: ChannelTransmitter::new(port),
        }
    }

    /// Channel restricted to `min_id < id < max_id`.
    pub fn filtered(name: impl Into<String>, port: P, min_id: u16, max_id: u16) -> Result<Self> {
        let name = name.into();
        let filter = AdmissionFilter::new(&name, min_id, max_id)?;
        Ok(Self {
            name,
            filter: Some(filter),
            tx: ChannelTransmitter::new(port),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> Option<AdmissionFilter> {
        self.filter
    }

    pub fn admits(&self, id: u16) -> bool {
        self.filter.is_none_or(|filter| filter.admits(id))
    }

    /// Hand `packet` to the transmitter if `id` passes the filter.
    pub(crate) fn offer(&mut self, id: u16, packet: &Bytes) -> bool {
        if !self.admits(id) {
            return false;
        }
        self.tx.register(packet.clone());
        true
    }

    pub fn transmitter(&self) -> &ChannelTransmitter<P> {
        &self.tx
    }

    pub fn transmitter_mut(&mut self) -> &mut ChannelTransmitter<P> {
        &mut self.tx
    }

    pub fn into_port(self) -> P {
        self.tx.into_port()
    }
}

impl<P> std::fmt::Debug for Channel<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .field("tx", &self.tx)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use trice_transport::MemoryPort;

    use super::*;

    #[test]
    fn filter_bounds_are_exclusive() {
        let filter = AdmissionFilter::new("a", 10, 20).unwrap();
        assert!(!filter.admits(10));
        assert!(filter.admits(11));
        assert!(filter.admits(19));
        assert!(!filter.admits(20));
    }

    #[test]
    fn empty_filter_is_rejected() {
        for (min, max) in [(10, 10), (10, 11), (20, 10)] {
            let err = AdmissionFilter::new("uart", min, max).unwrap_err();
            assert!(matches!(err, RouteError::InvalidFilter { .. }), "{min}..{max}");
        }
    }

    #[test]
    fn unfiltered_channel_admits_all() {
        let channel = Channel::new("all", MemoryPort::new());
        assert!(channel.admits(0));
        assert!(channel.admits(0x3FFF));
    }

    #[test]
    fn offer_registers_only_admitted_ids() {
        let mut channel = Channel::filtered("low", MemoryPort::new(), 0, 100).unwrap();
        let packet = Bytes::from_static(b"abc");

        assert!(!channel.offer(150, &packet));
        assert_eq!(channel.transmitter().depth(), 0);

        assert!(channel.offer(50, &packet));
        assert_eq!(channel.transmitter().depth(), 3);
    }
}

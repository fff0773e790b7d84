use std::path::Path;

use serde::{Deserialize, Serialize};
use trice_frame::{
    BufferKind, BufferStrategy, ByteOrder, DoubleBuffer, Framing, RingBuffer, SingleBuffer,
};
use trice_transport::TxPort;

use crate::channel::Channel;
use crate::deferred::{DeferredOutput, EncodeConfig, TransferMode};
use crate::error::{Result, RouteError};
use crate::router::Router;

/// Smallest buffer that holds one empty record of every type.
const MIN_BUFFER_SIZE: usize = 16;

/// Complete trace output setup, usually loaded from JSON.
///
/// ```json
/// {
///   "byte_order": "little",
///   "framing": "cobs",
///   "transfer_mode": "multi-pack",
///   "buffer": { "strategy": "ring", "size": 2048 },
///   "channels": [
///     { "name": "uarta", "min_id": 0, "max_id": 1000 },
///     { "name": "rtt" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    pub byte_order: ByteOrder,
    pub framing: Framing,
    pub transfer_mode: TransferMode,
    pub buffer: BufferConfig,
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferConfig {
    pub strategy: BufferKind,
    /// Total bytes; a double buffer splits this into two halves.
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_id: Option<u16>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            framing: Framing::Cobs,
            transfer_mode: TransferMode::SinglePack,
            buffer: BufferConfig::default(),
            channels: vec![ChannelConfig::unfiltered("out")],
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            strategy: BufferKind::Double,
            size: 4096,
        }
    }
}

impl ChannelConfig {
    pub fn unfiltered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_id: None,
            max_id: None,
        }
    }

    pub fn filtered(name: impl Into<String>, min_id: u16, max_id: u16) -> Self {
        Self {
            name: name.into(),
            min_id: Some(min_id),
            max_id: Some(max_id),
        }
    }

    /// Build the channel around `port`.
    pub fn build<P: TxPort>(&self, port: P) -> Result<Channel<P>> {
        match (self.min_id, self.max_id) {
            (None, None) => Ok(Channel::new(self.name.clone(), port)),
            (Some(min_id), Some(max_id)) => {
                Channel::filtered(self.name.clone(), port, min_id, max_id)
            }
            _ => Err(RouteError::InvalidFilter {
                channel: self.name.clone(),
                reason: "min_id and max_id must be given together",
            }),
        }
    }
}

impl TraceConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer.size < MIN_BUFFER_SIZE {
            return Err(RouteError::InvalidConfig(format!(
                "buffer size {} below minimum {MIN_BUFFER_SIZE}",
                self.buffer.size
            )));
        }
        if self.channels.is_empty() {
            return Err(RouteError::InvalidConfig("no channels configured".to_string()));
        }
        if self.framing == Framing::Tcobs {
            return Err(RouteError::InvalidConfig(
                "tcobs framing needs an external codec".to_string(),
            ));
        }
        Ok(())
    }

    pub fn encode_config(&self) -> EncodeConfig {
        EncodeConfig {
            framing: self.framing,
            byte_order: self.byte_order,
            transfer_mode: self.transfer_mode,
            max_packet_len: self.max_packet_len(),
        }
    }

    /// A packet never collects more than one buffer region.
    fn max_packet_len(&self) -> usize {
        match self.buffer.strategy {
            BufferKind::Double => self.buffer.size / 2,
            BufferKind::Single | BufferKind::Ring => self.buffer.size,
        }
    }

    pub fn build_buffer(&self) -> Box<dyn BufferStrategy> {
        match self.buffer.strategy {
            BufferKind::Single => Box::new(SingleBuffer::new(self.buffer.size)),
            BufferKind::Double => Box::new(DoubleBuffer::new(self.buffer.size)),
            BufferKind::Ring => Box::new(RingBuffer::new(self.buffer.size)),
        }
    }

    pub fn build_output(&self) -> Result<DeferredOutput> {
        DeferredOutput::new(self.build_buffer(), self.encode_config())
    }

    /// Build the router, asking `make_port` for each configured channel's port.
    pub fn build_router<P, F>(&self, mut make_port: F) -> Result<Router<P>>
    where
        P: TxPort,
        F: FnMut(&ChannelConfig) -> P,
    {
        let channels = self
            .channels
            .iter()
            .map(|channel| channel.build(make_port(channel)))
            .collect::<Result<Vec<_>>>()?;
        Router::new(channels)
    }
}

//! Channel routing and deferred output for trace records.
//!
//! Records sit in a [`BufferStrategy`](trice_frame::BufferStrategy) until
//! [`DeferredOutput::service`] finds every channel idle. It then walks the
//! pending records, encodes them into one packet and hands that packet to the
//! [`Router`], which registers it with each [`Channel`] whose admission filter
//! lets the record ID through. Channels drain on their own, byte by byte.

pub mod channel;
pub mod config;
pub mod deferred;
pub mod error;
pub mod report;
pub mod router;

pub use channel::{AdmissionFilter, Channel};
pub use config::{BufferConfig, ChannelConfig, TraceConfig};
pub use deferred::{DeferredOutput, EncodeConfig, Service, Transfer, TransferMode};
pub use error::{Result, RouteError};
pub use report::{BufferPeak, ChannelHealth, HealthReport};
pub use router::Router;

//! Non-blocking byte transmitters for deferred trace output.
//!
//! This is the lowest layer of trice-core. Each physical output channel
//! (UART, debug probe, host bridge) gets one [`ChannelTransmitter`], a cursor
//! over a registered buffer that is drained one byte at a time from the
//! TX-empty interrupt or from a polling loop. Hardware access goes through the
//! small [`TxPort`] trait so the same state machine serves every channel.

pub mod memory;
pub mod port;
pub mod transmitter;

pub use memory::{MemoryPort, WritePort};
pub use port::TxPort;
pub use transmitter::{ChannelTransmitter, TxState};

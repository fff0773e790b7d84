//! Trace record layout, validation and packet encoding.
//!
//! A trace record ("trice") is a 16-bit header (2-bit type class, 14-bit ID),
//! an optional 16- or 32-bit stamp, a 16-bit length field and a binary payload,
//! padded to the next 4-byte boundary. This crate covers:
//! - the header codec ([`header`]) and producer-side layout ([`record`])
//! - walking back-to-back records in a buffer ([`walker`])
//! - turning netto records into framed packets ([`encode`])
//! - the buffer strategies records wait in ([`buffer`])
//! - corruption and fill-level counters ([`diag`])
//!
//! All multi-byte fields pass through [`ByteOrder`], the one place where the
//! wire byte order is handled.

pub mod buffer;
pub mod diag;
pub mod encode;
pub mod error;
pub mod header;
pub mod order;
pub mod record;
pub mod walker;

pub use buffer::{BufferStrategy, DoubleBuffer, RingBuffer, SingleBuffer};
pub use diag::{BufferKind, Diagnostics};
pub use encode::{
    deferred_encode, BlockCipher, CobsCodec, DeferredEncoder, FrameCodec, Framing, NoFraming,
    BLOCK_SIZE, DELIMITER,
};
pub use error::{FrameError, Result};
pub use header::{
    decode_cycle, decode_header, decode_length, encode_length, record_total_len_bytes,
    record_word_count, DecodedHeader, RecordHeader, TypeClass, HEADER_SIZE, LENGTH_FIELD_SIZE,
    MAX_ID, MAX_PAYLOAD_LEN,
};
pub use order::ByteOrder;
pub use record::{encode_record, Stamp};
pub use walker::{next_record, Record, RecordWalker};

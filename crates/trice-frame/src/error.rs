use crate::encode::Framing;

/// Errors raised while decoding, encoding or buffering trace records.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Header, length and padding do not agree.
    #[error("corrupt record: {reason}")]
    Corrupt { reason: &'static str },

    /// The type class bits are the reserved value 0.
    #[error("unsupported record type (header 0x{header:04x})")]
    UnsupportedRecordType { header: u16 },

    /// A record claims more bytes than the buffer holds.
    #[error("record truncated ({needed} bytes needed, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The payload does not fit the 15-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The record ID does not fit into 14 bits.
    #[error("record id {0} out of range (max 16383)")]
    IdOutOfRange(u16),

    /// A caller-provided buffer is smaller than the operation needs.
    #[error("buffer too small ({needed} bytes needed, capacity {capacity})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// The trace buffer has no room for another record.
    #[error("trace buffer full ({needed} bytes needed, {free} free)")]
    BufferFull { needed: usize, free: usize },

    /// A framing codec rejected its input.
    #[error("framing error: {0}")]
    Framing(&'static str),

    /// The framing needs a codec that was not supplied.
    #[error("no codec supplied for {0:?} framing")]
    MissingCodec(Framing),
}

impl FrameError {
    /// True for the structural errors the record walker counts and that
    /// invalidate the rest of the buffer.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            FrameError::Corrupt { .. }
                | FrameError::UnsupportedRecordType { .. }
                | FrameError::Truncated { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

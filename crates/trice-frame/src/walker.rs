use tracing::warn;

use crate::diag::Diagnostics;
use crate::error::{FrameError, Result};
use crate::header::{
    decode_cycle, decode_header, decode_length, read_u16_at, record_total_len_bytes,
    record_word_count, TypeClass, HEADER_SIZE,
};
use crate::order::ByteOrder;

/// One record borrowed from a trace buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub id: u16,
    pub type_class: TypeClass,
    pub stamp: Option<u32>,
    /// Cycle counter from a short-form length field.
    pub cycle: Option<u8>,
    /// Header through payload, without the Stamp16 duplicate and padding.
    /// This is what gets encoded and sent.
    pub netto: &'a [u8],
    /// Trailing payload bytes.
    pub payload: &'a [u8],
    /// Buffer bytes the record occupies, padding included.
    pub consumed: usize,
}

impl Record<'_> {
    /// Netto length in bytes.
    pub fn len_bytes(&self) -> usize {
        self.netto.len()
    }
}

/// Take the next record from `cursor` and advance it past the record.
///
/// Returns `Ok(None)` once the cursor is empty. On a structural error the
/// error counter in `diag` is bumped and the cursor is left where it was; the
/// caller should drop the remaining bytes, since nothing after a corrupt
/// record can be trusted.
pub fn next_record<'a>(
    cursor: &mut &'a [u8],
    order: ByteOrder,
    diag: &mut Diagnostics,
) -> Result<Option<Record<'a>>> {
    if cursor.is_empty() {
        return Ok(None);
    }
    match parse_record(cursor, order) {
        Ok(record) => {
            *cursor = &cursor[record.consumed..];
            Ok(Some(record))
        }
        Err(err) => {
            diag.record_error();
            warn!(error = %err, remaining = cursor.len(), "dropping corrupt trace buffer");
            Err(err)
        }
    }
}

fn parse_record(buf: &[u8], order: ByteOrder) -> Result<Record<'_>> {
    let header = decode_header(buf, order)?;
    let offset = header.stamp16_offset;

    if offset != 0 && buf[..HEADER_SIZE] != buf[HEADER_SIZE..2 * HEADER_SIZE] {
        return Err(FrameError::Corrupt {
            reason: "stamp16 header duplicate mismatch",
        });
    }

    let length_word = read_u16_at(buf, header.length_offset, order)?;
    let payload_len = decode_length(length_word);
    let len_bytes = record_total_len_bytes(header.type_class, payload_len);
    let consumed = record_word_count(len_bytes, offset) * 4;

    // Padding must be 0..=3 bytes and agree with the declared length.
    let min_len = consumed.saturating_sub(offset + 3);
    let max_len = consumed.saturating_sub(offset);
    if len_bytes < min_len || len_bytes > max_len {
        return Err(FrameError::Corrupt {
            reason: "length does not match padding",
        });
    }
    if consumed > buf.len() {
        return Err(FrameError::Truncated {
            needed: consumed,
            available: buf.len(),
        });
    }

    let netto = &buf[offset..offset + len_bytes];
    let payload = &buf[header.payload_offset..offset + len_bytes];
    Ok(Record {
        id: header.id,
        type_class: header.type_class,
        stamp: header.stamp,
        cycle: decode_cycle(length_word),
        netto,
        payload,
        consumed,
    })
}

/// Walks the back-to-back records of one buffer.
///
/// After the first corruption the walker stays halted and reports no further
/// records; there is no resynchronization.
#[derive(Debug)]
pub struct RecordWalker<'a> {
    rest: &'a [u8],
    start_len: usize,
    order: ByteOrder,
    halted: bool,
}

impl<'a> RecordWalker<'a> {
    pub fn new(buf: &'a [u8], order: ByteOrder) -> Self {
        Self {
            rest: buf,
            start_len: buf.len(),
            order,
            halted: false,
        }
    }

    /// Next record, `Ok(None)` when exhausted or halted.
    pub fn next_record(&mut self, diag: &mut Diagnostics) -> Result<Option<Record<'a>>> {
        if self.halted {
            return Ok(None);
        }
        match next_record(&mut self.rest, self.order, diag) {
            Err(err) => {
                self.halted = true;
                Err(err)
            }
            ok => ok,
        }
    }

    /// Bytes not yet walked.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Bytes walked so far.
    pub fn consumed(&self) -> usize {
        self.start_len - self.rest.len()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

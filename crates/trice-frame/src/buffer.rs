//! Buffer strategies records wait in until the deferred output drains them.
//!
//! Producers push fully laid-out records (see [`encode_record`]); the
//! deferred side reads contiguous runs of whole records through
//! [`BufferStrategy::readable`] and releases them with
//! [`BufferStrategy::consume`]. Walker and encoder only ever see those
//! slices, so they do not care which strategy is in use.

use bytes::BytesMut;
use tracing::debug;

use crate::diag::{BufferKind, Diagnostics};
use crate::error::{FrameError, Result};
use crate::order::ByteOrder;
use crate::record::{encode_record, Stamp};

/// Storage for records between emission and deferred output.
pub trait BufferStrategy {
    fn kind(&self) -> BufferKind;

    /// Total bytes the strategy can hold.
    fn capacity(&self) -> usize;

    /// Append one laid-out record.
    ///
    /// A record that does not fit is dropped, counted as an overflow in `diag`
    /// and reported as [`FrameError::BufferFull`].
    fn push(&mut self, record: &[u8], diag: &mut Diagnostics) -> Result<()>;

    /// Contiguous whole records ready for output. May switch to the next
    /// region (swap halves, unwrap the ring) once the current one is used up.
    fn readable(&mut self) -> &[u8];

    /// Release `n` bytes from the front of [`BufferStrategy::readable`].
    fn consume(&mut self, n: usize);

    /// Drop the rest of the current [`BufferStrategy::readable`] region,
    /// used after corruption, and return how many bytes went. Records the
    /// producer wrote outside that region are kept.
    fn discard(&mut self) -> usize;

    /// Bytes pushed and not yet consumed.
    fn depth(&self) -> usize;

    /// Lay out a record and push it.
    fn push_record(
        &mut self,
        id: u16,
        stamp: Stamp,
        payload: &[u8],
        cycle: u8,
        order: ByteOrder,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let mut record = BytesMut::new();
        encode_record(&mut record, id, stamp, payload, cycle, order)?;
        self.push(&record, diag)
    }
}

fn overflow(kind: BufferKind, needed: usize, free: usize, diag: &mut Diagnostics) -> FrameError {
    diag.record_overflow();
    debug!(kind = kind.name(), needed, free, "trace buffer overflow");
    FrameError::BufferFull { needed, free }
}

/// Holds records for one output cycle, like a stack or static buffer that is
/// emptied before the next record is written.
#[derive(Debug)]
pub struct SingleBuffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
}

impl SingleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read: 0,
            write: 0,
        }
    }
}

impl BufferStrategy for SingleBuffer {
    fn kind(&self) -> BufferKind {
        BufferKind::Single
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn push(&mut self, record: &[u8], diag: &mut Diagnostics) -> Result<()> {
        let free = self.data.len() - self.write;
        if record.len() > free {
            return Err(overflow(self.kind(), record.len(), free, diag));
        }
        self.data[self.write..self.write + record.len()].copy_from_slice(record);
        self.write += record.len();
        diag.observe_depth(self.kind(), self.depth());
        Ok(())
    }

    fn readable(&mut self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    fn consume(&mut self, n: usize) {
        self.read = (self.read + n).min(self.write);
        if self.read == self.write {
            self.read = 0;
            self.write = 0;
        }
    }

    fn discard(&mut self) -> usize {
        let dropped = self.depth();
        self.read = 0;
        self.write = 0;
        dropped
    }

    fn depth(&self) -> usize {
        self.write - self.read
    }
}

/// Two halves: the producer fills one while the other is read out. The
/// halves swap when the read half is used up and the write half has data.
#[derive(Debug)]
pub struct DoubleBuffer {
    halves: [Vec<u8>; 2],
    write_half: usize,
    write_len: usize,
    read_pos: usize,
    read_len: usize,
}

impl DoubleBuffer {
    /// `capacity` is split evenly into the two halves.
    pub fn new(capacity: usize) -> Self {
        let half = capacity / 2;
        Self {
            halves: [vec![0; half], vec![0; half]],
            write_half: 0,
            write_len: 0,
            read_pos: 0,
            read_len: 0,
        }
    }

    fn half_capacity(&self) -> usize {
        self.halves[0].len()
    }
}

impl BufferStrategy for DoubleBuffer {
    fn kind(&self) -> BufferKind {
        BufferKind::Double
    }

    fn capacity(&self) -> usize {
        2 * self.half_capacity()
    }

    fn push(&mut self, record: &[u8], diag: &mut Diagnostics) -> Result<()> {
        let free = self.half_capacity() - self.write_len;
        if record.len() > free {
            return Err(overflow(self.kind(), record.len(), free, diag));
        }
        let start = self.write_len;
        self.halves[self.write_half][start..start + record.len()].copy_from_slice(record);
        self.write_len += record.len();
        diag.observe_depth(self.kind(), self.write_len);
        Ok(())
    }

    fn readable(&mut self) -> &[u8] {
        if self.read_pos == self.read_len && self.write_len > 0 {
            self.write_half ^= 1;
            self.read_len = self.write_len;
            self.read_pos = 0;
            self.write_len = 0;
        }
        &self.halves[self.write_half ^ 1][self.read_pos..self.read_len]
    }

    fn consume(&mut self, n: usize) {
        self.read_pos = (self.read_pos + n).min(self.read_len);
    }

    fn discard(&mut self) -> usize {
        let dropped = self.read_len - self.read_pos;
        self.read_pos = 0;
        self.read_len = 0;
        dropped
    }

    fn depth(&self) -> usize {
        self.write_len + (self.read_len - self.read_pos)
    }
}

/// Circular buffer of contiguous records.
///
/// A record never wraps: when it does not fit behind the write position it
/// goes to the front, and the old end is remembered as the wrap mark.
#[derive(Debug)]
pub struct RingBuffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
    /// End of valid data while wrapped.
    end: usize,
    wrapped: bool,
    used: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read: 0,
            write: 0,
            end: capacity,
            wrapped: false,
            used: 0,
        }
    }

    fn settle(&mut self) {
        if self.wrapped && self.read == self.end {
            self.read = 0;
            self.end = self.data.len();
            self.wrapped = false;
        }
        if !self.wrapped && self.read == self.write {
            self.read = 0;
            self.write = 0;
        }
    }

    fn free_contiguous(&self) -> usize {
        if self.wrapped {
            self.read - self.write
        } else {
            (self.data.len() - self.write).max(self.read)
        }
    }
}

impl BufferStrategy for RingBuffer {
    fn kind(&self) -> BufferKind {
        BufferKind::Ring
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn push(&mut self, record: &[u8], diag: &mut Diagnostics) -> Result<()> {
        self.settle();
        let n = record.len();
        let at = if self.wrapped {
            if self.write + n > self.read {
                return Err(overflow(self.kind(), n, self.free_contiguous(), diag));
            }
            self.write
        } else if self.write + n <= self.data.len() {
            self.write
        } else if n <= self.read {
            self.end = self.write;
            self.wrapped = true;
            0
        } else {
            return Err(overflow(self.kind(), n, self.free_contiguous(), diag));
        };

        self.data[at..at + n].copy_from_slice(record);
        self.write = at + n;
        self.used += n;
        diag.observe_depth(self.kind(), self.used);
        Ok(())
    }

    fn readable(&mut self) -> &[u8] {
        self.settle();
        if self.wrapped {
            &self.data[self.read..self.end]
        } else {
            &self.data[self.read..self.write]
        }
    }

    fn consume(&mut self, n: usize) {
        let limit = if self.wrapped { self.end } else { self.write };
        let n = n.min(limit - self.read);
        self.read += n;
        self.used -= n;
        self.settle();
    }

    fn discard(&mut self) -> usize {
        let limit = if self.wrapped { self.end } else { self.write };
        let dropped = limit - self.read;
        self.read = limit;
        self.used -= dropped;
        self.settle();
        dropped
    }

    fn depth(&self) -> usize {
        self.used
    }
}

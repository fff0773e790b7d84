use crate::error::{FrameError, Result};
use crate::order::ByteOrder;

/// Record header: type class (2 bits) + ID (14 bits) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Length field following the header (and stamp): 2 bytes.
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Largest record ID.
pub const MAX_ID: u16 = 0x3FFF;

/// Largest payload the long length form can describe.
pub const MAX_PAYLOAD_LEN: usize = 0x7FFF;

/// Payloads below this size use the short length form.
const SHORT_FORM_LIMIT: usize = 128;

const LONG_FORM_FLAG: u16 = 0x8000;

/// The top two header bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Extended/unspecified records; not supported.
    Reserved,
    NoStamp,
    Stamp16,
    Stamp32,
}

impl TypeClass {
    /// Map the two type bits (already shifted down) to a class.
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            1 => TypeClass::NoStamp,
            2 => TypeClass::Stamp16,
            3 => TypeClass::Stamp32,
            _ => TypeClass::Reserved,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            TypeClass::Reserved => 0,
            TypeClass::NoStamp => 1,
            TypeClass::Stamp16 => 2,
            TypeClass::Stamp32 => 3,
        }
    }

    /// Stamp size in bytes.
    pub fn stamp_width(self) -> usize {
        match self {
            TypeClass::Stamp16 => 2,
            TypeClass::Stamp32 => 4,
            TypeClass::Reserved | TypeClass::NoStamp => 0,
        }
    }

    /// Bytes occupied by the duplicated header word in front of a Stamp16
    /// record. The duplicate keeps the length field 4-byte aligned and is
    /// never sent downstream.
    pub fn stamp16_offset(self) -> usize {
        match self {
            TypeClass::Stamp16 => 2,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeClass::Reserved => "reserved",
            TypeClass::NoStamp => "nostamp",
            TypeClass::Stamp16 => "stamp16",
            TypeClass::Stamp32 => "stamp32",
        }
    }
}

/// Decoded 16-bit header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub type_class: TypeClass,
    pub id: u16,
}

impl RecordHeader {
    /// Build a header, rejecting IDs wider than 14 bits.
    pub fn new(type_class: TypeClass, id: u16) -> Result<Self> {
        if id > MAX_ID {
            return Err(FrameError::IdOutOfRange(id));
        }
        Ok(Self { type_class, id })
    }

    pub fn from_word(word: u16) -> Self {
        Self {
            type_class: TypeClass::from_bits(word >> 14),
            id: word & MAX_ID,
        }
    }

    pub fn to_word(self) -> u16 {
        (self.type_class.bits() << 14) | (self.id & MAX_ID)
    }
}

/// Everything [`decode_header`] learns from the bytes in front of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHeader {
    pub type_class: TypeClass,
    pub id: u16,
    pub stamp_width: usize,
    pub stamp: Option<u32>,
    /// 2 for Stamp16 records (duplicated header word), 0 otherwise.
    pub stamp16_offset: usize,
    /// Offset of the length field from the start of the buffer.
    pub length_offset: usize,
    /// Offset of the first payload byte from the start of the buffer.
    pub payload_offset: usize,
}

/// Decode the header (and stamp) at the start of `buf`.
///
/// The ID is not checked against anything; every 14-bit value is legal here.
pub fn decode_header(buf: &[u8], order: ByteOrder) -> Result<DecodedHeader> {
    let word = read_u16_at(buf, 0, order)?;
    let header = RecordHeader::from_word(word);
    if header.type_class == TypeClass::Reserved {
        return Err(FrameError::UnsupportedRecordType { header: word });
    }

    let type_class = header.type_class;
    let stamp16_offset = type_class.stamp16_offset();
    let stamp_start = stamp16_offset + HEADER_SIZE;
    let length_offset = stamp_start + type_class.stamp_width();
    let payload_offset = length_offset + LENGTH_FIELD_SIZE;
    if buf.len() < payload_offset {
        return Err(FrameError::Truncated {
            needed: payload_offset,
            available: buf.len(),
        });
    }

    let stamp = match type_class {
        TypeClass::Stamp16 => Some(u32::from(read_u16_at(buf, stamp_start, order)?)),
        TypeClass::Stamp32 => Some(read_u32_at(buf, stamp_start, order)?),
        TypeClass::NoStamp | TypeClass::Reserved => None,
    };

    Ok(DecodedHeader {
        type_class,
        id: header.id,
        stamp_width: type_class.stamp_width(),
        stamp,
        stamp16_offset,
        length_offset,
        payload_offset,
    })
}

/// Trailing payload byte count from a (host order) length word.
///
/// When the top byte is below 128 it is the count itself and the low byte is
/// the cycle counter. Otherwise the count is the low 15 bits.
pub fn decode_length(word: u16) -> usize {
    let short = usize::from(word >> 8);
    if short < SHORT_FORM_LIMIT {
        short
    } else {
        usize::from(word & 0x7FFF)
    }
}

/// Cycle counter carried in the low byte of a short-form length word.
pub fn decode_cycle(word: u16) -> Option<u8> {
    if usize::from(word >> 8) < SHORT_FORM_LIMIT {
        Some((word & 0xFF) as u8)
    } else {
        None
    }
}

/// Build the length word for `payload_len` bytes. The cycle counter is only
/// carried by the short form.
pub fn encode_length(payload_len: usize, cycle: u8) -> Result<u16> {
    if payload_len < SHORT_FORM_LIMIT {
        return Ok(((payload_len as u16) << 8) | u16::from(cycle));
    }
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(LONG_FORM_FLAG | payload_len as u16)
}

/// Netto record length: header, stamp, length field and payload.
pub fn record_total_len_bytes(type_class: TypeClass, payload_len: usize) -> usize {
    HEADER_SIZE + type_class.stamp_width() + LENGTH_FIELD_SIZE + payload_len
}

/// 32-bit words a record occupies in a buffer, including the Stamp16 duplicate
/// and padding.
pub fn record_word_count(len_bytes: usize, stamp16_offset: usize) -> usize {
    (len_bytes + stamp16_offset).div_ceil(4)
}

pub(crate) fn read_u16_at(buf: &[u8], at: usize, order: ByteOrder) -> Result<u16> {
    match buf.get(at..at + 2) {
        Some(bytes) => Ok(order.read_u16([bytes[0], bytes[1]])),
        None => Err(FrameError::Truncated {
            needed: at + 2,
            available: buf.len(),
        }),
    }
}

fn read_u32_at(buf: &[u8], at: usize, order: ByteOrder) -> Result<u32> {
    match buf.get(at..at + 4) {
        Some(bytes) => Ok(order.read_u32([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(FrameError::Truncated {
            needed: at + 4,
            available: buf.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: [TypeClass; 3] = [TypeClass::NoStamp, TypeClass::Stamp16, TypeClass::Stamp32];

    #[test]
    fn header_word_layout() {
        let header = RecordHeader::new(TypeClass::NoStamp, 42).unwrap();
        assert_eq!(header.to_word(), 0x402A);
        assert_eq!(RecordHeader::from_word(0x402A), header);

        let header = RecordHeader::from_word(0xFFFF);
        assert_eq!(header.type_class, TypeClass::Stamp32);
        assert_eq!(header.id, MAX_ID);
    }

    #[test]
    fn header_rejects_wide_id() {
        let err = RecordHeader::new(TypeClass::NoStamp, MAX_ID + 1).unwrap_err();
        assert!(matches!(err, FrameError::IdOutOfRange(0x4000)));
    }

    #[test]
    fn length_round_trip() {
        for _class in CLASSES {
            for len in [0usize, 1, 127, 128, 32767] {
                let word = encode_length(len, 0x5A).unwrap();
                assert_eq!(decode_length(word), len, "len {len}");
            }
        }
    }

    #[test]
    fn short_form_keeps_cycle() {
        let word = encode_length(3, 0xC0).unwrap();
        assert_eq!(word, 0x03C0);
        assert_eq!(decode_cycle(word), Some(0xC0));

        let long = encode_length(200, 0xC0).unwrap();
        assert_eq!(long, 0x80C8);
        assert_eq!(decode_cycle(long), None);
    }

    #[test]
    fn length_rejects_oversized_payload() {
        let err = encode_length(MAX_PAYLOAD_LEN + 1, 0).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn total_len_per_class() {
        assert_eq!(record_total_len_bytes(TypeClass::NoStamp, 3), 7);
        assert_eq!(record_total_len_bytes(TypeClass::Stamp16, 3), 9);
        assert_eq!(record_total_len_bytes(TypeClass::Stamp32, 3), 11);
    }

    #[test]
    fn word_count_matches_stamp16_examples() {
        // dup hdr + hdr + ts16 + len, then 0..4 payload bytes
        assert_eq!(record_word_count(6, 2), 2);
        assert_eq!(record_word_count(7, 2), 3);
        assert_eq!(record_word_count(10, 2), 3);
        assert_eq!(record_word_count(11, 2), 4);
    }

    #[test]
    fn word_count_is_monotonic() {
        for class in CLASSES {
            let offset = class.stamp16_offset();
            let mut last = 0;
            for len in 0..=600 {
                let words = record_word_count(record_total_len_bytes(class, len), offset);
                assert!(words >= last);
                assert!(words * 4 >= record_total_len_bytes(class, len) + offset);
                last = words;
            }
        }
    }

    #[test]
    fn decode_nostamp_header() {
        let buf = [0x2A, 0x40, 0x00, 0x03, 0xAA, 0xBB, 0xCC, 0x00];
        let decoded = decode_header(&buf, ByteOrder::Little).unwrap();
        assert_eq!(decoded.type_class, TypeClass::NoStamp);
        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.stamp, None);
        assert_eq!(decoded.length_offset, 2);
        assert_eq!(decoded.payload_offset, 4);
    }

    #[test]
    fn decode_stamp16_header_skips_duplicate() {
        let buf = [0x07, 0x80, 0x07, 0x80, 0x34, 0x12, 0x00, 0x00];
        let decoded = decode_header(&buf, ByteOrder::Little).unwrap();
        assert_eq!(decoded.type_class, TypeClass::Stamp16);
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.stamp, Some(0x1234));
        assert_eq!(decoded.stamp16_offset, 2);
        assert_eq!(decoded.length_offset, 6);
        assert_eq!(decoded.payload_offset, 8);
    }

    #[test]
    fn decode_stamp32_header_big_endian() {
        let buf = [0xC0, 0x05, 0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x00];
        let decoded = decode_header(&buf, ByteOrder::Big).unwrap();
        assert_eq!(decoded.type_class, TypeClass::Stamp32);
        assert_eq!(decoded.id, 5);
        assert_eq!(decoded.stamp, Some(0xDEAD_BEEF));
        assert_eq!(decoded.payload_offset, 8);
    }

    #[test]
    fn decode_reserved_type_fails() {
        let buf = [0x2A, 0x00, 0x00, 0x00];
        let err = decode_header(&buf, ByteOrder::Little).unwrap_err();
        assert!(matches!(
            err,
            FrameError::UnsupportedRecordType { header: 0x002A }
        ));
        assert!(err.is_corruption());
    }

    #[test]
    fn decode_short_buffer_is_truncated() {
        let err = decode_header(&[0x2A, 0x40, 0x00], ByteOrder::Little).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: 4,
                available: 3
            }
        ));
    }
}

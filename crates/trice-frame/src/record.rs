use bytes::{BufMut, BytesMut};

use crate::error::Result;
use crate::header::{
    encode_length, record_total_len_bytes, record_word_count, RecordHeader, TypeClass,
};
use crate::order::ByteOrder;

/// Optional record timestamp. The variant picks the header type class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    None,
    Ts16(u16),
    Ts32(u32),
}

impl Stamp {
    pub fn type_class(self) -> TypeClass {
        match self {
            Stamp::None => TypeClass::NoStamp,
            Stamp::Ts16(_) => TypeClass::Stamp16,
            Stamp::Ts32(_) => TypeClass::Stamp32,
        }
    }
}

/// Lay out one record into `dst` the way a producer writes it into a trace
/// buffer.
///
/// Buffer layout (4-byte aligned, padding is zero-filled here):
/// ```text
/// NoStamp:  | hdr | len | payload .. | pad |
/// Stamp16:  | hdr | hdr | ts16 | len | payload .. | pad |
/// Stamp32:  | hdr | ts32       | len | payload .. | pad |
/// ```
/// The Stamp16 header is written twice so the length field lands on a 4-byte
/// boundary. Returns the number of bytes appended (always a multiple of 4).
pub fn encode_record(
    dst: &mut BytesMut,
    id: u16,
    stamp: Stamp,
    payload: &[u8],
    cycle: u8,
    order: ByteOrder,
) -> Result<usize> {
    let type_class = stamp.type_class();
    let header = RecordHeader::new(type_class, id)?.to_word();
    let length = encode_length(payload.len(), cycle)?;

    let offset = type_class.stamp16_offset();
    let total = record_word_count(record_total_len_bytes(type_class, payload.len()), offset) * 4;
    dst.reserve(total);
    let start = dst.len();

    let header_bytes = order.u16_bytes(header);
    if offset != 0 {
        dst.put_slice(&header_bytes);
    }
    dst.put_slice(&header_bytes);
    match stamp {
        Stamp::None => {}
        Stamp::Ts16(ts) => dst.put_slice(&order.u16_bytes(ts)),
        Stamp::Ts32(ts) => dst.put_slice(&order.u32_bytes(ts)),
    }
    dst.put_slice(&order.u16_bytes(length));
    dst.put_slice(payload);

    let written = dst.len() - start;
    dst.put_bytes(0, total - written);
    Ok(total)
}

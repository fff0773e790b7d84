//! Deferred encode pipeline: optional encryption, framing, delimiter.

use bytes::{Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::walker::Record;

/// Cipher block size in bytes. Encrypted packets are padded to a multiple.
pub const BLOCK_SIZE: usize = 8;

/// Packet delimiter appended after self-delimiting framings.
pub const DELIMITER: u8 = 0x00;

/// In-place block cipher over 32-bit words (e.g. XTEA).
///
/// `words.len()` is always a multiple of `BLOCK_SIZE / 4`.
pub trait BlockCipher {
    fn encrypt(&self, words: &mut [u32]);
}

/// Packet framing selected for deferred output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Framing {
    /// Bytes are sent as they are.
    #[default]
    None,
    /// Consistent overhead byte stuffing.
    Cobs,
    /// Self-synchronizing, compressing COBS variant. Needs an external codec.
    Tcobs,
}

impl Framing {
    /// True when packets end with [`DELIMITER`].
    pub fn is_delimited(self) -> bool {
        !matches!(self, Framing::None)
    }

    pub fn name(self) -> &'static str {
        match self {
            Framing::None => "none",
            Framing::Cobs => "cobs",
            Framing::Tcobs => "tcobs",
        }
    }
}

/// A framing transform. Implementations for TCOBS are supplied from outside.
pub trait FrameCodec {
    fn framing(&self) -> Framing;

    /// Worst-case encoded size for `len` input bytes, delimiter excluded.
    fn max_encoded_len(&self, len: usize) -> usize;

    /// Encode `src` into `dst` and return the encoded length. `dst` holds at
    /// least `max_encoded_len(src.len())` bytes. No delimiter is written.
    fn encode(&self, src: &[u8], dst: &mut [u8]) -> usize;

    /// Reverse of [`FrameCodec::encode`], without the delimiter.
    fn decode(&self, src: &[u8], dst: &mut [u8]) -> Result<usize>;
}

/// Identity framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFraming;

impl FrameCodec for NoFraming {
    fn framing(&self) -> Framing {
        Framing::None
    }

    fn max_encoded_len(&self, len: usize) -> usize {
        len
    }

    fn encode(&self, src: &[u8], dst: &mut [u8]) -> usize {
        dst[..src.len()].copy_from_slice(src);
        src.len()
    }

    fn decode(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        if dst.len() < src.len() {
            return Err(FrameError::BufferTooSmall {
                needed: src.len(),
                capacity: dst.len(),
            });
        }
        dst[..src.len()].copy_from_slice(src);
        Ok(src.len())
    }
}

const EMPTY_COBS: u8 = 0x01;

/// COBS framing backed by the `cobs` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CobsCodec;

impl FrameCodec for CobsCodec {
    fn framing(&self) -> Framing {
        Framing::Cobs
    }

    fn max_encoded_len(&self, len: usize) -> usize {
        cobs::max_encoding_length(len).max(1)
    }

    fn encode(&self, src: &[u8], dst: &mut [u8]) -> usize {
        // `cobs::encode` writes nothing for an empty input; the canonical
        // encoding is a single overhead byte.
        if src.is_empty() {
            dst[0] = EMPTY_COBS;
            return 1;
        }
        cobs::encode(src, dst)
    }

    fn decode(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        if matches!(src, [] | [EMPTY_COBS]) {
            return Ok(0);
        }
        if dst.len() < src.len() {
            return Err(FrameError::BufferTooSmall {
                needed: src.len(),
                capacity: dst.len(),
            });
        }
        cobs::decode(src, dst).map_err(|_| FrameError::Framing("invalid cobs data"))
    }
}

/// Turn `len` netto bytes of `src` into a transmit-ready packet in `dst`.
///
/// With a cipher, `len` is first rounded up to [`BLOCK_SIZE`]; the bytes of
/// `src` past `len` are scratch space and get encrypted along with the data,
/// so `src` must be that long. Self-delimiting framings get a trailing
/// [`DELIMITER`], which is included in the returned length.
///
/// Sizing `src` and `dst` is up to the caller. A buffer that is too small is
/// reported as [`FrameError::BufferTooSmall`] before anything is written.
pub fn deferred_encode(
    dst: &mut [u8],
    src: &mut [u8],
    len: usize,
    cipher: Option<&dyn BlockCipher>,
    codec: &dyn FrameCodec,
) -> Result<usize> {
    let len = match cipher {
        Some(_) => len.next_multiple_of(BLOCK_SIZE),
        None => len,
    };
    if src.len() < len {
        return Err(FrameError::BufferTooSmall {
            needed: len,
            capacity: src.len(),
        });
    }

    let delimiter = usize::from(codec.framing().is_delimited());
    let needed = codec.max_encoded_len(len) + delimiter;
    if dst.len() < needed {
        return Err(FrameError::BufferTooSmall {
            needed,
            capacity: dst.len(),
        });
    }

    if let Some(cipher) = cipher {
        encrypt_in_place(&mut src[..len], cipher);
    }

    let mut encoded = codec.encode(&src[..len], dst);
    if delimiter == 1 {
        dst[encoded] = DELIMITER;
        encoded += 1;
    }
    Ok(encoded)
}

fn encrypt_in_place(block: &mut [u8], cipher: &dyn BlockCipher) {
    let mut words: Vec<u32> = block
        .chunks_exact(4)
        .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
        .collect();
    cipher.encrypt(&mut words);
    for (chunk, word) in block.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
}

/// Owns the codec, optional cipher and scratch buffers of one deferred
/// output path, and hands out encoded packets as shareable [`Bytes`].
pub struct DeferredEncoder {
    codec: Box<dyn FrameCodec>,
    cipher: Option<Box<dyn BlockCipher>>,
    staging: Vec<u8>,
    out: BytesMut,
}

impl DeferredEncoder {
    /// Encoder with a built-in codec. TCOBS has none and needs
    /// [`DeferredEncoder::with_codec`].
    pub fn new(framing: Framing) -> Result<Self> {
        let codec: Box<dyn FrameCodec> = match framing {
            Framing::None => Box::new(NoFraming),
            Framing::Cobs => Box::new(CobsCodec),
            Framing::Tcobs => return Err(FrameError::MissingCodec(framing)),
        };
        Ok(Self::with_codec(codec))
    }

    pub fn with_codec(codec: Box<dyn FrameCodec>) -> Self {
        Self {
            codec,
            cipher: None,
            staging: Vec::new(),
            out: BytesMut::new(),
        }
    }

    /// Encrypt every packet with `cipher` before framing.
    pub fn with_cipher(mut self, cipher: Box<dyn BlockCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn framing(&self) -> Framing {
        self.codec.framing()
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encode one netto record (or an already concatenated batch).
    pub fn encode_packet(&mut self, netto: &[u8]) -> Result<Bytes> {
        self.staging.clear();
        self.staging.extend_from_slice(netto);
        self.finish()
    }

    /// Concatenate the netto bytes of `records` into one packet.
    pub fn encode_records(&mut self, records: &[Record<'_>]) -> Result<Bytes> {
        self.staging.clear();
        for record in records {
            self.staging.extend_from_slice(record.netto);
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<Bytes> {
        let len = self.staging.len();
        if self.cipher.is_some() {
            self.staging.resize(len.next_multiple_of(BLOCK_SIZE), 0);
        }
        let capacity = self.codec.max_encoded_len(self.staging.len()) + 1;
        self.out.clear();
        self.out.resize(capacity, 0);

        let encoded = deferred_encode(
            &mut self.out,
            &mut self.staging,
            len,
            self.cipher.as_deref(),
            self.codec.as_ref(),
        )?;
        self.out.truncate(encoded);
        Ok(self.out.split().freeze())
    }
}

impl std::fmt::Debug for DeferredEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredEncoder")
            .field("framing", &self.framing())
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

//! Deferred output: moves buffered records to the channels once they are idle.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use trice_frame::{
    BlockCipher, BufferStrategy, ByteOrder, DeferredEncoder, Diagnostics, FrameCodec, Framing,
    RecordWalker, Stamp,
};
use trice_transport::TxPort;

use crate::error::Result;
use crate::router::Router;

/// How records are grouped into packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferMode {
    /// One record per packet, routed by that record's ID.
    #[default]
    SinglePack,
    /// All pending records in one packet, routed by the first record's ID.
    MultiPack,
}

impl TransferMode {
    pub fn name(self) -> &'static str {
        match self {
            TransferMode::SinglePack => "single-pack",
            TransferMode::MultiPack => "multi-pack",
        }
    }
}

/// Settings of the encode side of deferred output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeConfig {
    pub framing: Framing,
    pub byte_order: ByteOrder,
    pub transfer_mode: TransferMode,
    /// Netto bytes a multi-pack packet may collect. A single record larger
    /// than this still goes out alone.
    pub max_packet_len: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            framing: Framing::Cobs,
            byte_order: ByteOrder::Little,
            transfer_mode: TransferMode::SinglePack,
            max_packet_len: 1024,
        }
    }
}

/// What one [`DeferredOutput::service`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// A channel is still draining the previous packet.
    Busy,
    /// No records pending.
    Idle,
    /// Records were taken from the buffer.
    Transferred(Transfer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transfer {
    /// Records packed into the packet.
    pub records: usize,
    /// Encoded packet length, delimiter included.
    pub packet_len: usize,
    /// Channels the packet was registered with.
    pub channels: usize,
    /// Pending bytes dropped after a corrupt record.
    pub discarded: usize,
}

/// Producer-side buffer plus the encoder that empties it into a [`Router`].
///
/// Owns the [`Diagnostics`] of its pipeline; the router's channels keep their
/// own backlog counters.
pub struct DeferredOutput {
    buffer: Box<dyn BufferStrategy>,
    encoder: DeferredEncoder,
    config: EncodeConfig,
    diag: Diagnostics,
    cycle: u8,
    packets: u64,
}

impl DeferredOutput {
    /// Output with the built-in codec for `config.framing`.
    pub fn new(buffer: Box<dyn BufferStrategy>, config: EncodeConfig) -> Result<Self> {
        let encoder = DeferredEncoder::new(config.framing)?;
        Ok(Self::with_encoder(buffer, encoder, config))
    }

    /// Output with an externally supplied codec, e.g. TCOBS.
    pub fn with_codec(
        buffer: Box<dyn BufferStrategy>,
        codec: Box<dyn FrameCodec>,
        config: EncodeConfig,
    ) -> Self {
        let config = EncodeConfig {
            framing: codec.framing(),
            ..config
        };
        Self::with_encoder(buffer, DeferredEncoder::with_codec(codec), config)
    }

    fn with_encoder(
        buffer: Box<dyn BufferStrategy>,
        encoder: DeferredEncoder,
        config: EncodeConfig,
    ) -> Self {
        Self {
            buffer,
            encoder,
            config,
            diag: Diagnostics::new(),
            cycle: 0,
            packets: 0,
        }
    }

    /// Encrypt packets with `cipher` before framing.
    pub fn with_cipher(mut self, cipher: Box<dyn BlockCipher>) -> Self {
        self.encoder = self.encoder.with_cipher(cipher);
        self
    }

    pub fn config(&self) -> &EncodeConfig {
        &self.config
    }

    /// Emit one record into the buffer. The cycle counter advances per record.
    pub fn emit(&mut self, id: u16, stamp: Stamp, payload: &[u8]) -> Result<()> {
        let cycle = self.cycle;
        self.buffer.push_record(
            id,
            stamp,
            payload,
            cycle,
            self.config.byte_order,
            &mut self.diag,
        )?;
        self.cycle = cycle.wrapping_add(1);
        Ok(())
    }

    /// Push one record that is already laid out in buffer format.
    pub fn push_raw(&mut self, record: &[u8]) -> Result<()> {
        self.buffer.push(record, &mut self.diag)?;
        Ok(())
    }

    /// Bytes waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.depth()
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diag
    }

    pub fn buffer(&self) -> &dyn BufferStrategy {
        self.buffer.as_ref()
    }

    /// Move the next packet's worth of records to `router`.
    ///
    /// Does nothing while any channel still drains, so a packet is never
    /// replaced before every admitting channel has sent it. A corrupt record
    /// ends the pass: records before it are still sent, everything pending
    /// behind it is dropped.
    pub fn service<P: TxPort>(&mut self, router: &mut Router<P>) -> Result<Service> {
        if !router.is_idle() {
            return Ok(Service::Busy);
        }

        let region = self.buffer.readable();
        if region.is_empty() {
            return Ok(Service::Idle);
        }

        let mut walker = RecordWalker::new(region, self.config.byte_order);
        let mut records = Vec::new();
        let mut netto_len = 0;
        let mut consumed = 0;
        let mut corrupt = false;
        loop {
            match walker.next_record(&mut self.diag) {
                Ok(Some(record)) => {
                    let fits = netto_len + record.len_bytes() <= self.config.max_packet_len;
                    if !records.is_empty() && !fits {
                        break;
                    }
                    netto_len += record.len_bytes();
                    consumed = walker.consumed();
                    records.push(record);
                    if self.config.transfer_mode == TransferMode::SinglePack {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    corrupt = true;
                    break;
                }
            }
        }
        let region_len = region.len();

        let packet = match records.first() {
            Some(first) => {
                let id = first.id;
                Some((id, self.encoder.encode_records(&records)?))
            }
            None => None,
        };
        let record_count = records.len();
        drop(records);

        let mut transfer = Transfer {
            records: record_count,
            ..Transfer::default()
        };
        self.buffer.consume(consumed);
        if corrupt {
            transfer.discarded = self.buffer.discard();
            debug!(
                discarded = transfer.discarded,
                region = region_len,
                "discarding trace buffer after corruption"
            );
        }

        if let Some((id, packet)) = packet {
            transfer.packet_len = packet.len();
            transfer.channels = router.route(id, &packet);
            self.packets += 1;
            trace!(id, records = record_count, len = packet.len(), "deferred packet");
        }
        Ok(Service::Transferred(transfer))
    }

    /// Service and poll until the buffer is empty and all channels are idle.
    /// Returns the number of packets routed. Meant for host-side drivers and
    /// tests; a target services from its main loop instead.
    pub fn flush<P: TxPort>(&mut self, router: &mut Router<P>) -> Result<u64> {
        let start = self.packets;
        loop {
            match self.service(router)? {
                Service::Idle => break,
                Service::Transferred(_) => {
                    router.trigger_all();
                }
                Service::Busy => {}
            }
            while !router.is_idle() {
                if router.poll_all() == 0 && router.trigger_all() == 0 {
                    // Every channel is stuck on a busy register.
                    return Ok(self.packets - start);
                }
            }
        }
        Ok(self.packets - start)
    }
}

impl std::fmt::Debug for DeferredOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredOutput")
            .field("buffer", &self.buffer.kind())
            .field("pending", &self.buffer.depth())
            .field("encoder", &self.encoder)
            .field("config", &self.config)
            .field("packets", &self.packets)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use trice_frame::{
        encode_record, CobsCodec, DoubleBuffer, FrameCodec, FrameError, SingleBuffer,
    };
    use trice_transport::MemoryPort;

    use super::*;
    use crate::channel::Channel;

    fn config(transfer_mode: TransferMode) -> EncodeConfig {
        EncodeConfig {
            framing: Framing::None,
            transfer_mode,
            ..EncodeConfig::default()
        }
    }

    fn output(transfer_mode: TransferMode) -> DeferredOutput {
        DeferredOutput::new(Box::new(DoubleBuffer::new(256)), config(transfer_mode)).unwrap()
    }

    fn router() -> Router<MemoryPort> {
        Router::new(vec![
            Channel::filtered("low", MemoryPort::new(), 0, 100).unwrap(),
            Channel::filtered("high", MemoryPort::new(), 100, 200).unwrap(),
            Channel::new("all", MemoryPort::new()),
        ])
        .unwrap()
    }

    fn drain(router: &mut Router<MemoryPort>) {
        router.trigger_all();
        while !router.is_idle() {
            router.poll_all();
        }
    }

    fn sent<'a>(router: &'a Router<MemoryPort>, name: &str) -> &'a [u8] {
        router.channel(name).unwrap().transmitter().port().sent()
    }

    fn transferred(service: Service) -> Transfer {
        match service {
            Service::Transferred(transfer) => transfer,
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn single_pack_sends_one_record_per_packet() {
        let mut out = output(TransferMode::SinglePack);
        let mut router = router();
        out.emit(50, Stamp::None, &[1]).unwrap();
        out.emit(150, Stamp::None, &[2]).unwrap();

        let first = transferred(out.service(&mut router).unwrap());
        assert_eq!(first.records, 1);
        assert_eq!(first.channels, 2);
        assert_eq!(out.service(&mut router).unwrap(), Service::Busy);

        drain(&mut router);
        let second = transferred(out.service(&mut router).unwrap());
        assert_eq!(second.channels, 2);
        drain(&mut router);

        assert_eq!(sent(&router, "low"), &[0x32, 0x40, 0x00, 0x01, 0x01][..]);
        assert_eq!(sent(&router, "high"), &[0x96, 0x40, 0x01, 0x01, 0x02][..]);
        assert_eq!(sent(&router, "all").len(), 10);
        assert_eq!(out.service(&mut router).unwrap(), Service::Idle);
    }

    #[test]
    fn multi_pack_routes_by_first_id() {
        let mut out = output(TransferMode::MultiPack);
        let mut router = router();
        out.emit(50, Stamp::None, &[1]).unwrap();
        out.emit(150, Stamp::None, &[2]).unwrap();

        let transfer = transferred(out.service(&mut router).unwrap());
        drain(&mut router);

        assert_eq!(transfer.records, 2);
        assert_eq!(transfer.packet_len, 10);
        assert_eq!(sent(&router, "low").len(), 10);
        assert!(sent(&router, "high").is_empty());
        assert_eq!(out.pending(), 0);
    }

    #[test]
    fn stamp16_duplicate_is_not_sent() {
        let mut out = output(TransferMode::SinglePack);
        let mut router = router();
        out.emit(7, Stamp::Ts16(0x1234), &[0x01]).unwrap();

        transferred(out.service(&mut router).unwrap());
        drain(&mut router);

        assert_eq!(
            sent(&router, "all"),
            &[0x07, 0x80, 0x34, 0x12, 0x00, 0x01, 0x01][..]
        );
    }

    #[test]
    fn corruption_discards_rest_of_buffer() {
        let mut raw = BytesMut::new();
        encode_record(&mut raw, 10, Stamp::None, &[1, 2, 3], 0, ByteOrder::Little).unwrap();
        encode_record(&mut raw, 11, Stamp::None, &[1, 2, 3], 1, ByteOrder::Little).unwrap();
        encode_record(&mut raw, 12, Stamp::None, &[1, 2, 3], 2, ByteOrder::Little).unwrap();
        // Second record claims 19 payload bytes.
        raw[11] ^= 0x10;

        let mut out = DeferredOutput::new(
            Box::new(SingleBuffer::new(64)),
            config(TransferMode::MultiPack),
        )
        .unwrap();
        for record in raw.chunks(8) {
            out.push_raw(record).unwrap();
        }
        let mut router = router();

        let transfer = transferred(out.service(&mut router).unwrap());

        assert_eq!(transfer.records, 1);
        assert_eq!(transfer.discarded, 16);
        assert_eq!(out.pending(), 0);
        assert_eq!(out.diagnostics().error_count(), 1);
        drain(&mut router);
        assert_eq!(sent(&router, "all").len(), 7);
    }

    #[test]
    fn corruption_keeps_records_written_during_readout() {
        let mut out = output(TransferMode::MultiPack);
        let mut router = router();
        out.emit(10, Stamp::None, &[1, 2, 3]).unwrap();
        // Reserved type class.
        out.push_raw(&[0x2A, 0x00, 0x00, 0x00]).unwrap();

        let first = transferred(out.service(&mut router).unwrap());
        assert_eq!(first.records, 1);
        assert_eq!(first.discarded, 4);

        // Written into the other half after the read half was swapped in.
        out.emit(11, Stamp::None, &[4, 5, 6]).unwrap();
        drain(&mut router);

        let second = transferred(out.service(&mut router).unwrap());
        assert_eq!(second.records, 1);
        assert_eq!(second.discarded, 0);
        drain(&mut router);

        assert_eq!(out.packets_sent(), 2);
        assert_eq!(out.pending(), 0);
        assert_eq!(sent(&router, "all").len(), 14);
    }

    #[test]
    fn corrupt_first_record_sends_nothing() {
        let mut out = output(TransferMode::SinglePack);
        out.push_raw(&[0x2A, 0x00, 0x00, 0x00]).unwrap();
        let mut router = router();

        let transfer = transferred(out.service(&mut router).unwrap());

        assert_eq!(transfer.records, 0);
        assert_eq!(transfer.channels, 0);
        assert_eq!(transfer.discarded, 4);
        assert!(router.is_idle());
    }

    #[test]
    fn multi_pack_respects_packet_limit() {
        let mut out = DeferredOutput::new(
            Box::new(DoubleBuffer::new(256)),
            EncodeConfig {
                max_packet_len: 10,
                ..config(TransferMode::MultiPack)
            },
        )
        .unwrap();
        let mut router = router();
        for id in 1..=3 {
            out.emit(id, Stamp::None, &[0xEE]).unwrap();
        }

        assert_eq!(transferred(out.service(&mut router).unwrap()).records, 2);
        drain(&mut router);
        assert_eq!(transferred(out.service(&mut router).unwrap()).records, 1);
    }

    #[test]
    fn flush_drains_everything_cobs_framed() {
        let mut out = DeferredOutput::new(
            Box::new(DoubleBuffer::new(256)),
            EncodeConfig::default(),
        )
        .unwrap();
        let mut router = router();
        for id in 1..=5 {
            out.emit(id, Stamp::Ts32(u32::from(id)), b"abc").unwrap();
        }

        assert_eq!(out.flush(&mut router).unwrap(), 5);

        let stream = sent(&router, "all");
        let packets: Vec<&[u8]> = stream.split(|b| *b == 0).filter(|p| !p.is_empty()).collect();
        assert_eq!(packets.len(), 5);
        let mut netto = [0u8; 32];
        let n = CobsCodec.decode(packets[0], &mut netto).unwrap();
        assert_eq!(&netto[..n], &[0x01, 0xC0, 0x01, 0x00, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c'][..]);
        assert!(router.is_idle());
        assert_eq!(out.packets_sent(), 5);
    }

    /// Stand-in for an external TCOBS codec: identity plus delimiter.
    struct PassCodec;

    impl FrameCodec for PassCodec {
        fn framing(&self) -> Framing {
            Framing::Tcobs
        }

        fn max_encoded_len(&self, len: usize) -> usize {
            len
        }

        fn encode(&self, src: &[u8], dst: &mut [u8]) -> usize {
            dst[..src.len()].copy_from_slice(src);
            src.len()
        }

        fn decode(&self, src: &[u8], dst: &mut [u8]) -> trice_frame::Result<usize> {
            dst[..src.len()].copy_from_slice(src);
            Ok(src.len())
        }
    }

    #[test]
    fn external_codec_sets_framing() {
        let mut out = DeferredOutput::with_codec(
            Box::new(DoubleBuffer::new(64)),
            Box::new(PassCodec),
            EncodeConfig::default(),
        );
        assert_eq!(out.config().framing, Framing::Tcobs);

        let mut router = router();
        out.emit(1, Stamp::None, &[]).unwrap();
        let transfer = transferred(out.service(&mut router).unwrap());
        assert_eq!(transfer.packet_len, 5);
    }

    #[test]
    fn tcobs_without_codec_fails() {
        let err = DeferredOutput::new(
            Box::new(DoubleBuffer::new(64)),
            EncodeConfig {
                framing: Framing::Tcobs,
                ..EncodeConfig::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::RouteError::Frame(FrameError::MissingCodec(Framing::Tcobs))
        ));
    }

    #[test]
    fn cycle_counter_advances_per_record() {
        let mut out = output(TransferMode::MultiPack);
        let mut router = router();
        out.emit(1, Stamp::None, &[]).unwrap();
        out.emit(1, Stamp::None, &[]).unwrap();

        out.service(&mut router).unwrap();
        drain(&mut router);

        assert_eq!(sent(&router, "all"), &[0x01, 0x40, 0x00, 0x00, 0x01, 0x40, 0x01, 0x00][..]);
    }
}

use tracing::Span;

use super::{HeaderLatch, Packet, PacketSink, Packetizer, ProcessStatus, TrackHeader};
use crate::config::TrackConfig;
use crate::error::{ConfigErrorKind, Error, Result};
use crate::sync::{ByteCorrection, SyncState};

pub const CODEC_ID: &str = "A_PCM/INT/LIT";

const SUPPORTED_BITS_PER_SAMPLE: u16 = 16;

/// Little-endian 16-bit PCM packetizer.
///
/// PCM has no framing, so nothing is buffered between calls: each chunk is
/// cut into `bytes_per_second / interleave` sized packets and any remainder
/// goes out as one shorter packet.
///
/// Packet timestamps follow the byte count emitted so far,
/// `bytes * 1000 / bytes_per_second`, scaled by the linear rate.
#[derive(Debug)]
pub struct PcmPacketizer {
    sync: SyncState,
    header: HeaderLatch,
    bytes_per_second: u64,
    bytes_per_packet: usize,
    block_align: u64,
    bytes_output: u64,
    packet_no: u64,
    span: Span,
}

impl PcmPacketizer {
    /// Fails with [`Error::UnsupportedConfiguration`] for anything but 16-bit
    /// samples, or an interleave factor that does not divide the byte rate.
    pub fn new(config: &TrackConfig) -> Result<Self> {
        config.validate()?;
        if config.bits_per_sample != SUPPORTED_BITS_PER_SAMPLE {
            return Err(Error::UnsupportedConfiguration(
                ConfigErrorKind::BitsPerSample(config.bits_per_sample),
            ));
        }

        let block_align = u64::from(config.channels) * u64::from(config.bits_per_sample / 8);
        let bytes_per_second = block_align * u64::from(config.sample_rate);
        let factor = u64::from(config.pcm_interleave);
        if factor == 0 || bytes_per_second % factor != 0 {
            return Err(Error::UnsupportedConfiguration(
                ConfigErrorKind::Interleave {
                    factor: config.pcm_interleave,
                    bytes_per_second,
                },
            ));
        }
        let bytes_per_packet = (bytes_per_second / factor) as usize;

        tracing::debug!(
            track = %config.name,
            bytes_per_second,
            bytes_per_packet,
            displacement_ms = config.displacement_ms,
            "PCM packetizer created"
        );

        let mut header = TrackHeader::new(CODEC_ID, config.sample_rate, config.channels);
        header.bits_per_sample = Some(config.bits_per_sample);

        Ok(Self {
            sync: SyncState::new(config.displacement_ms, config.linear),
            header: HeaderLatch::new(header),
            bytes_per_second,
            bytes_per_packet,
            block_align,
            bytes_output: 0,
            packet_no: 0,
            span: tracing::debug_span!("pcm", track = %config.name),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn bytes_per_packet(&self) -> usize {
        self.bytes_per_packet
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_second
    }

    fn emit(&mut self, payload: Vec<u8>, sink: &mut dyn PacketSink) {
        let timestamp_ms = self.sync.linear().scale(
            u128::from(self.bytes_output) * 1000,
            u128::from(self.bytes_per_second),
        );
        tracing::trace!(
            packet = self.packet_no,
            size = payload.len(),
            ts = timestamp_ms,
            "PCM packet"
        );
        self.bytes_output += payload.len() as u64;
        self.packet_no += 1;
        sink.add_packet(Packet {
            payload,
            timestamp_ms,
        });
    }
}

impl Packetizer for PcmPacketizer {
    /// PCM timestamps are always derived from the byte count; an explicit
    /// timestamp is ignored.
    fn process(
        &mut self,
        chunk: &[u8],
        _timestamp_ms: Option<i64>,
        sink: &mut dyn PacketSink,
    ) -> ProcessStatus {
        let span = self.span.clone();
        let _enter = span.enter();

        self.header.emit(sink);

        let (mut silence, mut data) =
            match self
                .sync
                .correct_bytes(chunk.len(), self.bytes_per_second, self.block_align)
            {
                ByteCorrection::Pass => (0, chunk),
                ByteCorrection::Skip(n) => (0, &chunk[n..]),
                ByteCorrection::Pad(n) => (n, chunk),
            };

        // Cut packets from the leading silence followed by the chunk.
        while silence > 0 || !data.is_empty() {
            let zeros = silence.min(self.bytes_per_packet);
            let take = (self.bytes_per_packet - zeros).min(data.len());
            let mut payload = vec![0u8; zeros];
            payload.extend_from_slice(&data[..take]);
            silence -= zeros;
            data = &data[take..];
            self.emit(payload, sink);
        }

        ProcessStatus::NeedMoreData
    }

    fn header(&self) -> &TrackHeader {
        self.header.header()
    }

    fn packets_emitted(&self) -> u64 {
        self.packet_no
    }

    fn buffered(&self) -> usize {
        0
    }
}

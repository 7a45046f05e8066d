use tracing::Span;

use super::{HeaderLatch, Packet, PacketSink, Packetizer, ProcessStatus, TrackHeader};
use crate::buffer::ReassemblyBuffer;
use crate::codec::mp3::{
    HEADER_LEN, SAMPLES_PER_FRAME, decode_mp3_header, find_mp3_header, is_layer_iii,
};
use crate::config::TrackConfig;
use crate::error::Result;
use crate::sync::{Correction, SyncState, unit_duration_us};

pub const CODEC_ID: &str = "A_MPEG/L3";

/// MP3 packetizer: one packet per layer III frame.
///
/// Input chunks are buffered until a whole frame (4-byte header plus
/// `frame_size` body bytes) is available. Bytes in front of the first sync
/// are skipped and logged at debug level.
///
/// ## Timestamps
///
/// Unless the caller passes one explicitly, packet `n` is stamped
/// `1000 * n * 1152 / sample_rate`, scaled by the track's linear rate.
///
/// ## Displacement
///
/// A negative displacement discards whole frames; a positive one emits
/// silent copies (header kept, body zeroed) of the first real frame before
/// the real frame itself. Silent frames count as packets.
#[derive(Debug)]
pub struct Mp3Packetizer {
    buffer: ReassemblyBuffer,
    sync: SyncState,
    header: HeaderLatch,
    sample_rate: u32,
    packet_no: u64,
    span: Span,
}

impl Mp3Packetizer {
    pub fn new(config: &TrackConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            track = %config.name,
            sample_rate = config.sample_rate,
            channels = config.channels,
            displacement_ms = config.displacement_ms,
            linear = %config.linear,
            "MP3 packetizer created"
        );
        Ok(Self {
            buffer: ReassemblyBuffer::new(),
            sync: SyncState::new(config.displacement_ms, config.linear),
            header: HeaderLatch::new(TrackHeader::new(
                CODEC_ID,
                config.sample_rate,
                config.channels,
            )),
            sample_rate: config.sample_rate,
            packet_no: 0,
            span: tracing::debug_span!("mp3", track = %config.name),
        })
    }

    /// Record this packetizer's diagnostics under `span` instead of the
    /// default per-track span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn timestamp(&self, explicit: Option<i64>) -> i64 {
        explicit.unwrap_or_else(|| {
            let samples = u128::from(self.packet_no) * u128::from(SAMPLES_PER_FRAME);
            self.sync
                .linear()
                .scale(1000 * samples, u128::from(self.sample_rate))
        })
    }
}

impl Packetizer for Mp3Packetizer {
    fn process(
        &mut self,
        chunk: &[u8],
        timestamp_ms: Option<i64>,
        sink: &mut dyn PacketSink,
    ) -> ProcessStatus {
        let span = self.span.clone();
        let _enter = span.enter();

        self.header.emit(sink);
        self.buffer.append(chunk);

        loop {
            let Some((offset, raw)) = find_mp3_header(self.buffer.as_slice()) else {
                // Only a header split across chunks can start in the tail.
                let keep = HEADER_LEN - 1;
                if self.buffer.len() > keep {
                    tracing::debug!(
                        skipped = self.buffer.len() - keep,
                        "discarding bytes with no valid MP3 header"
                    );
                    self.buffer.retain_tail(keep);
                }
                break;
            };
            let mp3 = decode_mp3_header(raw);
            let end = offset + mp3.frame_len();

            if offset > 0 {
                tracing::debug!(offset, "skipping bytes with no valid MP3 header");
            }

            if end > self.buffer.len() {
                self.buffer.consume_front(offset);
                break;
            }

            if !is_layer_iii(raw) {
                tracing::warn!(
                    packet_number = self.packet_no,
                    layer = mp3.layer,
                    "packet is not a valid MP3 packet"
                );
                // Drop the first sync byte so the next call resumes one
                // position past this header.
                self.buffer.consume_front(offset + 1);
                return ProcessStatus::Malformed {
                    packet_number: self.packet_no,
                };
            }

            let unit_us = unit_duration_us(SAMPLES_PER_FRAME, mp3.sample_rate);
            let payload = match self.sync.correct_frame(unit_us) {
                Correction::Drop => {
                    self.buffer.consume_front(end);
                    continue;
                }
                Correction::Silence => {
                    let mut payload = self.buffer.as_slice()[offset..end].to_vec();
                    payload[HEADER_LEN..].fill(0);
                    self.buffer.consume_front(offset);
                    payload
                }
                Correction::Pass => {
                    let payload = self.buffer.as_slice()[offset..end].to_vec();
                    self.buffer.consume_front(end);
                    payload
                }
            };

            let packet = Packet {
                payload,
                timestamp_ms: self.timestamp(timestamp_ms),
            };
            tracing::trace!(
                frame = self.packet_no,
                size = packet.size(),
                ts = packet.timestamp_ms,
                "MP3 frame packetized"
            );
            sink.add_packet(packet);
            self.packet_no += 1;
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
        self.buffer.len()
    }
}

use tracing::Span;

use super::{HeaderLatch, Packet, PacketSink, Packetizer, ProcessStatus, TrackHeader};
use crate::buffer::ReassemblyBuffer;
use crate::codec::aac::{
    AacHeader, MAX_ADTS_HEADER_LEN, SAMPLES_PER_FRAME, codec_id, find_adts_frame,
};
use crate::config::TrackConfig;
use crate::error::Result;
use crate::sync::{Correction, SyncState, unit_duration_us};

/// ADTS packetizer: one packet per AAC frame, header stripped.
///
/// Works like [`Mp3Packetizer`](super::Mp3Packetizer): chunks are buffered
/// until [`find_adts_frame`] yields a frame whose full `frame_bytes` are
/// present. The emitted payload is the raw data block that follows the ADTS
/// header, which is what the container stores.
///
/// Packet `n` is stamped `1000 * n * 1024 / sample_rate` unless the caller
/// supplies a timestamp.
#[derive(Debug)]
pub struct AacPacketizer {
    buffer: ReassemblyBuffer,
    sync: SyncState,
    header: HeaderLatch,
    sample_rate: u32,
    channels: u16,
    packet_no: u64,
    mismatch_reported: bool,
    span: Span,
}

impl AacPacketizer {
    /// `id` and `profile` select the codec id (see [`codec_id`]);
    /// they normally come from the first header found by a probe.
    pub fn new(config: &TrackConfig, id: u8, profile: u8) -> Result<Self> {
        config.validate()?;
        let codec_id = codec_id(id, profile);

        tracing::debug!(
            track = %config.name,
            codec_id,
            sample_rate = config.sample_rate,
            channels = config.channels,
            displacement_ms = config.displacement_ms,
            "AAC packetizer created"
        );

        Ok(Self {
            buffer: ReassemblyBuffer::new(),
            sync: SyncState::new(config.displacement_ms, config.linear),
            header: HeaderLatch::new(TrackHeader::new(
                codec_id,
                config.sample_rate,
                config.channels,
            )),
            sample_rate: config.sample_rate,
            channels: config.channels,
            packet_no: 0,
            mismatch_reported: false,
            span: tracing::debug_span!("aac", track = %config.name),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn check_parameters(&mut self, aac: &AacHeader) {
        if self.mismatch_reported {
            return;
        }
        if aac.sample_rate != self.sample_rate || u16::from(aac.channels) != self.channels {
            tracing::warn!(
                frame_sample_rate = aac.sample_rate,
                frame_channels = aac.channels,
                track_sample_rate = self.sample_rate,
                track_channels = self.channels,
                "ADTS header disagrees with track parameters"
            );
            self.mismatch_reported = true;
        }
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

impl Packetizer for AacPacketizer {
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
            let Some((offset, aac)) = find_adts_frame(self.buffer.as_slice()) else {
                // A header truncated by the chunk boundary fails to parse,
                // so keep enough bytes to hold all but its last byte.
                let keep = MAX_ADTS_HEADER_LEN - 1;
                if self.buffer.len() > keep {
                    tracing::debug!(
                        skipped = self.buffer.len() - keep,
                        "discarding bytes with no valid ADTS header"
                    );
                    self.buffer.retain_tail(keep);
                }
                break;
            };
            let end = offset + aac.frame_bytes;
            if offset > 0 {
                tracing::debug!(offset, "skipping bytes with no valid ADTS header");
            }
            if end > self.buffer.len() {
                self.buffer.consume_front(offset);
                break;
            }
            self.check_parameters(&aac);

            let data = offset + aac.header_byte_size..end;
            let unit_us = unit_duration_us(SAMPLES_PER_FRAME, aac.sample_rate);
            let payload = match self.sync.correct_frame(unit_us) {
                Correction::Drop => {
                    self.buffer.consume_front(end);
                    continue;
                }
                Correction::Silence => {
                    self.buffer.consume_front(offset);
                    vec![0u8; aac.data_byte_size]
                }
                Correction::Pass => {
                    let payload = self.buffer.as_slice()[data].to_vec();
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
                "AAC frame packetized"
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

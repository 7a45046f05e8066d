//! Streaming packetizers.
//!
//! This module provides the [`Packetizer`] trait and format-specific
//! implementations that turn raw elementary-stream chunks into timestamped
//! packets for a container multiplexer.
//!
//! ## Call model
//!
//! The demultiplexer hands each packetizer chunks of arbitrary size through
//! [`Packetizer::process`]. Compressed formats keep unfinished frames in a
//! [`ReassemblyBuffer`](crate::buffer::ReassemblyBuffer) until the next call;
//! PCM emits everything it receives. Packets go to a [`PacketSink`] in input
//! order, preceded once by the track's [`TrackHeader`].
//!
//! ## Supported formats
//!
//! | Format | Module | Codec id | Samples per packet |
//! |--------|--------|----------|--------------------|
//! | MPEG-1/2 layer III | [`mp3`] | `A_MPEG/L3` | 1152 |
//! | AAC in ADTS | [`aac`] | `A_AAC/...` | 1024 |
//! | 16-bit PCM | [`pcm`] | `A_PCM/INT/LIT` | rate / interleave |

pub mod aac;
pub mod mp3;
pub mod pcm;

pub use aac::AacPacketizer;
pub use mp3::Mp3Packetizer;
pub use pcm::PcmPacketizer;

/// One packet ready for container serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub payload: Vec<u8>,
    /// Presentation time in milliseconds.
    pub timestamp_ms: i64,
}

impl Packet {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Track description sent to the multiplexer before the first packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHeader {
    /// Random track UID.
    pub uid: u64,
    /// Matroska codec id, e.g. `A_MPEG/L3`.
    pub codec_id: &'static str,
    pub sample_rate: u32,
    pub channels: u16,
    /// Only set for PCM.
    pub bits_per_sample: Option<u16>,
}

impl TrackHeader {
    pub(crate) fn new(codec_id: &'static str, sample_rate: u32, channels: u16) -> Self {
        Self {
            uid: rand::random::<u64>(),
            codec_id,
            sample_rate,
            channels,
            bits_per_sample: None,
        }
    }
}

/// Receiving end of a packetizer: the container multiplexer.
pub trait PacketSink {
    /// Called once per track, before the first [`add_packet`](Self::add_packet).
    fn set_header(&mut self, header: &TrackHeader);

    fn add_packet(&mut self, packet: Packet);
}

/// Collects packets in memory and discards the header.
impl PacketSink for Vec<Packet> {
    fn set_header(&mut self, _header: &TrackHeader) {}

    fn add_packet(&mut self, packet: Packet) {
        self.push(packet);
    }
}

/// Result of one [`Packetizer::process`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Everything extractable was emitted; feed more input.
    NeedMoreData,
    /// A frame header failed validation. The packet number is the index
    /// the frame would have had.
    ///
    /// The call stops at the bad header, so frames already buffered behind
    /// it are only emitted by a later call. At end of stream, keep calling
    /// with an empty chunk until [`NeedMoreData`](Self::NeedMoreData) is
    /// returned.
    Malformed { packet_number: u64 },
}

/// Format-specific streaming packetizer.
///
/// A packetizer belongs to exactly one track. It is `Send` so a track can
/// move between threads, but it holds no locks and must not be shared.
///
/// ## Implementing a new format
///
/// 1. Create a new module (e.g. `packetizer/ac3.rs`)
/// 2. Own a [`ReassemblyBuffer`](crate::buffer::ReassemblyBuffer) and a
///    [`SyncState`](crate::sync::SyncState)
/// 3. Implement `Packetizer`, emitting the header before the first packet
pub trait Packetizer: Send {
    /// Consume `chunk` and emit every packet that can be completed.
    ///
    /// `timestamp_ms`, when given, overrides the derived timestamp for
    /// every packet emitted during this call.
    fn process(
        &mut self,
        chunk: &[u8],
        timestamp_ms: Option<i64>,
        sink: &mut dyn PacketSink,
    ) -> ProcessStatus;

    /// Header descriptor for the multiplexer.
    fn header(&self) -> &TrackHeader;

    /// Number of packets emitted so far.
    fn packets_emitted(&self) -> u64;

    /// Bytes held back waiting for the rest of a frame.
    fn buffered(&self) -> usize;
}

/// Sends the header to `sink` the first time it is called.
#[derive(Debug)]
pub(crate) struct HeaderLatch {
    header: TrackHeader,
    sent: bool,
}

impl HeaderLatch {
    pub(crate) fn new(header: TrackHeader) -> Self {
        Self {
            header,
            sent: false,
        }
    }

    pub(crate) fn header(&self) -> &TrackHeader {
        &self.header
    }

    pub(crate) fn emit(&mut self, sink: &mut dyn PacketSink) {
        if !self.sent {
            sink.set_header(&self.header);
            self.sent = true;
        }
    }
}

//! Elementary-stream format detection.
//!
//! Looks at the first bytes of a file and decides which packetizer can
//! handle it. A single plausible header is not enough for the framed
//! formats: sync words occur in random data often enough that the probe
//! also requires a second header exactly where the first frame ends, unless
//! that frame ends exactly at the end of the buffer.
//!
//! Raw PCM has no framing and is never detected.

use std::fmt;

use crate::codec::aac::{AacHeader, ADIF_MAGIC, parse_adif_header, parse_adts_header};
use crate::codec::mp3::{Mp3Header, decode_mp3_header, find_mp3_header, is_layer_iii};

/// Result of a successful [`probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// MPEG layer III, described by its first frame header.
    Mp3(Mp3Header),
    /// AAC in ADTS framing, described by its first frame header.
    Adts(AacHeader),
    /// AAC with a single ADIF stream header.
    Adif(AacHeader),
}

impl StreamFormat {
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Mp3(h) => h.sample_rate,
            Self::Adts(h) | Self::Adif(h) => h.sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        match self {
            Self::Mp3(h) => u16::from(h.channels),
            Self::Adts(h) | Self::Adif(h) => u16::from(h.channels),
        }
    }

    /// Matroska codec id of the detected stream.
    pub fn codec_id(&self) -> &'static str {
        match self {
            Self::Mp3(_) => crate::packetizer::mp3::CODEC_ID,
            Self::Adts(h) | Self::Adif(h) => h.codec_id(),
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Mp3(_) => "MP3",
            Self::Adts(_) => "AAC (ADTS)",
            Self::Adif(_) => "AAC (ADIF)",
        };
        write!(
            f,
            "{kind}, {} Hz, {} channel(s)",
            self.sample_rate(),
            self.channels()
        )
    }
}

/// Detect the format of the stream starting at `buf[0]`.
///
/// Checked in order: ADIF magic, ADTS, MP3.
pub fn probe(buf: &[u8]) -> Option<StreamFormat> {
    let format = probe_adif(buf)
        .or_else(|| probe_adts(buf))
        .or_else(|| probe_mp3(buf));
    match &format {
        Some(format) => tracing::debug!(%format, codec_id = format.codec_id(), "stream probed"),
        None => tracing::debug!(len = buf.len(), "no known stream format"),
    }
    format
}

fn probe_adif(buf: &[u8]) -> Option<StreamFormat> {
    if buf.len() < 4 || u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) != ADIF_MAGIC {
        return None;
    }
    parse_adif_header(buf).map(StreamFormat::Adif)
}

fn probe_adts(buf: &[u8]) -> Option<StreamFormat> {
    let first = parse_adts_header(buf)?;
    let end = first.frame_bytes;
    if end == 0 || end > buf.len() {
        return None;
    }
    if end < buf.len() {
        let second = parse_adts_header(&buf[end..])?;
        if second.id != first.id || second.sample_rate != first.sample_rate {
            return None;
        }
    }
    Some(StreamFormat::Adts(first))
}

fn mp3_header_at_start(buf: &[u8]) -> Option<Mp3Header> {
    match find_mp3_header(buf) {
        Some((0, raw)) if is_layer_iii(raw) => Some(decode_mp3_header(raw)),
        _ => None,
    }
}

fn probe_mp3(buf: &[u8]) -> Option<StreamFormat> {
    let first = mp3_header_at_start(buf)?;
    let end = first.frame_len();
    if end > buf.len() {
        return None;
    }
    if end < buf.len() {
        let second = mp3_header_at_start(&buf[end..])?;
        if second.version != first.version || second.sample_rate != first.sample_rate {
            return None;
        }
    }
    Some(StreamFormat::Mp3(first))
}

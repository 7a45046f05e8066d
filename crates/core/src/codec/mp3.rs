//! MPEG audio frame header locator and decoder.
//!
//! Only what framing needs: sync search, sample rate, channel mode and the
//! frame size. Frame sizes always use the layer III bitrate table; the MP3
//! packetizer rejects other layers before trusting the size.

/// Sampling frequencies: MPEG-1 (0..3), MPEG-2 (3..6), MPEG-2.5 (6..9).
pub const SAMPLE_RATES: [u32; 9] = [44100, 48000, 32000, 22050, 24000, 16000, 11025, 12000, 8000];

/// Samples carried by one MP3 frame.
pub const SAMPLES_PER_FRAME: u32 = 1152;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 4;

const BITRATES_KBPS: [[u32; 16]; 2] = [
    // MPEG-1 layer III
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
    // MPEG-2 / 2.5 layer III
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// Decoded 32-bit MPEG audio frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3Header {
    pub raw: u32,
    pub version: MpegVersion,
    /// Layer number (1, 2 or 3) from `4 - layer_bits`.
    pub layer: u8,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    pub padding: bool,
    pub protected: bool,
    /// Channel mode; 3 is mono.
    pub mode: u8,
    pub channels: u8,
    /// Bytes following the 4-byte header.
    pub frame_size: usize,
}

impl Mp3Header {
    /// Full frame length including the header.
    pub fn frame_len(&self) -> usize {
        self.frame_size + HEADER_LEN
    }
}

/// True when the layer field of a raw header describes layer III.
pub fn is_layer_iii(raw: u32) -> bool {
    4 - ((raw >> 17) & 3) == 3
}

fn is_candidate(header: u32) -> bool {
    header & 0xffe0_0000 == 0xffe0_0000
        && (header >> 17) & 3 != 0
        && (header >> 12) & 0xf != 0xf
        && (header >> 12) & 0xf != 0
        && (header >> 10) & 3 != 3
        && header & 0xffff_0000 != 0xfffe_0000
}

/// Scan `buf` for the first plausible frame header.
///
/// Returns the byte offset and the raw big-endian header word.
pub fn find_mp3_header(buf: &[u8]) -> Option<(usize, u32)> {
    buf.windows(HEADER_LEN).enumerate().find_map(|(pos, w)| {
        let header = u32::from_be_bytes([w[0], w[1], w[2], w[3]]);
        is_candidate(header).then_some((pos, header))
    })
}

/// Decode a raw header word previously returned by [`find_mp3_header`].
pub fn decode_mp3_header(raw: u32) -> Mp3Header {
    let (version, lsf) = if raw & (1 << 20) != 0 {
        if raw & (1 << 19) != 0 {
            (MpegVersion::Mpeg1, 0)
        } else {
            (MpegVersion::Mpeg2, 1)
        }
    } else {
        (MpegVersion::Mpeg25, 1)
    };

    let sf_bits = ((raw >> 10) & 3) as usize;
    let sf_index = match version {
        MpegVersion::Mpeg25 => 6 + sf_bits,
        _ => sf_bits + lsf * 3,
    };
    // sf_bits == 3 is reserved; clamp so a hand-built word cannot index out of range.
    let sample_rate = SAMPLE_RATES[sf_index.min(SAMPLE_RATES.len() - 1)];

    let bitrate_kbps = BITRATES_KBPS[lsf][((raw >> 12) & 0xf) as usize];
    let padding = (raw >> 9) & 1 == 1;
    let mode = ((raw >> 6) & 3) as u8;

    let body = (bitrate_kbps as usize * 144_000) / ((sample_rate as usize) << lsf);
    let frame_size = (body + usize::from(padding)).saturating_sub(HEADER_LEN);

    Mp3Header {
        raw,
        version,
        layer: (4 - ((raw >> 17) & 3)) as u8,
        sample_rate,
        bitrate_kbps,
        padding,
        protected: (raw >> 16) & 1 == 0,
        mode,
        channels: if mode == 3 { 1 } else { 2 },
        frame_size,
    }
}

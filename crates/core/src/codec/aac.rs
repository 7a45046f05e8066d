//! AAC header codec: ADIF stream headers and ADTS frame headers.
//!
//! Both parsers run a fresh [`BitCursor`] over the caller's slice and reject
//! the header (return `None`) on any overrun, sync mismatch or reserved
//! field. Nothing here allocates.
//!
//! ## ADTS layout as parsed here
//!
//! ```text
//! syncword            12  0xFFF
//! id                   1  0 = MPEG-4, 1 = MPEG-2
//! layer                2  must be 0
//! protection_absent    1
//! profile              2
//! sf_index             4  reserved 12..=15 rejected
//! private              1
//! channel_config       3
//! original/copy        1
//! home                 1
//! emphasis             2  MPEG-4 (id = 0) only
//! copyright_id_bit     1
//! copyright_id_start   1
//! frame_length        13  header + payload, bytes
//! buffer_fullness     11
//! raw_blocks           2
//! crc                 16  only when protection_absent = 0
//! ```

use crate::bits::BitCursor;

/// AAC sampling frequencies indexed by the 4-bit `sf_index`.
pub const SAMPLE_RATES: [u32; 16] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 0, 0, 0, 0,
];

/// Samples carried by one AAC raw data block.
pub const SAMPLES_PER_FRAME: u32 = 1024;

pub const ADTS_SYNC: u32 = 0xfff;
pub const ADIF_MAGIC: u32 = u32::from_be_bytes(*b"ADIF");

/// `id` value for MPEG-4 AAC.
pub const ID_MPEG4: u8 = 0;
/// `id` value for MPEG-2 AAC.
pub const ID_MPEG2: u8 = 1;

/// Longest ADTS header: MPEG-4 with CRC, 74 bits.
pub const MAX_ADTS_HEADER_LEN: usize = 10;

/// Nominal bitrate reported for every parsed header.
const NOMINAL_BIT_RATE: u32 = 1024;

/// Channel sums above this are routed as stereo.
const MAX_ROUTED_CHANNELS: u32 = 6;

/// Decoded AAC header (ADIF or ADTS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacHeader {
    pub sample_rate: u32,
    /// 0 = MPEG-4, 1 = MPEG-2.
    pub id: u8,
    /// Audio object type minus one (0 = Main, 1 = LC, 2 = SSR, 3 = LTP).
    pub profile: u8,
    /// Total frame size including the header. Zero for ADIF.
    pub frame_bytes: usize,
    pub channels: u8,
    pub bit_rate: u32,
    pub header_bit_size: usize,
    pub header_byte_size: usize,
    /// Payload bytes following the header. Zero for ADIF.
    pub data_byte_size: usize,
}

impl AacHeader {
    /// Matroska codec id for this stream.
    pub fn codec_id(&self) -> &'static str {
        codec_id(self.id, self.profile)
    }
}

/// Matroska codec id for an AAC `id`/`profile` pair.
pub fn codec_id(id: u8, profile: u8) -> &'static str {
    match (id, profile) {
        (ID_MPEG2, 0) => "A_AAC/MPEG2/MAIN",
        (ID_MPEG2, 1) => "A_AAC/MPEG2/LC",
        (ID_MPEG2, _) => "A_AAC/MPEG2/SSR",
        (_, 0) => "A_AAC/MPEG4/MAIN",
        (_, 1) => "A_AAC/MPEG4/LC",
        (_, 2) => "A_AAC/MPEG4/SSR",
        _ => "A_AAC/MPEG4/LTP",
    }
}

fn sample_rate(sf_index: u32) -> Option<u32> {
    match SAMPLE_RATES.get(sf_index as usize) {
        Some(&rate) if rate != 0 => Some(rate),
        _ => None,
    }
}

fn routed_channels(raw: u32) -> u8 {
    if raw > MAX_ROUTED_CHANNELS {
        2
    } else {
        raw as u8
    }
}

/// Parse an ADIF stream header at the start of `buf`.
///
/// Walks every program config element; the last one decides sample rate,
/// profile and channel count.
pub fn parse_adif_header(buf: &[u8]) -> Option<AacHeader> {
    let mut bc = BitCursor::new(buf);

    if bc.get_bits(32)? != ADIF_MAGIC {
        return None;
    }
    if bc.get_bit()? {
        // copyright_id
        for _ in 0..3 {
            bc.get_bits(24)?;
        }
    }
    bc.get_bit()?; // original_copy
    bc.get_bit()?; // home
    let bitstream_type = bc.get_bits(1)?;
    bc.get_bits(23)?; // bitrate
    let num_program_configs = bc.get_bits(4)?;

    let mut profile = 0;
    let mut sf_index = 0;
    let mut channels = 0;

    for _ in 0..=num_program_configs {
        if bitstream_type == 0 {
            bc.get_bits(20)?; // adif_buffer_fullness
        }
        bc.get_bits(4)?; // element_instance_tag
        profile = bc.get_bits(2)?;
        sf_index = bc.get_bits(4)?;
        let front = bc.get_bits(4)?;
        let side = bc.get_bits(4)?;
        let back = bc.get_bits(4)?;
        let lfe = bc.get_bits(2)?;
        let assoc_data = bc.get_bits(3)?;
        let valid_cc = bc.get_bits(4)?;

        if bc.get_bit()? {
            bc.get_bits(4)?; // mono_mixdown_element_number
        }
        if bc.get_bit()? {
            bc.get_bits(4)?; // stereo_mixdown_element_number
        }
        if bc.get_bit()? {
            bc.get_bits(2)?; // matrix_mixdown_idx
            bc.get_bits(1)?; // pseudo_surround_enable
        }

        let elements = front + side + back;
        channels = elements;
        for _ in 0..elements {
            if bc.get_bit()? {
                channels += 1;
            }
            bc.get_bits(4)?; // element_tag_select
        }
        channels += lfe;
        for _ in 0..(lfe + assoc_data) {
            bc.get_bits(4)?; // element_tag_select
        }
        for _ in 0..valid_cc {
            bc.get_bits(1)?; // cc_element_is_ind_sw
            bc.get_bits(4)?; // valid_cc_element_tag_select
        }

        bc.byte_align();
        let comment_field_bytes = bc.get_bits(8)? as usize;
        bc.skip_bits(comment_field_bytes * 8)?;
    }

    let header_bit_size = bc.bit_position();
    Some(AacHeader {
        sample_rate: sample_rate(sf_index)?,
        id: ID_MPEG4,
        profile: profile as u8,
        frame_bytes: 0,
        channels: routed_channels(channels),
        bit_rate: NOMINAL_BIT_RATE,
        header_bit_size,
        header_byte_size: header_bit_size.div_ceil(8),
        data_byte_size: 0,
    })
}

/// Parse an ADTS frame header at the start of `buf`.
pub fn parse_adts_header(buf: &[u8]) -> Option<AacHeader> {
    let mut bc = BitCursor::new(buf);

    if bc.get_bits(12)? != ADTS_SYNC {
        return None;
    }
    let id = bc.get_bits(1)? as u8;
    if bc.get_bits(2)? != 0 {
        return None; // layer
    }
    let protection_absent = bc.get_bit()?;
    let profile = bc.get_bits(2)? as u8;
    let sample_rate = sample_rate(bc.get_bits(4)?)?;
    bc.get_bit()?; // private
    let channels = bc.get_bits(3)?;
    bc.get_bit()?; // original_copy
    bc.get_bit()?; // home
    if id == ID_MPEG4 {
        bc.get_bits(2)?; // emphasis
    }
    bc.get_bit()?; // copyright_id_bit
    bc.get_bit()?; // copyright_id_start
    let frame_bytes = bc.get_bits(13)? as usize;
    bc.get_bits(11)?; // adts_buffer_fullness
    bc.get_bits(2)?; // number_of_raw_data_blocks_in_frame
    if !protection_absent {
        bc.get_bits(16)?; // crc, not verified
    }

    let mut header_bit_size: usize = if id == ID_MPEG4 { 58 } else { 56 };
    if !protection_absent {
        header_bit_size += 16;
    }
    let header_byte_size = header_bit_size.div_ceil(8);
    let data_byte_size = frame_bytes.checked_sub(header_byte_size)?;

    Some(AacHeader {
        sample_rate,
        id,
        profile,
        frame_bytes,
        channels: routed_channels(channels),
        bit_rate: NOMINAL_BIT_RATE,
        header_bit_size,
        header_byte_size,
        data_byte_size,
    })
}

/// Find the first offset in `buf` holding a valid ADTS header.
///
/// Offsets whose first 12 bits are not the sync word are skipped without
/// running the full parser.
pub fn find_adts_frame(buf: &[u8]) -> Option<(usize, AacHeader)> {
    (0..buf.len().saturating_sub(1))
        .filter(|&pos| buf[pos] == 0xff && buf[pos + 1] & 0xf0 == 0xf0)
        .find_map(|pos| parse_adts_header(&buf[pos..]).map(|h| (pos, h)))
}

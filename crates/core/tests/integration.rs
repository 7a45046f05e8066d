//! Integration tests: whole streams through the public API.
//!
//! Streams are synthesized in-test so the packetizers can be checked
//! against known frame boundaries, independent of how the input is chunked.

use bitstream_io::{BigEndian, BitWrite, BitWriter};
use proptest::prelude::*;

use esmux::codec::aac::find_adts_frame;
use esmux::codec::mp3::find_mp3_header;
use esmux::{
    AacPacketizer, Error, LinearRate, Mp3Packetizer, Packet, PacketSink, Packetizer,
    PcmPacketizer, ProcessStatus, StreamFormat, TrackConfig, TrackHeader, TrackRegistry, probe,
};

/// MPEG-1 layer III, 128 kbps, 44.1 kHz, no padding: 417-byte frames.
const MP3_HEADER: [u8; 4] = [0xff, 0xfb, 0x90, 0x64];
const MP3_FRAME_LEN: usize = 417;

fn mp3_stream(frames: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * MP3_FRAME_LEN);
    for i in 0..frames {
        data.extend(MP3_HEADER);
        data.extend(std::iter::repeat_n(i as u8 + 1, MP3_FRAME_LEN - 4));
    }
    data
}

/// MPEG-2 LC ADTS frame at 44.1 kHz stereo, no CRC.
fn adts_frame(payload_len: usize, fill: u8) -> Vec<u8> {
    let frame_len = (7 + payload_len) as u32;
    let mut data: Vec<u8> = Vec::new();
    let mut w = BitWriter::endian(&mut data, BigEndian);
    w.write(12, 0xfffu32).unwrap();
    w.write_bit(true).unwrap(); // MPEG-2
    w.write(2, 0u32).unwrap();
    w.write_bit(true).unwrap(); // protection absent
    w.write(2, 1u32).unwrap(); // LC
    w.write(4, 4u32).unwrap(); // 44100
    w.write_bit(false).unwrap();
    w.write(3, 2u32).unwrap();
    w.write(4, 0u32).unwrap();
    w.write(13, frame_len).unwrap();
    w.write(11, 0x7ffu32).unwrap();
    w.write(2, 0u32).unwrap();
    drop(w);
    data.extend(std::iter::repeat_n(fill, payload_len));
    data
}

fn adts_stream(sizes: &[usize]) -> Vec<u8> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(i, &len)| adts_frame(len, i as u8 + 1))
        .collect()
}

fn feed_in_pieces(p: &mut dyn Packetizer, data: &[u8], cuts: &[usize]) -> Vec<Packet> {
    let mut cuts: Vec<usize> = cuts.iter().map(|&c| c % (data.len() + 1)).collect();
    cuts.sort_unstable();
    let mut sink: Vec<Packet> = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain([data.len()]) {
        assert_eq!(p.process(&data[start..cut], None, &mut sink), ProcessStatus::NeedMoreData);
        start = cut;
    }
    sink
}

fn mp3_packetizer(displacement_ms: i64) -> Mp3Packetizer {
    let config = TrackConfig::new(44100, 2).with_displacement_ms(displacement_ms);
    Mp3Packetizer::new(&config).unwrap()
}

fn aac_packetizer() -> AacPacketizer {
    AacPacketizer::new(&TrackConfig::new(44100, 2), 1, 1).unwrap()
}

proptest! {
    #[test]
    fn mp3_output_independent_of_chunking(
        frames in 1usize..8,
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let data = mp3_stream(frames);
        let whole = feed_in_pieces(&mut mp3_packetizer(0), &data, &[]);
        let pieces = feed_in_pieces(&mut mp3_packetizer(0), &data, &cuts);
        prop_assert_eq!(whole.len(), frames);
        prop_assert_eq!(whole, pieces);
    }

    #[test]
    fn aac_output_independent_of_chunking(
        sizes in prop::collection::vec(1usize..300, 1..8),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let data = adts_stream(&sizes);
        let whole = feed_in_pieces(&mut aac_packetizer(), &data, &[]);
        let pieces = feed_in_pieces(&mut aac_packetizer(), &data, &cuts);
        prop_assert_eq!(whole.len(), sizes.len());
        for (packet, &len) in whole.iter().zip(&sizes) {
            prop_assert_eq!(packet.size(), len);
        }
        prop_assert_eq!(whole, pieces);
    }

    #[test]
    fn junk_between_frames_independent_of_chunking(
        frames in 1usize..5,
        junk in prop::collection::vec(0u8..0xf0, 0..3000),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        // Junk bytes never reach 0xFF, so no sync word can form inside them.
        let mut mp3 = junk.clone();
        for frame in mp3_stream(frames).chunks(MP3_FRAME_LEN) {
            mp3.extend(frame);
            mp3.extend(&junk);
        }
        let mut p = mp3_packetizer(0);
        let pieces = feed_in_pieces(&mut p, &mp3, &cuts);
        prop_assert_eq!(pieces, feed_in_pieces(&mut mp3_packetizer(0), &mp3_stream(frames), &[]));
        prop_assert!(p.buffered() < 4);

        let sizes = vec![40; frames];
        let mut aac = junk.clone();
        for i in 0..frames {
            aac.extend(adts_frame(40, i as u8 + 1));
            aac.extend(&junk);
        }
        let mut p = aac_packetizer();
        let pieces = feed_in_pieces(&mut p, &aac, &cuts);
        prop_assert_eq!(pieces, feed_in_pieces(&mut aac_packetizer(), &adts_stream(&sizes), &[]));
        prop_assert!(p.buffered() < 10);
    }

    #[test]
    fn pcm_packet_count_is_ceil(len in 0usize..20_000) {
        let config = TrackConfig::new(44100, 2).with_pcm_interleave(75);
        let mut p = PcmPacketizer::new(&config).unwrap();
        let mut sink: Vec<Packet> = Vec::new();
        p.process(&vec![0u8; len], None, &mut sink);
        prop_assert_eq!(sink.len(), len.div_ceil(2352));
        prop_assert!(sink.iter().all(|p| p.size() <= 2352));
    }

    #[test]
    fn find_frame_skips_leading_junk(junk_len in 0usize..64) {
        // 0x00 can never start a sync word.
        let mut data = vec![0u8; junk_len];
        data.extend(mp3_stream(1));
        prop_assert_eq!(find_mp3_header(&data).map(|(pos, _)| pos), Some(junk_len));

        let mut data = vec![0u8; junk_len];
        data.extend(adts_frame(8, 0));
        prop_assert_eq!(find_adts_frame(&data).map(|(pos, _)| pos), Some(junk_len));
    }
}

#[test]
fn mp3_timestamps_are_monotonic_with_displacement() {
    let mut p = mp3_packetizer(250);
    let mut sink: Vec<Packet> = Vec::new();
    p.process(&mp3_stream(20), None, &mut sink);
    // 250 ms is 9.57 frames: ten silent frames in front.
    assert_eq!(sink.len(), 30);
    assert!(sink.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    assert!(sink[..10].iter().all(|p| p.payload[4..].iter().all(|&b| b == 0)));
    assert_eq!(sink[10].payload[4], 1);
}

#[test]
fn mp3_negative_displacement_longer_than_stream() {
    let mut p = mp3_packetizer(-2000);
    let mut sink: Vec<Packet> = Vec::new();
    p.process(&mp3_stream(50), None, &mut sink);
    assert!(sink.is_empty());
    assert_eq!(p.buffered(), 0);
    // 2000 ms is 76.56 frames: 77 are dropped in total.
    p.process(&mp3_stream(30), None, &mut sink);
    assert_eq!(sink.len(), 3);
}

#[test]
fn probe_then_packetize() {
    let data = adts_stream(&[20, 30, 40]);
    let Some(StreamFormat::Adts(header)) = probe(&data) else {
        panic!("ADTS stream not detected");
    };
    let config = TrackConfig::new(header.sample_rate, u16::from(header.channels));
    let mut p = AacPacketizer::new(&config, header.id, header.profile).unwrap();
    let mut sink: Vec<Packet> = Vec::new();
    p.process(&data, None, &mut sink);
    assert_eq!(p.header().codec_id, "A_AAC/MPEG2/LC");
    assert_eq!(sink.iter().map(Packet::size).collect::<Vec<_>>(), vec![20, 30, 40]);
}

#[test]
fn pcm_linear_rate_and_silence() {
    let config = TrackConfig::new(8000, 1)
        .with_pcm_interleave(10)
        .with_displacement_ms(100)
        .with_linear(LinearRate::new(2, 1));
    let mut p = PcmPacketizer::new(&config).unwrap();
    let mut sink: Vec<Packet> = Vec::new();
    p.process(&[1u8; 1600], None, &mut sink);
    // 1600 bytes of silence then 1600 of audio, 1600 bytes per packet.
    assert_eq!(sink.len(), 2);
    assert!(sink[0].payload.iter().all(|&b| b == 0));
    assert!(sink[1].payload.iter().all(|&b| b == 1));
    assert_eq!(sink[1].timestamp_ms, 200);
}

#[derive(Default)]
struct TrackSink {
    header: Option<TrackHeader>,
    packets: Vec<Packet>,
}

impl PacketSink for TrackSink {
    fn set_header(&mut self, header: &TrackHeader) {
        assert!(self.header.is_none());
        self.header = Some(header.clone());
    }

    fn add_packet(&mut self, packet: Packet) {
        assert!(self.header.is_some());
        self.packets.push(packet);
    }
}

#[test]
fn registry_routes_interleaved_chunks() {
    let registry = TrackRegistry::new();
    registry.add(1, Box::new(mp3_packetizer(0))).unwrap();
    registry.add(2, Box::new(aac_packetizer())).unwrap();

    let mp3 = mp3_stream(4);
    let aac = adts_stream(&[50, 50, 50, 50]);
    let mut mp3_sink = TrackSink::default();
    let mut aac_sink = TrackSink::default();

    for (m, a) in mp3.chunks(300).zip(aac.chunks(25)) {
        registry.route(1, m, None, &mut mp3_sink).unwrap();
        registry.route(2, a, None, &mut aac_sink).unwrap();
    }
    for m in mp3.chunks(300).skip(aac.chunks(25).count()) {
        registry.route(1, m, None, &mut mp3_sink).unwrap();
    }
    for a in aac.chunks(25).skip(mp3.chunks(300).count()) {
        registry.route(2, a, None, &mut aac_sink).unwrap();
    }

    assert_eq!(mp3_sink.header.unwrap().codec_id, "A_MPEG/L3");
    assert_eq!(aac_sink.header.unwrap().codec_id, "A_AAC/MPEG2/LC");
    assert_eq!(mp3_sink.packets.len(), 4);
    assert_eq!(aac_sink.packets.len(), 4);

    assert!(matches!(
        registry.route(3, &[], None, &mut TrackSink::default()),
        Err(Error::TrackNotFound(3))
    ));
}

#[test]
fn unsupported_pcm_depth_is_an_error() {
    let config = TrackConfig::new(48000, 2).with_bits_per_sample(24);
    let err = PcmPacketizer::new(&config).unwrap_err();
    assert!(err.to_string().contains("24"));
}

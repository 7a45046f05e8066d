use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use esmux::{
    AacPacketizer, LinearRate, Mp3Packetizer, Packet, PacketSink, Packetizer, PcmPacketizer,
    ProcessStatus, StreamFormat, TrackConfig, TrackHeader, probe,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Auto,
    Mp3,
    Aac,
    Pcm,
}

#[derive(Parser)]
#[command(
    name = "esmux",
    about = "Packetize an MP3, ADTS AAC or raw PCM elementary stream"
)]
struct Args {
    /// Input elementary stream
    input: PathBuf,

    /// Stream format; `auto` probes the first bytes of the file
    #[arg(long, short, value_enum, default_value_t = Format::Auto)]
    format: Format,

    /// Sample rate in Hz (PCM, or override for the other formats)
    #[arg(long)]
    rate: Option<u32>,

    /// Channel count (PCM, or override for the other formats)
    #[arg(long)]
    channels: Option<u16>,

    /// PCM bits per sample
    #[arg(long, default_value_t = 16)]
    bits: u16,

    /// PCM packets per second
    #[arg(long, default_value_t = esmux::config::DEFAULT_PCM_INTERLEAVE)]
    interleave: u32,

    /// Displacement in milliseconds; negative drops audio, positive inserts silence
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    sync: i64,

    /// Linear timestamp factor as `num/den`
    #[arg(long, default_value_t = LinearRate::IDENTITY)]
    linear: LinearRate,

    /// Bytes handed to the packetizer per call
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,
}

/// Prints one line per packet and keeps totals for the summary.
#[derive(Default)]
struct PrintSink {
    packets: u64,
    bytes: u64,
    last_timestamp_ms: Option<i64>,
}

impl PacketSink for PrintSink {
    fn set_header(&mut self, header: &TrackHeader) {
        match header.bits_per_sample {
            Some(bits) => println!(
                "track {:016x}: {} {} Hz, {} channel(s), {} bits",
                header.uid, header.codec_id, header.sample_rate, header.channels, bits
            ),
            None => println!(
                "track {:016x}: {} {} Hz, {} channel(s)",
                header.uid, header.codec_id, header.sample_rate, header.channels
            ),
        }
    }

    fn add_packet(&mut self, packet: Packet) {
        println!(
            "{:>8} {:>10} ms {:>6} bytes",
            self.packets,
            packet.timestamp_ms,
            packet.size()
        );
        self.packets += 1;
        self.bytes += packet.size() as u64;
        self.last_timestamp_ms = Some(packet.timestamp_ms);
    }
}

fn build_packetizer(args: &Args, data: &[u8]) -> Result<Box<dyn Packetizer>, String> {
    let detected = match args.format {
        Format::Pcm => None,
        Format::Auto | Format::Mp3 | Format::Aac => {
            Some(probe(data).ok_or("could not detect the stream format")?)
        }
    };

    let rate = args
        .rate
        .or(detected.map(|f| f.sample_rate()))
        .ok_or("--rate is required for PCM input")?;
    let channels = args
        .channels
        .or(detected.map(|f| f.channels()))
        .ok_or("--channels is required for PCM input")?;

    let config = TrackConfig::new(rate, channels)
        .with_name(args.input.display().to_string())
        .with_bits_per_sample(args.bits)
        .with_pcm_interleave(args.interleave)
        .with_displacement_ms(args.sync)
        .with_linear(args.linear);

    let packetizer: Box<dyn Packetizer> = match (args.format, detected) {
        (Format::Pcm, _) => Box::new(PcmPacketizer::new(&config).map_err(|e| e.to_string())?),
        (Format::Auto | Format::Mp3, Some(StreamFormat::Mp3(_))) => {
            Box::new(Mp3Packetizer::new(&config).map_err(|e| e.to_string())?)
        }
        (Format::Auto | Format::Aac, Some(StreamFormat::Adts(h))) => Box::new(
            AacPacketizer::new(&config, h.id, h.profile).map_err(|e| e.to_string())?,
        ),
        (_, Some(StreamFormat::Adif(_))) => {
            return Err("ADIF streams carry no frame boundaries and cannot be packetized".into());
        }
        (format, Some(found)) => {
            return Err(format!("requested {format:?} but found {found}"));
        }
        (_, None) => return Err("could not detect the stream format".into()),
    };
    Ok(packetizer)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let data = match std::fs::read(&args.input) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read {}: {}", args.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut packetizer = match build_packetizer(&args, &data) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {}", args.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut sink = PrintSink::default();
    let mut malformed = 0u64;
    for chunk in data.chunks(args.chunk_size.max(1)) {
        let status = packetizer.process(chunk, None, &mut sink);
        if let ProcessStatus::Malformed { packet_number } = status {
            tracing::warn!(packet_number, "malformed frame skipped");
            malformed += 1;
        }
    }
    // Each call resumes scanning after a malformed header; drain what is left.
    while let ProcessStatus::Malformed { packet_number } = packetizer.process(&[], None, &mut sink)
    {
        tracing::warn!(packet_number, "malformed frame skipped");
        malformed += 1;
    }

    println!(
        "{} packets, {} bytes, last timestamp {} ms, {} malformed, {} bytes left unprocessed",
        sink.packets,
        sink.bytes,
        sink.last_timestamp_ms.unwrap_or(0),
        malformed,
        packetizer.buffered()
    );

    ExitCode::SUCCESS
}

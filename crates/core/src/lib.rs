pub mod bits;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod packetizer;
pub mod probe;
pub mod sync;
pub mod track;

pub use config::{LinearRate, TrackConfig};
pub use error::{Error, Result};
pub use packetizer::{
    AacPacketizer, Mp3Packetizer, Packet, PacketSink, Packetizer, PcmPacketizer, ProcessStatus,
    TrackHeader,
};
pub use probe::{StreamFormat, probe};
pub use track::{Track, TrackRegistry};

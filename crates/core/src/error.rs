//! Error types for the packetizer library.

use std::fmt;

/// Errors that can occur in the packetizer library.
///
/// Malformed input never shows up here: codec functions return `None` and
/// packetizers report [`ProcessStatus::Malformed`](crate::ProcessStatus::Malformed)
/// so scanning can resume. Variants cover the failures a caller must act on:
///
/// - **Configuration**: [`UnsupportedConfiguration`](Self::UnsupportedConfiguration)
///   is raised by packetizer constructors before any data flows.
/// - **Routing**: [`TrackNotFound`](Self::TrackNotFound) from the
///   [`TrackRegistry`](crate::track::TrackRegistry).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Track configuration rejected at construction time.
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(ConfigErrorKind),

    /// No track with the given id is registered.
    #[error("track not found: {0}")]
    TrackNotFound(u32),

    /// A track with the given id is already registered.
    #[error("track already registered: {0}")]
    DuplicateTrack(u32),
}

/// Specific kind of configuration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// PCM input other than 16 bits per sample.
    BitsPerSample(u16),
    /// Interleave factor of zero, or one that does not divide the byte rate.
    Interleave { factor: u32, bytes_per_second: u64 },
    /// Zero channels.
    Channels,
    /// Zero sample rate.
    SampleRate,
    /// Linear rate factor with a zero denominator.
    LinearRate,
    /// Displacement beyond the supported range, in milliseconds.
    Displacement(i64),
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitsPerSample(bits) => {
                write!(f, "only 16 bits per sample are supported (got {bits})")
            }
            Self::Interleave {
                factor,
                bytes_per_second,
            } => write!(
                f,
                "interleave factor {factor} does not evenly divide {bytes_per_second} bytes/s"
            ),
            Self::Channels => write!(f, "channel count must be non-zero"),
            Self::SampleRate => write!(f, "sample rate must be non-zero"),
            Self::LinearRate => write!(f, "linear rate denominator must be non-zero"),
            Self::Displacement(ms) => write!(
                f,
                "displacement of {ms} ms exceeds the supported {} ms",
                crate::config::MAX_DISPLACEMENT_MS
            ),
        }
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigErrorKind, Error, Result};

/// Default number of PCM packets per second of audio.
pub const DEFAULT_PCM_INTERLEAVE: u32 = 50;

/// Largest accepted displacement magnitude: 24 hours.
pub const MAX_DISPLACEMENT_MS: i64 = 24 * 60 * 60 * 1000;

/// Rational speed multiplier applied to derived timestamps.
///
/// Parsed from `"num/den"` or a bare integer (`"1"` is `1/1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearRate {
    pub num: u64,
    pub den: u64,
}

impl LinearRate {
    pub const IDENTITY: Self = Self { num: 1, den: 1 };

    pub fn new(num: u64, den: u64) -> Self {
        Self { num, den }
    }

    pub fn is_identity(&self) -> bool {
        self.num == self.den
    }

    /// `value / divisor * num / den`, rounded toward zero, as a timestamp.
    pub(crate) fn scale(&self, value: u128, divisor: u128) -> i64 {
        let den = divisor * u128::from(self.den);
        if den == 0 {
            return 0;
        }
        value
            .checked_mul(u128::from(self.num))
            .and_then(|scaled| i64::try_from(scaled / den).ok())
            .unwrap_or(i64::MAX)
    }
}

impl Default for LinearRate {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for LinearRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for LinearRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (num, den) = s.split_once('/').unwrap_or((s, "1"));
        let num: u64 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid numerator in {s:?}"))?;
        let den: u64 = den
            .trim()
            .parse()
            .map_err(|_| format!("invalid denominator in {s:?}"))?;
        if den == 0 {
            return Err(format!("zero denominator in {s:?}"));
        }
        Ok(Self { num, den })
    }
}

/// Per-track configuration supplied by the multiplexer at packetizer
/// construction.
///
/// `displacement_ms` and `linear` come from the external sync solver:
/// a negative displacement drops audio from the start of the track, a
/// positive one inserts silence.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Name used for the packetizer's tracing span.
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub displacement_ms: i64,
    pub linear: LinearRate,
    /// PCM packets per second of audio.
    pub pcm_interleave: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            name: "audio".to_string(),
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            displacement_ms: 0,
            linear: LinearRate::IDENTITY,
            pcm_interleave: DEFAULT_PCM_INTERLEAVE,
        }
    }
}

impl TrackConfig {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_bits_per_sample(mut self, bits: u16) -> Self {
        self.bits_per_sample = bits;
        self
    }

    pub fn with_displacement_ms(mut self, ms: i64) -> Self {
        self.displacement_ms = ms;
        self
    }

    pub fn with_linear(mut self, linear: LinearRate) -> Self {
        self.linear = linear;
        self
    }

    pub fn with_pcm_interleave(mut self, factor: u32) -> Self {
        self.pcm_interleave = factor;
        self
    }

    /// Checks shared by every packetizer.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::UnsupportedConfiguration(ConfigErrorKind::SampleRate));
        }
        if self.channels == 0 {
            return Err(Error::UnsupportedConfiguration(ConfigErrorKind::Channels));
        }
        if self.linear.den == 0 {
            return Err(Error::UnsupportedConfiguration(ConfigErrorKind::LinearRate));
        }
        if self.displacement_ms.unsigned_abs() > MAX_DISPLACEMENT_MS.unsigned_abs() {
            return Err(Error::UnsupportedConfiguration(
                ConfigErrorKind::Displacement(self.displacement_ms),
            ));
        }
        Ok(())
    }
}

//! Audio/video displacement correction.
//!
//! A track is configured once with a signed displacement. Negative means the
//! audio starts early and has to lose material from its front; positive means
//! it starts late and silence is inserted ahead of it. The corrector only
//! ever drops or inserts whole units (frames for compressed formats, sample
//! frames for PCM), so alignment is preserved and the residual error is
//! bounded by half a unit.

use crate::config::LinearRate;

const MICROS_PER_MS: i64 = 1_000;
const MICROS_PER_SEC: u64 = 1_000_000;

/// What to do with the next frame of a frame-granular stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Emit the frame unchanged.
    Pass,
    /// Discard the frame.
    Drop,
    /// Emit a copy of the frame with a zeroed payload, keeping the original
    /// for the next call.
    Silence,
}

/// What to do with the front of the next PCM chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteCorrection {
    Pass,
    /// Prepend this many zero bytes.
    Pad(usize),
    /// Drop this many bytes from the front of the chunk.
    Skip(usize),
}

/// Per-track synchronization state.
#[derive(Debug, Clone)]
pub struct SyncState {
    debt_us: i64,
    skip_bytes: u64,
    linear: LinearRate,
}

impl SyncState {
    pub fn new(displacement_ms: i64, linear: LinearRate) -> Self {
        Self {
            debt_us: displacement_ms.saturating_mul(MICROS_PER_MS),
            skip_bytes: 0,
            linear,
        }
    }

    pub fn linear(&self) -> LinearRate {
        self.linear
    }

    /// Outstanding displacement in microseconds.
    pub fn debt_us(&self) -> i64 {
        self.debt_us
    }

    /// True once all displacement has been applied.
    pub fn is_settled(&self) -> bool {
        self.debt_us == 0 && self.skip_bytes == 0
    }

    /// Decide the fate of one frame lasting `unit_us` microseconds.
    pub fn correct_frame(&mut self, unit_us: i64) -> Correction {
        let half = (unit_us / 2).unsigned_abs();
        if self.debt_us.unsigned_abs() <= half {
            self.debt_us = 0;
            return Correction::Pass;
        }

        let correction = if self.debt_us < 0 {
            self.debt_us = self.debt_us.saturating_add(unit_us);
            Correction::Drop
        } else {
            self.debt_us = self.debt_us.saturating_sub(unit_us);
            Correction::Silence
        };
        if self.debt_us.unsigned_abs() <= half {
            self.debt_us = 0;
        }

        tracing::trace!(?correction, debt_us = self.debt_us, "frame sync correction");
        correction
    }

    /// Decide how to treat the front of a PCM chunk of `available` bytes.
    ///
    /// The whole displacement is converted to bytes on first use, rounded
    /// down to a multiple of `block_align` so samples stay interleaved.
    /// Padding is returned once; skipping continues across calls until the
    /// byte count is exhausted.
    pub fn correct_bytes(
        &mut self,
        available: usize,
        bytes_per_second: u64,
        block_align: u64,
    ) -> ByteCorrection {
        if self.debt_us != 0 {
            let bytes = u128::from(bytes_per_second) * u128::from(self.debt_us.unsigned_abs())
                / u128::from(MICROS_PER_SEC);
            let bytes = u64::try_from(bytes).unwrap_or(u64::MAX);
            let bytes = bytes - bytes % block_align.max(1);
            let positive = self.debt_us > 0;
            self.debt_us = 0;
            tracing::debug!(bytes, positive, "PCM displacement converted to bytes");
            if positive {
                return if bytes > 0 {
                    ByteCorrection::Pad(usize::try_from(bytes).unwrap_or(usize::MAX))
                } else {
                    ByteCorrection::Pass
                };
            }
            self.skip_bytes = bytes;
        }

        if self.skip_bytes > 0 {
            let n = self.skip_bytes.min(available as u64);
            self.skip_bytes -= n;
            return ByteCorrection::Skip(n as usize);
        }
        ByteCorrection::Pass
    }
}

/// Duration of `samples` at `sample_rate`, in microseconds.
pub fn unit_duration_us(samples: u32, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    (u64::from(samples) * MICROS_PER_SEC / u64::from(sample_rate)) as i64
}

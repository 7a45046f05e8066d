//! Bounded MSB-first bit reader.

/// Bit-level reader over a byte slice.
///
/// Bits are consumed most-significant first. The cursor never indexes past
/// the end of the slice: a read that would overrun sets a sticky
/// `exceeded` flag and returns `None` without moving, and every later read
/// on the same cursor returns `None` as well.
///
/// ```
/// use esmux::bits::BitCursor;
///
/// let mut bc = BitCursor::new(&[0b1010_0000, 0xff]);
/// assert_eq!(bc.get_bits(3), Some(0b101));
/// bc.byte_align();
/// assert_eq!(bc.get_bits(8), Some(0xff));
/// assert_eq!(bc.get_bit(), None);
/// assert!(bc.is_exceeded());
/// ```
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    bit_len: usize,
    pos: usize,
    exceeded: bool,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_len: data.len() * 8,
            pos: 0,
            exceeded: false,
        }
    }

    /// Read `n` bits (0..=32) as an unsigned big-endian value.
    pub fn get_bits(&mut self, n: u32) -> Option<u32> {
        if !self.reserve(n as usize) || n > 32 {
            self.exceeded = true;
            return None;
        }

        let mut value: u64 = 0;
        let mut remaining = n as usize;
        while remaining > 0 {
            let byte = self.data[self.pos / 8];
            let avail = 8 - self.pos % 8;
            let take = avail.min(remaining);
            let bits = (byte >> (avail - take)) & (((1u16 << take) - 1) as u8);
            value = (value << take) | u64::from(bits);
            self.pos += take;
            remaining -= take;
        }

        Some(value as u32)
    }

    pub fn get_bit(&mut self) -> Option<bool> {
        self.get_bits(1).map(|b| b == 1)
    }

    /// Advance past `n` bits without decoding them.
    pub fn skip_bits(&mut self, n: usize) -> Option<()> {
        if !self.reserve(n) {
            self.exceeded = true;
            return None;
        }
        self.pos += n;
        Some(())
    }

    /// Move to the next byte boundary, discarding the rest of the current byte.
    pub fn byte_align(&mut self) {
        // bit_len is a whole number of bytes, so rounding up stays in range.
        self.pos = self.pos.div_ceil(8) * 8;
    }

    pub fn bit_position(&self) -> usize {
        self.pos
    }

    pub fn bits_left(&self) -> usize {
        self.bit_len - self.pos
    }

    /// True once any read has been rejected for running past the end.
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    fn reserve(&self, n: usize) -> bool {
        !self.exceeded && n <= self.bits_left()
    }
}

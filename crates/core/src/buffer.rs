/// Byte accumulator for partial frames carried across `process` calls.
///
/// Grows at the back, shrinks only from the front. Each packetizer owns its
/// own buffer; nothing hands out mutable access to the bytes.
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    data: Vec<u8>,
}

impl ReassemblyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Drop `n` bytes from the front. Consuming more than is buffered
    /// empties the buffer.
    pub fn consume_front(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.drain(..n);
    }

    /// Drop everything except the last `n` bytes.
    pub fn retain_tail(&mut self, n: usize) {
        let excess = self.data.len().saturating_sub(n);
        self.consume_front(excess);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

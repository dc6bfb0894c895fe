// In-memory sink with an optional hard capacity.

use std::io;

use super::traits::ByteSink;

#[derive(Debug, Default)]
pub struct MemoryWriter {
    buf: Vec<u8>,
    capacity: Option<usize>,
}

impl MemoryWriter {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that accepts at most `capacity` bytes; appends beyond the
    /// limit are clamped to the fitting prefix.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl ByteSink for MemoryWriter {
    fn append(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.remaining_capacity().min(data.len() as u64) as usize;
        self.buf.extend_from_slice(&data[..room]);
        Ok(room)
    }

    fn offset(&self) -> u64 {
        self.buf.len() as u64
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.buf.clear();
        Ok(())
    }

    fn remaining_capacity(&self) -> u64 {
        match self.capacity {
            Some(cap) => (cap - self.buf.len().min(cap)) as u64,
            None => u64::MAX,
        }
    }
}

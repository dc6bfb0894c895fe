use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

/// Destination for downloaded bytes — a file on disk or an in-memory buffer.
///
/// `append` never writes past `remaining_capacity`: an oversized chunk is
/// clamped to the fitting prefix and the short count is returned. A short
/// count is the backpressure signal — the session feeding this sink must stop
/// delivering data for it.
pub trait ByteSink: Send {
    /// Append bytes, returning how many were actually written.
    fn append(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Current end of the written byte stream.
    fn offset(&self) -> u64;

    /// Discard everything written so far and reset the offset to zero.
    fn truncate(&mut self) -> io::Result<()>;

    /// Bytes that may still be appended. `u64::MAX` means unbounded.
    fn remaining_capacity(&self) -> u64;
}

/// A sink shared between a task and (optionally) the caller that supplied it.
/// The task drops its reference when the transfer finishes; a caller keeps
/// its own clone to inspect the result.
pub type SharedSink = Arc<Mutex<dyn ByteSink>>;

// Task model — configuration, live status, and the opaque handle callers hold.

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::TransferError;
use crate::writer::traits::SharedSink;

/// Opaque task handle, unique for the lifetime of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

/// What a task asks the transport to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Fetch the resource body, optionally only a byte range of it.
    Full,
    /// Continue an earlier download from the sink's current offset.
    Resume,
    /// Header-only request reporting the resource size; no body, no writes.
    SizeProbe,
}

/// Where downloaded bytes go.
pub enum Destination {
    /// Open (or create) this file and append to it.
    Path(PathBuf),
    /// Caller-supplied sink; the task only borrows a reference to it.
    Sink(SharedSink),
    /// No destination — valid only for [`TaskKind::SizeProbe`].
    None,
}

/// Parameters for one submitted task.
pub struct TaskRequest {
    pub url: String,
    pub destination: Destination,
    pub kind: TaskKind,
    pub range_offset: u64,
    pub range_size: u64,
    /// Requested part count; values below 1 are normalized to 1.
    pub parts: u32,
    /// Per-operation timeout in seconds; 0 means the crate default.
    pub timeout_secs: u32,
    pub retry_limit: u32,
}

impl TaskRequest {
    pub fn new(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            url: url.into(),
            destination,
            kind: TaskKind::Full,
            range_offset: 0,
            range_size: 0,
            parts: 1,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_limit: 0,
        }
    }
}

/// Task lifecycle. Monotonic: `Queued → Downloading → Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Downloading,
    Finished,
}

/// Point-in-time copy of a task's progress.
///
/// There is no failed state: a task that errored still reaches `Finished`
/// with `error` set, so callers must check both fields.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub state: TaskState,
    pub error: Option<TransferError>,
    pub bytes_downloaded: u64,
    /// Known or estimated entity size; 0 until something reports one.
    pub bytes_total: u64,
    pub retries_left: u32,
}

/// Immutable task parameters derived from the request at submit time.
#[derive(Debug, Clone)]
pub(crate) struct TaskConfig {
    pub url: String,
    pub kind: TaskKind,
    pub dest: Option<PathBuf>,
    pub range_offset: u64,
    pub range_size: u64,
    pub parts: u32,
    pub timeout: Duration,
    pub retry_limit: u32,
}

/// Registry entry. Status is published only by the worker under the registry
/// lock; the byte counter is an atomic shared with the task's live sessions.
pub(crate) struct TaskEntry {
    pub config: TaskConfig,
    pub status: TaskStatus,
    pub sink: Option<SharedSink>,
    pub progress: Arc<AtomicU64>,
    pub cancel: CancellationToken,
}

//! Concurrent HTTP(S) download engine.
//!
//! Many transfers are multiplexed onto one dedicated worker thread that owns
//! the session multiplexer; callers interact through the thread-safe
//! [`DownloadManager`] facade — submit a task, poll or block on its status,
//! cancel it at any point.

pub mod config;
pub mod engine;
pub mod error;
pub mod transport;
pub mod writer;

pub use config::ManagerConfig;
pub use engine::manager::DownloadManager;
pub use engine::task::{Destination, TaskId, TaskKind, TaskRequest, TaskState, TaskStatus};
pub use error::TransferError;
pub use transport::traits::{ByteRange, ContentInfo, FetchReply, Transport, TransferRequest};
pub use writer::traits::{ByteSink, SharedSink};

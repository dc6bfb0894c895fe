// Transport sessions — one per network connection, built from the task's kind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::task::{TaskConfig, TaskId, TaskKind};
use crate::error::TransferError;
use crate::transport::traits::{ByteRange, Transport, TransferRequest};
use crate::writer::traits::SharedSink;

/// Completion event the worker reaps off the multiplexer.
pub(crate) struct SessionOutcome {
    pub task: TaskId,
    pub error: Option<TransferError>,
    /// Entity length the server reported, when it reported one.
    pub reported_total: Option<u64>,
}

/// Build the session future for an admitted task. The future performs no I/O
/// until the worker's multiplexer polls it.
pub(crate) fn build_session(
    task: TaskId,
    config: &TaskConfig,
    sink: Option<SharedSink>,
    progress: Arc<AtomicU64>,
    cancel: CancellationToken,
    transport: Arc<dyn Transport>,
) -> BoxFuture<'static, SessionOutcome> {
    let config = config.clone();
    match config.kind {
        TaskKind::SizeProbe => run_probe(task, config, cancel, transport).boxed(),
        TaskKind::Full | TaskKind::Resume => {
            run_transfer(task, config, sink, progress, cancel, transport).boxed()
        }
    }
}

async fn run_probe(
    task: TaskId,
    config: TaskConfig,
    cancel: CancellationToken,
    transport: Arc<dyn Transport>,
) -> SessionOutcome {
    let request = TransferRequest {
        url: config.url,
        range: None,
        timeout: config.timeout,
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => Err(TransferError::Cancelled),
        r = transport.probe(&request) => r,
    };

    match result {
        Ok(info) => SessionOutcome {
            task,
            error: info.content_length.is_none().then_some(TransferError::NoContentLength),
            reported_total: info.content_length,
        },
        Err(err) => SessionOutcome {
            task,
            error: Some(err),
            reported_total: None,
        },
    }
}

async fn run_transfer(
    task: TaskId,
    config: TaskConfig,
    sink: Option<SharedSink>,
    progress: Arc<AtomicU64>,
    cancel: CancellationToken,
    transport: Arc<dyn Transport>,
) -> SessionOutcome {
    let Some(sink) = sink else {
        // Submit validation guarantees a sink for download kinds.
        return SessionOutcome {
            task,
            error: Some(TransferError::Write("no destination sink".into())),
            reported_total: None,
        };
    };

    let range = match config.kind {
        // The resumption point comes from the sink itself, not the config.
        TaskKind::Resume => Some(ByteRange {
            offset: sink.lock().offset(),
            length: None,
        }),
        _ => {
            if config.range_offset == 0 && config.range_size == 0 {
                None
            } else {
                Some(ByteRange {
                    offset: config.range_offset,
                    length: (config.range_size > 0).then_some(config.range_size),
                })
            }
        }
    };

    let request = TransferRequest {
        url: config.url.clone(),
        range,
        timeout: config.timeout,
    };

    let reply = tokio::select! {
        _ = cancel.cancelled() => {
            return SessionOutcome { task, error: Some(TransferError::Cancelled), reported_total: None };
        }
        r = transport.fetch(&request) => match r {
            Ok(reply) => reply,
            Err(err) => {
                return SessionOutcome { task, error: Some(err), reported_total: None };
            }
        },
    };

    let reported_total = reply.content_length;
    let mut body = reply.body;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                return SessionOutcome { task, error: Some(TransferError::Cancelled), reported_total };
            }
            n = tokio::time::timeout(config.timeout, body.next()) => n,
        };

        let chunk = match next {
            Err(_) => {
                return SessionOutcome { task, error: Some(TransferError::Timeout), reported_total };
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                return SessionOutcome { task, error: Some(err), reported_total };
            }
            Ok(Some(Ok(bytes))) => bytes,
        };

        let written = match sink.lock().append(&chunk) {
            Ok(n) => n,
            Err(err) => {
                return SessionOutcome {
                    task,
                    error: Some(TransferError::from(err)),
                    reported_total,
                };
            }
        };
        progress.fetch_add(written as u64, Ordering::Relaxed);

        if written < chunk.len() {
            // Sink capacity reached; stop feeding this session.
            debug!(task = task.0, written, chunk = chunk.len(), "sink full, stopping transfer");
            break;
        }
    }

    SessionOutcome {
        task,
        error: None,
        reported_total,
    }
}

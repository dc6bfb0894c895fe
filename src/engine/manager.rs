// Thread-safe facade over the download engine. Callers submit and observe;
// a single worker thread drives every transfer.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::task::{
    Destination, TaskConfig, TaskEntry, TaskId, TaskKind, TaskRequest, TaskState, TaskStatus,
};
use super::worker::Worker;
use crate::config::{ManagerConfig, DEFAULT_TIMEOUT_SECS};
use crate::transport::http_transport::HttpTransport;
use crate::transport::traits::Transport;
use crate::writer::file_writer::FileWriter;
use crate::writer::traits::SharedSink;

pub(crate) struct ManagerState {
    pub pending: VecDeque<TaskId>,
    pub tasks: HashMap<TaskId, TaskEntry>,
}

/// State shared between the facade and the worker thread. The queue,
/// registry, and statuses live behind one coarse lock; live session handles
/// never appear here — they are owned by the worker loop.
pub(crate) struct Shared {
    pub state: Mutex<ManagerState>,
    /// Signalled at the worker's reap step whenever a task finishes.
    pub done: Condvar,
    /// Wakes the worker after a submit or cancel.
    pub wake: Notify,
    pub shutdown: CancellationToken,
}

pub struct DownloadManager {
    shared: Arc<Shared>,
    next_id: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl DownloadManager {
    /// Build a manager over the real HTTP transport. Fails if the network
    /// stack cannot be initialized; a failed manager is not usable.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport)
    }

    /// Build a manager over a caller-provided transport. Tests use this to
    /// drive the engine without a network.
    pub fn with_transport(config: ManagerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("cannot initialize worker runtime")?;

        let shared = Arc::new(Shared {
            state: Mutex::new(ManagerState {
                pending: VecDeque::new(),
                tasks: HashMap::new(),
            }),
            done: Condvar::new(),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
        });

        let worker = Worker {
            shared: Arc::clone(&shared),
            transport,
            max_sessions: config.max_sessions.max(1),
        };

        let handle = std::thread::Builder::new()
            .name("fetchmux-worker".into())
            .spawn(move || worker.run(runtime))
            .context("cannot spawn worker thread")?;

        Ok(Self {
            shared,
            next_id: AtomicU64::new(1),
            worker: Some(handle),
        })
    }

    /// Validate the request, create the default sink if needed, and queue the
    /// task. Returns without touching the network; a sink that cannot be
    /// created fails the whole call and no task is registered.
    pub fn submit(&self, request: TaskRequest) -> Result<TaskId> {
        if request.url.is_empty() {
            bail!("task has an empty URL");
        }

        let mut dest = None;
        let sink: Option<SharedSink> = match (request.kind, request.destination) {
            // Probes never write, so they get no sink even when given one.
            (TaskKind::SizeProbe, _) => None,
            (_, Destination::Sink(sink)) => Some(sink),
            (_, Destination::Path(path)) => {
                let writer = FileWriter::create(&path)?;
                dest = Some(path);
                Some(Arc::new(Mutex::new(writer)))
            }
            (_, Destination::None) => bail!("download task needs a destination"),
        };

        let timeout_secs = if request.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            request.timeout_secs
        };

        let config = TaskConfig {
            url: request.url,
            kind: request.kind,
            dest,
            range_offset: request.range_offset,
            range_size: request.range_size,
            parts: request.parts.max(1),
            timeout: Duration::from_secs(u64::from(timeout_secs)),
            retry_limit: request.retry_limit,
        };

        let entry = TaskEntry {
            status: TaskStatus {
                state: TaskState::Queued,
                error: None,
                bytes_downloaded: 0,
                bytes_total: config.range_size,
                retries_left: config.retry_limit,
            },
            config,
            sink,
            progress: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
        };

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut state = self.shared.state.lock();
            state.tasks.insert(id, entry);
            state.pending.push_back(id);
        }
        self.shared.wake.notify_one();
        debug!(task = id.0, "task submitted");

        Ok(id)
    }

    /// Remove a task in any state. A pending task never starts; an active
    /// task has its sessions cancelled and is discarded; a finished task is
    /// dropped from the registry. Unknown handles are a no-op returning
    /// `false`.
    pub fn cancel(&self, task: TaskId) -> bool {
        let entry = {
            let mut state = self.shared.state.lock();
            state.pending.retain(|&t| t != task);
            let entry = state.tasks.remove(&task);
            if let Some(entry) = &entry {
                entry.cancel.cancel();
            }
            entry
        };

        match entry {
            Some(_) => {
                debug!(task = task.0, "task cancelled");
                self.shared.wake.notify_one();
                self.shared.done.notify_all();
                true
            }
            None => false,
        }
    }

    /// Status snapshot under the registry lock; never blocks on I/O. For a
    /// live task the byte counter reflects progress as of this call.
    pub fn status(&self, task: TaskId) -> Option<TaskStatus> {
        let state = self.shared.state.lock();
        state.tasks.get(&task).map(|entry| {
            let mut status = entry.status.clone();
            if status.state != TaskState::Finished {
                status.bytes_downloaded = entry.progress.load(Ordering::Relaxed);
            }
            status
        })
    }

    /// Block the calling thread until the task reaches `Finished`, then
    /// return its final status. Returns `None` if the handle is unknown or
    /// the task is cancelled while waiting.
    pub fn wait(&self, task: TaskId) -> Option<TaskStatus> {
        let mut state = self.shared.state.lock();
        loop {
            match state.tasks.get(&task) {
                None => return None,
                Some(entry) if entry.status.state == TaskState::Finished => {
                    return Some(entry.status.clone());
                }
                Some(_) => self.shared.done.wait(&mut state),
            }
        }
    }

    /// Number of registered tasks (queued, downloading, or finished but not
    /// yet removed).
    pub fn task_count(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }
}

impl Drop for DownloadManager {
    /// Teardown order matters: signal stop, wake the worker if parked, join
    /// it; live sessions and the multiplexer are released inside the worker
    /// thread before it exits.
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.shared.shutdown.cancel();
            self.shared.wake.notify_one();
            let _ = handle.join();
        }
    }
}

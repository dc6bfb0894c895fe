// Worker loop — the single thread that owns the session multiplexer. All
// live transfers are driven here; callers only ever touch the shared queue
// and registry.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tracing::{debug, warn};

use super::manager::Shared;
use super::session::{build_session, SessionOutcome};
use super::task::{TaskId, TaskKind, TaskState};
use crate::transport::traits::Transport;

type SessionMux = FuturesUnordered<BoxFuture<'static, SessionOutcome>>;

pub(crate) struct Worker {
    pub shared: Arc<Shared>,
    pub transport: Arc<dyn Transport>,
    pub max_sessions: usize,
}

impl Worker {
    /// Entry point for the dedicated worker thread. The runtime is built by
    /// the manager so construction failures surface there; dropping it on
    /// return releases any sessions that survived shutdown.
    pub fn run(self, runtime: tokio::runtime::Runtime) {
        runtime.block_on(self.drive());
    }

    async fn drive(self) {
        let mut mux: SessionMux = FuturesUnordered::new();
        // Session count per task. Owned by this loop; completion events
        // resolve back to their task through it, and it always holds exactly
        // the tasks with live sessions.
        let mut active: HashMap<TaskId, usize> = HashMap::new();

        loop {
            if self.shared.shutdown.is_cancelled() {
                break;
            }

            self.admit(&mut mux, &mut active);

            if mux.is_empty() {
                // Nothing running and nothing admitted: park until a submit,
                // cancel, or shutdown wakes us.
                tokio::select! {
                    _ = self.shared.shutdown.cancelled() => break,
                    _ = self.shared.wake.notified() => {}
                }
                continue;
            }

            tokio::select! {
                _ = self.shared.shutdown.cancelled() => break,
                _ = self.shared.wake.notified() => {}
                outcome = mux.next() => {
                    if let Some(outcome) = outcome {
                        self.reap(outcome, &mut active);
                        // Drain every completion already ready this iteration.
                        while let Some(Some(outcome)) = mux.next().now_or_never() {
                            self.reap(outcome, &mut active);
                        }
                    }
                }
            }
        }

        debug!("worker stopping, {} sessions still live", mux.len());
    }

    /// Move queued tasks into the multiplexer while session slots remain.
    fn admit(&self, mux: &mut SessionMux, active: &mut HashMap<TaskId, usize>) {
        while mux.len() < self.max_sessions {
            let mut state = self.shared.state.lock();
            let Some(id) = state.pending.pop_front() else {
                return;
            };
            let Some(entry) = state.tasks.get_mut(&id) else {
                continue;
            };

            entry.status.state = TaskState::Downloading;
            let config = entry.config.clone();
            let sink = entry.sink.clone();
            let progress = Arc::clone(&entry.progress);
            let cancel = entry.cancel.clone();
            drop(state);

            debug!(
                task = id.0,
                url = %config.url,
                kind = ?config.kind,
                dest = ?config.dest,
                parts = config.parts,
                "task admitted"
            );

            let session = build_session(id, &config, sink, progress, cancel, Arc::clone(&self.transport));
            active.insert(id, 1);
            mux.push(session);
        }
    }

    /// Publish one session completion. When the owning task's session set
    /// empties, its sink is released and `Finished` becomes visible.
    fn reap(&self, outcome: SessionOutcome, active: &mut HashMap<TaskId, usize>) {
        let SessionOutcome {
            task,
            error,
            reported_total,
        } = outcome;

        let remaining = match active.get_mut(&task) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            active.remove(&task);
        }

        let mut state = self.shared.state.lock();
        let Some(entry) = state.tasks.get_mut(&task) else {
            // Cancelled while the session was in flight; nothing to publish.
            debug!(task = task.0, "reaped session for removed task");
            return;
        };

        entry.status.bytes_downloaded = entry.progress.load(Ordering::Relaxed);

        if let Some(total) = reported_total {
            if entry.config.kind == TaskKind::SizeProbe || entry.status.bytes_total == 0 {
                entry.status.bytes_total = total;
            }
        }

        if let Some(err) = error {
            warn!(task = task.0, error = %err, "session finished with error");
            entry.status.retries_left = entry.status.retries_left.saturating_sub(1);
            entry.status.error = Some(err);
        }

        if remaining == 0 {
            entry.sink = None;
            entry.status.state = TaskState::Finished;
            debug!(
                task = task.0,
                bytes = entry.status.bytes_downloaded,
                total = entry.status.bytes_total,
                "task finished"
            );
            drop(state);
            self.shared.done.notify_all();
        }
    }
}

// Shared test fixtures: a scriptable in-memory transport and helpers.
#![allow(dead_code)]

use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use fetchmux::{ContentInfo, FetchReply, Transport, TransferError, TransferRequest};

static INIT_TRACING: Once = Once::new();

/// Install a tracing subscriber once per test process.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Scriptable transport: serves a fixed body, honors ranges, records every
/// request, and can hold transfers open until the test releases them.
pub struct MockTransport {
    body: Bytes,
    chunk_size: usize,
    gate: Option<Semaphore>,
    fail: Option<TransferError>,
    requests: Mutex<Vec<TransferRequest>>,
}

impl MockTransport {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            chunk_size: usize::MAX,
            gate: None,
            fail: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transfers wait for a permit from [`MockTransport::release`] before
    /// serving anything.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Deliver the body in pieces of at most `size` bytes.
    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Every request fails with `error`.
    pub fn failing(mut self, error: TransferError) -> Self {
        self.fail = Some(error);
        self
    }

    /// Let `n` gated transfers proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().clone()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate semaphore closed");
            permit.forget();
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn probe(&self, request: &TransferRequest) -> Result<ContentInfo, TransferError> {
        self.requests.lock().push(request.clone());
        self.pass_gate().await;
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        Ok(ContentInfo {
            content_length: Some(self.body.len() as u64),
            supports_range: true,
        })
    }

    async fn fetch(&self, request: &TransferRequest) -> Result<FetchReply, TransferError> {
        self.requests.lock().push(request.clone());
        self.pass_gate().await;
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }

        let total = self.body.len() as u64;
        let data = match &request.range {
            None => self.body.clone(),
            Some(range) => {
                let start = range.offset.min(total);
                let end = match range.length {
                    Some(len) => (start + len).min(total),
                    None => total,
                };
                self.body.slice(start as usize..end as usize)
            }
        };

        let chunks: Vec<Result<Bytes, TransferError>> = data
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        Ok(FetchReply {
            content_length: Some(total),
            body: futures::stream::iter(chunks).boxed(),
        })
    }
}

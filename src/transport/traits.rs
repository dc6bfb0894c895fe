use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::TransferError;

/// Requested slice of the resource. `length: None` means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: Option<u64>,
}

/// One request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    pub range: Option<ByteRange>,
    /// Inactivity limit: connecting, awaiting the response, or waiting for
    /// the next body chunk may each take at most this long.
    pub timeout: Duration,
}

/// What the server reported about the resource.
#[derive(Debug, Clone, Copy)]
pub struct ContentInfo {
    pub content_length: Option<u64>,
    pub supports_range: bool,
}

/// Streamed response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransferError>> + Send>>;

/// A started transfer: the entity length the server reported (if any) plus
/// the body stream.
pub struct FetchReply {
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for FetchReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchReply")
            .field("content_length", &self.content_length)
            .field("body", &"<stream>")
            .finish()
    }
}

/// HTTP transport capability. Kept behind a trait so the engine can be
/// driven by an in-memory fake in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Header-only request: report content info without fetching a body.
    async fn probe(&self, request: &TransferRequest) -> Result<ContentInfo, TransferError>;

    /// Start a (possibly ranged) GET and return the streamed body.
    async fn fetch(&self, request: &TransferRequest) -> Result<FetchReply, TransferError>;
}

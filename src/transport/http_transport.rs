// reqwest-backed transport: one shared client, per-request range and timeout.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use reqwest::{header, redirect, Client, Response, StatusCode};
use tracing::debug;

use super::traits::{ByteRange, ContentInfo, FetchReply, Transport, TransferRequest};
use crate::config::{ManagerConfig, CONNECT_TIMEOUT_SECS, USER_AGENT};
use crate::error::TransferError;

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ManagerConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(if config.follow_redirects {
                redirect::Policy::limited(10)
            } else {
                redirect::Policy::none()
            });
        if !config.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().context("cannot build HTTP client")?;
        Ok(Self { client })
    }

    fn range_header(range: &ByteRange) -> String {
        match range.length {
            Some(len) if len > 0 => format!("bytes={}-{}", range.offset, range.offset + len - 1),
            _ => format!("bytes={}-", range.offset),
        }
    }

    /// Entity length as the server reported it: total from `Content-Range`
    /// for partial responses, otherwise `Content-Length`.
    fn entity_length(resp: &Response) -> Option<u64> {
        if resp.status() == StatusCode::PARTIAL_CONTENT {
            resp.headers()
                .get(header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit('/').next())
                .and_then(|v| v.parse::<u64>().ok())
        } else {
            resp.headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, request: &TransferRequest) -> Result<ContentInfo, TransferError> {
        let req = self.client.head(&request.url).timeout(request.timeout);
        let resp = req.send().await.map_err(TransferError::from)?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %request.url, "probe response");
        if !status.is_success() {
            return Err(TransferError::HttpStatus(status.as_u16()));
        }

        let supports_range = resp
            .headers()
            .get(header::ACCEPT_RANGES)
            .map_or(false, |v| v == "bytes");

        Ok(ContentInfo {
            content_length: Self::entity_length(&resp),
            supports_range,
        })
    }

    async fn fetch(&self, request: &TransferRequest) -> Result<FetchReply, TransferError> {
        let mut req = self.client.get(&request.url);
        if let Some(range) = &request.range {
            req = req.header(header::RANGE, Self::range_header(range));
        }

        // Bound the wait for response headers; streaming the body afterwards
        // is bounded per chunk by the session.
        let resp = tokio::time::timeout(request.timeout, req.send())
            .await
            .map_err(|_| TransferError::Timeout)?
            .map_err(TransferError::from)?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %request.url, range = ?request.range, "fetch response");
        if !status.is_success() {
            return Err(TransferError::HttpStatus(status.as_u16()));
        }

        let content_length = Self::entity_length(&resp);
        let body = Box::pin(resp.bytes_stream().map_err(TransferError::from));

        Ok(FetchReply {
            content_length,
            body,
        })
    }
}

// HttpTransport against a local fake upstream that supports Range requests.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use tokio::net::TcpListener;

use common::init_tracing;
use fetchmux::transport::HttpTransport;
use fetchmux::{ByteRange, ManagerConfig, Transport, TransferError, TransferRequest};

const TEST_SIZE: usize = 256 * 1024;

fn test_content() -> Vec<u8> {
    (0..TEST_SIZE).map(|i| (i % 256) as u8).collect()
}

async fn serve_file(req: Request) -> impl IntoResponse {
    let body = test_content();
    let total = body.len() as u64;

    if let Some(range_val) = req.headers().get(header::RANGE) {
        let range_str = range_val.to_str().unwrap_or("");
        if let Some(rest) = range_str.strip_prefix("bytes=") {
            let parts: Vec<&str> = rest.splitn(2, '-').collect();
            if parts.len() == 2 {
                let start: u64 = parts[0].parse().unwrap_or(0);
                let end: u64 = if parts[1].is_empty() {
                    total - 1
                } else {
                    parts[1].parse().unwrap_or(total - 1)
                };
                let end = end.min(total - 1);
                let slice = &body[start as usize..=end as usize];
                let content_range = format!("bytes {}-{}/{}", start, end, total);
                return (
                    StatusCode::PARTIAL_CONTENT,
                    [
                        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                        (header::CONTENT_RANGE, content_range),
                        (header::CONTENT_LENGTH, slice.len().to_string()),
                        (header::ACCEPT_RANGES, "bytes".to_string()),
                    ],
                    slice.to_vec(),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, total.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response()
}

async fn start_upstream() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new().route("/file", get(serve_file));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn request(url: String, range: Option<ByteRange>) -> TransferRequest {
    TransferRequest {
        url,
        range,
        timeout: Duration::from_secs(5),
    }
}

async fn collect(transport: &HttpTransport, req: &TransferRequest) -> Vec<u8> {
    let reply = transport.fetch(req).await.unwrap();
    let mut body = reply.body;
    let mut out = Vec::new();
    while let Some(chunk) = body.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

#[tokio::test]
async fn test_probe_reports_length_and_range_support() {
    init_tracing();
    let (addr, _handle) = start_upstream().await;
    let transport = HttpTransport::new(&ManagerConfig::default()).unwrap();

    let info = transport
        .probe(&request(format!("http://{}/file", addr), None))
        .await
        .unwrap();
    assert_eq!(info.content_length, Some(TEST_SIZE as u64));
    assert!(info.supports_range);
}

#[tokio::test]
async fn test_fetch_full_body() {
    init_tracing();
    let (addr, _handle) = start_upstream().await;
    let transport = HttpTransport::new(&ManagerConfig::default()).unwrap();

    let req = request(format!("http://{}/file", addr), None);
    let data = collect(&transport, &req).await;
    assert_eq!(data, test_content());
}

#[tokio::test]
async fn test_fetch_honors_byte_range() {
    init_tracing();
    let (addr, _handle) = start_upstream().await;
    let transport = HttpTransport::new(&ManagerConfig::default()).unwrap();

    let req = request(
        format!("http://{}/file", addr),
        Some(ByteRange {
            offset: 512,
            length: Some(100),
        }),
    );
    let data = collect(&transport, &req).await;
    assert_eq!(data, &test_content()[512..612]);
}

#[tokio::test]
async fn test_fetch_open_ended_range() {
    init_tracing();
    let (addr, _handle) = start_upstream().await;
    let transport = HttpTransport::new(&ManagerConfig::default()).unwrap();

    let offset = TEST_SIZE as u64 - 1024;
    let req = request(
        format!("http://{}/file", addr),
        Some(ByteRange {
            offset,
            length: None,
        }),
    );
    let data = collect(&transport, &req).await;
    assert_eq!(data, &test_content()[offset as usize..]);
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
    init_tracing();
    let (addr, _handle) = start_upstream().await;
    let transport = HttpTransport::new(&ManagerConfig::default()).unwrap();

    let err = transport
        .fetch(&request(format!("http://{}/missing", addr), None))
        .await
        .unwrap_err();
    assert_eq!(err, TransferError::HttpStatus(404));
}

//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use resilient_api_client::errors::{ApiError, ErrorReporter};
use resilient_api_client::http::{ApiResponse, RequestDescriptor, Transport, TransportError};
use resilient_api_client::observability::{ErrorEvent, LogEntry, Logger, PerformanceEvent, RequestEvent};

/// One dispatch seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub url: String,
    pub attempt: u32,
    pub authorization: Option<String>,
    pub headers: HeaderMap,
    pub at: tokio::time::Instant,
}

type Handler = dyn Fn(&RequestDescriptor, u32) -> Result<ApiResponse, TransportError> + Send + Sync;

/// In-process transport driven by a closure. The closure also gets the 0-based call index.
pub struct MockTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
    counter: AtomicU32,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&RequestDescriptor, u32) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            counter: AtomicU32::new(0),
        })
    }

    /// Play `outcomes` in order, repeating the last one.
    pub fn sequence(outcomes: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
        Self::new(move |_, n| {
            let index = (n as usize).min(outcomes.len() - 1);
            outcomes[index].clone()
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, TransportError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.to_string(),
            url: request.url.clone(),
            attempt: request.attempt,
            authorization: request
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            headers: request.headers.clone(),
            at: tokio::time::Instant::now(),
        });
        (self.handler)(request, n)
    }
}

/// Buffered response with an optional JSON body.
pub fn response(status: u16, body: &str) -> ApiResponse {
    let mut headers = HeaderMap::new();
    if body.starts_with('{') {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    ApiResponse::new(
        StatusCode::from_u16(status).unwrap(),
        headers,
        body.as_bytes().to_vec(),
    )
}

/// Response carrying `Retry-After: <seconds>`.
pub fn response_with_retry_after(status: u16, seconds: u64) -> ApiResponse {
    let mut response = response(status, "");
    response
        .headers
        .insert(RETRY_AFTER, HeaderValue::from_str(&seconds.to_string()).unwrap());
    response
}

/// Logger that keeps everything it sees.
#[derive(Default)]
pub struct RecordingLogger {
    pub requests: Mutex<Vec<RequestEvent>>,
    pub errors: Mutex<Vec<ErrorEvent>>,
    pub entries: Mutex<Vec<LogEntry>>,
    pub performance: Mutex<Vec<PerformanceEvent>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn entries_named(&self, message: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message == message)
            .cloned()
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn log_request(&self, event: &RequestEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn log_error(&self, event: &ErrorEvent) {
        self.errors.lock().unwrap().push(event.clone());
    }

    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }

    fn log_performance(&self, event: &PerformanceEvent) {
        self.performance.lock().unwrap().push(event.clone());
    }
}

/// Reporter that keeps escalated errors.
#[derive(Default)]
pub struct CollectingReporter {
    pub reported: Mutex<Vec<ApiError>>,
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: &ApiError) {
        self.reported.lock().unwrap().push(error.clone());
    }
}

/// Start a programmable backend on an ephemeral port.
///
/// `f` receives the raw request head and returns `(status, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_request_head(&mut socket).await;
                        let (status, body) = f(head).await;
                        let status_text = StatusCode::from_u16(status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");

                        let response_str = format!(
                            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

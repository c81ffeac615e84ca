use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, warn};

use docport_models::RequestEvent;

use crate::error::{ApiError, ApiResult};

/// A live server-push channel for one approval request.
#[async_trait]
pub trait EventStream: Send {
    /// Next decoded event; `None` once the server closed the stream.
    async fn next_event(&mut self) -> Option<ApiResult<RequestEvent>>;
}

/// Opens event streams; injected into the store so tests can hand out
/// channel-backed streams instead of real connections.
#[async_trait]
pub trait EventStreamFactory: Send + Sync {
    async fn connect(&self, request_id: i64, token: &str) -> ApiResult<Box<dyn EventStream>>;
}

/// SSE client for the portal's per-request event endpoint.
#[derive(Debug, Clone)]
pub struct SseClient {
    client: reqwest::Client,
    base_url: String,
}

impl SseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        // no request timeout: the stream stays open for as long as the
        // server keeps the request alive
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl EventStreamFactory for SseClient {
    async fn connect(&self, request_id: i64, token: &str) -> ApiResult<Box<dyn EventStream>> {
        let url = format!("{}/api/v1/events/request/{}", self.base_url, request_id);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: format!("event stream rejected with HTTP {}", status.as_u16()),
            });
        }

        debug!(request_id, "event stream connected");
        let bytes = resp.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(Box::new(SseEventStream {
            stream: Box::pin(bytes),
            buffer: String::new(),
            data_lines: Vec::new(),
        }))
    }
}

struct SseEventStream {
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>,
    buffer: String,
    /// `data:` lines of the frame currently being assembled.
    data_lines: Vec<String>,
}

impl SseEventStream {
    /// Consumes complete lines out of the buffer until a frame boundary
    /// (blank line) yields a decodable payload.
    fn next_buffered_event(&mut self) -> Option<RequestEvent> {
        while let Some(pos) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=pos).collect();
            let line = raw.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if self.data_lines.is_empty() {
                    continue; // heartbeat / comment-only frame
                }
                let payload = self.data_lines.join("\n");
                self.data_lines.clear();
                match serde_json::from_str::<RequestEvent>(&payload) {
                    Ok(event) => return Some(event),
                    Err(err) => warn!(%err, "skipping malformed event payload"),
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data_lines.push(data.trim_start().to_string());
            }
            // `event:`/`id:`/comment lines carry nothing we use
        }
        None
    }
}

#[async_trait]
impl EventStream for SseEventStream {
    async fn next_event(&mut self) -> Option<ApiResult<RequestEvent>> {
        loop {
            if let Some(event) = self.next_buffered_event() {
                return Some(Ok(event));
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                Some(Err(err)) => return Some(Err(ApiError::Transport(err))),
                None => return None,
            }
        }
    }
}

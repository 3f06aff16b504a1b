//! Opening the orchestration event stream

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::error::RelayError;
use crate::sse::{SseDecoder, SseItem, DEFAULT_MAX_FRAME_BYTES};

/// Stream of decoded frames; an `Err` item ends the connection
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseItem, RelayError>> + Send>>;

/// Something that can open an event stream for a goal
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Connect; resolves once the backend has accepted the stream
    async fn connect(&self, goal: &str) -> Result<FrameStream, RelayError>;
}

/// Event stream over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    max_frame_bytes: usize,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        let client = Client::builder()
            // No request timeout: the stream is long-lived
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        })
    }

    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// `{base}/agents/stream?goal=...`
    pub fn stream_url(&self, goal: &str) -> Result<Url, RelayError> {
        Url::parse_with_params(&format!("{}/agents/stream", self.base_url), &[("goal", goal)])
            .map_err(|e| RelayError::Config(format!("invalid stream url: {e}")))
    }

    /// Ask the backend whether it is up
    pub async fn health(&self) -> Result<String, RelayError> {
        #[derive(Deserialize)]
        struct HealthResponse {
            status: String,
        }

        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status { status, body });
        }

        let health: HealthResponse = response.json().await?;
        Ok(health.status)
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    #[instrument(skip(self, goal), fields(goal_len = goal.len()))]
    async fn connect(&self, goal: &str) -> Result<FrameStream, RelayError> {
        let url = self.stream_url(goal)?;
        debug!(url = %url, "Opening event stream");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| RelayError::Transport(format!("connect failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status { status, body });
        }

        info!(status = response.status().as_u16(), "Event stream open");

        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new(self.max_frame_bytes);

        let frames = async_stream::stream! {
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for item in decoder.push_chunk(&chunk) {
                            yield Ok(item);
                        }
                    }
                    Err(e) => {
                        yield Err(RelayError::Transport(format!("read failed: {e}")));
                        return;
                    }
                }
            }
            for item in decoder.finish() {
                yield Ok(item);
            }
        };

        Ok(Box::pin(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_stream_url_encodes_goal() {
        let transport = HttpTransport::new("http://127.0.0.1:8000/").unwrap();
        let url = transport.stream_url("Build a DEX & token").unwrap();
        assert_eq!(url.path(), "/agents/stream");
        let goal: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(goal, vec![("goal".to_string(), "Build a DEX & token".to_string())]);
    }

    #[tokio::test]
    async fn test_connect_yields_frames() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            ": hello\n\n",
            "data: {\"type\":\"heartbeat\",\"trace_id\":\"t\",\"ts\":1}\n\n",
            "data: {\"type\":\"done\",\"trace_id\":\"t\"}\n\n",
        );
        let mock = server
            .mock("GET", "/agents/stream")
            .match_query(Matcher::UrlEncoded("goal".into(), "ship it".into()))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url()).unwrap();
        let items: Vec<SseItem> = transport
            .connect("ship it")
            .await
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1],
            SseItem::Frame("{\"type\":\"done\",\"trace_id\":\"t\"}".into())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connect_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/agents/stream")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("warming up")
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url()).unwrap();
        match transport.connect("x").await {
            Err(RelayError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "warming up");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&server.url()).unwrap();
        assert_eq!(transport.health().await.unwrap(), "ok");
    }
}

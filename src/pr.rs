//! Pull-request drafts found in agent results, and their submission

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::RelayError;
use crate::store::AgentStore;

/// Title and body of a pull request proposed by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrDraft {
    pub title: String,
    pub body: String,
}

/// Shape an agent result must have to carry a draft
#[derive(Deserialize)]
struct DraftEnvelope {
    ok: bool,
    pr: PrDraft,
}

impl PrDraft {
    /// Try to read `{ ok: true, pr: { title, body } }` out of an opaque result
    pub fn from_result(result: &serde_json::Value) -> Option<Self> {
        let envelope = DraftEnvelope::deserialize(result).ok()?;
        envelope.ok.then_some(envelope.pr)
    }

    /// Request body for the backend, with any rust code block attached
    pub fn to_request(&self) -> PrRequest {
        PrRequest {
            title: self.title.clone(),
            body: self.body.clone(),
            file_content: extract_rust_code(&self.body),
        }
    }
}

/// First draft in store order, if any agent produced one
pub fn extract_pr_draft(store: &AgentStore) -> Option<PrDraft> {
    store
        .iter()
        .filter_map(|(_, state)| state.result.as_ref())
        .find_map(PrDraft::from_result)
}

fn rust_fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?is)```rust(.*?)```").ok())
        .as_ref()
}

/// Contents of the first ```rust fence, newline-terminated
pub fn extract_rust_code(body: &str) -> Option<String> {
    let captures = rust_fence()?.captures(body)?;
    let code = captures.get(1)?.as_str().trim();
    if code.is_empty() {
        None
    } else {
        Some(format!("{code}\n"))
    }
}

/// Body of `POST /api/pr`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrRequest {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
}

/// Successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrReceipt {
    pub html_url: Option<String>,
}

impl PrReceipt {
    /// Status text shown after success
    pub fn status_line(&self) -> String {
        format!("PR created: {}", self.html_url.as_deref().unwrap_or("OK"))
    }
}

/// Something that can open pull requests
#[async_trait]
pub trait PrSubmitter: Send + Sync {
    async fn submit(&self, request: &PrRequest) -> Result<PrReceipt, RelayError>;
}

/// Submits drafts to the orchestration backend over HTTP
#[derive(Debug, Clone)]
pub struct HttpPrClient {
    client: Client,
    base_url: String,
    cookie: Option<String>,
}

impl HttpPrClient {
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: None,
        })
    }

    /// Send this raw `Cookie` header with every submission
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }
}

#[async_trait]
impl PrSubmitter for HttpPrClient {
    #[instrument(skip(self, request), fields(title = %request.title))]
    async fn submit(&self, request: &PrRequest) -> Result<PrReceipt, RelayError> {
        let url = format!("{}/api/pr", self.base_url);
        let mut builder = self.client.post(&url).json(request);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let data: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();

        if !status.is_success() {
            debug!(status = status.as_u16(), body = %text, "PR submission rejected");
            return Err(RelayError::Pr(failure_message(&data)));
        }

        let html_url = data
            .get("html_url")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        info!(url = ?html_url, "PR created");
        Ok(PrReceipt { html_url })
    }
}

/// Pull a human message out of an error body
fn failure_message(data: &serde_json::Value) -> String {
    match data.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.is_empty() => return detail.clone(),
        Some(serde_json::Value::Object(detail)) => {
            if let Some(message) = detail.get("message").and_then(|m| m.as_str()) {
                return message.to_string();
            }
        }
        _ => {}
    }

    data.get("error")
        .and_then(|e| e.as_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("PR creation failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentName;
    use mockito::Matcher;
    use serde_json::json;

    // === Draft Extraction Tests ===

    #[test]
    fn test_from_result_accepts_well_formed() {
        let result = json!({"ok": true, "pr": {"title": "T", "body": "B"}, "extra": 1});
        assert_eq!(
            PrDraft::from_result(&result),
            Some(PrDraft { title: "T".into(), body: "B".into() })
        );
    }

    #[test]
    fn test_from_result_rejects_other_shapes() {
        for value in [
            json!({"ok": false, "pr": {"title": "T", "body": "B"}}),
            json!({"ok": "true", "pr": {"title": "T", "body": "B"}}),
            json!({"ok": true, "pr": {"title": "T"}}),
            json!({"ok": true, "pr": "T"}),
            json!({"ok": true}),
            json!([1, 2, 3]),
            json!("text"),
            serde_json::Value::Null,
        ] {
            assert_eq!(PrDraft::from_result(&value), None, "{value}");
        }
    }

    #[test]
    fn test_extract_first_in_store_order() {
        let mut store = AgentStore::new();
        store.get_mut(AgentName::Economy).unwrap().result =
            Some(json!({"ok": true, "pr": {"title": "late", "body": ""}}));
        store.get_mut(AgentName::Frontend).unwrap().result =
            Some(json!({"ok": true, "pr": {"title": "early", "body": ""}}));
        store.get_mut(AgentName::SmartProgram).unwrap().result = Some(json!({"ok": false}));

        assert_eq!(extract_pr_draft(&store).unwrap().title, "early");
    }

    #[test]
    fn test_extract_none_without_results() {
        assert_eq!(extract_pr_draft(&AgentStore::new()), None);
    }

    // === Code Fence Tests ===

    #[test]
    fn test_extract_rust_code() {
        let body = "Adds a counter.\n\n```Rust\nfn main() {}\n```\n\n```rust\nignored\n```";
        assert_eq!(extract_rust_code(body), Some("fn main() {}\n".to_string()));
    }

    #[test]
    fn test_extract_rust_code_missing_or_empty() {
        assert_eq!(extract_rust_code("no code here"), None);
        assert_eq!(extract_rust_code("```rust\n   \n```"), None);
        assert_eq!(extract_rust_code("```python\nprint()\n```"), None);
    }

    #[test]
    fn test_request_serialization_skips_missing_file() {
        let draft = PrDraft { title: "T".into(), body: "plain".into() };
        let value = serde_json::to_value(draft.to_request()).unwrap();
        assert_eq!(value, json!({"title": "T", "body": "plain"}));
    }

    #[test]
    fn test_failure_message_variants() {
        assert_eq!(failure_message(&json!({"detail": "Not logged in"})), "Not logged in");
        assert_eq!(
            failure_message(&json!({"detail": {"message": "No file content provided."}})),
            "No file content provided."
        );
        assert_eq!(failure_message(&json!({"error": "boom"})), "boom");
        assert_eq!(failure_message(&serde_json::Value::Null), "PR creation failed");
    }

    // === HTTP Tests ===

    #[tokio::test]
    async fn test_submit_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/pr")
            .match_header("cookie", "sid=abc")
            .match_body(Matcher::PartialJson(json!({
                "title": "Add counter",
                "file_content": "fn main() {}\n"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"html_url":"https://example.test/pr/1"}"#)
            .create_async()
            .await;

        let client = HttpPrClient::new(&server.url())
            .unwrap()
            .with_cookie(Some("sid=abc".into()));
        let draft = PrDraft {
            title: "Add counter".into(),
            body: "```rust\nfn main() {}\n```".into(),
        };

        let receipt = client.submit(&draft.to_request()).await.unwrap();
        assert_eq!(receipt.status_line(), "PR created: https://example.test/pr/1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_failure_uses_detail() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/pr")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Not logged in"}"#)
            .create_async()
            .await;

        let client = HttpPrClient::new(&server.url()).unwrap();
        let draft = PrDraft { title: "T".into(), body: "B".into() };

        let err = client.submit(&draft.to_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Not logged in");
    }
}

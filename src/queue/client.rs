//! HTTP client for the remote triage service.
//!
//! Two endpoints:
//! - `GET {queue_url}`: listing of every patient in the queue (any device)
//! - `GET {status_url}?userId=X&sessionId=Y`: analysis status for one case

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::SyncConfig;

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Triage service unreachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Triage service returned error (status {status})")]
    Status { status: u16 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

/// Accept strings, numbers and booleans as text; null and anything else as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept an array (keeping its text-like items) or a single string as a
/// one-item list; anything else is absent.
fn lenient_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(vec![s]),
        _ => None,
    })
}

/// One entry of the queue listing. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteQueueItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub urgency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub specialist: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub suggested_action: Option<String>,
    #[serde(default, rename = "userId", deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(default, rename = "sessionId", deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
}

/// Enrichment payload of a completed analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub urgency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symptoms: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub urgency_score: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub urgency_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub suggested_actions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub specialties: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<StatusData>,
}

/// Outcome of a queue listing fetch.
#[derive(Debug)]
pub enum QueueFetch {
    /// Well-formed, non-empty listing.
    Data(Vec<RemoteQueueItem>),
    /// Well-formed but empty listing.
    Empty,
    /// Transport failure, non-2xx or malformed body.
    Failed(ApiError),
}

/// Outcome of a status query that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheck {
    Completed(StatusData),
    Pending,
}

// ═══════════════════════════════════════════════════════════
// TriageApi
// ═══════════════════════════════════════════════════════════

/// Remote triage service, abstracted so the synchronizer can run against fakes.
#[async_trait]
pub trait TriageApi: Send + Sync {
    /// Fetch the full queue listing.
    async fn fetch_queue(&self) -> QueueFetch;

    /// Query analysis status for one case.
    async fn fetch_status(&self, user_id: &str, session_id: &str)
        -> Result<StatusCheck, ApiError>;
}

/// `reqwest`-backed implementation of [`TriageApi`].
pub struct HttpTriageApi {
    queue_url: String,
    status_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpTriageApi {
    pub fn new(queue_url: &str, status_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;

        Ok(Self {
            queue_url: queue_url.to_string(),
            status_url: status_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, ApiError> {
        Self::new(&config.queue_url, &config.status_url, config.http_timeout_secs)
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    fn map_send_error(&self, e: reqwest::Error, url: &str) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(url.to_string())
        } else if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else {
            ApiError::HttpClient(e.to_string())
        }
    }

    async fn get_json(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(|e| self.map_send_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e, url))?;
        serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }
}

/// Classify a queue listing body.
pub fn parse_queue_body(body: Value) -> QueueFetch {
    match body {
        Value::Array(items) if items.is_empty() => QueueFetch::Empty,
        Value::Array(items) => match serde_json::from_value::<Vec<RemoteQueueItem>>(Value::Array(items)) {
            Ok(items) => QueueFetch::Data(items),
            Err(e) => QueueFetch::Failed(ApiError::MalformedResponse(e.to_string())),
        },
        other => QueueFetch::Failed(ApiError::MalformedResponse(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

/// Classify a status body. Only `status == "completed"` with a data payload
/// counts as completion.
pub fn parse_status_body(body: Value) -> Result<StatusCheck, ApiError> {
    let parsed: StatusResponse =
        serde_json::from_value(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))?;

    match (parsed.status.as_deref(), parsed.data) {
        (Some("completed"), Some(data)) => Ok(StatusCheck::Completed(data)),
        _ => Ok(StatusCheck::Pending),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl TriageApi for HttpTriageApi {
    async fn fetch_queue(&self) -> QueueFetch {
        tracing::debug!(url = %self.queue_url, "Fetching patient queue");
        match self.get_json(self.client.get(&self.queue_url), &self.queue_url).await {
            Ok(body) => parse_queue_body(body),
            Err(e) => QueueFetch::Failed(e),
        }
    }

    async fn fetch_status(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<StatusCheck, ApiError> {
        let request = self
            .client
            .get(&self.status_url)
            .query(&[("userId", user_id), ("sessionId", session_id)]);
        let body = self.get_json(request, &self.status_url).await?;
        parse_status_body(body)
    }
}

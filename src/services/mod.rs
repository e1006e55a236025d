//! HTTP backends behind the tools.
//!
//! Each external service sits behind a trait so tools can be exercised
//! against the scripted doubles in [`mock`].

pub mod airtable;
pub mod anthropic;
pub mod mock;
pub mod n8n;
pub mod telegram;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Settings;
use crate::consts::{SERVER_NAME, SERVER_VERSION};
use crate::error::ServiceError;

/// Per-request timeout for every backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Filters for listing workflows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowFilter {
    pub active: Option<bool>,
    pub limit: Option<u64>,
}

/// The workflow-automation service (n8n).
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Create a workflow; returns the stored definition including its id.
    async fn create_workflow(&self, workflow: &Value) -> Result<Value, ServiceError>;
    async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<Value>, ServiceError>;
    async fn get_workflow(&self, id: &str) -> Result<Value, ServiceError>;
    async fn set_active(&self, id: &str, active: bool) -> Result<Value, ServiceError>;
}

/// The spreadsheet-like database service (Airtable).
#[async_trait]
pub trait TableBackend: Send + Sync {
    async fn base_schema(&self, base_id: &str) -> Result<Value, ServiceError>;
    async fn list_records(
        &self,
        base_id: &str,
        table: &str,
        max_records: Option<u64>,
    ) -> Result<Value, ServiceError>;
}

/// A chat message to deliver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

/// The chat-bot service (Telegram).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a message; returns the delivered message object.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<Value, ServiceError>;
    /// Fetch pending updates starting at `offset`.
    async fn get_updates(&self, offset: Option<i64>, limit: u64)
    -> Result<Vec<Value>, ServiceError>;
}

/// A single-turn LLM completion.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError>;
}

/// Every configured backend plus the per-service defaults the tools need.
#[derive(Clone, Default)]
pub struct Backends {
    pub workflows: Option<Arc<dyn WorkflowBackend>>,
    pub tables: Option<Arc<dyn TableBackend>>,
    pub default_base_id: Option<String>,
    pub chat: Option<Arc<dyn ChatBackend>>,
    pub default_chat_id: Option<String>,
    pub completer: Option<Arc<dyn Completer>>,
}

impl Backends {
    /// Build HTTP clients for every service that has credentials.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = http_client()?;
        let mut backends = Self::default();

        if let Some(s) = &settings.n8n {
            backends.workflows = Some(Arc::new(n8n::N8nClient::new(http.clone(), s)?));
            info!(base_url = %s.base_url, "n8n backend enabled");
        }
        if let Some(s) = &settings.airtable {
            backends.tables = Some(Arc::new(airtable::AirtableClient::new(http.clone(), s)?));
            backends.default_base_id = s.base_id.clone();
            info!(base_url = %s.base_url, "airtable backend enabled");
        }
        if let Some(s) = &settings.telegram {
            backends.chat = Some(Arc::new(telegram::TelegramClient::new(http.clone(), s)?));
            backends.default_chat_id = s.chat_id.clone();
            info!(base_url = %s.base_url, "telegram backend enabled");
        }
        if let Some(s) = &settings.anthropic {
            backends.completer = Some(Arc::new(anthropic::AnthropicCompleter::new(http, s)?));
            info!(model = %s.model, "anthropic completer enabled");
        }

        for service in settings.missing_services() {
            warn!(service, "no credentials configured, tools for this service are disabled");
        }

        Ok(backends)
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(format!("{SERVER_NAME}/{SERVER_VERSION}"))
        .build()
        .context("failed to build HTTP client")
}

/// Parse a configured base URL, rejecting ones that cannot carry a path.
pub(crate) fn parse_base_url(service: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid {service} base URL: {raw}"))?;
    if url.cannot_be_a_base() {
        bail!("invalid {service} base URL: {raw}");
    }
    Ok(url)
}

/// Append percent-encoded path segments to a base URL.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Read a JSON body, turning non-2xx statuses into [`ServiceError::Status`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ServiceError::transport(service, e))?;
    decode_body(service, status, &body)
}

/// Decode a response body once its status is known.
pub(crate) fn decode_body<T: DeserializeOwned>(
    service: &'static str,
    status: StatusCode,
    body: &str,
) -> Result<T, ServiceError> {
    if !status.is_success() {
        return Err(ServiceError::Status {
            service,
            status,
            body: body.to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| ServiceError::decode(service, e.to_string()))
}

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Completer, endpoint, parse_base_url, read_json};
use crate::config::settings::AnthropicSettings;
use crate::error::ServiceError;

const SERVICE: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Long completions outlive the shared client timeout.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// A [`Completer`] backed by the Anthropic Messages API.
pub struct AnthropicCompleter {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl AnthropicCompleter {
    pub fn new(http: reqwest::Client, settings: &AnthropicSettings) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(SERVICE, &settings.base_url)?,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    fn request(&self, system: &str, prompt: &str) -> reqwest::RequestBuilder {
        let messages = [Message {
            role: "user",
            content: prompt,
        }];
        let body = ApiRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: &messages,
        };
        self.http
            .post(endpoint(&self.base_url, &["v1", "messages"]))
            .timeout(COMPLETION_TIMEOUT)
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", &self.api_key)
            .json(&body)
    }
}

#[async_trait]
impl Completer for AnthropicCompleter {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError> {
        let resp = self
            .request(system, prompt)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        let api_resp: ApiResponse = read_json(SERVICE, resp).await?;

        if let Some(usage) = &api_resp.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "anthropic completion"
            );
        }

        let text = collect_text(&api_resp.content);
        if text.is_empty() {
            return Err(ServiceError::decode(SERVICE, "empty completion"));
        }
        Ok(text)
    }
}

/// Concatenate the text blocks of a response, skipping everything else.
fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| {
            if block.content_type == "text" {
                block.text.as_deref()
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message<'a>],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

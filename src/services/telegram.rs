use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ChatBackend, OutgoingMessage, endpoint, parse_base_url};
use crate::config::settings::TelegramSettings;
use crate::error::ServiceError;

const SERVICE: &str = "telegram";

/// Client for the Telegram Bot API.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: Url,
    bot_token: String,
}

/// Every Bot API response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(http: reqwest::Client, settings: &TelegramSettings) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(SERVICE, &settings.base_url)?,
            bot_token: settings.bot_token.clone(),
        })
    }

    fn url(&self, method: &str) -> Url {
        let bot = format!("bot{}", self.bot_token);
        endpoint(&self.base_url, &[&bot, method])
    }

    async fn call(&self, req: reqwest::RequestBuilder) -> Result<Value, ServiceError> {
        // The token is part of the URL; keep it out of error messages.
        let resp = req
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e.without_url()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e.without_url()))?;
        unwrap_envelope(status, &body)
    }
}

/// Telegram reports failures as `{ok: false, description}` even on 4xx.
fn unwrap_envelope(status: reqwest::StatusCode, body: &str) -> Result<Value, ServiceError> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope { ok: true, result, .. }) => Ok(result.unwrap_or(Value::Null)),
        Ok(Envelope {
            ok: false,
            description,
            ..
        }) => Err(ServiceError::Api {
            service: SERVICE,
            message: description.unwrap_or_else(|| format!("request failed ({status})")),
        }),
        Err(_) if !status.is_success() => Err(ServiceError::Status {
            service: SERVICE,
            status,
            body: body.to_string(),
        }),
        Err(e) => Err(ServiceError::decode(SERVICE, e.to_string())),
    }
}

#[async_trait]
impl ChatBackend for TelegramClient {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<Value, ServiceError> {
        self.call(self.http.post(self.url("sendMessage")).json(message))
            .await
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        limit: u64,
    ) -> Result<Vec<Value>, ServiceError> {
        let mut body = json!({ "limit": limit, "timeout": 0 });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        match self
            .call(self.http.post(self.url("getUpdates")).json(&body))
            .await?
        {
            Value::Array(updates) => Ok(updates),
            _ => Err(ServiceError::decode(SERVICE, "getUpdates result is not an array")),
        }
    }
}

/// Flatten an update into the fields a client cares about.
/// Returns `None` for updates that carry no message (edits, callbacks, ...).
pub fn summarize_update(update: &Value) -> Option<Value> {
    let message = update
        .get("message")
        .or_else(|| update.get("channel_post"))?;

    let from = message.get("from").map(|from| {
        from.get("username")
            .or_else(|| from.get("first_name"))
            .cloned()
            .unwrap_or(Value::Null)
    });

    Some(json!({
        "update_id": update.get("update_id").cloned().unwrap_or(Value::Null),
        "message_id": message.get("message_id").cloned().unwrap_or(Value::Null),
        "chat_id": message.pointer("/chat/id").cloned().unwrap_or(Value::Null),
        "from": from.unwrap_or(Value::Null),
        "date": message.get("date").cloned().unwrap_or(Value::Null),
        "text": message
            .get("text")
            .or_else(|| message.get("caption"))
            .cloned()
            .unwrap_or(Value::Null),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn url_embeds_bot_token() {
        let client = TelegramClient::new(
            reqwest::Client::new(),
            &TelegramSettings {
                base_url: "https://api.telegram.org".to_string(),
                bot_token: "123:ABC".to_string(),
                chat_id: None,
            },
        )
        .unwrap();
        assert_eq!(
            client.url("sendMessage").as_str(),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn envelope_ok_returns_result() {
        let value = unwrap_envelope(StatusCode::OK, r#"{"ok":true,"result":[1,2]}"#).unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn envelope_failure_forwards_description() {
        let err = unwrap_envelope(
            StatusCode::BAD_REQUEST,
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "telegram API error: Bad Request: chat not found"
        );
    }

    #[test]
    fn non_json_error_keeps_status() {
        let err = unwrap_envelope(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ServiceError::Status { status, .. } if status == StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn summarize_text_message() {
        let update = json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "from": {"id": 1, "first_name": "Ada", "username": "ada"},
                "chat": {"id": -100, "type": "group"},
                "date": 1700000000,
                "text": "hello"
            }
        });
        let summary = summarize_update(&update).unwrap();
        assert_eq!(summary["update_id"], 10);
        assert_eq!(summary["chat_id"], -100);
        assert_eq!(summary["from"], "ada");
        assert_eq!(summary["text"], "hello");
    }

    #[test]
    fn summarize_skips_non_message_updates() {
        let update = json!({"update_id": 11, "callback_query": {"id": "x"}});
        assert!(summarize_update(&update).is_none());
    }
}

//! Tools backed by the chat-bot service.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{Tool, optional_str, optional_u64, required_str};
use crate::consts::{DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT};
use crate::error::ServiceError;
use crate::services::telegram::summarize_update;
use crate::services::{ChatBackend, OutgoingMessage};

/// Telegram's hard limit on message text.
const MAX_TEXT_CHARS: usize = 4096;

const PARSE_MODES: &[&str] = &["Markdown", "MarkdownV2", "HTML"];

pub struct SendMessageTool {
    service: Arc<dyn ChatBackend>,
    default_chat: Option<String>,
}

impl SendMessageTool {
    pub fn new(service: Arc<dyn ChatBackend>, default_chat: Option<String>) -> Self {
        Self {
            service,
            default_chat,
        }
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a Telegram message through the bot."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Message text"},
                "chat_id": {"type": ["string", "integer"], "description": "Target chat. Defaults to the configured chat."},
                "parse_mode": {"type": "string", "enum": PARSE_MODES}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let text = required_str(args, "text")?;
        if text.chars().count() > MAX_TEXT_CHARS {
            bail!("message text exceeds {MAX_TEXT_CHARS} characters");
        }

        let chat_id = match optional_str(args, "chat_id")? {
            Some(id) => id,
            None => self.default_chat.clone().ok_or(ServiceError::NotConfigured {
                what: "Telegram chat",
                hint: "TELEGRAM_CHAT_ID or pass chat_id",
            })?,
        };

        let parse_mode = optional_str(args, "parse_mode")?;
        if let Some(mode) = &parse_mode
            && !PARSE_MODES.contains(&mode.as_str())
        {
            bail!("unsupported parse_mode: {mode}");
        }

        let message = OutgoingMessage {
            chat_id,
            text: text.to_string(),
            parse_mode,
        };
        let sent = self.service.send_message(&message).await?;

        Ok(json!({
            "sent": true,
            "chat_id": message.chat_id,
            "message_id": sent.get("message_id").cloned().unwrap_or(Value::Null),
        }))
    }
}

pub struct GetMessagesTool {
    service: Arc<dyn ChatBackend>,
}

impl GetMessagesTool {
    pub fn new(service: Arc<dyn ChatBackend>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for GetMessagesTool {
    fn name(&self) -> &str {
        "get_messages"
    }

    fn description(&self) -> &str {
        "Fetch pending Telegram messages sent to the bot. Pass `next_offset` from a \
         previous call as `offset` to acknowledge what was already read."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "offset": {"type": "integer", "description": "First update id to return"},
                "limit": {"type": "integer", "minimum": 1, "maximum": MAX_MESSAGE_LIMIT, "default": DEFAULT_MESSAGE_LIMIT}
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let offset = match args.get("offset") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_i64() {
                Some(n) => Some(n),
                None => bail!("argument `offset` must be an integer"),
            },
        };
        let limit = optional_u64(args, "limit")?
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
            .clamp(1, MAX_MESSAGE_LIMIT);

        let updates = self.service.get_updates(offset, limit).await?;

        let next_offset = updates
            .iter()
            .filter_map(|u| u.get("update_id").and_then(Value::as_i64))
            .max()
            .map(|id| id + 1);
        let messages: Vec<Value> = updates.iter().filter_map(summarize_update).collect();

        Ok(json!({
            "count": messages.len(),
            "messages": messages,
            "next_offset": next_offset,
        }))
    }
}

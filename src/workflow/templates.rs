//! Pre-built n8n node templates.

use serde_json::{Value, json};

use super::{airtable_operation, schedule_interval};

/// Every node the builder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Manual,
    Webhook,
    Schedule,
    TelegramTrigger,
    HttpRequest,
    Airtable,
    Filter,
    Transform,
    Code,
    Email,
    Slack,
    TelegramSend,
    NoOp,
}

impl NodeKind {
    /// The n8n node type identifier.
    pub fn node_type(self) -> &'static str {
        match self {
            Self::Manual => "n8n-nodes-base.manualTrigger",
            Self::Webhook => "n8n-nodes-base.webhook",
            Self::Schedule => "n8n-nodes-base.scheduleTrigger",
            Self::TelegramTrigger => "n8n-nodes-base.telegramTrigger",
            Self::HttpRequest => "n8n-nodes-base.httpRequest",
            Self::Airtable => "n8n-nodes-base.airtable",
            Self::Filter => "n8n-nodes-base.if",
            Self::Transform => "n8n-nodes-base.set",
            Self::Code => "n8n-nodes-base.code",
            Self::Email => "n8n-nodes-base.emailSend",
            Self::Slack => "n8n-nodes-base.slack",
            Self::TelegramSend => "n8n-nodes-base.telegram",
            Self::NoOp => "n8n-nodes-base.noOp",
        }
    }

    /// Display name; unique per kind so connections can key on it.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Manual => "Manual Trigger",
            Self::Webhook => "Webhook",
            Self::Schedule => "Schedule Trigger",
            Self::TelegramTrigger => "Telegram Trigger",
            Self::HttpRequest => "HTTP Request",
            Self::Airtable => "Airtable",
            Self::Filter => "Filter",
            Self::Transform => "Transform",
            Self::Code => "Code",
            Self::Email => "Send Email",
            Self::Slack => "Slack",
            Self::TelegramSend => "Send Telegram Message",
            Self::NoOp => "No Operation",
        }
    }

    fn type_version(self) -> f64 {
        match self {
            Self::Manual | Self::NoOp => 1.0,
            Self::Webhook | Self::Airtable | Self::Filter | Self::Code => 2.0,
            Self::Schedule => 1.2,
            Self::TelegramTrigger | Self::TelegramSend => 1.1,
            Self::HttpRequest => 4.2,
            Self::Transform => 3.4,
            Self::Email => 2.1,
            Self::Slack => 2.2,
        }
    }
}

/// Instantiate a node of `kind`. `id` and `position` are filled in by the builder.
pub fn node(kind: NodeKind, workflow_name: &str, description: &str) -> Value {
    json!({
        "name": kind.display_name(),
        "type": kind.node_type(),
        "typeVersion": kind.type_version(),
        "parameters": parameters(kind, workflow_name, description),
    })
}

fn parameters(kind: NodeKind, workflow_name: &str, description: &str) -> Value {
    match kind {
        NodeKind::Manual | NodeKind::NoOp => json!({}),
        NodeKind::Webhook => json!({
            "httpMethod": "POST",
            "path": slug(workflow_name),
            "responseMode": "onReceived",
        }),
        NodeKind::Schedule => json!({
            "rule": { "interval": [{ "field": schedule_interval(description) }] }
        }),
        NodeKind::TelegramTrigger => json!({ "updates": ["message"] }),
        NodeKind::HttpRequest => json!({
            "method": "GET",
            "url": "",
            "options": {},
        }),
        NodeKind::Airtable => json!({
            "operation": airtable_operation(description),
            "base": { "__rl": true, "mode": "id", "value": "" },
            "table": { "__rl": true, "mode": "id", "value": "" },
        }),
        NodeKind::Filter => json!({
            "conditions": {
                "options": { "caseSensitive": true },
                "conditions": [],
                "combinator": "and",
            }
        }),
        NodeKind::Transform => json!({
            "assignments": { "assignments": [] },
            "options": {},
        }),
        NodeKind::Code => json!({ "jsCode": "return $input.all();" }),
        NodeKind::Email => json!({
            "subject": workflow_name,
            "text": "={{ JSON.stringify($json) }}",
            "options": {},
        }),
        NodeKind::Slack => json!({
            "select": "channel",
            "text": "={{ $json.message }}",
            "otherOptions": {},
        }),
        NodeKind::TelegramSend => json!({
            "chatId": "",
            "text": "={{ $json.message }}",
            "additionalFields": {},
        }),
    }
}

/// Lowercase, alphanumerics kept, everything else collapsed to single dashes.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "webhook".to_string()
    } else {
        trimmed.to_string()
    }
}

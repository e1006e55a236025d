//! Keyword-routed construction of n8n workflow definitions.
//!
//! A description is lowercased and checked against a fixed menu of
//! node templates. One trigger is chosen, then every step whose keywords
//! occur is appended in menu order and the nodes are chained linearly.

mod templates;

use serde_json::{Map, Value, json};

pub use templates::NodeKind;

/// Horizontal spacing between consecutive nodes.
const NODE_SPACING: i64 = 200;
const ORIGIN_X: i64 = 250;
const ORIGIN_Y: i64 = 300;

/// Trigger keyword groups, checked in order. First match wins.
const WEBHOOK_KEYWORDS: &[&str] = &["webhook"];
const SCHEDULE_KEYWORDS: &[&str] = &["schedule", "every", "daily", "hourly", "weekly", "cron"];
const CHAT_TRIGGER_KEYWORDS: &[&str] = &["receive", "incoming", "message from"];

/// Step keyword groups in the order their nodes are appended. Matched as
/// whole words, an optional plural `s` allowed.
const STEPS: &[(NodeKind, &[&str])] = &[
    (
        NodeKind::HttpRequest,
        &["http request", "api call", "call the api", "fetch from", "rest api"],
    ),
    (NodeKind::Airtable, &["airtable", "spreadsheet", "database", "table"]),
    (NodeKind::Filter, &["filter", "only if", "condition", "if"]),
    (NodeKind::Transform, &["transform", "format", "map fields", "rename"]),
    (NodeKind::Code, &["code", "script", "javascript", "calculate"]),
    (NodeKind::Email, &["email", "e-mail", "gmail", "mail"]),
    (NodeKind::Slack, &["slack"]),
    (NodeKind::TelegramSend, &["telegram", "notify", "send a message", "send message"]),
];

/// Airtable operations that write rather than read.
const AIRTABLE_WRITE_KEYWORDS: &[&str] = &["create", "add", "save", "store", "insert", "append"];

/// Which trigger node a description implies.
pub fn select_trigger(description: &str) -> NodeKind {
    let lower = description.to_lowercase();
    if contains_any(&lower, WEBHOOK_KEYWORDS) {
        NodeKind::Webhook
    } else if contains_any(&lower, SCHEDULE_KEYWORDS) {
        NodeKind::Schedule
    } else if lower.contains("telegram") && contains_any(&lower, CHAT_TRIGGER_KEYWORDS) {
        NodeKind::TelegramTrigger
    } else {
        NodeKind::Manual
    }
}

/// Step nodes a description implies, in append order.
///
/// A Telegram message trigger already covers "telegram"; the send step is
/// only added when the description also asks to reply or notify.
pub fn select_steps(description: &str) -> Vec<NodeKind> {
    let lower = description.to_lowercase();
    let trigger = select_trigger(description);

    STEPS
        .iter()
        .filter(|(kind, keywords)| {
            if *kind == NodeKind::TelegramSend && trigger == NodeKind::TelegramTrigger {
                return contains_any(&lower, &["reply", "respond", "notify", "send"]);
            }
            keywords.iter().any(|k| mentions(&lower, k))
        })
        .map(|(kind, _)| *kind)
        .collect()
}

/// Schedule interval unit implied by the description.
pub fn schedule_interval(description: &str) -> &'static str {
    let lower = description.to_lowercase();
    if lower.contains("minute") {
        "minutes"
    } else if lower.contains("hour") {
        "hours"
    } else if lower.contains("week") {
        "weeks"
    } else {
        "days"
    }
}

/// Airtable operation implied by the description.
pub fn airtable_operation(description: &str) -> &'static str {
    if contains_any(&description.to_lowercase(), AIRTABLE_WRITE_KEYWORDS) {
        "create"
    } else {
        "search"
    }
}

/// Build the full create-workflow body for the n8n API.
pub fn build_workflow(name: &str, description: &str) -> Value {
    let mut kinds = vec![select_trigger(description)];
    let steps = select_steps(description);
    if steps.is_empty() {
        kinds.push(NodeKind::NoOp);
    } else {
        kinds.extend(steps);
    }

    let nodes: Vec<Value> = kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let mut node = templates::node(*kind, name, description);
            node["id"] = json!(format!("node-{}", i + 1));
            node["position"] = json!([ORIGIN_X + NODE_SPACING * i as i64, ORIGIN_Y]);
            node
        })
        .collect();

    json!({
        "name": name,
        "nodes": nodes,
        "connections": connect(&nodes),
        "settings": { "executionOrder": "v1" },
    })
}

/// Chain nodes linearly through their first `main` output.
fn connect(nodes: &[Value]) -> Value {
    let mut connections = Map::new();
    for pair in nodes.windows(2) {
        let (from, to) = (&pair[0]["name"], &pair[1]["name"]);
        if let (Some(from), Some(to)) = (from.as_str(), to.as_str()) {
            connections.insert(
                from.to_string(),
                json!({ "main": [[{ "node": to, "type": "main", "index": 0 }]] }),
            );
        }
    }
    Value::Object(connections)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Whether `keyword` occurs in `haystack` as a whole word, or as one
/// followed by a plural `s`.
fn mentions(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let rest = &haystack[start + keyword.len()..];
        let after = rest.strip_prefix('s').unwrap_or(rest).chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

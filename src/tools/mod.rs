pub mod chat;
pub mod requirements;
pub mod tables;
pub mod workflows;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::services::Backends;

/// Outcome of a single tool execution. Errors are information, not failures.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Outcome {
    Success(Value),
    Error(String),
}

/// Result of executing a tool call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub outcome: Outcome,
}

/// Something a client can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> Value;
    async fn execute(&self, args: &Value) -> Result<Value>;
}

/// Describes a tool in a `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Holds all registered tools. RwLock allows runtime registration + parallel reads.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with a tool for every configured backend.
    /// `analyze_requirements` is always present.
    pub async fn with_backends(backends: &Backends) -> Self {
        let registry = Self::new();

        registry
            .register(Arc::new(requirements::AnalyzeRequirementsTool::new(
                backends.completer.clone(),
            )))
            .await;

        if let Some(service) = &backends.workflows {
            registry
                .register(Arc::new(workflows::CreateWorkflowTool::new(service.clone())))
                .await;
            registry
                .register(Arc::new(workflows::ListWorkflowsTool::new(service.clone())))
                .await;
            registry
                .register(Arc::new(workflows::GetWorkflowTool::new(service.clone())))
                .await;
            registry
                .register(Arc::new(workflows::SetWorkflowActiveTool::new(
                    service.clone(),
                )))
                .await;
        }

        if let Some(service) = &backends.tables {
            let base = backends.default_base_id.clone();
            registry
                .register(Arc::new(tables::GetSchemaTool::new(
                    service.clone(),
                    base.clone(),
                )))
                .await;
            registry
                .register(Arc::new(tables::ListRecordsTool::new(service.clone(), base)))
                .await;
        }

        if let Some(service) = &backends.chat {
            registry
                .register(Arc::new(chat::SendMessageTool::new(
                    service.clone(),
                    backends.default_chat_id.clone(),
                )))
                .await;
            registry
                .register(Arc::new(chat::GetMessagesTool::new(service.clone())))
                .await;
        }

        registry
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!(tool = %name, "registering tool");
        self.tools.write().await.insert(name, tool);
    }

    pub async fn unregister(&self, name: &str) {
        self.tools.write().await.remove(name);
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    pub async fn execute(&self, tool_name: &str, args: &Value) -> ToolResult {
        // Clone the handle so a slow backend call does not hold the lock.
        let tool = self.tools.read().await.get(tool_name).cloned();
        let outcome = match tool {
            Some(tool) => match tool.execute(args).await {
                Ok(output) => Outcome::Success(output),
                Err(e) => {
                    warn!(tool = tool_name, error = %e, "tool call failed");
                    Outcome::Error(format!("{e:#}"))
                }
            },
            None => Outcome::Error(format!("unknown tool: {}", tool_name)),
        };
        ToolResult {
            tool: tool_name.to_string(),
            outcome,
        }
    }

    /// Every tool, sorted by name.
    pub async fn descriptions(&self) -> Vec<ToolDescription> {
        let mut descriptions: Vec<ToolDescription> = self
            .tools
            .read()
            .await
            .values()
            .map(|t| ToolDescription {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        descriptions.sort_by(|a, b| a.name.cmp(&b.name));
        descriptions
    }
}

// --- argument helpers ---

/// A required, non-blank string argument.
pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(anyhow!("argument `{key}` must not be empty")),
        Some(_) => Err(anyhow!("argument `{key}` must be a string")),
        None => Err(anyhow!("missing required argument `{key}`")),
    }
}

/// An optional string argument. Numbers are accepted and rendered as text,
/// since chat ids and record ids are often sent either way.
pub fn optional_str(args: &Value, key: &str) -> Result<Option<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(anyhow!("argument `{key}` must be a string")),
    }
}

pub fn optional_bool(args: &Value, key: &str) -> Result<Option<bool>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(anyhow!("argument `{key}` must be a boolean")),
    }
}

pub fn optional_u64(args: &Value, key: &str) -> Result<Option<u64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| anyhow!("argument `{key}` must be a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_variants() {
        let args = json!({"a": "x", "b": "  ", "c": 3});
        assert_eq!(required_str(&args, "a").unwrap(), "x");
        assert!(required_str(&args, "b").unwrap_err().to_string().contains("empty"));
        assert!(required_str(&args, "c").unwrap_err().to_string().contains("string"));
        assert!(required_str(&args, "d").unwrap_err().to_string().contains("missing"));
    }

    #[test]
    fn optional_str_accepts_numbers() {
        let args = json!({"chat_id": -100123, "blank": "", "n": null});
        assert_eq!(
            optional_str(&args, "chat_id").unwrap().as_deref(),
            Some("-100123")
        );
        assert!(optional_str(&args, "blank").unwrap().is_none());
        assert!(optional_str(&args, "n").unwrap().is_none());
        assert!(optional_str(&json!({"x": [1]}), "x").is_err());
    }

    #[test]
    fn optional_bool_and_u64() {
        let args = json!({"flag": true, "n": 5, "neg": -1, "s": "5"});
        assert_eq!(optional_bool(&args, "flag").unwrap(), Some(true));
        assert!(optional_bool(&args, "s").is_err());
        assert_eq!(optional_u64(&args, "n").unwrap(), Some(5));
        assert!(optional_u64(&args, "neg").is_err());
        assert_eq!(optional_u64(&args, "missing").unwrap(), None);
    }
}

//! Tools backed by the workflow-automation service.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use super::{Tool, optional_bool, optional_u64, required_str};
use crate::services::{WorkflowBackend, WorkflowFilter};
use crate::workflow;

/// Workflow ids come back as strings from n8n, numbers from older versions.
fn workflow_id(workflow: &Value) -> Option<String> {
    match workflow.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn summarize(workflow: &Value) -> Value {
    let tags: Vec<Value> = workflow
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(|t| t.get("name").cloned()).collect())
        .unwrap_or_default();

    json!({
        "id": workflow_id(workflow),
        "name": workflow.get("name").cloned().unwrap_or(Value::Null),
        "active": workflow.get("active").cloned().unwrap_or(json!(false)),
        "createdAt": workflow.get("createdAt").cloned().unwrap_or(Value::Null),
        "updatedAt": workflow.get("updatedAt").cloned().unwrap_or(Value::Null),
        "tags": tags,
    })
}

pub struct CreateWorkflowTool {
    service: Arc<dyn WorkflowBackend>,
}

impl CreateWorkflowTool {
    pub fn new(service: Arc<dyn WorkflowBackend>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for CreateWorkflowTool {
    fn name(&self) -> &str {
        "create_workflow"
    }

    fn description(&self) -> &str {
        "Create an n8n workflow from a plain-English description. Trigger and step \
         nodes are chosen from keywords (webhook, schedule, airtable, email, slack, telegram, ...)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Workflow name"},
                "description": {"type": "string", "description": "What the workflow should do"},
                "activate": {"type": "boolean", "description": "Activate right after creation", "default": false}
            },
            "required": ["name", "description"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let name = required_str(args, "name")?;
        let description = required_str(args, "description")?;
        let activate = optional_bool(args, "activate")?.unwrap_or(false);

        let definition = workflow::build_workflow(name, description);
        let created = self.service.create_workflow(&definition).await?;
        let id = workflow_id(&created);
        info!(id = ?id, name, "workflow created");

        let mut active = created.get("active").and_then(Value::as_bool).unwrap_or(false);
        if activate {
            let id = id
                .as_deref()
                .ok_or_else(|| anyhow!("created workflow has no id, cannot activate"))?;
            self.service
                .set_active(id, true)
                .await
                .with_context(|| format!("workflow {id} was created but activation failed"))?;
            active = true;
        }

        let nodes: Vec<Value> = definition["nodes"]
            .as_array()
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|n| json!({"name": n["name"], "type": n["type"]}))
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "id": id,
            "name": name,
            "active": active,
            "nodes": nodes,
        }))
    }
}

pub struct ListWorkflowsTool {
    service: Arc<dyn WorkflowBackend>,
}

impl ListWorkflowsTool {
    pub fn new(service: Arc<dyn WorkflowBackend>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for ListWorkflowsTool {
    fn name(&self) -> &str {
        "list_workflows"
    }

    fn description(&self) -> &str {
        "List n8n workflows, optionally only active or inactive ones."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "active": {"type": "boolean", "description": "Filter by activation state"},
                "limit": {"type": "integer", "minimum": 1, "description": "Maximum workflows to return"}
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let filter = WorkflowFilter {
            active: optional_bool(args, "active")?,
            limit: optional_u64(args, "limit")?,
        };
        let workflows = self.service.list_workflows(&filter).await?;
        let summaries: Vec<Value> = workflows.iter().map(summarize).collect();
        Ok(json!({
            "count": summaries.len(),
            "workflows": summaries,
        }))
    }
}

pub struct GetWorkflowTool {
    service: Arc<dyn WorkflowBackend>,
}

impl GetWorkflowTool {
    pub fn new(service: Arc<dyn WorkflowBackend>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for GetWorkflowTool {
    fn name(&self) -> &str {
        "get_workflow"
    }

    fn description(&self) -> &str {
        "Fetch the full definition of one n8n workflow."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Workflow id"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let id = required_str(args, "id")?;
        Ok(self.service.get_workflow(id).await?)
    }
}

pub struct SetWorkflowActiveTool {
    service: Arc<dyn WorkflowBackend>,
}

impl SetWorkflowActiveTool {
    pub fn new(service: Arc<dyn WorkflowBackend>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for SetWorkflowActiveTool {
    fn name(&self) -> &str {
        "set_workflow_active"
    }

    fn description(&self) -> &str {
        "Activate or deactivate an n8n workflow."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Workflow id"},
                "active": {"type": "boolean", "description": "true to activate, false to deactivate"}
            },
            "required": ["id", "active"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let id = required_str(args, "id")?;
        let active =
            optional_bool(args, "active")?.ok_or_else(|| anyhow!("missing required argument `active`"))?;
        let workflow = self.service.set_active(id, active).await?;
        Ok(summarize(&workflow))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_id_accepts_strings_and_numbers() {
        assert_eq!(workflow_id(&json!({"id": "abc"})).as_deref(), Some("abc"));
        assert_eq!(workflow_id(&json!({"id": 12})).as_deref(), Some("12"));
        assert!(workflow_id(&json!({"name": "x"})).is_none());
    }

    #[test]
    fn summarize_flattens_tags() {
        let summary = summarize(&json!({
            "id": "1",
            "name": "Sync",
            "active": true,
            "tags": [{"id": "t1", "name": "crm"}, {"id": "t2", "name": "daily"}],
            "nodes": [{"name": "big"}]
        }));
        assert_eq!(summary["tags"], json!(["crm", "daily"]));
        assert_eq!(summary["active"], true);
        assert!(summary.get("nodes").is_none());
    }

    #[test]
    fn summarize_defaults_active_to_false() {
        assert_eq!(summarize(&json!({"id": "1"}))["active"], false);
    }
}

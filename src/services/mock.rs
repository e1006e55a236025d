//! Scripted in-memory backends for tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{
    ChatBackend, Completer, OutgoingMessage, TableBackend, WorkflowBackend, WorkflowFilter,
};
use crate::error::ServiceError;

fn failure(message: &str) -> ServiceError {
    ServiceError::Api {
        service: "mock",
        message: message.to_string(),
    }
}

/// An n8n stand-in that keeps workflows in a vector.
#[derive(Default)]
pub struct MockWorkflows {
    workflows: Mutex<Vec<Value>>,
    failure: Option<String>,
}

impl MockWorkflows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with this message.
    pub fn failing(message: &str) -> Self {
        Self {
            workflows: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn with_workflows(workflows: Vec<Value>) -> Self {
        Self {
            workflows: Mutex::new(workflows),
            failure: None,
        }
    }

    /// Snapshot of everything stored so far.
    pub fn stored(&self) -> Vec<Value> {
        self.workflows.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ServiceError> {
        match &self.failure {
            Some(message) => Err(failure(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkflowBackend for MockWorkflows {
    async fn create_workflow(&self, workflow: &Value) -> Result<Value, ServiceError> {
        self.check()?;
        let mut workflows = self.workflows.lock().unwrap();
        let mut stored = workflow.clone();
        stored["id"] = json!(format!("wf-{}", workflows.len() + 1));
        stored["active"] = json!(false);
        workflows.push(stored.clone());
        Ok(stored)
    }

    async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<Value>, ServiceError> {
        self.check()?;
        let workflows = self.workflows.lock().unwrap();
        let limit = filter.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        Ok(workflows
            .iter()
            .filter(|w| filter.active.is_none_or(|a| w["active"] == json!(a)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_workflow(&self, id: &str) -> Result<Value, ServiceError> {
        self.check()?;
        self.workflows
            .lock()
            .unwrap()
            .iter()
            .find(|w| w["id"] == json!(id))
            .cloned()
            .ok_or_else(|| ServiceError::Status {
                service: "mock",
                status: reqwest::StatusCode::NOT_FOUND,
                body: format!("workflow {id} not found"),
            })
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Value, ServiceError> {
        self.check()?;
        let mut workflows = self.workflows.lock().unwrap();
        match workflows.iter_mut().find(|w| w["id"] == json!(id)) {
            Some(w) => {
                w["active"] = json!(active);
                Ok(w.clone())
            }
            None => Err(ServiceError::Status {
                service: "mock",
                status: reqwest::StatusCode::NOT_FOUND,
                body: format!("workflow {id} not found"),
            }),
        }
    }
}

/// An Airtable stand-in returning fixed payloads and recording base ids.
pub struct MockTables {
    schema: Value,
    records: Value,
    requests: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl MockTables {
    pub fn new(schema: Value, records: Value) -> Self {
        Self {
            schema,
            records,
            requests: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Value::Null, Value::Null)
        }
    }

    /// `base` or `base/table` for every call, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TableBackend for MockTables {
    async fn base_schema(&self, base_id: &str) -> Result<Value, ServiceError> {
        self.requests.lock().unwrap().push(base_id.to_string());
        match &self.failure {
            Some(message) => Err(failure(message)),
            None => Ok(self.schema.clone()),
        }
    }

    async fn list_records(
        &self,
        base_id: &str,
        table: &str,
        _max_records: Option<u64>,
    ) -> Result<Value, ServiceError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{base_id}/{table}"));
        match &self.failure {
            Some(message) => Err(failure(message)),
            None => Ok(self.records.clone()),
        }
    }
}

/// A Telegram stand-in that records sent messages and replays updates.
#[derive(Default)]
pub struct MockChat {
    sent: Mutex<Vec<OutgoingMessage>>,
    updates: Vec<Value>,
    failure: Option<String>,
}

impl MockChat {
    pub fn new(updates: Vec<Value>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChat {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<Value, ServiceError> {
        if let Some(message) = &self.failure {
            return Err(failure(message));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(json!({
            "message_id": sent.len(),
            "chat": {"id": message.chat_id},
            "text": message.text,
        }))
    }

    async fn get_updates(
        &self,
        offset: Option<i64>,
        limit: u64,
    ) -> Result<Vec<Value>, ServiceError> {
        if let Some(message) = &self.failure {
            return Err(failure(message));
        }
        Ok(self
            .updates
            .iter()
            .filter(|u| {
                let id = u["update_id"].as_i64().unwrap_or(0);
                offset.is_none_or(|o| id >= o)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// A scripted completer. Returns pre-defined replies in order and records prompts.
pub struct MockCompleter {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompleter {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ServiceError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        let calls = prompts.len();
        drop(prompts);

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(failure(&message)),
            None => Err(failure(&format!(
                "MockCompleter: no more replies (called {calls} times)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn workflows_assign_ids_and_toggle() {
        let mock = MockWorkflows::new();
        let created = mock.create_workflow(&json!({"name": "a"})).await.unwrap();
        assert_eq!(created["id"], "wf-1");

        mock.set_active("wf-1", true).await.unwrap();
        let active = mock
            .list_workflows(&WorkflowFilter {
                active: Some(true),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn chat_filters_by_offset() {
        let mock = MockChat::new(vec![
            json!({"update_id": 1}),
            json!({"update_id": 2}),
            json!({"update_id": 3}),
        ]);
        let updates = mock.get_updates(Some(2), 10).await.unwrap();
        assert_eq!(updates.len(), 2);
    }

    #[tokio::test]
    async fn completer_runs_out() {
        let mock = MockCompleter::new(vec!["one"]);
        assert_eq!(mock.complete("", "p1").await.unwrap(), "one");
        let err = mock.complete("", "p2").await.unwrap_err();
        assert!(err.to_string().contains("no more replies"));
        assert_eq!(mock.prompts(), vec!["p1", "p2"]);
    }
}

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use super::{WorkflowBackend, WorkflowFilter, endpoint, parse_base_url, read_json};
use crate::config::settings::N8nSettings;
use crate::error::ServiceError;

const SERVICE: &str = "n8n";
const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Client for the n8n public REST API (`/api/v1`).
pub struct N8nClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl N8nClient {
    pub fn new(http: reqwest::Client, settings: &N8nSettings) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(SERVICE, &settings.base_url)?,
            api_key: settings.api_key.clone(),
        })
    }

    fn url(&self, path: &[&str]) -> Url {
        let mut segments = vec!["api", "v1"];
        segments.extend_from_slice(path);
        endpoint(&self.base_url, &segments)
    }

    fn list_request(&self, filter: &WorkflowFilter) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(&["workflows"]))
            .query(&list_query(filter))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, ServiceError> {
        let resp = req
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        read_json(SERVICE, resp).await
    }
}

#[async_trait]
impl WorkflowBackend for N8nClient {
    async fn create_workflow(&self, workflow: &Value) -> Result<Value, ServiceError> {
        debug!(name = ?workflow.get("name"), "creating n8n workflow");
        self.send(self.http.post(self.url(&["workflows"])).json(workflow))
            .await
    }

    async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<Value>, ServiceError> {
        let body = self.send(self.list_request(filter)).await?;
        workflow_items(body)
    }

    async fn get_workflow(&self, id: &str) -> Result<Value, ServiceError> {
        self.send(self.http.get(self.url(&["workflows", id]))).await
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Value, ServiceError> {
        let action = if active { "activate" } else { "deactivate" };
        debug!(id, action, "toggling n8n workflow");
        self.send(self.http.post(self.url(&["workflows", id, action])))
            .await
    }
}

fn list_query(filter: &WorkflowFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(active) = filter.active {
        query.push(("active", active.to_string()));
    }
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

/// The list endpoint pages its results under `data`.
fn workflow_items(body: Value) -> Result<Vec<Value>, ServiceError> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ServiceError::decode(SERVICE, "missing `data` array")),
        },
        _ => Err(ServiceError::decode(SERVICE, "missing `data` array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> N8nClient {
        N8nClient::new(
            reqwest::Client::new(),
            &N8nSettings {
                base_url: base.to_string(),
                api_key: "key".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn urls_live_under_api_v1() {
        let c = client("http://localhost:5678");
        assert_eq!(
            c.url(&["workflows"]).as_str(),
            "http://localhost:5678/api/v1/workflows"
        );
        assert_eq!(
            c.url(&["workflows", "abc", "activate"]).as_str(),
            "http://localhost:5678/api/v1/workflows/abc/activate"
        );
    }

    #[test]
    fn list_request_carries_filter_as_query() {
        let c = client("http://localhost:5678");
        let req = c
            .list_request(&WorkflowFilter {
                active: Some(true),
                limit: Some(5),
            })
            .build()
            .unwrap();
        assert_eq!(req.url().path(), "/api/v1/workflows");
        assert_eq!(req.url().query(), Some("active=true&limit=5"));

        let req = c.list_request(&WorkflowFilter::default()).build().unwrap();
        assert_eq!(req.url().query(), None);
    }

    #[test]
    fn workflow_items_reads_data_array() {
        let items = workflow_items(json!({"data": [{"id": "1"}], "nextCursor": null})).unwrap();
        assert_eq!(items, vec![json!({"id": "1"})]);
    }

    #[test]
    fn workflow_items_without_data_is_decode_error() {
        let err = workflow_items(json!({"message": "nope"})).unwrap_err();
        assert!(matches!(err, ServiceError::Decode { service: "n8n", .. }));
        assert!(err.to_string().contains("data"));
        assert!(workflow_items(json!([])).is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = N8nClient::new(
            reqwest::Client::new(),
            &N8nSettings {
                base_url: "localhost without scheme".to_string(),
                api_key: "key".to_string(),
            },
        );
        assert!(result.is_err());
    }
}

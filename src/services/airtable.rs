use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::{TableBackend, endpoint, parse_base_url, read_json};
use crate::config::settings::AirtableSettings;
use crate::error::ServiceError;

const SERVICE: &str = "airtable";

/// Client for the Airtable REST and metadata APIs.
pub struct AirtableClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl AirtableClient {
    pub fn new(http: reqwest::Client, settings: &AirtableSettings) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(SERVICE, &settings.base_url)?,
            api_key: settings.api_key.clone(),
        })
    }

    fn request(&self, url: Url, query: &[(&str, String)]) -> reqwest::RequestBuilder {
        self.http.get(url).bearer_auth(&self.api_key).query(query)
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<Value, ServiceError> {
        let resp = self
            .request(url, query)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        read_json(SERVICE, resp).await
    }
}

#[async_trait]
impl TableBackend for AirtableClient {
    async fn base_schema(&self, base_id: &str) -> Result<Value, ServiceError> {
        let url = endpoint(&self.base_url, &["v0", "meta", "bases", base_id, "tables"]);
        self.get(url, &[]).await
    }

    async fn list_records(
        &self,
        base_id: &str,
        table: &str,
        max_records: Option<u64>,
    ) -> Result<Value, ServiceError> {
        let url = endpoint(&self.base_url, &["v0", base_id, table]);
        self.get(url, &records_query(max_records)).await
    }
}

fn records_query(max_records: Option<u64>) -> Vec<(&'static str, String)> {
    max_records
        .map(|n| vec![("maxRecords", n.to_string())])
        .unwrap_or_default()
}

/// Reduce a metadata response to table names, ids and field name/type pairs.
pub fn summarize_schema(schema: &Value) -> Result<Value, ServiceError> {
    let tables = schema
        .get("tables")
        .and_then(Value::as_array)
        .ok_or_else(|| ServiceError::decode(SERVICE, "missing `tables` array"))?;

    let summary: Vec<Value> = tables
        .iter()
        .map(|table| {
            let fields: Vec<Value> = table
                .get("fields")
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|f| {
                            serde_json::json!({
                                "name": f.get("name").cloned().unwrap_or(Value::Null),
                                "type": f.get("type").cloned().unwrap_or(Value::Null),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            serde_json::json!({
                "id": table.get("id").cloned().unwrap_or(Value::Null),
                "name": table.get("name").cloned().unwrap_or(Value::Null),
                "primaryFieldId": table.get("primaryFieldId").cloned().unwrap_or(Value::Null),
                "fields": fields,
            })
        })
        .collect();

    Ok(serde_json::json!({ "tables": summary }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarize_keeps_names_and_types() {
        let schema = json!({
            "tables": [{
                "id": "tbl1",
                "name": "Leads",
                "primaryFieldId": "fld1",
                "fields": [
                    {"id": "fld1", "name": "Name", "type": "singleLineText", "options": {}},
                    {"id": "fld2", "name": "Email", "type": "email"}
                ],
                "views": [{"id": "viw1"}]
            }]
        });

        let summary = summarize_schema(&schema).unwrap();
        let table = &summary["tables"][0];
        assert_eq!(table["name"], "Leads");
        assert_eq!(table["fields"][1], json!({"name": "Email", "type": "email"}));
        assert!(table.get("views").is_none());
    }

    #[test]
    fn records_request_shape() {
        let client = AirtableClient::new(
            reqwest::Client::new(),
            &AirtableSettings {
                base_url: "https://api.airtable.com".to_string(),
                api_key: "pat-test".to_string(),
                base_id: None,
            },
        )
        .unwrap();
        let url = endpoint(&client.base_url, &["v0", "appX", "Leads"]);
        let req = client.request(url, &records_query(Some(25))).build().unwrap();

        assert_eq!(req.url().path(), "/v0/appX/Leads");
        assert_eq!(req.url().query(), Some("maxRecords=25"));
        assert_eq!(req.headers()["authorization"], "Bearer pat-test");
        assert!(records_query(None).is_empty());
    }

    #[test]
    fn summarize_without_tables_fails() {
        let err = summarize_schema(&json!({"error": "nope"})).unwrap_err();
        assert!(err.to_string().contains("tables"));
    }

    #[test]
    fn table_without_fields_has_empty_list() {
        let summary = summarize_schema(&json!({"tables": [{"id": "t", "name": "T"}]})).unwrap();
        assert_eq!(summary["tables"][0]["fields"], json!([]));
    }
}

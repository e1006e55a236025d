//! Tools backed by the table database service.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{Tool, optional_str, optional_u64, required_str};
use crate::error::ServiceError;
use crate::services::TableBackend;
use crate::services::airtable::summarize_schema;

/// Airtable rejects `maxRecords` above this per page.
const MAX_RECORDS_CAP: u64 = 100;

/// Pick the base from the call or fall back to the configured default.
fn resolve_base(args: &Value, default: Option<&str>) -> Result<String> {
    if let Some(base) = optional_str(args, "base_id")? {
        return Ok(base);
    }
    default.map(str::to_string).ok_or_else(|| {
        ServiceError::NotConfigured {
            what: "Airtable base",
            hint: "AIRTABLE_BASE_ID or pass base_id",
        }
        .into()
    })
}

pub struct GetSchemaTool {
    service: Arc<dyn TableBackend>,
    default_base: Option<String>,
}

impl GetSchemaTool {
    pub fn new(service: Arc<dyn TableBackend>, default_base: Option<String>) -> Self {
        Self {
            service,
            default_base,
        }
    }
}

#[async_trait]
impl Tool for GetSchemaTool {
    fn name(&self) -> &str {
        "get_schema"
    }

    fn description(&self) -> &str {
        "Fetch the tables and fields of an Airtable base."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "base_id": {"type": "string", "description": "Base id (app...). Defaults to the configured base."}
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let base = resolve_base(args, self.default_base.as_deref())?;
        let schema = self.service.base_schema(&base).await?;
        let mut summary = summarize_schema(&schema)?;
        summary["base_id"] = json!(base);
        Ok(summary)
    }
}

pub struct ListRecordsTool {
    service: Arc<dyn TableBackend>,
    default_base: Option<String>,
}

impl ListRecordsTool {
    pub fn new(service: Arc<dyn TableBackend>, default_base: Option<String>) -> Self {
        Self {
            service,
            default_base,
        }
    }
}

#[async_trait]
impl Tool for ListRecordsTool {
    fn name(&self) -> &str {
        "list_records"
    }

    fn description(&self) -> &str {
        "List records from an Airtable table."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": {"type": "string", "description": "Table name or id"},
                "base_id": {"type": "string", "description": "Base id (app...). Defaults to the configured base."},
                "max_records": {"type": "integer", "minimum": 1, "maximum": MAX_RECORDS_CAP}
            },
            "required": ["table"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let table = required_str(args, "table")?;
        let base = resolve_base(args, self.default_base.as_deref())?;
        let max_records = optional_u64(args, "max_records")?.map(|n| n.clamp(1, MAX_RECORDS_CAP));
        Ok(self.service.list_records(&base, table, max_records).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_base_wins() {
        let base = resolve_base(&json!({"base_id": "appA"}), Some("appB")).unwrap();
        assert_eq!(base, "appA");
    }

    #[test]
    fn default_base_used_when_absent() {
        assert_eq!(resolve_base(&json!({}), Some("appB")).unwrap(), "appB");
    }

    #[test]
    fn missing_base_names_the_setting() {
        let err = resolve_base(&json!({}), None).unwrap_err();
        assert!(err.to_string().contains("AIRTABLE_BASE_ID"));
    }
}

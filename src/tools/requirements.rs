use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{Tool, optional_bool, required_str};
use crate::analysis;
use crate::services::Completer;

pub struct AnalyzeRequirementsTool {
    completer: Option<Arc<dyn Completer>>,
}

impl AnalyzeRequirementsTool {
    pub fn new(completer: Option<Arc<dyn Completer>>) -> Self {
        Self { completer }
    }
}

#[async_trait]
impl Tool for AnalyzeRequirementsTool {
    fn name(&self) -> &str {
        "analyze_requirements"
    }

    fn description(&self) -> &str {
        "Extract triggers, actions, data fields and integrations from a free-text \
         automation requirement. Set `optimize` to refine the result with Claude."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "requirements": {"type": "string", "description": "Free-text requirement"},
                "optimize": {"type": "boolean", "description": "Refine with the LLM when configured", "default": false}
            },
            "required": ["requirements"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value> {
        let text = required_str(args, "requirements")?;
        let optimize = optional_bool(args, "optimize")?.unwrap_or(false);
        let result = analysis::analyze(text);

        if !optimize {
            return Ok(json!(result));
        }

        match &self.completer {
            Some(completer) => Ok(analysis::optimize(text, &result, completer.as_ref()).await?),
            None => {
                let mut object = analysis::to_object(&result);
                object.insert("optimized".to_string(), json!(false));
                object.insert(
                    "note".to_string(),
                    json!("no LLM configured; set ANTHROPIC_API_KEY to enable optimization"),
                );
                Ok(Value::Object(object))
            }
        }
    }
}

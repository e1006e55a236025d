//! Rule-based requirement extraction with optional LLM refinement.
//!
//! [`analyze`] pulls trigger clauses, verb phrases, field lists and service
//! names out of free text with fixed regular expressions. [`optimize`] hands
//! the text and that result to a [`Completer`] and folds its answer back in.

mod extract;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ServiceError;
use crate::services::Completer;
use crate::workflow;

pub use extract::{actions, data_fields, integrations, triggers};

/// How much a requirement asks for, by number of extracted signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    fn from_signals(count: usize) -> Self {
        match count {
            0..=2 => Self::Simple,
            3..=5 => Self::Moderate,
            _ => Self::Complex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementAnalysis {
    pub triggers: Vec<String>,
    pub actions: Vec<String>,
    pub data_fields: Vec<String>,
    pub integrations: Vec<String>,
    /// n8n node types the workflow builder would emit for this text.
    pub suggested_nodes: Vec<String>,
    pub complexity: Complexity,
}

/// Extract everything the rules can find.
pub fn analyze(text: &str) -> RequirementAnalysis {
    let triggers = triggers(text);
    let actions = actions(text);
    let integrations = integrations(text);

    let mut suggested_nodes = vec![workflow::select_trigger(text).node_type().to_string()];
    suggested_nodes.extend(
        workflow::select_steps(text)
            .into_iter()
            .map(|kind| kind.node_type().to_string()),
    );

    let complexity = Complexity::from_signals(triggers.len() + actions.len() + integrations.len());

    RequirementAnalysis {
        triggers,
        actions,
        data_fields: data_fields(text),
        integrations,
        suggested_nodes,
        complexity,
    }
}

const SYSTEM_PROMPT: &str = "You are an n8n workflow architect. You refine requirement \
analyses for automation workflows built from n8n, Airtable and Telegram.

Respond with ONLY a JSON object, no markdown fences, no extra text, using these keys:
- triggers: array of strings
- actions: array of strings
- data_fields: array of strings
- integrations: array of strings
- suggested_nodes: array of n8n node type identifiers
- recommendations: array of short strings";

fn build_prompt(text: &str, analysis: &RequirementAnalysis) -> String {
    let rules = serde_json::to_string_pretty(analysis).unwrap_or_default();
    format!(
        "Requirements:\n{text}\n\nRule-based analysis:\n{rules}\n\n\
         Correct mistakes, fill in anything missing and add recommendations."
    )
}

/// Ask the completer to refine `analysis`.
///
/// A reply that parses as a JSON object is merged into the rule-based
/// result; anything else is attached verbatim as `llm_analysis`.
pub async fn optimize(
    text: &str,
    analysis: &RequirementAnalysis,
    completer: &dyn Completer,
) -> Result<Value, ServiceError> {
    let reply = completer
        .complete(SYSTEM_PROMPT, &build_prompt(text, analysis))
        .await?;

    let mut result = to_object(analysis);
    match serde_json::from_str::<Value>(extract_json(&reply)) {
        Ok(Value::Object(refined)) => {
            debug!(keys = refined.len(), "merging structured LLM analysis");
            merge(&mut result, &refined);
        }
        _ => {
            debug!("LLM analysis is not a JSON object, attaching verbatim");
            result.insert("llm_analysis".to_string(), json!(reply));
        }
    }
    result.insert("optimized".to_string(), json!(true));
    Ok(Value::Object(result))
}

/// The analysis as a JSON object map.
pub fn to_object(analysis: &RequirementAnalysis) -> Map<String, Value> {
    match serde_json::to_value(analysis) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Fold `refined` into `base`: arrays are unioned, new keys are added,
/// and existing non-array values in `base` win.
pub fn merge(base: &mut Map<String, Value>, refined: &Map<String, Value>) {
    for (key, value) in refined {
        match (base.get_mut(key), value) {
            (Some(Value::Array(existing)), Value::Array(extra)) => {
                for item in extra {
                    if !existing.contains(item) {
                        existing.push(item.clone());
                    }
                }
            }
            (Some(_), _) => {}
            (None, value) => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Extract JSON from text that may be wrapped in markdown code fences.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(after) = trimmed.strip_prefix("```json")
        && let Some(json) = after.strip_suffix("```")
    {
        return json.trim();
    }
    if let Some(after) = trimmed.strip_prefix("```")
        && let Some(json) = after.strip_suffix("```")
    {
        return json.trim();
    }

    trimmed
}

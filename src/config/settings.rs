//! Typed per-service settings resolved from the [`Config`] store.

use anyhow::Result;

use super::Config;

#[derive(Debug, Clone, PartialEq)]
pub struct N8nSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AirtableSettings {
    pub base_url: String,
    pub api_key: String,
    /// Used when a tool call does not name a base.
    pub base_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramSettings {
    pub base_url: String,
    pub bot_token: String,
    /// Used when `send_message` does not name a chat.
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Everything the server needs to wire its backends.
/// A service is `None` when its credential is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub n8n: Option<N8nSettings>,
    pub airtable: Option<AirtableSettings>,
    pub telegram: Option<TelegramSettings>,
    pub anthropic: Option<AnthropicSettings>,
}

impl Settings {
    /// Load against the process environment.
    pub fn load(config: &Config) -> Result<Self> {
        Self::load_with(config, |var| std::env::var(var).ok())
    }

    pub fn load_with<F>(config: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| config.resolve_with(key, &env);
        // Keys with defaults always resolve.
        let required = |key: &str| -> Result<String> { Ok(get(key)?.unwrap_or_default()) };

        let n8n = match get("n8n.api_key")? {
            Some(api_key) => Some(N8nSettings {
                base_url: required("n8n.base_url")?,
                api_key,
            }),
            None => None,
        };

        let airtable = match get("airtable.api_key")? {
            Some(api_key) => Some(AirtableSettings {
                base_url: required("airtable.base_url")?,
                api_key,
                base_id: get("airtable.base_id")?,
            }),
            None => None,
        };

        let telegram = match get("telegram.bot_token")? {
            Some(bot_token) => Some(TelegramSettings {
                base_url: required("telegram.base_url")?,
                bot_token,
                chat_id: get("telegram.chat_id")?,
            }),
            None => None,
        };

        let anthropic = match get("anthropic.api_key")? {
            Some(api_key) => Some(AnthropicSettings {
                base_url: required("anthropic.base_url")?,
                api_key,
                model: required("anthropic.model")?,
            }),
            None => None,
        };

        Ok(Self {
            n8n,
            airtable,
            telegram,
            anthropic,
        })
    }

    /// Names of services with no credential, for startup warnings.
    pub fn missing_services(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.n8n.is_none() {
            missing.push("n8n");
        }
        if self.airtable.is_none() {
            missing.push("airtable");
        }
        if self.telegram.is_none() {
            missing.push("telegram");
        }
        if self.anthropic.is_none() {
            missing.push("anthropic");
        }
        missing
    }
}

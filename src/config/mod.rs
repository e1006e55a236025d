//! Persistent settings backed by SQLite.
//!
//! Every setting has a dotted key (`n8n.api_key`), an environment variable
//! and an optional built-in default. Lookups go stored value → environment
//! → default, so `flowsmith config set` always wins over the shell.

pub mod settings;

pub use settings::Settings;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

use crate::consts::{
    DEFAULT_AIRTABLE_URL, DEFAULT_ANTHROPIC_URL, DEFAULT_MODEL, DEFAULT_N8N_URL,
    DEFAULT_TELEGRAM_URL,
};

/// A known configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub key: &'static str,
    pub env: &'static str,
    pub default: Option<&'static str>,
    /// Masked when listed.
    pub secret: bool,
}

const fn setting(
    key: &'static str,
    env: &'static str,
    default: Option<&'static str>,
    secret: bool,
) -> Setting {
    Setting {
        key,
        env,
        default,
        secret,
    }
}

/// Every key the server understands.
pub const SETTINGS: &[Setting] = &[
    setting("n8n.base_url", "N8N_BASE_URL", Some(DEFAULT_N8N_URL), false),
    setting("n8n.api_key", "N8N_API_KEY", None, true),
    setting(
        "airtable.base_url",
        "AIRTABLE_BASE_URL",
        Some(DEFAULT_AIRTABLE_URL),
        false,
    ),
    setting("airtable.api_key", "AIRTABLE_API_KEY", None, true),
    setting("airtable.base_id", "AIRTABLE_BASE_ID", None, false),
    setting(
        "telegram.base_url",
        "TELEGRAM_BASE_URL",
        Some(DEFAULT_TELEGRAM_URL),
        false,
    ),
    setting("telegram.bot_token", "TELEGRAM_BOT_TOKEN", None, true),
    setting("telegram.chat_id", "TELEGRAM_CHAT_ID", None, false),
    setting(
        "anthropic.base_url",
        "ANTHROPIC_BASE_URL",
        Some(DEFAULT_ANTHROPIC_URL),
        false,
    ),
    setting("anthropic.api_key", "ANTHROPIC_API_KEY", None, true),
    setting("anthropic.model", "ANTHROPIC_MODEL", Some(DEFAULT_MODEL), false),
];

/// Find a setting by its dotted key.
pub fn lookup(key: &str) -> Option<&'static Setting> {
    SETTINGS.iter().find(|s| s.key == key)
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Stored,
    Env(&'static str),
    Default,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::Env(var) => write!(f, "env {var}"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("config database lock poisoned"))
    }

    /// Get a stored value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Store a value (upsert). Unknown keys are rejected.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if lookup(key).is_none() {
            bail!("unknown setting: {key}");
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a stored key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Resolve a setting against the process environment.
    pub fn resolve(&self, key: &str) -> Result<Option<String>> {
        self.resolve_with(key, |var| std::env::var(var).ok())
    }

    /// Resolve a setting: stored → `env(var)` → default. Empty strings count as unset.
    pub fn resolve_with<F>(&self, key: &str, env: F) -> Result<Option<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(self.resolve_source_with(key, env)?.map(|(value, _)| value))
    }

    /// Like [`resolve_with`](Self::resolve_with), also reporting where the value came from.
    pub fn resolve_source_with<F>(&self, key: &str, env: F) -> Result<Option<(String, Source)>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = lookup(key).ok_or_else(|| anyhow!("unknown setting: {key}"))?;

        if let Some(value) = self.get(key)?
            && !value.is_empty()
        {
            return Ok(Some((value, Source::Stored)));
        }

        if let Some(value) = env(setting.env)
            && !value.is_empty()
        {
            return Ok(Some((value, Source::Env(setting.env))));
        }

        Ok(setting.default.map(|v| (v.to_string(), Source::Default)))
    }
}

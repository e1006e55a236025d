//! Project-wide constants.

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// MCP protocol revision we speak.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Default Anthropic model for requirement optimization.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

pub const DEFAULT_N8N_URL: &str = "http://localhost:5678";
pub const DEFAULT_AIRTABLE_URL: &str = "https://api.airtable.com";
pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";

/// Default number of updates fetched by `get_messages`.
pub const DEFAULT_MESSAGE_LIMIT: u64 = 10;

/// Telegram caps `getUpdates` at 100 per call.
pub const MAX_MESSAGE_LIMIT: u64 = 100;

/// Default database path: `~/.flowsmith/flowsmith.db`.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".flowsmith").join("flowsmith.db"))
}

/// Mask a secret for display, keeping the last four characters.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_are_non_empty() {
        assert!(!SERVER_NAME.is_empty());
        assert!(!SERVER_VERSION.is_empty());
        assert!(!REPO.is_empty());
        assert!(!DEFAULT_MODEL.is_empty());
    }

    #[test]
    fn consts_from_cargo_toml() {
        assert_eq!(SERVER_NAME, "flowsmith");
        assert!(REPO.contains("github.com/assapir/flowsmith"));
    }

    #[test]
    fn default_db_path_ends_with_db_file() {
        let path = default_db_path().unwrap();
        assert!(path.ends_with(".flowsmith/flowsmith.db"));
    }

    #[test]
    fn mask_secret_keeps_tail() {
        assert_eq!(mask_secret("abcdefgh"), "****efgh");
    }

    #[test]
    fn mask_secret_short_fully_masked() {
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn message_limits_ordered() {
        assert!(DEFAULT_MESSAGE_LIMIT <= MAX_MESSAGE_LIMIT);
    }
}

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::FEED_URL;

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Environment override for the bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment override for the chat id.
pub const CHAT_ENV: &str = "TELEGRAM_CHAT_ID";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Telegram credentials. Either field may stay empty in the file and be
/// supplied through the environment instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Target chat or channel, e.g. `-1001234567890`.
    #[serde(default)]
    pub chat_id: String,
}

/// Runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Report file the ledger is persisted to.
    #[serde(default = "default_report_path")]
    pub report_path: String,
    /// Timeout in seconds for every upstream HTTP call.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Locale segment of the Epic catalog and store URLs.
    #[serde(default = "default_epic_locale")]
    pub epic_locale: String,
    /// Two-letter country for Epic pricing and the image search.
    #[serde(default = "default_epic_country")]
    pub epic_country: String,
    /// Aggregator feed listing URL.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
}

fn default_report_path() -> String {
    "sent_games.txt".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_epic_locale() -> String {
    "tr".to_string()
}

fn default_epic_country() -> String {
    "TR".to_string()
}

fn default_feed_url() -> String {
    FEED_URL.to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            report_path: default_report_path(),
            http_timeout_secs: default_http_timeout(),
            epic_locale: default_epic_locale(),
            epic_country: default_epic_country(),
            feed_url: default_feed_url(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path. A missing file yields the
    /// defaults, so the watcher can be configured purely via environment.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Telegram credentials with environment overrides applied.
    pub fn telegram_credentials(&self) -> Result<(String, String)> {
        resolve_credentials(
            &self.telegram,
            env_non_empty(TOKEN_ENV),
            env_non_empty(CHAT_ENV),
        )
    }
}

/// Pick credentials, preferring environment values over the config file.
fn resolve_credentials(
    telegram: &TelegramConfig,
    env_token: Option<String>,
    env_chat: Option<String>,
) -> Result<(String, String)> {
    let token = env_token.or_else(|| non_empty(&telegram.bot_token));
    let chat_id = env_chat.or_else(|| non_empty(&telegram.chat_id));
    match (token, chat_id) {
        (Some(token), Some(chat_id)) => Ok((token, chat_id)),
        (None, _) => bail!("no bot token: set {TOKEN_ENV} or [telegram] bot_token"),
        (_, None) => bail!("no chat id: set {CHAT_ENV} or [telegram] chat_id"),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().as_deref().and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telegram(token: &str, chat_id: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    // ── toml parsing ───────────────────────────────────────────────

    #[test]
    fn empty_toml_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.report_path, "sent_games.txt");
        assert_eq!(config.settings.http_timeout_secs, 10);
        assert_eq!(config.settings.epic_locale, "tr");
        assert_eq!(config.settings.epic_country, "TR");
        assert_eq!(config.settings.feed_url, FEED_URL);
        assert!(config.telegram.bot_token.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [telegram]
            bot_token = "42:token"
            chat_id = "-100123"

            [settings]
            report_path = "/var/lib/freegames/sent.txt"
            http_timeout_secs = 30
            epic_locale = "en-US"
            epic_country = "US"
            feed_url = "https://feed.test/new.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "42:token");
        assert_eq!(config.telegram.chat_id, "-100123");
        assert_eq!(config.settings.report_path, "/var/lib/freegames/sent.txt");
        assert_eq!(config.settings.http_timeout_secs, 30);
        assert_eq!(config.settings.epic_locale, "en-US");
        assert_eq!(config.settings.epic_country, "US");
        assert_eq!(config.settings.feed_url, "https://feed.test/new.json");
    }

    #[test]
    fn partial_settings_keep_remaining_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [settings]
            http_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.http_timeout_secs, 5);
        assert_eq!(config.settings.report_path, "sent_games.txt");
        assert_eq!(config.settings.epic_country, "TR");
    }

    #[test]
    fn load_of_missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/freegame-watch.toml")).unwrap();
        assert_eq!(config.settings.report_path, "sent_games.txt");
    }

    // ── credential resolution ──────────────────────────────────────

    #[test]
    fn environment_wins_over_config() {
        let (token, chat_id) = resolve_credentials(
            &telegram("file:token", "file-chat"),
            Some("env:token".to_string()),
            Some("env-chat".to_string()),
        )
        .unwrap();
        assert_eq!(token, "env:token");
        assert_eq!(chat_id, "env-chat");
    }

    #[test]
    fn config_fills_in_when_environment_is_unset() {
        let (token, chat_id) =
            resolve_credentials(&telegram("file:token", "file-chat"), None, None).unwrap();
        assert_eq!(token, "file:token");
        assert_eq!(chat_id, "file-chat");
    }

    #[test]
    fn mixed_sources_resolve_field_by_field() {
        let (token, chat_id) = resolve_credentials(
            &telegram("file:token", "file-chat"),
            None,
            Some("env-chat".to_string()),
        )
        .unwrap();
        assert_eq!(token, "file:token");
        assert_eq!(chat_id, "env-chat");
    }

    #[test]
    fn missing_token_names_both_places_to_set_it() {
        let err = resolve_credentials(&telegram("", "chat"), None, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(TOKEN_ENV));
        assert!(message.contains("bot_token"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = resolve_credentials(&telegram("   ", "chat"), None, None).unwrap_err();
        assert!(err.to_string().contains("no bot token"));
    }
}

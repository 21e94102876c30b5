use std::{env, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Secrets
    pub telegram_bot_token: String,
    pub openai_api_key: String,

    // Completion service
    pub openai_model: String,
    pub openai_base_url: String,
    pub completion_timeout: Duration,

    // Message log
    pub message_db_path: PathBuf,

    // Telegram limits
    pub telegram_message_limit: usize,
}

impl Config {
    /// Load from the process environment, after an optional `.env` file.
    ///
    /// Values already present in the environment win over `.env`.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("failed to read .env: {e}"))),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let openai_api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            Error::Config("OPENAI_API_KEY environment variable is required".to_string())
        })?;

        let openai_model = get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let openai_base_url = get("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let completion_timeout =
            Duration::from_millis(parse_num(&get, "COMPLETION_TIMEOUT_MS")?.unwrap_or(60_000));

        let message_db_path = PathBuf::from(
            get("MESSAGE_DB_PATH").unwrap_or_else(|| "messages.db".to_string()),
        );

        let telegram_message_limit =
            parse_num(&get, "TELEGRAM_MESSAGE_LIMIT")?.unwrap_or(4096) as usize;
        if telegram_message_limit == 0 {
            return Err(Error::Config(
                "TELEGRAM_MESSAGE_LIMIT must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            openai_model,
            openai_base_url,
            completion_timeout,
            message_db_path,
            telegram_message_limit,
        })
    }
}

fn parse_num(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

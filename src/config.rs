// Runtime configuration, read from the environment (and `.env` via dotenv).
//
// The Discord token is the only required value. Everything else has a
// sensible default so a fresh checkout runs with just DISCORD_TOKEN set.

use crate::core::moderation::{AutobanConfig, DEFAULT_BAN_REASON, DEFAULT_LOG_CHANNEL};
use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "data/warden.db";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_PREFIX: &str = "!";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")]
    MissingToken,

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub database_path: String,
    pub http_port: u16,
    pub command_prefix: String,
    pub autoban: AutobanConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::MissingToken)?;

        let http_port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            None => DEFAULT_HTTP_PORT,
        };

        let autoban_enabled = match get("AUTOBAN_ENABLED") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid {
                key: "AUTOBAN_ENABLED",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            discord_token,
            database_path: get("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            http_port,
            command_prefix: get("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            autoban: AutobanConfig {
                enabled: autoban_enabled,
                ban_reason: DEFAULT_BAN_REASON.to_string(),
                log_channel_name: get("LOG_CHANNEL_NAME")
                    .unwrap_or_else(|| DEFAULT_LOG_CHANNEL.to_string()),
            },
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

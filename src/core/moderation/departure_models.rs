// Moderation domain models - data structures for auto-ban on departure.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer will convert these to Discord-specific actions.

use chrono::{DateTime, Utc};

pub const DEFAULT_BAN_REASON: &str = "Auto-ban: left the server";
pub const DEFAULT_LOG_CHANNEL: &str = "logs";

/// A member leaving a guild.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub guild_id: u64,
    pub user_id: u64,
    pub display_name: String,
    pub is_bot: bool,
    pub left_at: DateTime<Utc>,
}

/// What the log channel is told after a successful ban.
#[derive(Debug, Clone, PartialEq)]
pub struct BanNotice {
    pub guild_id: u64,
    pub user_id: u64,
    pub display_name: String,
    pub reason: String,
    pub banned_at: DateTime<Utc>,
}

/// Why a departure did not lead to a ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Auto-ban is switched off.
    Disabled,
    /// Bots are recorded but never banned.
    Bot,
}

/// Result of handling a departure.
#[derive(Debug, Clone, PartialEq)]
pub enum DepartureOutcome {
    /// `logged` is false when no log channel took the notice.
    Banned { logged: bool },
    /// The ban call failed (usually missing permissions).
    BanFailed { reason: String },
    Skipped(SkipReason),
}

/// Auto-ban behaviour.
#[derive(Debug, Clone)]
pub struct AutobanConfig {
    pub enabled: bool,
    pub ban_reason: String,
    /// Name (not id) of the channel that receives ban notices.
    pub log_channel_name: String,
}

impl Default for AutobanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ban_reason: DEFAULT_BAN_REASON.to_string(),
            log_channel_name: DEFAULT_LOG_CHANNEL.to_string(),
        }
    }
}

// Link-code domain models.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer turns them into embeds and role grants.

use chrono::{DateTime, Utc};

/// A redeemable code that grants a role in a specific guild.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleLink {
    pub id: i64,
    pub code: String,
    pub guild_id: u64,
    pub role_id: u64,
    pub role_name: String,
    /// How many redemptions are allowed. 0 means unlimited.
    pub uses_limit: u32,
    pub uses_count: u32,
    /// A link past this instant is unusable even if still flagged active.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: u64,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

/// How a link looks to someone trying to use it right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Usable,
    Exhausted,
    Expired,
    Inactive,
}

impl LinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Usable => "🟢 Usable",
            LinkStatus::Exhausted => "🟠 Used up",
            LinkStatus::Expired => "🔴 Expired",
            LinkStatus::Inactive => "⚫ Inactive",
        }
    }
}

impl RoleLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    pub fn is_exhausted(&self) -> bool {
        self.uses_limit > 0 && self.uses_count >= self.uses_limit
    }

    /// Expiry wins over everything else: an expired link never comes back.
    pub fn status(&self, now: DateTime<Utc>) -> LinkStatus {
        if self.is_expired(now) {
            LinkStatus::Expired
        } else if !self.active {
            LinkStatus::Inactive
        } else if self.is_exhausted() {
            LinkStatus::Exhausted
        } else {
            LinkStatus::Usable
        }
    }

    /// Remaining redemptions, or `None` when the link is unlimited.
    pub fn remaining_uses(&self) -> Option<u32> {
        if self.uses_limit == 0 {
            None
        } else {
            Some(self.uses_limit.saturating_sub(self.uses_count))
        }
    }
}

/// Everything the store needs to persist a freshly issued link.
#[derive(Debug, Clone)]
pub struct NewRoleLink {
    pub code: String,
    pub guild_id: u64,
    pub role_id: u64,
    pub role_name: String,
    pub uses_limit: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: u64,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
}

/// A successful redemption. Counters are post-increment.
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    pub role_id: u64,
    pub role_name: String,
    pub uses_count: u32,
    pub uses_limit: u32,
}

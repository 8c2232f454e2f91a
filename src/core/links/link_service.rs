// Link-code service - issuing and redeeming role-grant codes.
//
// Platform-agnostic like the rest of core/: the Discord layer hands us
// primitive ids and names, we hand back plain results.

use super::link_models::{NewRoleLink, Redemption, RoleLink};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use thiserror::Error;

/// 24 alphanumeric characters is roughly 142 bits of entropy.
pub const CODE_LENGTH: usize = 24;

/// Links can be set to expire at most ten years out.
pub const MAX_EXPIRY_HOURS: u32 = 24 * 365 * 10;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("No active link code `{0}` exists in this server")]
    NotFound(String),

    #[error("This code has reached its limit of {limit} use(s)")]
    LimitExhausted { limit: u32 },

    #[error("This code expired on {0}")]
    Expired(DateTime<Utc>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two codes collided. This means the generator is broken, so we refuse
    /// to continue instead of overwriting someone else's link.
    #[error("Generated link code already exists")]
    DuplicateCode,

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl LinkError {
    /// Errors caused by what the user typed or by the state of the code,
    /// as opposed to infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LinkError::NotFound(_)
                | LinkError::LimitExhausted { .. }
                | LinkError::Expired(_)
                | LinkError::InvalidInput(_)
        )
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// What happened to a guarded redemption at the storage layer.
#[derive(Debug, Clone)]
pub enum RedeemAttempt {
    Redeemed(Redemption),
    /// The guard refused the increment. Carries the stored row (if any) so
    /// the service can explain why.
    Rejected(Option<RoleLink>),
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Persist a new link. Must fail with `DuplicateCode` instead of
    /// replacing an existing code.
    async fn insert_link(&self, link: NewRoleLink) -> Result<RoleLink, LinkError>;

    /// Increment `uses_count` for an active, unexpired, non-exhausted link in
    /// a single atomic step.
    async fn try_redeem(
        &self,
        code: &str,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<RedeemAttempt, LinkError>;

    /// Links still flagged active, newest first.
    async fn list_active(&self, guild_id: u64) -> Result<Vec<RoleLink>, LinkError>;

    /// Clear the active flag. Returns false if no active link matched.
    async fn deactivate(&self, code: &str, guild_id: u64) -> Result<bool, LinkError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Parameters for issuing a link.
#[derive(Debug, Clone)]
pub struct IssueLink {
    pub guild_id: u64,
    pub role_id: u64,
    pub role_name: String,
    pub actor_id: u64,
    pub actor_name: String,
    /// 0 = unlimited.
    pub uses_limit: u32,
    /// 0 = never expires.
    pub expires_in_hours: u32,
}

pub struct LinkService<S: LinkStore> {
    store: S,
}

impl<S: LinkStore> LinkService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Issue a new code for a role.
    pub async fn issue(&self, request: IssueLink) -> Result<RoleLink, LinkError> {
        if request.role_name.trim().is_empty() {
            return Err(LinkError::InvalidInput("role name is empty".to_string()));
        }

        if request.expires_in_hours > MAX_EXPIRY_HOURS {
            return Err(LinkError::InvalidInput(format!(
                "expiry can be at most {} hours (10 years)",
                MAX_EXPIRY_HOURS
            )));
        }

        let created_at = Utc::now();
        let expires_at = match request.expires_in_hours {
            0 => None,
            hours => Some(
                created_at
                    .checked_add_signed(Duration::hours(i64::from(hours)))
                    .ok_or_else(|| LinkError::InvalidInput("expiry is out of range".to_string()))?,
            ),
        };

        let link = self
            .store
            .insert_link(NewRoleLink {
                code: generate_code(),
                guild_id: request.guild_id,
                role_id: request.role_id,
                role_name: request.role_name,
                uses_limit: request.uses_limit,
                expires_at,
                created_by: request.actor_id,
                created_by_name: request.actor_name,
                created_at,
            })
            .await?;

        tracing::info!(
            link_id = link.id,
            guild_id = link.guild_id,
            role_id = link.role_id,
            uses_limit = link.uses_limit,
            created_by = link.created_by,
            "Issued link code"
        );

        Ok(link)
    }

    /// Redeem a code right now.
    pub async fn redeem(&self, code: &str, guild_id: u64) -> Result<Redemption, LinkError> {
        self.redeem_at(code, guild_id, Utc::now()).await
    }

    /// Redeem a code as of `now`.
    ///
    /// Failures are reported in a fixed order: missing (or deactivated)
    /// first, then used up, then expired.
    pub async fn redeem_at(
        &self,
        code: &str,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Redemption, LinkError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LinkError::InvalidInput("code is empty".to_string()));
        }

        match self.store.try_redeem(code, guild_id, now).await? {
            RedeemAttempt::Redeemed(redemption) => {
                tracing::info!(
                    guild_id,
                    role_id = redemption.role_id,
                    uses_count = redemption.uses_count,
                    uses_limit = redemption.uses_limit,
                    "Link code redeemed"
                );
                Ok(redemption)
            }
            RedeemAttempt::Rejected(None) => Err(LinkError::NotFound(code.to_string())),
            RedeemAttempt::Rejected(Some(link)) => {
                if !link.active {
                    Err(LinkError::NotFound(code.to_string()))
                } else if link.is_exhausted() {
                    Err(LinkError::LimitExhausted {
                        limit: link.uses_limit,
                    })
                } else if let Some(expires_at) = link.expires_at.filter(|_| link.is_expired(now)) {
                    Err(LinkError::Expired(expires_at))
                } else {
                    Err(LinkError::StorageError(format!(
                        "redemption of `{}` was refused by the store",
                        code
                    )))
                }
            }
        }
    }

    /// Links flagged active in this guild, newest first.
    ///
    /// Expired and used-up links are included; use `RoleLink::status` when
    /// displaying them.
    pub async fn list_active(&self, guild_id: u64) -> Result<Vec<RoleLink>, LinkError> {
        self.store.list_active(guild_id).await
    }

    /// Switch a link off without deleting it.
    pub async fn deactivate(&self, code: &str, guild_id: u64) -> Result<bool, LinkError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LinkError::InvalidInput("code is empty".to_string()));
        }
        let deactivated = self.store.deactivate(code, guild_id).await?;
        if deactivated {
            tracing::info!(guild_id, "Link code deactivated");
        }
        Ok(deactivated)
    }
}

/// Draw a fresh opaque code from the OS CSPRNG.
fn generate_code() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

// Departure service - decides what happens when a member leaves.
//
// The actual ban and log message go through `MemberGateway`, so this file
// never talks to Discord directly and can be tested with a fake gateway.

use super::departure_models::{AutobanConfig, BanNotice, Departure, DepartureOutcome, SkipReason};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing permissions: {0}")]
    Forbidden(String),

    #[error("Platform error: {0}")]
    Platform(String),
}

// ============================================================================
// GATEWAY TRAIT (PORT)
// ============================================================================

/// Side effects the departure policy needs from the chat platform.
#[async_trait]
pub trait MemberGateway: Send + Sync {
    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError>;

    /// Post a ban notice to the channel called `channel_name`.
    /// Returns false if the guild has no such channel.
    async fn post_ban_notice(
        &self,
        channel_name: &str,
        notice: &BanNotice,
    ) -> Result<bool, GatewayError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct DepartureService {
    config: AutobanConfig,
    // (guild_id, user_id) -> latest departure
    departures: DashMap<(u64, u64), Departure>,
}

impl DepartureService {
    pub fn new(config: AutobanConfig) -> Self {
        Self {
            config,
            departures: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AutobanConfig {
        &self.config
    }

    /// Record the departure and ban the member if the policy says so.
    ///
    /// Never returns an error: a failed ban or log post is reported in the
    /// outcome and logged, and the event handler carries on.
    pub async fn handle_departure<G>(&self, gateway: &G, departure: Departure) -> DepartureOutcome
    where
        G: MemberGateway + ?Sized,
    {
        self.departures
            .insert((departure.guild_id, departure.user_id), departure.clone());

        if !self.config.enabled {
            return DepartureOutcome::Skipped(SkipReason::Disabled);
        }
        if departure.is_bot {
            tracing::debug!(user_id = departure.user_id, "Bot left, not banning");
            return DepartureOutcome::Skipped(SkipReason::Bot);
        }

        if let Err(err) = gateway
            .ban(departure.guild_id, departure.user_id, &self.config.ban_reason)
            .await
        {
            tracing::warn!(
                guild_id = departure.guild_id,
                user_id = departure.user_id,
                "Could not ban {}: {}",
                departure.display_name,
                err
            );
            return DepartureOutcome::BanFailed {
                reason: err.to_string(),
            };
        }

        tracing::info!(
            guild_id = departure.guild_id,
            user_id = departure.user_id,
            "Banned {} after leaving",
            departure.display_name
        );

        let notice = BanNotice {
            guild_id: departure.guild_id,
            user_id: departure.user_id,
            display_name: departure.display_name,
            reason: self.config.ban_reason.clone(),
            banned_at: departure.left_at,
        };

        let logged = match gateway
            .post_ban_notice(&self.config.log_channel_name, &notice)
            .await
        {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(guild_id = notice.guild_id, "Failed to post ban notice: {}", err);
                false
            }
        };

        DepartureOutcome::Banned { logged }
    }

    /// How many distinct departures this process has seen.
    pub fn departures_processed(&self) -> usize {
        self.departures.len()
    }

    #[cfg(test)]
    pub fn last_departure(&self, guild_id: u64, user_id: u64) -> Option<Departure> {
        self.departures
            .get(&(guild_id, user_id))
            .map(|entry| entry.value().clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! Tunables of the session lifecycle.

use std::time::Duration;

/// How the proactive renewal period is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenewalStrategy {
    /// Renew every [`SessionConfig::renewal_interval`].
    #[default]
    Fixed,
    /// Renew after 80% of the access token's remaining lifetime, falling
    /// back to the fixed interval when the token has no `exp` claim.
    TokenLifetime,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Nominal access-token lifetime.
    pub access_token_lifetime: Duration,
    /// Period of the proactive renewal timer.
    pub renewal_interval: Duration,
    /// How the renewal period is chosen.
    pub renewal_strategy: RenewalStrategy,
    /// Tokens expiring within this window count as near expiry.
    pub expiry_threshold: Duration,
    /// Period of the durable-store poll.
    pub cookie_poll_interval: Duration,
    /// Refresh cookie max-age when the token does not say otherwise.
    pub refresh_cookie_max_age: Duration,
    /// Upper bound of the refresh cookie max-age.
    pub refresh_cookie_max_age_limit: Duration,
    /// Mark persisted cookies `Secure`.
    pub secure_cookies: bool,
    /// Attempts at creating the primary onboarding resource.
    pub onboarding_attempts: u32,
    /// Delay between onboarding attempts.
    pub onboarding_retry_delay: Duration,
}

/// Share of the access-token lifetime after which the timer renews.
pub const RENEWAL_FRACTION: f64 = 0.8;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

impl Default for SessionConfig {
    fn default() -> Self {
        let access_token_lifetime = Duration::from_secs(15 * 60);
        Self {
            access_token_lifetime,
            renewal_interval: access_token_lifetime.mul_f64(RENEWAL_FRACTION),
            renewal_strategy: RenewalStrategy::Fixed,
            expiry_threshold: Duration::from_secs(5 * 60),
            cookie_poll_interval: Duration::from_millis(500),
            refresh_cookie_max_age: DAY * 7,
            refresh_cookie_max_age_limit: DAY * 30,
            secure_cookies: false,
            onboarding_attempts: 3,
            onboarding_retry_delay: Duration::from_millis(1500),
        }
    }
}

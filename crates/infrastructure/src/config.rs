//! Client configuration.
//!
//! Settings come from an optional TOML file, then from `TESSERA_*`
//! environment variables. Nested keys use a double underscore:
//!
//! ```text
//! TESSERA_API_BASE_URL=https://id.example.com/api
//! TESSERA_SESSION__RENEWAL_STRATEGY=token_lifetime
//! TESSERA_SESSION__SECURE_COOKIES=true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tessera_application::{RenewalStrategy, SessionConfig};
use thiserror::Error;
use url::Url;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TESSERA";

/// Default name of the configuration file.
pub const CONFIG_FILE: &str = "tessera.toml";

/// Why the configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was read but is not acceptable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Renewal period selection as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalMode {
    /// Fixed interval.
    #[default]
    Fixed,
    /// Derived from the access token's lifetime.
    TokenLifetime,
}

impl From<RenewalMode> for RenewalStrategy {
    fn from(mode: RenewalMode) -> Self {
        match mode {
            RenewalMode::Fixed => Self::Fixed,
            RenewalMode::TokenLifetime => Self::TokenLifetime,
        }
    }
}

/// Session lifecycle settings, in whole seconds or milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Nominal access-token lifetime.
    pub access_token_lifetime_secs: u64,
    /// Renewal timer period; defaults to 80% of the token lifetime.
    pub renewal_interval_secs: Option<u64>,
    /// How the renewal period is chosen.
    pub renewal_strategy: RenewalMode,
    /// Near-expiry window.
    pub expiry_threshold_secs: u64,
    /// Cookie poll period.
    pub cookie_poll_interval_ms: u64,
    /// Default refresh cookie max-age.
    pub refresh_cookie_max_age_secs: u64,
    /// Upper bound of the refresh cookie max-age.
    pub refresh_cookie_max_age_limit_secs: u64,
    /// Mark cookies `Secure`.
    pub secure_cookies: bool,
    /// Employee creation attempts during onboarding.
    pub onboarding_attempts: u32,
    /// Delay between onboarding attempts.
    pub onboarding_retry_delay_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            access_token_lifetime_secs: defaults.access_token_lifetime.as_secs(),
            renewal_interval_secs: None,
            renewal_strategy: RenewalMode::Fixed,
            expiry_threshold_secs: defaults.expiry_threshold.as_secs(),
            cookie_poll_interval_ms: millis(defaults.cookie_poll_interval),
            refresh_cookie_max_age_secs: defaults.refresh_cookie_max_age.as_secs(),
            refresh_cookie_max_age_limit_secs: defaults.refresh_cookie_max_age_limit.as_secs(),
            secure_cookies: defaults.secure_cookies,
            onboarding_attempts: defaults.onboarding_attempts,
            onboarding_retry_delay_ms: millis(defaults.onboarding_retry_delay),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SessionSettings {
    /// Convert to the session core's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero periods or attempts.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        if self.access_token_lifetime_secs == 0 {
            return Err(invalid("session.access_token_lifetime_secs must be positive"));
        }
        if self.renewal_interval_secs == Some(0) {
            return Err(invalid("session.renewal_interval_secs must be positive"));
        }
        if self.cookie_poll_interval_ms == 0 {
            return Err(invalid("session.cookie_poll_interval_ms must be positive"));
        }
        if self.onboarding_attempts == 0 {
            return Err(invalid("session.onboarding_attempts must be at least 1"));
        }
        if self.refresh_cookie_max_age_secs > self.refresh_cookie_max_age_limit_secs {
            return Err(invalid(
                "session.refresh_cookie_max_age_secs exceeds its limit",
            ));
        }

        let access_token_lifetime = Duration::from_secs(self.access_token_lifetime_secs);
        let renewal_interval = self.renewal_interval_secs.map_or_else(
            || access_token_lifetime.mul_f64(tessera_application::config::RENEWAL_FRACTION),
            Duration::from_secs,
        );

        Ok(SessionConfig {
            access_token_lifetime,
            renewal_interval,
            renewal_strategy: self.renewal_strategy.into(),
            expiry_threshold: Duration::from_secs(self.expiry_threshold_secs),
            cookie_poll_interval: Duration::from_millis(self.cookie_poll_interval_ms),
            refresh_cookie_max_age: Duration::from_secs(self.refresh_cookie_max_age_secs),
            refresh_cookie_max_age_limit: Duration::from_secs(
                self.refresh_cookie_max_age_limit_secs,
            ),
            secure_cookies: self.secure_cookies,
            onboarding_attempts: self.onboarding_attempts,
            onboarding_retry_delay: Duration::from_millis(self.onboarding_retry_delay_ms),
        })
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Base URL of the identity and provisioning API.
    pub api_base_url: String,
    /// Cookie file; defaults to the platform data directory.
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    /// Keep cookies in memory only.
    #[serde(default)]
    pub ephemeral_cookies: bool,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionSettings,
}

const fn default_request_timeout() -> u64 {
    30
}

impl AppConfig {
    /// Load from `file` (or `tessera.toml` in the working directory) and
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = file.map_or_else(|| PathBuf::from(CONFIG_FILE), Path::to_path_buf);
        Self::from_sources(Some(&file), None)
    }

    /// Load from an optional file and an explicit environment map.
    ///
    /// `env` replaces the process environment when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed or a value is invalid.
    pub fn from_sources(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(false));
        }
        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);

        let loaded: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::Invalid(format!("api_base_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api_base_url: unsupported scheme {}",
                url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be positive"));
        }
        self.session.to_session_config().map(drop)
    }

    /// Session configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for out-of-range session settings.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        self.session.to_session_config()
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Where cookies are persisted, or `None` for memory only.
    #[must_use]
    pub fn cookie_path(&self) -> Option<PathBuf> {
        if self.ephemeral_cookies {
            return None;
        }
        self.cookie_file
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("tessera").join("cookies.json")))
    }
}

//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_BCRYPT_COST, DEFAULT_DATABASE_URL,
    DEFAULT_REFRESH_TOKEN_TTL,
};
use crate::{CoreError, CoreResult};
use chrono::Duration;

/// Signing material and lifetimes for issued tokens.
#[derive(Clone)]
pub struct JwtSettings {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtSettings {
    /// Create token settings.
    ///
    /// Both secrets must be non-empty and must differ, so that an access token can never be
    /// presented as a refresh token (or the reverse). Lifetimes must be positive and the refresh
    /// lifetime must exceed the access lifetime.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> CoreResult<Self> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        if access_secret.trim().is_empty() || refresh_secret.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must be set".into(),
            ));
        }
        if access_secret == refresh_secret {
            return Err(CoreError::InvalidConfig(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".into(),
            ));
        }
        if access_ttl <= Duration::zero() || refresh_ttl <= access_ttl {
            return Err(CoreError::InvalidConfig(
                "token lifetimes must be positive and refresh must outlive access".into(),
            ));
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_secret(&self) -> &[u8] {
        self.access_secret.as_bytes()
    }

    pub fn refresh_secret(&self) -> &[u8] {
        self.refresh_secret.as_bytes()
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_url: String,
    jwt: JwtSettings,
    bcrypt_cost: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(database_url: String, jwt: JwtSettings, bcrypt_cost: u32) -> CoreResult<Self> {
        if database_url.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "database_url cannot be empty".into(),
            ));
        }
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(CoreError::InvalidConfig(format!(
                "bcrypt cost must be between 4 and 31, got {bcrypt_cost}"
            )));
        }

        Ok(Self {
            database_url,
            jwt,
            bcrypt_cost,
        })
    }

    /// Resolve configuration from the process environment.
    ///
    /// Intended to be called once by a binary's `main`, after `.env` has been loaded.
    pub fn from_env() -> CoreResult<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());

        let access_ttl = ttl_from_env_value(
            std::env::var("ACCESS_TOKEN_EXPIRES_IN").ok(),
            DEFAULT_ACCESS_TOKEN_TTL,
        )?;
        let refresh_ttl = ttl_from_env_value(
            std::env::var("REFRESH_TOKEN_EXPIRES_IN").ok(),
            DEFAULT_REFRESH_TOKEN_TTL,
        )?;

        let jwt = JwtSettings::new(
            std::env::var("JWT_ACCESS_SECRET").unwrap_or_default(),
            std::env::var("JWT_REFRESH_SECRET").unwrap_or_default(),
            access_ttl,
            refresh_ttl,
        )?;

        let bcrypt_cost = bcrypt_cost_from_env_value(std::env::var("BCRYPT_SALT_ROUNDS").ok())?;

        Self::new(database_url, jwt, bcrypt_cost)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn jwt(&self) -> &JwtSettings {
        &self.jwt
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Parse a lifetime such as `15m` or `7d` from an optional string value.
///
/// If `value` is `None` or empty/whitespace, `default` is parsed instead. Supported units are
/// `s`, `m`, `h` and `d`; a bare number is taken as seconds.
pub fn ttl_from_env_value(value: Option<String>, default: &str) -> CoreResult<Duration> {
    let raw = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string());

    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw.as_str(), "s"),
    };

    let amount: i64 = digits
        .parse()
        .map_err(|_| CoreError::InvalidConfig(format!("invalid token lifetime: {raw}")))?;

    let ttl = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => None,
    };

    ttl.filter(|d| *d > Duration::zero())
        .ok_or_else(|| CoreError::InvalidConfig(format!("invalid token lifetime: {raw}")))
}

/// Parse the bcrypt cost from an optional string value, falling back to the default.
pub fn bcrypt_cost_from_env_value(value: Option<String>) -> CoreResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_BCRYPT_COST),
        Some(v) => v
            .parse()
            .map_err(|_| CoreError::InvalidConfig(format!("invalid BCRYPT_SALT_ROUNDS: {v}"))),
    }
}

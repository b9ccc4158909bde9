use chrono::Duration;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default bind port when neither `BIND_ADDRESS` nor `PORT` is set.
pub const DEFAULT_PORT: &str = "8080";

/// Default signing key lifetime (1 hour).
pub const DEFAULT_ROTATION_WINDOW_SECONDS: i64 = 3600;

/// Longest accepted signing key lifetime (30 days).
pub const MAX_ROTATION_WINDOW_SECONDS: i64 = 30 * 24 * 3600;

/// Default RSA modulus size.
pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

/// RSA modulus bounds. Below 2048 is not acceptable for RS256; above 4096
/// makes lazy rotation stall requests for seconds.
pub const MIN_RSA_KEY_BITS: usize = 2048;
pub const MAX_RSA_KEY_BITS: usize = 4096;

/// Default token lifetime (15 minutes).
pub const DEFAULT_TOKEN_LIFETIME_SECONDS: i64 = 900;

/// Longest accepted token lifetime (7 days).
pub const MAX_TOKEN_LIFETIME_SECONDS: i64 = 7 * 24 * 3600;

pub const DEFAULT_TOKEN_SUBJECT: &str = "fake-user";

/// Number of rotated-out key pairs kept in memory.
pub const DEFAULT_RETIRED_KEY_HISTORY: usize = 24;

/// `Cache-Control: max-age` for the JWKS document.
pub const DEFAULT_JWKS_MAX_AGE_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub rotation_window_seconds: i64,
    pub rsa_key_bits: usize,
    pub token_lifetime_seconds: i64,
    pub token_subject: String,
    pub retired_key_history: usize,
    pub jwks_max_age_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            rotation_window_seconds: DEFAULT_ROTATION_WINDOW_SECONDS,
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            token_lifetime_seconds: DEFAULT_TOKEN_LIFETIME_SECONDS,
            token_subject: DEFAULT_TOKEN_SUBJECT.to_string(),
            retired_key_history: DEFAULT_RETIRED_KEY_HISTORY,
            jwks_max_age_seconds: DEFAULT_JWKS_MAX_AGE_SECONDS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = match (vars.get("BIND_ADDRESS"), vars.get("PORT")) {
            (Some(addr), _) => addr.clone(),
            (None, Some(port)) => {
                port.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                    var: "PORT".to_string(),
                    reason: e.to_string(),
                })?;
                format!("0.0.0.0:{}", port)
            }
            (None, None) => format!("0.0.0.0:{}", DEFAULT_PORT),
        };

        let rotation_window_seconds = parse_var(
            vars,
            "KEY_ROTATION_WINDOW_SECONDS",
            DEFAULT_ROTATION_WINDOW_SECONDS,
        )?;
        check_seconds(
            "KEY_ROTATION_WINDOW_SECONDS",
            rotation_window_seconds,
            MAX_ROTATION_WINDOW_SECONDS,
        )?;

        let rsa_key_bits = parse_var(vars, "RSA_KEY_BITS", DEFAULT_RSA_KEY_BITS)?;
        if !(MIN_RSA_KEY_BITS..=MAX_RSA_KEY_BITS).contains(&rsa_key_bits) {
            return Err(invalid(
                "RSA_KEY_BITS",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_RSA_KEY_BITS, MAX_RSA_KEY_BITS, rsa_key_bits
                ),
            ));
        }

        let token_lifetime_seconds =
            parse_var(vars, "TOKEN_LIFETIME_SECONDS", DEFAULT_TOKEN_LIFETIME_SECONDS)?;
        check_seconds(
            "TOKEN_LIFETIME_SECONDS",
            token_lifetime_seconds,
            MAX_TOKEN_LIFETIME_SECONDS,
        )?;

        let token_subject = vars
            .get("TOKEN_SUBJECT")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOKEN_SUBJECT.to_string());
        if token_subject.trim().is_empty() {
            return Err(invalid("TOKEN_SUBJECT", "must not be empty".to_string()));
        }

        let retired_key_history =
            parse_var(vars, "RETIRED_KEY_HISTORY", DEFAULT_RETIRED_KEY_HISTORY)?;

        let jwks_max_age_seconds =
            parse_var(vars, "JWKS_MAX_AGE_SECONDS", DEFAULT_JWKS_MAX_AGE_SECONDS)?;

        Ok(Config {
            bind_address,
            rotation_window_seconds,
            rsa_key_bits,
            token_lifetime_seconds,
            token_subject,
            retired_key_history,
            jwks_max_age_seconds,
        })
    }

    /// Out-of-range values (only reachable by building `Config` by hand)
    /// saturate to `Duration::MAX`; expiry arithmetic then fails cleanly.
    pub fn rotation_window(&self) -> Duration {
        Duration::try_seconds(self.rotation_window_seconds).unwrap_or(Duration::MAX)
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::try_seconds(self.token_lifetime_seconds).unwrap_or(Duration::MAX)
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(var) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| invalid(var, e.to_string())),
        None => Ok(default),
    }
}

fn check_seconds(var: &str, value: i64, max: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(invalid(var, format!("must be positive, got {}", value)));
    }
    if value > max {
        return Err(invalid(
            var,
            format!("must be at most {} seconds, got {}", max, value),
        ));
    }
    Ok(())
}

fn invalid(var: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        reason,
    }
}

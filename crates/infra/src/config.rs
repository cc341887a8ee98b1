//! Runtime configuration for the access-control services.
//!
//! Read from `CALLGRID_*` environment variables; every value has a default.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use callgrid_auth::{AccessGate, GatePaths};
use callgrid_org::{DEFAULT_INVITE_TTL_DAYS, MAX_INVITE_TTL_DAYS};

pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_INVITE_TOKEN_ATTEMPTS: u32 = 3;
const MAX_INVITE_TOKEN_ATTEMPTS: i64 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be an integer between 1 and {max}, got '{value}'")]
    InvalidNumber { key: &'static str, value: String, max: i64 },

    #[error("{key} must be an absolute path starting with '/', got '{value}'")]
    InvalidPath { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub paths: GatePaths,
    pub invite_ttl_days: i64,
    /// How many fresh tokens to try when an insert collides.
    pub invite_token_attempts: u32,
    /// Origin used to build shareable invite links.
    pub app_origin: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            paths: GatePaths::default(),
            invite_ttl_days: DEFAULT_INVITE_TTL_DAYS,
            invite_token_attempts: DEFAULT_INVITE_TOKEN_ATTEMPTS,
            app_origin: DEFAULT_APP_ORIGIN.to_string(),
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (env, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("CALLGRID_LOGIN_PATH") {
            config.paths.login = parse_path("CALLGRID_LOGIN_PATH", v)?;
        }
        if let Some(v) = lookup("CALLGRID_ONBOARDING_PATH") {
            config.paths.onboarding = parse_path("CALLGRID_ONBOARDING_PATH", v)?;
        }
        if let Some(v) = lookup("CALLGRID_HOME_PATH") {
            config.paths.home = parse_path("CALLGRID_HOME_PATH", v)?;
        }
        if let Some(v) = lookup("CALLGRID_SETTINGS_PATH") {
            config.paths.settings = parse_path("CALLGRID_SETTINGS_PATH", v)?;
        }
        if let Some(v) = lookup("CALLGRID_INVITE_TTL_DAYS") {
            config.invite_ttl_days = parse_bounded("CALLGRID_INVITE_TTL_DAYS", v, MAX_INVITE_TTL_DAYS)?;
        }
        if let Some(v) = lookup("CALLGRID_INVITE_TOKEN_ATTEMPTS") {
            let attempts = parse_bounded("CALLGRID_INVITE_TOKEN_ATTEMPTS", v, MAX_INVITE_TOKEN_ATTEMPTS)?;
            config.invite_token_attempts = attempts as u32;
        }
        if let Some(v) = lookup("CALLGRID_APP_ORIGIN") {
            let trimmed = v.trim().trim_end_matches('/').to_string();
            if trimmed.is_empty() {
                return Err(ConfigError::Empty { key: "CALLGRID_APP_ORIGIN" });
            }
            config.app_origin = trimmed;
        }

        Ok(config)
    }

    /// Default invite lifetime, held within `1..=MAX_INVITE_TTL_DAYS` days.
    pub fn invite_ttl(&self) -> Duration {
        Duration::days(self.invite_ttl_days.clamp(1, MAX_INVITE_TTL_DAYS))
    }

    pub fn gate(&self) -> AccessGate {
        AccessGate::new(self.paths.clone())
    }
}

fn parse_path(key: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    if !trimmed.starts_with('/') {
        return Err(ConfigError::InvalidPath { key, value });
    }
    Ok(trimmed.to_string())
}

fn parse_bounded(key: &'static str, value: String, max: i64) -> Result<i64, ConfigError> {
    match value.trim().parse::<i64>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(ConfigError::InvalidNumber { key, value, max }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AccessConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AccessConfig::default());
        assert_eq!(config.paths.login, "/auth");
        assert_eq!(config.invite_ttl(), Duration::days(7));
        assert_eq!(config.invite_token_attempts, 3);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AccessConfig::from_lookup(lookup(&[
            ("CALLGRID_LOGIN_PATH", "/login"),
            ("CALLGRID_INVITE_TTL_DAYS", "14"),
            ("CALLGRID_APP_ORIGIN", "https://app.callgrid.io/"),
        ]))
        .unwrap();

        assert_eq!(config.paths.login, "/login");
        assert_eq!(config.paths.onboarding, "/onboarding");
        assert_eq!(config.invite_ttl_days, 14);
        assert_eq!(config.app_origin, "https://app.callgrid.io");
    }

    #[test]
    fn longest_allowed_ttl_is_accepted() {
        let max = MAX_INVITE_TTL_DAYS.to_string();
        let config = AccessConfig::from_lookup(lookup(&[("CALLGRID_INVITE_TTL_DAYS", max.as_str())])).unwrap();
        assert_eq!(config.invite_ttl(), Duration::days(MAX_INVITE_TTL_DAYS));
    }

    #[test]
    fn hand_built_ttl_never_overflows() {
        let config = AccessConfig {
            invite_ttl_days: i64::MAX,
            ..AccessConfig::default()
        };
        assert_eq!(config.invite_ttl(), Duration::days(MAX_INVITE_TTL_DAYS));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[("CALLGRID_INVITE_TTL_DAYS", "0")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[("CALLGRID_INVITE_TTL_DAYS", "9999999999999")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[("CALLGRID_INVITE_TOKEN_ATTEMPTS", "4294967296")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[("CALLGRID_HOME_PATH", "dashboard")])),
            Err(ConfigError::InvalidPath { .. })
        ));
        assert!(matches!(
            AccessConfig::from_lookup(lookup(&[("CALLGRID_APP_ORIGIN", "  ")])),
            Err(ConfigError::Empty { .. })
        ));
    }
}

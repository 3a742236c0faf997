use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use tap_core::GameRules;
use tap_persistence::connection::DEFAULT_DATABASE_URL;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    /// Quiet period after the last tap before pending taps are written.
    pub tap_debounce: Duration,
    pub identity_timeout: Duration,
    pub identity_poll_interval: Duration,
    pub countdown_tick: Duration,
    pub tap_rate_burst: u32,
    pub tap_rate_refill: Duration,
    pub leaderboard_size: u64,
    /// Attempts made to persist a confirmed spin reward before giving up.
    pub persist_retry_attempts: u32,
    pub persist_retry_backoff: Duration,
    pub rules: GameRules,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            parse_or(&lookup, key, default).map(Duration::from_millis)
        };

        let cooldown_secs: i64 = parse_or(&lookup, "FAUCET_COOLDOWN_SECS", 7200)?;
        if cooldown_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "FAUCET_COOLDOWN_SECS",
                value: cooldown_secs.to_string(),
            });
        }
        let rules = GameRules {
            faucet_cooldown: TimeDelta::seconds(cooldown_secs),
            ..GameRules::default()
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            tap_debounce: millis("TAP_DEBOUNCE_MS", 2000)?,
            identity_timeout: millis("IDENTITY_TIMEOUT_MS", 5000)?,
            identity_poll_interval: millis("IDENTITY_POLL_MS", 100)?,
            countdown_tick: millis("COUNTDOWN_TICK_MS", 1000)?,
            tap_rate_burst: parse_or(&lookup, "TAP_RATE_BURST", 20)?,
            tap_rate_refill: millis("TAP_RATE_REFILL_MS", 50)?,
            leaderboard_size: parse_or(&lookup, "LEADERBOARD_SIZE", 100)?,
            persist_retry_attempts: parse_or(&lookup, "PERSIST_RETRY_ATTEMPTS", 3)?,
            persist_retry_backoff: millis("PERSIST_RETRY_BACKOFF_MS", 500)?,
            rules,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            tap_debounce: Duration::from_millis(2000),
            identity_timeout: Duration::from_millis(5000),
            identity_poll_interval: Duration::from_millis(100),
            countdown_tick: Duration::from_millis(1000),
            tap_rate_burst: 20,
            tap_rate_refill: Duration::from_millis(50),
            leaderboard_size: 100,
            persist_retry_attempts: 3,
            persist_retry_backoff: Duration::from_millis(500),
            rules: GameRules::default(),
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.tap_debounce, Duration::from_secs(2));
        assert_eq!(config.identity_timeout, Duration::from_secs(5));
        assert_eq!(config.tap_rate_burst, 20);
        assert_eq!(config.leaderboard_size, 100);
        assert_eq!(config.rules.faucet_cooldown, TimeDelta::hours(2));
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("TAP_DEBOUNCE_MS", "250"),
            ("FAUCET_COOLDOWN_SECS", "60"),
            ("LEADERBOARD_SIZE", " 10 "),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.tap_debounce, Duration::from_millis(250));
        assert_eq!(config.rules.faucet_cooldown, TimeDelta::seconds(60));
        assert_eq!(config.leaderboard_size, 10);
        assert_eq!(config.rules.referral_reward, 100);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let result = EngineConfig::from_lookup(lookup_from(&[("TAP_RATE_BURST", "lots")]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                key: "TAP_RATE_BURST",
                value: "lots".to_string()
            }
        );

        let result = EngineConfig::from_lookup(lookup_from(&[("FAUCET_COOLDOWN_SECS", "0")]));
        assert!(result.is_err());
    }
}

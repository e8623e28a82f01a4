//! Application-level configuration loading: duel timings, reward amounts and cache tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration as StdDuration};

use serde::Deserialize;
use time::Duration;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DUEL_ARENA_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Length of the competition window, starting at acceptance.
    pub duel_duration: Duration,
    /// How long an invite stays acceptable.
    pub invite_ttl: Duration,
    /// Prefix of the shareable invite link.
    pub invite_base_url: String,
    /// Lifetime of a cached scoreboard.
    pub scoreboard_ttl: StdDuration,
    /// Upper bound for a single cache operation.
    pub cache_timeout: StdDuration,
    /// Cadence of the background sweep.
    pub sweep_interval: StdDuration,
    /// Maximum number of duels resolved by one sweep.
    pub sweep_batch_size: usize,
    /// XP granted to both participants at completion.
    pub participation_xp: u64,
    /// XP granted on top of participation to the winner.
    pub winner_bonus_xp: u64,
    /// Subscription tiers allowed to create duels.
    pub duel_tiers: Vec<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(path = %path.display(), "loaded duel configuration");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; keys left out keep their default value.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Shareable link embedding an invite token.
    pub fn invite_link(&self, token: &str) -> String {
        format!("{}?token={token}", self.invite_base_url.trim_end_matches('/'))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    duel_duration_hours: u32,
    invite_ttl_hours: u32,
    invite_base_url: String,
    scoreboard_ttl_secs: u64,
    cache_timeout_ms: u64,
    sweep_interval_secs: u64,
    sweep_batch_size: usize,
    participation_xp: u64,
    winner_bonus_xp: u64,
    duel_tiers: Vec<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            duel_duration_hours: 7 * 24,
            invite_ttl_hours: 48,
            invite_base_url: "https://app.local/duels/join".into(),
            scoreboard_ttl_secs: 30,
            cache_timeout_ms: 150,
            sweep_interval_secs: 60,
            sweep_batch_size: 100,
            participation_xp: 50,
            winner_bonus_xp: 100,
            duel_tiers: vec!["premium".into(), "family".into()],
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            duel_duration: Duration::hours(i64::from(value.duel_duration_hours)),
            invite_ttl: Duration::hours(i64::from(value.invite_ttl_hours)),
            invite_base_url: value.invite_base_url,
            scoreboard_ttl: StdDuration::from_secs(value.scoreboard_ttl_secs),
            cache_timeout: StdDuration::from_millis(value.cache_timeout_ms),
            sweep_interval: StdDuration::from_secs(value.sweep_interval_secs.max(1)),
            sweep_batch_size: value.sweep_batch_size.max(1),
            participation_xp: value.participation_xp,
            winner_bonus_xp: value.winner_bonus_xp,
            duel_tiers: value.duel_tiers,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_week_long_duel() {
        let config = AppConfig::default();
        assert_eq!(config.duel_duration, Duration::days(7));
        assert_eq!(config.scoreboard_ttl, StdDuration::from_secs(30));
        assert_eq!(config.duel_tiers, vec!["premium", "family"]);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config =
            AppConfig::from_json(r#"{"duel_duration_hours": 24, "winner_bonus_xp": 7}"#).unwrap();
        assert_eq!(config.duel_duration, Duration::hours(24));
        assert_eq!(config.winner_bonus_xp, 7);
        assert_eq!(config.participation_xp, 50);
        assert_eq!(config.invite_ttl, Duration::hours(48));
    }

    #[test]
    fn invite_link_embeds_token() {
        let config = AppConfig::from_json(r#"{"invite_base_url": "https://x.test/join/"}"#).unwrap();
        assert_eq!(config.invite_link("abc"), "https://x.test/join?token=abc");
    }
}

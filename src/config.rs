use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

use crate::constants::API_URL;

fn default_api_url() -> String {
    API_URL.to_string()
}
fn default_fetch_interval() -> u64 {
    30
}
fn default_notify_interval() -> i64 {
    20
}
fn default_escalation_threshold() -> u32 {
    5
}
fn default_pointer_hold() -> u64 {
    60
}
fn default_lock_delay() -> u64 {
    3
}
fn default_true() -> bool {
    true
}
fn default_dhuhr_hours() -> [u32; 2] {
    [10, 15]
}
fn default_maghrib_hours() -> [u32; 2] {
    [16, 21]
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Seconds between automatic prayer-time fetches.
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
    /// Minimum seconds between two reminder notifications for one prayer.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: i64,
    /// Notifications sent before escalation kicks in.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: u32,
    /// How long the pointer is held at screen center.
    #[serde(default = "default_pointer_hold")]
    pub pointer_hold_secs: u64,
    /// Pause between the pointer hold and the session lock.
    #[serde(default = "default_lock_delay")]
    pub lock_delay_secs: u64,
    #[serde(default = "default_true")]
    pub escalation_enabled: bool,
    /// Inclusive hour range a fetched time must fall in to count as Dhuhr.
    #[serde(default = "default_dhuhr_hours")]
    pub dhuhr_hours: [u32; 2],
    /// Inclusive hour range a fetched time must fall in to count as Maghrib.
    #[serde(default = "default_maghrib_hours")]
    pub maghrib_hours: [u32; 2],
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url(),
            fetch_interval_secs: default_fetch_interval(),
            notify_interval_secs: default_notify_interval(),
            escalation_threshold: default_escalation_threshold(),
            pointer_hold_secs: default_pointer_hold(),
            lock_delay_secs: default_lock_delay(),
            escalation_enabled: default_true(),
            dhuhr_hours: default_dhuhr_hours(),
            maghrib_hours: default_maghrib_hours(),
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "bilal")
            .context("Could not determine project directories")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when no file
    /// exists. A malformed file is an error rather than silently ignored.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        let config: Config = toml::from_str(&content).context("Parsing config.toml")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.fetch_interval_secs, 30);
        assert_eq!(config.notify_interval_secs, 20);
        assert_eq!(config.escalation_threshold, 5);
        assert_eq!(config.pointer_hold_secs, 60);
        assert!(config.escalation_enabled);
        assert_eq!(config.dhuhr_hours, [10, 15]);
        assert_eq!(config.maghrib_hours, [16, 21]);
    }

    #[test]
    fn test_partial_toml_overrides_some_fields() {
        let config: Config = toml::from_str(
            "notify_interval_secs = 45\nescalation_enabled = false\nmaghrib_hours = [17, 20]\n",
        )
        .unwrap();
        assert_eq!(config.notify_interval_secs, 45);
        assert!(!config.escalation_enabled);
        assert_eq!(config.maghrib_hours, [17, 20]);
        // untouched fields keep their defaults
        assert_eq!(config.escalation_threshold, 5);
        assert_eq!(config.api_url, API_URL);
    }
}

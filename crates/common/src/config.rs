//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Instance configuration.
    pub instance: InstanceConfig,
    /// Scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Notification configuration.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Instance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    /// Public URL of this instance, used to build contest and results
    /// links embedded in notification payloads.
    pub url: String,
    /// Instance name shown in outgoing payloads.
    #[serde(default = "default_instance_name")]
    pub name: String,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between lifecycle ticks.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    /// Maximum recurrence successors spawned per tick; excess stays due
    /// and is picked up on the next tick.
    #[serde(default = "default_max_spawn_per_tick")]
    pub max_spawn_per_tick: usize,
    /// Maximum number of active recurrence groups instance-wide.
    #[serde(default = "default_max_active_groups")]
    pub max_active_groups: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            max_spawn_per_tick: default_max_spawn_per_tick(),
            max_active_groups: default_max_active_groups(),
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Timeout for a single delivery attempt, in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_seconds: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_seconds: default_delivery_timeout(),
        }
    }
}

fn default_instance_name() -> String {
    "rankvote".to_string()
}

const fn default_tick_seconds() -> u64 {
    60
}

const fn default_max_spawn_per_tick() -> usize {
    20
}

const fn default_max_active_groups() -> usize {
    100
}

const fn default_delivery_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `RANKVOTE_ENV`)
    /// 3. Environment variables with `RANKVOTE` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("RANKVOTE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RANKVOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("RANKVOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_seconds, 60);
        assert_eq!(config.max_spawn_per_tick, 20);
        assert_eq!(config.max_active_groups, 100);
    }

    #[test]
    fn test_notify_defaults() {
        let config = NotifyConfig::default();
        assert_eq!(config.delivery_timeout_seconds, 10);
    }
}

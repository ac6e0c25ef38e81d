// Configuration management with layered configuration (file, env)

use crate::errors::TriggerLoadError;
use crate::triggers::Trigger;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub scheduler: SchedulerConfig,
    pub nats: NatsConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_seconds: u64,
    pub max_fires_per_poll: usize,
    pub publish_max_retries: u32,
    /// Path of the JSON file holding the serialized trigger set.
    pub triggers_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    pub stream_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.scheduler.poll_interval_seconds == 0 {
            return Err("Scheduler poll_interval_seconds must be greater than 0".to_string());
        }
        if self.scheduler.max_fires_per_poll == 0 {
            return Err("Scheduler max_fires_per_poll must be greater than 0".to_string());
        }
        if self.scheduler.triggers_file.is_empty() {
            return Err("Scheduler triggers_file cannot be empty".to_string());
        }

        if self.nats.url.is_empty() {
            return Err("NATS URL cannot be empty".to_string());
        }
        if self.nats.stream_name.is_empty() {
            return Err("NATS stream_name cannot be empty".to_string());
        }

        if self.observability.metrics_port == 0 {
            return Err("Metrics port must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig {
                poll_interval_seconds: 1,
                max_fires_per_poll: 100,
                publish_max_retries: 3,
                triggers_file: "config/triggers.json".to_string(),
            },
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                stream_name: "TRIGGERS".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
            },
        }
    }
}

/// Load a serialized trigger set from a JSON file.
///
/// Only an unreadable file or broken JSON is an error. Records that
/// deserialize into invalid triggers are returned as-is; registration is
/// where they get filtered, by `is_valid`, with a reason.
pub fn load_triggers<P: AsRef<Path>>(path: P) -> Result<Vec<Trigger>, TriggerLoadError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| TriggerLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| TriggerLoadError::Parse {
        path: path.display().to_string(),
        source,
    })
}

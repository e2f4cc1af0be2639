use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use evasion_scanner::Severity;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_policy_file")]
    pub policy_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            policy_file: default_policy_file(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_event_log_path")]
    pub event_log_path: PathBuf,
    /// Events below this severity are not persisted to the event log.
    #[serde(default = "default_min_event_severity")]
    pub min_event_severity: Severity,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            event_log_path: default_event_log_path(),
            min_event_severity: default_min_event_severity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_policy_file() -> PathBuf {
    PathBuf::from("gate.yaml")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_log_path() -> PathBuf {
    PathBuf::from("events.jsonl")
}

fn default_min_event_severity() -> Severity {
    Severity::Low
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load application configuration from a YAML file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted.  This allows text-gate to start with sensible
/// defaults when no config file has been written yet.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    let config: Config = serde_yml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;

    Ok(config)
}

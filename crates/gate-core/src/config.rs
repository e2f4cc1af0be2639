//! Engine configuration: YAML schema, loader, and validation.
//!
//! The config file enumerates everything the engine consumes: the length
//! limit, monitor sizing, the ordered rule set, and the enabled transform
//! set.  Violations are fatal at load time, before any evaluation runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use evasion_scanner::{default_rule_defs, RuleDef, RuleSetError, TransformKind};

/// Schema version this build understands.
const SUPPORTED_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Malformed configuration.  Fatal: nothing is evaluated against a config
/// that failed validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML deserialization failed: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("unsupported config version '{0}'; only '1.0' is supported")]
    UnsupportedVersion(String),

    #[error("rule label must not be empty")]
    EmptyRuleLabel,

    #[error("duplicate rule label: '{0}'")]
    DuplicateRuleLabel(String),

    #[error("duplicate transform: '{0}'")]
    DuplicateTransform(String),

    #[error("length_limit must be greater than zero")]
    InvalidLengthLimit,

    #[error("monitor.window_capacity must be greater than zero")]
    InvalidWindowCapacity,

    #[error("monitor.alert_threshold must be greater than zero")]
    InvalidAlertThreshold,

    #[error(transparent)]
    Rule(#[from] RuleSetError),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Top-level engine configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Schema version; currently must be "1.0".
    pub version: String,
    /// Inputs longer than this many characters are sanitized down.
    #[serde(default = "default_length_limit")]
    pub length_limit: usize,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub sanitizer: SanitizerSettings,
    /// Enabled transforms, in catalog order.  Defaults to all of them.
    #[serde(default = "default_transforms")]
    pub transforms: Vec<TransformKind>,
    /// Ordered rule set.  Defaults to the built-in catalogue.
    #[serde(default = "default_rule_defs")]
    pub rules: Vec<RuleDef>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION.to_string(),
            length_limit: default_length_limit(),
            monitor: MonitorSettings::default(),
            sanitizer: SanitizerSettings::default(),
            transforms: default_transforms(),
            rules: default_rule_defs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Maximum events retained; also the alerting window.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Same-category event count at which an alert fires.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SanitizerSettings {
    /// Floor (in characters) below which the sanitizer gives up.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for SanitizerSettings {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_length_limit() -> usize {
    10_000
}

fn default_window_capacity() -> usize {
    256
}

fn default_alert_threshold() -> usize {
    5
}

fn default_min_length() -> usize {
    32
}

fn default_transforms() -> Vec<TransformKind> {
    TransformKind::all().to_vec()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load a [`GateConfig`] from a YAML file on disk.
///
/// Validates the config after deserialization (version gate, unique rule
/// labels, sane bounds).
pub fn load_config(path: impl AsRef<Path>) -> Result<GateConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&contents)
}

/// Parse and validate a [`GateConfig`] from a YAML string.
///
/// This is the primary entry point used in tests.
pub fn load_config_from_str(yaml: &str) -> Result<GateConfig, ConfigError> {
    let config: GateConfig = serde_yml::from_str(yaml)?;
    validate(&config)?;
    Ok(config)
}

/// Run post-deserialization validation checks.  Rule patterns are compiled
/// (and rejected) later, when the gate builds its registry.
fn validate(config: &GateConfig) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::UnsupportedVersion(config.version.clone()));
    }

    if config.length_limit == 0 {
        return Err(ConfigError::InvalidLengthLimit);
    }
    if config.monitor.window_capacity == 0 {
        return Err(ConfigError::InvalidWindowCapacity);
    }
    if config.monitor.alert_threshold == 0 {
        return Err(ConfigError::InvalidAlertThreshold);
    }

    let mut seen = HashSet::new();
    for rule in &config.rules {
        if rule.label.is_empty() {
            return Err(ConfigError::EmptyRuleLabel);
        }
        if !seen.insert(&rule.label) {
            return Err(ConfigError::DuplicateRuleLabel(rule.label.clone()));
        }
    }

    let mut seen = HashSet::new();
    for transform in &config.transforms {
        if !seen.insert(transform) {
            return Err(ConfigError::DuplicateTransform(transform.name().to_string()));
        }
    }

    Ok(())
}

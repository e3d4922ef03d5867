//! Configuration system for lossguard.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/lossguard/config.toml` and/or
//! `.lossguard/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::Thresholds;
use crate::error::ConfigError;
use crate::sink::SinkConfig;
use crate::transform::TransformConfig;

/// Configuration for a divergence monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of samples retained for analysis.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Fraction of the window that must exceed the magnitude threshold.
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: f64,
    /// Normalized excursion floor.
    #[serde(default = "default_magnitude_threshold")]
    pub magnitude_threshold: f64,
    /// Normalized regression slope floor for firing.
    #[serde(default = "default_slope_threshold")]
    pub slope_threshold: f64,
    /// Minimum spacing between alerts. Evaluation is gated by the same interval.
    #[serde(default = "default_alert_interval_secs")]
    pub alert_interval_secs: u64,
    /// Also emit non-divergent status messages when the gate is open.
    #[serde(default)]
    pub report_ok: bool,
    /// Rank of the node hosting the primary worker, shown in alert titles.
    #[serde(default)]
    pub node_rank: u32,
    /// Host name shown in alert titles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

fn default_window_size() -> usize {
    100
}

fn default_frequency_threshold() -> f64 {
    0.6
}

fn default_magnitude_threshold() -> f64 {
    0.05
}

fn default_slope_threshold() -> f64 {
    0.1
}

fn default_alert_interval_secs() -> u64 {
    300
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            frequency_threshold: default_frequency_threshold(),
            magnitude_threshold: default_magnitude_threshold(),
            slope_threshold: default_slope_threshold(),
            alert_interval_secs: default_alert_interval_secs(),
            report_ok: false,
            node_rank: 0,
            node_name: None,
            transform: TransformConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Check invariants the monitor relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::invalid("window_size", "must be at least 1"));
        }
        for (field, value) in [
            ("frequency_threshold", self.frequency_threshold),
            ("magnitude_threshold", self.magnitude_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be within [0, 1], got {value}"),
                ));
            }
        }
        if !self.slope_threshold.is_finite() {
            return Err(ConfigError::invalid("slope_threshold", "must be finite"));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            window_size: self.window_size,
            frequency_threshold: self.frequency_threshold,
            magnitude_threshold: self.magnitude_threshold,
            slope_threshold: self.slope_threshold,
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "lossguard", "lossguard")
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".lossguard").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `LOSSGUARD_`)
/// 3. Workspace-local config (`.lossguard/config.toml`)
/// 4. User config (`~/.config/lossguard/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&MonitorConfig>,
) -> Result<MonitorConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(MonitorConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // LOSSGUARD_WINDOW_SIZE, LOSSGUARD_SINK__URL, etc.
    figment = figment.merge(Env::prefixed("LOSSGUARD_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: MonitorConfig = figment.extract().map_err(|e| ConfigError::Load {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Check whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs() {
        if dirs.config_dir().join("config.toml").exists() {
            return true;
        }
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

/// Write the default configuration to `.lossguard/config.toml` in the workspace.
/// Returns the path written.
pub fn write_default_config(workspace: &Path) -> Result<PathBuf, ConfigError> {
    let path = workspace_config_path(workspace);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let defaults = MonitorConfig::default();
    let content = toml::to_string_pretty(&defaults).map_err(write_error)?;
    std::fs::write(&path, content).map_err(write_error)?;
    Ok(path)
}

fn write_error(e: impl std::fmt::Display) -> ConfigError {
    ConfigError::Write {
        message: e.to_string(),
    }
}

// Serial link timing, workspace limits, and the loadable plotter configuration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Serial port the plotter firmware enumerates as
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

// Serial configuration for the G-code firmware
pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

// Time the link needs after opening before the firmware listens (hardware, not tunable)
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

// Upper bound on boot-banner lines discarded at startup
pub const MAX_DRAIN_LINES: usize = 1024;

// Workspace defaults (mm) and feed-rate ceiling (mm/min)
pub const DEFAULT_WORKSPACE_WIDTH: f64 = 140.0;
pub const DEFAULT_WORKSPACE_HEIGHT: f64 = 140.0;
pub const DEFAULT_MAX_SPEED: f64 = 15_000.0;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Physical limits the motion controller enforces on every move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// Usable travel along X in mm
    pub width: f64,
    /// Usable travel along Y in mm
    pub height: f64,
    /// Maximum feed rate in mm/min
    pub max_speed: f64,
    /// Also reject Y targets outside `[0, height]`. Off by default: the
    /// firmware side has only ever been checked against the X range.
    pub enforce_y_bound: bool,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            width: DEFAULT_WORKSPACE_WIDTH,
            height: DEFAULT_WORKSPACE_HEIGHT,
            max_speed: DEFAULT_MAX_SPEED,
            enforce_y_bound: false,
        }
    }
}

impl Workspace {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("width", self.width),
            ("height", self.height),
            ("max_speed", self.max_speed),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "workspace {} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Everything needed to bring up a plotter: where it is and how big it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Echo every outgoing G-code line at info level
    pub verbose: bool,
    pub workspace: Workspace,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: BAUD_RATE,
            verbose: false,
            workspace: Workspace::default(),
        }
    }
}

impl PlotterConfig {
    /// Load a JSON config file; missing fields fall back to the defaults above
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.is_empty() {
            return Err(ConfigError::Invalid("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".to_string()));
        }
        self.workspace.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hardware() {
        let config = PlotterConfig::default();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert!(!config.verbose);
        assert_eq!(config.workspace.width, 140.0);
        assert_eq!(config.workspace.height, 140.0);
        assert_eq!(config.workspace.max_speed, 15_000.0);
        assert!(!config.workspace.enforce_y_bound);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PlotterConfig =
            serde_json::from_str(r#"{"port": "/dev/ttyUSB1", "workspace": {"width": 200.0}}"#)
                .unwrap();
        assert_eq!(config.port, "/dev/ttyUSB1");
        assert_eq!(config.baud_rate, BAUD_RATE);
        assert_eq!(config.workspace.width, 200.0);
        assert_eq!(config.workspace.height, DEFAULT_WORKSPACE_HEIGHT);
        assert_eq!(config.workspace.max_speed, DEFAULT_MAX_SPEED);
    }

    #[test]
    fn test_rejects_non_positive_limits() {
        let mut workspace = Workspace::default();
        workspace.max_speed = 0.0;
        assert!(matches!(workspace.validate(), Err(ConfigError::Invalid(_))));

        workspace = Workspace::default();
        workspace.width = f64::NAN;
        assert!(matches!(workspace.validate(), Err(ConfigError::Invalid(_))));

        let config = PlotterConfig {
            baud_rate: 0,
            ..PlotterConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("ouija-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"verbose": true, "workspace": {"max_speed": 500.0}}"#).unwrap();

        let config = PlotterConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(config.verbose);
        assert_eq!(config.workspace.max_speed, 500.0);
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = PlotterConfig::from_json_file("/nonexistent/ouija.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

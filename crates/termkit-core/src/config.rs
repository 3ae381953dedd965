//! Configuration types for termkit.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;
use crate::geometry::{Point, Size};

/// Toolkit configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terminal settings
    pub terminal: TerminalSettings,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        self.terminal.validate()
    }
}

/// Terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerminalSettings {
    /// Origin of the internal coordinate system
    pub origin: Point,
    /// Size assumed when neither the terminal nor the environment report one
    pub fallback_size: Size,
    /// Variable that pre-seeds the forced color system by name
    pub colorsystem_var: String,
    /// Variable whose presence disables color
    pub no_color_var: String,
    /// Variable describing the terminal's color depth
    pub colorterm_var: String,
    /// Whether to query the terminal for its pixel size
    pub query_pixel_size: bool,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            origin: Point::new(1, 1),
            fallback_size: Size::new(80, 24),
            colorsystem_var: "TERMKIT_COLORSYS".to_string(),
            no_color_var: "NO_COLOR".to_string(),
            colorterm_var: "COLORTERM".to_string(),
            query_pixel_size: true,
        }
    }
}

impl TerminalSettings {
    /// Validate terminal settings.
    pub fn validate(&self) -> crate::Result<()> {
        if self.fallback_size.is_empty() {
            return Err(Error::Config(
                "terminal.fallback_size dimensions must be > 0".to_string(),
            ));
        }

        for (key, value) in [
            ("colorsystem_var", &self.colorsystem_var),
            ("no_color_var", &self.no_color_var),
            ("colorterm_var", &self.colorterm_var),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("terminal.{key} cannot be empty")));
            }
        }

        Ok(())
    }
}

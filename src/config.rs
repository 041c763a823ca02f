//! Configuration management with YAML support

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default)]
    pub advancement: AdvancementConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Reporting defaults applied when the caller omits parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
}

/// Auto-advancement batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancementConfig {
    #[serde(default = "default_engagement_window_days")]
    pub engagement_window_days: i64,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/waymark/waymark.db".to_string()
}

fn default_model() -> String {
    "linear".to_string()
}

fn default_window_days() -> i64 {
    30
}

fn default_engagement_window_days() -> i64 {
    7
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_window_days: default_window_days(),
        }
    }
}

impl Default for AdvancementConfig {
    fn default() -> Self {
        Self {
            engagement_window_days: default_engagement_window_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            reporting: ReportingConfig::default(),
            advancement: AdvancementConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./waymark.yaml (current directory)
    /// 3. ~/.config/waymark/waymark.yaml
    pub fn load(path: &str) -> Result<Self> {
        let mut search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "waymark.yaml".to_string(),
        ];
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(
                config_dir
                    .join("waymark/waymark.yaml")
                    .to_string_lossy()
                    .to_string(),
            );
        }

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reporting.default_model, "linear");
        assert_eq!(config.reporting.default_window_days, 30);
        assert_eq!(config.advancement.engagement_window_days, 7);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
database:
  path: ~/.local/share/waymark/test.db

reporting:
  default_model: time_decay
  default_window_days: 60
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.path, "~/.local/share/waymark/test.db");
        assert_eq!(config.reporting.default_model, "time_decay");
        assert_eq!(config.reporting.default_window_days, 60);
        // Missing sections fall back to defaults
        assert_eq!(config.advancement.engagement_window_days, 7);
    }
}

//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::session::InterruptMode;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Arbitration behaviour
    #[serde(default)]
    pub interrupt: InterruptConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the log file, empty for stderr only
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterruptConfig {
    /// Interrupt mode given to sessions created by the engine
    pub default_mode: InterruptMode,

    /// Send a STOP notification to a rejected session's listener
    pub notify_rejection: bool,

    /// Volume factor reported with DUCK hints
    pub duck_volume: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log: LogConfig::default(),
            interrupt: InterruptConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: String::new(),
        }
    }
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            default_mode: InterruptMode::Independent,
            notify_rejection: true,
            duck_volume: 0.2,
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // AUDIO_ARBITER_LOG_LEVEL - logging level
        if let Some(log_level) = var("AUDIO_ARBITER_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // AUDIO_ARBITER_LOG_FILE_PATH - logging destination file
        if let Some(file_path) = var("AUDIO_ARBITER_LOG_FILE_PATH") {
            self.log.file_path = file_path.trim().to_string();
        }

        // AUDIO_ARBITER_DEFAULT_MODE - independent or shared
        if let Some(mode) = var("AUDIO_ARBITER_DEFAULT_MODE") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "independent" => self.interrupt.default_mode = InterruptMode::Independent,
                "shared" => self.interrupt.default_mode = InterruptMode::Shared,
                other => tracing::warn!("Ignoring unknown interrupt mode override: {}", other),
            }
        }

        // AUDIO_ARBITER_NOTIFY_REJECTION - notify rejected sessions
        if let Some(notify) = var("AUDIO_ARBITER_NOTIFY_REJECTION") {
            self.interrupt.notify_rejection =
                notify.trim().parse().unwrap_or(self.interrupt.notify_rejection);
        }

        // AUDIO_ARBITER_DUCK_VOLUME - duck volume factor
        if let Some(volume) = var("AUDIO_ARBITER_DUCK_VOLUME") {
            if let Ok(value) = volume.trim().parse::<f32>() {
                self.interrupt.duck_volume = value;
            }
        }
    }

    /// Defaults with environment variable overrides, for when no config file
    /// can be loaded
    pub fn defaults_from_env() -> Self {
        Self::defaults_with_overrides(|key| env::var(key).ok())
    }

    fn defaults_with_overrides<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(var);
        if let Err(err) = config.validate() {
            tracing::warn!("Ignoring environment overrides: {:#}", err);
            return Self::default();
        }
        config
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {:#}, using defaults", err);
            Self::defaults_from_env()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.log_level);
        }

        let volume = self.interrupt.duck_volume;
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            anyhow::bail!("interrupt.duck_volume must be within 0.0..=1.0, got {}", volume);
        }

        Ok(())
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        println!("Current configuration:");
        println!("{}", content);
        Ok(())
    }

    /// Display configuration management help
    pub fn display_help() -> Result<()> {
        println!("Configuration management commands:");
        println!("  audio-arbiter config show    - Show current configuration");
        println!("  audio-arbiter config reset   - Write default configuration");
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command(action: &Option<crate::cli::ConfigAction>, config_file: &str) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) => {
                let config = Config::load_or_default(config_file);
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.save_to_file(config_file)?;
                println!("Default configuration written to {}", config_file);
            }
            None => {
                Config::display_help()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.interrupt.notify_rejection);
        assert_eq!(config.interrupt.default_mode, InterruptMode::Independent);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.interrupt.duck_volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_without_config_file() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AUDIO_ARBITER_DUCK_VOLUME", "0.5"),
            ("AUDIO_ARBITER_DEFAULT_MODE", "Shared"),
            ("AUDIO_ARBITER_NOTIFY_REJECTION", "false"),
        ]);
        let config = Config::defaults_with_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.interrupt.duck_volume, 0.5);
        assert_eq!(config.interrupt.default_mode, InterruptMode::Shared);
        assert!(!config.interrupt.notify_rejection);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_overrides_fall_back_to_defaults() {
        let config = Config::defaults_with_overrides(|key| {
            (key == "AUDIO_ARBITER_DUCK_VOLUME").then(|| "3.0".to_string())
        });
        assert_eq!(config.interrupt.duck_volume, 0.2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            log_level = "debug"

            [interrupt]
            default_mode = "shared"
            "#,
        )
        .unwrap();
        assert_eq!(config.interrupt.default_mode, InterruptMode::Shared);
        assert!(config.interrupt.notify_rejection);
        assert!(config.log.file_path.is_empty());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.interrupt.duck_volume = 0.35;
        let temp_file = NamedTempFile::new().unwrap();

        // Test save
        config.save_to_file(temp_file.path()).unwrap();

        // Test load
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.interrupt.duck_volume, 0.35);
        assert_eq!(loaded_config.log_level, config.log_level);
    }
}

//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::TimerConfig;
use std::path::Path;

/// Name of the configuration file looked up in a design directory.
pub const CONFIG_FILE_NAME: &str = "chronos.toml";

/// Loads and validates `chronos.toml` from a design directory.
///
/// A missing file is not an error: the default configuration is returned.
pub fn load_config(design_dir: &Path) -> Result<TimerConfig, ConfigError> {
    let config_path = design_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(TimerConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<TimerConfig, ConfigError> {
    let config: TimerConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TimerConfig) -> Result<(), ConfigError> {
    if config.analysis.num_threads == Some(0) {
        return Err(ConfigError::ValidationError(
            "analysis.num_threads must be positive".to_string(),
        ));
    }
    if config.report.num_paths == 0 {
        return Err(ConfigError::ValidationError(
            "report.num_paths must be positive".to_string(),
        ));
    }
    if let Some(cutoff) = config.report.cutoff {
        if !cutoff.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "report.cutoff must be finite, got {cutoff}"
            )));
        }
    }
    Ok(())
}

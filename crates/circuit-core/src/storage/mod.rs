mod config;

pub use config::{AlertsConfig, ClockConfig, Config, DisplayConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/circuit[-dev]/` based on CIRCUIT_ENV.
///
/// Set CIRCUIT_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CIRCUIT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("circuit-dev")
    } else {
        base_dir.join("circuit")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

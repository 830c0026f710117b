/**
 * Server Configuration
 *
 * Loads the server's `AppConfig` from, in order of precedence:
 * 1. environment variables (after reading `.env` if present),
 * 2. the file named by `BOARDSYNC_CONFIG`, or the per-user default path,
 * 3. built-in defaults.
 *
 * A missing config file is not an error; a malformed one is.
 */

use crate::shared::{AppConfig, ConfigError};
use std::path::PathBuf;

fn config_path() -> Option<PathBuf> {
    match std::env::var("BOARDSYNC_CONFIG") {
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => AppConfig::default_path(),
    }
}

/// Load and validate the server configuration.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenv::dotenv().ok();

    let base = match config_path() {
        Some(path) if path.exists() => {
            tracing::info!("[Config] Loading {}", path.display());
            AppConfig::from_file(&path)?
        }
        _ => AppConfig::default(),
    };

    let config = base.apply_env()?;
    config.validate()?;

    if config.uses_dev_secret() {
        tracing::warn!("[Config] JWT_SECRET not set, using the development secret");
    }
    Ok(config)
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::Config;
use crate::error::{ProxyError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(&p)
        .map_err(|e| ProxyError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = serde_norway::from_str(&txt)
        .map_err(|e| ProxyError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.limits.max_connections == 0 {
        return Err(ProxyError::Config("limits.max_connections must be > 0".into()));
    }
    if cfg.buffers.small == 0 || cfg.buffers.medium == 0 || cfg.buffers.large == 0 {
        return Err(ProxyError::Config("buffer sizes must be > 0".into()));
    }
    Ok(())
}

/// Resolve a side file named in the main config against the main config
/// file's directory.
pub fn sibling_path<P: AsRef<Path>>(config_path: P, file: &str) -> PathBuf {
    config_path
        .as_ref()
        .parent()
        .map(|dir| dir.join(file))
        .unwrap_or_else(|| PathBuf::from(file))
}

/// Load one of the JSON side files (DNS servers, CDN domains, bypass
/// rules). A missing or malformed file is not fatal; compiled-in defaults
/// are used instead.
pub fn load_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let txt = match fs::read_to_string(path) {
        Ok(txt) => txt,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file not found, using defaults");
            return T::default();
        }
    };
    match serde_json::from_str(&txt) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid JSON, using defaults");
            T::default()
        }
    }
}

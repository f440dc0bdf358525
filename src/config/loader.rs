//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::SidecarConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::secrets::default_dir;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PRISM_CONFIG";

/// Config file name inside the store directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SidecarConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<SidecarConfig, ConfigError> {
    let config: SidecarConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load an explicit config file, or `~/.shadowprism/config.toml` if present.
///
/// An explicit path must exist. A missing default file means defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<SidecarConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    match default_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE)) {
        Some(path) if path.is_file() => load_config(&path),
        _ => Ok(SidecarConfig::default()),
    }
}

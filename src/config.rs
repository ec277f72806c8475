//! YAML configuration file holding the user's profiles.

use crate::environment::{self, Env};
use crate::profile::Profile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const CONFIG_FOLDER: &str = ".opensearch-cli";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Everything persisted in the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Persistence for [`Config`]
///
/// Implementations read and write the whole document; there are no partial
/// updates.
pub trait ConfigStore {
    fn read(&self) -> Result<Config, ConfigError>;
    fn write(&self, config: &Config) -> Result<(), ConfigError>;
}

/// Config stored as a YAML file on disk
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for YamlConfigStore {
    fn read(&self) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, config: &Config) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(config).map_err(|source| ConfigError::Yaml {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), profiles = config.profiles.len(), "config written");
        Ok(())
    }
}

/// Location of the default config file: `~/.opensearch-cli/config.yaml`,
/// falling back to the working directory when no home directory is known.
pub fn default_config_path() -> PathBuf {
    let root = dirs::home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();
    root.join(CONFIG_FOLDER).join(CONFIG_FILE)
}

/// Config file for this execution: the `--config` flag, then
/// `OPENSEARCH_CONFIG`, then the default location (created empty when
/// missing).
pub fn resolve_config_path(flag: Option<&str>, env: &dyn Env) -> Result<PathBuf, ConfigError> {
    if let Some(path) = flag.filter(|path| !path.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = environment::non_empty(env, environment::OPENSEARCH_CONFIG) {
        return Ok(PathBuf::from(path));
    }
    let path = default_config_path();
    create_if_missing(&path)?;
    Ok(path)
}

fn create_if_missing(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(folder) = path.parent() {
        fs::create_dir_all(folder).map_err(io_err)?;
    }
    fs::write(path, "").map_err(io_err)?;
    debug!(path = %path.display(), "created empty config file");
    Ok(())
}

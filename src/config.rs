use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable names read by the binary.
pub mod env_vars {
    pub const DB_PATH: &str = "NOTELY_DB_PATH";
    pub const CONFIG: &str = "NOTELY_CONFIG";
    pub const BIND: &str = "NOTELY_BIND";
    pub const LOG: &str = "NOTELY_LOG";
}

pub mod defaults {
    pub const DATA_DIR: &str = ".notely";
    pub const DB_FILE: &str = "notely.db";
    pub const CONFIG_FILE: &str = "config.toml";
    pub const BIND: &str = "127.0.0.1:8000";
}

/// On-disk `config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default)]
    pub bind: Option<String>,
}

impl ConfigFile {
    pub(crate) fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

/// Values supplied on the command line or through the environment. clap
/// merges flag and env for each field, so a present value already wins
/// over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub bind: String,
    /// The config file that was actually read, if any.
    pub config_path: Option<PathBuf>,
}

impl Settings {
    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::resolve_with_home(overrides, home.as_deref())
    }

    pub(crate) fn resolve_with_home(
        overrides: &Overrides,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let data_dir = data_dir(home);
        let (file, config_path) = match overrides.config_path.as_deref() {
            Some(path) => (load_file(path)?, Some(path.to_path_buf())),
            None => {
                let path = data_dir.join(defaults::CONFIG_FILE);
                if path.is_file() {
                    (load_file(&path)?, Some(path))
                } else {
                    (ConfigFile::default(), None)
                }
            }
        };

        let db_path = overrides
            .db_path
            .clone()
            .or(file.db_path)
            .map(|path| expand_home(&path, home))
            .unwrap_or_else(|| data_dir.join(defaults::DB_FILE));
        let bind = overrides
            .bind
            .clone()
            .or(file.server.bind)
            .unwrap_or_else(|| defaults::BIND.to_string());

        Ok(Self {
            db_path,
            bind,
            config_path,
        })
    }
}

fn data_dir(home: Option<&Path>) -> PathBuf {
    match home {
        Some(home) => home.join(defaults::DATA_DIR),
        None => PathBuf::from(defaults::DATA_DIR),
    }
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn load_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigFile::from_toml(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "invalid config {}: {}", path.display(), source)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug)]
pub enum ConfigError {
    /// `config.toml` exists but could not be read.
    Read { path: PathBuf, source: io::Error },

    /// `config.toml` is not valid TOML or has a field of the wrong type.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// No home directory, so there is nowhere to keep config or history.
    NoProjectDirs,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(
                f,
                "Could not read chatops config {}: {source}",
                path_display(path)
            ),
            ConfigError::Parse { path, source } => write!(
                f,
                "chatops config {} is invalid: {source}",
                path_display(path)
            ),
            ConfigError::NoProjectDirs => {
                f.write_str("No home directory found for chatops config and history")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::NoProjectDirs => None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("org", "chatops", "chatops").ok_or(ConfigError::NoProjectDirs)
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn StdError>> {
        Self::load_from_path(&Self::get_config_path()?)
    }

    pub fn save(&self) -> Result<(), Box<dyn StdError>> {
        self.save_to_path(&Self::get_config_path()?)
    }

    /// A missing file is an empty config; every field then uses its default.
    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn StdError>> {
        let contents = match fs::read_to_string(config_path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: config_path.to_path_buf(),
                    source,
                }
                .into())
            }
        };

        toml::from_str(&contents).map_err(|source| {
            ConfigError::Parse {
                path: config_path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Replace `config_path` in one rename so a crash never leaves half a file.
    pub(crate) fn save_to_path(&self, config_path: &Path) -> Result<(), Box<dyn StdError>> {
        let dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(toml::to_string_pretty(self)?.as_bytes())?;
        staged.as_file_mut().sync_all()?;
        staged.persist(config_path).map_err(|err| err.error)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Directory holding preferences and conversation history: `storage_dir`
    /// when set, otherwise the platform data directory.
    pub fn storage_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }
}

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use directories::BaseDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_IMAGE_DIR: &str = "img";
pub const CONFIG_DIR_NAME: &str = ".wmark";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    ConfigDirUnavailable,
    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to deserialize configuration: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("unknown watermark source `{0}` (expected `edited` or `original`)")]
    InvalidWatermarkSource(String),
}

/// Which file the watermark stage reads when an edit was applied first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkSource {
    /// Watermark the output of the edit stage.
    #[default]
    Edited,
    /// Always watermark the untouched input file.
    Original,
}

impl FromStr for WatermarkSource {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "edited" => Ok(Self::Edited),
            "original" => Ok(Self::Original),
            other => Err(ConfigError::InvalidWatermarkSource(other.to_string())),
        }
    }
}

impl fmt::Display for WatermarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edited => f.write_str("edited"),
            Self::Original => f.write_str("original"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding source images, marks and generated files.
    pub image_dir: String,
    pub watermark_source: WatermarkSource,
    /// Start a new session after each one finishes.
    pub restart: bool,
    pub unique_output_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            watermark_source: WatermarkSource::default(),
            restart: true,
            unique_output_names: false,
        }
    }
}

impl Config {
    pub fn image_dir(&self) -> &Path {
        Path::new(&self.image_dir)
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub config: Config,
    pub path: PathBuf,
    /// Whether `path` existed and was read.
    pub found: bool,
}

/// Loads the wmark configuration from `~/.wmark/config.toml`.
///
/// A missing file yields the defaults. The file is never created.
pub fn load() -> Result<LoadOutcome, ConfigError> {
    let path = config_file_path()?;
    load_from(&path)
}

/// Loads the configuration from an explicit path, falling back to defaults
/// when the file does not exist.
pub fn load_from(path: &Path) -> Result<LoadOutcome, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(LoadOutcome {
            config: Config::default(),
            path: path.to_path_buf(),
            found: false,
        });
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&contents)?;
    debug!(path = %path.display(), ?config, "loaded configuration");

    Ok(LoadOutcome {
        config,
        path: path.to_path_buf(),
        found: true,
    })
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::ConfigDirUnavailable)?;
    Ok(base_dirs
        .home_dir()
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

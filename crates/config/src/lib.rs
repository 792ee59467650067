//! Layered configuration for raw2dng.
//!
//! Values are merged from (lowest to highest priority):
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `RAW2DNG_`, using `__` to reach
//!    nested keys (`RAW2DNG_CONVERTER__PROGRAM=/usr/bin/dnglab`).
//!
//! Command-line flags are applied on top by the binary, not here.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "RAW2DNG_";
const APPLICATION: &str = "raw2dng";
const DEFAULT_FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder that converted files are written into, when not given on the
    /// command line.
    pub output: Option<PathBuf>,
    /// Number of files converted at the same time. `1` keeps conversion
    /// strictly sequential.
    pub jobs: usize,
    /// Descend into sub-folders when scanning a folder for RAW files.
    pub recursive: bool,
    /// Read the head of every input before handing it to the converter, so
    /// unreadable files are reported as read errors.
    pub preflight: bool,
    pub converter: ConverterConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            output: None,
            jobs: 1,
            recursive: true,
            preflight: true,
            converter: ConverterConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// External converter executable. Searched for on `PATH` when unset.
    pub program: Option<PathBuf>,
    /// Argument template; `{input}` and `{output}` are substituted per file.
    pub args: Vec<String>,
}
impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: vec!["convert".to_string(), "{input}".to_string(), "{output}".to_string()],
        }
    }
}

impl Config {
    /// Load, merge and validate configuration.
    ///
    /// An explicit `file` must exist. Without one, the platform default
    /// location is used if (and only if) something is there.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the provider stack without extracting it.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|path| path.is_file()),
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = match extension(&path).as_deref() {
                Some("toml") => figment.merge(Toml::file(&path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(&path)),
                Some("json") => figment.merge(Json::file(&path)),
                other => exn::bail!(ErrorKind::UnsupportedFormat(other.unwrap_or_default().to_string())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            exn::bail!(ErrorKind::Invalid("jobs must be at least 1".to_string()));
        }
        for placeholder in ["{input}", "{output}"] {
            if !self.converter.args.iter().any(|arg| arg.contains(placeholder)) {
                exn::bail!(ErrorKind::Invalid(format!("converter.args must reference {placeholder}")));
            }
        }
        Ok(())
    }
}

/// `<platform config dir>/raw2dng/config.toml`, if the platform has one.
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase)
}

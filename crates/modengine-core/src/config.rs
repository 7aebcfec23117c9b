//! Engine configuration.
//!
//! An [`EngineConfig`] can be built in code, parsed from a TOML settings file
//! and then patched from `MODENGINE_*` environment variables. Paths are not
//! validated here; the engine validates them at construction.

use std::ffi::c_int;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Engine-wide execution flavor, forwarded to every module at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Demo,
    Debug,
}

impl Mode {
    /// Value passed across the module ABI.
    pub fn as_raw(self) -> c_int {
        match self {
            Mode::Normal => 0,
            Mode::Demo => 1,
            Mode::Debug => 2,
        }
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(Mode::Normal),
            1 => Some(Mode::Demo),
            2 => Some(Mode::Debug),
            _ => None,
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "normal"),
            Mode::Demo => write!(f, "demo"),
            Mode::Debug => write!(f, "debug"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "demo" => Ok(Mode::Demo),
            "debug" => Ok(Mode::Debug),
            other => Err(Error::config(format!(
                "unknown mode '{}', expected normal, demo or debug",
                other
            ))),
        }
    }
}

/// Order in which the modules directory is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrder {
    /// Whatever order the platform's directory listing yields. Not stable
    /// across platforms or filesystems.
    #[default]
    Filesystem,
    /// Sorted by file name.
    FileName,
}

/// Default values.
pub mod defaults {
    pub const CONFIG_PATH: &str = "config.cfg";
    pub const SETUP_PATH: &str = "setup.cfg";
    pub const MODULES_DIR: &str = "modules";
}

/// Environment variable names.
pub mod env_vars {
    pub const MODE: &str = "MODENGINE_MODE";
    pub const CONFIG_PATH: &str = "MODENGINE_CONFIG_PATH";
    pub const SETUP_PATH: &str = "MODENGINE_SETUP_PATH";
    pub const MODULES_DIR: &str = "MODENGINE_MODULES_DIR";
    /// "true"/"1" selects [`EntryOrder::FileName`](super::EntryOrder::FileName).
    pub const SORT_MODULES: &str = "MODENGINE_SORT_MODULES";
}

/// Everything the engine needs besides the capability bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: Mode,
    pub config_path: PathBuf,
    pub setup_path: PathBuf,
    pub modules_dir: PathBuf,
    pub entry_order: EntryOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            config_path: PathBuf::from(defaults::CONFIG_PATH),
            setup_path: PathBuf::from(defaults::SETUP_PATH),
            modules_dir: PathBuf::from(defaults::MODULES_DIR),
            entry_order: EntryOrder::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(
        mode: Mode,
        config_path: impl Into<PathBuf>,
        setup_path: impl Into<PathBuf>,
        modules_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            config_path: config_path.into(),
            setup_path: setup_path.into(),
            modules_dir: modules_dir.into(),
            entry_order: EntryOrder::default(),
        }
    }

    pub fn with_entry_order(mut self, order: EntryOrder) -> Self {
        self.entry_order = order;
        self
    }

    /// Parse a TOML settings document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read settings {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `MODENGINE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(mode) = lookup(env_vars::MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(path) = lookup(env_vars::CONFIG_PATH) {
            self.config_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(env_vars::SETUP_PATH) {
            self.setup_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(env_vars::MODULES_DIR) {
            self.modules_dir = PathBuf::from(dir);
        }
        if let Some(sort) = lookup(env_vars::SORT_MODULES) {
            self.entry_order = match sort.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => EntryOrder::FileName,
                "0" | "false" | "no" => EntryOrder::Filesystem,
                other => {
                    return Err(Error::config(format!(
                        "{} must be a boolean, got '{}'",
                        env_vars::SORT_MODULES,
                        other
                    )));
                }
            };
        }
        Ok(())
    }
}

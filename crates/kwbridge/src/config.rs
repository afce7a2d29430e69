use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable overriding the install directory.
pub const HOME_VAR: &str = "KWBRIDGE_HOME";

/// Default environment variable carrying extra runtime startup tokens.
pub const DEFAULT_EXTRA_ARGS_VAR: &str = "KWBRIDGE_RUNTIME_EXTRA_ARGS";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub support: SupportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Name of the environment variable read once at startup.
    #[serde(default = "default_extra_args_var")]
    pub extra_args_var: String,
    /// Startup tokens appended after the baseline, before the variable's.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            extra_args_var: default_extra_args_var(),
            extra_args: Vec::new(),
        }
    }
}

fn default_extra_args_var() -> String {
    DEFAULT_EXTRA_ARGS_VAR.into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportConfig {
    /// Directory the bridge is installed in; packaged archives live in its
    /// `lib/` subdirectory.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    #[serde(default = "default_version")]
    pub version: String,
    /// Locally built classes, relative to `install_dir` unless absolute.
    #[serde(default = "default_dev_classes_dir")]
    pub dev_classes_dir: PathBuf,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            version: default_version(),
            dev_classes_dir: default_dev_classes_dir(),
        }
    }
}

fn default_install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_dev_classes_dir() -> PathBuf {
    PathBuf::from("../../target/classes")
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Defaults, with `KWBRIDGE_HOME` overriding the install directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(home) = std::env::var_os(HOME_VAR).filter(|h| !h.is_empty()) {
            config.support.install_dir = PathBuf::from(home);
        }
        config
    }

    /// Shorthand for a default config rooted at `install_dir`.
    pub fn with_install_dir(install_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.support.install_dir = install_dir.into();
        config
    }

    pub fn dev_classes_path(&self) -> PathBuf {
        self.support.install_dir.join(&self.support.dev_classes_dir)
    }
}

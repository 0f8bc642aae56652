use serde::Deserialize;
use std::{env, fs, path::PathBuf};

use disentangler_types::UiOptions;

use crate::echo::{AVAILABLE_PACKAGES, DEFAULT_ENGINE_CLASS, ResultShape};

// Default value functions for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

fn default_packages() -> Vec<String> {
    AVAILABLE_PACKAGES.iter().map(ToString::to_string).collect()
}

fn default_class_name() -> String {
    DEFAULT_ENGINE_CLASS.to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct DisentanglerConfig {
    pub app: Option<AppConfig>,
    pub engine: Option<EngineConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Use ASCII-only glyphs for icons and spinners.
    #[serde(default)]
    pub ascii_only: bool,
    /// Enable a high-contrast color palette.
    #[serde(default)]
    pub high_contrast: bool,
    /// Disable spinner animation.
    #[serde(default)]
    pub reduced_motion: bool,
}

/// Where the engine comes from and how it is bootstrapped.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// `builtin`, an `http(s)://` URL or a local path. `${VAR}` references
    /// are expanded. Absent means `builtin`.
    pub source: Option<String>,
    /// Append a per-session query parameter to source URLs.
    #[serde(default = "default_true")]
    pub cache_bust: bool,
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
    #[serde(default = "default_class_name")]
    pub class_name: String,
    /// Answer shape of the builtin echo engine.
    #[serde(default)]
    pub result_shape: ResultShape,
    #[serde(default = "default_true")]
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source: None,
            cache_bust: true,
            packages: default_packages(),
            class_name: default_class_name(),
            result_shape: ResultShape::default(),
            verbose: true,
        }
    }
}

impl EngineConfig {
    /// The configured source with environment references expanded.
    #[must_use]
    pub fn source(&self) -> Option<String> {
        self.source
            .as_deref()
            .map(expand_env_vars)
            .filter(|source| !source.trim().is_empty())
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl DisentanglerConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        Self::load_from(path)
    }

    /// Load from an explicit path. A missing file is `Ok(None)`.
    pub fn load_from(path: PathBuf) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn ui_options(&self) -> UiOptions {
        self.app
            .as_ref()
            .map(|app| UiOptions {
                ascii_only: app.ascii_only,
                high_contrast: app.high_contrast,
                reduced_motion: app.reduced_motion,
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        self.engine.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".disentangler").join("config.toml"))
}

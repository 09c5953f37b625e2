//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/codelists/codelists.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `CODELISTS_*` prefix

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ApplicationError::Config {
                message: format!("invalid format '{other}': expected text or json"),
            }),
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub terminology: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub color: Option<bool>,
}

/// Unified configuration for codelists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Terminology snapshot used when a command names none
    pub terminology: Option<PathBuf>,
    /// Output format (text or json)
    pub format: OutputFormat,
    /// Colorize text output
    pub color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            terminology: None,
            format: OutputFormat::Text,
            color: true,
        }
    }
}

/// Get the XDG config directory for codelists.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "codelists").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("codelists.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is kept as is.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => path.to_path_buf(),
    }
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.terminology = self.terminology.as_deref().map(expand_path);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            terminology: overlay
                .terminology
                .clone()
                .or_else(|| self.terminology.clone()),
            format: overlay.format.unwrap_or(self.format),
            color: overlay.color.unwrap_or(self.color),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file given on the command line
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), local)
    }

    /// Same as [`Settings::load`] with an explicit global file.
    pub fn load_layers(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("config: global {}", global_path.display());
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        // an explicitly named file must exist
        if let Some(local_path) = local {
            debug!("config: local {}", local_path.display());
            current = current.merge_with(&load_raw_settings(local_path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply CODELISTS_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("CODELISTS").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("terminology") {
            settings.terminology = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("format") {
            settings.format = val.parse()?;
        }
        if let Ok(val) = config.get_bool("color") {
            settings.color = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# codelists configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/codelists/codelists.toml
#   Local:  file passed with --config
#   Env:    CODELISTS_* environment variables

# Terminology snapshot used when a command names none
# terminology = "~/data/snomedct.toml"

# Output format: text or json
# format = "text"

# color = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_files_when_loading_then_uses_defaults() {
        let settings = Settings::load_layers(None, None).expect("load defaults");
        assert_eq!(settings.format, OutputFormat::Text);
        assert!(settings.color);
    }

    #[test]
    fn given_tilde_in_terminology_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            terminology: Some(PathBuf::from("~/snomed.toml")),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let path = settings.terminology.expect("terminology set");
        assert!(path.starts_with(&home), "{}", path.display());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_base_values() {
        let base = Settings {
            terminology: Some(PathBuf::from("/data/ctv3.toml")),
            ..Settings::default()
        };
        let overlay = RawSettings {
            color: Some(false),
            ..RawSettings::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.terminology, Some(PathBuf::from("/data/ctv3.toml")));
        assert!(!merged.color);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.terminology.is_none());
    }
}

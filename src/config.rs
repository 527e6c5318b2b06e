//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindmap/mindmap.toml`
//! 3. Environment variables: `MINDMAP_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Raw settings for intermediate parsing (every field optional to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub default_file: Option<String>,
    pub autosave: Option<bool>,
    pub show_ids: Option<bool>,
}

/// Unified configuration for mindmap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding map files (default: ~/.mindmap/data)
    pub data_dir: PathBuf,
    /// File used when no `--file` is given (relative names resolve against data_dir)
    pub default_file: String,
    /// Save after every change in the interactive shell
    pub autosave: bool,
    /// Include node ids in listings and trees
    pub show_ids: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: dirs_default_data_dir(),
            default_file: "my_map.json".into(),
            autosave: true,
            show_ids: true,
        }
    }
}

/// Get the default data directory (~/.mindmap/data).
fn dirs_default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".mindmap").join("data"))
        .unwrap_or_else(|| PathBuf::from("~/.mindmap/data"))
}

/// Get the XDG config directory for mindmap.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mindmap").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindmap.toml"))
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

/// Expand `~`, `$VAR` and `${VAR}` in a path string; unknown variables are left as is.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Map file used when the user names none.
    pub fn default_map_path(&self) -> PathBuf {
        self.resolve_map_path(Path::new(&self.default_file))
    }

    /// Absolute and `./`-style paths are kept; bare names land in `data_dir`.
    pub fn resolve_map_path(&self, path: &Path) -> PathBuf {
        let expanded = PathBuf::from(expand_env_vars(&path.to_string_lossy()));
        if expanded.is_absolute() || expanded.components().count() > 1 {
            expanded
        } else {
            self.data_dir.join(expanded)
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.data_dir.to_string_lossy().as_ref());
        self.data_dir = PathBuf::from(expanded);
    }

    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            default_file: overlay
                .default_file
                .clone()
                .unwrap_or_else(|| self.default_file.clone()),
            autosave: overlay.autosave.unwrap_or(self.autosave),
            show_ids: overlay.show_ids.unwrap_or(self.show_ids),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Explicit config file replacing the global one (e.g. `--config`)
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/mindmap/mindmap.toml` (or `config_file`)
    /// 3. Environment variables: `MINDMAP_*` prefix
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        let file = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                Some(path.to_path_buf())
            }
            None => global_config_path().filter(|p| p.exists()),
        };
        if let Some(path) = file {
            let raw = load_raw_settings(&path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply MINDMAP_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MINDMAP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("default_file") {
            settings.default_file = val;
        }
        if let Ok(val) = config.get_bool("autosave") {
            settings.autosave = val;
        }
        if let Ok(val) = config.get_bool("show_ids") {
            settings.show_ids = val;
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
        r#"# mindmap configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mindmap/mindmap.toml
#   Env:    MINDMAP_* environment variables (e.g. MINDMAP_DATA_DIR)

# Directory holding map files
# data_dir = "~/.mindmap/data"

# Map opened when no --file is given (bare names live in data_dir)
# default_file = "my_map.json"

# Save after every change in the interactive shell
# autosave = true

# Show node ids in listings and trees
# show_ids = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

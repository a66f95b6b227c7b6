use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://back-act.onrender.com/api/v1";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_fields_path() -> String {
    "/fields".into()
}

fn default_crops_path() -> String {
    "/crop-fields".into()
}

fn default_tasks_path() -> String {
    "/tasks".into()
}

fn default_progress_path() -> String {
    "/progress".into()
}

#[derive(Debug, Error)]
#[error("malformed config {}: {source}", .path.display())]
pub struct ConfigError {
    pub path: PathBuf,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldbookConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_fields_path")]
    pub fields_path: String,
    #[serde(default = "default_crops_path")]
    pub crops_path: String,
    #[serde(default = "default_tasks_path")]
    pub tasks_path: String,
    #[serde(default = "default_progress_path")]
    pub progress_path: String,
    /// Bearer token sent with every request, if set.
    #[serde(default)]
    pub api_token: Option<String>,
    /// User whose records are loaded when none is given on the command line.
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for FieldbookConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fields_path: default_fields_path(),
            crops_path: default_crops_path(),
            tasks_path: default_tasks_path(),
            progress_path: default_progress_path(),
            api_token: None,
            user_id: None,
            debug_logging: false,
        }
    }
}

impl FieldbookConfig {
    /// `<config dir>/fieldbook/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("fieldbook")
            .join("config.json")
    }

    /// Load from `path`. A missing file gives defaults; a malformed one is
    /// an error.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Ok(Self::default()),
        };
        serde_json::from_str(&content).map_err(|source| ConfigError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`try_load`](Self::try_load), but a malformed file gives defaults
    /// after logging why.
    pub fn load(path: &Path) -> Self {
        Self::try_load(path).unwrap_or_else(|e| {
            log::warn!("Ignoring {}", e);
            Self::default()
        })
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn fields_url(&self) -> String {
        format!("{}{}", self.base(), self.fields_path)
    }

    pub fn crops_url(&self) -> String {
        format!("{}{}", self.base(), self.crops_path)
    }

    pub fn tasks_url(&self) -> String {
        format!("{}{}", self.base(), self.tasks_path)
    }

    pub fn progress_url(&self) -> String {
        format!("{}{}", self.base(), self.progress_path)
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{NotesError, Result};

/// Default key namespace; keys are `<namespace>-notes` and `<namespace>-folders`.
pub const DEFAULT_NAMESPACE: &str = "notozen";

/// Overrides `data_dir`
pub const DATA_DIR_ENV: &str = "NOTOZEN_DATA_DIR";

/// Overrides `assistant_url`
pub const ASSISTANT_URL_ENV: &str = "NOTOZEN_ASSISTANT_URL";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the stored collections
    pub data_dir: PathBuf,

    /// Prefix for the storage keys
    pub namespace: String,

    /// Base URL of the tag suggestion / summarization service
    pub assistant_url: Option<String>,

    /// Default editor command
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".notozen"));

        Self {
            data_dir,
            namespace: DEFAULT_NAMESPACE.to_string(),
            assistant_url: None,
            editor_command: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "notozen")
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads the configuration from `path` (or the default location), then
    /// applies environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                debug!("Loading configuration from {}", path.display());
                let raw = fs::read_to_string(&path)?;
                serde_json::from_str(&raw).map_err(|e| NotesError::ConfigError {
                    message: format!("{}: {}", path.display(), e),
                })?
            }
            Some(path) => {
                debug!("No configuration at {}, using defaults", path.display());
                Config::default()
            }
            None => Config::default(),
        };

        config.apply_env();
        config.validate()?;
        info!(
            "Using data_dir={}, namespace={}",
            config.data_dir.display(),
            config.namespace
        );
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(url) = std::env::var(ASSISTANT_URL_ENV) {
            if !url.is_empty() {
                self.assistant_url = Some(url);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let namespace_ok = !self.namespace.is_empty()
            && self
                .namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !namespace_ok {
            return Err(NotesError::ConfigError {
                message: format!(
                    "namespace '{}' must be non-empty ASCII letters, digits, '-' or '_'",
                    self.namespace
                ),
            });
        }
        Ok(())
    }

    pub fn notes_key(&self) -> String {
        format!("{}-notes", self.namespace)
    }

    pub fn folders_key(&self) -> String {
        format!("{}-folders", self.namespace)
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

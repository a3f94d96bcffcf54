//! Settings loading, validation, and conversion into execution options.

use super::model::Settings;
use crate::error::{DushError, Result};
use crate::exec::{EnvOverlay, ProcessOptions};
use crate::paths::{self, WORKSPACE_ENV};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the settings file explicitly.
pub const CONFIG_ENV: &str = "DUSH_CONFIG";

/// Settings file looked up in the workspace directory.
pub const SETTINGS_FILE_NAME: &str = ".dush.yaml";

impl Settings {
    /// Where the settings file is, if anywhere.
    ///
    /// `$DUSH_CONFIG` wins even when the file does not exist, so a typo is
    /// reported instead of silently falling back to defaults.
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }

        let candidate = paths::workspace_optional()?.join(SETTINGS_FILE_NAME);
        candidate.is_file().then_some(candidate)
    }

    /// Load the located settings file, or defaults when there is none.
    pub fn locate_and_load() -> Result<Self> {
        match Self::locate() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading settings");
                Self::load(path)
            }
            None => {
                tracing::debug!(workspace_var = WORKSPACE_ENV, "no settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Successfully loaded and validated settings
    /// * `Err(DushError::Config)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            DushError::Config(format!(
                "failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)
            .map_err(|e| DushError::Config(format!("failed to parse settings YAML: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| DushError::Config(format!("failed to serialize settings to YAML: {}", e)))
    }

    /// Validation rules:
    /// - `default_timeout_seconds` must be positive when present
    /// - `env` names must be non-empty and free of `=`
    /// - `paths` and `library_paths` entries must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_seconds == Some(0) {
            return Err(DushError::Config(
                "settings validation failed: default_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        self.overlay()
            .validate()
            .map_err(|e| DushError::Config(format!("settings validation failed: {}", e)))?;

        if self.paths.iter().chain(&self.library_paths).any(|p| p.is_empty()) {
            return Err(DushError::Config(
                "settings validation failed: path entries must be non-empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_seconds.map(Duration::from_secs)
    }

    /// The environment part of the settings as an overlay.
    pub fn overlay(&self) -> EnvOverlay {
        let mut overlay = EnvOverlay::new();
        for (name, value) in &self.env {
            overlay.set(name, value);
        }
        for entry in &self.paths {
            overlay.prepend_path(entry);
        }
        for entry in &self.library_paths {
            overlay.prepend_library_path(entry);
        }
        overlay
    }

    /// Process options pre-populated from the settings.
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions::new()
            .overlay(&self.overlay())
            .shell(self.shell)
            .maybe_timeout(self.default_timeout())
            .print_script(self.print_scripts)
    }
}

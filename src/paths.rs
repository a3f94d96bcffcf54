//! Paths taken from environment variables.

use crate::error::{DushError, Result};
use std::env;
use std::path::PathBuf;

/// Variable holding the workspace root.
pub const WORKSPACE_ENV: &str = "DUSH_WORKSPACE";

/// A path read from an environment variable on demand.
///
/// By default the variable must be set and point at an existing directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPath {
    variable: String,
    required: bool,
    directory: bool,
}

impl EnvPath {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            required: true,
            directory: true,
        }
    }

    /// Whether a missing variable or a missing target is an error.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Whether the target must be a directory (otherwise a file).
    pub fn directory(mut self, directory: bool) -> Self {
        self.directory = directory;
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Read the variable and check the target.
    ///
    /// Returns `Ok(None)` only for optional paths whose variable is unset.
    pub fn resolve(&self) -> Result<Option<PathBuf>> {
        let Some(value) = env::var_os(&self.variable).filter(|v| !v.is_empty()) else {
            if self.required {
                return Err(DushError::Config(format!(
                    "Cannot find path. Please define it in {} environment variable.",
                    self.variable
                )));
            }
            return Ok(None);
        };

        let path = PathBuf::from(value);
        if self.required {
            if self.directory && !path.is_dir() {
                return Err(DushError::Config(format!(
                    "{} does not point at a directory: {}",
                    self.variable,
                    path.display()
                )));
            }
            if !self.directory && !path.is_file() {
                return Err(DushError::Config(format!(
                    "{} does not point at a file: {}",
                    self.variable,
                    path.display()
                )));
            }
        }
        Ok(Some(path))
    }

    /// Like [`resolve`](Self::resolve), for required paths.
    pub fn get(&self) -> Result<PathBuf> {
        self.resolve()?.ok_or_else(|| {
            DushError::Config(format!("{} environment variable is not set", self.variable))
        })
    }
}

/// The workspace root from `DUSH_WORKSPACE`.
pub fn workspace() -> Result<PathBuf> {
    EnvPath::new(WORKSPACE_ENV).get()
}

/// The workspace root when `DUSH_WORKSPACE` is set to an existing
/// directory.
pub fn workspace_optional() -> Option<PathBuf> {
    EnvPath::new(WORKSPACE_ENV)
        .required(false)
        .resolve()
        .ok()
        .flatten()
        .filter(|p| p.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScopedEnv;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn required_unset_variable() {
        let mut env = ScopedEnv::new();
        env.remove("DUSH_TEST_PATH_UNSET").unwrap();

        let err = EnvPath::new("DUSH_TEST_PATH_UNSET").resolve().unwrap_err();
        assert!(err.to_string().contains("DUSH_TEST_PATH_UNSET environment variable"));
    }

    #[test]
    #[serial]
    fn optional_unset_variable() {
        let mut env = ScopedEnv::new();
        env.remove("DUSH_TEST_PATH_UNSET").unwrap();

        let path = EnvPath::new("DUSH_TEST_PATH_UNSET").required(false).resolve().unwrap();
        assert!(path.is_none());
    }

    #[test]
    #[serial]
    fn directory_check() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        let mut env = ScopedEnv::new();
        env.set("DUSH_TEST_PATH_DIR", temp_dir.path()).unwrap();
        env.set("DUSH_TEST_PATH_FILE", &file).unwrap();

        assert_eq!(EnvPath::new("DUSH_TEST_PATH_DIR").get().unwrap(), temp_dir.path());
        assert!(EnvPath::new("DUSH_TEST_PATH_FILE").get().is_err());
        assert_eq!(
            EnvPath::new("DUSH_TEST_PATH_FILE").directory(false).get().unwrap(),
            file
        );
    }

    #[test]
    #[serial]
    fn workspace_from_environment() {
        let temp_dir = TempDir::new().unwrap();
        let mut env = ScopedEnv::new();
        env.set(WORKSPACE_ENV, temp_dir.path()).unwrap();

        assert_eq!(workspace().unwrap(), temp_dir.path());
        assert_eq!(workspace_optional().as_deref(), Some(temp_dir.path()));

        env.set(WORKSPACE_ENV, temp_dir.path().join("missing")).unwrap();
        assert!(workspace().is_err());
        assert!(workspace_optional().is_none());
    }
}

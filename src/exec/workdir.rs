//! Scoped change of the process working directory.

use crate::error::{DushError, Result};
use crate::exec::state::StateLease;
use std::env;
use std::path::{Path, PathBuf};

/// RAII guard that switches the current directory and switches back on drop.
///
/// `enter` tolerates a target that cannot be entered: the guard stays in the
/// previous directory and [`entered`](Self::entered) reports `false`.
#[derive(Debug)]
pub struct WorkingDirGuard {
    saved: PathBuf,
    current: PathBuf,
    entered: bool,
    _lease: StateLease,
}

impl WorkingDirGuard {
    pub fn enter(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (guard, failure) = Self::switch(path)?;
        if let Some(e) = failure {
            tracing::warn!(path = %path.display(), error = %e, "could not enter directory, staying in current one");
        }
        Ok(guard)
    }

    /// Like [`enter`](Self::enter), but failing to enter `path` is an error.
    pub fn enter_strict(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::switch(path)? {
            (guard, None) => Ok(guard),
            (_, Some(source)) => Err(DushError::IncorrectWorkingDirectory {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn switch(path: &Path) -> Result<(Self, Option<std::io::Error>)> {
        let lease = StateLease::acquire();
        let saved = env::current_dir().map_err(|e| {
            DushError::Io(format!("failed to get current working directory: {}", e))
        })?;

        let failure = env::set_current_dir(path).err();
        let current = env::current_dir().unwrap_or_else(|_| saved.clone());

        let guard = Self {
            saved,
            current,
            entered: failure.is_none(),
            _lease: lease,
        };
        Ok((guard, failure))
    }

    pub fn entered(&self) -> bool {
        self.entered
    }

    /// Directory in effect while the guard is alive.
    pub fn cwd(&self) -> &Path {
        &self.current
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.saved) {
            tracing::warn!(path = %self.saved.display(), error = %e, "failed to restore working directory");
        }
    }
}

//! Environment overlays.
//!
//! [`EnvOverlay`] describes variable assignments and search-path prepends as a
//! plain value. The process executor applies it to the spawned command only,
//! leaving the parent environment untouched. [`ScopedEnv`] applies the same
//! kind of changes to the real process environment (needed for in-process
//! functions) and restores the exact snapshot taken on entry when dropped.

use crate::error::{DushError, Result};
use crate::exec::state::StateLease;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::ffi::{OsStr, OsString};
use std::process::Command;

/// Separator between entries of path-like variables.
#[cfg(windows)]
pub const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_SEPARATOR: &str = ":";

/// Executable search path variable.
pub const PATH_VAR: &str = "PATH";

/// Dynamic-library search path variable.
#[cfg(windows)]
pub const LIBRARY_PATH_VAR: &str = "PATH";
#[cfg(target_os = "macos")]
pub const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(all(unix, not(target_os = "macos")))]
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Compute the new value of a path-like variable.
///
/// Returns `None` when there is nothing to prepend. Otherwise the entries are
/// joined by `separator`, followed by the separator and the prior value when
/// the variable had a non-empty one.
pub fn prepend_value(entries: &[String], separator: &str, prior: Option<&OsStr>) -> Option<OsString> {
    if entries.is_empty() {
        return None;
    }

    let mut value = OsString::from(entries.join(separator));
    if let Some(prior) = prior.filter(|p| !p.is_empty()) {
        value.push(separator);
        value.push(prior);
    }
    Some(value)
}

fn check_var_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(DushError::InvalidOptions(format!(
            "'{}' is not a valid environment variable name",
            name
        )));
    }
    Ok(())
}

/// Entries to put in front of one path-like variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrepend {
    pub variable: String,
    pub separator: String,
    pub entries: Vec<String>,
}

/// A set of environment changes, described but not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
    prepends: Vec<PathPrepend>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Prepend entries to a path-like variable. Repeated calls for the same
    /// variable accumulate in call order.
    pub fn prepend<I, S>(&mut self, variable: &str, separator: &str, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return self;
        }

        match self
            .prepends
            .iter_mut()
            .find(|p| p.variable == variable && p.separator == separator)
        {
            Some(existing) => existing.entries.extend(entries),
            None => self.prepends.push(PathPrepend {
                variable: variable.to_string(),
                separator: separator.to_string(),
                entries,
            }),
        }
        self
    }

    /// Prepend one entry to the executable search path.
    pub fn prepend_path(&mut self, entry: impl Into<String>) -> &mut Self {
        self.prepend(PATH_VAR, PATH_SEPARATOR, [entry.into()])
    }

    /// Prepend one entry to the dynamic-library search path.
    pub fn prepend_library_path(&mut self, entry: impl Into<String>) -> &mut Self {
        self.prepend(LIBRARY_PATH_VAR, PATH_SEPARATOR, [entry.into()])
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn prepends(&self) -> &[PathPrepend] {
        &self.prepends
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.prepends.is_empty()
    }

    /// Merge another overlay on top of this one.
    pub fn extend(&mut self, other: &EnvOverlay) {
        for (name, value) in &other.vars {
            self.vars.insert(name.clone(), value.clone());
        }
        for prepend in &other.prepends {
            self.prepend(&prepend.variable, &prepend.separator, prepend.entries.clone());
        }
    }

    /// Reject variable names the operating system cannot represent.
    pub fn validate(&self) -> Result<()> {
        for name in self.vars.keys() {
            check_var_name(name)?;
        }
        for prepend in &self.prepends {
            check_var_name(&prepend.variable)?;
        }
        Ok(())
    }

    /// Final variable values, with prepends resolved against `lookup` for
    /// variables the overlay does not assign itself.
    pub fn resolve<F>(&self, lookup: F) -> BTreeMap<String, OsString>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut resolved: BTreeMap<String, OsString> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), OsString::from(v)))
            .collect();

        for prepend in &self.prepends {
            let prior = resolved
                .get(&prepend.variable)
                .cloned()
                .or_else(|| lookup(&prepend.variable));
            if let Some(value) = prepend_value(&prepend.entries, &prepend.separator, prior.as_deref()) {
                resolved.insert(prepend.variable.clone(), value);
            }
        }
        resolved
    }

    /// Apply the overlay to a command about to be spawned.
    pub fn apply_to_command(&self, command: &mut Command) {
        for (name, value) in self.resolve(|name| env::var_os(name)) {
            command.env(name, value);
        }
    }
}

/// RAII overlay on the real process environment.
///
/// The snapshot is taken at construction; dropping the guard restores it
/// exactly, whatever happened in between. Guards nest on one thread and are
/// restored last-in-first-out.
pub struct ScopedEnv {
    snapshot: Vec<(OsString, OsString)>,
    _lease: StateLease,
}

impl ScopedEnv {
    pub fn new() -> Self {
        let lease = StateLease::acquire();
        Self {
            snapshot: env::vars_os().collect(),
            _lease: lease,
        }
    }

    pub fn set(&mut self, name: &str, value: impl AsRef<OsStr>) -> Result<()> {
        check_var_name(name)?;
        // SAFETY: the state lease serialises environment mutation for this process.
        unsafe { env::set_var(name, value) };
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        check_var_name(name)?;
        // SAFETY: see `set`.
        unsafe { env::remove_var(name) };
        Ok(())
    }

    /// Prepend `entries` to the variable `name`. No-op for empty `entries`.
    pub fn prepend_path(&mut self, name: &str, separator: &str, entries: &[String]) -> Result<()> {
        let prior = env::var_os(name);
        match prepend_value(entries, separator, prior.as_deref()) {
            Some(value) => self.set(name, value),
            None => Ok(()),
        }
    }

    pub fn apply(&mut self, overlay: &EnvOverlay) -> Result<()> {
        overlay.validate()?;
        for (name, value) in overlay.resolve(|name| env::var_os(name)) {
            self.set(&name, value)?;
        }
        Ok(())
    }

    fn restore(&self) {
        let saved: HashMap<&OsStr, &OsStr> = self
            .snapshot
            .iter()
            .map(|(k, v)| (k.as_os_str(), v.as_os_str()))
            .collect();

        for (name, _) in env::vars_os() {
            if !saved.contains_key(name.as_os_str()) {
                // SAFETY: see `set`.
                unsafe { env::remove_var(&name) };
            }
        }
        for (name, value) in &self.snapshot {
            if env::var_os(name).as_deref() != Some(value.as_os_str()) {
                // SAFETY: see `set`.
                unsafe { env::set_var(name, value) };
            }
        }
    }
}

impl Default for ScopedEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        self.restore();
    }
}

//! Settings struct definition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Defaults applied by the built-in commands to every process they run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout for processes run without an explicit one. Must be positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout_seconds: Option<u64>,

    /// Variables set for every process.
    pub env: BTreeMap<String, String>,

    /// Entries prepended to the executable search path.
    pub paths: Vec<String>,

    /// Entries prepended to the dynamic-library search path.
    pub library_paths: Vec<String>,

    /// Print a script preview before each run.
    pub print_scripts: bool,

    /// Run commands through the shell by default.
    pub shell: bool,
}

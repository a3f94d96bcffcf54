//! Settings for dush tools.
//!
//! Settings live in an optional YAML file, `$DUSH_CONFIG` or
//! `$DUSH_WORKSPACE/.dush.yaml`. Parsing is forward-compatible (unknown
//! fields are ignored) and every field has a default, so a missing file
//! means default settings.

mod model;
mod operations;


pub use model::Settings;
pub use operations::{CONFIG_ENV, SETTINGS_FILE_NAME};

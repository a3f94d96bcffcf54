//! Diagnostic logging setup.
//!
//! Logging goes to stderr and is separate from the command's own output and
//! the dispatcher's summary line.

use crate::framework::FrameworkFlags;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter for the given framework flags.
pub fn default_level(flags: &FrameworkFlags) -> &'static str {
    if flags.verbose {
        "debug"
    } else if flags.quiet {
        "error"
    } else {
        "warn"
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the flag-derived
/// level. Only the first call in a process has an effect.
pub fn init(flags: &FrameworkFlags) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(flags)));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .try_init();
}

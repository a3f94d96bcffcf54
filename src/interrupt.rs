//! Ctrl+C handling.
//!
//! The dispatcher installs a handler that only records the request. Blocking
//! waits in the process executor poll the flag, kill their child and fail
//! with `DushError::Interrupted`. Long in-process work should call
//! [`check`] between steps. A second Ctrl+C exits immediately.

use crate::error::{DushError, Result};
use crate::exit_codes;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static REQUESTED: AtomicBool = AtomicBool::new(false);
static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the process-wide handler. Calling it again is a no-op.
pub fn install() -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    ctrlc::set_handler(|| {
        if REQUESTED.swap(true, Ordering::SeqCst) {
            eprintln!("\nInterrupted twice, exiting.");
            std::process::exit(exit_codes::INTERRUPTED);
        }
    })
    .map_err(|e| DushError::Io(format!("failed to set Ctrl+C handler: {}", e)))?;

    let _ = INSTALLED.set(());
    Ok(())
}

pub fn is_requested() -> bool {
    REQUESTED.load(Ordering::SeqCst)
}

/// Record an interrupt as if Ctrl+C had been pressed.
pub fn request() {
    REQUESTED.store(true, Ordering::SeqCst);
}

pub fn reset() {
    REQUESTED.store(false, Ordering::SeqCst);
}

/// Fail with `DushError::Interrupted` once Ctrl+C has been pressed.
pub fn check(command: &str) -> Result<()> {
    if is_requested() {
        return Err(DushError::Interrupted {
            command: command.to_string(),
        });
    }
    Ok(())
}

//! Serialisation of process-wide mutable state.
//!
//! The environment, the current directory and the standard stream file
//! descriptors belong to the whole process. Every guard that mutates one of
//! them holds a [`StateLease`] for its lifetime. The lease is re-entrant on
//! the thread that holds it, so guards may nest on one call path, while
//! guards on other threads block until the outermost lease is released.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard};

static STATE_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Proof that the current thread owns process-wide state.
#[derive(Debug)]
pub(crate) struct StateLease {
    // Only the outermost lease on a thread holds the mutex.
    _guard: Option<MutexGuard<'static, ()>>,
}

impl StateLease {
    pub(crate) fn acquire() -> Self {
        let depth = DEPTH.with(Cell::get);
        let guard = if depth == 0 {
            Some(
                STATE_LOCK
                    .lock()
                    .unwrap_or_else(|poison| poison.into_inner()),
            )
        } else {
            None
        };
        DEPTH.with(|d| d.set(depth + 1));
        Self { _guard: guard }
    }
}

impl Drop for StateLease {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

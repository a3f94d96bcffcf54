//! Function executor.
//!
//! Runs an in-process callable under the same contract as an external
//! process. Environment and working directory are switched for the whole
//! process (the callable shares it), and standard output and error are
//! redirected at the file-descriptor level so that output written by any
//! code inside the callable follows the routing policy. Everything is
//! restored before returning, whatever the outcome.

use crate::error::{DushError, Result};
use crate::exec::env::{EnvOverlay, ScopedEnv};
use crate::exec::policy::{OutputPolicy, surface};
use crate::exec::result::{CommandResult, Status};
use crate::exec::state::StateLease;
use crate::exec::workdir::WorkingDirGuard;
use crate::{exit_codes, interrupt};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

/// How to run one in-process function.
#[derive(Debug)]
pub struct FunctionOptions {
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) env: EnvOverlay,
    pub(crate) stdout: OutputPolicy,
    pub(crate) stderr: OutputPolicy,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: EnvOverlay::new(),
            stdout: OutputPolicy::PrintToConsole,
            stderr: OutputPolicy::PrintToConsole,
        }
    }
}

impl FunctionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.set(name, value);
        self
    }

    pub fn path(mut self, entry: impl Into<String>) -> Self {
        self.env.prepend_path(entry);
        self
    }

    pub fn library_path(mut self, entry: impl Into<String>) -> Self {
        self.env.prepend_library_path(entry);
        self
    }

    pub fn overlay(mut self, overlay: &EnvOverlay) -> Self {
        self.env.extend(overlay);
        self
    }

    pub fn stdout(mut self, policy: OutputPolicy) -> Self {
        self.stdout = policy;
        self
    }

    pub fn stderr(mut self, policy: OutputPolicy) -> Self {
        self.stderr = policy;
        self
    }
}

/// Run `callable` under `options`.
///
/// # Arguments
///
/// * `name` - Identifier reported as the invocation
/// * `callable` - The function; arguments are captured by the closure
/// * `options` - Working directory, environment and stream routing
///
/// # Returns
///
/// The result on success. A returned error or a panic becomes
/// `DushError::Function` carrying the buffered output. A Ctrl+C that
/// arrives while the callable runs is reported as `DushError::Interrupted`
/// whatever the callable returned.
pub fn execute_function<F, E>(name: &str, callable: F, options: FunctionOptions) -> Result<CommandResult>
where
    F: FnOnce() -> std::result::Result<(), E>,
    E: fmt::Display,
{
    options.env.validate()?;
    let stdout_plan = options.stdout.plan();
    let stderr_plan = options.stderr.plan();

    // Held for the whole call: descriptors 1 and 2 are process-wide too.
    let _lease = StateLease::acquire();

    let _cwd_guard = match &options.cwd {
        Some(dir) => Some(WorkingDirGuard::enter_strict(dir)?),
        None => None,
    };
    let mut env_guard = ScopedEnv::new();
    env_guard.apply(&options.env)?;

    tracing::debug!(
        function = name,
        stdout = options.stdout.label(),
        stderr = options.stderr.label(),
        "running function"
    );

    let interrupted_before = interrupt::is_requested();
    let start = Instant::now();
    let stdout_redirect = redirect::Redirect::begin(redirect::STDOUT, options.stdout)?;
    let stderr_redirect = redirect::Redirect::begin(redirect::STDERR, options.stderr)?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(callable));

    let stderr = stderr_redirect.and_then(|r| r.finish());
    let stdout = stdout_redirect.and_then(|r| r.finish());
    let duration = start.elapsed();
    drop(env_guard);

    if !interrupted_before && interrupt::is_requested() {
        tracing::warn!(function = name, "interrupted by user");
        return Err(DushError::Interrupted {
            command: name.to_string(),
        });
    }

    let message = match outcome {
        Ok(Ok(())) => {
            tracing::debug!(function = name, elapsed_ms = duration.as_millis() as u64, "function succeeded");
            return Ok(CommandResult {
                invocation: name.to_string(),
                status: Status::Succeeded,
                stdout: surface(stdout_plan, false, stdout),
                stderr: surface(stderr_plan, false, stderr),
                duration,
            });
        }
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    tracing::debug!(function = name, error = %message, "function failed");
    Err(DushError::Function {
        name: name.to_string(),
        exit_code: exit_codes::FAILURE,
        message,
        stdout: surface(stdout_plan, true, stdout),
        stderr: surface(stderr_plan, true, stderr),
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(unix)]
mod redirect {
    use super::*;
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::os::fd::{AsRawFd, RawFd};

    pub const STDOUT: RawFd = libc::STDOUT_FILENO;
    pub const STDERR: RawFd = libc::STDERR_FILENO;

    /// One standard descriptor pointed somewhere else until `finish`.
    pub struct Redirect {
        fd: RawFd,
        saved: Option<RawFd>,
        // Keeps the target open; read back when buffering.
        target: File,
        buffered: bool,
    }

    fn flush(fd: RawFd) {
        if fd == STDOUT {
            let _ = std::io::stdout().flush();
        } else {
            let _ = std::io::stderr().flush();
        }
    }

    impl Redirect {
        /// Redirect `fd` according to `policy`. Console output needs no
        /// redirect and yields `None`.
        pub fn begin(fd: RawFd, policy: OutputPolicy) -> Result<Option<Self>> {
            let (target, buffered) = match policy {
                OutputPolicy::PrintToConsole => return Ok(None),
                OutputPolicy::PrintToSink(file) => (file, false),
                OutputPolicy::Discard | OutputPolicy::Capture => {
                    let file = tempfile::tempfile()
                        .map_err(|e| DushError::Io(format!("failed to create output buffer: {}", e)))?;
                    (file, true)
                }
            };

            flush(fd);
            // SAFETY: `fd` is a standard descriptor that stays open for the
            // life of the process.
            let saved = unsafe { libc::dup(fd) };
            if saved < 0 {
                return Err(DushError::Io(format!(
                    "failed to duplicate descriptor {}: {}",
                    fd,
                    std::io::Error::last_os_error()
                )));
            }
            // SAFETY: both descriptors are open; `target` outlives the redirect.
            if unsafe { libc::dup2(target.as_raw_fd(), fd) } < 0 {
                let err = std::io::Error::last_os_error();
                // SAFETY: `saved` was returned by `dup` above and is owned here.
                unsafe { libc::close(saved) };
                return Err(DushError::Io(format!("failed to redirect descriptor {}: {}", fd, err)));
            }

            Ok(Some(Self {
                fd,
                saved: Some(saved),
                target,
                buffered,
            }))
        }

        fn restore(&mut self) {
            if let Some(saved) = self.saved.take() {
                flush(self.fd);
                // SAFETY: `saved` is the duplicate taken in `begin`.
                unsafe {
                    libc::dup2(saved, self.fd);
                    libc::close(saved);
                }
            }
        }

        /// Put the descriptor back and return the buffered text, if any.
        pub fn finish(mut self) -> Option<String> {
            self.restore();
            if !self.buffered {
                return None;
            }

            let mut bytes = Vec::new();
            self.target.seek(SeekFrom::Start(0)).ok()?;
            self.target.read_to_end(&mut bytes).ok()?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    impl Drop for Redirect {
        fn drop(&mut self) {
            self.restore();
        }
    }
}

#[cfg(not(unix))]
mod redirect {
    use super::*;

    pub const STDOUT: i32 = 1;
    pub const STDERR: i32 = 2;

    pub struct Redirect;

    impl Redirect {
        pub fn begin(_fd: i32, policy: OutputPolicy) -> Result<Option<Self>> {
            match policy {
                OutputPolicy::PrintToConsole => Ok(None),
                other => Err(DushError::InvalidOptions(format!(
                    "output policy '{}' is not supported for functions on this platform",
                    other.label()
                ))),
            }
        }

        pub fn finish(self) -> Option<String> {
            None
        }
    }
}

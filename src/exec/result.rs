//! Uniform outcome record for process and function execution.

use std::fmt;
use std::time::Duration;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Succeeded,
    Failed(i32),
    TimedOut,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Succeeded => write!(f, "succeeded"),
            Status::Failed(code) => write!(f, "failed (exit code {})", code),
            Status::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Result of one executed process or function.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command line or function name that was run.
    pub invocation: String,
    pub status: Status,
    /// Present when stdout was captured, or when the invocation failed.
    pub stdout: Option<String>,
    /// Present when stderr was captured, or when the invocation failed.
    pub stderr: Option<String>,
    pub duration: Duration,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.status == Status::Succeeded
    }

    /// Exit code of a finished invocation; `None` after a timeout.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            Status::Succeeded => Some(0),
            Status::Failed(code) => Some(code),
            Status::TimedOut => None,
        }
    }

    /// Duration truncated to whole seconds, for display.
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    /// Captured stdout, or an empty string.
    pub fn stdout_text(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }
}

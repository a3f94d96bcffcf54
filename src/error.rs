//! Error types for dush.
//!
//! Uses thiserror for derive macros. Every error propagates up to the
//! dispatcher, which is the only place that turns it into a summary line
//! and an exit code.

use crate::exit_codes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for dush operations.
#[derive(Error, Debug)]
pub enum DushError {
    /// A process exited with a non-zero status.
    #[error("command '{command}' failed with exit code {exit_code}")]
    Process {
        command: String,
        exit_code: i32,
        stdout: Option<String>,
        stderr: Option<String>,
    },

    /// A process did not finish before its deadline and was killed.
    #[error("command '{command}' timed out after {}s", timeout.as_secs())]
    Timeout {
        command: String,
        timeout: Duration,
        stdout: Option<String>,
        stderr: Option<String>,
    },

    /// An in-process function returned an error or panicked. `exit_code`
    /// is always `exit_codes::FAILURE`.
    #[error("function '{name}' failed: {message}")]
    Function {
        name: String,
        exit_code: i32,
        message: String,
        stdout: Option<String>,
        stderr: Option<String>,
    },

    /// The user pressed Ctrl+C while a command was running.
    #[error("interrupted while running '{command}'")]
    Interrupted { command: String },

    /// A command was registered in violation of the registry mode.
    #[error("incorrect registry state: {0}")]
    IncorrectRegistryState(String),

    /// Multiple-command mode is active but no command name was given.
    #[error("no command specified")]
    MissingCommand,

    /// Malformed command line.
    #[error("{0}")]
    Parse(String),

    /// The selected command is not registered.
    #[error("command \"{0}\" not found")]
    CommandNotFound(String),

    /// The requested working directory could not be entered.
    #[error("cannot enter working directory '{}': {source}", path.display())]
    IncorrectWorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The program could not be started at all.
    #[error("failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Execution options violate a precondition.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Settings or environment-backed path problem.
    #[error("{0}")]
    Config(String),

    /// I/O failure inside the executors themselves.
    #[error("{0}")]
    Io(String),

    /// Anything raised by command code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DushError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DushError::Interrupted { .. } => exit_codes::INTERRUPTED,
            DushError::Other(err) => match err.downcast_ref::<DushError>() {
                Some(inner) => inner.exit_code(),
                None => exit_codes::FAILURE,
            },
            _ => exit_codes::FAILURE,
        }
    }

    /// Full diagnostic text: the error chain, then any captured output and
    /// the command line that produced it.
    pub fn diagnostics(&self) -> String {
        let mut lines = vec![self.to_string()];

        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            lines.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        let (command, stdout, stderr) = match self {
            DushError::Process {
                command,
                stdout,
                stderr,
                ..
            }
            | DushError::Timeout {
                command,
                stdout,
                stderr,
                ..
            } => (Some(command), stdout, stderr),
            DushError::Function {
                name,
                stdout,
                stderr,
                ..
            } => (Some(name), stdout, stderr),
            _ => (None, &None, &None),
        };

        if let Some(out) = stdout.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("stdout: {}", out.trim_end()));
        }
        if let Some(err) = stderr.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("stderr: {}", err.trim_end()));
        }
        if let Some(command) = command {
            lines.push(format!("command: {}", command));
        }
        lines.join("\n")
    }
}

/// Result type alias for dush operations.
pub type Result<T> = std::result::Result<T, DushError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_error_has_failure_exit_code() {
        let err = DushError::Process {
            command: "make".to_string(),
            exit_code: 3,
            stdout: None,
            stderr: None,
        };
        assert_eq!(err.exit_code(), exit_codes::FAILURE);
    }

    #[test]
    fn function_error_carries_failure_exit_code() {
        let err = DushError::Function {
            name: "configure".to_string(),
            exit_code: exit_codes::FAILURE,
            message: "missing toolchain".to_string(),
            stdout: None,
            stderr: None,
        };
        match &err {
            DushError::Function { exit_code, .. } | DushError::Process { exit_code, .. } => {
                assert_eq!(*exit_code, err.exit_code());
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn interrupted_has_interrupt_exit_code() {
        let err = DushError::Interrupted {
            command: "sleep 5".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::INTERRUPTED);
    }

    #[test]
    fn interrupted_wrapped_in_anyhow_keeps_exit_code() {
        let err: DushError = anyhow::Error::new(DushError::Interrupted {
            command: "ninja".to_string(),
        })
        .into();
        assert_eq!(err.exit_code(), exit_codes::INTERRUPTED);
    }

    #[test]
    fn error_messages_are_one_line() {
        let err = DushError::Timeout {
            command: "sleep 5".to_string(),
            timeout: Duration::from_secs(1),
            stdout: Some("partial\n".to_string()),
            stderr: None,
        };
        assert_eq!(err.to_string(), "command 'sleep 5' timed out after 1s");
        assert!(!err.to_string().contains('\n'));
    }

    #[test]
    fn diagnostics_include_captured_output_and_command() {
        let err = DushError::Process {
            command: "cmake -B build".to_string(),
            exit_code: 1,
            stdout: Some("configuring\n".to_string()),
            stderr: Some("CMake Error\n".to_string()),
        };
        let text = err.diagnostics();
        assert!(text.contains("stdout: configuring"));
        assert!(text.contains("stderr: CMake Error"));
        assert!(text.ends_with("command: cmake -B build"));
    }

    #[test]
    fn diagnostics_include_source_chain() {
        let err = DushError::Spawn {
            command: "missing-tool".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.diagnostics().contains("caused by: no such file"));
    }
}

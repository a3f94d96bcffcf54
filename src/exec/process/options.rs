//! Options for one process invocation.

use crate::error::{DushError, Result};
use crate::exec::env::EnvOverlay;
use crate::exec::policy::{InputPolicy, OutputPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How to run one external command.
///
/// Built with chained setters:
///
/// ```no_run
/// use dush::exec::{execute, OutputPolicy, ProcessOptions};
/// use std::time::Duration;
///
/// let options = ProcessOptions::new()
///     .cwd("build")
///     .path("/opt/cmake/bin")
///     .env("VERBOSE", "1")
///     .stdout(OutputPolicy::Capture)
///     .timeout(Duration::from_secs(600));
/// let result = execute("cmake --build .", options)?;
/// println!("{}", result.stdout_text());
/// # Ok::<(), dush::error::DushError>(())
/// ```
#[derive(Debug)]
pub struct ProcessOptions {
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) env: EnvOverlay,
    pub(crate) stdin: InputPolicy,
    pub(crate) stdout: OutputPolicy,
    pub(crate) stderr: OutputPolicy,
    pub(crate) shell: bool,
    pub(crate) ignore_error: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) print_script: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: EnvOverlay::new(),
            stdin: InputPolicy::Discard,
            stdout: OutputPolicy::PrintToConsole,
            stderr: OutputPolicy::PrintToConsole,
            shell: false,
            ignore_error: false,
            timeout: None,
            print_script: false,
        }
    }
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the simplified call form: one switch to return stdout,
    /// one to print it. Asking for both is rejected.
    pub fn simple(return_stdout: bool, print_stdout: bool) -> Result<Self> {
        if return_stdout && print_stdout {
            return Err(DushError::InvalidOptions(
                "returning and printing stdout at the same time is not supported".to_string(),
            ));
        }

        let options = Self::new();
        Ok(match (return_stdout, print_stdout) {
            (_, true) => options,
            (true, false) => options
                .stdout(OutputPolicy::Capture)
                .stderr(OutputPolicy::Discard),
            (false, false) => options
                .stdout(OutputPolicy::Discard)
                .stderr(OutputPolicy::Discard),
        })
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.set(name, value);
        self
    }

    /// Prepend an entry to the executable search path.
    pub fn path(mut self, entry: impl Into<String>) -> Self {
        self.env.prepend_path(entry);
        self
    }

    /// Prepend an entry to the dynamic-library search path.
    pub fn library_path(mut self, entry: impl Into<String>) -> Self {
        self.env.prepend_library_path(entry);
        self
    }

    /// Merge a whole overlay into the options.
    pub fn overlay(mut self, overlay: &EnvOverlay) -> Self {
        self.env.extend(overlay);
        self
    }

    pub fn stdin(mut self, policy: InputPolicy) -> Self {
        self.stdin = policy;
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

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn ignore_error(mut self, ignore: bool) -> Self {
        self.ignore_error = ignore;
        self
    }

    /// Kill the command once `timeout` has passed. With a non-inherited
    /// stdin the command runs in its own process group on Unix and the
    /// whole group is killed. With `InputPolicy::Inherit` it stays in the
    /// terminal's foreground group and only the direct child is killed.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn maybe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Print an equivalent shell script before running.
    pub fn print_script(mut self, enabled: bool) -> Self {
        self.print_script = enabled;
        self
    }

    pub fn env_overlay(&self) -> &EnvOverlay {
        &self.env
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn uses_shell(&self) -> bool {
        self.shell
    }

    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::policy::StreamPlan;

    #[test]
    fn defaults_print_to_console() {
        let options = ProcessOptions::new();
        assert_eq!(options.stdout.plan(), StreamPlan::Direct);
        assert_eq!(options.stderr.plan(), StreamPlan::Direct);
        assert!(matches!(options.stdin, InputPolicy::Discard));
        assert!(!options.shell);
        assert!(!options.ignore_error);
        assert!(options.timeout.is_none());
    }

    #[test]
    fn simple_rejects_return_and_print() {
        let err = ProcessOptions::simple(true, true).unwrap_err();
        assert!(matches!(err, DushError::InvalidOptions(_)));
    }

    #[test]
    fn simple_return_captures_stdout() {
        let options = ProcessOptions::simple(true, false).unwrap();
        assert_eq!(options.stdout.plan(), StreamPlan::Buffer { keep: true });
        assert_eq!(options.stderr.plan(), StreamPlan::Buffer { keep: false });
    }

    #[test]
    fn simple_quiet_discards_both() {
        let options = ProcessOptions::simple(false, false).unwrap();
        assert_eq!(options.stdout.plan(), StreamPlan::Buffer { keep: false });
        assert_eq!(options.stderr.plan(), StreamPlan::Buffer { keep: false });
    }

    #[test]
    fn builder_accumulates_environment() {
        let options = ProcessOptions::new()
            .env("A", "1")
            .path("/opt/bin")
            .path("/opt/other");
        assert_eq!(options.env_overlay().vars()["A"], "1");
        assert_eq!(
            options.env_overlay().prepends()[0].entries,
            vec!["/opt/bin", "/opt/other"]
        );
    }
}

//! Process executor.
//!
//! Runs one external command under a uniform contract:
//!
//! - Environment overlay and working directory apply to the child only
//! - Each standard stream follows its routing policy
//! - Optional timeout; the child is killed on expiry, with its process group
//!   unless it shares the terminal's stdin
//! - Ctrl+C kills the child before the interrupt is reported
//! - Non-zero exit becomes `DushError::Process` unless errors are ignored

mod options;


pub use options::ProcessOptions;

use crate::error::{DushError, Result};
use crate::exec::policy::{InputPolicy, OutputPolicy, surface};
use crate::exec::result::{CommandResult, Status};
use crate::exec::script;
use crate::interrupt;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How the wait for a child ended.
enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
    Interrupted,
}

/// Run `command` and wait for it.
///
/// Returns the result on success (or on failure when `ignore_error` is set),
/// `DushError::Process` on a non-zero exit, `DushError::Timeout` when the
/// deadline passes and `DushError::Interrupted` on Ctrl+C.
pub fn execute(command: &str, options: ProcessOptions) -> Result<CommandResult> {
    options.env.validate()?;
    if let Some(dir) = &options.cwd {
        check_working_dir(dir)?;
    }

    if options.print_script {
        println!("{}", script::render(command, &options.env, options.shell));
    }

    let mut cmd = build_command(command, options.shell)?;
    options.env.apply_to_command(&mut cmd);
    if let Some(dir) = &options.cwd {
        cmd.current_dir(dir);
    }

    let stdout_plan = options.stdout.plan();
    let stderr_plan = options.stderr.plan();
    cmd.stdout(output_stdio(options.stdout));
    cmd.stderr(output_stdio(options.stderr));

    // A child sharing the terminal's stdin stays in the foreground group so
    // it can read the tty; a timeout then kills only the child itself.
    let own_group = !options.stdin.is_inherit();
    let stdin_text = match options.stdin {
        InputPolicy::Discard => {
            cmd.stdin(Stdio::null());
            None
        }
        InputPolicy::Inherit => {
            cmd.stdin(Stdio::inherit());
            None
        }
        InputPolicy::Text(text) => {
            cmd.stdin(Stdio::piped());
            Some(text)
        }
        InputPolicy::Source(file) => {
            cmd.stdin(Stdio::from(file));
            None
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if own_group {
            cmd.process_group(0);
        }
    }

    tracing::debug!(
        command,
        shell = options.shell,
        cwd = ?options.cwd,
        timeout = ?options.timeout,
        "spawning process"
    );

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| DushError::Spawn {
        command: command.to_string(),
        source: e,
    })?;

    let writer = stdin_text.and_then(|text| {
        child.stdin.take().map(|mut pipe| {
            std::thread::spawn(move || {
                // The child may exit without reading everything.
                let _ = pipe.write_all(text.as_bytes());
            })
        })
    });
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let outcome = wait_for_exit(&mut child, options.timeout, own_group);

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);
    let duration = start.elapsed();

    let status = match outcome? {
        WaitOutcome::Interrupted => {
            tracing::warn!(command, "interrupted, child process killed");
            return Err(DushError::Interrupted {
                command: command.to_string(),
            });
        }
        WaitOutcome::TimedOut => {
            let timeout = options.timeout.unwrap_or_default();
            tracing::warn!(command, timeout_secs = timeout.as_secs(), "timed out, child process killed");
            return Err(DushError::Timeout {
                command: command.to_string(),
                timeout,
                stdout: surface(stdout_plan, true, stdout),
                stderr: surface(stderr_plan, true, stderr),
            });
        }
        WaitOutcome::Exited(status) => status,
    };

    if status.success() {
        tracing::debug!(command, elapsed_ms = duration.as_millis() as u64, "process succeeded");
        return Ok(CommandResult {
            invocation: command.to_string(),
            status: Status::Succeeded,
            stdout: surface(stdout_plan, false, stdout),
            stderr: surface(stderr_plan, false, stderr),
            duration,
        });
    }

    let exit_code = exit_code_of(status);
    let stdout = surface(stdout_plan, true, stdout);
    let stderr = surface(stderr_plan, true, stderr);
    tracing::debug!(command, exit_code, "process failed");

    if options.ignore_error {
        Ok(CommandResult {
            invocation: command.to_string(),
            status: Status::Failed(exit_code),
            stdout,
            stderr,
            duration,
        })
    } else {
        Err(DushError::Process {
            command: command.to_string(),
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Simplified call form: run `command`, optionally returning or printing
/// its stdout (not both).
pub fn run_simple(command: &str, return_stdout: bool, print_stdout: bool) -> Result<Option<String>> {
    let options = ProcessOptions::simple(return_stdout, print_stdout)?;
    let result = execute(command, options)?;
    Ok(if return_stdout { result.stdout } else { None })
}

fn check_working_dir(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DushError::IncorrectWorkingDirectory {
            path: dir.to_path_buf(),
            source: std::io::Error::other("not a directory"),
        }),
        Err(e) => Err(DushError::IncorrectWorkingDirectory {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

/// Turn a command string into a `Command`.
///
/// Without shell interpretation the string is split with shell quoting rules
/// so quoted arguments survive as one token. With it, the string goes to the
/// platform command interpreter verbatim. Windows always uses the latter.
#[cfg(not(windows))]
fn build_command(command: &str, shell: bool) -> Result<Command> {
    if shell {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        return Ok(cmd);
    }

    let args = shell_words::split(command).map_err(|e| {
        DushError::InvalidOptions(format!(
            "failed to parse command '{}': {} (check for unmatched quotes)",
            command, e
        ))
    })?;

    let Some((program, rest)) = args.split_first() else {
        return Err(DushError::InvalidOptions(format!(
            "command is empty after parsing: '{}'",
            command
        )));
    };

    let mut cmd = Command::new(program);
    cmd.args(rest);
    Ok(cmd)
}

#[cfg(windows)]
fn build_command(command: &str, _shell: bool) -> Result<Command> {
    use std::os::windows::process::CommandExt;

    if command.trim().is_empty() {
        return Err(DushError::InvalidOptions("command is empty".to_string()));
    }
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command);
    Ok(cmd)
}

fn output_stdio(policy: OutputPolicy) -> Stdio {
    match policy {
        OutputPolicy::PrintToConsole => Stdio::inherit(),
        OutputPolicy::PrintToSink(file) => Stdio::from(file),
        OutputPolicy::Discard | OutputPolicy::Capture => Stdio::piped(),
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(reader: Option<JoinHandle<Vec<u8>>>) -> Option<String> {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Poll the child until it exits, the deadline passes or Ctrl+C arrives.
fn wait_for_exit(child: &mut Child, timeout: Option<Duration>, own_group: bool) -> Result<WaitOutcome> {
    let start = Instant::now();

    loop {
        if interrupt::is_requested() {
            kill_child(child, own_group);
            return Ok(WaitOutcome::Interrupted);
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                // A child killed by the same Ctrl+C must not read as a plain failure.
                if !status.success() && interrupt::is_requested() {
                    kill_child(child, own_group);
                    return Ok(WaitOutcome::Interrupted);
                }
                return Ok(WaitOutcome::Exited(status));
            }
            Ok(None) => {
                if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                    kill_child(child, own_group);
                    return Ok(WaitOutcome::TimedOut);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_child(child, own_group);
                return Err(DushError::Io(format!("failed to check process status: {}", e)));
            }
        }
    }
}

/// Kill the child (and its whole group when it has one) and reap it.
fn kill_child(child: &mut Child, own_group: bool) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if own_group && let Ok(pid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = own_group;

    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

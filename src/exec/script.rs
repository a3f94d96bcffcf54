//! Script preview of an invocation.
//!
//! Renders the environment overlay and the command as a standalone script
//! that reproduces the run by hand: POSIX sh on Unix, a batch file on
//! Windows.

use crate::exec::env::EnvOverlay;

const SEPARATOR: &str = "------------------------------";

/// Render the script for the current platform.
pub fn render(command: &str, overlay: &EnvOverlay, shell: bool) -> String {
    #[cfg(windows)]
    {
        render_batch(command, overlay, shell)
    }
    #[cfg(not(windows))]
    {
        render_posix(command, overlay, shell)
    }
}

/// POSIX sh form.
///
/// Without shell interpretation the command line is shown the way it is
/// split into arguments, re-quoted.
pub fn render_posix(command: &str, overlay: &EnvOverlay, shell: bool) -> String {
    let mut lines = vec![SEPARATOR.to_string(), "#!/bin/sh".to_string(), String::new()];

    if !overlay.vars().is_empty() {
        lines.push("# Setup environment variables".to_string());
        for (name, value) in overlay.vars() {
            lines.push(format!("export {}={}", name, shell_words::quote(value)));
        }
        lines.push(String::new());
    }

    if !overlay.prepends().is_empty() {
        lines.push("# Setup paths".to_string());
        for prepend in overlay.prepends() {
            let joined = prepend.entries.join(&prepend.separator);
            lines.push(format!(
                "export {name}={value}\"${{{name}:+{sep}${name}}}\"",
                name = prepend.variable,
                value = shell_words::quote(&joined),
                sep = prepend.separator,
            ));
        }
        lines.push(String::new());
    }

    let line = if shell {
        command.to_string()
    } else {
        shell_words::split(command)
            .map(shell_words::join)
            .unwrap_or_else(|_| command.to_string())
    };
    lines.push(line);
    lines.push(SEPARATOR.to_string());
    lines.join("\n")
}

/// Batch file form. Commands always go through the interpreter there.
pub fn render_batch(command: &str, overlay: &EnvOverlay, _shell: bool) -> String {
    let mut lines = vec![SEPARATOR.to_string(), "@echo off".to_string(), String::new()];

    if !overlay.vars().is_empty() {
        lines.push("REM Setup environment variables".to_string());
        for (name, value) in overlay.vars() {
            lines.push(format!("set \"{}={}\"", name, value));
        }
        lines.push(String::new());
    }

    if !overlay.prepends().is_empty() {
        lines.push("REM Setup paths".to_string());
        for prepend in overlay.prepends() {
            let joined = prepend.entries.join(&prepend.separator);
            lines.push(format!(
                "set \"{name}={joined}{sep}%{name}%\"",
                name = prepend.variable,
                sep = prepend.separator,
            ));
        }
        lines.push(String::new());
    }

    lines.push("@echo on".to_string());
    lines.push(format!("call {}", command));
    lines.push(SEPARATOR.to_string());
    lines.join("\n")
}

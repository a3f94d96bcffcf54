//! Built-in commands of the `dush` binary.
//!
//! Each command runs through the process executor with the defaults taken
//! from the settings file, so `dush` doubles as a way to try a command line
//! exactly as a project tool would run it.


use crate::error::{DushError, Result};
use crate::exec::{self, InputPolicy, script};
use crate::framework::{ArgSchema, CommandRegistry, CommandSpec, Invocation};
use crate::paths;
use std::time::Duration;

/// Registry with every built-in command, in help order.
pub fn builtin_registry() -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new();

    registry.register_named(CommandSpec::new("exec", cmd_exec).args(ArgSchema::new().variadic("command")))?;
    registry.register_named(
        CommandSpec::new("run", cmd_run).args(
            ArgSchema::new()
                .required("command")
                .optional("timeout", "0")
                .optional("shell", "0")
                .optional("ignore_error", "0"),
        ),
    )?;
    registry.register_named(CommandSpec::new("script", cmd_script).args(ArgSchema::new().required("command")))?;
    registry.register_named(
        CommandSpec::new("make", cmd_make).args(
            ArgSchema::new()
                .optional("target", "")
                .optional("directory", "")
                .optional("jobs", "0")
                .optional("verbose", "0"),
        ),
    )?;
    registry.register_named(CommandSpec::new("workspace", cmd_workspace))?;

    Ok(registry)
}

/// Run the given tokens as one command, with the terminal attached.
fn cmd_exec(invocation: &Invocation) -> Result<()> {
    let tokens = invocation.args.rest();
    if tokens.is_empty() {
        return Err(DushError::InvalidOptions("no command given".to_string()));
    }

    let command = shell_words::join(tokens);
    let options = invocation.settings.process_options().stdin(InputPolicy::Inherit);
    exec::execute(&command, options)?;
    Ok(())
}

fn cmd_run(invocation: &Invocation) -> Result<()> {
    let args = &invocation.args;
    let command = args.get("command");
    let timeout = args.int("timeout")?;
    if timeout < 0 {
        return Err(DushError::InvalidOptions(format!(
            "timeout must not be negative (got {})",
            timeout
        )));
    }
    let ignore_error = args.flag("ignore_error")?;

    let mut options = invocation.settings.process_options().ignore_error(ignore_error);
    if args.flag("shell")? {
        options = options.shell(true);
    }
    if timeout > 0 {
        options = options.timeout(Duration::from_secs(timeout.unsigned_abs()));
    }

    let result = exec::execute(command, options)?;
    if !result.is_success() {
        println!("Command {}: {}", result.status, command);
    }
    Ok(())
}

fn cmd_script(invocation: &Invocation) -> Result<()> {
    let settings = &invocation.settings;
    println!(
        "{}",
        script::render(invocation.args.get("command"), &settings.overlay(), settings.shell)
    );
    Ok(())
}

/// `make TARGET -jN`; `jobs = 0` uses every available core.
pub fn make_command(target: &str, jobs: usize) -> String {
    let mut command = String::from("make");
    if !target.is_empty() {
        command.push(' ');
        command.push_str(&shell_words::quote(target));
    }
    command.push_str(&format!(" -j{}", jobs));
    command
}

fn cmd_make(invocation: &Invocation) -> Result<()> {
    let args = &invocation.args;
    let jobs = match args.int("jobs")? {
        n if n > 0 => usize::try_from(n).unwrap_or(1),
        0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
        n => {
            return Err(DushError::InvalidOptions(format!(
                "jobs must not be negative (got {})",
                n
            )));
        }
    };

    let mut options = invocation.settings.process_options();
    if args.flag("verbose")? {
        options = options.env("VERBOSE", "1");
    }
    let directory = args.get("directory");
    if !directory.is_empty() {
        options = options.cwd(directory);
    }

    exec::execute(&make_command(args.get("target"), jobs), options)?;
    Ok(())
}

/// Print the workspace directory, or the forced project directory inside it.
fn cmd_workspace(invocation: &Invocation) -> Result<()> {
    let workspace = paths::workspace()?;
    let dir = match &invocation.flags.project_dir_force {
        Some(project) => workspace.join(project),
        None => workspace,
    };
    println!("{}", dir.display());
    Ok(())
}

//! Command framework: registry, command-line parsing and the dispatcher.
//!
//! A tool builds a [`CommandRegistry`], hands it to [`Framework`] and calls
//! [`Framework::main`]. The dispatcher parses the command line, resolves
//! the command, runs it and prints a one-line summary with timings. It is
//! the only place where errors become exit codes.

pub mod args;
pub mod bind;
pub mod help;
pub mod registry;

#[cfg(test)]
mod tests;

pub use args::{FrameworkFlags, ParsedArguments, parse};
pub use bind::BoundArgs;
pub use registry::{ArgSchema, CommandRegistry, CommandSpec, MAIN_COMMAND_NAME, Param, RegistryMode};

use crate::config::Settings;
use crate::error::{DushError, Result};
use crate::exec::function::panic_message;
use crate::exit_codes;
use crate::{interrupt, logging};
use chrono::{DateTime, Local, Timelike};
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

/// Everything a command body receives.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub args: BoundArgs,
    pub flags: FrameworkFlags,
    pub settings: Settings,
}

/// How one run ended, as printed in the summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error(String),
    Interrupted,
}

impl Outcome {
    pub fn label(&self) -> String {
        match self {
            Outcome::Success => "SUCCESS".to_string(),
            Outcome::Error(message) => format!("ERROR: {}", message),
            Outcome::Interrupted => "INTERRUPT (Ctrl+C detected)".to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => exit_codes::SUCCESS,
            Outcome::Error(_) => exit_codes::FAILURE,
            Outcome::Interrupted => exit_codes::INTERRUPTED,
        }
    }
}

/// Summary line printed after a command ran. Times are truncated to whole
/// seconds before the duration is computed.
pub fn summary_line(outcome: &Outcome, begin: DateTime<Local>, end: DateTime<Local>) -> String {
    let begin = begin.with_nanosecond(0).unwrap_or(begin);
    let end = end.with_nanosecond(0).unwrap_or(end);
    let secs = (end - begin).num_seconds().max(0);

    format!(
        "\n{}   startTime={} endTime={} executionTime={}:{:02}:{:02}",
        outcome.label(),
        begin.format("%H:%M:%S"),
        end.format("%H:%M:%S"),
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    )
}

/// The dispatcher.
pub struct Framework {
    registry: CommandRegistry,
}

impl Framework {
    pub fn new(registry: CommandRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run with the real command line and exit code.
    pub fn main(mut self) -> ExitCode {
        let argv: Vec<String> = std::env::args().collect();
        let code = self.run(&argv);
        ExitCode::from(u8::try_from(code).unwrap_or(1))
    }

    /// Run one command line and return the exit code.
    pub fn run(&mut self, argv: &[String]) -> i32 {
        if let Err(e) = self.insert_framework_commands() {
            eprintln!("ERROR: {}", e);
            return exit_codes::FAILURE;
        }

        let process_name = argv.first().map(String::as_str).unwrap_or("dush");
        let parsed = match parse(argv, &self.registry) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("ERROR: {}", e);
                println!("{}", help::render(process_name, &self.registry, None));
                return exit_codes::FAILURE;
            }
        };

        logging::init(&parsed.flags);

        let Some(command) = self.registry.get(&parsed.command_name) else {
            println!("ERROR: Command \"{}\" not found!", parsed.command_name);
            println!("{}", help::render(process_name, &self.registry, None));
            return exit_codes::FAILURE;
        };

        if parsed.flags.help {
            println!("{}", help::render(process_name, &self.registry, Some(command)));
            return exit_codes::SUCCESS;
        }

        let settings = match Settings::locate_and_load() {
            Ok(settings) => settings,
            Err(e) => {
                println!("ERROR: {}", e);
                return exit_codes::FAILURE;
            }
        };

        if let Err(e) = interrupt::install() {
            tracing::warn!(error = %e, "Ctrl+C handling unavailable");
        }

        interrupt::reset();
        let begin = Local::now();
        let result = invoke(command, &parsed, settings);
        let end = Local::now();

        let outcome = match &result {
            Ok(()) if interrupt::is_requested() => Outcome::Interrupted,
            Ok(()) => Outcome::Success,
            Err(e) if e.exit_code() == exit_codes::INTERRUPTED || interrupt::is_requested() => {
                Outcome::Interrupted
            }
            Err(e) => Outcome::Error(e.to_string()),
        };

        if let Err(e) = &result
            && parsed.flags.verbose
        {
            eprintln!("{}", e.diagnostics());
        }
        if !parsed.flags.quiet {
            println!("{}", summary_line(&outcome, begin, end));
        }
        outcome.exit_code()
    }

    /// Add the built-in `list` command in multiple mode.
    fn insert_framework_commands(&mut self) -> Result<()> {
        if self.registry.mode() != RegistryMode::Multiple {
            return Ok(());
        }

        let mut names: Vec<String> = self.registry.list().iter().map(|s| s.to_string()).collect();
        if !names.iter().any(|n| n == "list") {
            names.push("list".to_string());
        }
        self.registry.register_named(CommandSpec::new("list", move |_| {
            println!("{}", names.join(" "));
            Ok(())
        }))
    }
}

/// Bind the arguments and call the command, turning a panic into an error.
fn invoke(command: &CommandSpec, parsed: &ParsedArguments, settings: Settings) -> Result<()> {
    let args = command.schema().bind(&parsed.positional, &parsed.keyword)?;
    let invocation = Invocation {
        name: parsed.command_name.clone(),
        args,
        flags: parsed.flags.clone(),
        settings,
    };

    tracing::debug!(command = %invocation.name, "invoking command");
    match panic::catch_unwind(AssertUnwindSafe(|| command.invoke(&invocation))) {
        Ok(result) => result,
        Err(payload) => Err(DushError::Other(anyhow::anyhow!(
            "command panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

//! The `dush` CLI.
//!
//! Registers the built-in commands and hands the command line to the
//! dispatcher, which prints the summary and picks the exit code.

use dush::commands::builtin_registry;
use dush::exit_codes;
use dush::framework::Framework;
use std::process::ExitCode;

fn main() -> ExitCode {
    match builtin_registry() {
        Ok(registry) => Framework::new(registry).main(),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

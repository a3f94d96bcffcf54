//! Dush: build orchestration helpers for project tools.
//!
//! The library gives project tools two things:
//!
//! - [`exec`]: run external processes and in-process functions under one
//!   contract (environment overlay, working directory, stream routing,
//!   timeout, structured errors)
//! - [`framework`]: declare commands, parse the command line and dispatch
//!   with a uniform summary and exit code
//!
//! A minimal tool:
//!
//! ```no_run
//! use dush::exec::{execute, ProcessOptions};
//! use dush::framework::{ArgSchema, CommandRegistry, CommandSpec, Framework};
//!
//! fn main() -> std::process::ExitCode {
//!     let mut registry = CommandRegistry::new();
//!     let build = CommandSpec::new("build", |inv| {
//!         let target = inv.args.get("target");
//!         execute(&format!("make {}", target), inv.settings.process_options())?;
//!         Ok(())
//!     })
//!     .args(ArgSchema::new().optional("target", "all"));
//!
//!     if let Err(e) = registry.register_named(build) {
//!         eprintln!("Error: {}", e);
//!         return std::process::ExitCode::FAILURE;
//!     }
//!     Framework::new(registry).main()
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod exit_codes;
pub mod framework;
pub mod interrupt;
pub mod logging;
pub mod paths;

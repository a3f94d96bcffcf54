//! Exit code constants for dush-based tools.
//!
//! - 0: Success (including a help request)
//! - 1: Failure (bad arguments, unknown command, failed command)
//! - 2: User interrupt (Ctrl+C)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any failure: parse error, unknown command, or an error raised by the command.
pub const FAILURE: i32 = 1;

/// The user interrupted the running command.
pub const INTERRUPTED: i32 = 2;

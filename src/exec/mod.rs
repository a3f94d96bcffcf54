//! Execution primitives.
//!
//! Two ways to run work, one contract: [`execute`] spawns an external
//! process, [`execute_function`] calls an in-process function. Both take a
//! working directory, an environment overlay and stream routing policies,
//! and both return a [`CommandResult`] or a structured error.

pub mod env;
pub mod function;
pub mod policy;
pub mod process;
pub mod result;
pub mod script;
pub(crate) mod state;
pub mod workdir;

pub use env::{EnvOverlay, ScopedEnv};
pub use function::{FunctionOptions, execute_function};
pub use policy::{InputPolicy, OutputPolicy, StreamPlan};
pub use process::{ProcessOptions, execute, run_simple};
pub use result::{CommandResult, Status};
pub use workdir::WorkingDirGuard;

//! Routing policies for the standard streams of one invocation.
//!
//! The same vocabulary is used by the process and the function executor.

use std::fs::File;

/// What to do with standard output or standard error.
#[derive(Debug)]
pub enum OutputPolicy {
    /// Do not show it. The output is still buffered so that it can be
    /// attached to the error if the invocation fails.
    Discard,
    /// Buffer it and return it in the result.
    Capture,
    /// Write it straight to the console.
    PrintToConsole,
    /// Write it straight to the given file.
    PrintToSink(File),
}

/// How a stream is wired once its policy has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPlan {
    /// Connected directly to the console or a sink; nothing is buffered.
    Direct,
    /// Buffered in memory. `keep` decides whether the text is returned on
    /// success; on failure it is always surfaced.
    Buffer { keep: bool },
}

impl OutputPolicy {
    pub fn plan(&self) -> StreamPlan {
        match self {
            OutputPolicy::Discard => StreamPlan::Buffer { keep: false },
            OutputPolicy::Capture => StreamPlan::Buffer { keep: true },
            OutputPolicy::PrintToConsole | OutputPolicy::PrintToSink(_) => StreamPlan::Direct,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputPolicy::Discard => "discard",
            OutputPolicy::Capture => "capture",
            OutputPolicy::PrintToConsole => "console",
            OutputPolicy::PrintToSink(_) => "sink",
        }
    }
}

/// What the invocation reads on standard input.
#[derive(Debug)]
pub enum InputPolicy {
    /// Empty input.
    Discard,
    /// The parent's standard input.
    Inherit,
    /// The given text, then end of input.
    Text(String),
    /// The contents of the given file.
    Source(File),
}

impl InputPolicy {
    pub fn is_inherit(&self) -> bool {
        matches!(self, InputPolicy::Inherit)
    }
}

/// Keep the buffered text only when the plan or the outcome asks for it.
pub(crate) fn surface(plan: StreamPlan, failed: bool, text: Option<String>) -> Option<String> {
    match plan {
        StreamPlan::Direct => None,
        StreamPlan::Buffer { keep } if keep || failed => text,
        StreamPlan::Buffer { .. } => None,
    }
}

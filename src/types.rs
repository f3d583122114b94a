use std::borrow::Cow;
use std::fmt;

use crate::errors::CommandError;

/// Exit code reported when no exit status is known (spawn failure, death by
/// signal, cancellation).
pub const EXIT_CODE_UNSET: i32 = -1;

/// Identity of one of the child's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    Input,
    Output,
    Error,
}

impl StreamId {
    pub(crate) fn index(self) -> usize {
        match self {
            StreamId::Input => 0,
            StreamId::Output => 1,
            StreamId::Error => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StreamId::Input => "stdin",
            StreamId::Output => "stdout",
            StreamId::Error => "stderr",
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single terminal value delivered for an invocation.
#[derive(Debug)]
pub struct CommandResult {
    pub exit_code: i32,
    /// Combined stdout and stderr, each stream in receipt order.
    pub output: Vec<u8>,
    pub error: Option<CommandError>,
}

impl CommandResult {
    pub fn failed(error: CommandError) -> Self {
        Self {
            exit_code: EXIT_CODE_UNSET,
            output: Vec::new(),
            error: Some(error),
        }
    }

    /// Result that never involved a process, e.g. a skipped known command.
    pub fn synthetic(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: message.into().into_bytes(),
            error: None,
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.exit_code == 0
    }

    pub fn output_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

// src/errors.rs

//! Crate-wide error types.
//!
//! - [`RealmError`] covers loading settings and the CLI surface.
//! - [`CommandError`] is the operation-level error carried by a
//!   [`CommandResult`](crate::types::CommandResult).
//! - [`FormatError`] is returned by the safe formatter.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RealmError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RealmError>;

/// Terminal error of a single command invocation.
///
/// Stream-level I/O failures never show up here; they only close the
/// affected stream and are reported on the diagnostics sink.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The OS could not create the process.
    #[error("couldn't run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The child was killed by a signal we did not send.
    #[error("Process was terminated with signal: {0}")]
    Signaled(i32),

    #[error("The operation was cancelled")]
    Cancelled,

    /// Waiting for the child's exit status failed.
    #[error("couldn't wait for process: {0}")]
    Wait(#[source] io::Error),

    /// The task driving the invocation went away without delivering.
    #[error("command runner stopped before the command completed")]
    Abandoned,
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled)
    }
}

/// Rejection of a template by the safe formatter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Truncated or malformed conversion starting at this byte offset.
    #[error("malformed conversion at byte {0}")]
    Malformed(usize),

    #[error("unsupported conversion: %{0}")]
    UnsupportedConversion(char),

    /// Positional index of zero or beyond the supplied arguments.
    #[error("invalid argument position: {0}")]
    InvalidPosition(usize),

    /// A second conversion referring to an already used argument.
    #[error("argument position {0} is used more than once")]
    DuplicatePosition(usize),

    /// 1-based index of the first argument no conversion refers to.
    #[error("argument {0} is never used by the template")]
    UnusedArgument(usize),
}

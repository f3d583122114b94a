// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`invocation`] describes one command to run.
//! - [`core`] is the pure per-invocation state machine: stream book-keeping,
//!   exit tracking, cancellation and the completion gate.
//! - [`runner`] is the async shell that spawns the child and drives the
//!   state machine from a Tokio task; `spawn` prepares the child.
//! - [`known`] runs commands configured by name.
//! - [`diagnostics`] is where output and lifecycle notes are reported.
//! - [`deadline`] turns timeouts into cancellation.

pub mod core;
pub mod deadline;
pub mod diagnostics;
pub mod invocation;
pub mod known;
pub mod runner;
mod spawn;

pub use deadline::{Deadline, cancel_after};
pub use diagnostics::{DiagnosticsSink, NullSink, TracingSink};
pub use invocation::CommandInvocation;
pub use known::{
    CommandStore, EXIT_COMMAND_NOT_FOUND, KnownCommand, KnownCommandRunner, resolve_known_command,
};
pub use runner::{PendingCommand, ProcessRunner, RunnerOptions};

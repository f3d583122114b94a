// src/exec/known.rs

//! Running commands configured by name.
//!
//! A known command is one shell-syntax string looked up in a
//! [`CommandStore`]. Missing or unparsable entries don't fail; they produce
//! a result with exit code 127, like a shell that can't find a command, so
//! callers branch on exit codes only. A whitespace-only entry means the
//! step is deliberately disabled and succeeds without spawning anything.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::exec::diagnostics::DiagnosticsSink;
use crate::exec::invocation::CommandInvocation;
use crate::exec::runner::{PendingCommand, ProcessRunner};
use crate::types::CommandResult;

/// Exit code for a configured command that is missing or invalid.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Lookup of configured command lines by name.
pub trait CommandStore: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

impl CommandStore for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl CommandStore for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: CommandStore + ?Sized> CommandStore for Arc<S> {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// What a known command name resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownCommand {
    /// Run this argument vector.
    Run(Vec<String>),
    /// Don't run anything; report this instead.
    Synthetic { exit_code: i32, message: String },
}

/// Resolve `name` through `store` without running anything.
pub fn resolve_known_command(store: &dyn CommandStore, name: &str) -> KnownCommand {
    let Some(command_line) = store.lookup(name) else {
        warn!(command = name, "Configured command not found");
        return KnownCommand::Synthetic {
            exit_code: EXIT_COMMAND_NOT_FOUND,
            message: format!("Configured command not found: {name}"),
        };
    };

    if command_line.bytes().all(|b| b.is_ascii_whitespace()) {
        debug!(command = name, "configured command is empty; skipping");
        return KnownCommand::Synthetic {
            exit_code: 0,
            message: format!("Skipped command: {name}"),
        };
    }

    match shell_words::split(&command_line) {
        Ok(argv) if !argv.is_empty() => KnownCommand::Run(argv),
        Ok(_) => invalid(&command_line, "no words"),
        Err(err) => invalid(&command_line, &err.to_string()),
    }
}

fn invalid(command_line: &str, reason: &str) -> KnownCommand {
    warn!(command_line, reason, "Couldn't parse the command line");
    KnownCommand::Synthetic {
        exit_code: EXIT_COMMAND_NOT_FOUND,
        message: format!("Configured command invalid: {command_line}"),
    }
}

/// Runs named commands from a [`CommandStore`] through a [`ProcessRunner`].
pub struct KnownCommandRunner<S> {
    store: S,
    runner: ProcessRunner,
}

impl<S: CommandStore> KnownCommandRunner<S> {
    pub fn new(store: S, runner: ProcessRunner) -> Self {
        Self { store, runner }
    }

    /// Run the command configured as `name`.
    ///
    /// Always returns a pending handle; synthetic results are delivered from
    /// a separate task just like real ones. No stdin is provided.
    pub fn run(
        &self,
        name: &str,
        env: BTreeMap<String, String>,
        cancel: CancellationToken,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> PendingCommand {
        match resolve_known_command(&self.store, name) {
            KnownCommand::Run(argv) => {
                let invocation = CommandInvocation::new(argv)
                    .envs(env)
                    .cancel_token(cancel)
                    .diagnostics(sink);
                self.runner.start(invocation)
            }
            KnownCommand::Synthetic { exit_code, message } => {
                sink.note(None, &message);
                PendingCommand::deliver_later(CommandResult::synthetic(exit_code, message))
            }
        }
    }
}

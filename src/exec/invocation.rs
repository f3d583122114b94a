// src/exec/invocation.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::exec::diagnostics::{DiagnosticsSink, TracingSink};
use crate::secret::PasswordPayload;

/// Everything needed to run one external command.
///
/// Built with the consuming setters below, then handed to
/// [`ProcessRunner::start`](crate::exec::ProcessRunner::start).
#[derive(Clone)]
pub struct CommandInvocation {
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    input: Option<Bytes>,
    cancel: CancellationToken,
    sink: Arc<dyn DiagnosticsSink>,
}

impl CommandInvocation {
    /// `argv[0]` is the program to execute.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            input: None,
            cancel: CancellationToken::new(),
            sink: Arc::new(TracingSink::new()),
        }
    }

    /// Override an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: BTreeMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Bytes written to the child's stdin before it is closed.
    pub fn input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Feed a secret on stdin; it is wiped once the invocation is done with it.
    pub fn password(self, payload: PasswordPayload) -> Self {
        self.input(payload.into_bytes())
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Command line as shown in diagnostics: overrides first, then argv.
    pub fn display_line(&self) -> String {
        self.env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .chain(self.argv.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn into_parts(self) -> InvocationParts {
        InvocationParts {
            argv: self.argv,
            env: self.env,
            input: self.input,
            cancel: self.cancel,
            sink: self.sink,
        }
    }
}

impl fmt::Debug for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInvocation")
            .field("argv", &self.argv)
            .field("env", &self.env)
            .field("input_len", &self.input.as_ref().map(Bytes::len))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

pub(crate) struct InvocationParts {
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub input: Option<Bytes>,
    pub cancel: CancellationToken,
    pub sink: Arc<dyn DiagnosticsSink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_line_puts_env_first() {
        let inv = CommandInvocation::new(["net", "ads", "join"])
            .env("LANG", "C")
            .env("KRB5CCNAME", "MEMORY:");
        assert_eq!(inv.display_line(), "KRB5CCNAME=MEMORY: LANG=C net ads join");
    }

    #[test]
    fn debug_does_not_print_input() {
        let inv = CommandInvocation::new(["cat"]).password(PasswordPayload::build(b"topsecret"));
        let shown = format!("{inv:?}");
        assert!(!shown.contains("topsecret"));
        assert!(shown.contains("input_len: Some(10)"));
    }
}

// src/exec/diagnostics.rs

//! Where a running command reports its output and lifecycle notes.

use tracing::{debug, info};

use crate::types::StreamId;

/// Receiver for raw child output and lifecycle annotations.
///
/// Implementations are shared between concurrently running invocations and
/// must not block. There is no acknowledgement or backpressure.
pub trait DiagnosticsSink: Send + Sync {
    /// A chunk of raw output, in receipt order for that stream.
    fn write(&self, stream: StreamId, chunk: &[u8]);

    /// A lifecycle or error annotation; `None` for notes about the whole
    /// invocation rather than one stream.
    fn note(&self, stream: Option<StreamId>, message: &str);
}

/// Default sink: forwards everything to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    label: Option<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with `label` (e.g. the operation being performed).
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }

    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("-")
    }
}

impl DiagnosticsSink for TracingSink {
    fn write(&self, stream: StreamId, chunk: &[u8]) {
        debug!(
            target: "realm_command::diagnostics",
            label = self.label(),
            %stream,
            data = %String::from_utf8_lossy(chunk).trim_end(),
            "child output"
        );
    }

    fn note(&self, stream: Option<StreamId>, message: &str) {
        match stream {
            Some(stream) => info!(
                target: "realm_command::diagnostics",
                label = self.label(),
                %stream,
                "{message}"
            ),
            None => info!(target: "realm_command::diagnostics", label = self.label(), "{message}"),
        }
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn write(&self, _stream: StreamId, _chunk: &[u8]) {}

    fn note(&self, _stream: Option<StreamId>, _message: &str) {}
}

//! Recording diagnostics sink.

use std::sync::{Arc, Mutex};

use realm_command::exec::DiagnosticsSink;
use realm_command::types::StreamId;

/// One call made on a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Write(StreamId, Vec<u8>),
    Note(Option<StreamId>, String),
}

/// Sink that keeps every write and note in call order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    /// Concatenation of every chunk written for `stream`.
    pub fn stream_bytes(&self, stream: StreamId) -> Vec<u8> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|ev| match ev {
                Recorded::Write(s, chunk) if *s == stream => Some(chunk.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn notes(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|ev| match ev {
                Recorded::Note(_, msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notes_for(&self, stream: Option<StreamId>) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|ev| match ev {
                Recorded::Note(s, msg) if *s == stream => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_note_containing(&self, needle: &str) -> bool {
        self.notes().iter().any(|n| n.contains(needle))
    }
}

impl DiagnosticsSink for MemorySink {
    fn write(&self, stream: StreamId, chunk: &[u8]) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Write(stream, chunk.to_vec()));
    }

    fn note(&self, stream: Option<StreamId>, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Note(stream, message.to_string()));
    }
}

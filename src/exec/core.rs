// src/exec/core.rs

//! Pure per-invocation state machine.
//!
//! [`RunState`] owns all book-keeping for one running command and reacts to
//! stream and process events fed to it by the async shell in
//! [`runner`](crate::exec::runner). It performs no IO of its own besides
//! reporting to the diagnostics sink, so it can be driven event by event in
//! unit tests.
//!
//! The shell asks the state which streams are still open after every event
//! and drops the pipes that were closed. The result is ready once
//! [`RunState::is_done`] holds: every stream closed and the child reaped.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::CommandError;
use crate::exec::diagnostics::DiagnosticsSink;
use crate::types::{CommandResult, EXIT_CODE_UNSET, StreamId};

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    Signal(i32),
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => ChildExit::Code(code),
            (None, Some(signal)) => ChildExit::Signal(signal),
            (None, None) => ChildExit::Code(EXIT_CODE_UNSET),
        }
    }
}

pub struct RunState {
    input: Option<Bytes>,
    input_offset: usize,
    output: Vec<u8>,
    exit_code: i32,
    reaped: bool,
    cancelled: bool,
    error: Option<CommandError>,
    open: [bool; 3],
    sink: Arc<dyn DiagnosticsSink>,
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

impl RunState {
    /// Fresh state with all three streams open and the child running.
    ///
    /// An absent or empty `input` closes stdin straight away.
    pub fn new(input: Option<Bytes>, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let mut state = Self {
            input: input.filter(|bytes| !bytes.is_empty()),
            input_offset: 0,
            output: Vec::with_capacity(128),
            exit_code: EXIT_CODE_UNSET,
            reaped: false,
            cancelled: false,
            error: None,
            open: [true; 3],
            sink,
        };
        if state.input.is_none() {
            state.close(StreamId::Input);
        }
        state
    }

    pub fn is_open(&self, stream: StreamId) -> bool {
        self.open[stream.index()]
    }

    pub fn is_reaped(&self) -> bool {
        self.reaped
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Completion gate: all streams closed and the exit status known.
    pub fn is_done(&self) -> bool {
        self.reaped && self.open.iter().all(|open| !open)
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// The part of the input payload not yet written.
    pub fn pending_input(&self) -> Option<&[u8]> {
        let input = self.input.as_ref()?;
        input.get(self.input_offset..).filter(|rest| !rest.is_empty())
    }

    pub fn input_written(&mut self, written: usize) {
        self.input_offset += written;
        if self.pending_input().is_none() {
            debug!(bytes = self.input_offset, "input fully written");
            self.close(StreamId::Input);
        }
    }

    pub fn input_failed(&mut self, err: &io::Error) {
        if is_transient(err) {
            return;
        }

        // The child going away after we asked it to is expected.
        if !(self.cancelled && err.kind() == io::ErrorKind::BrokenPipe) {
            let message = format!("couldn't write output data to process: {err}");
            warn!(error = %err, "couldn't write output data to process");
            self.sink.note(Some(StreamId::Input), &message);
        }
        self.close(StreamId::Input);
    }

    /// A chunk arrived on stdout or stderr.
    pub fn output_read(&mut self, stream: StreamId, chunk: &[u8]) {
        self.sink.write(stream, chunk);
        self.output.extend_from_slice(chunk);
    }

    pub fn read_failed(&mut self, stream: StreamId, err: &io::Error) {
        if is_transient(err) {
            return;
        }

        let what = match stream {
            StreamId::Error => "error",
            _ => "output",
        };
        let message = format!("couldn't read {what} data from process: {err}");
        warn!(%stream, error = %err, "couldn't read {what} data from process");
        self.sink.note(Some(stream), &message);
        self.close(stream);
    }

    /// End of stream.
    pub fn hangup(&mut self, stream: StreamId) {
        self.close(stream);
    }

    pub fn exited(&mut self, exit: ChildExit) {
        self.reaped = true;
        match exit {
            ChildExit::Code(code) => {
                debug!(exit_code = code, "process exited");
                self.exit_code = code;
            }
            ChildExit::Signal(signal) => {
                debug!(signal, cancelled = self.cancelled, "process killed by signal");
                if !self.cancelled {
                    let err = CommandError::Signaled(signal);
                    self.sink.note(None, &err.to_string());
                    self.error = Some(err);
                }
            }
        }
    }

    /// Waiting for the child failed; treat it as gone.
    pub fn wait_failed(&mut self, err: io::Error) {
        self.reaped = true;
        warn!(error = %err, "couldn't wait for process");
        if !self.cancelled {
            self.error = Some(CommandError::Wait(err));
        }
    }

    /// Record cancellation.
    ///
    /// Returns true the first time only, and only while the child still
    /// runs, i.e. when the shell should signal it.
    pub fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        self.error = Some(CommandError::Cancelled);
        self.sink.note(None, "The operation was cancelled");
        !self.reaped
    }

    /// Consume the state into the terminal result.
    ///
    /// The input payload has normally been released by closing stdin already;
    /// whatever is left is dropped with the state.
    pub fn finish(self) -> CommandResult {
        CommandResult {
            exit_code: self.exit_code,
            output: self.output,
            error: self.error,
        }
    }

    fn close(&mut self, stream: StreamId) {
        if self.open[stream.index()] {
            debug!(%stream, "closing stream");
            self.open[stream.index()] = false;
        }
        if stream == StreamId::Input {
            self.input = None;
        }
    }
}

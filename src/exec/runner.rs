// src/exec/runner.rs

//! Async shell around [`RunState`].
//!
//! One Tokio task drives each invocation. The task owns the child and its
//! pipes and multiplexes, with `tokio::select!`:
//! - writing pending input to stdin
//! - reading stdout and stderr
//! - waiting for the child to exit
//! - the invocation's cancellation token
//!
//! Every event is fed into the pure state machine; pipes the state reports
//! as closed are dropped straight away. The loop ends once the state's
//! completion gate opens, and the result is sent to the [`PendingCommand`].

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::CommandError;
use crate::exec::core::{ChildExit, RunState};
use crate::exec::invocation::CommandInvocation;
use crate::exec::spawn::spawn_child;
use crate::types::{CommandResult, StreamId};

/// Tunables for [`ProcessRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Maximum bytes taken from stdout or stderr per read.
    pub read_chunk_size: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            read_chunk_size: 1024,
        }
    }
}

/// Starts external commands and tracks them to completion.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    options: RunnerOptions,
}

impl ProcessRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    /// Spawn the invocation's command and return immediately.
    ///
    /// Must be called from within a Tokio runtime. The returned handle
    /// resolves exactly once, after the child has exited and all of its
    /// streams are closed, or with a spawn error if it never started.
    pub fn start(&self, invocation: CommandInvocation) -> PendingCommand {
        let command_line = invocation.display_line();
        let parts = invocation.into_parts();
        parts.sink.note(None, &command_line);

        let child = match spawn_child(&parts.argv, &parts.env) {
            Ok(child) => child,
            Err(err) => {
                warn!(command = %command_line, error = %err, "couldn't start process");
                return PendingCommand::deliver_later(CommandResult::failed(err));
            }
        };

        let pid = child.id();
        info!(pid, command = %command_line, "process started");

        let (tx, rx) = oneshot::channel();
        let state = RunState::new(parts.input, parts.sink);
        let chunk = self.options.read_chunk_size.max(1);
        tokio::spawn(async move {
            let result = drive(child, state, parts.cancel, chunk).await;
            debug!(pid, exit_code = result.exit_code, "delivering result");
            let _ = tx.send(result);
        });

        PendingCommand { pid, rx }
    }
}

/// Handle to a started command; resolves to its [`CommandResult`].
#[derive(Debug)]
pub struct PendingCommand {
    pid: Option<u32>,
    rx: oneshot::Receiver<CommandResult>,
}

impl PendingCommand {
    /// Deliver an already known result from a separate task, so it never
    /// arrives re-entrantly from the caller's own stack.
    pub(crate) fn deliver_later(result: CommandResult) -> Self {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(result);
        });
        Self { pid: None, rx }
    }

    /// Process id of the child, if one was spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl Future for PendingCommand {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or_else(|_| CommandResult::failed(CommandError::Abandoned)))
    }
}

async fn drive(
    mut child: Child,
    mut state: RunState,
    cancel: CancellationToken,
    chunk: usize,
) -> CommandResult {
    let pid = child.id();
    let mut stdin = child.stdin.take();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = vec![0u8; chunk];
    let mut err_buf = vec![0u8; chunk];

    sync_streams(&state, &mut stdin, &mut stdout, &mut stderr);

    while !state.is_done() {
        tokio::select! {
            res = write_some(&mut stdin, state.pending_input()), if stdin.is_some() => {
                match res {
                    Ok(0) => state.input_failed(&io::Error::from(io::ErrorKind::WriteZero)),
                    Ok(n) => state.input_written(n),
                    Err(err) => state.input_failed(&err),
                }
            }
            res = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => {
                on_read(&mut state, StreamId::Output, res, &out_buf);
            }
            res = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => {
                on_read(&mut state, StreamId::Error, res, &err_buf);
            }
            status = child.wait(), if !state.is_reaped() => {
                match status {
                    Ok(status) => state.exited(ChildExit::from(status)),
                    Err(err) => state.wait_failed(err),
                }
            }
            _ = cancel.cancelled(), if !state.is_cancelled() => {
                debug!(pid, "process cancelled");
                if state.cancel() {
                    terminate(&child);
                }
            }
        }

        sync_streams(&state, &mut stdin, &mut stdout, &mut stderr);
    }

    state.finish()
}

fn on_read(state: &mut RunState, stream: StreamId, res: io::Result<usize>, buf: &[u8]) {
    match res {
        Ok(0) => state.hangup(stream),
        Ok(n) => state.output_read(stream, &buf[..n]),
        Err(err) => state.read_failed(stream, &err),
    }
}

/// Drop the pipes the state machine has closed.
fn sync_streams(
    state: &RunState,
    stdin: &mut Option<ChildStdin>,
    stdout: &mut Option<ChildStdout>,
    stderr: &mut Option<ChildStderr>,
) {
    if !state.is_open(StreamId::Input) {
        stdin.take();
    }
    if !state.is_open(StreamId::Output) {
        stdout.take();
    }
    if !state.is_open(StreamId::Error) {
        stderr.take();
    }
}

async fn write_some<W>(pipe: &mut Option<W>, data: Option<&[u8]>) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    match (pipe.as_mut(), data) {
        (Some(pipe), Some(data)) => pipe.write(data).await,
        _ => std::future::pending().await,
    }
}

async fn read_some<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe.as_mut() {
        Some(pipe) => pipe.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Ask the child to terminate. Best effort: it may already be exiting.
fn terminate(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // `id()` is `None` once the child has been reaped, so the pid can't
    // have been recycled.
    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };

    debug!(pid, "sending term signal to process");
    if let Err(errno) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!(pid, error = %errno, "couldn't signal process");
    }
}

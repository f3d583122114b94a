// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod format;
pub mod logging;
pub mod secret;
pub mod types;

use std::collections::BTreeMap;
use std::io::Write;
use std::os::fd::AsFd;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cli::{CliArgs, Command, ExecArgs};
use crate::config::{Settings, load_or_default};
use crate::exec::{
    CommandInvocation, Deadline, DiagnosticsSink, KnownCommandRunner, PendingCommand,
    ProcessRunner, TracingSink, cancel_after,
};
use crate::secret::PasswordPayload;
use crate::types::CommandResult;

/// Exit status used when the operation itself failed.
const EXIT_OPERATION_FAILED: i32 = 1;

/// High-level entry point used by `main.rs`.
///
/// Returns the exit status the process should terminate with.
///
/// This wires together:
/// - settings loading
/// - a cancellation token fed by Ctrl-C and the optional deadline
/// - the process runner (directly or through the known-command table)
pub async fn run(args: CliArgs) -> Result<i32> {
    let CliArgs {
        config,
        timeout,
        command,
        ..
    } = args;

    match command {
        Command::Format { template, args } => print_format(&template, &args),
        Command::Known { name } => {
            let session = Session::open(&config, timeout, TracingSink::labelled(name.as_str()))?;
            let known = KnownCommandRunner::new(session.settings.clone(), session.runner.clone());
            let pending = known.run(
                &name,
                BTreeMap::new(),
                session.cancel.clone(),
                session.sink.clone(),
            );
            session.finish(pending.await)
        }
        Command::Exec(exec) => {
            let session = Session::open(&config, timeout, TracingSink::new())?;
            let pending = start_exec(&session, exec).await?;
            session.finish(pending.await)
        }
    }
}

/// Everything one CLI invocation shares while its command runs.
struct Session {
    settings: Settings,
    runner: ProcessRunner,
    cancel: CancellationToken,
    sink: Arc<dyn DiagnosticsSink>,
    deadline: Option<Deadline>,
}

impl Session {
    fn open(config: &Path, timeout_secs: Option<u64>, sink: TracingSink) -> Result<Self> {
        let settings = load_or_default(config)
            .with_context(|| format!("failed to load settings from {}", config.display()))?;
        let runner = ProcessRunner::new(settings.runner_options());

        let cancel = CancellationToken::new();
        spawn_ctrl_c_listener(cancel.clone());

        let timeout = timeout_secs.map(Duration::from_secs).or(settings.timeout());
        let deadline = timeout.map(|after| {
            debug!(?after, "deadline armed");
            cancel_after(&cancel, after)
        });

        Ok(Self {
            settings,
            runner,
            cancel,
            sink: Arc::new(sink),
            deadline,
        })
    }

    fn finish(&self, result: CommandResult) -> Result<i32> {
        if self.deadline.as_ref().is_some_and(Deadline::expired) {
            warn!("command did not finish before the deadline");
        }
        report(result)
    }
}

async fn start_exec(session: &Session, exec: ExecArgs) -> Result<PendingCommand> {
    let mut invocation = CommandInvocation::new(exec.argv)
        .envs(exec.env.into_iter().collect())
        .cancel_token(session.cancel.clone())
        .diagnostics(session.sink.clone());

    if exec.password_stdin {
        let payload = read_password_line().await?;
        invocation = invocation.password(payload);
    }

    Ok(session.runner.start(invocation))
}

/// Read one line from our own stdin into a wiping payload.
///
/// Goes through a duplicate of fd 0 as a plain `File`, bypassing the
/// buffered `Stdin` handles, so no unwiped copy of the secret is left behind.
async fn read_password_line() -> Result<PasswordPayload> {
    let stdin = std::io::stdin()
        .as_fd()
        .try_clone_to_owned()
        .context("failed to duplicate stdin")?;

    let payload =
        tokio::task::spawn_blocking(move || PasswordPayload::read_line(std::fs::File::from(stdin)))
            .await
            .context("password reader task failed")?
            .context("failed to read password from stdin")?;
    Ok(payload)
}

fn spawn_ctrl_c_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; cancelling");
        cancel.cancel();
    });
}

fn report(result: CommandResult) -> Result<i32> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&result.output)?;
    stdout.flush()?;

    match result.error {
        Some(err) => {
            error!(error = %err, "command failed");
            Ok(EXIT_OPERATION_FAILED)
        }
        None => {
            debug!(exit_code = result.exit_code, "command finished");
            Ok(result.exit_code)
        }
    }
}

fn print_format(template: &str, args: &[String]) -> Result<i32> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let mut stdout = std::io::stdout().lock();
    let mut write_err = None;

    format::format_to_sink(template, &args, |chunk| {
        if write_err.is_some() {
            return;
        }
        if let Err(e) = stdout.write_all(chunk) {
            write_err = Some(e);
        }
    })
    .with_context(|| format!("invalid template '{template}'"))?;

    if let Some(e) = write_err {
        return Err(e.into());
    }
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(0)
}

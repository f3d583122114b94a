// src/exec/spawn.rs

//! Building and spawning the child process.
//!
//! The child:
//! - starts a new session, so it has no controlling terminal and prompts
//!   fall back to reading stdin;
//! - gets pipes for stdin, stdout and stderr;
//! - inherits no other descriptor: everything from 3 up is marked
//!   close-on-exec before the program image loads.

use std::collections::BTreeMap;
use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::warn;

use crate::errors::CommandError;

/// `CLOSE_RANGE_CLOEXEC` from `<linux/close_range.h>`.
#[cfg(target_os = "linux")]
const CLOSE_RANGE_CLOEXEC: libc::c_uint = 1 << 2;

/// Upper bound for the descriptor sweep when `close_range` is unavailable.
const MAX_SWEEP_FD: libc::c_long = 65536;

pub(crate) fn spawn_child(
    argv: &[String],
    env: &BTreeMap<String, String>,
) -> Result<Child, CommandError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(CommandError::Spawn {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (key, value) in env {
        if key.is_empty() || key.contains('=') {
            warn!(variable = %key, "invalid environment variable");
            continue;
        }
        cmd.env(key, value);
    }

    // SAFETY: the hook only makes async-signal-safe system calls.
    unsafe {
        cmd.pre_exec(prepare_child);
    }

    cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })
}

/// Runs in the forked child, after stdio is set up and before exec.
fn prepare_child() -> io::Result<()> {
    nix::unistd::setsid().map_err(io::Error::from)?;
    cloexec_inherited_descriptors();
    Ok(())
}

#[cfg(target_os = "linux")]
fn cloexec_inherited_descriptors() {
    // SAFETY: close_range only touches this process's descriptor table.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_close_range,
            3 as libc::c_uint,
            libc::c_uint::MAX,
            CLOSE_RANGE_CLOEXEC,
        )
    };
    if rc != 0 {
        sweep_descriptors();
    }
}

#[cfg(not(target_os = "linux"))]
fn cloexec_inherited_descriptors() {
    sweep_descriptors();
}

fn sweep_descriptors() {
    // SAFETY: sysconf and fcntl are async-signal-safe and fail harmlessly
    // on descriptors that aren't open.
    unsafe {
        let max = libc::sysconf(libc::_SC_OPEN_MAX);
        let max = if max <= 0 { 1024 } else { max.min(MAX_SWEEP_FD) };
        for fd in 3..max as libc::c_int {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            if flags >= 0 && flags & libc::FD_CLOEXEC == 0 {
                libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
            }
        }
    }
}

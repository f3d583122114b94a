// src/exec/deadline.rs

//! External timeouts expressed as cancellation.
//!
//! Runners only understand cancellation tokens. A deadline is a timer that
//! cancels the token it was given, and remembers that it did so, so the
//! caller can tell a timeout apart from any other cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Timer armed by [`cancel_after`]; disarmed when dropped.
#[derive(Debug)]
pub struct Deadline {
    fired: Arc<AtomicBool>,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// Whether the timer fired and cancelled the token.
    pub fn expired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Cancel `token` once `after` has elapsed, unless the returned
/// [`Deadline`] is dropped first.
pub fn cancel_after(token: &CancellationToken, after: Duration) -> Deadline {
    let fired = Arc::new(AtomicBool::new(false));
    let timer = {
        let token = token.clone();
        let fired = Arc::clone(&fired);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => {
                    info!(timeout = ?after, "deadline reached; cancelling");
                    fired.store(true, Ordering::SeqCst);
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        })
    };

    Deadline { fired, timer }
}

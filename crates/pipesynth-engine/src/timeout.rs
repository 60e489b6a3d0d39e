//! Wall-clock limit on a CEGIS run.
//!
//! The limit is fixed when the loop starts. Every oracle phase of a round
//! arms a [`DeadlineWatch`] on its own cancellation token, so a search or
//! verify call still running when the limit passes is cancelled the same way
//! a losing placement is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pipesynth_oracle::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    /// `0` means no limit.
    pub(crate) fn after_secs(timeout_secs: u64) -> Self {
        Self::after((timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)))
    }

    fn after(limit: Option<Duration>) -> Self {
        Self(limit.and_then(|limit| Instant::now().checked_add(limit)))
    }

    pub(crate) fn passed(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, or `None` without a limit.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Cancel `token` once the deadline passes, unless the returned watch is
    /// dropped first.
    pub(crate) fn watch(&self, token: &CancellationToken) -> DeadlineWatch {
        let disarm = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let handle = self.remaining().map(|remaining| {
            let (disarm, token, fired) = (disarm.clone(), token.clone(), Arc::clone(&fired));
            thread::spawn(move || {
                if !disarm.wait_timeout(remaining) {
                    warn!("Synthesis deadline passed; cancelling in-flight oracle calls");
                    fired.store(true, Ordering::SeqCst);
                    token.cancel();
                }
            })
        });
        DeadlineWatch {
            disarm,
            fired,
            handle,
        }
    }
}

/// Armed deadline for one oracle phase. Dropping it disarms the watcher and
/// joins its thread.
pub(crate) struct DeadlineWatch {
    disarm: CancellationToken,
    fired: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DeadlineWatch {
    /// Whether the deadline cancelled the watched token.
    pub(crate) fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for DeadlineWatch {
    fn drop(&mut self) {
        self.disarm.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

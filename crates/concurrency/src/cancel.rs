//! Cancellation tokens
//!
//! A [`CancellationToken`] is cancelled either explicitly via
//! [`CancellationToken::cancel`] or implicitly when its deadline passes.
//! Clones share the cancel flag; [`CancellationToken::within`] derives a token
//! that shares the flag but carries a tighter deadline.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Flag {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Cooperative cancellation signal
///
/// # Example
///
/// ```
/// use stockledger_concurrency::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<Flag>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token without a deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels itself after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Token that cancels itself at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// Token sharing this one's flag, with the deadline tightened to at most
    /// `timeout` from now
    pub fn within(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(deadline),
        }
    }

    /// Signal cancellation to every clone and wake sleepers
    pub fn cancel(&self) {
        let mut cancelled = self.flag.cancelled.lock();
        *cancelled = true;
        self.flag.wakeup.notify_all();
    }

    /// Cancelled explicitly or past the deadline
    pub fn is_cancelled(&self) -> bool {
        if *self.flag.cancelled.lock() {
            return true;
        }
        self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `true` if the token is cancelled when the sleep ends.
    pub fn sleep(&self, duration: Duration) -> bool {
        let wake_at = Instant::now() + duration;
        let wake_at = match self.deadline {
            Some(d) if d < wake_at => d,
            _ => wake_at,
        };

        let mut cancelled = self.flag.cancelled.lock();
        while !*cancelled {
            if self.flag.wakeup.wait_until(&mut cancelled, wake_at).timed_out() {
                break;
            }
        }
        drop(cancelled);
        self.is_cancelled()
    }
}

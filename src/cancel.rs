//! Cancellation of playback and the process-wide Ctrl+C handler.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

/// Exit status used when Ctrl+C arrives outside a play cycle.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared cancellation flag with a cancellable deadline wait.
///
/// Clones share the same flag. Waiters are woken as soon as [`cancel`] is
/// called, so cancellation is observed without waiting out a frame.
///
/// [`cancel`]: CancelToken::cancel
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.state
            .cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        *self.lock() = true;
        self.state.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Block until `deadline` passes or the token is cancelled.
    ///
    /// Returns immediately when the deadline is already in the past.
    ///
    /// # Returns
    /// `true` if the token was cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.lock();
        loop {
            if *cancelled {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match self.state.wakeup.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

/// Routes Ctrl+C to the play cycle that is currently armed.
///
/// `ctrlc` allows one handler per process, while every play cycle has its own
/// [`CancelToken`]. Cycles arm their token from the moment their frame store
/// exists until it is removed; a Ctrl+C with no armed token (at the prompt,
/// while the decoder starts) exits the process.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandler {
    armed: Arc<Mutex<Option<CancelToken>>>,
}

impl InterruptHandler {
    /// Install the process-wide handler.
    ///
    /// This should be called once at program startup.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let handler = Self::default();
        let remote = handler.clone();
        ctrlc::set_handler(move || {
            if !remote.interrupt() {
                crate::terminal::restore_terminal();
                eprintln!("\nInterrupted");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })?;
        Ok(handler)
    }

    /// Cancel the armed token, if any.
    ///
    /// # Returns
    /// `false` when nothing is armed.
    pub fn interrupt(&self) -> bool {
        let token = self.slot().clone();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Send Ctrl+C to `token` until the returned guard is dropped.
    pub fn arm(&self, token: &CancelToken) -> ArmGuard {
        *self.slot() = Some(token.clone());
        ArmGuard {
            armed: self.armed.clone(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Disarms the [`InterruptHandler`] on drop.
#[derive(Debug)]
pub struct ArmGuard {
    armed: Arc<Mutex<Option<CancelToken>>>,
}

impl Drop for ArmGuard {
    fn drop(&mut self) {
        *self
            .armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

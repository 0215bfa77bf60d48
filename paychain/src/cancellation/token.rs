//! Cancellation token shared between a caller and the retry layer.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Hook run once when a token is cancelled.
pub type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CancelState {
    reason: Option<String>,
    callbacks: Vec<CancelCallback>,
}

/// Cooperative cancellation for in-flight payments.
///
/// Only the first reason is kept. A call already inside the gateway is never
/// interrupted; holders either poll [`is_cancelled`](Self::is_cancelled) or
/// race [`cancelled`](Self::cancelled) against their own waits.
#[derive(Default)]
pub struct CancellationToken {
    flag: AtomicBool,
    state: Mutex<CancelState>,
    notify: Notify,
}

impl CancellationToken {
    /// Creates a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token. Returns false if it was already cancelled.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let callbacks = {
            let mut state = self.state.lock();
            if self.flag.swap(true, Ordering::AcqRel) {
                return false;
            }
            state.reason = Some(reason.into());
            std::mem::take(&mut state.callbacks)
        };

        self.notify.notify_waiters();
        callbacks.into_iter().for_each(|callback| callback());
        true
    }

    /// Runs `callback` on cancellation, or right away if already cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if self.is_cancelled() {
            drop(state);
            callback();
            return;
        }
        state.callbacks.push(Box::new(callback));
    }

    /// True once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// The reason given to the first `cancel` call.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.lock().reason.clone()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &state.reason)
            .field("pending_callbacks", &state.callbacks.len())
            .finish()
    }
}

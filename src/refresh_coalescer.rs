//! Single-flight coordination of proposition refreshes.
//!
//! [`RefreshCoalescer`] makes sure that at most one refresh request is outstanding at a time. Every
//! caller that asks for a refresh while one is in flight joins that refresh and receives its
//! outcome. Waiters are notified in the order they were queued.
use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        mpsc::{Receiver, RecvTimeoutError},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use crate::{Error, Event, EventBus, Result};

/// A single-shot callback receiving the outcome of a refresh cycle.
pub type Completion = Box<dyn FnOnce(bool) + Send + 'static>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    pending: VecDeque<Completion>,
}

/// Coalesces concurrent refresh requests into one in-flight refresh cycle.
///
/// A cycle starts with the first [`refresh`](RefreshCoalescer::refresh) call while idle, which
/// dispatches a single refresh request event. It ends when whoever services that request calls
/// [`handle_refresh_complete`](RefreshCoalescer::handle_refresh_complete). All waiters queued
/// before that call receive the same outcome.
///
/// There is no timeout: if the cycle is never completed, waiters are never invoked.
pub struct RefreshCoalescer {
    event_bus: Arc<dyn EventBus + Send + Sync>,
    state: Mutex<RefreshState>,
}

impl RefreshCoalescer {
    pub fn new(event_bus: Arc<dyn EventBus + Send + Sync>) -> RefreshCoalescer {
        RefreshCoalescer {
            event_bus,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Request a refresh, optionally registering `completion` for its outcome.
    ///
    /// Starts a new cycle if none is in progress. Otherwise joins the current one without any
    /// further side effect.
    pub fn refresh(&self, completion: Option<Completion>) {
        let starts_cycle = {
            let mut state = self.lock_state();
            if let Some(completion) = completion {
                state.pending.push_back(completion);
            }
            !std::mem::replace(&mut state.in_progress, true)
        };

        // Dispatching outside of the lock: the event bus may call back into the coalescer.
        if starts_cycle {
            log::debug!(target: "messaging", "starting propositions refresh");
            self.event_bus.dispatch(Event::refresh_messages_request());
        } else {
            log::trace!(target: "messaging", "refresh already in progress, joining it");
        }
    }

    /// Request a refresh and call `f` with its outcome.
    pub fn refresh_with(&self, f: impl FnOnce(bool) + Send + 'static) {
        self.refresh(Some(Box::new(f)));
    }

    /// Request a refresh and return a handle to block on its outcome.
    pub fn refresh_outcome(&self) -> RefreshOutcome {
        // Capacity of 1 is enough as the completion sends exactly once, so it never blocks.
        let (sender, receiver) = std::sync::mpsc::sync_channel(1);
        self.refresh_with(move |success| {
            // The receiver may be gone if the caller stopped waiting. Nothing to do then.
            let _ = sender.send(success);
        });
        RefreshOutcome { receiver }
    }

    /// Request a refresh and return a future resolving to its outcome.
    ///
    /// The refresh is requested immediately, not when the future is first polled.
    pub fn refresh_async(&self) -> impl Future<Output = Result<bool>> + Send + 'static {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.refresh_with(move |success| {
            let _ = sender.send(success);
        });
        async move { receiver.await.map_err(|_| Error::RefreshAbandoned) }
    }

    /// Finish the current refresh cycle, notifying every queued waiter with `success`.
    ///
    /// Waiters that arrive after this call are kept for the next cycle.
    pub fn handle_refresh_complete(&self, success: bool) {
        let waiters = {
            let mut state = self.lock_state();
            state.in_progress = false;
            std::mem::take(&mut state.pending)
        };

        log::debug!(target: "messaging",
                    success,
                    waiters = waiters.len();
                    "propositions refresh completed");

        for waiter in waiters {
            waiter(success);
        }
    }

    /// Returns `true` if a refresh cycle is currently outstanding.
    pub fn is_refresh_in_progress(&self) -> bool {
        self.lock_state().in_progress
    }

    /// Number of waiters queued for the current cycle.
    pub fn pending_waiters(&self) -> usize {
        self.lock_state().pending.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        // Waiters are invoked outside of the lock, so the lock can only be poisoned by a panic in
        // the coalescer itself.
        self.state
            .lock()
            .expect("thread holding refresh state lock should not panic")
    }
}

impl Drop for RefreshCoalescer {
    fn drop(&mut self) {
        let pending = self
            .state
            .get_mut()
            .map(|state| state.pending.len())
            .unwrap_or_default();
        if pending > 0 {
            log::warn!(target: "messaging",
                       waiters = pending;
                       "refresh coalescer dropped with waiters still pending");
        }
    }
}

/// A handle to the outcome of a refresh requested with
/// [`RefreshCoalescer::refresh_outcome`].
pub struct RefreshOutcome {
    receiver: Receiver<bool>,
}

impl RefreshOutcome {
    /// Block until the refresh cycle completes.
    ///
    /// # Errors
    ///
    /// - [`Error::RefreshAbandoned`] if the coalescer was dropped before completing the cycle.
    pub fn wait(self) -> Result<bool> {
        self.receiver.recv().map_err(|_| Error::RefreshAbandoned)
    }

    /// Block until the refresh cycle completes or `timeout` elapses.
    ///
    /// A timeout does not cancel anything: the cycle keeps going and the handle may be waited on
    /// again.
    ///
    /// # Errors
    ///
    /// - [`Error::RefreshTimedOut`] if the cycle did not complete in time.
    /// - [`Error::RefreshAbandoned`] if the coalescer was dropped before completing the cycle.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        match self.receiver.recv_timeout(timeout) {
            Ok(success) => Ok(success),
            Err(RecvTimeoutError::Timeout) => Err(Error::RefreshTimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(Error::RefreshAbandoned),
        }
    }
}

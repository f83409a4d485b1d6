//! Local typing indicator: a debounce timer over draft activity.
//!
//! Each [`TypingIndicator::pulse`] moves to `Active` and restarts a single
//! countdown; only when the countdown runs out with no further pulse does
//! the indicator fall back to `Idle`. The countdown itself comes from an
//! injected [`Timer`] so tests can drive it by hand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Callback run when a countdown expires.
pub type ExpiryCallback = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run a callback after a delay.
pub trait Timer: Send + Sync {
    fn start(&self, after: Duration, on_expire: ExpiryCallback) -> Box<dyn TimerHandle>;
}

/// Handle to one outstanding countdown.
pub trait TimerHandle: Send {
    /// Prevent the callback from running if it has not already.
    fn cancel(&self);
}

/// [`Timer`] backed by a sleeping tokio task.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

struct TokioTimerHandle(JoinHandle<()>);

impl TimerHandle for TokioTimerHandle {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl Timer for TokioTimer {
    fn start(&self, after: Duration, on_expire: ExpiryCallback) -> Box<dyn TimerHandle> {
        let deadline = tokio::time::Instant::now() + after;
        let task = self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            on_expire();
        });
        Box::new(TokioTimerHandle(task))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingState {
    Idle,
    Active,
}

struct Inner {
    state: TypingState,
    /// Bumped on every pulse/stop; an expiry only applies to its own generation.
    generation: u64,
    countdown: Option<Box<dyn TimerHandle>>,
}

/// Cheap to clone; clones share the same state and countdown.
#[derive(Clone)]
pub struct TypingIndicator {
    inner: Arc<Mutex<Inner>>,
    timer: Arc<dyn Timer>,
    debounce: Duration,
}

impl std::fmt::Debug for TypingIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingIndicator")
            .field("state", &self.state())
            .field("debounce", &self.debounce)
            .finish()
    }
}

impl TypingIndicator {
    pub fn new(timer: Arc<dyn Timer>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: TypingState::Idle,
                generation: 0,
                countdown: None,
            })),
            timer,
            debounce,
        }
    }

    pub fn state(&self) -> TypingState {
        self.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == TypingState::Active
    }

    /// Register activity: become `Active` and restart the countdown.
    pub fn pulse(&self) {
        let (generation, previous) = {
            let mut inner = self.lock();
            inner.generation += 1;
            if inner.state == TypingState::Idle {
                debug!("Typing started");
            }
            inner.state = TypingState::Active;
            (inner.generation, inner.countdown.take())
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let handle = self.timer.start(
            self.debounce,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                if inner.generation == generation {
                    inner.state = TypingState::Idle;
                    inner.countdown = None;
                    debug!("Typing stopped (debounce elapsed)");
                }
            }),
        );

        let mut inner = self.lock();
        if inner.generation == generation && inner.state == TypingState::Active {
            inner.countdown = Some(handle);
        } else {
            // Superseded (or already expired) before the handle was stored.
            drop(inner);
            handle.cancel();
        }
    }

    /// Go `Idle` immediately, cancelling any countdown.
    pub fn stop(&self) {
        let countdown = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = TypingState::Idle;
            inner.countdown.take()
        };
        if let Some(countdown) = countdown {
            countdown.cancel();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

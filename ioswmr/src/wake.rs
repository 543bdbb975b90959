//! Wake Signal
//!
//! Broadcast wake-up for readers waiting on a stream's writer.
//!
//! # Waiting
//!
//! A reader decides to wait after seeing that its offset caught up with
//! the stream length. If the writer appends and pulses between that check
//! and the moment the reader parks, the pulse is lost and the reader sleeps
//! on data that is already there.
//!
//! To avoid this, the readiness check is repeated under the signal's lock
//! (check - lock - check again), and the writer always publishes the new
//! length *before* calling `pulse()`, which takes the same lock:
//!
//! ```ignore
//! if offset >= stream.len() {
//!     // re-checked under the lock before parking
//!     signal.wait(|| offset < stream.len());
//! }
//! ```
//!
//! # Closing
//!
//! `shut()` is a one-way transition. Every waiter, current or future,
//! returns `Wake::Closed` immediately afterwards.

use parking_lot::{Condvar, Mutex};
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;

/// Why a wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The condition holds or a pulse arrived
    Ready,
    /// The signal was shut
    Closed,
}

#[derive(Debug, Default)]
struct WakeState {
    closed: bool,
}

/// Broadcast signal shared by one writer and any number of waiters
///
/// Blocking waiters park on a `parking_lot::Condvar`, async waiters on a
/// `tokio::sync::Notify`. Both are woken by every `pulse()` and `shut()`.
///
/// The generation is bumped under the lock but read without it, so taking
/// a snapshot on the read path never contends with the writer.
#[derive(Debug, Default)]
pub struct WakeSignal {
    generation: AtomicU64,
    state: Mutex<WakeState>,
    condvar: Condvar,
    notify: Notify,
}

impl WakeSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pulses sent so far
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_shut(&self) -> bool {
        self.state.lock().closed
    }

    /// Wake every waiter that is currently parked
    ///
    /// Never blocks on waiters and costs one lock round-trip when nobody
    /// waits. No-op after `shut()`.
    pub fn pulse(&self) {
        {
            let state = self.state.lock();
            if state.closed {
                return;
            }
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.condvar.notify_all();
        self.notify.notify_waiters();
    }

    /// Permanently shut the signal and release all waiters
    ///
    /// Returns `true` on the transition, `false` if already shut.
    pub fn shut(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
        }
        self.condvar.notify_all();
        self.notify.notify_waiters();
        true
    }

    /// Block until `ready()` holds, a pulse arrives, or the signal is shut
    ///
    /// `ready` is evaluated under the signal's lock, so it must not call
    /// back into this signal.
    pub fn wait(&self, ready: impl Fn() -> bool) -> Wake {
        let mut state = self.state.lock();
        let seen = self.generation();
        loop {
            if let Some(wake) = self.check(&state, seen, &ready) {
                return wake;
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Block until a pulse newer than generation `seen` arrives, or shut
    pub fn wait_past(&self, seen: u64) -> Wake {
        let mut state = self.state.lock();
        loop {
            if let Some(wake) = self.check(&state, seen, &|| false) {
                return wake;
            }
            self.condvar.wait(&mut state);
        }
    }

    /// Async version of [`WakeSignal::wait`]
    pub async fn wait_async(&self, ready: impl Fn() -> bool) -> Wake {
        let seen = self.generation();
        self.park_async(seen, ready).await
    }

    /// Async version of [`WakeSignal::wait_past`]
    pub async fn wait_past_async(&self, seen: u64) -> Wake {
        self.park_async(seen, || false).await
    }

    async fn park_async(&self, seen: u64, ready: impl Fn() -> bool) -> Wake {
        loop {
            // Register interest before checking, so a pulse sent between
            // the check and the await still wakes us.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();

            let wake = {
                let state = self.state.lock();
                self.check(&state, seen, &ready)
            };
            if let Some(wake) = wake {
                return wake;
            }
            notified.await;
        }
    }

    /// Decide under the lock whether a waiter may return
    fn check(&self, state: &WakeState, seen: u64, ready: &impl Fn() -> bool) -> Option<Wake> {
        if state.closed {
            Some(Wake::Closed)
        } else if self.generation() != seen || ready() {
            Some(Wake::Ready)
        } else {
            None
        }
    }
}

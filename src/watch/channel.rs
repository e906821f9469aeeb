//! One-shot closed signal
//!
//! A channel starts open and is closed exactly once. Closing wakes:
//! - async waiters through a `tokio::sync::Notify`
//! - blocking `WatchSet` waiters through registered `Signal`s

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

/// Wake-up shared by every channel a blocking `WatchSet::watch` waits on.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    pub(crate) fn fire(&self) {
        let mut fired = self.fired.lock();
        *fired = true;
        self.cond.notify_all();
    }

    /// Blocks until fired or until `deadline` passes. Returns whether it fired.
    pub(crate) fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let mut fired = self.fired.lock();
        while !*fired {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut fired, deadline).timed_out() {
                        return *fired;
                    }
                }
                None => self.cond.wait(&mut fired),
            }
        }
        true
    }
}

#[derive(Default)]
struct Inner {
    closed: AtomicBool,
    notify: Notify,
    waiters: Mutex<Vec<Weak<Signal>>>,
}

/// Handle to a one-shot change signal.
///
/// Cloning is cheap; all clones observe the same signal.
#[derive(Clone, Default)]
pub struct WatchCh {
    inner: Arc<Inner>,
}

impl WatchCh {
    /// Creates a new, open channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the channel and wakes every waiter.
    ///
    /// Returns false if the channel was already closed.
    pub fn close(&self) -> bool {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.inner.notify.notify_waiters();

        let waiters = std::mem::take(&mut *self.inner.waiters.lock());
        for waiter in waiters {
            if let Some(signal) = waiter.upgrade() {
                signal.fire();
            }
        }
        true
    }

    /// Returns true if both handles refer to the same channel.
    pub fn same_channel(&self, other: &WatchCh) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Blocks the calling thread until the channel closes.
    ///
    /// Returns true if the channel closed, false if `timeout` elapsed first.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.is_closed() {
            return true;
        }
        let signal = Arc::new(Signal::default());
        self.register(&signal);
        signal.wait_until(timeout.map(|t| Instant::now() + t))
    }

    /// Resolves once the channel is closed.
    pub async fn closed(&self) {
        loop {
            // Notified futures receive notify_waiters() from creation on, so
            // checking the flag after creating one cannot miss a close.
            let notified = self.inner.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn register(&self, signal: &Arc<Signal>) {
        let mut waiters = self.inner.waiters.lock();
        if self.is_closed() {
            drop(waiters);
            signal.fire();
            return;
        }
        waiters.retain(|w| w.strong_count() > 0);
        waiters.push(Arc::downgrade(signal));
    }
}

impl fmt::Debug for WatchCh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchCh")
            .field("closed", &self.is_closed())
            .finish()
    }
}

//! Sets of watch channels

use std::time::{Duration, Instant};
use std::sync::Arc;

use futures_util::future::select_all;

use super::channel::{Signal, WatchCh};

/// A collection of channels that fires when any one of them closes.
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    channels: Vec<WatchCh>,
}

impl WatchSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel. Adding the same channel twice has no effect.
    pub fn add(&mut self, ch: WatchCh) {
        if !self.channels.iter().any(|c| c.same_channel(&ch)) {
            self.channels.push(ch);
        }
    }

    /// Adds `ch` while the set holds fewer than `limit` channels, otherwise
    /// adds `alt`, a coarser channel that covers `ch`.
    pub fn add_with_limit(&mut self, limit: usize, ch: WatchCh, alt: WatchCh) {
        if self.channels.len() < limit {
            self.add(ch);
        } else {
            self.add(alt);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Returns true if any channel in the set is already closed.
    pub fn is_fired(&self) -> bool {
        self.channels.iter().any(WatchCh::is_closed)
    }

    /// Blocks until any channel closes or `timeout` elapses.
    ///
    /// Returns true if the wait timed out. An empty set has nothing to wait
    /// on: it sleeps for `timeout` (if any) and reports a timeout.
    pub fn watch(&self, timeout: Option<Duration>) -> bool {
        if self.is_fired() {
            return false;
        }
        if self.channels.is_empty() {
            if let Some(timeout) = timeout {
                std::thread::sleep(timeout);
            }
            return true;
        }

        let signal = Arc::new(Signal::default());
        for ch in &self.channels {
            ch.register(&signal);
        }
        !signal.wait_until(timeout.map(|t| Instant::now() + t))
    }

    /// Resolves once any channel closes. Never resolves for an empty set.
    pub async fn changed(&self) {
        if self.channels.is_empty() {
            std::future::pending::<()>().await;
        }
        let waits = self
            .channels
            .iter()
            .map(|ch| Box::pin(ch.closed()))
            .collect::<Vec<_>>();
        select_all(waits).await;
    }
}

//! Query result iteration

use std::fmt;
use std::sync::Arc;

use crate::watch::WatchCh;

/// Lazily yields the records matched by a query.
///
/// Bound to the snapshot (or working copy) it was created from: later
/// commits never change what it yields.
pub struct ResultIterator<R> {
    inner: Box<dyn Iterator<Item = Arc<R>> + Send>,
    watch: WatchCh,
}

impl<R> ResultIterator<R> {
    pub(crate) fn new(inner: Box<dyn Iterator<Item = Arc<R>> + Send>, watch: WatchCh) -> Self {
        Self { inner, watch }
    }

    /// Channel closed when a commit changes the part of the index this
    /// query covered.
    pub fn watch_ch(&self) -> WatchCh {
        self.watch.clone()
    }
}

impl<R> Iterator for ResultIterator<R> {
    type Item = Arc<R>;

    fn next(&mut self) -> Option<Arc<R>> {
        self.inner.next()
    }
}

impl<R> fmt::Debug for ResultIterator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultIterator").field("watch", &self.watch).finish()
    }
}

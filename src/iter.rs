//! Module `iter` implements `TreeIterator`, a depth-first walk over
//! every tuple in a `TreeSnapshot`.
//!
//! The walk uses an explicit stack of node ids plus a buffer of
//! in-flight tuples from the current leaf, so nothing here recurses.
//! The iterator captures `last_transaction_id` at construction and, by
//! default, fails fast with `Error::ConcurrentModification` the moment
//! a later call observes a different value -- a writer committed while
//! this iterator was still in use. `permissive` iterators skip that
//! check, for callers who accept a possibly-inconsistent walk over a
//! moving tree.

use log::warn;

use crate::{
    error::{Error, Result},
    id::Id,
    traits::TreeSnapshot,
    types::{NodeKind, Tuple},
};

pub struct TreeIterator<K, V, S>
where
    S: TreeSnapshot<K, V>,
{
    snapshot: S,
    stack: Vec<Id>,
    pending: std::vec::IntoIter<Tuple<K, V>>,
    last_transaction_id: Option<Id>,
    permissive: bool,
}

impl<K, V, S> TreeIterator<K, V, S>
where
    S: TreeSnapshot<K, V>,
{
    pub fn new(snapshot: S) -> Self {
        Self::with_mode(snapshot, false)
    }

    pub fn permissive(snapshot: S) -> Self {
        warn!("constructing a permissive TreeIterator; concurrent writes will not be detected");
        Self::with_mode(snapshot, true)
    }

    fn with_mode(snapshot: S, permissive: bool) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = snapshot.root_id() {
            stack.push(root);
        }
        TreeIterator {
            snapshot,
            stack,
            pending: Vec::new().into_iter(),
            last_transaction_id: snapshot.last_transaction_id(),
            permissive,
        }
    }

    fn check_concurrent_modification(&self) -> Result<()> {
        if self.permissive {
            return Ok(());
        }
        let current = self.snapshot.last_transaction_id();
        if current != self.last_transaction_id {
            return Err(Error::ConcurrentModification {
                expected: self.last_transaction_id,
                found: current,
            });
        }
        Ok(())
    }
}

impl<K, V, S> Iterator for TreeIterator<K, V, S>
where
    S: TreeSnapshot<K, V>,
{
    type Item = Result<Tuple<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = self.check_concurrent_modification() {
            return Some(Err(err));
        }

        loop {
            if let Some(tuple) = self.pending.next() {
                return Some(Ok(tuple));
            }
            let node_id = self.stack.pop()?;
            let header = match self.snapshot.get_header(node_id) {
                Ok(Some(header)) => header,
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            };
            match header.kind {
                NodeKind::Inner { children } => self.stack.extend(children),
                NodeKind::Leaf { page_id, .. } => match self.snapshot.get_page(page_id) {
                    Ok(Some(page)) => self.pending = page.tuples.into_iter(),
                    Ok(None) => {}
                    Err(err) => return Some(Err(err)),
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "iter_test.rs"]
mod iter_test;

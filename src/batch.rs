//! Module `batch` implements the accumulator callers add tuples to
//! before a `TransactionBuilder` compiles everything collected so far
//! into one transaction.

use std::{
    collections::HashSet,
    sync::Mutex,
};

use crate::{id::Id, types::Tuple};

/// A thread-safe staging area for tuples awaiting compilation. Guards
/// shared mutable state behind a single `Mutex` rather than threading a
/// `&mut` through the call chain.
///
/// Each queued item is stamped with a fresh `Id` at `add()` time, and
/// the batch itself carries an id (minted at construction, refreshed on
/// every `drain()`) capturing when its current contents were accumulated.
pub struct Batch<K, V> {
    id: Mutex<Id>,
    pending: Mutex<Vec<Tuple<K, V>>>,
}

impl<K, V> Batch<K, V> {
    pub fn new() -> Self {
        Batch {
            id: Mutex::new(Id::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Queue one key/value pair, stamping it with a fresh tuple id. Safe
    /// to call concurrently with other `add` and `drain` calls.
    pub fn add(&self, key: K, value: Option<V>) {
        self.pending.lock().unwrap().push(Tuple::new(Id::new(), key, value));
    }

    pub fn add_many<I>(&self, items: I)
    where
        I: IntoIterator<Item = (K, Option<V>)>,
    {
        let mut pending = self.pending.lock().unwrap();
        pending.extend(items.into_iter().map(|(key, value)| Tuple::new(Id::new(), key, value)));
    }

    /// Atomically take everything queued so far into a fresh `Batch`
    /// (with its own new id), leaving this batch empty for subsequent
    /// callers. A `TransactionBuilder` drains a batch once per compiled
    /// transaction.
    pub fn drain(&self) -> Batch<K, V> {
        let taken = std::mem::take(&mut *self.pending.lock().unwrap());
        let mut id = self.id.lock().unwrap();
        let drained_id = *id;
        *id = Id::new();
        Batch {
            id: Mutex::new(drained_id),
            pending: Mutex::new(taken),
        }
    }

    /// This batch's id, capturing when its current contents were
    /// accumulated.
    pub fn id(&self) -> Id {
        *self.id.lock().unwrap()
    }

    /// The queued tuples, in insertion order.
    pub fn tuples(&self) -> Vec<Tuple<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.pending.lock().unwrap().clone()
    }

    /// The set of tuple ids currently queued, used to discriminate
    /// CREATE from MOVE when a `TransactionBuilder` emits IO operations.
    pub fn tuple_id_set(&self) -> HashSet<Id> {
        self.pending.lock().unwrap().iter().map(|t| t.id).collect()
    }

    pub fn size(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<K, V> Default for Batch<K, V> {
    fn default() -> Self {
        Batch::new()
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;

//! Module `diff` implements `DiffTracker`, the staged in-memory view a
//! `TransactionBuilder` mutates while compiling a batch. Reads fall
//! through to a base `TreeSnapshot`; writes accumulate in maps and sets
//! here until the builder is ready to produce a `Transaction`.

use std::collections::{HashMap, HashSet};

use crate::{
    error::Result,
    id::Id,
    ops::Transaction,
    traits::TreeSnapshot,
    types::{DataPage, NodeHeader},
};

/// Tracks every mutation a `TransactionBuilder` has staged so far,
/// layered over an immutable base snapshot. Nothing here is visible to
/// any other caller until the builder hands the resulting `Transaction`
/// to a `DataStore`.
pub struct DiffTracker<'s, K, V, S>
where
    S: TreeSnapshot<K, V>,
{
    base: &'s S,
    expected_tree_id: Option<Id>,
    new_root: Option<Id>,
    staged_headers: HashMap<Id, NodeHeader<K>>,
    staged_pages: HashMap<Id, DataPage<K, V>>,
    deleted_headers: HashSet<Id>,
    deleted_pages: HashSet<Id>,
    new_tuple_ids: HashSet<Id>,
    updated_tuple_ids: HashSet<Id>,
    /// Node ids genuinely new this transaction (root seed, push-down
    /// root, a split's fresh sibling, a rebuild's replacement leaf) --
    /// the set `into_transaction` uses to split staged headers into
    /// `created_nodes` vs `updated_nodes`.
    new_node_ids: HashSet<Id>,
    /// Leaf ids created by a split this transaction, candidates for the
    /// immediate per-leaf repack that follows split propagation.
    repack_seeds: HashSet<Id>,
}

impl<'s, K, V, S> DiffTracker<'s, K, V, S>
where
    K: Clone,
    V: Clone,
    S: TreeSnapshot<K, V>,
{
    pub fn new(base: &'s S) -> Self {
        DiffTracker {
            base,
            expected_tree_id: base.last_transaction_id(),
            new_root: base.root_id(),
            staged_headers: HashMap::new(),
            staged_pages: HashMap::new(),
            deleted_headers: HashSet::new(),
            deleted_pages: HashSet::new(),
            new_tuple_ids: HashSet::new(),
            updated_tuple_ids: HashSet::new(),
            new_node_ids: HashSet::new(),
            repack_seeds: HashSet::new(),
        }
    }

    pub fn expected_tree_id(&self) -> Option<Id> {
        self.expected_tree_id
    }

    pub fn root_id(&self) -> Option<Id> {
        self.new_root
    }

    pub fn set_root(&mut self, id: Option<Id>) {
        self.new_root = id;
    }

    /// Read-through lookup: the staged map wins, then the deleted set
    /// (an explicit tombstone, overriding anything the base still has),
    /// then the base snapshot itself.
    pub fn get_header(&self, id: Id) -> Result<Option<NodeHeader<K>>> {
        if let Some(header) = self.staged_headers.get(&id) {
            return Ok(Some(header.clone()));
        }
        if self.deleted_headers.contains(&id) {
            return Ok(None);
        }
        self.base.get_header(id)
    }

    pub fn get_page(&self, id: Id) -> Result<Option<DataPage<K, V>>> {
        if let Some(page) = self.staged_pages.get(&id) {
            return Ok(Some(page.clone()));
        }
        if self.deleted_pages.contains(&id) {
            return Ok(None);
        }
        self.base.get_page(id)
    }

    pub fn stage_header(&mut self, header: NodeHeader<K>) {
        self.deleted_headers.remove(&header.id);
        self.staged_headers.insert(header.id, header);
    }

    pub fn stage_page(&mut self, id: Id, page: DataPage<K, V>) {
        self.deleted_pages.remove(&id);
        self.staged_pages.insert(id, page);
    }

    pub fn delete_header(&mut self, id: Id) {
        self.staged_headers.remove(&id);
        self.deleted_headers.insert(id);
    }

    pub fn delete_page(&mut self, id: Id) {
        self.staged_pages.remove(&id);
        self.deleted_pages.insert(id);
    }

    pub fn register_new_tuple_id(&mut self, id: Id) {
        self.new_tuple_ids.insert(id);
    }

    pub fn register_updated_tuple_id(&mut self, id: Id) {
        // A tuple created earlier in this same transaction stays
        // classified as created even if it is reassigned again by a
        // split within the same compile pass.
        if !self.new_tuple_ids.contains(&id) {
            self.updated_tuple_ids.insert(id);
        }
    }

    /// Mark `id` as a node header genuinely new to the tree this
    /// transaction, so `into_transaction` stages it as `created_nodes`
    /// rather than `updated_nodes`.
    pub fn register_new_node(&mut self, id: Id) {
        self.new_node_ids.insert(id);
    }

    pub fn register_repack_seed(&mut self, id: Id) {
        self.repack_seeds.insert(id);
    }

    /// Take every repack seed registered so far and clear the set, so a
    /// seed registered by a nested repack's own split propagation is not
    /// picked up again by the caller that drained it.
    pub fn drain_repack_seeds(&mut self) -> Vec<Id> {
        self.repack_seeds.drain().collect()
    }

    pub fn is_header_staged(&self, id: Id) -> bool {
        self.staged_headers.contains_key(&id)
    }

    pub fn into_transaction(self) -> Transaction<K, V> {
        let mut txn = Transaction::new(self.expected_tree_id, Id::new());
        txn.new_root = self.new_root;
        for (id, header) in self.staged_headers {
            if self.new_node_ids.contains(&id) {
                txn.created_nodes.push(header);
            } else {
                txn.updated_nodes.push(header);
            }
        }
        txn.staged_pages = self.staged_pages.into_iter().collect();
        txn.deleted_headers = self.deleted_headers.into_iter().collect();
        txn.deleted_pages = self.deleted_pages.into_iter().collect();
        txn.created_tuples = self.new_tuple_ids.into_iter().collect();
        txn.updated_tuples = self.updated_tuple_ids.into_iter().collect();
        txn
    }
}

#[cfg(test)]
#[path = "diff_test.rs"]
mod diff_test;

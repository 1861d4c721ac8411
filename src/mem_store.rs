//! Module `mem_store` implements `MemStore`, the in-memory reference
//! `DataStore`. It exists to exercise the core engine and its test
//! scenarios without a real backend: a `Mutex`-guarded map of node
//! headers, a map of data pages, and two small append-only bookkeeping
//! tables (`transactions_log`, `roots_log`) recording each commit's
//! wall-clock time, mirroring the bookkeeping a durable backend would
//! keep on disk.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use log::{error, info};

use crate::{
    error::{Error, Result},
    id::Id,
    traits::{DataStore, RawHeader, RawPage, RawTransaction},
};

#[derive(Clone, Debug)]
struct TransactionRecord {
    id: Id,
    root_before: Option<Id>,
    root_after: Option<Id>,
    committed_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct RootRecord {
    root_id: Id,
    transaction_id: Id,
    recorded_at: DateTime<Utc>,
}

struct MemStoreState {
    root_id: Option<Id>,
    last_transaction_id: Option<Id>,
    headers: HashMap<Id, RawHeader>,
    pages: HashMap<Id, RawPage>,
    transactions_log: Vec<TransactionRecord>,
    roots_log: Vec<RootRecord>,
}

impl MemStoreState {
    fn new() -> Self {
        MemStoreState {
            root_id: None,
            last_transaction_id: None,
            headers: HashMap::new(),
            pages: HashMap::new(),
            transactions_log: Vec::new(),
            roots_log: Vec::new(),
        }
    }
}

/// An in-memory `DataStore`. Not crash-safe and not shared across
/// processes; built to the same contract a durable backend would
/// satisfy so the core engine cannot tell the difference.
pub struct MemStore {
    state: Mutex<MemStoreState>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            state: Mutex::new(MemStoreState::new()),
        }
    }

    /// Every transaction id committed so far, oldest first. Test-harness
    /// accessor, not part of the `DataStore` contract.
    pub fn transaction_ids(&self) -> Vec<Id> {
        self.state
            .lock()
            .unwrap()
            .transactions_log
            .iter()
            .map(|r| r.id)
            .collect()
    }

    /// Every root id the tree has ever had, oldest first.
    pub fn root_history(&self) -> Vec<Id> {
        self.state.lock().unwrap().roots_log.iter().map(|r| r.root_id).collect()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

impl DataStore for MemStore {
    fn root_id(&self) -> Result<Option<Id>> {
        Ok(self.state.lock().unwrap().root_id)
    }

    fn last_transaction_id(&self) -> Result<Option<Id>> {
        Ok(self.state.lock().unwrap().last_transaction_id)
    }

    fn get_header(&self, id: Id) -> Result<Option<RawHeader>> {
        Ok(self.state.lock().unwrap().headers.get(&id).cloned())
    }

    fn get_page(&self, id: Id) -> Result<Option<RawPage>> {
        Ok(self.state.lock().unwrap().pages.get(&id).cloned())
    }

    fn apply_transaction(&self, txn: RawTransaction) -> Result<Id> {
        let mut state = self.state.lock().unwrap();

        if txn.expected_tree_id != state.last_transaction_id {
            let err = Error::ConcurrentModification {
                expected: txn.expected_tree_id,
                found: state.last_transaction_id,
            };
            error!("apply_transaction rejected: {}", err);
            return Err(err);
        }

        let transaction_id = txn.transaction_id;
        let root_before = state.root_id;
        let created_tuples = txn.created_tuples.len();
        let updated_tuples = txn.updated_tuples.len();
        let created_nodes = txn.created_nodes.len();
        let updated_nodes = txn.updated_nodes.len();

        for id in &txn.deleted_headers {
            state.headers.remove(id);
        }
        for id in &txn.deleted_pages {
            state.pages.remove(id);
        }
        for header in txn.created_nodes {
            state.headers.insert(header.id, header);
        }
        for header in txn.updated_nodes {
            state.headers.insert(header.id, header);
        }
        for (id, page) in txn.staged_pages {
            state.pages.insert(id, page);
        }

        state.root_id = txn.new_root;
        state.last_transaction_id = Some(transaction_id);

        let now = Utc::now();
        state.transactions_log.push(TransactionRecord {
            id: transaction_id,
            root_before,
            root_after: txn.new_root,
            committed_at: now,
        });
        if let Some(root_id) = txn.new_root {
            state.roots_log.push(RootRecord {
                root_id,
                transaction_id,
                recorded_at: now,
            });
        }

        info!(
            "committed transaction {:?}: {} tuples created, {} updated, {} nodes created, {} updated",
            transaction_id, created_tuples, updated_tuples, created_nodes, updated_nodes,
        );

        Ok(transaction_id)
    }

    fn all_node_ids(&self) -> Result<Vec<Id>> {
        Ok(self.state.lock().unwrap().headers.keys().copied().collect())
    }

    fn all_page_ids(&self) -> Result<Vec<Id>> {
        Ok(self.state.lock().unwrap().pages.keys().copied().collect())
    }
}

/// Not strictly required by `DataStore`, but useful for tests that want
/// to assert no page id is referenced by more than one header and no
/// header is left orphaned.
pub fn referenced_page_ids(store: &MemStore) -> Result<HashSet<Id>> {
    let state = store.state.lock().unwrap();
    Ok(state
        .headers
        .values()
        .filter_map(|h| h.page_id())
        .collect())
}

#[cfg(test)]
#[path = "mem_store_test.rs"]
mod mem_store_test;

use super::*;
use crate::types::{DataPage, NodeHeader, Tuple};

fn leaf_header(id: Id, page_id: Id) -> RawHeader {
    NodeHeader::new_leaf(id, None, b"center".to_vec(), 0.0, page_id, 1)
}

#[test]
fn test_empty_store_has_no_root() {
    let store = MemStore::new();
    assert_eq!(store.root_id().unwrap(), None);
    assert_eq!(store.last_transaction_id().unwrap(), None);
}

#[test]
fn test_apply_transaction_creates_root() {
    let store = MemStore::new();
    let leaf_id = Id::new();
    let page_id = Id::new();

    let mut txn: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn.new_root = Some(leaf_id);
    txn.created_nodes.push(leaf_header(leaf_id, page_id));
    txn.staged_pages.push((
        page_id,
        DataPage::new(vec![Tuple::new(Id::new(), b"k".to_vec(), Some(b"v".to_vec()))]),
    ));
    txn.created_tuples.push(Id::new());

    let txn_id = store.apply_transaction(txn).unwrap();
    assert_eq!(store.root_id().unwrap(), Some(leaf_id));
    assert_eq!(store.last_transaction_id().unwrap(), Some(txn_id));
    assert!(store.get_header(leaf_id).unwrap().is_some());
    assert!(store.get_page(page_id).unwrap().is_some());
}

#[test]
fn test_apply_transaction_rejects_stale_expected_transaction_id() {
    let store = MemStore::new();
    let leaf_id = Id::new();
    let page_id = Id::new();
    let mut txn: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn.new_root = Some(leaf_id);
    txn.created_nodes.push(leaf_header(leaf_id, page_id));
    store.apply_transaction(txn).unwrap();

    let bogus_expected = Some(Id::new());
    let mut txn2: RawTransaction = crate::ops::Transaction::new(bogus_expected, Id::new());
    txn2.new_root = Some(Id::new());
    let err = store.apply_transaction(txn2).unwrap_err();
    assert!(matches!(err, Error::ConcurrentModification { .. }));
}

#[test]
fn test_apply_transaction_rejects_same_expected_root_different_transaction() {
    // A batch that never touches the root (no split) must still be
    // rejected if another writer committed in between: the optimistic
    // concurrency token is last_transaction_id, not root_id, since most
    // batches leave the root unchanged.
    let store = MemStore::new();
    let leaf_id = Id::new();
    let page_id = Id::new();
    let mut txn: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn.new_root = Some(leaf_id);
    txn.created_nodes.push(leaf_header(leaf_id, page_id));
    store.apply_transaction(txn).unwrap();

    // Same root as the committed state, but a stale (pre-commit)
    // expected_tree_id -- this must still be rejected.
    let mut txn2: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn2.new_root = Some(leaf_id);
    let err = store.apply_transaction(txn2).unwrap_err();
    assert!(matches!(err, Error::ConcurrentModification { .. }));
}

#[test]
fn test_deleted_headers_and_pages_are_removed() {
    let store = MemStore::new();
    let leaf_id = Id::new();
    let page_id = Id::new();
    let mut txn: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn.new_root = Some(leaf_id);
    txn.created_nodes.push(leaf_header(leaf_id, page_id));
    txn.staged_pages.push((page_id, DataPage::default()));
    let txn_id = store.apply_transaction(txn).unwrap();

    let mut txn2: RawTransaction = crate::ops::Transaction::new(Some(txn_id), Id::new());
    txn2.new_root = None;
    txn2.deleted_headers.push(leaf_id);
    txn2.deleted_pages.push(page_id);
    store.apply_transaction(txn2).unwrap();

    assert_eq!(store.root_id().unwrap(), None);
    assert!(store.get_header(leaf_id).unwrap().is_none());
    assert!(store.get_page(page_id).unwrap().is_none());
}

#[test]
fn test_bookkeeping_logs_grow() {
    let store = MemStore::new();
    let leaf_id = Id::new();
    let page_id = Id::new();
    let mut txn: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn.new_root = Some(leaf_id);
    txn.created_nodes.push(leaf_header(leaf_id, page_id));
    store.apply_transaction(txn).unwrap();

    assert_eq!(store.transaction_ids().len(), 1);
    assert_eq!(store.root_history().len(), 1);
}

#[test]
fn test_all_node_and_page_ids() {
    let store = MemStore::new();
    let leaf_id = Id::new();
    let page_id = Id::new();
    let mut txn: RawTransaction = crate::ops::Transaction::new(None, Id::new());
    txn.new_root = Some(leaf_id);
    txn.created_nodes.push(leaf_header(leaf_id, page_id));
    txn.staged_pages.push((page_id, DataPage::default()));
    store.apply_transaction(txn).unwrap();

    assert_eq!(store.all_node_ids().unwrap(), vec![leaf_id]);
    assert_eq!(store.all_page_ids().unwrap(), vec![page_id]);
}

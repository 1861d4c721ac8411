use super::*;

#[test]
fn test_add_and_drain() {
    let batch: Batch<i64, String> = Batch::new();
    assert!(batch.is_empty());
    batch.add(1, Some("a".to_string()));
    batch.add(2, None);
    assert_eq!(batch.size(), 2);

    let drained = batch.drain();
    assert_eq!(drained.size(), 2);
    assert!(batch.is_empty());
}

#[test]
fn test_drain_is_idempotent_empty_after() {
    let batch: Batch<i64, ()> = Batch::new();
    batch.add(1, None);
    let first = batch.drain();
    let second = batch.drain();
    assert_eq!(first.size(), 1);
    assert!(second.is_empty());
}

#[test]
fn test_add_many() {
    let batch: Batch<i64, ()> = Batch::new();
    batch.add_many(vec![(1, None), (2, None), (3, None)]);
    assert_eq!(batch.size(), 3);
}

#[test]
fn test_tuples_preserve_insertion_order() {
    let batch: Batch<i64, ()> = Batch::new();
    batch.add(1, None);
    batch.add(2, None);
    batch.add(3, None);
    let keys: Vec<i64> = batch.tuples().into_iter().map(|t| t.key).collect();
    assert_eq!(keys, vec![1, 2, 3]);
}

#[test]
fn test_tuple_id_set_matches_tuples() {
    let batch: Batch<i64, ()> = Batch::new();
    batch.add(1, None);
    batch.add(2, None);
    let ids = batch.tuple_id_set();
    assert_eq!(ids.len(), 2);
    for tuple in batch.tuples() {
        assert!(ids.contains(&tuple.id));
    }
}

#[test]
fn test_drain_stamps_fresh_batch_id_and_keeps_original_id_on_drained_batch() {
    let batch: Batch<i64, ()> = Batch::new();
    let id_before = batch.id();
    batch.add(1, None);
    let drained = batch.drain();

    assert_eq!(drained.id(), id_before);
    assert_ne!(batch.id(), id_before);
}

use super::*;

use std::{collections::HashSet, convert::TryInto};

use rand::Rng;

use crate::{
    codec::{Utf8Codec, VoidCodec},
    mem_store::MemStore,
    types::RepackingMode,
};

type Point = (f64, f64);

fn euclid(a: &Point, b: &Point) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

struct PointCodec;

impl Codec<Point> for PointCodec {
    fn encode(&self, value: Option<&Point>) -> Result<Option<Vec<u8>>> {
        Ok(value.map(|(a, b)| {
            let mut bytes = Vec::with_capacity(16);
            bytes.extend_from_slice(&a.to_be_bytes());
            bytes.extend_from_slice(&b.to_be_bytes());
            bytes
        }))
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<Point>> {
        match bytes {
            None => Ok(None),
            Some(b) if b.len() == 16 => {
                let a = f64::from_be_bytes(b[0..8].try_into().unwrap());
                let c = f64::from_be_bytes(b[8..16].try_into().unwrap());
                Ok(Some((a, c)))
            }
            Some(b) => Err(Error::Backend(format!("point decode: expected 16 bytes, got {}", b.len()))),
        }
    }
}

type StringEngine = TreeEngine<MemStore, Point, String, fn(&Point, &Point) -> f64, PointCodec, Utf8Codec>;
type VoidEngine = TreeEngine<MemStore, Point, (), fn(&Point, &Point) -> f64, PointCodec, VoidCodec>;

fn new_string_engine(config: Config) -> StringEngine {
    TreeEngine::new(MemStore::new(), euclid, PointCodec, Utf8Codec, config).unwrap()
}

fn new_void_engine(config: Config) -> VoidEngine {
    TreeEngine::new(MemStore::new(), euclid, PointCodec, VoidCodec, config).unwrap()
}

fn random_point(rng: &mut impl Rng) -> Point {
    (rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0))
}

/// Walks the full tree, checking structural invariants: root uniqueness
/// and reachability, parent linkage, branching-factor and page-size
/// bounds, page uniqueness, leaf radius exactness, and agreement with
/// `tree_stats`. No-tuple-in-two-leaves is vacuously true here since
/// `insert_tuples`/split/repack always move a tuple, never copy it,
/// between exactly the leaf maps staged in one `DiffTracker`.
fn check_invariants<D, KC, VC>(engine: &TreeEngine<D, Point, String, fn(&Point, &Point) -> f64, KC, VC>, config: &Config)
where
    D: crate::traits::DataStore,
    KC: Codec<Point>,
    VC: Codec<String>,
{
    let snapshot = engine.snapshot();
    let root_id = match snapshot.root_id() {
        Some(id) => id,
        None => return,
    };

    let mut stack = vec![root_id];
    let mut visited: HashSet<Id> = HashSet::new();
    let mut seen_page_ids: HashSet<Id> = HashSet::new();
    let mut total_tuples = 0_usize;

    while let Some(id) = stack.pop() {
        assert!(visited.insert(id), "node {:?} reachable twice", id);
        let header = snapshot.get_header(id).unwrap().expect("reachable header must exist");

        if id == root_id {
            assert!(header.parent.is_none(), "root must have an absent parent");
        } else {
            assert!(header.parent.is_some(), "non-root node {:?} has no parent", id);
        }

        match &header.kind {
            crate::types::NodeKind::Inner { children } => {
                assert!(!children.is_empty(), "inner node {:?} has no children", id);
                assert!(
                    children.len() <= config.branching_factor,
                    "inner node {:?} exceeds branching_factor: {} children",
                    id,
                    children.len()
                );
                for &child_id in children {
                    stack.push(child_id);
                }
            }
            crate::types::NodeKind::Leaf { page_id, tuple_count } => {
                assert!(
                    seen_page_ids.insert(*page_id),
                    "page {:?} referenced by more than one leaf",
                    page_id
                );
                assert!(
                    *tuple_count <= config.max_tuples_per_page,
                    "leaf {:?} exceeds max_tuples_per_page: {} tuples",
                    id,
                    tuple_count
                );
                let page = snapshot.get_page(*page_id).unwrap().unwrap_or_default();
                assert_eq!(page.tuples.len(), *tuple_count, "leaf {:?}/page size mismatch", id);
                total_tuples += page.tuples.len();

                let mut expected_radius = 0.0_f64;
                for tuple in &page.tuples {
                    let d = euclid(&header.center, &tuple.key);
                    if d > expected_radius {
                        expected_radius = d;
                    }
                }
                assert!(
                    (header.radius - expected_radius).abs() < 1e-6,
                    "leaf {:?} radius not exact: stored {} vs recomputed {}",
                    id,
                    header.radius,
                    expected_radius
                );
            }
        }
    }

    let stats = engine.tree_stats().unwrap();
    assert_eq!(stats.tuple_count, total_tuples, "tree_stats tuple_count disagrees with the walk");
}

// -- S1: never-split root --------------------------------------------------

#[test]
fn s1_never_split_root() {
    let config = Config::new().with_branching_factor(8).with_max_tuples_per_page(64);
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<String>)> = (0..10).map(|i| (random_point(&mut rng), Some(i.to_string()))).collect();
    engine.add_batch(pairs).unwrap();

    let stats = engine.tree_stats().unwrap();
    assert_eq!(stats.inner_count, 1);
    assert_eq!(stats.leaf_count, 1);
    assert_eq!(stats.tuple_count, 10);
    check_invariants(&engine, &config);
}

// -- S2: leaf split ---------------------------------------------------------

#[test]
fn s2_leaf_split() {
    let config = Config::new().with_branching_factor(8).with_max_tuples_per_page(8);
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<String>)> = (0..9).map(|i| (random_point(&mut rng), Some(i.to_string()))).collect();
    engine.add_batch(pairs).unwrap();

    let stats = engine.tree_stats().unwrap();
    assert_eq!(stats.inner_count, 1);
    assert_eq!(stats.leaf_count, 2);
    assert_eq!(stats.tuple_count, 9);
    check_invariants(&engine, &config);
}

// -- S3: inner split ----------------------------------------------------------

#[test]
fn s3_inner_split() {
    let config = Config::new().with_branching_factor(3).with_max_tuples_per_page(5);
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<String>)> = (0..19).map(|i| (random_point(&mut rng), Some(i.to_string()))).collect();
    engine.add_batch(pairs).unwrap();

    let stats = engine.tree_stats().unwrap();
    assert!(stats.inner_count >= 2, "expected at least one inner split, got {} inner nodes", stats.inner_count);
    assert_eq!(stats.tuple_count, 19);
    check_invariants(&engine, &config);
}

// -- S4: all same key --------------------------------------------------------
//
// Uses far fewer than a stress-test-scale number of tuples to keep this
// test fast; the property under test (every inserted id survives a
// radius-0.1 range search around the shared key) does not depend on the
// count.

#[test]
fn s4_all_same_key() {
    let config = Config::new().with_branching_factor(2).with_max_tuples_per_page(250);
    let engine = new_string_engine(config);
    let shared_key = (7.0, -3.0);
    let n = 600;
    let pairs: Vec<(Point, Option<String>)> = (0..n).map(|i| (shared_key, Some(i.to_string()))).collect();
    engine.add_batch(pairs).unwrap();

    let results = engine.range_search(shared_key, 0.1).unwrap();
    assert_eq!(results.len(), n);

    let ids: HashSet<Id> = results.iter().map(|r| r.tuple.id).collect();
    assert_eq!(ids.len(), n);
    check_invariants(&engine, &config);
}

// -- S5: stress, batch by batch ----------------------------------------------
//
// Uses far fewer points and batches than a full stress run to keep this
// test fast; invariants are still checked after every batch.

#[test]
fn s5_stress_batch_by_batch() {
    let config = Config::new().with_max_tuples_per_page(75);
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();

    for batch in 0..10 {
        let pairs: Vec<(Point, Option<String>)> = (0..50)
            .map(|i| (random_point(&mut rng), Some(format!("{}-{}", batch, i))))
            .collect();
        engine.add_batch(pairs).unwrap();
        check_invariants(&engine, &config);
    }

    let stats = engine.tree_stats().unwrap();
    assert_eq!(stats.tuple_count, 500);
}

// -- S6: kNN correctness ------------------------------------------------------

#[test]
fn s6_knn_correctness() {
    let config = Config::new();
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();

    let points: Vec<Point> = (0..1000).map(|_| random_point(&mut rng)).collect();
    let pairs: Vec<(Point, Option<String>)> = points.iter().map(|&p| (p, None)).collect();
    engine.add_batch(pairs).unwrap();

    for _ in 0..10 {
        let probe = random_point(&mut rng);
        let k = 4;
        let got = engine.knn_search(probe, k).unwrap();
        assert_eq!(got.len(), k);

        let mut brute: Vec<f64> = points.iter().map(|p| euclid(&probe, p)).collect();
        brute.sort_by(|a, b| a.partial_cmp(b).unwrap());

        for (i, scored) in got.iter().enumerate() {
            assert!((scored.distance - brute[i]).abs() < 1e-9, "kNN result {} distance mismatch", i);
        }
        for i in 1..got.len() {
            assert!(got[i - 1].distance <= got[i].distance, "kNN results not ascending");
        }
    }
}

// -- S7: concurrent modification detection ------------------------------------

#[test]
fn s7_concurrent_modification_detected_by_iterator() {
    let config = Config::new().with_max_tuples_per_page(4);
    let engine = new_void_engine(config);
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<()>)> = (0..20).map(|_| (random_point(&mut rng), None)).collect();
    engine.add_batch(pairs).unwrap();

    let mut iter = engine.iterator(true);
    assert!(iter.next().is_some(), "tree should not be empty");

    engine.add_batch(vec![(random_point(&mut rng), None)]).unwrap();

    match iter.next() {
        Some(Err(Error::ConcurrentModification { .. })) => {}
        other => panic!("expected ConcurrentModification, got {:?}", other.map(|r| r.map(|t| t.id))),
    }
}

#[test]
fn permissive_iterator_survives_concurrent_modification() {
    let config = Config::new().with_max_tuples_per_page(4);
    let engine = new_void_engine(config);
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<()>)> = (0..20).map(|_| (random_point(&mut rng), None)).collect();
    engine.add_batch(pairs).unwrap();

    let mut iter = engine.iterator(false);
    assert!(iter.next().is_some());
    engine.add_batch(vec![(random_point(&mut rng), None)]).unwrap();
    assert!(iter.next().is_some(), "permissive iterator should not fail on a concurrent write");
}

// -- repacking ----------------------------------------------------------------

#[test]
fn incremental_repacking_preserves_tuple_count() {
    let config = Config::new()
        .with_branching_factor(3)
        .with_max_tuples_per_page(6)
        .with_repacking_mode(RepackingMode::IncrementalLn);
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();

    for batch in 0..6 {
        let pairs: Vec<(Point, Option<String>)> = (0..15)
            .map(|i| (random_point(&mut rng), Some(format!("{}-{}", batch, i))))
            .collect();
        engine.add_batch(pairs).unwrap();
        check_invariants(&engine, &config);
    }

    let stats = engine.tree_stats().unwrap();
    assert_eq!(stats.tuple_count, 90);
}

#[test]
fn repack_tree_preserves_tuple_count_and_ids() {
    let config = Config::new().with_branching_factor(2).with_max_tuples_per_page(5);
    let engine = new_string_engine(config);
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<String>)> = (0..30).map(|i| (random_point(&mut rng), Some(i.to_string()))).collect();
    engine.add_batch(pairs).unwrap();

    let before: HashSet<Id> = engine.iterator(true).map(|r| r.unwrap().id).collect();

    engine.repack_tree().unwrap();
    check_invariants(&engine, &config);

    let after: HashSet<Id> = engine.iterator(true).map(|r| r.unwrap().id).collect();
    assert_eq!(before, after);
}

#[test]
fn metric_call_count_is_nonzero_after_inserts_and_searches() {
    let engine = new_string_engine(Config::new());
    let mut rng = rand::thread_rng();
    let pairs: Vec<(Point, Option<String>)> = (0..50).map(|i| (random_point(&mut rng), Some(i.to_string()))).collect();
    engine.add_batch(pairs).unwrap();
    let before = engine.distance_metric_execution_count();
    engine.knn_search(random_point(&mut rng), 3).unwrap();
    assert!(engine.distance_metric_execution_count() > before);
}

// -- fuzz: arbitrary-driven op sequences --------------------------------------
//
// A byte string is turned into a sequence of tree operations and
// invariants are checked after each one, instead of hand-picking batch
// sizes and orderings the way the scenario tests above do.

use arbitrary::{Arbitrary, Unstructured};

#[derive(Debug, Arbitrary)]
enum Op {
    AddBatch(Vec<(i8, i8)>),
    Repack,
    Knn(i8, i8, u8),
}

fn init_logger() {
    let _ = env_logger::try_init();
}

fn run_fuzz_seed(seed: &[u8]) {
    let config = Config::new().with_branching_factor(4).with_max_tuples_per_page(6);
    let engine = new_string_engine(config);
    let mut u = Unstructured::new(seed);
    let mut next_id = 0_u64;

    while let Ok(op) = Op::arbitrary(&mut u) {
        match op {
            Op::AddBatch(points) if !points.is_empty() => {
                let pairs: Vec<(Point, Option<String>)> = points
                    .into_iter()
                    .map(|(a, b)| {
                        let id = next_id;
                        next_id += 1;
                        ((a as f64, b as f64), Some(id.to_string()))
                    })
                    .collect();
                engine.add_batch(pairs).unwrap();
                check_invariants(&engine, &config);
            }
            Op::AddBatch(_) => {}
            Op::Repack => {
                engine.repack_tree().unwrap();
                check_invariants(&engine, &config);
            }
            Op::Knn(a, b, k) => {
                let k = (k % 5) as usize + 1;
                let results = engine.knn_search((a as f64, b as f64), k).unwrap();
                assert!(results.len() <= k);
            }
        }
    }
}

#[test]
fn fuzz_arbitrary_op_sequences_preserve_invariants() {
    init_logger();
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let seed: Vec<u8> = (0..256).map(|_| rng.gen::<u8>()).collect();
        run_fuzz_seed(&seed);
    }
}

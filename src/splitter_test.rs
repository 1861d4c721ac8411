use super::*;
use crate::id::Id;

fn euclid(a: &f64, b: &f64) -> f64 {
    (a - b).abs()
}

fn tuple(key: f64) -> Tuple<f64, ()> {
    Tuple::new(Id::new(), key, None)
}

#[test]
fn test_pick_centers_picks_extremes() {
    let metric = VerifiedMetric::new(euclid);
    let keys = vec![5.0, 0.0, 10.0, 4.0];
    let (i, j) = pick_centers(&keys, &metric).unwrap();
    let picked: Vec<f64> = vec![keys[i], keys[j]];
    assert!(picked.contains(&0.0));
    assert!(picked.contains(&10.0));
}

#[test]
fn test_split_tuples_separates_by_distance() {
    let metric = VerifiedMetric::new(euclid);
    let tuples = vec![
        tuple(0.0),
        tuple(1.0),
        tuple(2.0),
        tuple(100.0),
        tuple(101.0),
        tuple(102.0),
    ];
    let (a, b) = split_tuples(tuples, &metric, false).unwrap();
    assert!(!a.tuples.is_empty());
    assert!(!b.tuples.is_empty());
    assert_eq!(a.tuples.len() + b.tuples.len(), 6);

    let low_group_len = if a.center < 50.0 { a.tuples.len() } else { b.tuples.len() };
    assert_eq!(low_group_len, 3);
}

#[test]
fn test_split_tuples_radius_is_exact_max() {
    let metric = VerifiedMetric::new(euclid);
    let tuples = vec![tuple(0.0), tuple(1.0), tuple(2.0), tuple(10.0)];
    let (a, b) = split_tuples(tuples, &metric, false).unwrap();
    for stub in [&a, &b] {
        let expect = stub
            .tuples
            .iter()
            .map(|t| (t.key - stub.center).abs())
            .fold(0.0_f64, f64::max);
        assert!((stub.radius - expect).abs() < 1e-9);
    }
}

#[test]
fn test_split_never_leaves_a_side_empty() {
    let metric = VerifiedMetric::new(|_a: &f64, _b: &f64| 0.0);
    let tuples = vec![tuple(5.0), tuple(5.0), tuple(5.0)];
    let (a, b) = split_tuples(tuples, &metric, false).unwrap();
    assert!(!a.tuples.is_empty());
    assert!(!b.tuples.is_empty());
}

#[test]
fn test_alternate_tiebreak_flips_assignment() {
    let metric = VerifiedMetric::new(|_a: &f64, _b: &f64| 1.0);
    let tuples = vec![tuple(1.0), tuple(2.0), tuple(3.0), tuple(4.0)];
    let (a1, _b1) = split_tuples(tuples.clone(), &metric, false).unwrap();
    let (a2, _b2) = split_tuples(tuples, &metric, true).unwrap();
    assert_ne!(a1.tuples.len(), 0);
    assert_ne!(a2.tuples.len(), 0);
}

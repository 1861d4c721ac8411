//! Module `splitter` implements the pure geometry of dividing an
//! over-full set of tuples into two spheres: picking two far-apart
//! centers and partitioning every tuple to its nearer one.

use crate::{
    error::Result,
    metric::{Metric, VerifiedMetric},
    types::Tuple,
};

/// A prospective leaf produced by a split: a center, the exact radius
/// over its tuples, and the tuples themselves.
#[derive(Clone, Debug)]
pub struct Stub<K, V> {
    pub center: K,
    pub radius: f64,
    pub tuples: Vec<Tuple<K, V>>,
}

/// Farthest-pair heuristic: pick an arbitrary key, find the key farthest
/// from it, then the key farthest from *that*. The two indices returned
/// are used as split centers; this is the classic approximation used by
/// ball-tree construction since the true farthest pair is quadratic to
/// find exactly.
pub fn pick_centers<K, M>(keys: &[K], metric: &VerifiedMetric<K, M>) -> Result<(usize, usize)>
where
    M: Metric<K>,
{
    assert!(keys.len() >= 2, "pick_centers requires at least two keys");

    let mut far_from_first = 0_usize;
    let mut best = -1.0_f64;
    for (i, k) in keys.iter().enumerate().skip(1) {
        let d = metric.distance(&keys[0], k)?;
        if d > best {
            best = d;
            far_from_first = i;
        }
    }

    let mut far_from_second = if far_from_first == 0 { 1 } else { 0 };
    let mut best = -1.0_f64;
    for (i, k) in keys.iter().enumerate() {
        if i == far_from_first {
            continue;
        }
        let d = metric.distance(&keys[far_from_first], k)?;
        if d > best {
            best = d;
            far_from_second = i;
        }
    }

    Ok((far_from_first, far_from_second))
}

/// Partition `tuples` into two stubs around two far-apart centers.
///
/// Ties (a tuple equidistant from both centers) are broken by
/// alternating which stub wins, controlled by `alternate_tiebreak`'s
/// initial value, so that repeated splits of symmetric input don't
/// collapse every tie onto the same side.
pub fn split_tuples<K, V, M>(
    tuples: Vec<Tuple<K, V>>,
    metric: &VerifiedMetric<K, M>,
    alternate_tiebreak: bool,
) -> Result<(Stub<K, V>, Stub<K, V>)>
where
    K: Clone,
    M: Metric<K>,
{
    assert!(
        tuples.len() >= 2,
        "split_tuples requires at least two tuples"
    );

    let keys: Vec<K> = tuples.iter().map(|t| t.key.clone()).collect();
    let (i, j) = pick_centers(&keys, metric)?;
    let center_a = keys[i].clone();
    let center_b = keys[j].clone();

    let mut tuples_a = Vec::new();
    let mut tuples_b = Vec::new();
    let mut tiebreak = alternate_tiebreak;

    for tuple in tuples {
        let da = metric.distance(&center_a, &tuple.key)?;
        let db = metric.distance(&center_b, &tuple.key)?;
        let goes_a = if (da - db).abs() < f64::EPSILON {
            tiebreak = !tiebreak;
            tiebreak
        } else {
            da < db
        };
        if goes_a {
            tuples_a.push(tuple);
        } else {
            tuples_b.push(tuple);
        }
    }

    // A center must never end up alone on the other side's list; if a
    // split is asked for on already-degenerate input one side can end
    // up empty. Rebalance by moving one tuple across so neither stub is
    // empty, preserving the ball-tree invariant that every leaf holds
    // at least one tuple.
    if tuples_a.is_empty() && !tuples_b.is_empty() {
        tuples_a.push(tuples_b.remove(0));
    } else if tuples_b.is_empty() && !tuples_a.is_empty() {
        tuples_b.push(tuples_a.remove(0));
    }

    let radius_a = max_distance(&center_a, &tuples_a, metric)?;
    let radius_b = max_distance(&center_b, &tuples_b, metric)?;

    Ok((
        Stub {
            center: center_a,
            radius: radius_a,
            tuples: tuples_a,
        },
        Stub {
            center: center_b,
            radius: radius_b,
            tuples: tuples_b,
        },
    ))
}

fn max_distance<K, V, M>(
    center: &K,
    tuples: &[Tuple<K, V>],
    metric: &VerifiedMetric<K, M>,
) -> Result<f64>
where
    M: Metric<K>,
{
    let mut radius = 0.0_f64;
    for tuple in tuples {
        let d = metric.distance(center, &tuple.key)?;
        if d > radius {
            radius = d;
        }
    }
    Ok(radius)
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod splitter_test;

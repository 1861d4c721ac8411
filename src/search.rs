//! Module `search` implements `Search`, the best-first descent used for
//! both k-nearest-neighbour and range queries over a `TreeSnapshot`.
//!
//! Descent uses an explicit stack, pruning a subtree whenever its sphere
//! cannot possibly contain a result closer than what is already kept
//! (kNN) or within the query radius (range). Results are only available
//! after `execute()`; calling it twice is a no-op, matching the
//! "results are a one-shot snapshot of the tree at construction time"
//! contract the rest of the core follows (see `iter::TreeIterator`).

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use log::warn;

use crate::{
    error::{Error, Result},
    metric::{Metric, VerifiedMetric},
    traits::TreeSnapshot,
    types::{NodeKind, Tuple},
};

/// What a `Search` is looking for.
#[derive(Clone, Copy, Debug)]
pub enum SearchMode {
    /// The `k` tuples nearest to the probe.
    Knn { k: usize },
    /// Every tuple within `radius` of the probe, in ascending distance
    /// order, computed exactly (no approximation).
    Range { radius: f64 },
}

/// One result: a tuple and its distance from the probe.
#[derive(Clone, Debug)]
pub struct ScoredTuple<K, V> {
    pub tuple: Tuple<K, V>,
    pub distance: f64,
}

struct HeapEntry<K, V> {
    scored: ScoredTuple<K, V>,
}

impl<K, V> PartialEq for HeapEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.scored.distance == other.scored.distance
    }
}
impl<K, V> Eq for HeapEntry<K, V> {}

impl<K, V> PartialOrd for HeapEntry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K, V> Ord for HeapEntry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        // NaN cannot occur: VerifiedMetric rejects it before a distance
        // ever reaches here.
        self.scored
            .distance
            .partial_cmp(&other.scored.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// A single query against a `TreeSnapshot`. Construct, call `execute()`
/// once, then read `results()`.
pub struct Search<K, V, S, M>
where
    S: TreeSnapshot<K, V>,
    M: Metric<K>,
{
    snapshot: S,
    metric: Arc<VerifiedMetric<K, M>>,
    probe: K,
    mode: SearchMode,
    executed: bool,
    results: Vec<ScoredTuple<K, V>>,
}

impl<K, V, S, M> Search<K, V, S, M>
where
    K: Clone,
    V: Clone,
    S: TreeSnapshot<K, V>,
    M: Metric<K>,
{
    pub fn new(snapshot: S, metric: Arc<VerifiedMetric<K, M>>, probe: K, mode: SearchMode) -> Self {
        Search {
            snapshot,
            metric,
            probe,
            mode,
            executed: false,
            results: Vec::new(),
        }
    }

    pub fn execute(&mut self) -> Result<()> {
        if self.executed {
            warn!("Search::execute called a second time; ignoring");
            return Ok(());
        }
        self.executed = true;

        let root = match self.snapshot.root_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        match self.mode {
            SearchMode::Knn { k } => self.execute_knn(root, k)?,
            SearchMode::Range { radius } => self.execute_range(root, radius)?,
        }
        Ok(())
    }

    pub fn results(&self) -> Result<&[ScoredTuple<K, V>]> {
        if !self.executed {
            return Err(Error::State("Search::results called before execute".to_string()));
        }
        Ok(&self.results)
    }

    /// Push an inner node's children onto the (LIFO) descent stack
    /// sorted descending by distance from the probe, so the nearest
    /// child is popped -- and so explored -- first. This is what makes
    /// the descent best-first rather than plain DFS: visiting the
    /// closest subtree earliest tightens `inclusion_radius()` sooner,
    /// letting farther siblings get pruned before they are ever opened.
    fn push_children_best_first(&self, stack: &mut Vec<crate::id::Id>, children: &[crate::id::Id]) -> Result<()> {
        let mut scored = Vec::with_capacity(children.len());
        for &id in children {
            if let Some(child) = self.snapshot.get_header(id)? {
                let d = self.metric.distance(&self.probe, &child.center)?;
                scored.push((d, id));
            }
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        stack.extend(scored.into_iter().map(|(_, id)| id));
        Ok(())
    }

    fn inclusion_radius(&self, heap: &BinaryHeap<HeapEntry<K, V>>, k: usize) -> f64 {
        if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map(|e| e.scored.distance).unwrap_or(f64::INFINITY)
        }
    }

    fn execute_knn(&mut self, root: crate::id::Id, k: usize) -> Result<()> {
        if k == 0 {
            return Ok(());
        }
        let mut heap: BinaryHeap<HeapEntry<K, V>> = BinaryHeap::new();
        let mut stack = vec![root];

        while let Some(node_id) = stack.pop() {
            let header = match self.snapshot.get_header(node_id)? {
                Some(h) => h,
                None => continue,
            };
            let d = self.metric.distance(&self.probe, &header.center)?;
            let inclusion = self.inclusion_radius(&heap, k);
            if d > header.radius + inclusion {
                continue;
            }

            match &header.kind {
                NodeKind::Inner { children } => self.push_children_best_first(&mut stack, children)?,
                NodeKind::Leaf { page_id, .. } => {
                    let page = match self.snapshot.get_page(*page_id)? {
                        Some(p) => p,
                        None => continue,
                    };
                    for tuple in page.tuples {
                        let dt = self.metric.distance(&self.probe, &tuple.key)?;
                        if dt <= self.inclusion_radius(&heap, k) || heap.len() < k {
                            heap.push(HeapEntry {
                                scored: ScoredTuple { tuple, distance: dt },
                            });
                            if heap.len() > k {
                                heap.pop();
                            }
                        }
                    }
                }
            }
        }

        let mut scored: Vec<ScoredTuple<K, V>> = heap.into_vec().into_iter().map(|e| e.scored).collect();
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        self.results = scored;
        Ok(())
    }

    fn execute_range(&mut self, root: crate::id::Id, radius: f64) -> Result<()> {
        let mut stack = vec![root];
        let mut found = Vec::new();

        while let Some(node_id) = stack.pop() {
            let header = match self.snapshot.get_header(node_id)? {
                Some(h) => h,
                None => continue,
            };
            let d = self.metric.distance(&self.probe, &header.center)?;
            if d > header.radius + radius {
                continue;
            }

            match &header.kind {
                NodeKind::Inner { children } => self.push_children_best_first(&mut stack, children)?,
                NodeKind::Leaf { page_id, .. } => {
                    let page = match self.snapshot.get_page(*page_id)? {
                        Some(p) => p,
                        None => continue,
                    };
                    for tuple in page.tuples {
                        let dt = self.metric.distance(&self.probe, &tuple.key)?;
                        if dt <= radius {
                            found.push(ScoredTuple { tuple, distance: dt });
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        self.results = found;
        Ok(())
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod search_test;

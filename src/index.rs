//! Module `index` implements `Index`, the thin façade that forms the
//! engine's external surface: it wraps a `TreeEngine` and adds
//! exactly one thing the core engine does not do itself --
//! `ReadWriteMode` enforcement -- before delegating straight through, in
//! the manner of `rdms.rs`'s `Rdms<K, V, I>` wrapping an `Index<K, V>`.

use crate::{
    engine::{CodecSnapshot, TreeEngine},
    error::{Error, Result},
    id::Id,
    iter::TreeIterator,
    metric::Metric,
    search::ScoredTuple,
    stats::TreeStats,
    traits::{Codec, DataStore},
    types::{Config, ReadWriteMode},
};

/// The façade a caller builds a tree against. Owns a `TreeEngine` and
/// enforces `config.read_write_mode` on every call before delegating.
pub struct Index<D, K, V, M, KC, VC>
where
    M: Metric<K>,
{
    engine: TreeEngine<D, K, V, M, KC, VC>,
}

impl<D, K, V, M, KC, VC> Index<D, K, V, M, KC, VC>
where
    D: DataStore,
    K: Clone,
    V: Clone,
    M: Metric<K>,
    KC: Codec<K>,
    VC: Codec<V>,
{
    pub fn new(store: D, metric: M, key_codec: KC, value_codec: VC, config: Config) -> Result<Self> {
        let engine = TreeEngine::new(store, metric, key_codec, value_codec, config)?;
        Ok(Index { engine })
    }

    fn check_write_allowed(&self) -> Result<()> {
        if self.engine.config().read_write_mode == ReadWriteMode::ReadOnly {
            return Err(Error::ModeViolation("add_batch disallowed in ReadOnly mode".to_string()));
        }
        Ok(())
    }

    fn check_read_allowed(&self) -> Result<()> {
        if self.engine.config().read_write_mode == ReadWriteMode::WriteOnly {
            return Err(Error::ModeViolation("search disallowed in WriteOnly mode".to_string()));
        }
        Ok(())
    }

    pub fn add_batch(&self, pairs: Vec<(K, Option<V>)>) -> Result<Id> {
        self.check_write_allowed()?;
        self.engine.add_batch(pairs)
    }

    /// Convenience loop over `add_batch`, one transaction per batch.
    /// Stops and returns the first error; batches already committed
    /// stay committed (each is independently all-or-nothing).
    pub fn add_batches(&self, batches: Vec<Vec<(K, Option<V>)>>) -> Result<Vec<Id>> {
        self.check_write_allowed()?;
        batches.into_iter().map(|batch| self.engine.add_batch(batch)).collect()
    }

    pub fn repack_tree(&self) -> Result<Id> {
        self.check_write_allowed()?;
        self.engine.repack_tree()
    }

    pub fn knn_search(&self, probe: K, k: usize) -> Result<Vec<ScoredTuple<K, V>>> {
        self.check_read_allowed()?;
        self.engine.knn_search(probe, k)
    }

    pub fn closest(&self, probe: K) -> Result<Option<ScoredTuple<K, V>>> {
        self.check_read_allowed()?;
        self.engine.closest(probe)
    }

    pub fn range_search(&self, probe: K, radius: f64) -> Result<Vec<ScoredTuple<K, V>>> {
        self.check_read_allowed()?;
        self.engine.range_search(probe, radius)
    }

    pub fn tree_stats(&self) -> Result<TreeStats> {
        self.check_read_allowed()?;
        self.engine.tree_stats()
    }

    pub fn iterator(&self, prevent_mutation: bool) -> Result<TreeIterator<K, V, CodecSnapshot<'_, D, KC, VC>>> {
        self.check_read_allowed()?;
        Ok(self.engine.iterator(prevent_mutation))
    }

    pub fn distance_metric_execution_count(&self) -> u64 {
        self.engine.distance_metric_execution_count()
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;

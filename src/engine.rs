//! Module `engine` is the glue between the typed tree engine (`builder`,
//! `diff`, `search`, `iter`, `stats` -- all generic over the user's `K`
//! and `V`) and a byte-oriented `DataStore`, through a pair of `Codec`s.
//!
//! `CodecSnapshot` is the production `TreeSnapshot` implementation: it
//! decodes a `DataStore`'s raw records on every read. `TreeEngine` owns
//! the store, the verified metric, the codec pair, and a
//! `TransactionBuilder`, and drives the whole write path (compile against
//! a `CodecSnapshot`, encode the result, hand it to the store) and read
//! path (`Search`, `TreeIterator`, `compute_stats`, all built directly
//! against a `CodecSnapshot`).

use crate::{
    builder::TransactionBuilder,
    error::{Error, Result},
    id::Id,
    iter::TreeIterator,
    metric::{Metric, VerifiedMetric},
    ops::Transaction,
    search::{ScoredTuple, Search, SearchMode},
    stats::{compute_stats, TreeStats},
    traits::{Codec, DataStore, RawHeader, RawPage, RawTransaction, TreeSnapshot},
    types::{Config, DataPage, NodeHeader, Tuple},
};

/// A read-only, typed view over a `DataStore`, decoding every header and
/// page it returns through a key/value codec pair. Holds only
/// references, so it is `Copy`-cheap to construct fresh per query.
pub struct CodecSnapshot<'a, D, KC, VC> {
    store: &'a D,
    key_codec: &'a KC,
    value_codec: &'a VC,
}

impl<'a, D, KC, VC> Clone for CodecSnapshot<'a, D, KC, VC> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, D, KC, VC> Copy for CodecSnapshot<'a, D, KC, VC> {}

impl<'a, D, KC, VC> CodecSnapshot<'a, D, KC, VC> {
    pub fn new(store: &'a D, key_codec: &'a KC, value_codec: &'a VC) -> Self {
        CodecSnapshot {
            store,
            key_codec,
            value_codec,
        }
    }
}

impl<'a, D, K, V, KC, VC> TreeSnapshot<K, V> for CodecSnapshot<'a, D, KC, VC>
where
    D: DataStore,
    KC: Codec<K>,
    VC: Codec<V>,
{
    fn root_id(&self) -> Option<Id> {
        // The core's `TreeSnapshot` contract has no room for a backend
        // error at this seam (`DataStore` puts `root_id` behind a
        // `Result`, but `TreeSnapshot` does not); a backend failure
        // here surfaces as an empty tree rather than a panic.
        // The reference `MemStore` never errors on this call.
        self.store.root_id().unwrap_or(None)
    }

    fn last_transaction_id(&self) -> Option<Id> {
        self.store.last_transaction_id().unwrap_or(None)
    }

    fn get_header(&self, id: Id) -> Result<Option<NodeHeader<K>>> {
        match self.store.get_header(id)? {
            Some(raw) => decode_header(raw, self.key_codec).map(Some),
            None => Ok(None),
        }
    }

    fn get_page(&self, id: Id) -> Result<Option<DataPage<K, V>>> {
        match self.store.get_page(id)? {
            Some(raw) => decode_page(raw, self.key_codec, self.value_codec).map(Some),
            None => Ok(None),
        }
    }
}

fn decode_header<K, KC>(raw: RawHeader, key_codec: &KC) -> Result<NodeHeader<K>>
where
    KC: Codec<K>,
{
    let center = key_codec
        .decode(Some(&raw.center))?
        .ok_or_else(|| Error::Invariant("key codec decoded a node center to an absent key".to_string()))?;
    Ok(NodeHeader {
        id: raw.id,
        parent: raw.parent,
        center,
        radius: raw.radius,
        kind: raw.kind,
    })
}

fn decode_page<K, V, KC, VC>(raw: RawPage, key_codec: &KC, value_codec: &VC) -> Result<DataPage<K, V>>
where
    KC: Codec<K>,
    VC: Codec<V>,
{
    let mut tuples = Vec::with_capacity(raw.tuples.len());
    for t in raw.tuples {
        let key = key_codec
            .decode(Some(&t.key))?
            .ok_or_else(|| Error::Invariant("key codec decoded a tuple key to an absent key".to_string()))?;
        let value = value_codec.decode(t.value.as_deref())?;
        tuples.push(Tuple::new(t.id, key, value));
    }
    Ok(DataPage::new(tuples))
}

fn encode_header<K, KC>(header: NodeHeader<K>, key_codec: &KC) -> Result<RawHeader>
where
    KC: Codec<K>,
{
    let center = key_codec
        .encode(Some(&header.center))?
        .ok_or_else(|| Error::Invariant("key codec encoded a node center to absent bytes".to_string()))?;
    Ok(NodeHeader {
        id: header.id,
        parent: header.parent,
        center,
        radius: header.radius,
        kind: header.kind,
    })
}

fn encode_page<K, V, KC, VC>(page: DataPage<K, V>, key_codec: &KC, value_codec: &VC) -> Result<RawPage>
where
    KC: Codec<K>,
    VC: Codec<V>,
{
    let mut tuples = Vec::with_capacity(page.tuples.len());
    for t in page.tuples {
        let key = key_codec
            .encode(Some(&t.key))?
            .ok_or_else(|| Error::Invariant("key codec encoded a tuple key to absent bytes".to_string()))?;
        let value = value_codec.encode(t.value.as_ref())?;
        tuples.push(Tuple::new(t.id, key, value));
    }
    Ok(DataPage::new(tuples))
}

fn encode_transaction<K, V, KC, VC>(txn: Transaction<K, V>, key_codec: &KC, value_codec: &VC) -> Result<RawTransaction>
where
    KC: Codec<K>,
    VC: Codec<V>,
{
    let mut raw = RawTransaction::new(txn.expected_tree_id, txn.transaction_id);
    raw.new_root = txn.new_root;
    for header in txn.created_nodes {
        raw.created_nodes.push(encode_header(header, key_codec)?);
    }
    for header in txn.updated_nodes {
        raw.updated_nodes.push(encode_header(header, key_codec)?);
    }
    for (id, page) in txn.staged_pages {
        raw.staged_pages.push((id, encode_page(page, key_codec, value_codec)?));
    }
    raw.deleted_headers = txn.deleted_headers;
    raw.deleted_pages = txn.deleted_pages;
    raw.created_tuples = txn.created_tuples;
    raw.updated_tuples = txn.updated_tuples;
    Ok(raw)
}

/// Owns everything a tree needs: the `DataStore` backend, the codec
/// pair translating user types to and from its bytes, and the
/// `TransactionBuilder` that compiles batches against it. This is the
/// core engine `index.rs`'s thin façade wraps; nothing here enforces
/// `ReadWriteMode` -- that is the façade's job.
pub struct TreeEngine<D, K, V, M, KC, VC>
where
    M: Metric<K>,
{
    store: D,
    builder: TransactionBuilder<K, M>,
    key_codec: KC,
    value_codec: VC,
    config: Config,
    _value: std::marker::PhantomData<V>,
}

impl<D, K, V, M, KC, VC> TreeEngine<D, K, V, M, KC, VC>
where
    D: DataStore,
    K: Clone,
    V: Clone,
    M: Metric<K>,
    KC: Codec<K>,
    VC: Codec<V>,
{
    pub fn new(store: D, metric: M, key_codec: KC, value_codec: VC, config: Config) -> Result<Self> {
        let builder = TransactionBuilder::new(metric, config)?;
        Ok(TreeEngine {
            store,
            builder,
            key_codec,
            value_codec,
            config,
            _value: std::marker::PhantomData,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn distance_metric_execution_count(&self) -> u64 {
        self.builder.distance_metric_execution_count()
    }

    fn snapshot(&self) -> CodecSnapshot<'_, D, KC, VC> {
        CodecSnapshot::new(&self.store, &self.key_codec, &self.value_codec)
    }

    /// Compile `pairs` into one transaction and commit it. Returns the
    /// new transaction id on success; a concurrent writer since the
    /// snapshot was taken surfaces as `Error::ConcurrentModification`
    /// from the backend.
    pub fn add_batch(&self, pairs: Vec<(K, Option<V>)>) -> Result<Id> {
        let txn = self.builder.compile_batch(&self.snapshot(), pairs)?;
        let raw = encode_transaction(txn, &self.key_codec, &self.value_codec)?;
        self.store.apply_transaction(raw)
    }

    /// Rebuild the oldest leaf `leaf_count - 2` times.
    pub fn repack_tree(&self) -> Result<Id> {
        let txn = self.builder.compile_repack_all(&self.snapshot())?;
        let raw = encode_transaction(txn, &self.key_codec, &self.value_codec)?;
        self.store.apply_transaction(raw)
    }

    pub fn knn_search(&self, probe: K, k: usize) -> Result<Vec<ScoredTuple<K, V>>> {
        if k < 1 {
            return Err(Error::Misuse("knn_search requires k >= 1".to_string()));
        }
        let mut search = Search::new(self.snapshot(), self.builder.shared_metric(), probe, SearchMode::Knn { k });
        search.execute()?;
        Ok(search.results()?.to_vec())
    }

    /// The single nearest tuple to `probe`, if the tree is non-empty.
    pub fn closest(&self, probe: K) -> Result<Option<ScoredTuple<K, V>>> {
        Ok(self.knn_search(probe, 1)?.into_iter().next())
    }

    pub fn range_search(&self, probe: K, radius: f64) -> Result<Vec<ScoredTuple<K, V>>> {
        if !(radius > 0.0) {
            return Err(Error::Misuse("range_search requires radius > 0".to_string()));
        }
        let mut search = Search::new(self.snapshot(), self.builder.shared_metric(), probe, SearchMode::Range { radius });
        search.execute()?;
        Ok(search.results()?.to_vec())
    }

    pub fn tree_stats(&self) -> Result<TreeStats> {
        compute_stats(&self.snapshot())
    }

    pub fn iterator(&self, prevent_mutation: bool) -> TreeIterator<K, V, CodecSnapshot<'_, D, KC, VC>> {
        let snapshot = self.snapshot();
        if prevent_mutation {
            TreeIterator::new(snapshot)
        } else {
            TreeIterator::permissive(snapshot)
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

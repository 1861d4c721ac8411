//! Module `traits` defines the seams the core engine is built against:
//! the storage contract (`DataStore`), the byte encoding contract
//! (`Codec`), and the typed read-only view the query algorithms walk
//! (`TreeSnapshot`).

use crate::{
    error::Result,
    id::Id,
    types::{DataPage, NodeHeader},
};

/// A raw, byte-keyed node header as persisted by a backend. The core
/// engine never constructs one of these directly; it stages typed
/// `ElementaryOp`s which `engine::CodecSnapshot` turns into raw headers
/// for the backend.
pub type RawHeader = NodeHeader<Vec<u8>>;

/// A raw, byte-keyed data page as persisted by a backend.
pub type RawPage = DataPage<Vec<u8>, Vec<u8>>;

/// A committed changeset, as handed to `DataStore::apply_transaction`.
pub type RawTransaction = crate::ops::Transaction<Vec<u8>, Vec<u8>>;

/// The storage boundary a tree is built on. Implementors own node
/// headers, data pages, and the small bookkeeping tables (`root_id`,
/// `last_transaction_id`) a tree needs to detect concurrent writers and
/// find its current root.
///
/// All mutation goes through `apply_transaction`: a `DataStore` never
/// exposes a way to mutate a single header or page in isolation, so
/// every write is all-or-nothing from the caller's point of view.
pub trait DataStore {
    fn root_id(&self) -> Result<Option<Id>>;

    fn last_transaction_id(&self) -> Result<Option<Id>>;

    fn get_header(&self, id: Id) -> Result<Option<RawHeader>>;

    fn get_page(&self, id: Id) -> Result<Option<RawPage>>;

    /// Apply a transaction atomically, checking `expected_tree_id`
    /// against the store's current `last_transaction_id` before writing
    /// anything. Returns the id assigned to this transaction.
    fn apply_transaction(&self, txn: RawTransaction) -> Result<Id>;

    /// All node ids currently live in the store. Intended for test
    /// harnesses and `stats`/`iterator` callers that need a full sweep,
    /// not for the hot query path.
    fn all_node_ids(&self) -> Result<Vec<Id>>;

    /// All page ids currently live in the store.
    fn all_page_ids(&self) -> Result<Vec<Id>>;
}

/// Converts a typed value to and from the bytes a `DataStore` persists.
///
/// Signatures take and return `Option` so the same codec can describe a
/// tuple's absent value (`Tuple.value: None`) as well as a present one --
/// see `codec::VoidCodec` for the degenerate case where `T` is always
/// absent.
pub trait Codec<T> {
    fn encode(&self, value: Option<&T>) -> Result<Option<Vec<u8>>>;

    fn decode(&self, bytes: Option<&[u8]>) -> Result<Option<T>>;
}

/// The read-only, typed view that `Search`, `TreeIterator`, and
/// `compute_stats` walk. `engine::CodecSnapshot` is the production
/// implementation, decoding a `DataStore`'s raw bytes through a pair of
/// `Codec`s; tests may implement this trait directly against an
/// in-memory map to exercise the query algorithms without a codec round
/// trip.
pub trait TreeSnapshot<K, V> {
    fn root_id(&self) -> Option<Id>;

    fn last_transaction_id(&self) -> Option<Id>;

    fn get_header(&self, id: Id) -> Result<Option<NodeHeader<K>>>;

    fn get_page(&self, id: Id) -> Result<Option<DataPage<K, V>>>;
}

/// Any reference to a `TreeSnapshot` is itself one. Lets `Search` and
/// `TreeIterator` hold their snapshot by value -- so a facade can hand
/// them an owned, cheaply-copyable `CodecSnapshot` -- while existing
/// call sites that pass a plain `&Snapshot` keep working unchanged.
impl<K, V, T> TreeSnapshot<K, V> for &T
where
    T: TreeSnapshot<K, V> + ?Sized,
{
    fn root_id(&self) -> Option<Id> {
        (**self).root_id()
    }

    fn last_transaction_id(&self) -> Option<Id> {
        (**self).last_transaction_id()
    }

    fn get_header(&self, id: Id) -> Result<Option<NodeHeader<K>>> {
        (**self).get_header(id)
    }

    fn get_page(&self, id: Id) -> Result<Option<DataPage<K, V>>> {
        (**self).get_page(id)
    }
}

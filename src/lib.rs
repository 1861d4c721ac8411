//! `orbitree` is a durable similarity-search index over a metric space,
//! backed by a ball-tree of spheres.
//!
//! Every indexed item is a `(key, value)` pair where `key` lives in some
//! caller-defined metric space (any type paired with a `Metric<K>`
//! distance function) and `value` is an arbitrary payload. Items are
//! grouped into balls: a sphere with a center and a radius bounding
//! every item beneath it. Leaves hold the items directly; inner nodes
//! bound their children's spheres. Nearest-neighbour and range queries
//! prune whole subtrees whose sphere cannot contain a result, the same
//! idea as an R-tree or a VP-tree, specialized to a single always-split,
//! always-repack ball hierarchy.
//!
//! The core engine (`TransactionBuilder`, `DiffTracker`, `Splitter`,
//! `Search`, `TreeIterator`, `compute_stats`) is generic over any
//! `DataStore` backend and is backend-agnostic: it stages every mutation
//! of a batch into one `Transaction`, checked against the backend's
//! current transaction id with optimistic concurrency before being
//! applied atomically. [`MemStore`] is the reference in-memory backend; callers
//! wanting a durable one implement [`DataStore`] themselves.
//!
//! [`Index`] is the façade most callers reach for directly: it wraps a
//! [`TreeEngine`] (the typed engine over a `DataStore` plus a `Codec`
//! pair) and enforces [`ReadWriteMode`].

mod batch;
mod builder;
mod codec;
mod diff;
mod engine;
mod error;
mod id;
mod index;
mod iter;
mod mem_store;
mod metric;
mod ops;
mod search;
mod splitter;
mod stats;
mod traits;
mod types;

pub use crate::batch::Batch;
pub use crate::builder::{SplitMode, TransactionBuilder};
pub use crate::codec::{BytesCodec, NumericCodec, Utf8Codec, VoidCodec};
pub use crate::diff::DiffTracker;
pub use crate::engine::{CodecSnapshot, TreeEngine};
pub use crate::error::{Error, Result};
pub use crate::id::Id;
pub use crate::index::Index;
pub use crate::iter::TreeIterator;
pub use crate::mem_store::MemStore;
pub use crate::metric::{Metric, VerifiedMetric};
pub use crate::ops::{ElementaryOp, Transaction};
pub use crate::search::{ScoredTuple, Search, SearchMode};
pub use crate::splitter::{pick_centers, split_tuples, Stub};
pub use crate::stats::{compute_stats, TreeStats};
pub use crate::traits::{Codec, DataStore, RawHeader, RawPage, RawTransaction, TreeSnapshot};
pub use crate::types::{Config, DataPage, NodeHeader, NodeKind, ReadWriteMode, RepackingMode, Tuple};

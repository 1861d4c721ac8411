//! Module `types` defines the on-storage shapes shared by the tree engine
//! and every `DataStore` backend: tuples, data pages, node headers, and
//! the `Config` a tree is built with.

use crate::id::Id;

/// A single indexed item: a key in the metric space, an optional value,
/// and the id it was assigned at insertion time.
///
/// `value` is `Option<V>` so that a `Codec<V>` can be used uniformly for
/// tuples that carry no payload (see `codec::VoidCodec`).
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple<K, V> {
    pub id: Id,
    pub key: K,
    pub value: Option<V>,
}

impl<K, V> Tuple<K, V> {
    pub fn new(id: Id, key: K, value: Option<V>) -> Tuple<K, V> {
        Tuple { id, key, value }
    }
}

/// The tuples physically stored under a leaf's `page_id`.
///
/// Leaves reference a `DataPage` indirectly through an id rather than
/// embedding tuples in the header, so that a backend can version or
/// garbage-collect pages independently of header mutations.
#[derive(Clone, Debug, Default)]
pub struct DataPage<K, V> {
    pub tuples: Vec<Tuple<K, V>>,
}

impl<K, V> DataPage<K, V> {
    pub fn new(tuples: Vec<Tuple<K, V>>) -> DataPage<K, V> {
        DataPage { tuples }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

/// Discriminates the two shapes a `NodeHeader` can take.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Inner { children: Vec<Id> },
    Leaf { page_id: Id, tuple_count: usize },
}

impl NodeKind {
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Leaf { .. })
    }

    pub fn is_inner(&self) -> bool {
        matches!(self, NodeKind::Inner { .. })
    }
}

/// A node in the ball tree: a sphere (`center`, `radius`) plus either a
/// list of children (inner node) or a reference to the page holding its
/// tuples (leaf). Inner radii overestimate the true bound of their
/// children's spheres; leaf radii are exact over their tuples.
#[derive(Clone, Debug)]
pub struct NodeHeader<K> {
    pub id: Id,
    pub parent: Option<Id>,
    pub center: K,
    pub radius: f64,
    pub kind: NodeKind,
}

impl<K> NodeHeader<K> {
    pub fn new_leaf(id: Id, parent: Option<Id>, center: K, radius: f64, page_id: Id, tuple_count: usize) -> Self {
        NodeHeader {
            id,
            parent,
            center,
            radius,
            kind: NodeKind::Leaf { page_id, tuple_count },
        }
    }

    pub fn new_inner(id: Id, parent: Option<Id>, center: K, radius: f64, children: Vec<Id>) -> Self {
        NodeHeader {
            id,
            parent,
            center,
            radius,
            kind: NodeKind::Inner { children },
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    pub fn children(&self) -> &[Id] {
        match &self.kind {
            NodeKind::Inner { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    pub fn page_id(&self) -> Option<Id> {
        match &self.kind {
            NodeKind::Leaf { page_id, .. } => Some(*page_id),
            NodeKind::Inner { .. } => None,
        }
    }

    pub fn tuple_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf { tuple_count, .. } => *tuple_count,
            NodeKind::Inner { .. } => 0,
        }
    }
}

/// How oldest-leaf rebuilding is scheduled after a batch commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepackingMode {
    /// No incremental rebuilding; leaves only shrink/grow via ordinary
    /// splits and the immediate per-leaf repack every split-created leaf
    /// gets.
    None,
    /// After each batch, on top of the repack every split-created leaf
    /// always gets, rebuild `floor(ln(leaf_count)) + 1` of the oldest
    /// leaves that exist once split propagation has settled.
    IncrementalLn,
}

impl Default for RepackingMode {
    fn default() -> Self {
        RepackingMode::None
    }
}

/// Enforced by the façade (`index.rs`), not the core engine, but shared
/// here so both layers speak the same vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadWriteMode {
    ReadOnly,
    WriteOnly,
    ReadAndWrite,
}

impl Default for ReadWriteMode {
    fn default() -> Self {
        ReadWriteMode::ReadAndWrite
    }
}

/// Tree-wide parameters, validated once at construction.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub branching_factor: usize,
    pub max_tuples_per_page: usize,
    pub repacking_mode: RepackingMode,
    pub read_write_mode: ReadWriteMode,
}

impl Config {
    pub const DEFAULT_BRANCHING_FACTOR: usize = 64;
    pub const DEFAULT_MAX_TUPLES_PER_PAGE: usize = 50;

    pub fn new() -> Config {
        Config {
            branching_factor: Self::DEFAULT_BRANCHING_FACTOR,
            max_tuples_per_page: Self::DEFAULT_MAX_TUPLES_PER_PAGE,
            repacking_mode: RepackingMode::None,
            read_write_mode: ReadWriteMode::ReadAndWrite,
        }
    }

    pub fn with_branching_factor(mut self, n: usize) -> Self {
        self.branching_factor = n;
        self
    }

    pub fn with_max_tuples_per_page(mut self, n: usize) -> Self {
        self.max_tuples_per_page = n;
        self
    }

    pub fn with_repacking_mode(mut self, mode: RepackingMode) -> Self {
        self.repacking_mode = mode;
        self
    }

    pub fn with_read_write_mode(mut self, mode: ReadWriteMode) -> Self {
        self.read_write_mode = mode;
        self
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.branching_factor < 2 {
            let msg = format!("branching_factor {} < 2", self.branching_factor);
            return Err(crate::error::Error::Misuse(msg));
        }
        if self.max_tuples_per_page < 5 {
            let msg = format!("max_tuples_per_page {} < 5", self.max_tuples_per_page);
            return Err(crate::error::Error::Misuse(msg));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

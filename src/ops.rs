//! Module `ops` defines the elementary per-tuple operations a batch
//! compiles down to, and the `Transaction` those operations (plus the
//! structural splitting/repacking work) eventually produce.

use crate::{id::Id, types::Tuple};

/// One unreduced effect of assigning a single tuple to the tree.
///
/// `TransactionBuilder::collect_ops_for_tuples` walks each tuple down to
/// its target leaf and emits a handful of these; `reduce_and_stage` then
/// groups them by target id and folds each group down to one staged
/// mutation (max radius per ancestor, summed tuple count per leaf)
/// before anything is written to the `DiffTracker`.
#[derive(Clone, Debug)]
pub enum ElementaryOp<K, V> {
    /// The tree is empty: create a root leaf centered on this tuple's
    /// key, holding just this tuple.
    CreateRoot { id: Id, tuple: Tuple<K, V> },
    /// Widen an ancestor's radius to cover a newly assigned tuple. Folded
    /// with `f64::max` across all ops targeting the same node id.
    IncreaseRadius { id: Id, radius: f64 },
    /// Assign a tuple to a leaf's page. Folded by concatenating all
    /// tuples assigned to the same leaf id in one group.
    AssignTuple { leaf_id: Id, tuple: Tuple<K, V> },
}

impl<K, V> ElementaryOp<K, V> {
    pub fn target_id(&self) -> Id {
        match self {
            ElementaryOp::CreateRoot { id, .. } => *id,
            ElementaryOp::IncreaseRadius { id, .. } => *id,
            ElementaryOp::AssignTuple { leaf_id, .. } => *leaf_id,
        }
    }
}

/// The atomic changeset a compiled batch produces. A `DataStore`
/// implementation applies this all-or-nothing, checking
/// `expected_tree_id` against its current `last_transaction_id` before
/// writing anything.
#[derive(Clone, Debug, Default)]
pub struct Transaction<K, V> {
    /// The backend's `last_transaction_id` the builder staged against;
    /// `None` means no transaction had ever committed when the batch was
    /// compiled. A backend rejects the transaction if its current
    /// `last_transaction_id` does not match this -- the optimistic
    /// concurrency check that guards against lost updates. Tracking the
    /// transaction id rather than the root id matters: most batches
    /// never touch the root (no split), so a root-based check would
    /// miss a conflicting
    /// write that only mutated an existing leaf.
    pub expected_tree_id: Option<Id>,
    /// Fresh id identifying this transaction itself, minted by the
    /// builder that compiled it (not by the backend at apply time) so a
    /// `DataStore` only ever records a transaction id it was handed.
    pub transaction_id: Id,
    /// The root id after this transaction commits.
    pub new_root: Option<Id>,
    /// Node headers genuinely new to the tree in this transaction (root
    /// seed, push-down root, a split's fresh sibling, a rebuild's
    /// replacement leaf).
    pub created_nodes: Vec<crate::types::NodeHeader<K>>,
    /// Node headers that existed before this transaction and are staged
    /// with new contents (the reused side of a split, a repacked leaf,
    /// an ancestor widened by `IncreaseRadius`).
    pub updated_nodes: Vec<crate::types::NodeHeader<K>>,
    pub staged_pages: Vec<(Id, crate::types::DataPage<K, V>)>,
    pub deleted_headers: Vec<Id>,
    pub deleted_pages: Vec<Id>,
    /// Tuple ids genuinely new to the tree in this transaction.
    pub created_tuples: Vec<Id>,
    /// Tuple ids that existed before this transaction and were
    /// reassigned to a different leaf (split, repack, or rebuild).
    pub updated_tuples: Vec<Id>,
}

impl<K, V> Transaction<K, V> {
    pub fn new(expected_tree_id: Option<Id>, transaction_id: Id) -> Self {
        Transaction {
            expected_tree_id,
            transaction_id,
            new_root: None,
            created_nodes: Vec::new(),
            updated_nodes: Vec::new(),
            staged_pages: Vec::new(),
            deleted_headers: Vec::new(),
            deleted_pages: Vec::new(),
            created_tuples: Vec::new(),
            updated_tuples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.created_nodes.is_empty()
            && self.updated_nodes.is_empty()
            && self.staged_pages.is_empty()
            && self.deleted_headers.is_empty()
            && self.deleted_pages.is_empty()
    }
}

//! Module `builder` implements `TransactionBuilder`, the component that
//! compiles a drained batch into a `Transaction`: walking tuples to
//! their target leaves, splitting over-full nodes, propagating radius
//! growth and structural changes up to the root, and (in
//! `RepackingMode::IncrementalLn`) rebuilding a handful of stale leaves
//! per batch.
//!
//! Every walk here uses an explicit stack rather than recursion, so a
//! pathologically deep tree cannot blow the call stack.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::debug;

use crate::{
    diff::DiffTracker,
    error::{Error, Result},
    id::Id,
    metric::{Metric, VerifiedMetric},
    ops::{ElementaryOp, Transaction},
    splitter::{self, Stub},
    traits::TreeSnapshot,
    types::{Config, DataPage, NodeHeader, NodeKind, RepackingMode, Tuple},
};

fn invariant(msg: impl Into<String>) -> Error {
    Error::Invariant(msg.into())
}

/// Distinguishes split propagation triggered by ordinary batch insertion
/// (`Quick`, whose resulting leaves are registered as repack seeds so the
/// immediate post-propagation repack pass picks them up) from propagation
/// triggered from inside a repack or rebuild's own reinsertion (`Careful`,
/// which does not register further seeds -- a repack that itself splits
/// is left for a later batch's repacking pass to smooth out).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMode {
    Quick,
    Careful,
}

pub struct TransactionBuilder<K, M>
where
    M: Metric<K>,
{
    metric: Arc<VerifiedMetric<K, M>>,
    config: Config,
}

impl<K, M> TransactionBuilder<K, M>
where
    K: Clone,
    M: Metric<K>,
{
    pub fn new(metric: M, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(TransactionBuilder {
            metric: Arc::new(VerifiedMetric::new(metric)),
            config,
        })
    }

    /// Build around a metric already shared with other components (e.g.
    /// a `Search`), so call counts aggregate across both.
    pub fn with_shared_metric(metric: Arc<VerifiedMetric<K, M>>, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(TransactionBuilder { metric, config })
    }

    pub fn shared_metric(&self) -> Arc<VerifiedMetric<K, M>> {
        Arc::clone(&self.metric)
    }

    pub fn distance_metric_execution_count(&self) -> u64 {
        self.metric.call_count()
    }

    /// Compile one drained batch against `base` into a `Transaction`.
    pub fn compile_batch<V, S>(
        &self,
        base: &S,
        pairs: Vec<(K, Option<V>)>,
    ) -> Result<Transaction<K, V>>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut tracker = DiffTracker::new(base);
        let tuples: Vec<Tuple<K, V>> = pairs
            .into_iter()
            .map(|(key, value)| Tuple::new(Id::new(), key, value))
            .collect();
        for tuple in &tuples {
            tracker.register_new_tuple_id(tuple.id);
        }

        let touched = self.insert_tuples(&mut tracker, tuples)?;
        self.propagate_splits(&mut tracker, touched, SplitMode::Quick)?;

        // Every leaf a split created this batch gets an immediate,
        // full-tree-aware repack, regardless of `repacking_mode`.
        for seed_id in tracker.drain_repack_seeds() {
            self.repack_leaf(&mut tracker, seed_id)?;
        }

        // `repacking_mode` additionally schedules a handful of
        // oldest-leaf rebuilds per batch.
        let rebuilds = self.num_leaves_to_rebuild(&tracker)?;
        debug!("scheduling {} oldest-leaf rebuild(s) this batch", rebuilds);
        for _ in 0..rebuilds {
            self.rebuild_oldest_leaf(&mut tracker)?;
        }

        Ok(tracker.into_transaction())
    }

    /// Rebuild the oldest leaf `leaf_count - 2` times, regardless of
    /// `repacking_mode`. Used by the façade's on-demand `repack_tree`.
    pub fn compile_repack_all<V, S>(&self, base: &S) -> Result<Transaction<K, V>>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut tracker = DiffTracker::new(base);
        let leaf_count = self.collect_all_leaves(&tracker)?.len();
        for _ in 0..leaf_count.saturating_sub(2) {
            self.rebuild_oldest_leaf(&mut tracker)?;
        }
        Ok(tracker.into_transaction())
    }

    /// `NONE` rebuilds nothing; `INCREMENTAL_LN` rebuilds
    /// `floor(ln(leaf_count)) + 1` of the oldest leaves.
    fn num_leaves_to_rebuild<V, S>(&self, tracker: &DiffTracker<K, V, S>) -> Result<usize>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        match self.config.repacking_mode {
            RepackingMode::None => Ok(0),
            RepackingMode::IncrementalLn => {
                let leaf_count = self.collect_all_leaves(tracker)?.len();
                if leaf_count == 0 {
                    Ok(0)
                } else {
                    Ok((leaf_count as f64).ln().floor() as usize + 1)
                }
            }
        }
    }

    // -- insertion -----------------------------------------------------

    /// Assign every tuple to a leaf, widening ancestor radii as needed,
    /// and return the set of leaf ids that received at least one tuple
    /// (including a freshly seeded root leaf).
    fn insert_tuples<V, S>(
        &self,
        tracker: &mut DiffTracker<K, V, S>,
        tuples: Vec<Tuple<K, V>>,
    ) -> Result<HashSet<Id>>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        if tuples.is_empty() {
            return Ok(HashSet::new());
        }
        let ops = self.collect_ops_for_tuples(tracker, tuples)?;
        self.reduce_and_stage(tracker, ops)
    }

    fn collect_ops_for_tuples<V, S>(
        &self,
        tracker: &DiffTracker<K, V, S>,
        tuples: Vec<Tuple<K, V>>,
    ) -> Result<Vec<ElementaryOp<K, V>>>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        if tracker.root_id().is_none() {
            return Ok(tuples
                .into_iter()
                .map(|tuple| ElementaryOp::CreateRoot { id: Id::new(), tuple })
                .collect());
        }

        let mut ops = Vec::with_capacity(tuples.len() * 2);
        for tuple in tuples {
            let mut node_id = tracker.root_id().expect("checked above");
            loop {
                let header = tracker
                    .get_header(node_id)?
                    .ok_or_else(|| invariant(format!("dangling node {:?}", node_id)))?;
                let d = self.metric.distance(&header.center, &tuple.key)?;
                if d > header.radius {
                    ops.push(ElementaryOp::IncreaseRadius { id: node_id, radius: d });
                }
                match &header.kind {
                    NodeKind::Leaf { .. } => {
                        ops.push(ElementaryOp::AssignTuple {
                            leaf_id: node_id,
                            tuple: tuple.clone(),
                        });
                        break;
                    }
                    NodeKind::Inner { children } => {
                        node_id = self.nearest_child(tracker, children, &tuple.key)?;
                    }
                }
            }
        }
        Ok(ops)
    }

    fn nearest_child<V, S>(
        &self,
        tracker: &DiffTracker<K, V, S>,
        children: &[Id],
        key: &K,
    ) -> Result<Id>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut best: Option<Id> = None;
        let mut best_d = f64::INFINITY;
        for &child_id in children {
            let child = tracker
                .get_header(child_id)?
                .ok_or_else(|| invariant(format!("dangling child {:?}", child_id)))?;
            let d = self.metric.distance(&child.center, key)?;
            if d < best_d {
                best_d = d;
                best = Some(child_id);
            }
        }
        best.ok_or_else(|| invariant("inner node with no children"))
    }

    fn reduce_and_stage<V, S>(
        &self,
        tracker: &mut DiffTracker<K, V, S>,
        ops: Vec<ElementaryOp<K, V>>,
    ) -> Result<HashSet<Id>>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut create_root_tuples = Vec::new();
        let mut radius_increases: HashMap<Id, f64> = HashMap::new();
        let mut assigns: HashMap<Id, Vec<Tuple<K, V>>> = HashMap::new();

        for op in ops {
            match op {
                ElementaryOp::CreateRoot { tuple, .. } => create_root_tuples.push(tuple),
                ElementaryOp::IncreaseRadius { id, radius } => {
                    let slot = radius_increases.entry(id).or_insert(radius);
                    if radius > *slot {
                        *slot = radius;
                    }
                }
                ElementaryOp::AssignTuple { leaf_id, tuple } => {
                    assigns.entry(leaf_id).or_default().push(tuple);
                }
            }
        }

        let mut touched = HashSet::new();

        if !create_root_tuples.is_empty() {
            let root_id = Id::new();
            let center = create_root_tuples[0].key.clone();
            let mut radius = 0.0_f64;
            for tuple in &create_root_tuples {
                let d = self.metric.distance(&center, &tuple.key)?;
                if d > radius {
                    radius = d;
                }
            }
            let page_id = Id::new();
            let count = create_root_tuples.len();
            tracker.stage_page(page_id, DataPage::new(create_root_tuples));
            tracker.stage_header(NodeHeader::new_leaf(root_id, None, center, radius, page_id, count));
            tracker.register_new_node(root_id);
            tracker.set_root(Some(root_id));
            touched.insert(root_id);
        }

        for (id, radius) in radius_increases {
            let mut header = tracker
                .get_header(id)?
                .ok_or_else(|| invariant(format!("dangling node {:?}", id)))?;
            if radius > header.radius {
                header.radius = radius;
                tracker.stage_header(header);
            }
        }

        for (leaf_id, new_tuples) in assigns {
            let header = tracker
                .get_header(leaf_id)?
                .ok_or_else(|| invariant(format!("dangling leaf {:?}", leaf_id)))?;
            let page_id = header
                .page_id()
                .ok_or_else(|| invariant("assign target is not a leaf"))?;
            let mut page = tracker.get_page(page_id)?.unwrap_or_default();
            page.tuples.extend(new_tuples);
            let tuple_count = page.tuples.len();
            tracker.stage_page(page_id, page);

            let mut updated = header;
            updated.kind = NodeKind::Leaf { page_id, tuple_count };
            tracker.stage_header(updated);
            touched.insert(leaf_id);
        }

        Ok(touched)
    }

    // -- splitting -------------------------------------------------------

    fn overflows(&self, header: &NodeHeader<K>) -> bool {
        match &header.kind {
            NodeKind::Leaf { tuple_count, .. } => *tuple_count > self.config.max_tuples_per_page,
            NodeKind::Inner { children } => children.len() > self.config.branching_factor,
        }
    }

    /// Walk every node touched this transaction (plus anything that
    /// cascades up from a split) and split whatever overflows.
    fn propagate_splits<V, S>(
        &self,
        tracker: &mut DiffTracker<K, V, S>,
        seeds: HashSet<Id>,
        mode: SplitMode,
    ) -> Result<()>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut stack: Vec<Id> = seeds.into_iter().collect();
        let mut alternate = false;

        while let Some(node_id) = stack.pop() {
            let header = match tracker.get_header(node_id)? {
                Some(header) => header,
                None => continue,
            };
            if !self.overflows(&header) {
                continue;
            }
            alternate = !alternate;

            let parent = header.parent;
            let was_leaf = header.is_leaf();
            debug!(
                "splitting {} {:?} (parent {:?})",
                if was_leaf { "leaf" } else { "inner node" },
                node_id,
                parent
            );
            let (header_a, header_b, moved_tuples) = match &header.kind {
                NodeKind::Leaf { .. } => {
                    let (a, b, moved) = self.split_leaf(tracker, &header, alternate)?;
                    (a, b, moved)
                }
                NodeKind::Inner { .. } => {
                    let (a, b) = self.split_inner(tracker, &header)?;
                    (a, b, Vec::new())
                }
            };
            for tuple_id in moved_tuples {
                tracker.register_updated_tuple_id(tuple_id);
            }

            let id_a = header_a.id;
            let id_b = header_b.id;
            let center_a = header_a.center.clone();
            let radius_a = header_a.radius;
            let center_b = header_b.center.clone();
            let radius_b = header_b.radius;

            // `id_a` reuses `node_id`, so staging it overwrites the
            // original header in place; `id_b` is the one genuinely new
            // sibling this split mints.
            tracker.stage_header(header_a);
            tracker.stage_header(header_b);
            tracker.register_new_node(id_b);

            if mode == SplitMode::Quick && was_leaf {
                tracker.register_repack_seed(id_a);
                tracker.register_repack_seed(id_b);
            }

            match parent {
                None => {
                    let root_id = Id::new();
                    let d = self.metric.distance(&center_a, &center_b)?;
                    let radius = radius_a.max(d + radius_b);

                    let mut a = tracker.get_header(id_a)?.expect("just staged");
                    a.parent = Some(root_id);
                    tracker.stage_header(a);
                    let mut b = tracker.get_header(id_b)?.expect("just staged");
                    b.parent = Some(root_id);
                    tracker.stage_header(b);

                    tracker.stage_header(NodeHeader::new_inner(
                        root_id,
                        None,
                        center_a,
                        radius,
                        vec![id_a, id_b],
                    ));
                    tracker.register_new_node(root_id);
                    tracker.set_root(Some(root_id));
                }
                Some(parent_id) => {
                    let mut parent_header = tracker
                        .get_header(parent_id)?
                        .ok_or_else(|| invariant(format!("dangling parent {:?}", parent_id)))?;
                    let mut children = parent_header.children().to_vec();
                    children.retain(|&c| c != node_id);
                    children.push(id_a);
                    children.push(id_b);

                    let mut new_radius = 0.0_f64;
                    for &child_id in &children {
                        let child = tracker
                            .get_header(child_id)?
                            .ok_or_else(|| invariant(format!("dangling child {:?}", child_id)))?;
                        let d = self.metric.distance(&parent_header.center, &child.center)? + child.radius;
                        if d > new_radius {
                            new_radius = d;
                        }
                    }
                    parent_header.radius = new_radius;
                    parent_header.kind = NodeKind::Inner { children };
                    tracker.stage_header(parent_header);
                    stack.push(parent_id);
                }
            }
        }
        Ok(())
    }

    fn split_leaf<V, S>(
        &self,
        tracker: &mut DiffTracker<K, V, S>,
        header: &NodeHeader<K>,
        alternate: bool,
    ) -> Result<(NodeHeader<K>, NodeHeader<K>, Vec<Id>)>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let page_id = header
            .page_id()
            .ok_or_else(|| invariant("split_leaf called on a non-leaf"))?;
        let page = tracker
            .get_page(page_id)?
            .ok_or_else(|| invariant(format!("dangling page {:?}", page_id)))?;
        let moved_ids: Vec<Id> = page.tuples.iter().map(|t| t.id).collect();

        let (stub_a, stub_b): (Stub<K, V>, Stub<K, V>) =
            splitter::split_tuples(page.tuples, &self.metric, alternate)?;

        // The "left" side reuses the original leaf's id; only the new
        // sibling gets a fresh one.
        let id_a = header.id;
        let id_b = Id::new();
        let page_a_id = Id::new();
        let page_b_id = Id::new();
        tracker.stage_page(page_a_id, DataPage::new(stub_a.tuples.clone()));
        tracker.stage_page(page_b_id, DataPage::new(stub_b.tuples.clone()));

        let header_a = NodeHeader::new_leaf(
            id_a,
            header.parent,
            stub_a.center,
            stub_a.radius,
            page_a_id,
            stub_a.tuples.len(),
        );
        let header_b = NodeHeader::new_leaf(
            id_b,
            header.parent,
            stub_b.center,
            stub_b.radius,
            page_b_id,
            stub_b.tuples.len(),
        );

        tracker.delete_page(page_id);
        Ok((header_a, header_b, moved_ids))
    }

    fn split_inner<V, S>(
        &self,
        tracker: &mut DiffTracker<K, V, S>,
        header: &NodeHeader<K>,
    ) -> Result<(NodeHeader<K>, NodeHeader<K>)>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let children = header.children().to_vec();
        let mut child_headers = Vec::with_capacity(children.len());
        for &id in &children {
            let h = tracker
                .get_header(id)?
                .ok_or_else(|| invariant(format!("dangling child {:?}", id)))?;
            child_headers.push(h);
        }
        let centers: Vec<K> = child_headers.iter().map(|h| h.center.clone()).collect();
        let (i, j) = splitter::pick_centers(&centers, &self.metric)?;
        let center_a = centers[i].clone();
        let center_b = centers[j].clone();

        let mut children_a = Vec::new();
        let mut children_b = Vec::new();
        for (idx, child) in child_headers.iter().enumerate() {
            let da = self.metric.distance(&center_a, &child.center)?;
            let db = self.metric.distance(&center_b, &child.center)?;
            if da <= db {
                children_a.push(children[idx]);
            } else {
                children_b.push(children[idx]);
            }
        }
        if children_a.is_empty() {
            children_a.push(children_b.remove(0));
        } else if children_b.is_empty() {
            children_b.push(children_a.remove(0));
        }

        // The "left" side reuses the original inner node's id; only the
        // new sibling gets a fresh one.
        let id_a = header.id;
        let id_b = Id::new();
        let radius_a = self.max_child_reach(tracker, &center_a, &children_a)?;
        let radius_b = self.max_child_reach(tracker, &center_b, &children_b)?;

        for &id in &children_a {
            let mut h = tracker.get_header(id)?.expect("listed above");
            h.parent = Some(id_a);
            tracker.stage_header(h);
        }
        for &id in &children_b {
            let mut h = tracker.get_header(id)?.expect("listed above");
            h.parent = Some(id_b);
            tracker.stage_header(h);
        }

        let header_a = NodeHeader::new_inner(id_a, header.parent, center_a, radius_a, children_a);
        let header_b = NodeHeader::new_inner(id_b, header.parent, center_b, radius_b, children_b);
        Ok((header_a, header_b))
    }

    fn max_child_reach<V, S>(&self, tracker: &DiffTracker<K, V, S>, center: &K, children: &[Id]) -> Result<f64>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut radius = 0.0_f64;
        for &id in children {
            let h = tracker
                .get_header(id)?
                .ok_or_else(|| invariant(format!("dangling child {:?}", id)))?;
            let d = self.metric.distance(center, &h.center)? + h.radius;
            if d > radius {
                radius = d;
            }
        }
        Ok(radius)
    }

    // -- repacking -------------------------------------------------------

    fn collect_all_leaves<V, S>(&self, tracker: &DiffTracker<K, V, S>) -> Result<Vec<Id>>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut leaves = Vec::new();
        let mut stack = Vec::new();
        if let Some(root) = tracker.root_id() {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            let header = match tracker.get_header(id)? {
                Some(h) => h,
                None => continue,
            };
            match header.kind {
                NodeKind::Leaf { .. } => leaves.push(id),
                NodeKind::Inner { children } => stack.extend(children),
            }
        }
        Ok(leaves)
    }

    /// Replace the oldest leaf with a freshly allocated, empty one that
    /// keeps the same center, then reinsert its tuples into the staged
    /// tree from the root down. Skipped when the root has fewer than
    /// three children -- too small a tree for the replacement to be
    /// worth it.
    fn rebuild_oldest_leaf<V, S>(&self, tracker: &mut DiffTracker<K, V, S>) -> Result<()>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let root_id = match tracker.root_id() {
            Some(id) => id,
            None => return Ok(()),
        };
        let root = tracker
            .get_header(root_id)?
            .ok_or_else(|| invariant(format!("dangling root {:?}", root_id)))?;
        if root.children().len() < 3 {
            return Ok(());
        }

        let oldest_id = match self.collect_all_leaves(tracker)?.into_iter().min() {
            Some(id) => id,
            None => return Ok(()),
        };
        let header = tracker
            .get_header(oldest_id)?
            .ok_or_else(|| invariant(format!("dangling leaf {:?}", oldest_id)))?;
        let page_id = header.page_id().expect("leaf always has a page");
        let tuples = tracker.get_page(page_id)?.unwrap_or_default().tuples;
        debug!("rebuilding oldest leaf {:?} ({} tuples)", oldest_id, tuples.len());
        let parent_id = header
            .parent
            .ok_or_else(|| invariant("oldest leaf has no parent but root has >= 3 children"))?;

        let new_leaf_id = Id::new();
        let new_page_id = Id::new();
        tracker.stage_page(new_page_id, DataPage::new(Vec::new()));
        tracker.stage_header(NodeHeader::new_leaf(
            new_leaf_id,
            Some(parent_id),
            header.center.clone(),
            0.0,
            new_page_id,
            0,
        ));
        tracker.register_new_node(new_leaf_id);

        let mut parent = tracker
            .get_header(parent_id)?
            .ok_or_else(|| invariant(format!("dangling parent {:?}", parent_id)))?;
        let mut children = parent.children().to_vec();
        children.retain(|&c| c != oldest_id);
        children.push(new_leaf_id);
        let radius = self.max_child_reach(tracker, &parent.center, &children)?;
        parent.radius = radius;
        parent.kind = NodeKind::Inner { children };
        tracker.stage_header(parent);

        tracker.delete_header(oldest_id);
        tracker.delete_page(page_id);

        for tuple in &tuples {
            tracker.register_updated_tuple_id(tuple.id);
        }
        let touched = self.insert_tuples(tracker, tuples)?;
        self.propagate_splits(tracker, touched, SplitMode::Careful)?;

        // If nothing was routed back to the replacement leaf it is
        // still present, empty, exactly as staged above; remove it.
        if let Some(h) = tracker.get_header(new_leaf_id)? {
            if h.is_leaf() && h.tuple_count() == 0 {
                tracker.delete_header(new_leaf_id);
                tracker.delete_page(new_page_id);
                self.cascade_remove_child(tracker, parent_id, new_leaf_id)?;
            }
        }
        Ok(())
    }

    /// Zero a leaf's radius and tuple count, drop its page, and reinsert
    /// its tuples through the ordinary insertion path. The leaf's own id
    /// stays staged throughout as a routing anchor: if a tuple routes
    /// back to it, reinsertion re-stages a page under the same id and
    /// the leaf survives under its original id; if nothing routes back,
    /// it is left empty afterward and cascaded away. This recomputes the
    /// leaf's sphere from scratch instead of only ever growing it, and
    /// lets tuples drift to a better-fitting sibling if one now exists.
    fn repack_leaf<V, S>(&self, tracker: &mut DiffTracker<K, V, S>, leaf_id: Id) -> Result<()>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let header = match tracker.get_header(leaf_id)? {
            Some(h) if h.is_leaf() => h,
            _ => return Ok(()),
        };
        let page_id = header.page_id().expect("leaf always has a page");
        let page = tracker.get_page(page_id)?.unwrap_or_default();
        if page.is_empty() {
            return Ok(());
        }
        let tuples = page.tuples;

        let mut zeroed = header;
        zeroed.radius = 0.0;
        zeroed.kind = NodeKind::Leaf { page_id, tuple_count: 0 };
        tracker.stage_header(zeroed);
        tracker.delete_page(page_id);

        for tuple in &tuples {
            tracker.register_updated_tuple_id(tuple.id);
        }
        let touched = self.insert_tuples(tracker, tuples)?;
        self.propagate_splits(tracker, touched, SplitMode::Careful)?;

        // Any repacked leaf whose id still maps to an empty leaf header
        // received no tuples back; it is genuinely gone.
        if let Some(h) = tracker.get_header(leaf_id)? {
            if h.is_leaf() && h.tuple_count() == 0 {
                tracker.delete_header(leaf_id);
                tracker.delete_page(page_id);
                self.cascade_remove_leaf(tracker, &h)?;
            }
        }
        Ok(())
    }

    fn cascade_remove_leaf<V, S>(&self, tracker: &mut DiffTracker<K, V, S>, header: &NodeHeader<K>) -> Result<()>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        match header.parent {
            None => tracker.set_root(None),
            Some(parent_id) => self.cascade_remove_child(tracker, parent_id, header.id)?,
        }
        Ok(())
    }

    /// Remove `child_id` from `parent_id`'s children, shrinking its
    /// radius to fit the survivors, or -- if that empties the parent --
    /// recursing up to remove the parent too.
    fn cascade_remove_child<V, S>(
        &self,
        tracker: &mut DiffTracker<K, V, S>,
        parent_id: Id,
        child_id: Id,
    ) -> Result<()>
    where
        V: Clone,
        S: TreeSnapshot<K, V>,
    {
        let mut parent = tracker
            .get_header(parent_id)?
            .ok_or_else(|| invariant(format!("dangling parent {:?}", parent_id)))?;
        let mut children = parent.children().to_vec();
        children.retain(|&c| c != child_id);

        if children.is_empty() {
            let grandparent = parent.parent;
            tracker.delete_header(parent_id);
            match grandparent {
                None => tracker.set_root(None),
                Some(gp) => self.cascade_remove_child(tracker, gp, parent_id)?,
            }
        } else {
            let radius = self.max_child_reach(tracker, &parent.center, &children)?;
            parent.radius = radius;
            parent.kind = NodeKind::Inner { children };
            tracker.stage_header(parent);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;

//! Module `stats` computes whole-tree summary statistics in a single
//! explicit-stack walk: tuple/leaf/inner counts, and the mean and sample
//! standard deviation of leaf radii.

use crate::{error::Result, id::Id, traits::TreeSnapshot, types::NodeKind};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeStats {
    pub tuple_count: usize,
    pub leaf_count: usize,
    pub inner_count: usize,
    pub mean_leaf_radius: f64,
    pub stddev_leaf_radius: f64,
}

pub fn compute_stats<K, V, S>(snapshot: &S) -> Result<TreeStats>
where
    S: TreeSnapshot<K, V>,
{
    let mut stack: Vec<Id> = Vec::new();
    if let Some(root) = snapshot.root_id() {
        stack.push(root);
    }

    let mut tuple_count = 0_usize;
    let mut leaf_count = 0_usize;
    let mut inner_count = 0_usize;
    let mut radii = Vec::new();

    while let Some(id) = stack.pop() {
        let header = match snapshot.get_header(id)? {
            Some(h) => h,
            None => continue,
        };
        match header.kind {
            NodeKind::Inner { children } => {
                inner_count += 1;
                stack.extend(children);
            }
            NodeKind::Leaf { tuple_count: n, .. } => {
                leaf_count += 1;
                tuple_count += n;
                radii.push(header.radius);
            }
        }
    }

    let n = radii.len();
    let mean = if n == 0 {
        0.0
    } else {
        radii.iter().sum::<f64>() / n as f64
    };
    let stddev = if n <= 1 {
        0.0
    } else {
        let variance = radii.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    Ok(TreeStats {
        tuple_count,
        leaf_count,
        inner_count,
        mean_leaf_radius: mean,
        stddev_leaf_radius: stddev,
    })
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod stats_test;

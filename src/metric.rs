//! Module `metric` wraps a caller-supplied distance function with call
//! accounting and invariant checking: a thin validating wrapper around
//! externally supplied behaviour.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// A distance function over key type `K`. Any `Fn(&K, &K) -> f64`
/// qualifies via the blanket impl below; implementors are expected to
/// return a finite, non-negative value and to be symmetric, though
/// `VerifiedMetric` only checks the former at runtime.
pub trait Metric<K> {
    fn distance(&self, a: &K, b: &K) -> f64;
}

impl<K, F> Metric<K> for F
where
    F: Fn(&K, &K) -> f64,
{
    fn distance(&self, a: &K, b: &K) -> f64 {
        self(a, b)
    }
}

/// Counts every call made through it and rejects NaN or negative
/// results with `Error::Invariant`: a metric violating the distance
/// axioms at runtime fails loudly rather than silently corrupting the
/// tree.
pub struct VerifiedMetric<K, M>
where
    M: Metric<K>,
{
    inner: M,
    calls: AtomicU64,
    _phantom: std::marker::PhantomData<K>,
}

impl<K, M> VerifiedMetric<K, M>
where
    M: Metric<K>,
{
    pub fn new(inner: M) -> Self {
        VerifiedMetric {
            inner,
            calls: AtomicU64::new(0),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn distance(&self, a: &K, b: &K) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let d = self.inner.distance(a, b);
        if d.is_nan() {
            return Err(Error::Invariant("metric returned NaN".to_string()));
        }
        if d < 0.0 {
            let msg = format!("metric returned negative distance {}", d);
            return Err(Error::Invariant(msg));
        }
        Ok(d)
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "metric_test.rs"]
mod metric_test;

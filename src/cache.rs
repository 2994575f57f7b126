//! Per-run cache of pairwise comparison results.
//!
//! Keyed by the unordered document pair. A result is stored in the orientation
//! it was first computed in; lookups in the other orientation get a swapped
//! copy. Concurrent requests for the same uncached pair share one computation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;

use crate::rank::types::ComparisonResult;

/// Canonical key for an unordered pair of document ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: String,
    high: String,
}

impl PairKey {
    pub fn new(x: &str, y: &str) -> Self {
        let (low, high) = if x <= y { (x, y) } else { (y, x) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    pub fn ids(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }
}

/// Outcome of a cache lookup-or-compute.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// The result oriented as requested.
    pub result: ComparisonResult,
    /// True when no computation ran for this request.
    pub cached: bool,
}

#[derive(Default)]
pub struct PairCache {
    slots: Mutex<HashMap<PairKey, Arc<OnceCell<ComparisonResult>>>>,
    completed: Mutex<Vec<ComparisonResult>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn orient(stored: &ComparisonResult, x: &str) -> ComparisonResult {
    if stored.doc_a == x {
        stored.clone()
    } else {
        stored.swapped()
    }
}

impl PairCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `(x, y)`, oriented with `x` as `doc_a`.
    pub fn get(&self, x: &str, y: &str) -> Option<ComparisonResult> {
        let cell = lock(&self.slots).get(&PairKey::new(x, y)).cloned()?;
        cell.get().map(|stored| orient(stored, x))
    }

    /// Return the cached result for `(x, y)`, computing it with `compute` if
    /// the pair has never been judged. `compute` is called with `(x, y)`
    /// orientation and runs at most once per unordered pair.
    pub async fn get_or_compute<F, Fut>(&self, x: &str, y: &str, compute: F) -> CacheLookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ComparisonResult>,
    {
        let cell = {
            let mut slots = lock(&self.slots);
            slots
                .entry(PairKey::new(x, y))
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut computed = false;
        let flag = &mut computed;
        let stored = cell
            .get_or_init(|| async move {
                *flag = true;
                let result = compute().await;
                lock(&self.completed).push(result.clone());
                result
            })
            .await;

        CacheLookup {
            result: orient(stored, x),
            cached: !computed,
        }
    }

    /// Distinct judged pairs, in the order they completed.
    pub fn all_results(&self) -> Vec<ComparisonResult> {
        lock(&self.completed).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.completed).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Top-down merge sort over an async pairwise ordering.
//!
//! The sort knows nothing about evaluators or caches; everything with side
//! effects sits behind `PairOrdering`.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

/// Ordering signal: `x` ranks ahead of `y`.
pub const AHEAD: i8 = 1;
/// Ordering signal: `y` ranks ahead of `x`.
pub const BEHIND: i8 = -1;
/// Ordering signal: no preference.
pub const EVEN: i8 = 0;

/// Ternary comparator used by the merge sort.
#[async_trait]
pub trait PairOrdering: Send + Sync {
    /// `AHEAD` if `x` should rank before `y`, `BEHIND` if after, `EVEN` otherwise.
    async fn cmp(&self, x: &str, y: &str) -> i8;
}

/// Sort ids best-first.
///
/// Runs of length <= 1 are returned as-is. The merge takes from the left run
/// whenever `cmp(left, right) >= 0`, so ties keep left-run order. With
/// `parallel`, the two halves of each level are sorted concurrently; merges
/// are always sequential.
pub fn merge_sort<'a, O>(
    ids: Vec<String>,
    ordering: &'a O,
    parallel: bool,
) -> BoxFuture<'a, Vec<String>>
where
    O: PairOrdering + ?Sized,
{
    async move {
        if ids.len() <= 1 {
            return ids;
        }
        let mut left = ids;
        let right = left.split_off(left.len() / 2);

        let (left, right) = if parallel {
            futures::join!(
                merge_sort(left, ordering, true),
                merge_sort(right, ordering, true)
            )
        } else {
            let left = merge_sort(left, ordering, false).await;
            let right = merge_sort(right, ordering, false).await;
            (left, right)
        };

        merge(left, right, ordering).await
    }
    .boxed()
}

async fn merge<O>(left: Vec<String>, right: Vec<String>, ordering: &O) -> Vec<String>
where
    O: PairOrdering + ?Sized,
{
    let mut out = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if ordering.cmp(&left[i], &right[j]).await >= EVEN {
            out.push(left[i].clone());
            i += 1;
        } else {
            out.push(right[j].clone());
            j += 1;
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Higher score ranks ahead; equal scores are even.
    struct ScoreOrdering {
        scores: HashMap<String, i32>,
        calls: AtomicUsize,
        log: Mutex<Vec<(String, String)>>,
    }

    impl ScoreOrdering {
        fn new(pairs: &[(&str, i32)]) -> Self {
            Self {
                scores: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: AtomicUsize::new(0),
                log: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PairOrdering for ScoreOrdering {
        async fn cmp(&self, x: &str, y: &str) -> i8 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push((x.to_string(), y.to_string()));
            match self.scores[x].cmp(&self.scores[y]) {
                std::cmp::Ordering::Greater => AHEAD,
                std::cmp::Ordering::Less => BEHIND,
                std::cmp::Ordering::Equal => EVEN,
            }
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn sorts_best_first() {
        let ord = ScoreOrdering::new(&[("a", 1), ("b", 5), ("c", 3), ("d", 4), ("e", 2)]);
        let sorted = merge_sort(ids(&["a", "b", "c", "d", "e"]), &ord, false).await;
        assert_eq!(sorted, ids(&["b", "d", "c", "e", "a"]));
    }

    #[tokio::test]
    async fn trivial_inputs_make_no_calls() {
        let ord = ScoreOrdering::new(&[("a", 1)]);
        assert!(merge_sort(Vec::new(), &ord, false).await.is_empty());
        assert_eq!(merge_sort(ids(&["a"]), &ord, false).await, ids(&["a"]));
        assert_eq!(ord.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ties_preserve_input_order() {
        let ord = ScoreOrdering::new(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        let sorted = merge_sort(ids(&["c", "a", "d", "b"]), &ord, false).await;
        assert_eq!(sorted, ids(&["c", "a", "d", "b"]));
    }

    #[tokio::test]
    async fn comparisons_are_n_log_n() {
        let pairs: Vec<(String, i32)> = (0..16).map(|i| (format!("d{i}"), i)).collect();
        let refs: Vec<(&str, i32)> = pairs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let ord = ScoreOrdering::new(&refs);
        let input: Vec<String> = pairs.iter().map(|(k, _)| k.clone()).collect();
        merge_sort(input, &ord, false).await;
        // 16 * log2(16) = 64 is the merge sort upper bound.
        assert!(ord.calls.load(Ordering::SeqCst) <= 64);
    }

    #[tokio::test]
    async fn parallel_matches_sequential() {
        let scores = [("a", 3), ("b", 3), ("c", 9), ("d", 1), ("e", 7), ("f", 3), ("g", 0)];
        let input = ids(&["a", "b", "c", "d", "e", "f", "g"]);

        let seq = ScoreOrdering::new(&scores);
        let par = ScoreOrdering::new(&scores);
        let s = merge_sort(input.clone(), &seq, false).await;
        let p = merge_sort(input, &par, true).await;
        assert_eq!(s, p);
        assert_eq!(s, ids(&["c", "e", "a", "b", "f", "d", "g"]));

        let mut seq_log = seq.log.into_inner().unwrap();
        let mut par_log = par.log.into_inner().unwrap();
        seq_log.sort();
        par_log.sort();
        assert_eq!(seq_log, par_log);
    }
}

//! Ranking orchestrator.
//!
//! Wires together:
//! - PairComparator (rubric-weighted judgement of one pair)
//! - PairCache (one judgement per unordered pair per run)
//! - merge_sort (ordering from the ternary comparator)
//!
//! `rank` never fails: a pair that could not be judged is a tie.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::PairCache;
use crate::criteria;
use crate::evaluator::Evaluator;

use super::comparison::PairComparator;
use super::options::RankConfig;
use super::sort::{merge_sort, PairOrdering, AHEAD, BEHIND, EVEN};
use super::trace::{ComparisonTrace, TraceSink};
use super::types::{ComparisonResult, Criterion, Document, RankingOutcome};

/// Map a pair result to the merge sort's ordering signal for `(x, y)`.
///
/// Errors and declared ties are both `EVEN`.
pub fn ordering_signal(result: &ComparisonResult, x: &str, y: &str) -> i8 {
    if x == y || result.error.is_some() {
        return EVEN;
    }
    match result.winner.as_deref() {
        Some(w) if w == x => AHEAD,
        Some(w) if w == y => BEHIND,
        _ => EVEN,
    }
}

/// Comparator over one document set, backed by a per-run cache.
pub struct ComparatorOrdering<'a> {
    comparator: &'a PairComparator,
    criteria: &'a [Criterion],
    documents: HashMap<&'a str, &'a Document>,
    cache: PairCache,
    trace: Option<&'a dyn TraceSink>,
    run_id: Uuid,
    judged: AtomicUsize,
}

impl<'a> ComparatorOrdering<'a> {
    pub fn new(
        comparator: &'a PairComparator,
        criteria: &'a [Criterion],
        documents: &'a [Document],
    ) -> Self {
        Self {
            comparator,
            criteria,
            documents: documents.iter().map(|d| (d.id.as_str(), d)).collect(),
            cache: PairCache::new(),
            trace: None,
            run_id: Uuid::new_v4(),
            judged: AtomicUsize::new(0),
        }
    }

    pub fn with_trace(mut self, trace: &'a dyn TraceSink) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Shared by trace lines and gateway usage records.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Result for `(x, y)`, judged at most once per unordered pair.
    pub async fn result_for(&self, x: &str, y: &str) -> Option<ComparisonResult> {
        let doc_x = *self.documents.get(x)?;
        let doc_y = *self.documents.get(y)?;

        let lookup = self
            .cache
            .get_or_compute(x, y, || self.judge(doc_x, doc_y))
            .await;
        if lookup.cached {
            debug!(x, y, "Pair served from cache");
        }
        Some(lookup.result)
    }

    async fn judge(&self, doc_a: &Document, doc_b: &Document) -> ComparisonResult {
        let started = Instant::now();
        let result = self.comparator
            .compare(doc_a, doc_b, self.criteria, self.run_id)
            .await;
        let index = self.judged.fetch_add(1, AtomicOrdering::SeqCst);

        if let Some(sink) = self.trace {
            let event = ComparisonTrace::from_result(
                self.run_id,
                index,
                doc_a,
                doc_b,
                &result,
                started.elapsed().as_millis() as u64,
            );
            if let Err(err) = sink.record(event) {
                warn!(error = %err, "Failed to record comparison trace");
            }
        }
        result
    }

    /// Every distinct pair judged so far.
    pub fn into_results(self) -> Vec<ComparisonResult> {
        self.cache.all_results()
    }
}

#[async_trait]
impl<'a> PairOrdering for ComparatorOrdering<'a> {
    async fn cmp(&self, x: &str, y: &str) -> i8 {
        if x == y {
            return EVEN;
        }
        match self.result_for(x, y).await {
            Some(result) => ordering_signal(&result, x, y),
            None => {
                warn!(x, y, "Unknown document id in comparison; treating as tie");
                EVEN
            }
        }
    }
}

/// Ranks document sets by pairwise judgement and merge sort.
pub struct RankingEngine {
    comparator: PairComparator,
    criteria: Vec<Criterion>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl RankingEngine {
    /// The rubric is normalized once here.
    pub fn new(evaluator: Arc<dyn Evaluator>, criteria: &[Criterion], config: RankConfig) -> Self {
        Self {
            comparator: PairComparator::new(evaluator, config),
            criteria: criteria::normalize(criteria),
            trace: None,
        }
    }

    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn comparator(&self) -> &PairComparator {
        &self.comparator
    }

    /// Rank `documents` best-first.
    ///
    /// Each call starts with an empty cache. Duplicate ids keep their first
    /// occurrence.
    pub async fn rank(&self, documents: &[Document]) -> RankingOutcome {
        let documents = dedup_documents(documents);
        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();

        let mut ordering = ComparatorOrdering::new(&self.comparator, &self.criteria, &documents);
        if let Some(sink) = self.trace.as_deref() {
            ordering = ordering.with_trace(sink);
        }

        let started = Instant::now();
        let parallel = self.comparator.config().parallel_merge;
        let ranking = merge_sort(ids, &ordering, parallel).await;
        let run_id = ordering.run_id();
        let all_results = ordering.into_results();

        let failed = all_results.iter().filter(|r| r.is_error()).count();
        info!(
            run_id = %run_id,
            documents = ranking.len(),
            criteria = self.criteria.len(),
            pairs_judged = all_results.len(),
            pairs_failed = failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ranking complete"
        );

        RankingOutcome {
            ranking,
            all_results,
        }
    }
}

fn dedup_documents(documents: &[Document]) -> Vec<Document> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(documents.len());
    for doc in documents {
        if seen.insert(doc.id.as_str()) {
            out.push(doc.clone());
        } else {
            warn!(id = %doc.id, "Duplicate document id; keeping first occurrence");
        }
    }
    out
}

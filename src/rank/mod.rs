//! Pairwise document ranking.
//!
//! A rubric of weighted criteria is applied to document pairs by an LLM
//! evaluator; a merge sort over those pairwise verdicts produces the ranking.
//! Every distinct pair is judged at most once per run.

pub mod comparison;
pub mod engine;
pub mod options;
pub mod report;
pub mod request;
pub mod sort;
pub mod trace;
pub mod types;

pub use comparison::{build_result, weighted_contribution, PairComparator};
pub use engine::{ordering_signal, ComparatorOrdering, RankingEngine};
pub use options::RankConfig;
pub use report::{build_report, render_report_markdown, RankReport};
pub use request::{load_request, load_rubric, parse_request, RankRequestError};
pub use sort::{merge_sort, PairOrdering};
pub use trace::{
    ComparisonTrace, JsonlTraceSink, MemoryTraceSink, TraceError, TraceSink, TraceWriterHandle,
};
pub use types::*;

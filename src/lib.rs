#![forbid(unsafe_code)]

//! # rankcentral
//!
//! Rank a set of documents best-first by asking an LLM to compare them two at
//! a time against a weighted rubric.
//!
//! Each pair is scored 1-5 per criterion, the scores are weighted and summed,
//! and the document with the larger total wins the pair. A merge sort turns
//! those verdicts into a full ranking. A pair that cannot be judged (provider
//! error, timeout, bad credentials) is treated as a tie, so ranking always
//! completes.

pub mod cache;
pub mod criteria;
pub mod evaluator;
pub mod gateway;
pub mod prompts;
pub mod rank;
pub mod text_tokens;

pub use cache::{CacheLookup, PairCache, PairKey};
pub use evaluator::{Evaluator, EvaluatorError, GatewayEvaluator};
pub use gateway::{Attribution, ChatGateway, ProviderGateway, UsageSink};
pub use rank::{
    ComparisonResult, ComparisonTrace, Criterion, CriterionEvaluation, CriterionWinner, Document,
    JsonlTraceSink, RankConfig, RankingEngine, RankingOutcome, TraceError, TraceSink,
};

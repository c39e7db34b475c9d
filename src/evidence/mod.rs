//! Evidence retrieval and verdict aggregation.
//!
//! Retrieval fans a query out to every configured collaborator in parallel;
//! aggregation turns the claim and its evidence into one
//! [`VerificationResult`](crate::models::VerificationResult).

mod aggregator;
mod decision;
mod overrides;
mod retriever;
mod similarity;

pub use aggregator::{AggregationStage, EvidenceAggregator};
pub use decision::{Decision, EvidenceSummary, ScoredEvidence, Thresholds, decide};
pub use overrides::{FACT_TABLE_PROVIDER, FactOverrideTable, FactRule};
pub use retriever::EvidenceRetriever;
pub use similarity::{Relation, TfIdf, classify, similarities, tokenize};

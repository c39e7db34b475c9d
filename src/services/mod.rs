//! Verification services.
//!
//! [`VerificationPipeline`] ties extraction, caching, retrieval and aggregation
//! together and is the [`JobRunner`](crate::dispatch::JobRunner) both dispatch
//! paths execute.

mod pipeline;

pub use pipeline::VerificationPipeline;

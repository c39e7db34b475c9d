//! Data models for claimcheck.
//!
//! This module contains all the core data structures used throughout the system.

mod claim;
mod events;
mod evidence;
mod job;
mod verdict;

pub use claim::{CandidateClaim, CanonicalForm, ClaimTag, TimeContext};
pub use events::{AggregateStats, BroadcastEvent, ClaimPreview, ClientMessage, SessionEvent};
pub use evidence::{EvidenceItem, EvidenceOrigin};
pub use job::{JobKind, VerificationJob};
pub use verdict::{Verdict, VerificationResult};

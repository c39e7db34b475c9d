//! Verification result cache.
//!
//! Maps normalized claim text to a previously computed verdict with a bounded
//! entry count and time-based expiry.

mod result_cache;

pub use result_cache::{CacheEntry, CacheStats, ResultCache};

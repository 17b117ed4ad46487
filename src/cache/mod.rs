//! Cache module - memoized SELECT results

pub mod result_cache;

pub use result_cache::{CacheStats, CachedResult, ResultCache};

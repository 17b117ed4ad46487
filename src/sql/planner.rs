/// Query planner - decides whether a statement is answered from the cache
use super::ast::Statement;
use crate::cache::{CachedResult, ResultCache};
use std::sync::Arc;
use tracing::debug;

/// Execution plan for one parsed statement
#[derive(Debug)]
pub enum QueryPlan {
    /// SELECT whose exact text is memoized
    Cached(Arc<CachedResult>),

    /// Run against storage
    Execute {
        statement: Statement,
        /// Cache generation captured before any table lock is taken;
        /// `Some` for SELECT only
        generation: Option<u64>,
    },
}

/// Plan `statement`, keyed in the cache by the literal `query` text
pub fn plan(query: &str, statement: Statement, cache: &ResultCache) -> QueryPlan {
    if !matches!(statement, Statement::Select { .. }) {
        debug!(kind = %statement.kind(), "planned for execution");
        return QueryPlan::Execute {
            statement,
            generation: None,
        };
    }

    // Capture the generation before the lookup so a miss followed by an
    // invalidation can never store a stale result.
    let generation = cache.generation();
    match cache.lookup(query) {
        Some(hit) => QueryPlan::Cached(hit),
        None => QueryPlan::Execute {
            statement,
            generation: Some(generation),
        },
    }
}

//! The matcher tree: leaf matchers plus AND/OR/NOT combinators, evaluated
//! against any [`crate::record::Record`] through one small capability.

mod combinator;
mod fuzzy;
mod leaf;

pub use combinator::{AndMatcher, NotMatcher, OrMatcher};
pub use leaf::{
    AllMatcher, ColorFilterMatcher, ExactMatcher, FuzzyMatcher, MarkedMatcher, NumericMatcher,
    RegexMatcher, TagMatcher, UserQueryMatcher,
};

use std::collections::HashSet;
use std::sync::Arc;

use crate::record::Record;

/// A compiled, immutable subtree of the query. Matchers are constructed
/// once at compile time and never mutated afterwards, so they may be
/// freely shared (via `Arc`) across concurrent `match` invocations.
pub trait Matcher: Send + Sync {
    fn matches(&self, ctx: &SearchContext, record: &dyn Record) -> bool;

    /// Used only for pretty-printing and diagnostics, never for control flow.
    fn kind(&self) -> &'static str;
}

/// Per-invocation context passed to every `Matcher::matches` call.
///
/// `user_query` is threaded through context rather than stored inside the
/// system matcher to avoid a back-reference / ownership cycle between the
/// two compiled trees (see DESIGN.md).
pub struct SearchContext {
    marked_ids: Arc<HashSet<u64>>,
    user_query: Option<Arc<dyn Matcher>>,
}

impl SearchContext {
    pub fn new(marked_ids: Arc<HashSet<u64>>, user_query: Option<Arc<dyn Matcher>>) -> Self {
        Self {
            marked_ids,
            user_query,
        }
    }

    pub fn is_marked(&self, id: u64) -> bool {
        self.marked_ids.contains(&id)
    }

    pub fn user_query(&self) -> Option<&Arc<dyn Matcher>> {
        self.user_query.as_ref()
    }
}

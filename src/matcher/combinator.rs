//! The boolean combinators: AND, OR, NOT over child matchers.

use std::sync::Arc;

use crate::record::Record;

use super::{Matcher, SearchContext};

/// Matches iff every child matches. An empty child list matches everything,
/// mirroring `AllMatcher` so degenerate `And::default()` trees stay inert.
pub struct AndMatcher {
    children: Vec<Arc<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(children: Vec<Arc<dyn Matcher>>) -> Self {
        Self { children }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, ctx: &SearchContext, record: &dyn Record) -> bool {
        self.children.iter().all(|child| child.matches(ctx, record))
    }

    fn kind(&self) -> &'static str {
        "and"
    }
}

/// Matches iff at least one child matches. An empty child list never
/// matches, the dual of `AndMatcher`'s empty-list identity.
pub struct OrMatcher {
    children: Vec<Arc<dyn Matcher>>,
}

impl OrMatcher {
    pub fn new(children: Vec<Arc<dyn Matcher>>) -> Self {
        Self { children }
    }
}

impl Matcher for OrMatcher {
    fn matches(&self, ctx: &SearchContext, record: &dyn Record) -> bool {
        self.children.iter().any(|child| child.matches(ctx, record))
    }

    fn kind(&self) -> &'static str {
        "or"
    }
}

/// Negates a single child matcher.
pub struct NotMatcher {
    inner: Arc<dyn Matcher>,
}

impl NotMatcher {
    pub fn new(inner: Arc<dyn Matcher>) -> Self {
        Self { inner }
    }
}

impl Matcher for NotMatcher {
    fn matches(&self, ctx: &SearchContext, record: &dyn Record) -> bool {
        !self.inner.matches(ctx, record)
    }

    fn kind(&self) -> &'static str {
        "not"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{AllMatcher, ExactMatcher};
    use crate::record::LogLine;
    use std::collections::HashSet;

    fn ctx() -> SearchContext {
        SearchContext::new(Arc::new(HashSet::new()), None)
    }

    fn arc_exact(term: &str) -> Arc<dyn Matcher> {
        Arc::new(ExactMatcher::new("", term, true))
    }

    #[test]
    fn and_matcher_requires_all_children() {
        let record = LogLine::new(1, "boot sequence started", "", 0);
        let and = AndMatcher::new(vec![arc_exact("boot"), arc_exact("started")]);
        assert!(and.matches(&ctx(), &record));

        let and = AndMatcher::new(vec![arc_exact("boot"), arc_exact("missing")]);
        assert!(!and.matches(&ctx(), &record));
    }

    #[test]
    fn and_matcher_empty_children_matches_everything() {
        let record = LogLine::new(1, "anything", "", 0);
        let and = AndMatcher::new(vec![]);
        assert!(and.matches(&ctx(), &record));
    }

    #[test]
    fn or_matcher_requires_any_child() {
        let record = LogLine::new(1, "boot sequence", "", 0);
        let or = OrMatcher::new(vec![arc_exact("missing"), arc_exact("boot")]);
        assert!(or.matches(&ctx(), &record));

        let or = OrMatcher::new(vec![arc_exact("nope"), arc_exact("nada")]);
        assert!(!or.matches(&ctx(), &record));
    }

    #[test]
    fn or_matcher_empty_children_never_matches() {
        let record = LogLine::new(1, "anything", "", 0);
        let or = OrMatcher::new(vec![]);
        assert!(!or.matches(&ctx(), &record));
    }

    #[test]
    fn not_matcher_inverts_inner() {
        let record = LogLine::new(1, "boot sequence", "", 0);
        let not = NotMatcher::new(arc_exact("boot"));
        assert!(!not.matches(&ctx(), &record));

        let not = NotMatcher::new(Arc::new(AllMatcher));
        assert!(!not.matches(&ctx(), &record));
    }
}

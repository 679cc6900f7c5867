//! Marked records: a small, independently-lockable set of record ids a
//! user has pinned, orthogonal to search.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::matcher::{MarkedMatcher, Matcher, SearchContext};
use crate::record::Record;

/// Owns the marked-id set for one manager. Deliberately narrower than the
/// manager's own lock, so marking a record never contends with a rescan.
#[derive(Default)]
pub struct MarkManager {
    marked: Mutex<HashSet<u64>>,
}

impl MarkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of set/unset operations.
    pub fn update_marks(&self, marks: impl IntoIterator<Item = (u64, bool)>) {
        let mut guard = self.marked.lock().expect("mark lock poisoned");
        for (id, mark) in marks {
            if mark {
                guard.insert(id);
            } else {
                guard.remove(&id);
            }
        }
    }

    pub fn clear_marks(&self) {
        self.marked.lock().expect("mark lock poisoned").clear();
    }

    /// An immutable snapshot safe to hand to a [`SearchContext`].
    pub fn snapshot(&self) -> Arc<HashSet<u64>> {
        Arc::new(self.marked.lock().expect("mark lock poisoned").clone())
    }

    /// Filter `records` down to the currently marked ones.
    pub fn marked_records<'a>(&self, records: &'a [Arc<dyn Record>]) -> Vec<&'a Arc<dyn Record>> {
        let ctx = SearchContext::new(self.snapshot(), None);
        let matcher = MarkedMatcher;
        records
            .iter()
            .filter(|record| matcher.matches(&ctx, record.as_ref()))
            .collect()
    }
}

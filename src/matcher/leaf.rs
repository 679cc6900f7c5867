//! Leaf matchers: the terminal nodes of the matcher tree.

use regex::Regex;

use crate::record::{FieldMods, Record};

use super::fuzzy::fuzzy_match;
use super::{Matcher, SearchContext};

/// `exact` / `exactcase`: substring match on a field.
pub struct ExactMatcher {
    field: String,
    term: String,
    case_insensitive: bool,
}

impl ExactMatcher {
    pub fn new(field: impl Into<String>, term: impl Into<String>, case_insensitive: bool) -> Self {
        let term = term.into();
        Self {
            field: field.into(),
            term: if case_insensitive {
                term.to_lowercase()
            } else {
                term
            },
            case_insensitive,
        }
    }
}

impl Matcher for ExactMatcher {
    fn matches(&self, _ctx: &SearchContext, record: &dyn Record) -> bool {
        let mods = if self.case_insensitive {
            FieldMods::LOWER
        } else {
            FieldMods::NONE
        };
        record.field(&self.field, mods).contains(self.term.as_str())
    }

    fn kind(&self) -> &'static str {
        if self.case_insensitive {
            "exact"
        } else {
            "exactcase"
        }
    }
}

/// `regexp` / `regexpcase`: regex match on a field. Compilation happens
/// once at construction time; a failure there is surfaced by the compiler
/// as a `CompileError`, never at match time.
pub struct RegexMatcher {
    field: String,
    regex: Regex,
    case_insensitive: bool,
}

impl RegexMatcher {
    pub fn new(
        field: impl Into<String>,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self, regex::Error> {
        let pattern = if case_insensitive {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };
        Ok(Self {
            field: field.into(),
            regex: Regex::new(&pattern)?,
            case_insensitive,
        })
    }
}

impl Matcher for RegexMatcher {
    fn matches(&self, _ctx: &SearchContext, record: &dyn Record) -> bool {
        self.regex.is_match(record.field(&self.field, FieldMods::NONE))
    }

    fn kind(&self) -> &'static str {
        if self.case_insensitive {
            "regexp"
        } else {
            "regexpcase"
        }
    }
}

/// `fzf` / `fzfcase`: fuzzy subsequence match on a field.
pub struct FuzzyMatcher {
    field: String,
    pattern: String,
    case_insensitive: bool,
}

impl FuzzyMatcher {
    pub fn new(field: impl Into<String>, pattern: impl Into<String>, case_insensitive: bool) -> Self {
        let pattern = pattern.into();
        Self {
            field: field.into(),
            pattern: if case_insensitive {
                pattern.to_lowercase()
            } else {
                pattern
            },
            case_insensitive,
        }
    }
}

impl Matcher for FuzzyMatcher {
    fn matches(&self, _ctx: &SearchContext, record: &dyn Record) -> bool {
        let mods = if self.case_insensitive {
            FieldMods::LOWER
        } else {
            FieldMods::NONE
        };
        fuzzy_match(&self.pattern, record.field(&self.field, mods))
    }

    fn kind(&self) -> &'static str {
        if self.case_insensitive {
            "fzf"
        } else {
            "fzfcase"
        }
    }
}

/// `tag`: membership in the record's tag set. Always case-insensitive.
/// `exact_match` distinguishes `#name` (prefix) from `#name/` (exact).
pub struct TagMatcher {
    term: String,
    exact_match: bool,
}

impl TagMatcher {
    pub fn new(term: &str) -> Self {
        let (term, exact_match) = match term.strip_suffix('/') {
            Some(trimmed) => (trimmed, true),
            None => (term, false),
        };
        Self {
            term: term.to_lowercase(),
            exact_match,
        }
    }
}

impl Matcher for TagMatcher {
    fn matches(&self, _ctx: &SearchContext, record: &dyn Record) -> bool {
        record.tags().iter().any(|tag| {
            let tag = tag.to_lowercase();
            if self.exact_match {
                tag == self.term
            } else {
                tag.starts_with(&self.term)
            }
        })
    }

    fn kind(&self) -> &'static str {
        "tag"
    }
}

/// `numeric`: parse the field as an integer and compare with `op`.
pub struct NumericMatcher {
    field: String,
    op: crate::query::NumericOp,
    rhs: i64,
}

impl NumericMatcher {
    pub fn new(field: impl Into<String>, op: crate::query::NumericOp, rhs: i64) -> Self {
        Self {
            field: field.into(),
            op,
            rhs,
        }
    }
}

impl Matcher for NumericMatcher {
    fn matches(&self, _ctx: &SearchContext, record: &dyn Record) -> bool {
        match record.field(&self.field, FieldMods::NONE).parse::<i64>() {
            Ok(lhs) => self.op.apply(lhs, self.rhs),
            Err(_) => false,
        }
    }

    fn kind(&self) -> &'static str {
        "numeric"
    }
}

/// `marked`: true iff the record's id is in the context's marked set.
pub struct MarkedMatcher;

impl Matcher for MarkedMatcher {
    fn matches(&self, ctx: &SearchContext, record: &dyn Record) -> bool {
        ctx.is_marked(record.id())
    }

    fn kind(&self) -> &'static str {
        "marked"
    }
}

/// `userquery`: delegates to the compiled user matcher carried in the
/// context, if any. Absent user matcher (not present, or failed to
/// compile) is treated as a pass, so a system query referencing
/// `#userquery` is always runnable on its own.
pub struct UserQueryMatcher;

impl Matcher for UserQueryMatcher {
    fn matches(&self, ctx: &SearchContext, record: &dyn Record) -> bool {
        match ctx.user_query() {
            Some(matcher) => matcher.matches(ctx, record),
            None => true,
        }
    }

    fn kind(&self) -> &'static str {
        "userquery"
    }
}

/// `colorfilter`: always true; the color and inner matcher are extracted
/// by a separate compiler pass ([`crate::query::extract_color_filters`])
/// and never consulted here.
pub struct ColorFilterMatcher;

impl Matcher for ColorFilterMatcher {
    fn matches(&self, _ctx: &SearchContext, _record: &dyn Record) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "colorfilter"
    }
}

/// `all`: always true.
pub struct AllMatcher;

impl Matcher for AllMatcher {
    fn matches(&self, _ctx: &SearchContext, _record: &dyn Record) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "all"
    }
}

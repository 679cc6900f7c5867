//! Turns a parsed [`Node`] tree into a compiled matcher tree.
//!
//! Construction happens once per query string; everything that can fail
//! (today, only regex compilation) fails here, not during matching.
//! Syntax errors (`Node::Error`) are not a compile failure: they are
//! simply dropped from the compiled tree, the way a query editor drops a
//! bad clause and still runs the rest.

use std::sync::Arc;

use crate::error::CompileError;
use crate::matcher::{
    AllMatcher, AndMatcher, ColorFilterMatcher, ExactMatcher, FuzzyMatcher, Matcher, MarkedMatcher,
    NotMatcher, NumericMatcher, OrMatcher, RegexMatcher, TagMatcher, UserQueryMatcher,
};

use super::ast::{Node, SearchType};
use super::token::Span;

/// Compile `node` into a matcher tree. A query that collapses to nothing
/// (an empty group, or nothing but syntax errors) compiles to an
/// [`AllMatcher`] rather than `None`.
pub fn compile(node: &Node) -> Result<Option<Arc<dyn Matcher>>, CompileError> {
    let matcher = compile_node(node)?.unwrap_or_else(|| Arc::new(AllMatcher));
    Ok(Some(matcher))
}

/// `And`/`Or`: recursively compile children, drop nones, drop errors, fold
/// singletons, empty → none. `Error` → none. A regex compile failure is
/// the only case that still propagates as an `Err`.
fn compile_node(node: &Node) -> Result<Option<Arc<dyn Matcher>>, CompileError> {
    match node {
        Node::And { children, .. } => {
            let mut compiled = Vec::with_capacity(children.len());
            for child in children {
                if let Some(matcher) = compile_node(child)? {
                    compiled.push(matcher);
                }
            }
            Ok(fold(compiled, true))
        }
        Node::Or { children, .. } => {
            let mut compiled = Vec::with_capacity(children.len());
            for child in children {
                if let Some(matcher) = compile_node(child)? {
                    compiled.push(matcher);
                }
            }
            Ok(fold(compiled, false))
        }
        Node::Error { .. } => Ok(None),
        Node::Search {
            span,
            field,
            search_type,
            search_term,
            op,
            is_not,
            children,
            ..
        } => {
            let base: Arc<dyn Matcher> = match search_type {
                SearchType::Exact => Arc::new(ExactMatcher::new(field.clone(), search_term.clone(), true)),
                SearchType::ExactCase => {
                    Arc::new(ExactMatcher::new(field.clone(), search_term.clone(), false))
                }
                SearchType::Regexp => Arc::new(
                    RegexMatcher::new(field.clone(), search_term, true).map_err(|source| {
                        CompileError::InvalidRegex {
                            span: *span,
                            source,
                        }
                    })?,
                ),
                SearchType::RegexpCase => Arc::new(
                    RegexMatcher::new(field.clone(), search_term, false).map_err(|source| {
                        CompileError::InvalidRegex {
                            span: *span,
                            source,
                        }
                    })?,
                ),
                SearchType::Fzf => {
                    Arc::new(FuzzyMatcher::new(field.clone(), search_term.clone(), true))
                }
                SearchType::FzfCase => {
                    Arc::new(FuzzyMatcher::new(field.clone(), search_term.clone(), false))
                }
                SearchType::Tag => Arc::new(TagMatcher::new(search_term)),
                SearchType::Numeric => {
                    let op = op.expect("parser always attaches an op to a Numeric leaf");
                    let rhs: i64 = search_term
                        .parse()
                        .expect("parser only emits a Numeric leaf for a validated integer");
                    Arc::new(NumericMatcher::new(field.clone(), op, rhs))
                }
                SearchType::Marked => Arc::new(MarkedMatcher),
                SearchType::UserQuery => Arc::new(UserQueryMatcher),
                SearchType::ColorFilter => {
                    // The inner expression still has to compile (and surface
                    // its own errors); the color itself is consumed by
                    // `extract_color_filters`, not by matching.
                    if let Some(inner) = children.first() {
                        compile_node(inner)?;
                    }
                    Arc::new(ColorFilterMatcher)
                }
                SearchType::All => Arc::new(AllMatcher),
            };
            let base = if *is_not {
                Arc::new(NotMatcher::new(base)) as Arc<dyn Matcher>
            } else {
                base
            };
            Ok(Some(base))
        }
    }
}

/// Collapse a compiled child list the way [`super::parser::normalize`]
/// collapses the AST: zero children → none, one child → that child, more
/// than one → the appropriate combinator.
fn fold(children: Vec<Arc<dyn Matcher>>, is_and: bool) -> Option<Arc<dyn Matcher>> {
    match children.len() {
        0 => None,
        1 => children.into_iter().next(),
        _ => Some(if is_and {
            Arc::new(AndMatcher::new(children))
        } else {
            Arc::new(OrMatcher::new(children))
        }),
    }
}

/// Walk the tree collecting every `Error` node's span and message, for
/// surfacing as inline diagnostics in a query-editing UI.
pub fn extract_error_spans(node: &Node) -> Vec<(Span, String)> {
    let mut errors = Vec::new();
    collect_errors(node, &mut errors);
    errors
}

fn collect_errors(node: &Node, out: &mut Vec<(Span, String)>) {
    match node {
        Node::Error { span, message } => out.push((*span, message.clone())),
        Node::And { children, .. } | Node::Or { children, .. } => {
            for child in children {
                collect_errors(child, out);
            }
        }
        Node::Search { children, .. } => {
            for child in children {
                collect_errors(child, out);
            }
        }
    }
}

/// A `color:NAME(...)` filter extracted from the tree: the color name and
/// the compiled matcher for its inner expression.
pub struct ColorFilter {
    pub color: String,
    pub matcher: Arc<dyn Matcher>,
}

/// Walk the tree collecting every color filter, in source order (the AST
/// is already ordered by span start), so the UI layer can apply them as a
/// side channel over the base match set, independent of
/// `ColorFilterMatcher`'s always-true evaluation.
pub fn extract_color_filters(node: &Node) -> Result<Vec<ColorFilter>, CompileError> {
    let mut filters = Vec::new();
    collect_color_filters(node, &mut filters)?;
    Ok(filters)
}

fn collect_color_filters(node: &Node, out: &mut Vec<ColorFilter>) -> Result<(), CompileError> {
    match node {
        Node::And { children, .. } | Node::Or { children, .. } => {
            for child in children {
                collect_color_filters(child, out)?;
            }
        }
        Node::Search {
            search_type,
            color,
            children,
            ..
        } => {
            if *search_type == SearchType::ColorFilter {
                if let (Some(color), Some(inner)) = (color, children.first()) {
                    let matcher = compile_node(inner)?.unwrap_or_else(|| Arc::new(AllMatcher));
                    out.push(ColorFilter {
                        color: color.clone(),
                        matcher,
                    });
                }
            }
            for child in children {
                collect_color_filters(child, out)?;
            }
        }
        Node::Error { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::SearchContext;
    use crate::query::parser::parse;
    use crate::record::LogLine;
    use std::collections::HashSet;
    use std::sync::Arc as StdArc;

    fn ctx() -> SearchContext {
        SearchContext::new(StdArc::new(HashSet::new()), None)
    }

    #[test]
    fn compiles_simple_exact_query() {
        let node = parse("boot");
        let matcher = compile(&node).unwrap().unwrap();
        let record = LogLine::new(1, "boot sequence", "", 0);
        assert!(matcher.matches(&ctx(), &record));
    }

    #[test]
    fn malformed_regex_pattern_is_a_compile_error() {
        let node = parse("/(unclosed-group/");
        assert!(matches!(
            compile(&node),
            Err(CompileError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn color_filter_extraction_returns_inner_matcher() {
        let node = parse("color:red(error)");
        let filters = extract_color_filters(&node).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].color, "red");
        let record = LogLine::new(1, "an error occurred", "", 0);
        assert!(filters[0].matcher.matches(&ctx(), &record));
    }

    #[test]
    fn negated_leaf_compiles_to_not_matcher() {
        let node = parse("-error");
        let matcher = compile(&node).unwrap().unwrap();
        let record = LogLine::new(1, "all clear", "", 0);
        assert!(matcher.matches(&ctx(), &record));
        let record = LogLine::new(2, "an error occurred", "", 0);
        assert!(!matcher.matches(&ctx(), &record));
    }

    #[test]
    fn pure_syntax_error_compiles_to_all_matcher() {
        // A lone unbalanced paren has nothing else in the tree, so the
        // whole query collapses to "no matcher" and falls back to AllMatcher
        // rather than failing `compile()` outright.
        let node = parse("(foo");
        let matcher = compile(&node).unwrap().unwrap();
        assert_eq!(matcher.kind(), "all");
    }

    #[test]
    fn syntax_error_sibling_is_dropped_not_fatal() {
        // An And containing one valid leaf and one Error node still
        // compiles, using only the valid leaf.
        let node = Node::And {
            span: crate::query::Span::new(0, 10),
            children: vec![
                Node::leaf(
                    crate::query::Span::new(0, 4),
                    "",
                    SearchType::Exact,
                    "boot",
                    false,
                ),
                Node::Error {
                    span: crate::query::Span::new(5, 10),
                    message: "bad".to_string(),
                },
            ],
        };
        let matcher = compile(&node).unwrap().unwrap();
        assert_eq!(matcher.kind(), "exact");
    }
}

//! The typed query AST produced by the parser.

use super::token::{NumericOp, Span};

/// What kind of leaf a `Node::Search` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Exact,
    ExactCase,
    Regexp,
    RegexpCase,
    Fzf,
    FzfCase,
    Tag,
    Numeric,
    Marked,
    UserQuery,
    ColorFilter,
    All,
}

/// A node in the parsed query tree. Every node carries the source span it
/// was parsed from, so error highlighting and color-filter ordering can be
/// derived without re-tokenizing.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Search {
        span: Span,
        field: String,
        search_type: SearchType,
        search_term: String,
        op: Option<NumericOp>,
        is_not: bool,
        color: Option<String>,
        /// Only populated for `ColorFilter`, which wraps an inner expression.
        children: Vec<Node>,
    },
    And {
        span: Span,
        children: Vec<Node>,
    },
    Or {
        span: Span,
        children: Vec<Node>,
    },
    Error {
        span: Span,
        message: String,
    },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Search { span, .. } => *span,
            Node::And { span, .. } => *span,
            Node::Or { span, .. } => *span,
            Node::Error { span, .. } => *span,
        }
    }

    pub fn all(span: Span) -> Node {
        Node::Search {
            span,
            field: String::new(),
            search_type: SearchType::All,
            search_term: String::new(),
            op: None,
            is_not: false,
            color: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(
        span: Span,
        field: impl Into<String>,
        search_type: SearchType,
        search_term: impl Into<String>,
        is_not: bool,
    ) -> Node {
        Node::Search {
            span,
            field: field.into(),
            search_type,
            search_term: search_term.into(),
            op: None,
            is_not,
            color: None,
            children: Vec::new(),
        }
    }
}

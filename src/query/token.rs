//! Lexical tokens produced by the tokenizer.
//!
//! Every token carries the `[start, end)` character-offset span it occupied
//! in the original query string, so that parse errors can be reported back
//! to the UI as precise highlight ranges.

/// A half-open `[start, end)` span of character offsets into the original
/// query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slice the original query string with this span.
    ///
    /// Offsets are character indices, not byte indices, so this walks the
    /// char sequence rather than slicing `str` directly.
    pub fn slice<'a>(&self, query: &'a str) -> &'a str {
        let start_byte = query
            .char_indices()
            .nth(self.start)
            .map(|(i, _)| i)
            .unwrap_or(query.len());
        let end_byte = query
            .char_indices()
            .nth(self.end)
            .map(|(i, _)| i)
            .unwrap_or(query.len());
        &query[start_byte..end_byte]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Bareword,
    /// `case_sensitive` is set by an immediate trailing `c` modifier
    /// (e.g. `"Boot"c`), mirroring the `i` modifier on regex/fuzzy literals.
    QuotedString { case_sensitive: bool },
    RegexLiteral { case_insensitive: bool },
    FuzzyLiteral { case_insensitive: bool },
    TagLiteral { exact: bool },
    /// A `field:` prefix; `text` is the field name without the colon.
    FieldPrefix,
    NumericOp(NumericOp),
    Not,
    Or,
    LParen,
    RParen,
    Whitespace,
    /// Lexical error (unterminated quote/regex). `text` carries a message.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Gt,
    Lt,
    Gte,
    Lte,
}

impl NumericOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericOp::Gt => ">",
            NumericOp::Lt => "<",
            NumericOp::Gte => ">=",
            NumericOp::Lte => "<=",
        }
    }

    pub fn apply(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            NumericOp::Gt => lhs > rhs,
            NumericOp::Lt => lhs < rhs,
            NumericOp::Gte => lhs >= rhs,
            NumericOp::Lte => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text carried by the token. For quoted/regex/fuzzy/tag
    /// literals this is the *unwrapped* contents (quotes/slashes/hash
    /// stripped); for `FieldPrefix` it's the field name; for `Error` it's
    /// the diagnostic message.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

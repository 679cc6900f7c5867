//! Splits a query string into a flat, gapless token stream.
//!
//! The tokenizer never fails outright: unterminated quotes and regex
//! literals are reported as [`TokenKind::Error`] tokens spanning from the
//! opening delimiter to end-of-input, and the parser is responsible for
//! turning those into `Node::Error` nodes.

use super::token::{NumericOp, Span, Token, TokenKind};

const WORD_DELIMITERS: &[char] = &['(', ')', '|'];

/// Tokenize `query` into an ordered, gapless sequence of tokens.
pub fn tokenize(query: &str) -> Vec<Token> {
    let chars: Vec<char> = query.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let len = chars.len();

    while i < len {
        let c = chars[i];

        if c.is_whitespace() {
            let start = i;
            while i < len && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Whitespace, "", Span::new(start, i)));
            continue;
        }

        match c {
            '-' => {
                tokens.push(Token::new(TokenKind::Not, "-", Span::new(i, i + 1)));
                i += 1;
            }
            '|' => {
                tokens.push(Token::new(TokenKind::Or, "|", Span::new(i, i + 1)));
                i += 1;
            }
            '(' => {
                tokens.push(Token::new(TokenKind::LParen, "(", Span::new(i, i + 1)));
                i += 1;
            }
            ')' => {
                tokens.push(Token::new(TokenKind::RParen, ")", Span::new(i, i + 1)));
                i += 1;
            }
            '"' => {
                let (token, next) = scan_quoted(&chars, i);
                tokens.push(token);
                i = next;
            }
            '/' => {
                let (token, next) = scan_regex(&chars, i);
                tokens.push(token);
                i = next;
            }
            '~' => {
                let (token, next) = scan_fuzzy(&chars, i);
                tokens.push(token);
                i = next;
            }
            '#' => {
                let (token, next) = scan_tag(&chars, i);
                tokens.push(token);
                i = next;
            }
            '>' | '<' => {
                let (token, next) = scan_numeric_op(&chars, i);
                tokens.push(token);
                i = next;
            }
            _ => {
                let (token, next) = scan_word(&chars, i);
                tokens.push(token);
                i = next;
            }
        }
    }

    tokens
}

fn scan_quoted(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start + 1;
    let mut content = String::new();
    while i < chars.len() {
        if chars[i] == '"' {
            let mut end = i + 1;
            let mut case_sensitive = false;
            if end < chars.len() && chars[end] == 'c' {
                case_sensitive = true;
                end += 1;
            }
            return (
                Token::new(
                    TokenKind::QuotedString { case_sensitive },
                    content,
                    Span::new(start, end),
                ),
                end,
            );
        }
        content.push(chars[i]);
        i += 1;
    }
    (
        Token::new(
            TokenKind::Error,
            "unterminated quoted string",
            Span::new(start, chars.len()),
        ),
        chars.len(),
    )
}

fn scan_regex(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start + 1;
    let mut content = String::new();
    while i < chars.len() {
        if chars[i] == '/' {
            let mut end = i + 1;
            let mut case_insensitive = false;
            if end < chars.len() && chars[end] == 'i' {
                case_insensitive = true;
                end += 1;
            }
            return (
                Token::new(
                    TokenKind::RegexLiteral { case_insensitive },
                    content,
                    Span::new(start, end),
                ),
                end,
            );
        }
        content.push(chars[i]);
        i += 1;
    }
    (
        Token::new(
            TokenKind::Error,
            "unterminated regex literal",
            Span::new(start, chars.len()),
        ),
        chars.len(),
    )
}

fn scan_fuzzy(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start + 1;
    let mut content = String::new();
    while i < chars.len() && !chars[i].is_whitespace() && !WORD_DELIMITERS.contains(&chars[i]) {
        content.push(chars[i]);
        i += 1;
    }
    let mut case_insensitive = false;
    if content.ends_with('i') {
        content.pop();
        case_insensitive = true;
    }
    (
        Token::new(
            TokenKind::FuzzyLiteral { case_insensitive },
            content,
            Span::new(start, i),
        ),
        i,
    )
}

fn scan_tag(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start + 1;
    let mut content = String::new();
    while i < chars.len() && !chars[i].is_whitespace() && !WORD_DELIMITERS.contains(&chars[i]) {
        content.push(chars[i]);
        i += 1;
    }
    let exact = content.ends_with('/');
    if exact {
        content.pop();
    }
    (
        Token::new(TokenKind::TagLiteral { exact }, content, Span::new(start, i)),
        i,
    )
}

fn scan_numeric_op(chars: &[char], start: usize) -> (Token, usize) {
    let gt = chars[start] == '>';
    if start + 1 < chars.len() && chars[start + 1] == '=' {
        let op = if gt { NumericOp::Gte } else { NumericOp::Lte };
        return (
            Token::new(TokenKind::NumericOp(op), op.as_str(), Span::new(start, start + 2)),
            start + 2,
        );
    }
    let op = if gt { NumericOp::Gt } else { NumericOp::Lt };
    (
        Token::new(TokenKind::NumericOp(op), op.as_str(), Span::new(start, start + 1)),
        start + 1,
    )
}

/// Scan a bareword, splitting out a leading `field:` prefix if one is
/// present. Returns only the *first* token found; the caller's main loop
/// will pick the scan back up at the returned offset for the following
/// value token.
fn scan_word(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start;
    let mut content = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || WORD_DELIMITERS.contains(&c) {
            break;
        }
        if c == ':' {
            return (
                Token::new(TokenKind::FieldPrefix, content, Span::new(start, i + 1)),
                i + 1,
            );
        }
        content.push(c);
        i += 1;
    }
    (
        Token::new(TokenKind::Bareword, content, Span::new(start, i)),
        i,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<&TokenKind> {
        tokens.iter().map(|t| &t.kind).collect()
    }

    #[test]
    fn tokenizes_simple_bareword() {
        let tokens = tokenize("error");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Bareword);
        assert_eq!(tokens[0].text, "error");
        assert_eq!(tokens[0].span, Span::new(0, 5));
    }

    #[test]
    fn tokenizes_negated_bareword() {
        let tokens = tokenize("-error");
        assert_eq!(tokens[0].kind, TokenKind::Not);
        assert_eq!(tokens[1].kind, TokenKind::Bareword);
        assert_eq!(tokens[1].text, "error");
    }

    #[test]
    fn tokenizes_field_prefix() {
        let tokens = tokenize("state:running");
        assert_eq!(tokens[0].kind, TokenKind::FieldPrefix);
        assert_eq!(tokens[0].text, "state");
        assert_eq!(tokens[1].kind, TokenKind::Bareword);
        assert_eq!(tokens[1].text, "running");
    }

    #[test]
    fn tokenizes_quoted_string() {
        let tokens = tokenize("\"hello world\"");
        assert_eq!(tokens[0].kind, TokenKind::QuotedString { case_sensitive: false });
        assert_eq!(tokens[0].text, "hello world");
    }

    #[test]
    fn tokenizes_case_sensitive_quoted_string() {
        let tokens = tokenize("\"Boot\"c");
        assert_eq!(tokens[0].kind, TokenKind::QuotedString { case_sensitive: true });
        assert_eq!(tokens[0].text, "Boot");
    }

    #[test]
    fn unterminated_quote_is_error_to_end_of_input() {
        let tokens = tokenize("\"hello");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].span, Span::new(0, 6));
    }

    #[test]
    fn tokenizes_case_insensitive_regex() {
        let tokens = tokenize("/foo.*bar/i");
        match &tokens[0].kind {
            TokenKind::RegexLiteral { case_insensitive } => assert!(case_insensitive),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(tokens[0].text, "foo.*bar");
    }

    #[test]
    fn unterminated_regex_is_error() {
        let tokens = tokenize("/[unclosed");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].span, Span::new(0, 10));
    }

    #[test]
    fn tokenizes_fuzzy_with_case_flag() {
        let tokens = tokenize("~boti");
        match &tokens[0].kind {
            TokenKind::FuzzyLiteral { case_insensitive } => assert!(case_insensitive),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(tokens[0].text, "bot");
    }

    #[test]
    fn tokenizes_exact_tag() {
        let tokens = tokenize("#out/");
        match &tokens[0].kind {
            TokenKind::TagLiteral { exact } => assert!(exact),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(tokens[0].text, "out");
    }

    #[test]
    fn tokenizes_numeric_operators() {
        let tokens = tokenize("linenum:>=100");
        assert_eq!(tokens[0].kind, TokenKind::FieldPrefix);
        assert_eq!(tokens[1].kind, TokenKind::NumericOp(NumericOp::Gte));
        assert_eq!(tokens[2].kind, TokenKind::Bareword);
        assert_eq!(tokens[2].text, "100");
    }

    #[test]
    fn whitespace_covers_gaps() {
        let tokens = tokenize("a b");
        assert_eq!(
            kinds(&tokens),
            vec![&TokenKind::Bareword, &TokenKind::Whitespace, &TokenKind::Bareword]
        );
        // Coverage is gapless: each token's span abuts the next.
        assert_eq!(tokens[0].span.end, tokens[1].span.start);
        assert_eq!(tokens[1].span.end, tokens[2].span.start);
    }

    #[test]
    fn or_and_parens_are_single_tokens() {
        let tokens = tokenize("(a|b)");
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::LParen,
                &TokenKind::Bareword,
                &TokenKind::Or,
                &TokenKind::Bareword,
                &TokenKind::RParen,
            ]
        );
    }
}

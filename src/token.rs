// ABOUTME: Token types produced by the scanner and consumed by the parser

use std::fmt;

/// The closed set of lexical categories the scanner can produce.
///
/// Variant names intentionally match the spelling printed by the
/// `tokenize` CLI mode (`LEFT_PAREN`, `BANG_EQUAL`, ...), so `{:?}`
/// formatting doubles as the wire format.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character tokens.
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    DOT,
    MINUS,
    PLUS,
    SEMICOLON,
    SLASH,
    STAR,

    // One or two character tokens.
    BANG,
    BANG_EQUAL,
    EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,

    // Literals.
    IDENTIFIER,
    STRING,
    NUMBER,

    // Keywords.
    AND,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    EOF,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A literal value attached to a `STRING` or `NUMBER` token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", format_number_literal(*n)),
            Literal::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Formats a number the way the `tokenize` dump wants it: always at least
/// one decimal digit, e.g. `42` -> `42.0`.
pub fn format_number_literal(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, literal: Option<Literal>, line: usize) -> Self {
        Token {
            kind,
            lexeme,
            literal,
            line,
        }
    }

    /// Prints `KIND LEXEME LITERAL` for the `tokenize` CLI mode.
    pub fn dump(&self) -> String {
        let literal = match &self.literal {
            Some(lit) => lit.to_string(),
            None => "null".to_string(),
        };
        format!("{} {} {}", self.kind, self.lexeme, literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_formats_missing_literal_as_null() {
        let token = Token::new(TokenKind::PLUS, "+".to_string(), None, 1);
        assert_eq!(token.dump(), "PLUS + null");
    }

    #[test]
    fn dump_formats_number_literal_with_trailing_decimal() {
        let token = Token::new(
            TokenKind::NUMBER,
            "42".to_string(),
            Some(Literal::Number(42.0)),
            1,
        );
        assert_eq!(token.dump(), "NUMBER 42 42.0");
    }

    #[test]
    fn dump_formats_fractional_number_literal() {
        let token = Token::new(
            TokenKind::NUMBER,
            "3.14".to_string(),
            Some(Literal::Number(3.14)),
            1,
        );
        assert_eq!(token.dump(), "NUMBER 3.14 3.14");
    }

    #[test]
    fn dump_formats_string_literal_as_contents() {
        let token = Token::new(
            TokenKind::STRING,
            "\"hi\"".to_string(),
            Some(Literal::Str("hi".to_string())),
            1,
        );
        assert_eq!(token.dump(), "STRING \"hi\" hi");
    }

    #[test]
    fn eof_dump() {
        let token = Token::new(TokenKind::EOF, String::new(), None, 3);
        assert_eq!(token.dump(), "EOF  null");
    }
}

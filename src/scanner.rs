// ABOUTME: Hand-written deterministic lexer producing a token stream with literals and line numbers

use crate::diagnostics::Diagnostics;
use crate::token::{Literal, Token, TokenKind};

fn keyword(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match text {
        "and" => AND,
        "class" => CLASS,
        "else" => ELSE,
        "false" => FALSE,
        "for" => FOR,
        "fun" => FUN,
        "if" => IF,
        "nil" => NIL,
        "or" => OR,
        "print" => PRINT,
        "return" => RETURN,
        "super" => SUPER,
        "this" => THIS,
        "true" => TRUE,
        "var" => VAR,
        "while" => WHILE,
        _ => return None,
    })
}

/// Single-pass left-to-right scanner over a source string's bytes/chars.
/// Operates on a `Vec<char>` rather than byte indices so multi-byte UTF-8
/// source text never splits a character mid-lexeme.
pub struct Scanner {
    source: Vec<char>,
    start: usize,
    current: usize,
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.start = self.current;
            if let Some(token) = self.scan_token(diagnostics) {
                tokens.push(token);
            }
        }

        tokens.push(Token::new(TokenKind::EOF, String::new(), None, self.line));
        tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn make(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), None, self.line)
    }

    fn make_literal(&self, kind: TokenKind, literal: Literal) -> Token {
        Token::new(kind, self.lexeme(), Some(literal), self.line)
    }

    fn scan_token(&mut self, diagnostics: &mut Diagnostics) -> Option<Token> {
        use TokenKind::*;

        let c = self.advance();
        match c {
            '(' => Some(self.make(LEFT_PAREN)),
            ')' => Some(self.make(RIGHT_PAREN)),
            '{' => Some(self.make(LEFT_BRACE)),
            '}' => Some(self.make(RIGHT_BRACE)),
            ',' => Some(self.make(COMMA)),
            '.' => Some(self.make(DOT)),
            '-' => Some(self.make(MINUS)),
            '+' => Some(self.make(PLUS)),
            ';' => Some(self.make(SEMICOLON)),
            '*' => Some(self.make(STAR)),
            '!' => {
                let kind = if self.matches('=') { BANG_EQUAL } else { BANG };
                Some(self.make(kind))
            }
            '=' => {
                let kind = if self.matches('=') {
                    EQUAL_EQUAL
                } else {
                    EQUAL
                };
                Some(self.make(kind))
            }
            '<' => {
                let kind = if self.matches('=') { LESS_EQUAL } else { LESS };
                Some(self.make(kind))
            }
            '>' => {
                let kind = if self.matches('=') {
                    GREATER_EQUAL
                } else {
                    GREATER
                };
                Some(self.make(kind))
            }
            '/' => {
                if self.matches('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    None
                } else {
                    Some(self.make(SLASH))
                }
            }
            ' ' | '\r' | '\t' => None,
            '\n' => {
                self.line += 1;
                None
            }
            '"' => self.string(diagnostics),
            c if c.is_ascii_digit() => Some(self.number()),
            c if is_identifier_start(c) => Some(self.identifier()),
            other => {
                diagnostics.error(self.line, &format!("Unexpected character: {}", other));
                None
            }
        }
    }

    fn string(&mut self, diagnostics: &mut Diagnostics) -> Option<Token> {
        let start_line = self.line;

        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            diagnostics.error(start_line, "Unterminated string.");
            return None;
        }

        // consume closing quote
        self.advance();

        let contents: String = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect();
        Some(self.make_literal(TokenKind::STRING, Literal::Str(contents)))
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.lexeme();
        let value: f64 = text.parse().expect("scanned number lexeme must parse");
        self.make_literal(TokenKind::NUMBER, Literal::Number(value))
    }

    fn identifier(&mut self) -> Token {
        while is_identifier_continue(self.peek()) {
            self.advance();
        }

        let text = self.lexeme();
        let kind = keyword(&text).unwrap_or(TokenKind::IDENTIFIER);
        self.make(kind)
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> (Vec<Token>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        (tokens, diagnostics)
    }

    #[test]
    fn single_char_tokens_and_eof() {
        let (tokens, diagnostics) = scan("(){}");
        assert!(!diagnostics.had_error());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LEFT_PAREN,
                TokenKind::RIGHT_PAREN,
                TokenKind::LEFT_BRACE,
                TokenKind::RIGHT_BRACE,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn two_char_operators_prefer_longest_match() {
        let (tokens, _) = scan("!= == <= >= = ! < >");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::BANG_EQUAL,
                TokenKind::EQUAL_EQUAL,
                TokenKind::LESS_EQUAL,
                TokenKind::GREATER_EQUAL,
                TokenKind::EQUAL,
                TokenKind::BANG,
                TokenKind::LESS,
                TokenKind::GREATER,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn comment_discards_rest_of_line() {
        let (tokens, _) = scan("1 // a comment\n2");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::NUMBER, TokenKind::NUMBER, TokenKind::EOF]);
    }

    #[test]
    fn slash_without_second_slash_is_divide() {
        let (tokens, _) = scan("1 / 2");
        assert_eq!(tokens[1].kind, TokenKind::SLASH);
    }

    #[test]
    fn string_literal_strips_quotes() {
        let (tokens, diagnostics) = scan("\"hello\"");
        assert!(!diagnostics.had_error());
        assert_eq!(tokens[0].literal, Some(Literal::Str("hello".to_string())));
    }

    #[test]
    fn string_allows_embedded_newlines() {
        let (tokens, diagnostics) = scan("\"a\nb\"\n1");
        assert!(!diagnostics.had_error());
        assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb".to_string())));
        // the NUMBER token after the string is on line 3
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn unterminated_string_reports_error_at_opening_line() {
        let (_, diagnostics) = scan("\"unterminated");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn number_literal_with_fraction() {
        let (tokens, _) = scan("3.14");
        assert_eq!(tokens[0].literal, Some(Literal::Number(3.14)));
    }

    #[test]
    fn trailing_dot_without_digit_is_not_consumed() {
        let (tokens, _) = scan("42.");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::NUMBER, TokenKind::DOT, TokenKind::EOF]
        );
        assert_eq!(tokens[0].literal, Some(Literal::Number(42.0)));
    }

    #[test]
    fn identifier_vs_keyword() {
        let (tokens, _) = scan("orchid or");
        assert_eq!(tokens[0].kind, TokenKind::IDENTIFIER);
        assert_eq!(tokens[1].kind, TokenKind::OR);
    }

    #[test]
    fn whitespace_is_skipped_and_newline_increments_line() {
        let (tokens, _) = scan("1\n2");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unexpected_character_reports_error_and_continues() {
        let (tokens, diagnostics) = scan("@1");
        assert!(diagnostics.had_error());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::NUMBER, TokenKind::EOF]);
    }
}

// ABOUTME: Shared error-reporting sink threaded through scanner, parser, resolver, interpreter

use crate::error::RuntimeError;
use crate::token::{Token, TokenKind};

/// Accumulates the compile-time and runtime error flags that the front-end
/// uses to pick an exit code (spec section 6).
///
/// This replaces the reference implementation's process-global `had_error`
/// / `had_runtime_error` statics with an explicit value threaded by `&mut`
/// reference through the pipeline, per the "Global state" design note:
/// every stage reports through the same sink instead of mutating shared
/// process state.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Reports a compile-time error tied to a source line only (scanner).
    pub fn error(&mut self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Reports a compile-time error tied to a specific token (parser, resolver).
    pub fn error_at_token(&mut self, token: &Token, message: &str) {
        if token.kind == TokenKind::EOF {
            self.report(token.line, " at end", message);
        } else {
            self.report(token.line, &format!(" at '{}'", token.lexeme), message);
        }
    }

    fn report(&mut self, line: usize, where_: &str, message: &str) {
        eprintln!("[line {}] Error{}: {}", line, where_, message);
        self.had_error = true;
    }

    /// Reports a runtime error at the top-level `interpret` boundary.
    pub fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.token.line);
        self.had_runtime_error = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clean() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn error_sets_compile_flag_only() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(1, "Unexpected character: @");
        assert!(diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn runtime_error_sets_runtime_flag_only() {
        let mut diagnostics = Diagnostics::new();
        let token = Token::new(TokenKind::PLUS, "+".to_string(), None, 7);
        diagnostics.runtime_error(&RuntimeError::new(token, "Operand must be a number."));
        assert!(!diagnostics.had_error());
        assert!(diagnostics.had_runtime_error());
    }

    #[test]
    fn error_at_eof_reports_at_end() {
        let mut diagnostics = Diagnostics::new();
        let token = Token::new(TokenKind::EOF, String::new(), None, 2);
        diagnostics.error_at_token(&token, "Expect expression.");
        assert!(diagnostics.had_error());
    }
}

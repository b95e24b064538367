// ABOUTME: Runtime error type carrying the offending token for line context

use crate::token::Token;
use thiserror::Error;

/// A runtime failure raised during interpretation, carrying the token
/// whose line number the top-level boundary reports alongside the message
/// (spec section 7: `<message>\n[line N]`).
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token,
            message: message.into(),
        }
    }
}

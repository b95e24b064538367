// ABOUTME: Expression AST nodes with stable node identity for the resolver's depth table

use crate::token::Token;
use crate::value::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies an `Expr` node for the lifetime of a parse, independent of
/// its contents. Two textually identical `Variable` expressions parsed at
/// different source positions get different ids, which is exactly what
/// the resolver's depth table needs: it must not conflate separate
/// references just because they look alike (spec section 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            id: NodeId::next(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Value),
    Grouping(Box<Expr>),
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        name: Token,
    },
    Assign {
        name: Token,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        closing_paren: Token,
        arguments: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This {
        keyword: Token,
    },
    Super {
        keyword: Token,
        method: Token,
    },
}

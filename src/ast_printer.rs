// ABOUTME: Parenthesised prefix-form printer for the `parse` CLI mode

use crate::expr::{Expr, ExprKind};

/// Prints an expression in fully parenthesised prefix form, e.g.
/// `(* (group (+ 1.0 2.0)) (- 3.0))` for `(1 + 2) * -3`.
pub fn print(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(value) => value.to_string_for_ast(),
        ExprKind::Grouping(inner) => parenthesize("group", &[inner.as_ref()]),
        ExprKind::Unary { operator, right } => {
            parenthesize(&operator.lexeme, &[right.as_ref()])
        }
        ExprKind::Binary {
            left,
            operator,
            right,
        } => parenthesize(&operator.lexeme, &[left.as_ref(), right.as_ref()]),
        ExprKind::Logical {
            left,
            operator,
            right,
        } => parenthesize(&operator.lexeme, &[left.as_ref(), right.as_ref()]),
        // The printer is only ever invoked on the single-expression grammar
        // exercised by the `parse` CLI mode, which cannot produce the
        // remaining variants (it only ever parses through
        // `primary`/`unary`/`binary`/`grouping`/`literal`).
        _ => format!("<{:?}>", expr.kind),
    }
}

fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
    let mut out = format!("({}", name);
    for e in exprs {
        out.push(' ');
        out.push_str(&print(e));
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;
    use crate::diagnostics::Diagnostics;

    fn print_source(src: &str) -> String {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let expr = Parser::new(tokens, &mut diagnostics)
            .parse_single_expression()
            .unwrap();
        print(&expr)
    }

    #[test]
    fn prints_grouping_and_unary() {
        assert_eq!(
            print_source("(1 + 2) * -3"),
            "(* (group (+ 1.0 2.0)) (- 3.0))"
        );
    }

    #[test]
    fn prints_bool_and_nil_literals() {
        assert_eq!(print_source("true"), "true");
        assert_eq!(print_source("nil"), "nil");
    }

    #[test]
    fn prints_string_literal_bare() {
        assert_eq!(print_source("\"hi\""), "hi");
    }
}

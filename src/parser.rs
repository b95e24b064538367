// ABOUTME: Recursive-descent parser with panic-mode error recovery

use crate::diagnostics::Diagnostics;
use crate::expr::{Expr, ExprKind};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenKind};
use crate::value::Value;
use std::rc::Rc;

const MAX_ARGS: usize = 255;

/// Sentinel marking that an error was already reported through
/// `Diagnostics`; carries no payload since the message lives at the
/// report site.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub struct Parser<'d> {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'d mut Diagnostics) -> Self {
        Parser {
            tokens,
            current: 0,
            diagnostics,
        }
    }

    /// `program = declaration* EOF`. Statements that failed to parse are
    /// dropped after panic-mode recovery, so the caller never sees a hole
    /// in the returned list; the compile-error flag on `Diagnostics` is
    /// what actually gates whether it's safe to run the result at all.
    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    /// Parses a single expression for the `parse`/`evaluate` CLI modes.
    pub fn parse_single_expression(&mut self) -> Option<Expr> {
        self.expression().ok()
    }

    // ---- declarations ----

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_any(&[TokenKind::CLASS]) {
            self.class_declaration()
        } else if self.match_any(&[TokenKind::FUN]) {
            self.function("function").map(Stmt::Function)
        } else if self.match_any(&[TokenKind::VAR]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::IDENTIFIER, "Expect class name.")?;

        let superclass = if self.match_any(&[TokenKind::LESS]) {
            self.consume(TokenKind::IDENTIFIER, "Expect superclass name.")?;
            let name = self.previous().clone();
            Some(Expr::new(ExprKind::Variable { name }))
        } else {
            None
        };

        self.consume(TokenKind::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenKind::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenKind::IDENTIFIER, &format!("Expect {} name.", kind))?;
        self.consume(
            TokenKind::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::IDENTIFIER, "Expect parameter name.")?);
                if !self.match_any(&[TokenKind::COMMA]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after parameters.")?;

        self.consume(
            TokenKind::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::IDENTIFIER, "Expect variable name.")?;

        let initializer = if self.match_any(&[TokenKind::EQUAL]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // ---- statements ----

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_any(&[TokenKind::FOR]) {
            return self.for_statement();
        }
        if self.match_any(&[TokenKind::IF]) {
            return self.if_statement();
        }
        if self.match_any(&[TokenKind::PRINT]) {
            return self.print_statement();
        }
        if self.match_any(&[TokenKind::RETURN]) {
            return self.return_statement();
        }
        if self.match_any(&[TokenKind::WHILE]) {
            return self.while_statement();
        }
        if self.match_any(&[TokenKind::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer = if self.match_any(&[TokenKind::SEMICOLON]) {
            None
        } else if self.match_any(&[TokenKind::VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::expression(increment)]);
        }

        let condition = condition.unwrap_or_else(|| Expr::new(ExprKind::Literal(Value::Bool(true))));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_any(&[TokenKind::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::SEMICOLON, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::expression(expr))
    }

    // ---- expressions (lowest to highest precedence) ----

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.or()?;

        if self.match_any(&[TokenKind::EQUAL]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return Ok(match expr.kind {
                ExprKind::Variable { name } => Expr::new(ExprKind::Assign {
                    name,
                    value: Box::new(value),
                }),
                ExprKind::Get { object, name } => Expr::new(ExprKind::Set {
                    object,
                    name,
                    value: Box::new(value),
                }),
                other => {
                    self.diagnostics
                        .error_at_token(&equals, "Invalid assignment target.");
                    Expr::new(other)
                }
            });
        }

        Ok(expr)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut expr = self.and()?;
        while self.match_any(&[TokenKind::OR]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::new(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_any(&[TokenKind::AND]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::new(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        self.left_assoc_binary(
            Self::comparison,
            &[TokenKind::BANG_EQUAL, TokenKind::EQUAL_EQUAL],
        )
    }

    fn comparison(&mut self) -> PResult<Expr> {
        self.left_assoc_binary(
            Self::term,
            &[
                TokenKind::GREATER,
                TokenKind::GREATER_EQUAL,
                TokenKind::LESS,
                TokenKind::LESS_EQUAL,
            ],
        )
    }

    fn term(&mut self) -> PResult<Expr> {
        self.left_assoc_binary(Self::factor, &[TokenKind::MINUS, TokenKind::PLUS])
    }

    fn factor(&mut self) -> PResult<Expr> {
        self.left_assoc_binary(Self::unary, &[TokenKind::SLASH, TokenKind::STAR])
    }

    fn left_assoc_binary(
        &mut self,
        operand: fn(&mut Self) -> PResult<Expr>,
        kinds: &[TokenKind],
    ) -> PResult<Expr> {
        let mut expr = operand(self)?;
        while self.match_any(kinds) {
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expr::new(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_any(&[TokenKind::BANG, TokenKind::MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::new(ExprKind::Unary {
                operator,
                right: Box::new(right),
            }));
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_any(&[TokenKind::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_any(&[TokenKind::DOT]) {
                let name =
                    self.consume(TokenKind::IDENTIFIER, "Expect property name after '.'.")?;
                expr = Expr::new(ExprKind::Get {
                    object: Box::new(expr),
                    name,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    self.error_at_current("Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_any(&[TokenKind::COMMA]) {
                    break;
                }
            }
        }

        let closing_paren = self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::new(ExprKind::Call {
            callee: Box::new(callee),
            closing_paren,
            arguments,
        }))
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_any(&[TokenKind::FALSE]) {
            return Ok(Expr::new(ExprKind::Literal(Value::Bool(false))));
        }
        if self.match_any(&[TokenKind::TRUE]) {
            return Ok(Expr::new(ExprKind::Literal(Value::Bool(true))));
        }
        if self.match_any(&[TokenKind::NIL]) {
            return Ok(Expr::new(ExprKind::Literal(Value::Nil)));
        }
        if self.match_any(&[TokenKind::NUMBER]) {
            let value = match &self.previous().literal {
                Some(crate::token::Literal::Number(n)) => *n,
                _ => unreachable!("NUMBER token without a numeric literal"),
            };
            return Ok(Expr::new(ExprKind::Literal(Value::Number(value))));
        }
        if self.match_any(&[TokenKind::STRING]) {
            let value = match &self.previous().literal {
                Some(crate::token::Literal::Str(s)) => s.clone(),
                _ => unreachable!("STRING token without a string literal"),
            };
            return Ok(Expr::new(ExprKind::Literal(Value::String(value))));
        }
        if self.match_any(&[TokenKind::SUPER]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::DOT, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::IDENTIFIER, "Expect superclass method name.")?;
            return Ok(Expr::new(ExprKind::Super { keyword, method }));
        }
        if self.match_any(&[TokenKind::THIS]) {
            let keyword = self.previous().clone();
            return Ok(Expr::new(ExprKind::This { keyword }));
        }
        if self.match_any(&[TokenKind::IDENTIFIER]) {
            let name = self.previous().clone();
            return Ok(Expr::new(ExprKind::Variable { name }));
        }
        if self.match_any(&[TokenKind::LEFT_PAREN]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after expression.")?;
            return Ok(Expr::new(ExprKind::Grouping(Box::new(expr))));
        }

        Err(self.error_at_current("Expect expression."))
    }

    // ---- token stream primitives ----

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.error_at_current(message))
    }

    fn error_at_current(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.diagnostics.error_at_token(&token, message);
        ParseError
    }

    /// Discards tokens until a likely statement boundary: after a
    /// semicolon, or before a keyword that starts a new declaration/statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::SEMICOLON {
                return;
            }

            match self.peek().kind {
                TokenKind::CLASS
                | TokenKind::FUN
                | TokenKind::VAR
                | TokenKind::FOR
                | TokenKind::IF
                | TokenKind::WHILE
                | TokenKind::PRINT
                | TokenKind::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse_expr(src: &str) -> (Option<Expr>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let expr = Parser::new(tokens, &mut diagnostics).parse_single_expression();
        (expr, diagnostics)
    }

    fn parse_program(src: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let stmts = Parser::new(tokens, &mut diagnostics).parse_program();
        (stmts, diagnostics)
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let (expr, diagnostics) = parse_expr("1 + 2 * 3");
        assert!(!diagnostics.had_error());
        assert!(matches!(
            expr.unwrap().kind,
            ExprKind::Binary { operator, .. } if operator.kind == TokenKind::PLUS
        ));
    }

    #[test]
    fn reports_invalid_assignment_target_but_continues() {
        let (stmts, diagnostics) = parse_program("1 = 2;");
        assert!(diagnostics.had_error());
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn unterminated_group_reports_error_at_end() {
        let (expr, diagnostics) = parse_expr("(1 + 2");
        assert!(diagnostics.had_error());
        assert!(expr.is_none());
    }

    #[test]
    fn synchronize_recovers_at_next_statement_keyword() {
        let (stmts, diagnostics) = parse_program("var = ; var x = 1;");
        assert!(diagnostics.had_error());
        // the bad `var = ;` is dropped, `var x = 1;` still parses
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Var { .. }));
    }

    #[test]
    fn for_desugars_to_block_with_while() {
        let (stmts, diagnostics) =
            parse_program("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(!diagnostics.had_error());
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Block(inner) => {
                assert_eq!(inner.len(), 2);
                assert!(matches!(inner[0], Stmt::Var { .. }));
                assert!(matches!(inner[1], Stmt::While { .. }));
            }
            other => panic!("expected desugared block, got {:?}", other),
        }
    }

    #[test]
    fn class_with_superclass_parses() {
        let (stmts, diagnostics) = parse_program("class B < A { hi() { return 1; } }");
        assert!(!diagnostics.had_error());
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Class {
                superclass,
                methods,
                ..
            } => {
                assert!(superclass.is_some());
                assert_eq!(methods.len(), 1);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }
}

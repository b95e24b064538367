// ABOUTME: Static pass computing lexical-scope depth for every variable reference

use crate::diagnostics::Diagnostics;
use crate::expr::{Expr, ExprKind, NodeId};
use crate::stmt::Stmt;
use crate::token::Token;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Computes, for each `Variable`/`This`/`Super`/`Assign` expression node,
/// how many enclosing block scopes separate it from the scope that
/// declares its name. The interpreter consumes this table verbatim via
/// `Environment::get_at`/`assign_at` instead of re-walking scopes at
/// runtime.
pub struct Resolver<'d> {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionType,
    current_class: ClassType,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> Resolver<'d> {
    pub fn new(diagnostics: &'d mut Diagnostics) -> Self {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            diagnostics,
        }
    }

    /// Resolves an entire program and returns the depth table keyed by
    /// `NodeId`. Absence of an entry means "global" — the interpreter falls
    /// back to `Environment::get`/`assign` walking all the way to globals.
    pub fn resolve(mut self, statements: &[Stmt]) -> HashMap<NodeId, usize> {
        self.resolve_statements(statements);
        self.locals
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(&decl.params, &decl.body, FunctionType::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.diagnostics
                        .error_at_token(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.diagnostics.error_at_token(
                            keyword,
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<crate::stmt::FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass_expr) = superclass {
            if let ExprKind::Variable { name: super_name } = &superclass_expr.kind {
                if super_name.lexeme == name.lexeme {
                    self.diagnostics
                        .error_at_token(super_name, "A class can't inherit from itself.");
                }
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass_expr);

            self.begin_scope();
            self.scopes
                .last_mut()
                .expect("scope just pushed")
                .insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope just pushed")
            .insert("this".to_string(), true);

        for method in methods {
            let declaration_type = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(&method.params, &method.body, declaration_type);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], kind: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Unary { right, .. } => self.resolve_expr(right),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Variable { name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.diagnostics.error_at_token(
                            name,
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }
                self.resolve_local(expr.id, name);
            }
            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, name);
            }
            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object),
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This { keyword } => {
                if self.current_class == ClassType::None {
                    self.diagnostics
                        .error_at_token(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(expr.id, keyword);
            }
            ExprKind::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.diagnostics
                            .error_at_token(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassType::Class => {
                        self.diagnostics.error_at_token(
                            keyword,
                            "Can't use 'super' in a class with no superclass.",
                        );
                        return;
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(expr.id, keyword);
            }
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // not found in any local scope: treated as global, no entry needed
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Marks `name` as declared-but-not-yet-ready in the innermost scope,
    /// so a reference to it inside its own initializer is caught (spec
    /// section 4.4's shadowing edge case).
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(&name.lexeme) {
            self.diagnostics.error_at_token(
                name,
                "Already a variable with this name in this scope.",
            );
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve_source(src: &str) -> (HashMap<NodeId, usize>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let statements = Parser::new(tokens, &mut diagnostics).parse_program();
        let locals = Resolver::new(&mut diagnostics).resolve(&statements);
        (locals, diagnostics)
    }

    #[test]
    fn global_reference_gets_no_depth_entry() {
        let (locals, diagnostics) = resolve_source("var a = 1; print a;");
        assert!(!diagnostics.had_error());
        assert!(locals.is_empty());
    }

    #[test]
    fn block_local_reference_gets_depth_zero() {
        let (locals, diagnostics) = resolve_source("{ var a = 1; print a; }");
        assert!(!diagnostics.had_error());
        assert_eq!(locals.len(), 1);
        assert_eq!(*locals.values().next().unwrap(), 0);
    }

    #[test]
    fn nested_function_reference_walks_outer_scopes() {
        let (locals, diagnostics) = resolve_source(
            "fun outer() { var a = 1; fun inner() { print a; } inner(); }",
        );
        assert!(!diagnostics.had_error());
        assert!(locals.values().any(|&d| d == 1));
    }

    #[test]
    fn self_referencing_initializer_is_an_error() {
        let (_, diagnostics) = resolve_source("var a = 1; { var a = a; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn duplicate_local_declaration_is_an_error() {
        let (_, diagnostics) = resolve_source("{ var a = 1; var a = 2; }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn top_level_return_is_an_error() {
        let (_, diagnostics) = resolve_source("return 1;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn return_value_from_initializer_is_an_error() {
        let (_, diagnostics) =
            resolve_source("class A { init() { return 1; } }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn bare_return_from_initializer_is_allowed() {
        let (_, diagnostics) = resolve_source("class A { init() { return; } }");
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn this_outside_class_is_an_error() {
        let (_, diagnostics) = resolve_source("print this;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn super_outside_class_is_an_error() {
        let (_, diagnostics) = resolve_source("print super.x;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn super_without_superclass_is_an_error() {
        let (_, diagnostics) =
            resolve_source("class A { foo() { print super.bar; } }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn class_inheriting_itself_is_an_error() {
        let (_, diagnostics) = resolve_source("class A < A {}");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn valid_subclass_resolves_super_and_this() {
        let (_, diagnostics) = resolve_source(
            "class A { greet() { return 1; } } class B < A { greet() { return super.greet(); } }",
        );
        assert!(!diagnostics.had_error());
    }
}

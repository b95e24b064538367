// ABOUTME: Tree-walking evaluator executing a resolved Lox program

use crate::diagnostics::Diagnostics;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::{Expr, ExprKind, NodeId};
use crate::stmt::Stmt;
use crate::token::{Token, TokenKind};
use crate::value::{Callable, Class, Instance, NativeFunction, UserFunction, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Threads a pending `return` up through nested statement execution without
/// using panics or a dedicated `Err` variant — a plain enum instead of the
/// exception jlox reaches for (spec section 9, "no control-flow exceptions").
enum Signal {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<Environment>,
    environment: RefCell<Rc<Environment>>,
    locals: HashMap<NodeId, usize>,
}

fn native_clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(seconds))
}

impl Interpreter {
    /// Builds an interpreter seeded with the native functions and the
    /// resolver's depth table.
    pub fn new(locals: HashMap<NodeId, usize>) -> Self {
        let globals = Environment::new();
        globals.define(
            "clock",
            Value::Callable(Callable::Native(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: native_clock,
            }))),
        );

        Interpreter {
            environment: RefCell::new(Rc::clone(&globals)),
            globals,
            locals,
        }
    }

    /// Runs a program top to bottom, stopping at the first runtime error
    /// and reporting it through `diagnostics` (spec section 6: a runtime
    /// error halts the `run` mode with exit code 70).
    pub fn interpret(&self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(_) => {}
                Err(err) => {
                    diagnostics.runtime_error(&err);
                    return;
                }
            }
        }
    }

    /// Evaluates a single expression for the `evaluate` CLI mode.
    pub fn evaluate_single(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.evaluate(expr)
    }

    fn execute(&self, stmt: &Stmt) -> Result<Signal, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Signal::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(Signal::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow().define(name.lexeme.clone(), value);
                Ok(Signal::Normal)
            }
            Stmt::Block(statements) => {
                let inner = self.environment.borrow().inner();
                self.execute_block(statements, inner)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                Ok(Signal::Normal)
            }
            Stmt::Function(decl) => {
                let function = Rc::new(UserFunction {
                    declaration: Rc::clone(decl),
                    closure: Rc::clone(&self.environment.borrow()),
                    is_initializer: false,
                });
                self.environment.borrow().define(
                    decl.name.lexeme.clone(),
                    Value::Callable(Callable::Function(function)),
                );
                Ok(Signal::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(value))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class(
        &self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::stmt::FunctionDecl>],
    ) -> Result<Signal, RuntimeError> {
        let superclass_value = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Callable(Callable::Class(class)) => Some(class),
                    _ => {
                        return Err(RuntimeError::new(
                            class_token(expr),
                            "Superclass must be a class.",
                        ))
                    }
                }
            }
            None => None,
        };

        self.environment.borrow().define(name.lexeme.clone(), Value::Nil);

        let method_env = if let Some(superclass) = &superclass_value {
            let env = self.environment.borrow().inner();
            env.define(
                "super",
                Value::Callable(Callable::Class(Rc::clone(superclass))),
            );
            env
        } else {
            Rc::clone(&self.environment.borrow())
        };

        let mut method_table = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = Rc::new(UserFunction {
                declaration: Rc::clone(method),
                closure: Rc::clone(&method_env),
                is_initializer,
            });
            method_table.insert(method.name.lexeme.clone(), function);
        }

        let class = Rc::new(Class {
            name: name.lexeme.clone(),
            superclass: superclass_value,
            methods: method_table,
        });

        self.environment
            .borrow()
            .assign(name, Value::Callable(Callable::Class(class)))?;

        Ok(Signal::Normal)
    }

    /// Runs `statements` in `new_environment`, restoring the previous
    /// environment afterwards even on error or early return (spec section
    /// 3's scoped-resource invariant for block execution).
    fn execute_block(
        &self,
        statements: &[Stmt],
        new_environment: Rc<Environment>,
    ) -> Result<Signal, RuntimeError> {
        let previous = self.environment.replace(new_environment);
        let result = (|| {
            for stmt in statements {
                match self.execute(stmt)? {
                    Signal::Normal => {}
                    signal @ Signal::Return(_) => return Ok(signal),
                }
            }
            Ok(Signal::Normal)
        })();
        self.environment.replace(previous);
        result
    }

    fn evaluate(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary { operator, right } => self.evaluate_unary(operator, right),
            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),
            ExprKind::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),
            ExprKind::Variable { name } => self.look_up_variable(name, expr.id),
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(&expr.id) {
                    Some(&distance) => {
                        self.environment
                            .borrow()
                            .assign_at(distance, &name.lexeme, value.clone());
                    }
                    None => {
                        self.globals.assign(name, value.clone())?;
                    }
                }
                Ok(value)
            }
            ExprKind::Call {
                callee,
                closing_paren,
                arguments,
            } => self.evaluate_call(callee, closing_paren, arguments),
            ExprKind::Get { object, name } => {
                let object = self.evaluate(object)?;
                self.get_property(&object, name)
            }
            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(
                        name.clone(),
                        "Only instances have properties.",
                    ));
                };
                let value = self.evaluate(value)?;
                instance.set_field(&name.lexeme, value.clone());
                Ok(value)
            }
            ExprKind::This { keyword } => self.look_up_variable(keyword, expr.id),
            ExprKind::Super { keyword, method } => self.evaluate_super(keyword, method, expr.id),
        }
    }

    fn look_up_variable(&self, name: &Token, id: NodeId) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(self.environment.borrow().get_at(distance, &name.lexeme)),
            None => self.globals.get(name),
        }
    }

    fn evaluate_unary(&self, operator: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let right = self.evaluate(right)?;
        match operator.kind {
            TokenKind::MINUS => Ok(Value::Number(-number_operand(operator, &right)?)),
            TokenKind::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("unary operator must be MINUS or BANG"),
        }
    }

    fn evaluate_logical(
        &self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;
        match operator.kind {
            TokenKind::OR if left.is_truthy() => Ok(left),
            TokenKind::AND if !left.is_truthy() => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_binary(
        &self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.kind {
            TokenKind::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }
            TokenKind::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a / b))
            }
            TokenKind::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }
            TokenKind::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                _ => Err(RuntimeError::new(
                    operator.clone(),
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenKind::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }
            TokenKind::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }
            TokenKind::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }
            TokenKind::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }
            TokenKind::BANG_EQUAL => Ok(Value::Bool(left != right)),
            TokenKind::EQUAL_EQUAL => Ok(Value::Bool(left == right)),
            _ => unreachable!("not a binary operator: {:?}", operator.kind),
        }
    }

    fn evaluate_call(
        &self,
        callee: &Expr,
        closing_paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, RuntimeError> {
        let callee = self.evaluate(callee)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg)?);
        }

        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::new(
                closing_paren.clone(),
                "Can only call functions and classes.",
            ));
        };

        let arity = callable.arity();
        if args.len() != arity {
            return Err(RuntimeError::new(
                closing_paren.clone(),
                format!("Expected {} arguments but got {}.", arity, args.len()),
            ));
        }

        self.call(callable, args)
    }

    fn call(&self, callable: Callable, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        match callable {
            Callable::Native(native) => (native.func)(&arguments),
            Callable::Function(function) => self.call_user_function(&function, arguments),
            Callable::Class(class) => {
                let instance = Rc::new(Instance::new(Rc::clone(&class)));
                if let Some(initializer) = class.find_method("init") {
                    let bound = initializer.bind(Rc::clone(&instance));
                    self.call_user_function(&bound, arguments)?;
                }
                Ok(Value::Instance(instance))
            }
        }
    }

    fn call_user_function(
        &self,
        function: &Rc<UserFunction>,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let call_env = function.closure.inner();
        for (param, arg) in function.declaration.params.iter().zip(arguments) {
            call_env.define(param.lexeme.clone(), arg);
        }

        match self.execute_block(&function.declaration.body, call_env)? {
            Signal::Return(value) => {
                if function.is_initializer {
                    Ok(function.closure.get_at(0, "this"))
                } else {
                    Ok(value)
                }
            }
            Signal::Normal if function.is_initializer => Ok(function.closure.get_at(0, "this")),
            Signal::Normal => Ok(Value::Nil),
        }
    }

    fn get_property(&self, object: &Value, name: &Token) -> Result<Value, RuntimeError> {
        let Value::Instance(instance) = object else {
            return Err(RuntimeError::new(
                name.clone(),
                "Only instances have properties.",
            ));
        };

        if let Some(value) = instance.get_field(&name.lexeme) {
            return Ok(value);
        }

        if let Some(method) = instance.class.find_method(&name.lexeme) {
            return Ok(Value::Callable(Callable::Function(
                method.bind(Rc::clone(instance)),
            )));
        }

        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    fn evaluate_super(
        &self,
        keyword: &Token,
        method: &Token,
        id: NodeId,
    ) -> Result<Value, RuntimeError> {
        let distance = *self
            .locals
            .get(&id)
            .expect("resolver always assigns 'super' a depth when it typechecks");

        let superclass = match self.environment.borrow().get_at(distance, "super") {
            Value::Callable(Callable::Class(class)) => class,
            _ => unreachable!("'super' binding must hold a class"),
        };

        let instance = match self.environment.borrow().get_at(distance - 1, "this") {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' binding must hold an instance"),
        };

        let Some(bound_method) = superclass.find_method(&method.lexeme) else {
            return Err(RuntimeError::new(
                method.clone(),
                format!("Undefined property '{}'.", method.lexeme),
            ));
        };

        Ok(Value::Callable(Callable::Function(
            bound_method.bind(instance),
        )))
    }
}

fn class_token(expr: &Expr) -> Token {
    match &expr.kind {
        ExprKind::Variable { name } => name.clone(),
        _ => unreachable!("superclass expression must be a Variable"),
    }
}

fn number_operand(operator: &Token, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::new(
            operator.clone(),
            "Operand must be a number.",
        )),
    }
}

fn number_operands(
    operator: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(
            operator.clone(),
            "Operand must be a number.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    fn run(src: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(src).scan_tokens(&mut diagnostics);
        let statements = Parser::new(tokens, &mut diagnostics).parse_program();
        let locals = Resolver::new(&mut diagnostics).resolve(&statements);
        let interpreter = Interpreter::new(locals);
        interpreter.interpret(&statements, &mut diagnostics);
        diagnostics
    }

    #[test]
    fn arithmetic_and_print_do_not_error() {
        let diagnostics = run("print 1 + 2 * 3;");
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn adding_number_and_string_is_runtime_error() {
        let diagnostics = run("print 1 + \"a\";");
        assert!(diagnostics.had_runtime_error());
    }

    #[test]
    fn undefined_variable_is_runtime_error() {
        let diagnostics = run("print missing;");
        assert!(diagnostics.had_runtime_error());
    }

    #[test]
    fn global_shadowing_block_sees_outer_value_in_initializer() {
        // `var a = a;` at global scope reads the (already-defined) global `a`,
        // not an error -- the resolver only rejects this inside a block.
        let diagnostics = run("var a = \"outer\"; { var a = a; print a; }");
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let diagnostics = run(
            "fun makeCounter() { var i = 0; fun count() { i = i + 1; return i; } return count; } \
             var counter = makeCounter(); print counter(); print counter();",
        );
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn class_instantiation_and_method_call() {
        let diagnostics = run(
            "class Greeter { greet() { return \"hi\"; } } \
             var g = Greeter(); print g.greet();",
        );
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn initializer_always_returns_this_even_with_bare_return() {
        let diagnostics = run(
            "class Box { init(v) { this.v = v; return; } } \
             var b = Box(10); print b.v;",
        );
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn inheritance_and_super_dispatch() {
        let diagnostics = run(
            "class A { greet() { return \"A\"; } } \
             class B < A { greet() { return super.greet() + \"B\"; } } \
             print B().greet();",
        );
        assert!(!diagnostics.had_runtime_error());
    }

    #[test]
    fn calling_non_callable_is_runtime_error() {
        let diagnostics = run("var x = 1; x();");
        assert!(diagnostics.had_runtime_error());
    }

    #[test]
    fn wrong_arity_is_runtime_error() {
        let diagnostics = run("fun f(a, b) { return a + b; } f(1);");
        assert!(diagnostics.had_runtime_error());
    }
}

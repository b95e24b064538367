// ABOUTME: Runtime value domain: nil/bool/number/string plus callables and instances

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::stmt::FunctionDecl;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(Rc<Instance>),
}

/// The three callable kinds, embedded directly as `Value` payloads rather
/// than behind a `dyn Callable` trait object — tagged union over open
/// polymorphism, per spec section 9.
#[derive(Debug, Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    Function(Rc<UserFunction>),
    Class(Rc<Class>),
}

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, RuntimeError>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Debug)]
pub struct UserFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl UserFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Creates a bound method: a fresh environment child of the original
    /// closure with `this` defined at depth 0 (spec section 3/4.5).
    pub fn bind(self: &Rc<Self>, instance: Rc<Instance>) -> Rc<UserFunction> {
        let env = self.closure.inner();
        env.define("this", Value::Instance(instance));
        Rc::new(UserFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        })
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<UserFunction>>,
}

impl Class {
    /// Looks up `name` in this class's own methods, then recurses into the
    /// superclass chain. No multiple inheritance.
    pub fn find_method(&self, name: &str) -> Option<Rc<UserFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass
            .as_ref()
            .and_then(|sup| sup.find_method(name))
    }

    /// The arity of `init`, searched through the superclass chain, or 0 if
    /// there is none.
    pub fn arity(&self) -> usize {
        self.find_method("init").map(|m| m.arity()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl PartialEq for Value {
    /// Equality rule from spec section 4.5: `nil == nil`; `nil` equals
    /// nothing else; numbers/strings/bools compare by value (IEEE
    /// equality for numbers, so `NaN != NaN`); callables and instances
    /// compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Nil, _) | (_, Value::Nil) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.identity_eq(b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Callable {
    fn identity_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(f) => f.arity,
            Callable::Function(f) => f.arity(),
            Callable::Class(c) => c.arity(),
        }
    }
}

impl Value {
    /// Truthiness rule: only `nil` and `false` are falsey.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Literal formatting for the `parse` CLI mode's AST printer. Unlike
    /// `stringify` (the `Display` impl below), whole numbers keep their
    /// `.0` suffix here — confirmed by the literal AST-printer round-trip
    /// in spec section 8 (`(+ 1.0 2.0)`, not `(+ 1 2)`).
    pub fn to_string_for_ast(&self) -> String {
        match self {
            Value::Number(n) => crate::token::format_number_literal(*n),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    /// The `stringify` rule from spec section 4.5.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Callable(Callable::Native(n)) => write!(f, "<native fn {}>", n.name),
            Value::Callable(Callable::Function(func)) => {
                write!(f, "<fn {}>", func.declaration.name.lexeme)
            }
            Value::Callable(Callable::Class(c)) => write!(f, "{}", c.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_equals_only_nil() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Nil, Value::Number(0.0));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let nan = Value::Number(f64::NAN);
        assert_ne!(nan.clone(), nan);
    }

    #[test]
    fn truthiness_rule() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn stringify_whole_number_strips_decimal() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
    }

    #[test]
    fn stringify_nil_and_bools() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn instance_stringifies_with_class_name() {
        let class = Rc::new(Class {
            name: "Bagel".to_string(),
            superclass: None,
            methods: HashMap::new(),
        });
        let instance = Rc::new(Instance::new(class));
        assert_eq!(Value::Instance(instance).to_string(), "Bagel instance");
    }

    #[test]
    fn class_find_method_walks_superclass_chain() {
        let base = Rc::new(Class {
            name: "Base".to_string(),
            superclass: None,
            methods: {
                let mut m = HashMap::new();
                m.insert(
                    "greet".to_string(),
                    Rc::new(UserFunction {
                        declaration: Rc::new(FunctionDecl {
                            name: crate::token::Token::new(
                                crate::token::TokenKind::IDENTIFIER,
                                "greet".to_string(),
                                None,
                                1,
                            ),
                            params: vec![],
                            body: vec![],
                        }),
                        closure: Environment::new(),
                        is_initializer: false,
                    }),
                );
                m
            },
        });
        let derived = Class {
            name: "Derived".to_string(),
            superclass: Some(base),
            methods: HashMap::new(),
        };
        assert!(derived.find_method("greet").is_some());
        assert!(derived.find_method("missing").is_none());
    }
}

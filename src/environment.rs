// ABOUTME: Lexically-nested name-to-value bindings, with ancestor walk by resolver-provided depth

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A single lexical scope. Owns its own bindings; `parent` is a shared
/// pointer so that every closure and active call frame that references an
/// ancestor scope keeps it alive.
#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the global environment, with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a fresh child scope of `parent`.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Unconditionally binds `name` in this scope, overwriting any
    /// existing binding by the same name here (but not in an ancestor).
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Looks up `name` starting in this scope and walking up through
    /// `parent`. Fails at the leaf if no scope binds it.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.bindings.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(parent) = &self.parent {
            return parent.get(name);
        }

        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    /// Assigns `value` in the nearest scope (this one or an ancestor)
    /// where `name` is already bound. Fails if no scope binds it.
    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.bindings.borrow().contains_key(&name.lexeme) {
            self.bindings
                .borrow_mut()
                .insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(parent) = &self.parent {
            return parent.assign(name, value);
        }

        Err(RuntimeError::new(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    /// Returns the binding for `name` exactly `distance` scopes up, with
    /// no fallback. Only ever called with a distance the resolver produced
    /// for this exact AST, so the invariant (§4.3) guarantees the name is
    /// bound in that scope.
    pub fn get_at(&self, distance: usize, name: &str) -> Value {
        self.ancestor(distance)
            .bindings
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("resolver depth invariant violated for '{}'", name))
    }

    /// Sets the binding for `name` exactly `distance` scopes up, with no
    /// fallback. Same invariant as `get_at`.
    pub fn assign_at(&self, distance: usize, name: &str, value: Value) {
        self.ancestor(distance)
            .bindings
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    fn ancestor(&self, distance: usize) -> &Environment {
        let mut env = self;
        for _ in 0..distance {
            env = env
                .parent
                .as_deref()
                .expect("resolver depth invariant violated: ran out of ancestors");
        }
        env
    }

    /// Creates a fresh child environment of `self`. Requires an `Rc` handle
    /// to `self` since the child must be able to outlive any particular
    /// stack frame holding `self`.
    pub fn inner(self: &Rc<Self>) -> Rc<Environment> {
        Environment::with_parent(Rc::clone(self))
    }
}

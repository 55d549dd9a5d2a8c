//! Lexically nested binding tables.
//!
//! Environments form a tree rooted at the globals: each one holds its own
//! bindings plus an optional enclosing link, and lookups walk toward the
//! root. Closures keep their capture environment alive through the shared
//! `Env` handle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn enclosing(outer: Env) -> Env {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(outer),
        }))
    }

    /// Creates or overwrites a binding in this environment.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Resolves a name against the nearest enclosing scope that defines it.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        self.enclosing
            .as_ref()
            .and_then(|outer| outer.borrow().get(name))
    }

    /// Updates the nearest existing binding. Returns `false` when the name is
    /// not defined anywhere in the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.enclosing {
            Some(outer) => outer.borrow_mut().assign(name, value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_through_enclosing_chain() {
        let globals = Environment::new();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::enclosing(globals.clone());
        let innermost = Environment::enclosing(inner.clone());

        assert_eq!(innermost.borrow().get("a"), Some(Value::Number(1.0)));
        assert_eq!(innermost.borrow().get("missing"), None);
    }

    #[test]
    fn shadowing_resolves_to_nearest_scope() {
        let globals = Environment::new();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::enclosing(globals.clone());
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(inner.borrow().get("a"), Some(Value::Number(2.0)));
        assert_eq!(globals.borrow().get("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_updates_nearest_binding_and_leaves_others_alone() {
        let globals = Environment::new();
        globals.borrow_mut().define("a", Value::Number(1.0));
        globals.borrow_mut().define("b", Value::Number(10.0));

        let inner = Environment::enclosing(globals.clone());
        assert!(inner.borrow_mut().assign("a", Value::Number(5.0)));
        assert!(!inner.borrow_mut().assign("missing", Value::Nil));

        assert_eq!(globals.borrow().get("a"), Some(Value::Number(5.0)));
        assert_eq!(globals.borrow().get("b"), Some(Value::Number(10.0)));
    }
}

//! Runtime value model shared by the evaluator and the VM.
//!
//! Values are a tagged sum. `Number`/`String` carry their payload by value;
//! reference-flavored variants (`Array`, `Function`, `Class`, `Instance`)
//! share their payload behind `Rc` so that closures and instances alias the
//! same state. Each value answers `type_tag` for operator dispatch and
//! `inspect` for printing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Ident, Stmt};
use crate::code::Instructions;

pub mod builtins;
pub mod environment;

use builtins::Builtin;
use environment::{Env, Environment};

#[derive(Clone)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Nil,
    String(String),
    Array(Rc<Vec<Value>>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    /// Control-flow signal carrying a `return` value up to the nearest call
    /// boundary. Never observable from user programs.
    Return(Box<Value>),
    Builtin(Builtin),
    CompiledFunction(Rc<CompiledFunction>),
}

/// A user function together with the environment captured at its definition
/// site.
pub struct Function {
    pub name: String,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub closure: Env,
    pub is_initializer: bool,
}

impl Function {
    /// Produces a copy of this method whose closure has `this` bound to the
    /// given instance.
    pub fn bind(&self, instance: &Rc<Instance>) -> Rc<Function> {
        let env = Environment::enclosing(self.closure.clone());
        env.borrow_mut()
            .define("this", Value::Instance(Rc::clone(instance)));
        Rc::new(Function {
            name: self.name.clone(),
            params: self.params.clone(),
            body: self.body.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        })
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name)
    }
}

pub struct Class {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,
    pub superclass: Option<Rc<Class>>,
}

impl Class {
    /// Resolves a method on this class, falling through the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Reads a field. Method lookup is layered on top by the evaluator, which
    /// needs the `Rc<Instance>` handle to bind `this`.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: Value) {
        self.fields.borrow_mut().insert(name.into(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

/// A function body lowered to bytecode, executed by the VM back-end only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

impl Value {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Boolean(_) => "Boolean",
            Value::Nil => "Nil",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Function(_) => "Function",
            Value::Class(_) => "Class",
            Value::Instance(_) => "Instance",
            Value::Return(_) => "Return",
            Value::Builtin(_) => "Builtin",
            Value::CompiledFunction(_) => "CompiledFunction",
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Value::Number(value) => format_number(*value),
            Value::Boolean(value) => value.to_string(),
            Value::Nil => "nil".to_string(),
            Value::String(value) => value.clone(),
            Value::Array(elements) => {
                let rendered: Vec<String> = elements.iter().map(Value::inspect).collect();
                format!("[{}]", rendered.join(", "))
            }
            Value::Function(function) => format!("<fn {}>", function.name),
            Value::Class(class) => format!("class {}", class.name),
            Value::Instance(instance) => format!("{} instance", instance.class.name),
            Value::Return(value) => value.inspect(),
            Value::Builtin(builtin) => format!("<builtin {}>", builtin.name()),
            Value::CompiledFunction(_) => "<compiled fn>".to_string(),
        }
    }

    /// `false` and `nil` are falsy; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Language `==`: `Number` and `String` compare by value, reference
    /// variants by identity, and any cross-type comparison is `false`.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(left), Value::Number(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Nil, Value::Nil) => true,
            (Value::Array(left), Value::Array(right)) => Rc::ptr_eq(left, right),
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            (Value::Class(left), Value::Class(right)) => Rc::ptr_eq(left, right),
            (Value::Instance(left), Value::Instance(right)) => Rc::ptr_eq(left, right),
            (Value::Builtin(left), Value::Builtin(right)) => left == right,
            (Value::CompiledFunction(left), Value::CompiledFunction(right)) => {
                Rc::ptr_eq(left, right)
            }
            _ => false,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_tag(), self.inspect())
    }
}

/// Structural equality for assertions: arrays compare element-wise, reference
/// variants still by identity. Language `==` semantics live in
/// [`Value::equals`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(left), Value::Array(right)) => left == right,
            (Value::Return(left), Value::Return(right)) => left == right,
            (Value::CompiledFunction(left), Value::CompiledFunction(right)) => left == right,
            _ => self.equals(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspects_integral_numbers_without_decimals() {
        assert_eq!(Value::Number(5.0).inspect(), "5");
        assert_eq!(Value::Number(-2.0).inspect(), "-2");
        assert_eq!(Value::Number(2.5).inspect(), "2.5");
    }

    #[test]
    fn inspects_compound_values() {
        let array = Value::Array(Rc::new(vec![
            Value::Number(1.0),
            Value::String("two".to_string()),
            Value::Nil,
        ]));
        assert_eq!(array.inspect(), "[1, two, nil]");
        assert_eq!(Value::Boolean(true).inspect(), "true");
        assert_eq!(Value::Builtin(Builtin::Len).inspect(), "<builtin len>");
    }

    #[test]
    fn truthiness_holds_for_all_variants() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
        assert!(Value::Array(Rc::new(vec![])).is_truthy());
    }

    #[test]
    fn numbers_and_strings_compare_by_value() {
        assert!(Value::Number(3.0).equals(&Value::Number(3.0)));
        assert!(Value::String("a".to_string()).equals(&Value::String("a".to_string())));
        assert!(!Value::Number(3.0).equals(&Value::String("3".to_string())));
        assert!(!Value::Nil.equals(&Value::Boolean(false)));
    }

    #[test]
    fn arrays_compare_by_identity_in_language_equality() {
        let shared = Rc::new(vec![Value::Number(1.0)]);
        let left = Value::Array(Rc::clone(&shared));
        let right = Value::Array(shared);
        assert!(left.equals(&right));

        let other = Value::Array(Rc::new(vec![Value::Number(1.0)]));
        assert!(!left.equals(&other));
        // Structural equality still sees them as equal for assertions.
        assert_eq!(left, other);
    }
}

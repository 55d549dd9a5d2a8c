//! Native functions available in every program's global scope.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::evaluator::error::RuntimeError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Clock,
    Len,
    Push,
    Rest,
    At,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Clock,
        Builtin::Len,
        Builtin::Push,
        Builtin::Rest,
        Builtin::At,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Clock => "clock",
            Builtin::Len => "len",
            Builtin::Push => "push",
            Builtin::Rest => "rest",
            Builtin::At => "at",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Clock => 0,
            Builtin::Len => 1,
            Builtin::Push => 2,
            Builtin::Rest => 1,
            Builtin::At => 2,
        }
    }

    /// Invokes the native implementation. The caller has already checked the
    /// argument count against `arity`.
    pub fn call(self, args: &[Value]) -> Result<Value, RuntimeError> {
        match self {
            Builtin::Clock => Ok(clock()),
            Builtin::Len => len(args),
            Builtin::Push => push(args),
            Builtin::Rest => rest(args),
            Builtin::At => at(args),
        }
    }
}

fn clock() -> Value {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Value::Number(now.as_secs() as f64)
}

fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    match args {
        [Value::String(value)] => Ok(Value::Number(value.len() as f64)),
        [Value::Array(elements)] => Ok(Value::Number(elements.len() as f64)),
        [other] => Err(argument_error("len", "String or Array", other)),
        _ => Err(arity_error(Builtin::Len, args)),
    }
}

/// Returns a new array with the value appended; the original is untouched.
fn push(args: &[Value]) -> Result<Value, RuntimeError> {
    match args {
        [Value::Array(elements), value] => {
            let mut extended = elements.as_ref().clone();
            extended.push(value.clone());
            Ok(Value::Array(Rc::new(extended)))
        }
        [other, _] => Err(argument_error("push", "Array", other)),
        _ => Err(arity_error(Builtin::Push, args)),
    }
}

/// Returns a new array of all but the first element, or `nil` when empty.
fn rest(args: &[Value]) -> Result<Value, RuntimeError> {
    match args {
        [Value::Array(elements)] => {
            if elements.is_empty() {
                return Ok(Value::Nil);
            }
            Ok(Value::Array(Rc::new(elements[1..].to_vec())))
        }
        [other] => Err(argument_error("rest", "Array", other)),
        _ => Err(arity_error(Builtin::Rest, args)),
    }
}

/// Indexes an array, yielding `nil` when the index is out of range.
fn at(args: &[Value]) -> Result<Value, RuntimeError> {
    match args {
        [Value::Array(elements), Value::Number(index)] => {
            if *index < 0.0 {
                return Ok(Value::Nil);
            }
            Ok(elements
                .get(*index as usize)
                .cloned()
                .unwrap_or(Value::Nil))
        }
        [Value::Array(_), other] => Err(argument_error("at", "Number", other)),
        [other, _] => Err(argument_error("at", "Array", other)),
        _ => Err(arity_error(Builtin::At, args)),
    }
}

fn argument_error(builtin: &'static str, expected: &'static str, got: &Value) -> RuntimeError {
    RuntimeError::BuiltinArgumentType {
        builtin,
        expected,
        got: got.type_tag().to_string(),
    }
}

fn arity_error(builtin: Builtin, args: &[Value]) -> RuntimeError {
    RuntimeError::ArityMismatch {
        expected: builtin.arity(),
        found: args.len(),
    }
}

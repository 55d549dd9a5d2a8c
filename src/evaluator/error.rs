use thiserror::Error;

use crate::token::Position;

/// Typed errors raised while evaluating a program.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("unknown operator: {operator}{operand} (at {position})")]
    UnknownUnaryOperator {
        operator: String,
        operand: String,
        position: Position,
    },
    #[error("unknown operator: {left} {operator} {right} (at {position})")]
    UnknownOperator {
        left: String,
        operator: String,
        right: String,
        position: Position,
    },
    #[error("type mismatch: {left} {operator} {right} (at {position})")]
    TypeMismatch {
        left: String,
        operator: String,
        right: String,
        position: Position,
    },
    #[error("identifier not found: {name}")]
    IdentifierNotFound { name: String },
    #[error("not a callable: {type_tag}")]
    NotCallable { type_tag: String },
    #[error("expected {expected} arguments but got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("required instance: got {type_tag} (at {position})")]
    RequiredInstance {
        type_tag: String,
        position: Position,
    },
    #[error("undefined property: {name} (at {position})")]
    PropertyNotFound { name: String, position: Position },
    #[error("could not use `this` outside of a method (at {position})")]
    ThisOutsideMethod { position: Position },
    #[error("invalid literal token: {lexeme}")]
    InvalidLiteral { lexeme: String },
    #[error("`super` is not supported (at {position})")]
    SuperUnsupported { position: Position },
    #[error("superclass must be a class, got {type_tag}")]
    SuperclassMustBeClass { type_tag: String },
    #[error("argument to `{builtin}` must be {expected}, got {got}")]
    BuiltinArgumentType {
        builtin: &'static str,
        expected: &'static str,
        got: String,
    },
}

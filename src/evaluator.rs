//! Tree-walking back-end.
//!
//! Executes a `Program` statement by statement against a chain of lexical
//! environments. Blocks swap a fresh enclosing environment in and restore the
//! previous one on every exit path, including errors. `return` travels as a
//! `Value::Return` sentinel that block execution propagates upward until a
//! call boundary unwraps it.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, FunctionDecl, Program, Stmt};
use crate::token::{Kind, Token};
use crate::value::builtins::Builtin;
use crate::value::environment::{Env, Environment};
use crate::value::{Class, Function, Instance, Value};

pub mod error;

use error::RuntimeError;

pub type EvalResult = Result<Value, RuntimeError>;

pub struct Evaluator {
    env: Env,
    output: Vec<String>,
}

impl Evaluator {
    pub fn new() -> Self {
        let env = Environment::new();
        for builtin in Builtin::ALL {
            env.borrow_mut()
                .define(builtin.name(), Value::Builtin(builtin));
        }
        Self {
            env,
            output: Vec::new(),
        }
    }

    /// Runs every top-level statement in order and yields the value of the
    /// last one. A top-level `return` stops execution and yields its value.
    pub fn evaluate(&mut self, program: &Program) -> EvalResult {
        let mut result = Value::Nil;
        for statement in &program.statements {
            match self.exec_statement(statement)? {
                Value::Return(value) => return Ok(*value),
                value => result = value,
            }
        }
        Ok(result)
    }

    /// Drains the lines produced by `print` statements since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn exec_statement(&mut self, statement: &Stmt) -> EvalResult {
        match statement {
            Stmt::Expression { expression } => self.eval_expression(expression),
            Stmt::Print { expression } => {
                let value = self.eval_expression(expression)?;
                self.output.push(value.inspect());
                Ok(Value::Nil)
            }
            Stmt::Var { ident, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.eval_expression(initializer)?,
                    None => Value::Nil,
                };
                self.env.borrow_mut().define(ident.name.clone(), value);
                Ok(Value::Nil)
            }
            Stmt::Block { statements } => {
                let enclosing = Environment::enclosing(self.env.clone());
                self.execute_block(statements, enclosing)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_expression(condition)?.is_truthy() {
                    self.exec_statement(then_branch)
                } else {
                    match else_branch {
                        Some(else_branch) => self.exec_statement(else_branch),
                        None => Ok(Value::Nil),
                    }
                }
            }
            Stmt::While { condition, body } => {
                while self.eval_expression(condition)?.is_truthy() {
                    let result = self.exec_statement(body)?;
                    if matches!(result, Value::Return(_)) {
                        return Ok(result);
                    }
                }
                Ok(Value::Nil)
            }
            Stmt::Return { value } => {
                let value = match value {
                    Some(value) => self.eval_expression(value)?,
                    None => Value::Nil,
                };
                Ok(Value::Return(Box::new(value)))
            }
            Stmt::Function(declaration) => {
                let function = self.make_function(declaration);
                self.env
                    .borrow_mut()
                    .define(declaration.name.clone(), Value::Function(function));
                Ok(Value::Nil)
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.exec_class_statement(name, superclass.as_deref(), methods),
        }
    }

    fn exec_class_statement(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        methods: &[FunctionDecl],
    ) -> EvalResult {
        let superclass = match superclass {
            Some(superclass_name) => {
                let value = self.env.borrow().get(superclass_name).ok_or_else(|| {
                    RuntimeError::IdentifierNotFound {
                        name: superclass_name.to_string(),
                    }
                })?;
                match value {
                    Value::Class(class) => Some(class),
                    other => {
                        return Err(RuntimeError::SuperclassMustBeClass {
                            type_tag: other.type_tag().to_string(),
                        })
                    }
                }
            }
            None => None,
        };

        let mut method_table = HashMap::new();
        for method in methods {
            method_table.insert(method.name.clone(), self.make_function(method));
        }

        let class = Class {
            name: name.to_string(),
            methods: method_table,
            superclass,
        };
        self.env
            .borrow_mut()
            .define(name.to_string(), Value::Class(Rc::new(class)));
        Ok(Value::Nil)
    }

    fn make_function(&self, declaration: &FunctionDecl) -> Rc<Function> {
        Rc::new(Function {
            name: declaration.name.clone(),
            params: declaration.params.clone(),
            body: declaration.body.clone(),
            closure: self.env.clone(),
            is_initializer: declaration.is_initializer,
        })
    }

    /// Runs statements with `env` installed, restoring the previous
    /// environment on every exit path.
    fn execute_block(&mut self, statements: &[Stmt], env: Env) -> EvalResult {
        let previous = std::mem::replace(&mut self.env, env);
        let result = self.run_block(statements);
        self.env = previous;
        result
    }

    fn run_block(&mut self, statements: &[Stmt]) -> EvalResult {
        let mut result = Value::Nil;
        for statement in statements {
            result = self.exec_statement(statement)?;
            if matches!(result, Value::Return(_)) {
                break;
            }
        }
        Ok(result)
    }

    fn eval_expression(&mut self, expression: &Expr) -> EvalResult {
        match expression {
            Expr::Literal { token } => literal_value(token),
            Expr::Variable { name } => self
                .env
                .borrow()
                .get(name)
                .ok_or_else(|| RuntimeError::IdentifierNotFound { name: name.clone() }),
            Expr::Assign { name, value } => {
                let value = self.eval_expression(value)?;
                if self.env.borrow_mut().assign(name, value.clone()) {
                    Ok(value)
                } else {
                    Err(RuntimeError::IdentifierNotFound { name: name.clone() })
                }
            }
            Expr::Unary { operator, right } => {
                let right = self.eval_expression(right)?;
                self.eval_unary(operator, right)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                eval_binary(operator, left, right)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                // Both operands are evaluated before combining; logical
                // operators do not short-circuit.
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                match operator.kind {
                    Kind::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
                    Kind::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
                    _ => Err(unknown_operator(operator, &left, &right)),
                }
            }
            Expr::Grouping { expression } => self.eval_expression(expression),
            Expr::Array { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expression(element)?);
                }
                Ok(Value::Array(Rc::new(values)))
            }
            Expr::Call { callee, arguments } => self.eval_call(callee, arguments),
            Expr::Get { object, name } => self.eval_get(object, name),
            Expr::Set {
                object,
                name,
                value,
            } => self.eval_set(object, name, value),
            Expr::This { keyword } => {
                self.env
                    .borrow()
                    .get("this")
                    .ok_or(RuntimeError::ThisOutsideMethod {
                        position: keyword.position,
                    })
            }
            Expr::Super { keyword, .. } => Err(RuntimeError::SuperUnsupported {
                position: keyword.position,
            }),
        }
    }

    fn eval_unary(&mut self, operator: &Token, right: Value) -> EvalResult {
        match operator.kind {
            Kind::Bang => Ok(Value::Boolean(!right.is_truthy())),
            Kind::Minus => match right {
                Value::Number(value) => Ok(Value::Number(-value)),
                other => Err(RuntimeError::UnknownUnaryOperator {
                    operator: "-".to_string(),
                    operand: other.type_tag().to_string(),
                    position: operator.position,
                }),
            },
            _ => Err(RuntimeError::UnknownUnaryOperator {
                operator: operator.lexeme.clone(),
                operand: right.type_tag().to_string(),
                position: operator.position,
            }),
        }
    }

    fn eval_call(&mut self, callee: &Expr, arguments: &[Expr]) -> EvalResult {
        let callee = self.eval_expression(callee)?;

        let arity = match &callee {
            Value::Function(function) => function.params.len(),
            Value::Builtin(builtin) => builtin.arity(),
            Value::Class(class) => class
                .find_method("init")
                .map(|init| init.params.len())
                .unwrap_or(0),
            other => {
                return Err(RuntimeError::NotCallable {
                    type_tag: other.type_tag().to_string(),
                })
            }
        };
        if arity != arguments.len() {
            return Err(RuntimeError::ArityMismatch {
                expected: arity,
                found: arguments.len(),
            });
        }

        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.eval_expression(argument)?);
        }

        match callee {
            Value::Function(function) => self.call_function(&function, args),
            Value::Builtin(builtin) => builtin.call(&args),
            Value::Class(class) => self.instantiate(&class, args),
            _ => unreachable!("callable kinds checked above"),
        }
    }

    /// Binds parameters in a fresh environment enclosing the closure, runs the
    /// body, and unwraps a `Return` sentinel into the call's value.
    fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>) -> EvalResult {
        let env = Environment::enclosing(function.closure.clone());
        for (param, arg) in function.params.iter().zip(args) {
            env.borrow_mut().define(param.name.clone(), arg);
        }

        let result = self.execute_block(&function.body, env)?;
        match result {
            Value::Return(value) => Ok(*value),
            _ => Ok(Value::Nil),
        }
    }

    /// Class calls construct an instance and run `init` bound to it; the call
    /// always yields the instance, whatever `init` returns.
    fn instantiate(&mut self, class: &Rc<Class>, args: Vec<Value>) -> EvalResult {
        let instance = Rc::new(Instance::new(Rc::clone(class)));
        if let Some(initializer) = class.find_method("init") {
            let bound = initializer.bind(&instance);
            self.call_function(&bound, args)?;
        }
        Ok(Value::Instance(instance))
    }

    fn eval_get(&mut self, object: &Expr, name: &Token) -> EvalResult {
        let object = self.eval_expression(object)?;
        let instance = match object {
            Value::Instance(instance) => instance,
            other => {
                return Err(RuntimeError::RequiredInstance {
                    type_tag: other.type_tag().to_string(),
                    position: name.position,
                })
            }
        };

        if let Some(value) = instance.field(&name.lexeme) {
            return Ok(value);
        }
        if let Some(method) = instance.class.find_method(&name.lexeme) {
            return Ok(Value::Function(method.bind(&instance)));
        }
        Err(RuntimeError::PropertyNotFound {
            name: name.lexeme.clone(),
            position: name.position,
        })
    }

    fn eval_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> EvalResult {
        let object = self.eval_expression(object)?;
        let instance = match object {
            Value::Instance(instance) => instance,
            other => {
                return Err(RuntimeError::RequiredInstance {
                    type_tag: other.type_tag().to_string(),
                    position: name.position,
                })
            }
        };
        let value = self.eval_expression(value)?;
        instance.set_field(name.lexeme.clone(), value.clone());
        Ok(value)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_value(token: &Token) -> EvalResult {
    match token.kind {
        Kind::Number => token
            .lexeme
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| RuntimeError::InvalidLiteral {
                lexeme: token.lexeme.clone(),
            }),
        Kind::String => Ok(Value::String(token.lexeme.clone())),
        Kind::True => Ok(Value::Boolean(true)),
        Kind::False => Ok(Value::Boolean(false)),
        Kind::Nil => Ok(Value::Nil),
        _ => Err(RuntimeError::InvalidLiteral {
            lexeme: token.lexeme.clone(),
        }),
    }
}

fn eval_binary(operator: &Token, left: Value, right: Value) -> EvalResult {
    match (&left, &right) {
        (Value::Number(l), Value::Number(r)) => eval_number_binary(operator, *l, *r),
        (Value::String(l), Value::String(r)) => match operator.kind {
            Kind::Plus => Ok(Value::String(format!("{l}{r}"))),
            Kind::Equal => Ok(Value::Boolean(l == r)),
            Kind::NotEqual => Ok(Value::Boolean(l != r)),
            _ => Err(unknown_operator(operator, &left, &right)),
        },
        _ => match operator.kind {
            Kind::Equal => Ok(Value::Boolean(left.equals(&right))),
            Kind::NotEqual => Ok(Value::Boolean(!left.equals(&right))),
            _ if left.type_tag() != right.type_tag() => Err(RuntimeError::TypeMismatch {
                left: left.type_tag().to_string(),
                operator: operator.lexeme.clone(),
                right: right.type_tag().to_string(),
                position: operator.position,
            }),
            _ => Err(unknown_operator(operator, &left, &right)),
        },
    }
}

fn eval_number_binary(operator: &Token, left: f64, right: f64) -> EvalResult {
    match operator.kind {
        Kind::Plus => Ok(Value::Number(left + right)),
        Kind::Minus => Ok(Value::Number(left - right)),
        Kind::Asterisk => Ok(Value::Number(left * right)),
        Kind::Slash => Ok(Value::Number(left / right)),
        Kind::Less => Ok(Value::Boolean(left < right)),
        Kind::LessEqual => Ok(Value::Boolean(left <= right)),
        Kind::Greater => Ok(Value::Boolean(left > right)),
        Kind::GreaterEqual => Ok(Value::Boolean(left >= right)),
        Kind::Equal => Ok(Value::Boolean(left == right)),
        Kind::NotEqual => Ok(Value::Boolean(left != right)),
        _ => Err(unknown_operator(
            operator,
            &Value::Number(left),
            &Value::Number(right),
        )),
    }
}

fn unknown_operator(operator: &Token, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnknownOperator {
        left: left.type_tag().to_string(),
        operator: operator.lexeme.clone(),
        right: right.type_tag().to_string(),
        position: operator.position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};
    use indoc::indoc;

    fn eval(source: &str) -> EvalResult {
        let tokens = lexer::tokenize(source).expect("lexing should succeed");
        let program = parser::parse_tokens(tokens).expect("parsing should succeed");
        Evaluator::new().evaluate(&program)
    }

    fn eval_ok(source: &str) -> Value {
        eval(source).expect("evaluation should succeed")
    }

    fn eval_err(source: &str) -> RuntimeError {
        eval(source).expect_err("evaluation should fail")
    }

    fn eval_output(source: &str) -> Vec<String> {
        let tokens = lexer::tokenize(source).expect("lexing should succeed");
        let program = parser::parse_tokens(tokens).expect("parsing should succeed");
        let mut evaluator = Evaluator::new();
        evaluator
            .evaluate(&program)
            .expect("evaluation should succeed");
        evaluator.take_output()
    }

    #[test]
    fn evaluates_arithmetic_expressions() {
        let cases = [
            ("5;", 5.0),
            ("-5;", -5.0),
            ("2 + 3 * 4;", 14.0),
            ("(2 + 3) * 4;", 20.0),
            ("50 / 2 * 2 + 10 - 5;", 55.0),
            ("1.5 + 2.25;", 3.75),
        ];
        for (source, expected) in cases {
            assert_eq!(eval_ok(source), Value::Number(expected), "source: {source}");
        }
    }

    #[test]
    fn evaluates_comparisons_and_equality() {
        let cases = [
            ("1 < 2;", true),
            ("2 <= 2;", true),
            ("3 > 4;", false),
            ("4 >= 4;", true),
            ("1 == 1;", true),
            ("1 != 1;", false),
            ("\"a\" == \"a\";", true),
            ("\"a\" != \"b\";", true),
            ("1 == \"1\";", false),
            ("nil == nil;", true),
            ("true == true;", true),
            ("nil == false;", false),
        ];
        for (source, expected) in cases {
            assert_eq!(
                eval_ok(source),
                Value::Boolean(expected),
                "source: {source}"
            );
        }
    }

    #[test]
    fn arrays_compare_by_identity() {
        assert_eq!(
            eval_ok("let a = [1]; let b = a; a == b;"),
            Value::Boolean(true)
        );
        assert_eq!(
            eval_ok("let a = [1]; let b = [1]; a == b;"),
            Value::Boolean(false)
        );
    }

    #[test]
    fn bang_inverts_truthiness() {
        let cases = [
            ("!true;", false),
            ("!false;", true),
            ("!nil;", true),
            ("!0;", false),
            ("!\"\";", false),
            ("!!true;", true),
        ];
        for (source, expected) in cases {
            assert_eq!(
                eval_ok(source),
                Value::Boolean(expected),
                "source: {source}"
            );
        }
    }

    #[test]
    fn concatenates_strings_with_plus() {
        assert_eq!(
            eval_ok("\"foo\" + \"bar\";"),
            Value::String("foobar".to_string())
        );
    }

    #[test]
    fn logical_operators_combine_truthiness_eagerly() {
        assert_eq!(eval_ok("true and false;"), Value::Boolean(false));
        assert_eq!(eval_ok("true or false;"), Value::Boolean(true));
        assert_eq!(eval_ok("1 and \"x\";"), Value::Boolean(true));
        assert_eq!(eval_ok("nil or false;"), Value::Boolean(false));

        // Both sides run: the right operand's side effect is visible even
        // when the left already decides the outcome.
        assert_eq!(
            eval_ok(indoc! {"
                let a = 0;
                fn bump() { a = a + 1; return true; }
                false and bump();
                a;
            "}),
            Value::Number(1.0)
        );
    }

    #[test]
    fn while_loop_counts_to_three() {
        assert_eq!(
            eval_ok("let a = 0; while (a < 3) { a = a + 1; } a;"),
            Value::Number(3.0)
        );
    }

    #[test]
    fn closures_capture_their_definition_environment() {
        let source = indoc! {"
            fn gen(x) {
                let a = 0;
                fn inner(y) {
                    a = a + 1;
                    return a + x + y;
                }
                return inner;
            }
            let g = gen(1);
            g(1);
        "};
        assert_eq!(eval_ok(source), Value::Number(3.0));
    }

    #[test]
    fn closure_state_persists_across_calls() {
        let source = indoc! {"
            fn counter() {
                let count = 0;
                fn next() {
                    count = count + 1;
                    return count;
                }
                return next;
            }
            let next = counter();
            next();
            next();
            next();
        "};
        assert_eq!(eval_ok(source), Value::Number(3.0));
    }

    #[test]
    fn class_fields_shadow_methods_and_bind_this() {
        let source = indoc! {"
            class A {
                init(y) { this.y = y; }
                m() { return this.x; }
            }
            let a = A(2);
            a.x = 1;
            a.m();
        "};
        assert_eq!(eval_ok(source), Value::Number(1.0));
    }

    #[test]
    fn init_binds_constructor_arguments_to_fields() {
        let source = indoc! {"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
                sum() { return this.x + this.y; }
            }
            let p = Point(3, 4);
            p.sum();
        "};
        assert_eq!(eval_ok(source), Value::Number(7.0));
    }

    #[test]
    fn class_call_returns_instance_even_when_init_returns() {
        let source = indoc! {"
            class A {
                init() { return 42; }
            }
            let a = A();
            a;
        "};
        match eval_ok(source) {
            Value::Instance(instance) => assert_eq!(instance.class.name, "A"),
            other => panic!("expected instance, got {other:?}"),
        }
    }

    #[test]
    fn method_lookup_falls_through_the_superclass_chain() {
        let source = indoc! {"
            class Animal {
                speak() { return \"...\"; }
                kind() { return \"animal\"; }
            }
            class Lizard < Animal {
                speak() { return \"hiss\"; }
            }
            let pet = Lizard();
            pet.speak() + \" \" + pet.kind();
        "};
        assert_eq!(eval_ok(source), Value::String("hiss animal".to_string()));
    }

    #[test]
    fn print_collects_inspected_lines() {
        assert_eq!(eval_output("print 1; print 2; print 3;"), vec!["1", "2", "3"]);
        assert_eq!(
            eval_output("print [1, \"two\", nil]; print true;"),
            vec!["[1, two, nil]", "true"]
        );
    }

    #[test]
    fn block_scopes_shadow_and_restore() {
        let source = indoc! {"
            let a = 1;
            {
                let a = 2;
                a = a + 1;
            }
            a;
        "};
        assert_eq!(eval_ok(source), Value::Number(1.0));
    }

    #[test]
    fn environment_is_restored_after_an_error_inside_a_block() {
        let tokens = lexer::tokenize("let a = 1; { let a = 2; missing; }").expect("lexing");
        let program = parser::parse_tokens(tokens).expect("parsing");
        let mut evaluator = Evaluator::new();
        evaluator
            .evaluate(&program)
            .expect_err("expected identifier not found");

        let tokens = lexer::tokenize("a;").expect("lexing");
        let program = parser::parse_tokens(tokens).expect("parsing");
        assert_eq!(
            evaluator.evaluate(&program),
            Ok(Value::Number(1.0)),
            "outer binding must be intact after the failed block"
        );
    }

    #[test]
    fn return_propagates_out_of_loops_and_blocks() {
        let source = indoc! {"
            fn find() {
                let i = 0;
                while (i < 10) {
                    if (i == 3) { return i; }
                    i = i + 1;
                }
                return -1;
            }
            find();
        "};
        assert_eq!(eval_ok(source), Value::Number(3.0));
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(eval_ok("fn noop() { 1 + 1; } noop();"), Value::Nil);
    }

    #[test]
    fn recursive_functions_resolve_themselves() {
        let source = indoc! {"
            fn fib(n) {
                if (n < 2) { return n; }
                return fib(n - 1) + fib(n - 2);
            }
            fib(10);
        "};
        assert_eq!(eval_ok(source), Value::Number(55.0));
    }

    #[test]
    fn builtins_are_callable_from_programs() {
        assert_eq!(eval_ok("len(\"hello\");"), Value::Number(5.0));
        assert_eq!(eval_ok("len([1, 2, 3]);"), Value::Number(3.0));
        assert_eq!(eval_ok("at([10, 20], 1);"), Value::Number(20.0));
        assert_eq!(eval_ok("at([10, 20], 5);"), Value::Nil);
        assert_eq!(
            eval_ok("let a = [1]; let b = push(a, 2); len(a) + len(b);"),
            Value::Number(3.0)
        );
        assert_eq!(eval_ok("at(rest([1, 2, 3]), 0);"), Value::Number(2.0));
        assert_eq!(eval_ok("rest([]);"), Value::Nil);
    }

    #[test]
    fn type_mismatch_and_unknown_operator_errors() {
        assert!(matches!(
            eval_err("1 + true;"),
            RuntimeError::TypeMismatch { .. }
        ));
        assert!(matches!(
            eval_err("true + false;"),
            RuntimeError::UnknownOperator { .. }
        ));
        assert!(matches!(
            eval_err("-\"abc\";"),
            RuntimeError::UnknownUnaryOperator { .. }
        ));
    }

    #[test]
    fn identifier_errors() {
        assert_eq!(
            eval_err("missing;"),
            RuntimeError::IdentifierNotFound {
                name: "missing".to_string()
            }
        );
        assert_eq!(
            eval_err("missing = 1;"),
            RuntimeError::IdentifierNotFound {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn call_errors() {
        assert_eq!(
            eval_err("let x = 1; x();"),
            RuntimeError::NotCallable {
                type_tag: "Number".to_string()
            }
        );
        assert_eq!(
            eval_err("fn f(a) { } f();"),
            RuntimeError::ArityMismatch {
                expected: 1,
                found: 0
            }
        );
        assert_eq!(
            eval_err("len();"),
            RuntimeError::ArityMismatch {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn property_errors() {
        assert!(matches!(
            eval_err("let x = 1; x.field;"),
            RuntimeError::RequiredInstance { .. }
        ));
        assert!(matches!(
            eval_err("class A { } let a = A(); a.missing;"),
            RuntimeError::PropertyNotFound { .. }
        ));
        assert!(matches!(
            eval_err("this;"),
            RuntimeError::ThisOutsideMethod { .. }
        ));
    }

    #[test]
    fn for_loops_run_their_lowered_form() {
        let source = indoc! {"
            let total = 0;
            for (let i = 1; i <= 4; i = i + 1) {
                total = total + i;
            }
            total;
        "};
        assert_eq!(eval_ok(source), Value::Number(10.0));
    }

    #[test]
    fn super_reports_unsupported() {
        assert!(matches!(
            eval_err("class A { } class B < A { m() { return super.m; } } let b = B(); b.m();"),
            RuntimeError::SuperUnsupported { .. }
        ));
    }

    #[test]
    fn superclass_must_be_a_class() {
        assert_eq!(
            eval_err("let A = 1; class B < A { }"),
            RuntimeError::SuperclassMustBeClass {
                type_tag: "Number".to_string()
            }
        );
    }
}

//! Recursive-descent parser with panic-mode recovery.
//!
//! Expression parsing climbs the precedence ladder
//! `assignment → or → and → equality → comparison → addition →
//! multiplication → unary → call → primary`. On a parse error the parser
//! discards tokens up to a synchronization point and keeps collecting
//! declarations; only the first error is surfaced to the caller.

use thiserror::Error;

use crate::ast::{Expr, FunctionDecl, Ident, Program, Stmt};
use crate::token::{Kind, Position, Token};

/// Hard limit on parameters and call arguments.
const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{message} (at {position})")]
    UnexpectedToken { message: String, position: Position },
    #[error("invalid assignment target (at {position})")]
    InvalidAssignmentTarget { position: Position },
    #[error("cannot have more than {MAX_ARGUMENTS} parameters (at {position})")]
    TooManyParameters { position: Position },
    #[error("cannot have more than {MAX_ARGUMENTS} arguments (at {position})")]
    TooManyArguments { position: Position },
}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(Kind::Eof, "", Position::default()));
        }
        Self { tokens, current: 0 }
    }

    pub fn parse(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        let mut first_error = None;

        while !self.is_at_end() {
            if self.matches(Kind::Semicolon) {
                continue;
            }
            match self.declaration() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                    self.synchronize();
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(Program { statements }),
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.matches(Kind::Let) {
            return self.var_declaration();
        }
        if self.matches(Kind::Function) {
            return Ok(Stmt::Function(self.function_declaration()?));
        }
        if self.matches(Kind::Class) {
            return self.class_declaration();
        }
        self.statement()
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.expect(Kind::Identifier, "expected identifier after `let`")?;
        let ident = Ident::new(name.lexeme);

        let initializer = if self.matches(Kind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(Kind::Semicolon, "expected `;` after variable declaration")?;
        Ok(Stmt::Var { ident, initializer })
    }

    fn function_declaration(&mut self) -> ParseResult<FunctionDecl> {
        let name = self.expect(Kind::Identifier, "expected function name")?;
        self.expect(Kind::LeftParen, "expected `(` after function name")?;

        let mut params = Vec::new();
        if !self.matches(Kind::RightParen) {
            loop {
                let param = self.expect(Kind::Identifier, "expected parameter name")?;
                if params.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::TooManyParameters {
                        position: param.position,
                    });
                }
                params.push(Ident::new(param.lexeme));
                if !self.matches(Kind::Comma) {
                    break;
                }
            }
            self.expect(Kind::RightParen, "expected `)` after parameters")?;
        }

        self.expect(Kind::LeftBrace, "expected `{` before function body")?;
        let body = self.block_body()?;
        Ok(FunctionDecl {
            name: name.lexeme,
            params,
            body,
            is_initializer: false,
        })
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.expect(Kind::Identifier, "expected class name after `class`")?;

        let superclass = if self.matches(Kind::Less) {
            let superclass = self.expect(Kind::Identifier, "expected superclass name")?;
            Some(superclass.lexeme)
        } else {
            None
        };

        self.expect(Kind::LeftBrace, "expected `{` after class name")?;
        let mut methods = Vec::new();
        while self.check(Kind::Identifier) {
            let mut method = self.function_declaration()?;
            method.is_initializer = method.name == "init";
            methods.push(method);
        }
        self.expect(Kind::RightBrace, "expected `}` after class body")?;

        Ok(Stmt::Class {
            name: name.lexeme,
            superclass,
            methods,
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(Kind::Print) {
            return self.print_statement();
        }
        if self.matches(Kind::LeftBrace) {
            return Ok(Stmt::Block {
                statements: self.block_body()?,
            });
        }
        if self.matches(Kind::If) {
            return self.if_statement();
        }
        if self.matches(Kind::While) {
            return self.while_statement();
        }
        if self.matches(Kind::For) {
            return self.for_statement();
        }
        if self.matches(Kind::Return) {
            return self.return_statement();
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;
        self.expect(Kind::Semicolon, "expected `;` after value")?;
        Ok(Stmt::Print { expression })
    }

    /// Caller has consumed the opening `{`.
    fn block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(Kind::RightBrace) && !self.is_at_end() {
            if self.matches(Kind::Semicolon) {
                continue;
            }
            statements.push(self.declaration()?);
        }
        self.expect(Kind::RightBrace, "expected `}` after block")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(Kind::LeftParen, "expected `(` after `if`")?;
        let condition = self.expression()?;
        self.expect(Kind::RightParen, "expected `)` after condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(Kind::Else) {
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

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.expect(Kind::LeftParen, "expected `(` after `while`")?;
        let condition = self.expression()?;
        self.expect(Kind::RightParen, "expected `)` after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `for (init?; cond?; update?) body` lowers into
    /// `{ init; while (cond) { body; update; } }` with a literal `true`
    /// standing in for an omitted condition.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        self.expect(Kind::LeftParen, "expected `(` after `for`")?;

        let initializer = if self.matches(Kind::Semicolon) {
            None
        } else if self.matches(Kind::Let) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(Kind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Kind::Semicolon, "expected `;` after loop condition")?;

        let update = if self.check(Kind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Kind::RightParen, "expected `)` after for clauses")?;

        let mut body = self.statement()?;
        if let Some(update) = update {
            body = Stmt::Block {
                statements: vec![body, Stmt::Expression { expression: update }],
            };
        }

        let condition = condition.unwrap_or(Expr::Literal {
            token: Token::new(Kind::True, "true", keyword.position),
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }
        Ok(body)
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(Kind::Semicolon) {
            return Ok(Stmt::Return { value: None });
        }
        let value = self.expression()?;
        self.expect(Kind::Semicolon, "expected `;` after return value")?;
        Ok(Stmt::Return { value: Some(value) })
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expression = self.expression()?;
        self.expect(Kind::Semicolon, "expected `;` after expression")?;
        Ok(Stmt::Expression { expression })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.matches(Kind::Assign) {
            let equals_position = self.previous().position;
            let value = Box::new(self.assignment()?);
            return match expr {
                Expr::Variable { name } => Ok(Expr::Assign { name, value }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                _ => Err(ParseError::InvalidAssignmentTarget {
                    position: equals_position,
                }),
            };
        }
        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(Kind::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(Kind::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.matches_any(&[Kind::Equal, Kind::NotEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.addition()?;
        while self.matches_any(&[
            Kind::Greater,
            Kind::GreaterEqual,
            Kind::Less,
            Kind::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.addition()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn addition(&mut self) -> ParseResult<Expr> {
        let mut expr = self.multiplication()?;
        while self.matches_any(&[Kind::Plus, Kind::Minus]) {
            let operator = self.previous().clone();
            let right = self.multiplication()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn multiplication(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.matches_any(&[Kind::Slash, Kind::Asterisk]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches_any(&[Kind::Bang, Kind::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(Kind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(Kind::Dot) {
                let name = self.expect(Kind::Identifier, "expected property name after `.`")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if self.matches(Kind::RightParen) {
            return Ok(Expr::Call {
                callee: Box::new(callee),
                arguments,
            });
        }

        loop {
            if arguments.len() >= MAX_ARGUMENTS {
                return Err(ParseError::TooManyArguments {
                    position: self.peek().position,
                });
            }
            arguments.push(self.expression()?);
            if !self.matches(Kind::Comma) {
                break;
            }
        }
        self.expect(Kind::RightParen, "expected `)` after arguments")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.matches_any(&[
            Kind::True,
            Kind::False,
            Kind::Nil,
            Kind::Number,
            Kind::String,
        ]) {
            return Ok(Expr::Literal {
                token: self.previous().clone(),
            });
        }

        if self.matches(Kind::This) {
            return Ok(Expr::This {
                keyword: self.previous().clone(),
            });
        }

        if self.matches(Kind::Super) {
            let keyword = self.previous().clone();
            self.expect(Kind::Dot, "expected `.` after `super`")?;
            let method = self.expect(Kind::Identifier, "expected superclass method name")?;
            return Ok(Expr::Super { keyword, method });
        }

        if self.matches(Kind::LeftParen) {
            let expression = self.expression()?;
            self.expect(Kind::RightParen, "expected `)` after expression")?;
            return Ok(Expr::Grouping {
                expression: Box::new(expression),
            });
        }

        if self.matches(Kind::LeftBracket) {
            let mut elements = Vec::new();
            if !self.check(Kind::RightBracket) {
                loop {
                    elements.push(self.expression()?);
                    if !self.matches(Kind::Comma) {
                        break;
                    }
                }
            }
            self.expect(Kind::RightBracket, "expected `]` after array elements")?;
            return Ok(Expr::Array { elements });
        }

        if self.matches(Kind::Identifier) {
            return Ok(Expr::Variable {
                name: self.previous().lexeme.clone(),
            });
        }

        Err(self.error("expected expression"))
    }

    /// Panic-mode resynchronization: skip to just past a `;` or to the next
    /// statement-start keyword.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == Kind::Semicolon {
                return;
            }
            match self.peek().kind {
                Kind::Class
                | Kind::Function
                | Kind::Let
                | Kind::If
                | Kind::While
                | Kind::Print
                | Kind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn matches(&mut self, kind: Kind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn matches_any(&mut self, kinds: &[Kind]) -> bool {
        kinds.iter().any(|kind| self.matches(*kind))
    }

    fn expect(&mut self, kind: Kind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.error(message))
    }

    fn check(&self, kind: Kind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == Kind::Eof
    }

    fn error(&self, message: &str) -> ParseError {
        let found = self.peek();
        ParseError::UnexpectedToken {
            message: format!("{message}, got `{}`", display_lexeme(found)),
            position: found.position,
        }
    }
}

fn display_lexeme(token: &Token) -> &str {
    match token.kind {
        Kind::Eof => "end of input",
        _ => &token.lexeme,
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_source(source: &str) -> ParseResult<Program> {
        let tokens = lexer::tokenize(source).expect("lexing should succeed");
        parse_tokens(tokens)
    }

    fn parsed(source: &str) -> Program {
        parse_source(source).expect("parse should succeed")
    }

    #[test]
    fn parses_operator_precedence() {
        let cases = [
            ("-a * b;", "-a * b;"),
            ("!-a;", "!-a;"),
            ("a + b + c;", "a + b + c;"),
            ("a + b * c + d / e - f;", "a + b * c + d / e - f;"),
            ("5 < 4 != 3 > 4;", "5 < 4 != 3 > 4;"),
            ("(5 + 5) * 2;", "(5 + 5) * 2;"),
            ("a or b and c;", "a or b and c;"),
            ("x = y = 1;", "x = y = 1;"),
            ("add(a + b, 2 * 3);", "add(a + b, 2 * 3);"),
            ("p.x = p.y + 1;", "p.x = p.y + 1;"),
            ("[1, 2 + 3, \"four\"];", "[1, 2 + 3, \"four\"];"),
        ];

        for (source, expected) in cases {
            assert_eq!(parsed(source).to_string(), expected, "source: {source}");
        }
    }

    #[test]
    fn precedence_groups_multiplication_before_addition() {
        let program = parsed("1 + 2 * 3;");
        let Stmt::Expression { expression } = &program.statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Binary {
            left,
            operator,
            right,
        } = expression
        else {
            panic!("expected binary expression");
        };
        assert_eq!(operator.kind, Kind::Plus);
        assert_eq!(left.to_string(), "1");
        assert_eq!(right.to_string(), "2 * 3");
    }

    #[test]
    fn unparse_is_a_fixpoint_through_the_parser() {
        let source = r#"
            let total = 0;
            fn add(a, b) { return a + b; }
            class Counter { init(start) { this.count = start; } bump() { this.count = this.count + 1; } }
            if (total < 10) { total = add(total, 2); } else { print "done"; }
            while (total > 0) { total = total - 1; }
            let items = [1, 2, 3];
        "#;

        let rendered = parsed(source).to_string();
        let reparsed = parsed(&rendered).to_string();
        assert_eq!(rendered, reparsed);
    }

    #[test]
    fn lowers_for_into_while_with_initializer_and_update() {
        let program = parsed("for (let i = 0; i < 3; i = i + 1) { print i; }");
        assert_eq!(
            program.to_string(),
            "{ let i = 0; while (i < 3) { { print i; } i = i + 1; } }"
        );
    }

    #[test]
    fn lowers_for_without_condition_to_literal_true() {
        let program = parsed("for (;;) { print 1; }");
        assert_eq!(program.to_string(), "while (true) { print 1; }");
    }

    #[test]
    fn marks_init_methods_as_initializers() {
        let program = parsed("class A { init() { } other() { } }");
        let Stmt::Class { methods, .. } = &program.statements[0] else {
            panic!("expected class statement");
        };
        assert!(methods[0].is_initializer);
        assert!(!methods[1].is_initializer);
    }

    #[test]
    fn parses_class_with_superclass() {
        let program = parsed("class B < A { }");
        assert_eq!(
            program.statements[0],
            Stmt::Class {
                name: "B".to_string(),
                superclass: Some("A".to_string()),
                methods: vec![],
            }
        );
    }

    #[test]
    fn errors_on_invalid_assignment_target() {
        let err = parse_source("1 + 2 = 3;").expect_err("expected parse failure");
        assert!(matches!(err, ParseError::InvalidAssignmentTarget { .. }));
    }

    #[test]
    fn reports_first_error_and_recovers_at_sync_point() {
        let err = parse_source("let = 1; let b = 2; let c 3;").expect_err("expected parse failure");
        let ParseError::UnexpectedToken { message, position } = err else {
            panic!("expected unexpected-token error");
        };
        assert!(message.contains("expected identifier after `let`"));
        assert_eq!(position, Position { line: 1, column: 5 });
    }

    #[test]
    fn errors_on_missing_semicolon() {
        let err = parse_source("let a = 1").expect_err("expected parse failure");
        let ParseError::UnexpectedToken { message, .. } = err else {
            panic!("expected unexpected-token error");
        };
        assert!(message.contains("expected `;`"));
    }

    #[test]
    fn parses_super_method_access() {
        let program = parsed("class B < A { m() { return super.m; } }");
        let Stmt::Class { methods, .. } = &program.statements[0] else {
            panic!("expected class statement");
        };
        assert_eq!(methods[0].body[0].to_string(), "return super.m;");
    }

    #[test]
    fn ignores_stray_semicolons_between_statements() {
        let program = parsed("if (true) { 10; };");
        assert_eq!(program.statements.len(), 1);
    }
}

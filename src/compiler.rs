//! AST → bytecode lowering.
//!
//! The compiler walks the tree emitting into the current compilation scope:
//! scope 0 is the main program, and every function body pushes a fresh scope
//! (with an enclosed symbol table) that is popped into a `CompiledFunction`
//! constant. Each scope tracks its last two emitted instructions so trailing
//! `OpPop`s can be stripped from branch values or rewritten into
//! `OpReturnValue` at function end.

use std::rc::Rc;

use thiserror::Error;

use crate::ast::{Expr, FunctionDecl, Program, Stmt};
use crate::code::{self, Instructions, Opcode};
use crate::token::{Kind, Token};
use crate::value::{CompiledFunction, Value};

pub mod symbol_table;

use symbol_table::{SymbolScope, SymbolTable};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("undefined variable {name}")]
    UndefinedVariable { name: String },
    #[error("unknown operator {operator}")]
    UnknownOperator { operator: String },
    #[error("invalid literal token: {lexeme}")]
    InvalidLiteral { lexeme: String },
    #[error("{construct} is not supported by the bytecode compiler")]
    Unsupported { construct: &'static str },
    #[error("return outside of function is not supported by the bytecode compiler")]
    ReturnOutsideFunction,
}

/// The compiled artifact handed to the VM: the main instruction stream plus
/// the constants pool it indexes into.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

pub struct Compiler {
    constants: Vec<Value>,
    symbols: SymbolTable,
    scopes: Vec<CompilationScope>,
    scope_index: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
            symbols: SymbolTable::new(),
            scopes: vec![CompilationScope::default()],
            scope_index: 0,
        }
    }

    pub fn compile(mut self, program: &Program) -> Result<Bytecode, CompileError> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(self.into_bytecode())
    }

    fn into_bytecode(mut self) -> Bytecode {
        let main = self.scopes.swap_remove(0);
        Bytecode {
            instructions: main.instructions,
            constants: self.constants,
        }
    }

    fn compile_statement(&mut self, statement: &Stmt) -> Result<(), CompileError> {
        match statement {
            Stmt::Expression { expression } => {
                self.compile_expression(expression)?;
                self.emit(Opcode::Pop, &[]);
            }
            Stmt::Var { ident, initializer } => {
                match initializer {
                    Some(initializer) => self.compile_expression(initializer)?,
                    None => {
                        self.emit(Opcode::Nil, &[]);
                    }
                }
                let symbol = self.symbols.define(ident.name.clone());
                self.emit_store(symbol.scope, symbol.index);
            }
            Stmt::Block { statements } => {
                for statement in statements {
                    self.compile_statement(statement)?;
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.compile_if(condition, then_branch, else_branch.as_deref())?,
            Stmt::Return { value } => {
                if self.scope_index == 0 {
                    return Err(CompileError::ReturnOutsideFunction);
                }
                match value {
                    Some(value) => self.compile_expression(value)?,
                    None => {
                        self.emit(Opcode::Nil, &[]);
                    }
                }
                self.emit(Opcode::ReturnValue, &[]);
            }
            Stmt::Function(declaration) => self.compile_function(declaration)?,
            Stmt::While { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "`while`",
                })
            }
            Stmt::Print { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "`print`",
                })
            }
            Stmt::Class { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "class declarations",
                })
            }
        }
        Ok(())
    }

    /// Conditionals produce a value: the taken branch's value, or `nil` when
    /// an absent else-branch is skipped into. As a statement the value is
    /// popped right after, which the peephole rules may strip again.
    fn compile_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;
        let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[9999]);

        self.compile_statement(then_branch)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        }
        let jump = self.emit(Opcode::Jump, &[9999]);

        let after_then = self.current_instructions().len();
        self.change_operand(Opcode::JumpNotTruthy, jump_not_truthy, after_then);

        match else_branch {
            Some(else_branch) => {
                self.compile_statement(else_branch)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }
            }
            None => {
                self.emit(Opcode::Nil, &[]);
            }
        }
        let after_else = self.current_instructions().len();
        self.change_operand(Opcode::Jump, jump, after_else);

        self.emit(Opcode::Pop, &[]);
        Ok(())
    }

    fn compile_function(&mut self, declaration: &FunctionDecl) -> Result<(), CompileError> {
        // Compiled functions carry no free-variable captures, so a nested
        // declaration could not reach the enclosing function's locals.
        if self.scope_index > 0 {
            return Err(CompileError::Unsupported {
                construct: "nested function definitions",
            });
        }
        self.enter_scope();
        for param in &declaration.params {
            self.symbols.define(param.name.clone());
        }
        for statement in &declaration.body {
            self.compile_statement(statement)?;
        }

        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let num_locals = self.symbols.num_definitions();
        let instructions = self.leave_scope();
        let function = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: declaration.params.len(),
        };
        let index = self.add_constant(Value::CompiledFunction(Rc::new(function)));
        self.emit(Opcode::Constant, &[index]);

        let symbol = self.symbols.define(declaration.name.clone());
        self.emit_store(symbol.scope, symbol.index);
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expr) -> Result<(), CompileError> {
        match expression {
            Expr::Literal { token } => self.compile_literal(token)?,
            Expr::Variable { name } => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable { name: name.clone() })?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
                };
            }
            Expr::Unary { operator, right } => {
                self.compile_expression(right)?;
                match operator.kind {
                    Kind::Bang => self.emit(Opcode::Bang, &[]),
                    Kind::Minus => self.emit(Opcode::Minus, &[]),
                    _ => {
                        return Err(CompileError::UnknownOperator {
                            operator: operator.lexeme.clone(),
                        })
                    }
                };
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => self.compile_binary(left, operator, right)?,
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator.kind {
                    Kind::And => self.emit(Opcode::And, &[]),
                    Kind::Or => self.emit(Opcode::Or, &[]),
                    _ => {
                        return Err(CompileError::UnknownOperator {
                            operator: operator.lexeme.clone(),
                        })
                    }
                };
            }
            Expr::Grouping { expression } => self.compile_expression(expression)?,
            Expr::Array { elements } => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expr::Call { callee, arguments } => {
                self.compile_expression(callee)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
            Expr::Assign { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "assignment expressions",
                })
            }
            Expr::Get { .. } | Expr::Set { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "property access",
                })
            }
            Expr::This { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "`this`",
                })
            }
            Expr::Super { .. } => {
                return Err(CompileError::Unsupported {
                    construct: "`super`",
                })
            }
        }
        Ok(())
    }

    /// `<` and `<=` compile right-then-left and reuse the greater-than
    /// opcodes; there are no dedicated less-than instructions.
    fn compile_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<(), CompileError> {
        if matches!(operator.kind, Kind::Less | Kind::LessEqual) {
            self.compile_expression(right)?;
            self.compile_expression(left)?;
            match operator.kind {
                Kind::Less => self.emit(Opcode::Greater, &[]),
                Kind::LessEqual => self.emit(Opcode::GreaterEqual, &[]),
                _ => unreachable!("kind checked above"),
            };
            return Ok(());
        }

        self.compile_expression(left)?;
        self.compile_expression(right)?;
        match operator.kind {
            Kind::Plus => self.emit(Opcode::Add, &[]),
            Kind::Minus => self.emit(Opcode::Sub, &[]),
            Kind::Asterisk => self.emit(Opcode::Mul, &[]),
            Kind::Slash => self.emit(Opcode::Div, &[]),
            Kind::Greater => self.emit(Opcode::Greater, &[]),
            Kind::GreaterEqual => self.emit(Opcode::GreaterEqual, &[]),
            Kind::Equal => self.emit(Opcode::Equal, &[]),
            Kind::NotEqual => self.emit(Opcode::NotEqual, &[]),
            _ => {
                return Err(CompileError::UnknownOperator {
                    operator: operator.lexeme.clone(),
                })
            }
        };
        Ok(())
    }

    fn compile_literal(&mut self, token: &Token) -> Result<(), CompileError> {
        match token.kind {
            Kind::True => {
                self.emit(Opcode::True, &[]);
            }
            Kind::False => {
                self.emit(Opcode::False, &[]);
            }
            Kind::Nil => {
                self.emit(Opcode::Nil, &[]);
            }
            Kind::Number => {
                let value =
                    token
                        .lexeme
                        .parse::<f64>()
                        .map_err(|_| CompileError::InvalidLiteral {
                            lexeme: token.lexeme.clone(),
                        })?;
                let index = self.add_constant(Value::Number(value));
                self.emit(Opcode::Constant, &[index]);
            }
            Kind::String => {
                let index = self.add_constant(Value::String(token.lexeme.clone()));
                self.emit(Opcode::Constant, &[index]);
            }
            _ => {
                return Err(CompileError::InvalidLiteral {
                    lexeme: token.lexeme.clone(),
                })
            }
        }
        Ok(())
    }

    fn emit_store(&mut self, scope: SymbolScope, index: usize) {
        match scope {
            SymbolScope::Global => self.emit(Opcode::SetGlobal, &[index]),
            SymbolScope::Local => self.emit(Opcode::SetLocal, &[index]),
        };
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = code::make(op, operands);
        let position = self.add_instruction(instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: Instructions) -> usize {
        let scope = &mut self.scopes[self.scope_index];
        let position = scope.instructions.len();
        scope.instructions.extend(instruction);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = &mut self.scopes[self.scope_index];
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, opcode: Opcode) -> bool {
        self.scopes[self.scope_index]
            .last_instruction
            .is_some_and(|last| last.opcode == opcode)
    }

    fn remove_last_pop(&mut self) {
        let scope = &mut self.scopes[self.scope_index];
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = &mut self.scopes[self.scope_index];
        if let Some(last) = &mut scope.last_instruction {
            scope.instructions[last.position] = Opcode::ReturnValue as u8;
            last.opcode = Opcode::ReturnValue;
        }
    }

    /// Re-encodes the instruction at `position` with a patched operand. Used
    /// to back-fill jump targets once the branch length is known.
    fn change_operand(&mut self, op: Opcode, position: usize, operand: usize) {
        let instruction = code::make(op, &[operand]);
        let scope = &mut self.scopes[self.scope_index];
        scope.instructions[position..position + instruction.len()].copy_from_slice(&instruction);
    }

    fn current_instructions(&self) -> &Instructions {
        &self.scopes[self.scope_index].instructions
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.scope_index += 1;
        let outer = std::mem::take(&mut self.symbols);
        self.symbols = SymbolTable::enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().unwrap_or_default();
        self.scope_index -= 1;
        if let Some(outer) = self.symbols.outer.take() {
            self.symbols = *outer;
        }
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn compile(program: &Program) -> Result<Bytecode, CompileError> {
    Compiler::new().compile(program)
}

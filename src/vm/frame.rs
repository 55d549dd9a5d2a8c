use std::rc::Rc;

use crate::code::Instructions;
use crate::value::CompiledFunction;

/// Record for an in-flight function call.
///
/// `ip` starts at -1 and is pre-incremented by the fetch loop. `base_pointer`
/// marks where the function's arguments and locals begin on the operand
/// stack.
#[derive(Debug)]
pub struct Frame {
    pub function: Rc<CompiledFunction>,
    pub ip: isize,
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(function: Rc<CompiledFunction>, base_pointer: usize) -> Self {
        Self {
            function,
            ip: -1,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.function.instructions
    }
}

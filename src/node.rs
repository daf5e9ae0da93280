//! Compiled node: the IR atom every dictionary entry's body is made of.
//! Modeled as a tagged variant with an explicit kind discriminant rather
//! than a class hierarchy.

use crate::builtins::BuiltinOp;
use crate::dictionary::DictRef;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::exec::{self, Pc};
use crate::stack_node::StackNode;
use crate::strings::InternedString;

#[derive(Debug, Clone)]
pub enum CompiledNode {
    /// Transient placeholder produced while consuming a string literal's
    /// interior tokens; never appended to a body (see `compiler.rs`).
    Unknown,
    Literal(i64),
    Str(InternedString),
    Constant { entry: DictRef, value: i64 },
    Variable { entry: DictRef, slot: usize },
    CFunc { name: InternedString, op: BuiltinOp },
    Word { entry: DictRef },
}

impl CompiledNode {
    /// Executes this node. Returning `pc` unchanged means "advance by one
    /// in the body being walked"; returning a different `Pc` is a jump
    /// (only `LOOP`, via `BuiltinOp::Loop`, ever does this).
    pub fn execute(&self, engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
        match self {
            CompiledNode::Unknown => Ok(pc),
            CompiledNode::Literal(n) => {
                engine.push_stack(StackNode::Lit(*n))?;
                Ok(pc)
            }
            CompiledNode::Str(s) => {
                let text = engine.arenas.strings.get(*s).to_string();
                print!("{}", text);
                Ok(pc)
            }
            CompiledNode::Constant { value, .. } => {
                engine.push_stack(StackNode::Lit(*value))?;
                Ok(pc)
            }
            CompiledNode::Variable { entry, .. } => {
                engine.push_stack(StackNode::Ref(*entry))?;
                Ok(pc)
            }
            CompiledNode::CFunc { op, .. } => op.execute(engine, pc),
            CompiledNode::Word { entry } => {
                exec::run_full_phrase(engine, *entry)?;
                Ok(pc)
            }
        }
    }
}

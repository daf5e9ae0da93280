//! Execution loop: walks a dictionary entry's body from its
//! first node to the end, consulting `if_states` before each dispatch and
//! honoring PC jumps returned by `LOOP`.

use crate::builtins::BuiltinOp;
use crate::control::IfFrame;
use crate::dictionary::DictRef;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::list::Cursor;
use crate::node::CompiledNode;

/// A program counter: which body (`entry`) and which cell within it
/// (`cursor`). A "jump" (as returned by `LOOP`) is just a different `Pc`
/// carrying the same `entry`. There is no way to construct a `Pc`
/// pointing into another phrase's body, so a jump can only ever land
/// inside the phrase currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pc {
    pub entry: DictRef,
    pub cursor: Cursor,
}

impl Pc {
    pub fn start(entry: DictRef, engine: &Engine) -> Self {
        Pc {
            entry,
            cursor: engine.body_begin(entry),
        }
    }

    /// A `Pc` with no meaningful body to walk: used by node-level unit
    /// tests that exercise a single `CompiledNode::execute` in isolation,
    /// and by `compiler.rs::interpret` to invoke a bare built-in typed
    /// directly at the prompt (outside any phrase). Safe as long as the
    /// built-in never dereferences `entry`, true of every word except
    /// `DO`/`LOOP`, which only ever appear compiled inside a word body.
    pub fn end() -> Self {
        Pc {
            entry: DictRef(0),
            cursor: Cursor::end(),
        }
    }
}

/// Runs `entry`'s body to completion, honoring `IF`/`ELSE`/`THEN` skipping
/// and `LOOP`'s backward jump. Fails fast: the first node that returns an
/// error aborts the whole phrase, leaving `if_states`/`loop_states` exactly
/// as they were at the point of failure (the caller, `compiler.rs`, is
/// responsible for clearing them on error so the next line starts clean).
pub fn run_full_phrase(engine: &mut Engine, entry: DictRef) -> Result<(), ForthError> {
    let end = Cursor::end();
    let mut pc = Pc::start(entry, engine);
    while pc.cursor != end {
        let node = engine.body_node_cloned(entry, pc.cursor);
        if is_branch_word(&node) || top_is_live(engine) {
            let next = node.execute(engine, pc)?;
            if next == pc {
                pc.cursor = engine.body_next(entry, pc.cursor);
            } else {
                pc = next;
            }
        } else {
            pc.cursor = engine.body_next(entry, pc.cursor);
        }
    }
    Ok(())
}

/// `IF`/`ELSE`/`THEN` always dispatch so the `if_states` stack stays
/// balanced even while skipping a branch. Every other node is gated by
/// `top_is_live`.
fn is_branch_word(node: &CompiledNode) -> bool {
    matches!(
        node,
        CompiledNode::CFunc {
            op: BuiltinOp::If | BuiltinOp::Else | BuiltinOp::Then,
            ..
        }
    )
}

/// Whether a plain (non-branch) node should execute right now, given the
/// innermost `IF` frame. `frame.active` carries whether the enclosing
/// context was live when this `IF` was entered (see `control.rs`), so
/// checking only the top frame is enough. Liveness composes transitively
/// through the frame that was pushed while already skipping.
pub fn top_is_live(engine: &Engine) -> bool {
    match engine.if_top() {
        None => true,
        Some(frame) => frame.active && branch_taken(&frame),
    }
}

fn branch_taken(frame: &IfFrame) -> bool {
    if frame.inside_if_body {
        frame.was_true
    } else {
        !frame.was_true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;
    use crate::list::List;
    use crate::node::CompiledNode;
    use crate::stack_node::StackNode;

    /// Test helper: builds a body already in natural execution order
    /// (tokens pushed, then reversed once, same as `compiler.rs`'s `;`).
    fn define_body(engine: &mut Engine, name: &str, nodes: Vec<CompiledNode>) -> DictRef {
        let interned = engine.arenas.strings.intern(name);
        let entry =
            dictionary::define(&mut engine.dict, &mut engine.arenas.dict, interned).unwrap();
        for node in nodes {
            dictionary::entry_mut(&mut engine.arenas.dict, entry)
                .body
                .push_back(&mut engine.arenas.nodes, node)
                .unwrap();
        }
        let body = std::mem::replace(
            &mut dictionary::entry_mut(&mut engine.arenas.dict, entry).body,
            List::new(),
        );
        dictionary::entry_mut(&mut engine.arenas.dict, entry).body =
            body.reversed(&mut engine.arenas.nodes).unwrap();
        entry
    }

    #[test]
    fn test_runs_literals_in_order() {
        let mut engine = Engine::new();
        engine.reset();
        let entry = define_body(
            &mut engine,
            "TWOLIT",
            vec![CompiledNode::Literal(1), CompiledNode::Literal(2)],
        );
        run_full_phrase(&mut engine, entry).unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(2));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(1));
    }

    #[test]
    fn test_failure_aborts_remaining_body() {
        let mut engine = Engine::new();
        engine.reset();
        let entry = define_body(
            &mut engine,
            "BADDIV",
            vec![
                CompiledNode::Literal(10),
                CompiledNode::Literal(0),
                CompiledNode::CFunc {
                    name: engine.arenas.strings.intern("/"),
                    op: BuiltinOp::Div,
                },
                CompiledNode::Literal(999),
            ],
        );
        let result = run_full_phrase(&mut engine, entry);
        assert!(result.is_err());
        assert_eq!(engine.stack_len(), 0, "both operands restored, nothing pushed");
    }
}

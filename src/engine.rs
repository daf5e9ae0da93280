//! Process-wide engine state: arenas, dictionary, stacks, and
//! compiler-mode flags, all reinitialized from `reset()`. Nothing runs
//! in a constructor. `Engine::new()` only allocates empty pools; `reset()`
//! does the actual zeroing and dictionary seeding, avoiding any
//! construction-order hazard.

use crate::arena::Arena;
use crate::builtins::{self, BuiltinOp};
use crate::control::{IfFrame, LoopFrame};
use crate::dictionary::{self, DictArena, DictEntry, DictRef};
use crate::error::ForthError;
use crate::list::{Cursor, List, ListCell};
use crate::messages::Msg;
use crate::node::CompiledNode;
use crate::stack_node::StackNode;
use crate::strings::StringArena;

pub const DICT_CAPACITY: usize = 2048;
pub const NODE_CAPACITY: usize = 8192;
pub const STACK_CAPACITY: usize = 1024;
pub const CONTROL_CAPACITY: usize = 64;
pub const STRING_CAPACITY: usize = 32 * 1024;
pub const VARIABLE_SLOTS: usize = 512;

/// Everything bump-allocated: one `Arena<ListCell<T>>` per cell shape, plus
/// the byte-bump string arena.
pub struct Arenas {
    pub dict: DictArena,
    pub nodes: Arena<ListCell<CompiledNode>>,
    pub stack: Arena<ListCell<StackNode>>,
    pub loops: Arena<ListCell<LoopFrame>>,
    pub ifs: Arena<ListCell<IfFrame>>,
    pub strings: StringArena,
}

impl Arenas {
    fn new() -> Self {
        Arenas {
            dict: Arena::new(DICT_CAPACITY),
            nodes: Arena::new(NODE_CAPACITY),
            stack: Arena::new(STACK_CAPACITY),
            loops: Arena::new(CONTROL_CAPACITY),
            ifs: Arena::new(CONTROL_CAPACITY),
            strings: StringArena::new(STRING_CAPACITY),
        }
    }

    fn clear(&mut self) {
        self.dict.clear();
        self.nodes.clear();
        self.stack.clear();
        self.loops.clear();
        self.ifs.clear();
        self.strings.clear();
    }
}

/// State-machine variables for string-literal capture: which of
/// `variable`/`constant`/`."` the parser is mid-way through reading the
/// name or body of.
#[derive(Debug, Clone)]
pub enum Awaiting {
    Nothing,
    Variable,
    Constant,
    /// Accumulates tokens between `."` and the closing `"`, joined by single
    /// spaces.
    StringLiteral(String),
}

pub struct Engine {
    pub arenas: Arenas,
    pub dict: List<DictEntry>,
    pub data_stack: List<StackNode>,
    pub loop_states: List<LoopFrame>,
    pub if_states: List<IfFrame>,
    pub variables: Vec<i64>,
    next_variable_slot: usize,
    pub compiling: bool,
    pub compiling_entry: Option<DictRef>,
    pub awaiting: Awaiting,
    pub dot_width: i64,
    pub msg: Msg,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            arenas: Arenas::new(),
            dict: List::new(),
            data_stack: List::new(),
            loop_states: List::new(),
            if_states: List::new(),
            variables: vec![0; VARIABLE_SLOTS],
            next_variable_slot: 0,
            compiling: false,
            compiling_entry: None,
            awaiting: Awaiting::Nothing,
            dot_width: 0,
            msg: Msg::new(),
        }
    }

    /// Reinitializes every piece of process-wide state and reseeds the
    /// dictionary with built-ins. Required before first use.
    /// `Engine::new()` alone leaves an unusable, empty engine.
    pub fn reset(&mut self) {
        self.arenas.clear();
        self.dict = List::new();
        self.data_stack = List::new();
        self.loop_states = List::new();
        self.if_states = List::new();
        self.variables = vec![0; VARIABLE_SLOTS];
        self.next_variable_slot = 0;
        self.compiling = false;
        self.compiling_entry = None;
        self.awaiting = Awaiting::Nothing;
        self.dot_width = 0;
        self.seed_builtins();
        self.msg.info("Engine::reset", "engine state reinitialized", None::<bool>);
    }

    /// Built-ins are not dictionary entries; they're a constant name
    /// table (`builtins::BuiltinOp::lookup`) the compiler consults ahead of
    /// the dictionary. Nothing to seed here beyond that the table is
    /// `const`; kept as an explicit step so a future built-in added as a
    /// thin user-level definition (rather than a `BuiltinOp` variant) has
    /// an obvious place to go.
    fn seed_builtins(&mut self) {}

    pub fn push_stack(&mut self, value: StackNode) -> Result<(), ForthError> {
        self.data_stack.push_back(&mut self.arenas.stack, value)?;
        Ok(())
    }

    pub fn pop_stack(&mut self) -> Result<StackNode, ForthError> {
        self.data_stack
            .pop_front(&mut self.arenas.stack)
            .ok_or(ForthError::EmptyStack)
    }

    pub fn stack_len(&self) -> usize {
        self.data_stack.len()
    }

    pub fn dict_name(&self, r: DictRef) -> String {
        let entry = dictionary::entry(&self.arenas.dict, r);
        self.arenas.strings.get(entry.name).to_string()
    }

    pub fn body_begin(&self, entry: DictRef) -> Cursor {
        dictionary::entry(&self.arenas.dict, entry).body.begin()
    }

    pub fn body_next(&self, entry: DictRef, cursor: Cursor) -> Cursor {
        dictionary::entry(&self.arenas.dict, entry)
            .body
            .next(&self.arenas.nodes, cursor)
    }

    pub fn body_node_cloned(&self, entry: DictRef, cursor: Cursor) -> CompiledNode {
        dictionary::entry(&self.arenas.dict, entry)
            .body
            .get(&self.arenas.nodes, cursor)
            .cloned()
            .expect("Pc points past the end of its own body")
    }

    pub fn if_top(&self) -> Option<IfFrame> {
        self.if_states.front(&self.arenas.ifs).copied()
    }

    /// Allocates a fresh variable slot in creation order. Slot indices are
    /// unique and are only ever handed out here, never reclaimed except by
    /// `reset()` reinitializing the whole `Vec`.
    pub fn allocate_variable_slot(&mut self, initial: i64) -> Result<usize, ForthError> {
        if self.next_variable_slot >= VARIABLE_SLOTS {
            return Err(ForthError::OutOfVariableSlots);
        }
        let slot = self.next_variable_slot;
        self.variables[slot] = initial;
        self.next_variable_slot += 1;
        Ok(slot)
    }

    /// Looks up a built-in first, then the dictionary, matching the
    /// compiler and interpreter's word-resolution order.
    pub fn resolve_word(&self, token: &str) -> Option<WordRef> {
        if let Some(op) = BuiltinOp::lookup(token) {
            return Some(WordRef::Builtin(op));
        }
        dictionary::lookup(&self.dict, &self.arenas.dict, &self.arenas.strings, token)
            .map(WordRef::Word)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum WordRef {
    Builtin(BuiltinOp),
    Word(DictRef),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_seeds_usable_engine() {
        let mut engine = Engine::new();
        engine.reset();
        assert_eq!(engine.stack_len(), 0);
        assert!(!engine.compiling);
        assert_eq!(engine.variables.len(), VARIABLE_SLOTS);
    }

    #[test]
    fn test_reset_after_activity_restores_clean_state() {
        let mut engine = Engine::new();
        engine.reset();
        engine.push_stack(StackNode::Lit(1)).unwrap();
        engine.compiling = true;
        engine.allocate_variable_slot(7).unwrap();
        engine.reset();
        assert_eq!(engine.stack_len(), 0);
        assert!(!engine.compiling);
        assert_eq!(engine.variables.len(), VARIABLE_SLOTS);
        assert_eq!(engine.variables[0], 0);
    }

    #[test]
    fn test_resolve_word_prefers_builtin_over_dictionary() {
        let mut engine = Engine::new();
        engine.reset();
        match engine.resolve_word("dup") {
            Some(WordRef::Builtin(BuiltinOp::Dup)) => {}
            other => panic!("expected builtin DUP, got {:?}", other),
        }
    }

    #[test]
    fn test_allocate_variable_slot_is_unique_and_bounded() {
        let mut engine = Engine::new();
        engine.reset();
        let a = engine.allocate_variable_slot(1).unwrap();
        let b = engine.allocate_variable_slot(2).unwrap();
        assert_ne!(a, b);
    }
}

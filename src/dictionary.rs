//! Dictionary: newest-first list of named entries, looked up
//! case-insensitively from the head. Two entries may share a name; lookup
//! always returns the most recently defined one (shadowing). The older
//! entry is never touched, just shadowed.

use crate::arena::Arena;
use crate::error::ForthError;
use crate::list::{List, ListCell};
use crate::node::CompiledNode;
use crate::strings::{InternedString, StringArena};

/// A stable, non-owning reference to a dictionary entry: the index of its
/// cell in the entries arena. Never invalidated by later `push_back` calls,
/// since dictionary cells are only ever reclaimed by a whole-engine
/// `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictRef(pub usize);

pub struct DictEntry {
    pub name: InternedString,
    pub body: List<CompiledNode>,
}

pub type DictArena = Arena<ListCell<DictEntry>>;

/// Appends a new entry with an empty body and returns a reference to it.
/// Callers build a `VARIABLE`/`CONSTANT` node targeting this reference
/// immediately afterward, then append that node to the entry's own body.
pub fn define(
    dict: &mut List<DictEntry>,
    arena: &mut DictArena,
    name: InternedString,
) -> Result<DictRef, ForthError> {
    let idx = dict.push_back(
        arena,
        DictEntry {
            name,
            body: List::new(),
        },
    )?;
    Ok(DictRef(idx))
}

/// Case-insensitive newest-first search.
pub fn lookup(
    dict: &List<DictEntry>,
    arena: &DictArena,
    strings: &StringArena,
    name: &str,
) -> Option<DictRef> {
    let mut cursor = dict.begin();
    while let Some(idx) = cursor.idx {
        let candidate = &arena.get(idx).value;
        if candidate.name.eq_ignore_ascii_case_str(strings, name) {
            return Some(DictRef(idx));
        }
        cursor = dict.next(arena, cursor);
    }
    None
}

pub fn entry(arena: &DictArena, r: DictRef) -> &DictEntry {
    &arena.get(r.0).value
}

pub fn entry_mut(arena: &mut DictArena, r: DictRef) -> &mut DictEntry {
    &mut arena.get_mut(r.0).value
}

//! Runtime value held on the data stack.

use crate::dictionary::DictRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackNode {
    /// A plain integer.
    Lit(i64),
    /// An unresolved reference to a dictionary entry, produced by
    /// executing a bare variable name; fed to `@`/`!` to resolve.
    Ref(DictRef),
}

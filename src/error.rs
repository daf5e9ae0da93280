//! Recoverable failure kinds. Ordinary engine failures are values, never
//! panics or exceptions; only corruption/exhaustion of the arena is fatal
//! and goes through `panic!` (see `arena.rs`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForthError {
    EmptyStack,
    TypeMismatch(String),
    DivisionByZero,
    UnknownWord(String),
    UnterminatedDefinition(String),
    WrongMode(String),
    OutOfMemory,
    OutOfVariableSlots,
    MissingControlFrame(String),
}

impl fmt::Display for ForthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForthError::EmptyStack => write!(f, "stack empty"),
            ForthError::TypeMismatch(what) => write!(f, "type mismatch: {}", what),
            ForthError::DivisionByZero => write!(f, "division by zero"),
            ForthError::UnknownWord(tok) => write!(f, "unknown word: {}", tok),
            ForthError::UnterminatedDefinition(what) => {
                write!(f, "unterminated {}", what)
            }
            ForthError::WrongMode(what) => write!(f, "{}", what),
            ForthError::OutOfMemory => write!(f, "out of memory"),
            ForthError::OutOfVariableSlots => write!(f, "out of variable slots"),
            ForthError::MissingControlFrame(what) => write!(f, "{}", what),
        }
    }
}

impl std::error::Error for ForthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_division_by_zero() {
        assert_eq!(ForthError::DivisionByZero.to_string(), "division by zero");
    }

    #[test]
    fn test_display_unknown_word() {
        let e = ForthError::UnknownWord("FOO".to_string());
        assert_eq!(e.to_string(), "unknown word: FOO");
    }

    #[test]
    fn test_display_missing_control_frame() {
        let e = ForthError::MissingControlFrame("LOOP without DO".to_string());
        assert_eq!(e.to_string(), "LOOP without DO");
    }
}

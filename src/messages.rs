//! Diagnostic reporting: a small leveled logger used throughout the engine
//! instead of `eprintln!` scattered everywhere.

use std::fmt::Debug;

/// Messages below the configured level are dropped. Ordered so that
/// `DebugLevel::Error < DebugLevel::Debug` numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Error,
    Warning,
    Info,
    Debug,
}

/// Reports diagnostics at or above a configured level to stderr.
#[derive(Debug, Clone)]
pub struct Msg {
    level: DebugLevel,
}

impl Msg {
    pub fn new() -> Self {
        Msg {
            level: DebugLevel::Warning,
        }
    }

    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
    }

    pub fn get_level(&self) -> DebugLevel {
        self.level
    }

    pub fn error<T: Debug>(&self, caller: &str, text: &str, data: Option<T>) {
        self.emit(DebugLevel::Error, caller, text, data);
    }

    pub fn warning<T: Debug>(&self, caller: &str, text: &str, data: Option<T>) {
        self.emit(DebugLevel::Warning, caller, text, data);
    }

    pub fn info<T: Debug>(&self, caller: &str, text: &str, data: Option<T>) {
        self.emit(DebugLevel::Info, caller, text, data);
    }

    pub fn debug<T: Debug>(&self, caller: &str, text: &str, data: Option<T>) {
        self.emit(DebugLevel::Debug, caller, text, data);
    }

    fn emit<T: Debug>(&self, level: DebugLevel, caller: &str, text: &str, data: Option<T>) {
        if level > self.level {
            return;
        }
        match data {
            Some(d) => eprintln!("[{:?}] {}: {} ({:?})", level, caller, text, d),
            None => eprintln!("[{:?}] {}: {}", level, caller, text),
        }
    }
}

impl Default for Msg {
    fn default() -> Self {
        Msg::new()
    }
}

//! REPL driver: reads NUL-free lines from
//! stdin or a `-f` file, feeds each to `compiler::parse_line`, and prints
//! the ` OK` / `[x] <message>` discipline. `reset()` is called once up
//! front before the first line is read.

use crate::compiler::{self, LineOutcome};
use crate::config::{self, Config};
use crate::engine::Engine;
use crate::files::{FileHandle, FileMode};
use crate::messages::Msg;

pub fn run(config: &Config) {
    let mut engine = Engine::new();
    engine.msg.set_level(config.debug_level);
    engine.reset();

    let mut msg = Msg::new();
    msg.set_level(config.debug_level);

    if !config.no_banner {
        println!("pocket-forth {}", config::VERSION);
    }

    if !config.loaded_file.is_empty() {
        let path = std::path::PathBuf::from(&config.loaded_file);
        match FileHandle::new(Some(&path), msg.clone(), FileMode::RO) {
            Some(mut handle) => run_source(&mut engine, &mut handle),
            None => {
                msg.error("repl::run", "unable to open file", Some(&config.loaded_file));
                return;
            }
        }
    }

    match FileHandle::new(None, msg.clone(), FileMode::RO) {
        Some(mut stdin) => run_source(&mut engine, &mut stdin),
        None => msg.error("repl::run", "unable to open stdin", None::<String>),
    }
}

fn run_source(engine: &mut Engine, source: &mut FileHandle) {
    while let Some(line) = source.get_line() {
        run_line(engine, &line);
    }
}

/// Runs one line through the compiler and prints the driver-level
/// outcome. A still-open `:` definition (`LineOutcome::Warning`) is
/// reported but is not an error; `compiling` simply carries into the
/// next line.
fn run_line(engine: &mut Engine, line: &str) {
    match compiler::parse_line(engine, line) {
        Ok(LineOutcome::Ok) => println!(" OK"),
        Ok(LineOutcome::Warning(text)) => println!("{}", text),
        Err(e) => println!("[x] {}", e),
    }
}

// pocket-forth: an interactive, memory-constrained Forth-family interpreter.
// Version 0.1

mod arena;
mod builtins;
mod compiler;
mod config;
mod control;
mod dictionary;
mod engine;
mod error;
mod exec;
mod files;
mod list;
mod messages;
mod node;
mod repl;
mod stack_node;
mod strings;

use config::Config;

fn main() {
    let mut config = Config::new();
    config.process_args();
    repl::run(&config);
}

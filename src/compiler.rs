//! Tokenizer and compile/interpret state machine. `parse_line` owns the
//! per-token dispatch: whitespace splitting, `\` line comments, `:`/`;`
//! compile-mode transitions, the `awaiting_*` continuations for
//! `variable`/`constant`/`."`, and the `reset` reserved token, all ahead
//! of handing a bare token to `interpret`.
//!
//! `DO`/`LOOP`/`IF`/`ELSE`/`THEN` never appear as special tokens here;
//! they're ordinary dictionary/builtin lookups like any other word.

use crate::builtins;
use crate::dictionary;
use crate::engine::{Awaiting, Engine, WordRef};
use crate::error::ForthError;
use crate::exec::{self, Pc};
use crate::list::List;
use crate::node::CompiledNode;
use crate::stack_node::StackNode;

/// What a successful `parse_line` call reports back to the REPL driver.
/// A still-open `:` definition at line end is not a failure; `compiling`
/// simply persists into the next line. But it isn't a plain ` OK` either,
/// so the driver needs to tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Ok,
    Warning(String),
}

/// Tokenizes `line` on whitespace and drives the per-token state machine.
/// A `\` token truncates the rest of the line; every
/// other token is dispatched through the compiling/awaiting/interpreting
/// branches, checked in that priority order.
pub fn parse_line(engine: &mut Engine, line: &str) -> Result<LineOutcome, ForthError> {
    for token in line.split_whitespace() {
        if token == "\\" {
            break;
        }

        if token == ":" && !engine.compiling {
            engine.compiling = true;
            engine.compiling_entry = None;
            continue;
        }

        if token == ";" && engine.compiling {
            end_definition(engine)?;
            continue;
        }

        if engine.compiling {
            compile_token(engine, token)?;
            continue;
        }

        match await_kind(engine) {
            AwaitKind::Constant => {
                finish_constant(engine, token)?;
                continue;
            }
            AwaitKind::Variable => {
                finish_variable(engine, token)?;
                continue;
            }
            AwaitKind::StringLiteral => {
                continue_interpreted_string(engine, token);
                continue;
            }
            AwaitKind::Nothing => {}
        }

        if token.eq_ignore_ascii_case("reset") {
            engine.reset();
            continue;
        }

        interpret(engine, token)?;
    }

    if engine.compiling {
        Ok(LineOutcome::Warning(
            "definition unfinished, missing ';'".to_string(),
        ))
    } else {
        Ok(LineOutcome::Ok)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AwaitKind {
    Nothing,
    Variable,
    Constant,
    StringLiteral,
}

fn await_kind(engine: &Engine) -> AwaitKind {
    match &engine.awaiting {
        Awaiting::Nothing => AwaitKind::Nothing,
        Awaiting::Variable => AwaitKind::Variable,
        Awaiting::Constant => AwaitKind::Constant,
        Awaiting::StringLiteral(_) => AwaitKind::StringLiteral,
    }
}

/// `;` handling: fails if any `awaiting_*` flag is
/// still set, otherwise reverses the just-compiled body (it was built
/// head-first by repeated `push_back`, see `list.rs`) so it executes in
/// the order it was typed.
fn end_definition(engine: &mut Engine) -> Result<(), ForthError> {
    engine.compiling = false;
    match await_kind(engine) {
        AwaitKind::Variable => {
            return Err(ForthError::UnterminatedDefinition("variable".to_string()))
        }
        AwaitKind::Constant => {
            return Err(ForthError::UnterminatedDefinition("constant".to_string()))
        }
        AwaitKind::StringLiteral => {
            return Err(ForthError::UnterminatedDefinition(
                "string literal".to_string(),
            ))
        }
        AwaitKind::Nothing => {}
    }
    if let Some(entry) = engine.compiling_entry.take() {
        let body = std::mem::replace(
            &mut dictionary::entry_mut(&mut engine.arenas.dict, entry).body,
            List::new(),
        );
        dictionary::entry_mut(&mut engine.arenas.dict, entry).body =
            body.reversed(&mut engine.arenas.nodes)?;
    }
    Ok(())
}

/// Compile-mode token dispatch: the first token names
/// the new word; every token after that is lowered by `compile_word` and
/// appended unless it's a transient `Unknown` (the interior of a string
/// literal still being accumulated).
fn compile_token(engine: &mut Engine, token: &str) -> Result<(), ForthError> {
    if engine.compiling_entry.is_none() {
        let name = engine.arenas.strings.intern(token);
        let entry = dictionary::define(&mut engine.dict, &mut engine.arenas.dict, name)?;
        engine.compiling_entry = Some(entry);
        return Ok(());
    }
    let node = compile_word(engine, token)?;
    if !matches!(node, CompiledNode::Unknown) {
        let entry = engine.compiling_entry.expect("checked above");
        dictionary::entry_mut(&mut engine.arenas.dict, entry)
            .body
            .push_back(&mut engine.arenas.nodes, node)?;
    }
    Ok(())
}

/// Lowers one token into a `CompiledNode` while compiling. String-literal
/// interiors are handled by interning progressively into the string arena
/// as each token between `."` and `"` arrives.
fn compile_word(engine: &mut Engine, token: &str) -> Result<CompiledNode, ForthError> {
    if matches!(engine.awaiting, Awaiting::StringLiteral(_)) {
        return Ok(continue_compiled_string(engine, token));
    }
    if token == ".\"" {
        engine.awaiting = Awaiting::StringLiteral(String::new());
        return Ok(CompiledNode::Unknown);
    }
    if let Some(n) = isnumber(token) {
        return Ok(CompiledNode::Literal(n));
    }
    match engine.resolve_word(token) {
        Some(WordRef::Builtin(op)) => {
            let name = engine.arenas.strings.intern(token);
            Ok(CompiledNode::CFunc { name, op })
        }
        Some(WordRef::Word(entry)) => Ok(CompiledNode::Word { entry }),
        None => Err(ForthError::UnknownWord(token.to_string())),
    }
}

/// Appends `token` to the in-progress string, or finalizes and interns it
/// on the closing `"`. Tokens inside the literal are rejoined with single
/// spaces, since the original whitespace between them was consumed by
/// tokenization.
fn continue_compiled_string(engine: &mut Engine, token: &str) -> CompiledNode {
    if token == "\"" {
        let text = match std::mem::replace(&mut engine.awaiting, Awaiting::Nothing) {
            Awaiting::StringLiteral(s) => s,
            _ => unreachable!("checked by caller"),
        };
        let interned = engine.arenas.strings.intern(&text);
        CompiledNode::Str(interned)
    } else {
        if let Awaiting::StringLiteral(acc) = &mut engine.awaiting {
            if !acc.is_empty() {
                acc.push(' ');
            }
            acc.push_str(token);
        }
        CompiledNode::Unknown
    }
}

/// The interpreted-mode twin of `continue_compiled_string`: a bare `."`
/// ... `"` pair outside a colon-definition prints directly instead of
/// compiling a node.
fn continue_interpreted_string(engine: &mut Engine, token: &str) {
    if token == "\"" {
        let text = match std::mem::replace(&mut engine.awaiting, Awaiting::Nothing) {
            Awaiting::StringLiteral(s) => s,
            _ => unreachable!("checked by caller"),
        };
        print!("{}", text);
    } else if let Awaiting::StringLiteral(acc) = &mut engine.awaiting {
        if !acc.is_empty() {
            acc.push(' ');
        }
        acc.push_str(token);
    }
}

/// `variable`/`constant` continuation: the token
/// names the new entry; the initial value was already computed and left
/// on the stack by the previous line of input.
fn finish_variable(engine: &mut Engine, token: &str) -> Result<(), ForthError> {
    let value = builtins::evaluate_stack_top(engine, "variable")?;
    let slot = engine.allocate_variable_slot(value)?;
    let name = engine.arenas.strings.intern(token);
    let entry = dictionary::define(&mut engine.dict, &mut engine.arenas.dict, name)?;
    dictionary::entry_mut(&mut engine.arenas.dict, entry)
        .body
        .push_back(&mut engine.arenas.nodes, CompiledNode::Variable { entry, slot })?;
    engine.awaiting = Awaiting::Nothing;
    Ok(())
}

fn finish_constant(engine: &mut Engine, token: &str) -> Result<(), ForthError> {
    let value = builtins::evaluate_stack_top(engine, "constant")?;
    let name = engine.arenas.strings.intern(token);
    let entry = dictionary::define(&mut engine.dict, &mut engine.arenas.dict, name)?;
    dictionary::entry_mut(&mut engine.arenas.dict, entry)
        .body
        .push_back(
            &mut engine.arenas.nodes,
            CompiledNode::Constant { entry, value },
        )?;
    engine.awaiting = Awaiting::Nothing;
    Ok(())
}

/// Interpreted-mode token dispatch, including the
/// `variable`/`constant`/`."` entry points. Numbers
/// push; built-ins run immediately; dictionary words run their whole body.
fn interpret(engine: &mut Engine, token: &str) -> Result<(), ForthError> {
    if token == ".\"" {
        engine.awaiting = Awaiting::StringLiteral(String::new());
        return Ok(());
    }
    if token.eq_ignore_ascii_case("variable") {
        if engine.stack_len() == 0 {
            return Err(ForthError::EmptyStack);
        }
        engine.awaiting = Awaiting::Variable;
        return Ok(());
    }
    if token.eq_ignore_ascii_case("constant") {
        if engine.stack_len() == 0 {
            return Err(ForthError::EmptyStack);
        }
        engine.awaiting = Awaiting::Constant;
        return Ok(());
    }
    if let Some(n) = isnumber(token) {
        engine.push_stack(StackNode::Lit(n))?;
        return Ok(());
    }
    match engine.resolve_word(token) {
        Some(WordRef::Builtin(op)) => {
            op.execute(engine, Pc::end())?;
            Ok(())
        }
        Some(WordRef::Word(entry)) => exec::run_full_phrase(engine, entry),
        None => Err(ForthError::UnknownWord(token.to_string())),
    }
}

/// Decimal (optionally signed), `$`-prefixed hex, or `%`-prefixed binary.
/// The entire token must consume.
pub fn isnumber(token: &str) -> Option<i64> {
    if token.is_empty() {
        return None;
    }
    if let Some(digits) = token.strip_prefix('$') {
        if digits.is_empty() {
            return None;
        }
        return i64::from_str_radix(digits, 16).ok();
    }
    if let Some(digits) = token.strip_prefix('%') {
        if digits.is_empty() {
            return None;
        }
        return i64::from_str_radix(digits, 2).ok();
    }
    token.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Engine {
        let mut engine = Engine::new();
        engine.reset();
        engine
    }

    fn run(engine: &mut Engine, line: &str) -> Result<LineOutcome, ForthError> {
        parse_line(engine, line)
    }

    #[test]
    fn test_scenario_arithmetic_and_print() {
        let mut engine = fresh();
        run(&mut engine, "3 4 +").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(7));
    }

    #[test]
    fn test_scenario_division_by_zero_fails_and_restores_stack() {
        let mut engine = fresh();
        let result = run(&mut engine, "10 0 /");
        assert_eq!(result, Err(ForthError::DivisionByZero));
        assert_eq!(engine.stack_len(), 2);
    }

    #[test]
    fn test_scenario_colon_definition_and_reuse() {
        let mut engine = fresh();
        assert_eq!(run(&mut engine, ": SQUARE DUP * ;").unwrap(), LineOutcome::Ok);
        run(&mut engine, "5 SQUARE").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(25));
    }

    #[test]
    fn test_scenario_variable_define_store_fetch() {
        let mut engine = fresh();
        run(&mut engine, "42 variable X").unwrap();
        run(&mut engine, "X @").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(42));
        run(&mut engine, "100 X !").unwrap();
        run(&mut engine, "X @").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(100));
    }

    #[test]
    fn test_scenario_do_loop_with_i() {
        let mut engine = fresh();
        run(&mut engine, ": COUNT 5 0 DO I LOOP ;").unwrap();
        run(&mut engine, "COUNT").unwrap();
        for expected in (0..5).rev() {
            assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(expected));
        }
        assert_eq!(engine.stack_len(), 0);
    }

    #[test]
    fn test_scenario_nested_if_else_then() {
        let mut engine = fresh();
        run(
            &mut engine,
            ": SIGN DUP 0 > IF DROP 1 ELSE 0 < IF -1 ELSE 0 THEN THEN ;",
        )
        .unwrap();
        run(&mut engine, "7 SIGN").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(1));
        run(&mut engine, "-3 SIGN").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(-1));
        run(&mut engine, "0 SIGN").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(0));
    }

    #[test]
    fn test_scenario_hex_and_binary_literals() {
        let mut engine = fresh();
        run(&mut engine, "$FF %1010 255").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(255));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(10));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(255));
    }

    #[test]
    fn test_scenario_unterminated_definition_survives_line_boundary() {
        let mut engine = fresh();
        let outcome = run(&mut engine, ": ADD3 1 +").unwrap();
        assert!(matches!(outcome, LineOutcome::Warning(_)));
        assert!(engine.compiling);
        assert_eq!(run(&mut engine, ";").unwrap(), LineOutcome::Ok);
        assert!(!engine.compiling);
        run(&mut engine, "4 ADD3").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(5));
    }

    #[test]
    fn test_dictionary_shadowing_newest_first() {
        let mut engine = fresh();
        run(&mut engine, ": X 1 ;").unwrap();
        run(&mut engine, ": X 2 ;").unwrap();
        run(&mut engine, "X").unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(2));
    }

    #[test]
    fn test_reset_token_clears_user_words() {
        let mut engine = fresh();
        run(&mut engine, ": DOUBLE DUP + ;").unwrap();
        run(&mut engine, "reset").unwrap();
        let result = run(&mut engine, "3 DOUBLE");
        assert!(matches!(result, Err(ForthError::UnknownWord(_))));
    }

    #[test]
    fn test_variable_without_initial_value_fails() {
        let mut engine = fresh();
        let result = run(&mut engine, "variable X");
        assert!(result.is_err());
    }

    #[test]
    fn test_string_literal_interpreted_directly() {
        let mut engine = fresh();
        // Exercises the bare `."` ... `"` path; nothing left on the stack.
        run(&mut engine, ".\" hello world \"").unwrap();
        assert_eq!(engine.stack_len(), 0);
    }

    #[test]
    fn test_string_literal_compiled_into_word() {
        let mut engine = fresh();
        run(&mut engine, ": GREET .\" hi there \" ;").unwrap();
        run(&mut engine, "GREET").unwrap();
        assert_eq!(engine.stack_len(), 0);
    }

    #[test]
    fn test_isnumber_decimal_hex_binary_and_rejects_garbage() {
        assert_eq!(isnumber("42"), Some(42));
        assert_eq!(isnumber("-7"), Some(-7));
        assert_eq!(isnumber("$FF"), Some(255));
        assert_eq!(isnumber("%1010"), Some(10));
        assert_eq!(isnumber("12abc"), None);
        assert_eq!(isnumber(""), None);
    }

    #[test]
    fn test_comment_truncates_remainder_of_line() {
        let mut engine = fresh();
        run(&mut engine, "3 4 + \\ 5 6 +").unwrap();
        assert_eq!(engine.stack_len(), 1);
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(7));
    }
}

//! Built-in operations: arithmetic, comparison, stack manipulation, I/O,
//! variable access, and control flow. Each takes the PC it was invoked
//! from and returns the PC the executor should continue from. Unchanged
//! means "advance by one"; only `LOOP` ever returns a different one (a
//! backward jump).

use crate::control::{IfFrame, LoopFrame};
use crate::dictionary;
use crate::engine::Engine;
use crate::error::ForthError;
use crate::exec::{self, Pc};
use crate::node::CompiledNode;
use crate::stack_node::StackNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    MulDiv,
    Eq,
    Gt,
    Lt,
    Dot,
    Cr,
    UDotR,
    Swap,
    Rot,
    Dup,
    Drop,
    DotS,
    Fetch,
    Store,
    Do,
    Loop,
    I,
    J,
    If,
    Else,
    Then,
    Words,
}

const TABLE: &[(&str, BuiltinOp)] = &[
    ("+", BuiltinOp::Add),
    ("-", BuiltinOp::Sub),
    ("*", BuiltinOp::Mul),
    ("/", BuiltinOp::Div),
    ("MOD", BuiltinOp::Mod),
    ("*/", BuiltinOp::MulDiv),
    ("=", BuiltinOp::Eq),
    (">", BuiltinOp::Gt),
    ("<", BuiltinOp::Lt),
    (".", BuiltinOp::Dot),
    ("CR", BuiltinOp::Cr),
    ("U.R", BuiltinOp::UDotR),
    ("SWAP", BuiltinOp::Swap),
    ("ROT", BuiltinOp::Rot),
    ("DUP", BuiltinOp::Dup),
    ("DROP", BuiltinOp::Drop),
    (".S", BuiltinOp::DotS),
    ("@", BuiltinOp::Fetch),
    ("!", BuiltinOp::Store),
    ("DO", BuiltinOp::Do),
    ("LOOP", BuiltinOp::Loop),
    ("I", BuiltinOp::I),
    ("J", BuiltinOp::J),
    ("IF", BuiltinOp::If),
    ("ELSE", BuiltinOp::Else),
    ("THEN", BuiltinOp::Then),
    ("WORDS", BuiltinOp::Words),
];

impl BuiltinOp {
    pub fn lookup(name: &str) -> Option<BuiltinOp> {
        TABLE
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, op)| *op)
    }

    pub fn name(self) -> &'static str {
        TABLE
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(n, _)| *n)
            .unwrap_or("?")
    }

    pub fn execute(self, engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
        match self {
            BuiltinOp::Add => binary_arith(engine, pc, "+", |b, a| Ok(b + a)),
            BuiltinOp::Sub => binary_arith(engine, pc, "-", |b, a| Ok(b - a)),
            BuiltinOp::Mul => binary_arith(engine, pc, "*", |b, a| Ok(b * a)),
            BuiltinOp::Div => binary_arith(engine, pc, "/", |b, a| {
                if a == 0 {
                    Err(ForthError::DivisionByZero)
                } else {
                    Ok(b / a)
                }
            }),
            BuiltinOp::Mod => binary_arith(engine, pc, "MOD", |b, a| {
                if a == 0 {
                    Err(ForthError::DivisionByZero)
                } else {
                    Ok(b % a)
                }
            }),
            BuiltinOp::MulDiv => mul_div(engine, pc),
            BuiltinOp::Eq => compare(engine, pc, "=", |b, a| b == a),
            BuiltinOp::Gt => compare(engine, pc, ">", |b, a| b > a),
            BuiltinOp::Lt => compare(engine, pc, "<", |b, a| b < a),
            BuiltinOp::Dot => dot(engine, pc),
            BuiltinOp::Cr => {
                println!();
                Ok(pc)
            }
            BuiltinOp::UDotR => u_dot_r(engine, pc),
            BuiltinOp::Swap => swap(engine, pc),
            BuiltinOp::Rot => rot(engine, pc),
            BuiltinOp::Dup => dup(engine, pc),
            BuiltinOp::Drop => drop_top(engine, pc),
            BuiltinOp::DotS => dot_s(engine, pc),
            BuiltinOp::Fetch => fetch(engine, pc),
            BuiltinOp::Store => store(engine, pc),
            BuiltinOp::Do => do_word(engine, pc),
            BuiltinOp::Loop => loop_word(engine, pc),
            BuiltinOp::I => i_word(engine, pc),
            BuiltinOp::J => j_word(engine, pc),
            BuiltinOp::If => if_word(engine, pc),
            BuiltinOp::Else => else_word(engine, pc),
            BuiltinOp::Then => then_word(engine, pc),
            BuiltinOp::Words => words(engine, pc),
        }
    }
}

/// Stack-value coercion: pops the top; a `LIT` is returned
/// as-is, a `REF` is resolved by inspecting the referenced entry's own
/// body (its single `VARIABLE`/`CONSTANT` node) rather than dispatching
/// through the generic executor, which would just push the same `REF`
/// back (see `node.rs`'s `CompiledNode::Variable::execute`).
pub fn evaluate_stack_top(engine: &mut Engine, what: &str) -> Result<i64, ForthError> {
    match engine.pop_stack()? {
        StackNode::Lit(n) => Ok(n),
        StackNode::Ref(entry) => resolve_ref(engine, entry, what),
    }
}

fn resolve_ref(engine: &Engine, entry: dictionary::DictRef, what: &str) -> Result<i64, ForthError> {
    let owner = dictionary::entry(&engine.arenas.dict, entry);
    match owner.body.front(&engine.arenas.nodes) {
        Some(CompiledNode::Variable { slot, .. }) => Ok(engine.variables[*slot]),
        Some(CompiledNode::Constant { value, .. }) => Ok(*value),
        _ => Err(ForthError::TypeMismatch(format!(
            "{}: not a variable or constant",
            what
        ))),
    }
}

fn binary_arith(
    engine: &mut Engine,
    pc: Pc,
    name: &str,
    f: impl Fn(i64, i64) -> Result<i64, ForthError>,
) -> Result<Pc, ForthError> {
    let a = evaluate_stack_top(engine, name)?;
    let b = match evaluate_stack_top(engine, name) {
        Ok(b) => b,
        Err(e) => {
            engine.push_stack(StackNode::Lit(a))?;
            return Err(e);
        }
    };
    match f(b, a) {
        Ok(result) => {
            engine.push_stack(StackNode::Lit(result))?;
            Ok(pc)
        }
        Err(e) => {
            engine.push_stack(StackNode::Lit(b))?;
            engine.push_stack(StackNode::Lit(a))?;
            Err(e)
        }
    }
}

fn compare(
    engine: &mut Engine,
    pc: Pc,
    name: &str,
    rel: impl Fn(i64, i64) -> bool,
) -> Result<Pc, ForthError> {
    let a = evaluate_stack_top(engine, name)?;
    let b = match evaluate_stack_top(engine, name) {
        Ok(b) => b,
        Err(e) => {
            engine.push_stack(StackNode::Lit(a))?;
            return Err(e);
        }
    };
    engine.push_stack(StackNode::Lit(if rel(b, a) { 1 } else { 0 }))?;
    Ok(pc)
}

/// `*/` ( a b c -- (a*b)/c ). Widens through `i128` so the intermediate
/// product can't overflow an `i64` even when the final quotient fits.
fn mul_div(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let c = evaluate_stack_top(engine, "*/")?;
    let b = match evaluate_stack_top(engine, "*/") {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(StackNode::Lit(c))?;
            return Err(e);
        }
    };
    let a = match evaluate_stack_top(engine, "*/") {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(StackNode::Lit(b))?;
            engine.push_stack(StackNode::Lit(c))?;
            return Err(e);
        }
    };
    if c == 0 {
        engine.push_stack(StackNode::Lit(a))?;
        engine.push_stack(StackNode::Lit(b))?;
        engine.push_stack(StackNode::Lit(c))?;
        return Err(ForthError::DivisionByZero);
    }
    let result = ((a as i128) * (b as i128) / (c as i128)) as i64;
    engine.push_stack(StackNode::Lit(result))?;
    Ok(pc)
}

fn dot(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let v = evaluate_stack_top(engine, ".")?;
    if engine.dot_width > 0 {
        let text = v.to_string();
        let width = engine.dot_width as usize;
        if text.len() < width {
            print!("{}", " ".repeat(width - text.len()));
        }
        print!("{}", text);
        engine.dot_width = 0;
    } else {
        print!(" {}", v);
    }
    Ok(pc)
}

fn u_dot_r(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let width = evaluate_stack_top(engine, "U.R")?;
    if width < 0 {
        return Err(ForthError::TypeMismatch(
            "U.R: width must be non-negative".to_string(),
        ));
    }
    engine.dot_width = width;
    Ok(pc)
}

fn swap(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let a = engine.pop_stack()?;
    let b = match engine.pop_stack() {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(a)?;
            return Err(e);
        }
    };
    engine.push_stack(a)?;
    engine.push_stack(b)?;
    Ok(pc)
}

/// Classic Forth `ROT`: `( x1 x2 x3 -- x2 x3 x1 )`. The deepest of the
/// three moves to the top.
fn rot(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let x3 = engine.pop_stack()?;
    let x2 = match engine.pop_stack() {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(x3)?;
            return Err(e);
        }
    };
    let x1 = match engine.pop_stack() {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(x2)?;
            engine.push_stack(x3)?;
            return Err(e);
        }
    };
    engine.push_stack(x2)?;
    engine.push_stack(x3)?;
    engine.push_stack(x1)?;
    Ok(pc)
}

fn dup(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let top = engine.pop_stack()?;
    engine.push_stack(top)?;
    engine.push_stack(top)?;
    Ok(pc)
}

fn drop_top(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    engine.pop_stack()?;
    Ok(pc)
}

/// `.S` prints the stack bottom-to-top without mutating it, followed by
/// arena/free-list stats.
fn dot_s(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let values: Vec<StackNode> = engine.data_stack.iter(&engine.arenas.stack).copied().collect();
    print!("[ ");
    for v in values.iter().rev() {
        match v {
            StackNode::Lit(n) => print!("{} ", n),
            StackNode::Ref(r) => print!("{} ", engine.dict_name(*r)),
        }
    }
    print!("] ");
    let stats = engine.arenas.stack.stats();
    print!("(stack cells: {} live, {} free) ", stats.live, stats.free);
    Ok(pc)
}

/// `@`. Only a `REF` to a `VARIABLE`/`CONSTANT` entry is a valid operand;
/// a raw `LIT` "address" is rejected. Raw memory access is not exposed.
fn fetch(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let top = engine.pop_stack()?;
    match top {
        StackNode::Ref(entry) => match resolve_ref(engine, entry, "@") {
            Ok(v) => {
                engine.push_stack(StackNode::Lit(v))?;
                Ok(pc)
            }
            Err(e) => {
                engine.push_stack(top)?;
                Err(e)
            }
        },
        StackNode::Lit(_) => {
            engine.push_stack(top)?;
            Err(ForthError::TypeMismatch(
                "@: requires a variable or constant".to_string(),
            ))
        }
    }
}

/// `!`. Pops the target (must be a `REF` to a `VARIABLE`), then the value
/// via `evaluate_stack_top`, writing into that variable's slot.
fn store(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let target = engine.pop_stack()?;
    let entry = match target {
        StackNode::Ref(r) => r,
        StackNode::Lit(_) => {
            engine.push_stack(target)?;
            return Err(ForthError::TypeMismatch(
                "!: requires a variable".to_string(),
            ));
        }
    };
    let slot = {
        let owner = dictionary::entry(&engine.arenas.dict, entry);
        match owner.body.front(&engine.arenas.nodes) {
            Some(CompiledNode::Variable { slot, .. }) => Some(*slot),
            _ => None,
        }
    };
    let slot = match slot {
        Some(s) => s,
        None => {
            engine.push_stack(target)?;
            return Err(ForthError::TypeMismatch(
                "!: target is not a variable".to_string(),
            ));
        }
    };
    let value = match evaluate_stack_top(engine, "!") {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(target)?;
            return Err(e);
        }
    };
    engine.variables[slot] = value;
    Ok(pc)
}

/// `DO`. Pops `begin` (top) then `end`, pushing a loop frame whose
/// `first_body_pc` is the node right after this `DO`.
fn do_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let begin = evaluate_stack_top(engine, "DO")?;
    let end = match evaluate_stack_top(engine, "DO") {
        Ok(v) => v,
        Err(e) => {
            engine.push_stack(StackNode::Lit(begin))?;
            return Err(e);
        }
    };
    let first_body_pc = Pc {
        entry: pc.entry,
        cursor: engine.body_next(pc.entry, pc.cursor),
    };
    engine.loop_states.push_back(
        &mut engine.arenas.loops,
        LoopFrame {
            begin,
            end,
            current: begin,
            first_body_pc,
        },
    )?;
    Ok(pc)
}

/// `LOOP`. Increments the innermost frame's `current`. Past `end`, pops
/// the frame and falls through; otherwise jumps back to `first_body_pc`.
fn loop_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let mut frame = *engine
        .loop_states
        .front(&engine.arenas.loops)
        .ok_or_else(|| ForthError::MissingControlFrame("LOOP without DO".to_string()))?;
    frame.current += 1;
    if frame.current >= frame.end {
        engine.loop_states.pop_front(&mut engine.arenas.loops);
        Ok(Pc {
            entry: pc.entry,
            cursor: engine.body_next(pc.entry, pc.cursor),
        })
    } else {
        if let Some(top) = engine.loop_states.front_mut(&mut engine.arenas.loops) {
            top.current = frame.current;
        }
        Ok(frame.first_body_pc)
    }
}

fn i_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let current = {
        let frame = engine
            .loop_states
            .front(&engine.arenas.loops)
            .ok_or_else(|| ForthError::MissingControlFrame("I outside DO/LOOP".to_string()))?;
        frame.current
    };
    engine.push_stack(StackNode::Lit(current))?;
    Ok(pc)
}

/// `J`. The next-outer loop frame's `current`; fails rather than
/// pointer-chasing past the end of `loop_states`.
fn j_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    let outer = engine.loop_states.begin();
    if outer.idx.is_none() {
        return Err(ForthError::MissingControlFrame(
            "J: no loop frames".to_string(),
        ));
    }
    let outer = engine.loop_states.next(&engine.arenas.loops, outer);
    let current = engine
        .loop_states
        .get(&engine.arenas.loops, outer)
        .map(|f| f.current)
        .ok_or_else(|| ForthError::MissingControlFrame("J: fewer than two loop frames".to_string()))?;
    engine.push_stack(StackNode::Lit(current))?;
    Ok(pc)
}

/// `IF`. Pops the condition only when actually live (see
/// `exec::top_is_live`). When reached inside an already-skipped branch,
/// pushes an inactive frame instead so the matching `ELSE`/`THEN` still
/// balance without touching a stack that was never meant to feed this IF.
fn if_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    if exec::top_is_live(engine) {
        let cond = evaluate_stack_top(engine, "IF")?;
        engine.if_states.push_back(
            &mut engine.arenas.ifs,
            IfFrame {
                was_true: cond != 0,
                inside_if_body: true,
                active: true,
            },
        )?;
    } else {
        engine.if_states.push_back(
            &mut engine.arenas.ifs,
            IfFrame {
                was_true: false,
                inside_if_body: true,
                active: false,
            },
        )?;
    }
    Ok(pc)
}

fn else_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    match engine.if_states.front_mut(&mut engine.arenas.ifs) {
        Some(frame) => {
            frame.inside_if_body = false;
            Ok(pc)
        }
        None => Err(ForthError::MissingControlFrame(
            "ELSE without IF".to_string(),
        )),
    }
}

fn then_word(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    match engine.if_states.pop_front(&mut engine.arenas.ifs) {
        Some(_) => Ok(pc),
        None => Err(ForthError::MissingControlFrame(
            "THEN without IF".to_string(),
        )),
    }
}

fn words(engine: &mut Engine, pc: Pc) -> Result<Pc, ForthError> {
    for (name, _) in TABLE {
        print!("{} ", name);
    }
    let mut cursor = engine.dict.begin();
    while let Some(idx) = cursor.idx {
        let name = engine.arenas.strings.get(dictionary::entry(&engine.arenas.dict, dictionary::DictRef(idx)).name);
        print!("{} ", name);
        cursor = engine.dict.next(&engine.arenas.dict, cursor);
    }
    println!();
    Ok(pc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn fresh() -> Engine {
        let mut engine = Engine::new();
        engine.reset();
        engine
    }

    /// A `Pc` pointing at a real, empty dictionary entry, needed by any
    /// test that exercises `DO`/`LOOP`, since they dereference `pc.entry`.
    fn pc(engine: &mut Engine) -> Pc {
        let name = engine.arenas.strings.intern("TESTWORD");
        let entry = dictionary::define(&mut engine.dict, &mut engine.arenas.dict, name).unwrap();
        Pc {
            entry,
            cursor: crate::list::Cursor::end(),
        }
    }

    #[test]
    fn test_add_pops_two_pushes_sum() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(3)).unwrap();
        engine.push_stack(StackNode::Lit(4)).unwrap();
        let p = pc(&mut engine);
        BuiltinOp::Add.execute(&mut engine, p).unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(7));
    }

    #[test]
    fn test_sub_order_is_second_minus_top() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(10)).unwrap();
        engine.push_stack(StackNode::Lit(3)).unwrap();
        let p = pc(&mut engine);
        BuiltinOp::Sub.execute(&mut engine, p).unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(7));
    }

    #[test]
    fn test_division_by_zero_restores_both_operands() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(10)).unwrap();
        engine.push_stack(StackNode::Lit(0)).unwrap();
        let p = pc(&mut engine);
        let result = BuiltinOp::Div.execute(&mut engine, p);
        assert_eq!(result, Err(ForthError::DivisionByZero));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(0));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(10));
    }

    #[test]
    fn test_swap_underflow_restores_the_one_item_popped() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(1)).unwrap();
        let p = pc(&mut engine);
        let result = BuiltinOp::Swap.execute(&mut engine, p);
        assert!(result.is_err());
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(1));
        assert_eq!(engine.stack_len(), 0);
    }

    #[test]
    fn test_rot_moves_deepest_to_top() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(1)).unwrap();
        engine.push_stack(StackNode::Lit(2)).unwrap();
        engine.push_stack(StackNode::Lit(3)).unwrap();
        let p = pc(&mut engine);
        BuiltinOp::Rot.execute(&mut engine, p).unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(1));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(3));
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(2));
    }

    #[test]
    fn test_mul_div_widens_through_i128() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(1_000_000)).unwrap();
        engine.push_stack(StackNode::Lit(1_000_000)).unwrap();
        engine.push_stack(StackNode::Lit(1000)).unwrap();
        let p = pc(&mut engine);
        BuiltinOp::MulDiv.execute(&mut engine, p).unwrap();
        assert_eq!(engine.pop_stack().unwrap(), StackNode::Lit(1_000_000_000));
    }

    #[test]
    fn test_j_fails_with_one_frame() {
        let mut engine = fresh();
        engine.push_stack(StackNode::Lit(0)).unwrap();
        engine.push_stack(StackNode::Lit(5)).unwrap();
        let p = pc(&mut engine);
        BuiltinOp::Do.execute(&mut engine, p).unwrap();
        let result = BuiltinOp::J.execute(&mut engine, p);
        assert!(matches!(result, Err(ForthError::MissingControlFrame(_))));
    }

    #[test]
    fn test_then_without_if_is_missing_control_frame() {
        let mut engine = fresh();
        let p = pc(&mut engine);
        let result = BuiltinOp::Then.execute(&mut engine, p);
        assert!(matches!(result, Err(ForthError::MissingControlFrame(_))));
    }
}

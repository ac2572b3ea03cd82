//! Command execution: one dispatch table indexed by id.
//!
//! Commands consume their declared arity from the data stack and push
//! results. Failures set the error slot with the command name so the
//! banner can report it.

use rpl_types::{ErrorKind, Id};
use tracing::trace;

use crate::dir::{Binding, VarKey};
use crate::error::SimpleResult;
use crate::eval::Host;
use crate::expr;
use crate::functions;
use crate::object::{ObjPtr, Value};
use crate::runtime::{LocalFrame, Runtime};
use crate::units;

/// Execute a nullary-payload command.
pub fn execute(rt: &mut Runtime, host: &mut dyn Host, id: Id) -> SimpleResult<()> {
    trace!(?id, depth = rt.depth(), "command");
    // The argument snapshot survives the command so a failing op keeps
    // the stack intact; the collector tracks it like any other region.
    rt.args = rt.stack.clone();
    let result = dispatch(rt, host, id);
    if let Err(kind) = result {
        rt.error.set(kind, Some(id));
        rt.stack = rt.args.clone();
    }
    result
}

fn dispatch(rt: &mut Runtime, host: &mut dyn Host, id: Id) -> SimpleResult<()> {
    match id {
        // Binary arithmetic.
        Id::Add | Id::Sub | Id::Mul | Id::Div | Id::Mod | Id::Rem | Id::Pow | Id::Hypot
        | Id::Atan2 => {
            rt.need_args(2)?;
            let y = rt.pop_value()?;
            let x = rt.pop_value()?;
            let r = functions::apply_binary(&rt.settings, id, x, y)?;
            rt.push_value(&r.canonical())
        }

        // Unary functions.
        Id::Neg | Id::Inv | Id::Sq | Id::Sqrt | Id::Exp | Id::Ln | Id::Sin | Id::Cos
        | Id::Tan | Id::Abs => {
            let x = rt.pop_value()?;
            let r = functions::apply_unary(&rt.settings, id, x)?;
            rt.push_value(&r.canonical())
        }

        // Based-integer logic.
        Id::And | Id::Or | Id::Xor => {
            rt.need_args(2)?;
            let y = rt.pop_value()?;
            let x = rt.pop_value()?;
            let r = functions::apply_logical(&rt.settings, id, x, Some(y))?;
            rt.push_value(&r)
        }
        Id::BitNot | Id::ShiftLeft | Id::ShiftRight => {
            let x = rt.pop_value()?;
            let r = functions::apply_logical(&rt.settings, id, x, None)?;
            rt.push_value(&r)
        }

        // Stack manipulation.
        Id::Dup => {
            let top = rt.level(1)?;
            rt.push(top)
        }
        Id::Drop => rt.pop().map(|_| ()),
        Id::Swap => {
            rt.need_args(2)?;
            let a = rt.pop()?;
            let b = rt.pop()?;
            rt.push(a)?;
            rt.push(b)
        }
        Id::Over => {
            let second = rt.level(2)?;
            rt.push(second)
        }
        Id::Rot => {
            rt.need_args(3)?;
            let a = rt.pop()?;
            let b = rt.pop()?;
            let c = rt.pop()?;
            rt.push(b)?;
            rt.push(a)?;
            rt.push(c)
        }
        Id::Pick => {
            let n = pop_count(rt)?;
            let picked = rt.level(n)?;
            rt.push(picked)
        }
        Id::Roll => {
            let n = pop_count(rt)?;
            rt.need_args(n)?;
            let depth = rt.depth();
            let moved = rt.stack[depth - n];
            rt.stack.remove(depth - n);
            rt.push(moved)
        }
        Id::RollDown => {
            let n = pop_count(rt)?;
            rt.need_args(n)?;
            let top = rt.pop()?;
            let depth = rt.depth();
            rt.stack.insert(depth + 1 - n, top);
            Ok(())
        }
        Id::Depth => {
            let depth = rt.depth() as i64;
            rt.push_value(&Value::Int(depth))
        }
        Id::ClearStack => {
            rt.clear_stack();
            Ok(())
        }
        Id::DupN => {
            let n = pop_count(rt)?;
            rt.need_args(n)?;
            let depth = rt.depth();
            for i in 0..n {
                let ptr = rt.stack[depth - n + i];
                rt.push(ptr)?;
            }
            Ok(())
        }
        Id::DropN => {
            let n = pop_count(rt)?;
            rt.need_args(n)?;
            let new_depth = rt.depth() - n;
            rt.stack.truncate(new_depth);
            Ok(())
        }

        // Evaluation control.
        Id::Eval => {
            let obj = rt.pop()?;
            rt.run_object(host, obj)
        }
        Id::Halt => {
            rt.debug.halted = true;
            Ok(())
        }
        Id::Undo => rt.undo(),

        // Variables and directories.
        Id::Store => {
            rt.need_args(2)?;
            let name = pop_name(rt)?;
            let value = rt.pop()?;
            rt.dirs.store(VarKey::Name(name), value);
            Ok(())
        }
        Id::Recall => {
            let name = pop_name(rt)?;
            match rt.dirs.recall(&VarKey::Name(name)) {
                Some(Binding::Value(ptr)) => rt.push(ptr),
                _ => Err(ErrorKind::UndefinedName),
            }
        }
        Id::Purge => {
            let name = pop_name(rt)?;
            rt.dirs.purge(&VarKey::Name(name))
        }
        Id::UpDir => {
            rt.dirs.updir();
            Ok(())
        }
        Id::Home => {
            rt.dirs.home();
            Ok(())
        }
        Id::CrDir => {
            let name = pop_name(rt)?;
            let dir = rt.dirs.create_dir(&name);
            rt.dirs.enter(dir)
        }

        // Container access.
        Id::Get => {
            rt.need_args(2)?;
            let index = rt.pop_value()?;
            let container = rt.pop_value()?;
            let item = container_get(&container, &index)?;
            rt.push_value(&item)
        }
        Id::Put => {
            rt.need_args(3)?;
            let item = rt.pop_value()?;
            let index = rt.pop_value()?;
            let container = rt.pop_value()?;
            let updated = container_put(container, &index, item)?;
            rt.push_value(&updated)
        }
        Id::Size => {
            let v = rt.pop_value()?;
            let size = match &v {
                Value::List(items) | Value::Array(items) => items.len() as i64,
                Value::Text(s) => s.chars().count() as i64,
                Value::Grob { width, .. } => *width as i64,
                _ => 1,
            };
            rt.push_value(&Value::Int(size))
        }

        // Units.
        Id::Convert => {
            rt.need_args(2)?;
            let target = rt.pop_value()?;
            let source = rt.pop_value()?;
            let converted = convert_command(rt, source, target)?;
            rt.push_value(&converted)
        }
        Id::UBase => {
            let v = rt.pop_value()?;
            let based = ubase(rt, v)?;
            rt.push_value(&based)
        }
        Id::UVal => {
            let v = rt.pop_value()?;
            let value = match v {
                Value::Unit { value, .. } => *value,
                other => other,
            };
            rt.push_value(&value)
        }

        // Symbolic rewrites.
        Id::Differentiate => {
            rt.need_args(2)?;
            let var = pop_name(rt)?;
            let e = rt.pop_value()?;
            let tokens = expr::tokens_of(e);
            let d = expr::differentiate(&rt.settings, &tokens, &var)?;
            rt.push_value(&expr::quote(d))
        }
        Id::Integrate => {
            rt.need_args(2)?;
            let var = pop_name(rt)?;
            let e = rt.pop_value()?;
            let tokens = expr::tokens_of(e);
            let p = expr::integrate(&rt.settings, &tokens, &var)?;
            rt.push_value(&expr::quote(p))
        }

        // Date shortcuts over the unit machinery.
        Id::DaysBetween => {
            rt.need_args(2)?;
            let later = rt.pop_value()?;
            let earlier = rt.pop_value()?;
            let diff = functions::apply_binary(&rt.settings, Id::Sub, later, earlier)?;
            rt.push_value(&diff)
        }
        Id::DateAdd => {
            rt.need_args(2)?;
            let days = rt.pop_value()?;
            let date = rt.pop_value()?;
            let shifted = functions::apply_binary(&rt.settings, Id::Add, date, days)?;
            rt.push_value(&shifted)
        }
        Id::DateSub => {
            rt.need_args(2)?;
            let days = rt.pop_value()?;
            let date = rt.pop_value()?;
            let shifted = functions::apply_binary(&rt.settings, Id::Sub, date, days)?;
            rt.push_value(&shifted)
        }

        // Assignment: store and keep the value visible.
        Id::Equal => {
            rt.need_args(2)?;
            let value = rt.pop()?;
            let name = pop_name(rt)?;
            rt.dirs.store(VarKey::Name(name), value);
            rt.push(value)
        }

        _ => Err(ErrorKind::Type),
    }
}

/// Execute a function-application token: arguments are already on the
/// stack.
pub fn execute_call(rt: &mut Runtime, host: &mut dyn Host, ptr: ObjPtr) -> SimpleResult<()> {
    let Value::Call { name, argc } = rt.decode(ptr)? else {
        return Err(ErrorKind::Internal);
    };
    rt.need_args(argc as usize)?;

    // Built-in unary functions apply directly.
    if argc == 1 {
        if let Some(id) = builtin_function(&name) {
            let x = rt.pop_value()?;
            let r = match id {
                Id::BitNot | Id::ShiftLeft | Id::ShiftRight => {
                    functions::apply_logical(&rt.settings, id, x, None)?
                }
                _ => functions::apply_unary(&rt.settings, id, x)?,
            };
            return rt.push_value(&r.canonical());
        }
    }

    match rt.dirs.recall(&VarKey::Name(name.clone())) {
        // A user program consumes its arguments from the stack; bind
        // them as a local frame as well so nested lookups see them.
        Some(Binding::Value(prog)) => {
            let mut bindings = Vec::new();
            for i in 0..argc {
                let arg = rt.level((argc - i) as usize)?;
                bindings.push((format!("x{}", i + 1), arg));
            }
            rt.locals.push(LocalFrame { bindings });
            let result = rt.run_object(host, prog);
            rt.locals.pop();
            result
        }
        // Unbound: rebuild the symbolic application.
        _ => {
            let mut args = Vec::new();
            for _ in 0..argc {
                args.push(rt.pop_value()?);
            }
            args.reverse();
            let mut tokens = Vec::new();
            for arg in args {
                tokens.extend(expr::tokens_of(arg));
            }
            tokens.push(Value::Call { name, argc });
            rt.push_value(&Value::Expr(tokens))
        }
    }
}

/// Map a function-call name to a built-in unary command.
pub fn builtin_function(name: &str) -> Option<Id> {
    let id = match name {
        "neg" => Id::Neg,
        "inv" => Id::Inv,
        "sq" => Id::Sq,
        "sqrt" | "√" => Id::Sqrt,
        "exp" => Id::Exp,
        "ln" => Id::Ln,
        "sin" => Id::Sin,
        "cos" => Id::Cos,
        "tan" => Id::Tan,
        "abs" => Id::Abs,
        "not" => Id::BitNot,
        "sl" => Id::ShiftLeft,
        "sr" => Id::ShiftRight,
        _ => return None,
    };
    Some(id)
}

fn pop_count(rt: &mut Runtime) -> SimpleResult<usize> {
    let n = rt.pop_value()?;
    let n = n.as_i64().ok_or(ErrorKind::Type)?;
    if n <= 0 {
        return Err(ErrorKind::Value);
    }
    Ok(n as usize)
}

fn pop_name(rt: &mut Runtime) -> SimpleResult<String> {
    match rt.pop_value()? {
        Value::Sym(name) => Ok(name),
        Value::Text(name) => Ok(name),
        Value::Expr(tokens) => match tokens.as_slice() {
            [Value::Sym(name)] => Ok(name.clone()),
            _ => Err(ErrorKind::Type),
        },
        _ => Err(ErrorKind::Type),
    }
}

fn container_get(container: &Value, index: &Value) -> SimpleResult<Value> {
    let items = match container {
        Value::List(items) | Value::Array(items) => items,
        _ => return Err(ErrorKind::Type),
    };
    let i = index.as_i64().ok_or(ErrorKind::Type)?;
    if i < 1 || i as usize > items.len() {
        return Err(ErrorKind::IndexOutOfBounds);
    }
    Ok(items[(i - 1) as usize].clone())
}

fn container_put(container: Value, index: &Value, item: Value) -> SimpleResult<Value> {
    let i = index.as_i64().ok_or(ErrorKind::Type)?;
    match container {
        Value::List(mut items) => {
            if i < 1 || i as usize > items.len() {
                return Err(ErrorKind::IndexOutOfBounds);
            }
            items[(i - 1) as usize] = item;
            Ok(Value::List(items))
        }
        Value::Array(mut items) => {
            if i < 1 || i as usize > items.len() {
                return Err(ErrorKind::IndexOutOfBounds);
            }
            items[(i - 1) as usize] = item;
            Ok(Value::Array(items))
        }
        _ => Err(ErrorKind::Type),
    }
}

fn convert_command(rt: &Runtime, source: Value, target: Value) -> SimpleResult<Value> {
    let target_tokens = match &target {
        Value::Unit { unit, .. } => expr::tokens_of((**unit).clone()),
        Value::Expr(tokens) => tokens.clone(),
        Value::Sym(name) => vec![Value::Sym(name.clone())],
        _ => return Err(ErrorKind::Type),
    };
    let to = units::factors_of(&target_tokens)?;
    let (value, from) = match &source {
        Value::Unit { value, unit } => {
            let tokens = expr::tokens_of((**unit).clone());
            ((**value).clone(), units::factors_of(&tokens)?)
        }
        plain if plain.is_real() => (plain.clone(), units::Factors::new()),
        _ => return Err(ErrorKind::Type),
    };
    let converted = units::convert_value(&rt.settings, value, &from, &to)?;
    Ok(Value::Unit {
        value: Box::new(converted.canonical()),
        unit: Box::new(units::expr_of(&to)),
    })
}

fn ubase(rt: &Runtime, v: Value) -> SimpleResult<Value> {
    let Value::Unit { value, unit } = v else {
        return Ok(v);
    };
    let tokens = expr::tokens_of(*unit);
    let from = units::factors_of(&tokens)?;
    let (_, dims) = units::resolve(&from)?;
    // Rebuild the SI base expression from the dimension vector.
    const BASES: [&str; units::DIMS] = ["m", "kg", "s", "A", "K", "mol", "cd", "rad", "date"];
    let mut to = units::Factors::new();
    for (i, base) in BASES.iter().enumerate() {
        if dims[i] != 0 {
            to.insert((*base).to_owned(), dims[i]);
        }
    }
    let converted = units::convert_value(&rt.settings, *value, &from, &to)?;
    if to.is_empty() {
        return Ok(converted.canonical());
    }
    Ok(Value::Unit {
        value: Box::new(converted.canonical()),
        unit: Box::new(units::expr_of(&to)),
    })
}

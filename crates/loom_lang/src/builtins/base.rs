//! Arithmetic, logic, binding forms, and text primitives.

use crate::ast::Expr;
use crate::env::FrameId;
use crate::error::{EvalError, EvalResult};
use crate::eval::Interpreter;
use crate::value::{Lambda, Value, empty};
use loom_core::quote;
use std::sync::Arc;

fn int_fold(
    interp: &Interpreter,
    args: Vec<Value>,
    op: impl Fn(i64, i64) -> EvalResult<i64>,
) -> EvalResult<Value> {
    let mut ints = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Value::Int(i) => ints.push(*i),
            other => {
                return Err(EvalError::new(format!(
                    "bad arithmetic argument: {}",
                    other.render(&interp.session)
                )));
            }
        }
    }
    let mut iter = ints.into_iter();
    let first = iter.next().unwrap_or_default();
    iter.try_fold(first, op).map(Value::Int)
}

pub(super) fn add(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    if !matches!(args.first(), Some(Value::Str(_))) {
        return int_fold(interp, args, |a, b| Ok(a.wrapping_add(b)));
    }
    let mut out = String::new();
    for arg in &args {
        match arg {
            Value::Str(s) => out.push_str(s),
            other => {
                return Err(EvalError::new(format!(
                    "bad string concatenation argument: {}",
                    other.render(&interp.session)
                )));
            }
        }
    }
    Ok(Value::Str(out))
}

pub(super) fn sub(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    int_fold(interp, args, |a, b| Ok(a.wrapping_sub(b)))
}

pub(super) fn mul(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    int_fold(interp, args, |a, b| Ok(a.wrapping_mul(b)))
}

pub(super) fn div(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    int_fold(interp, args, |a, b| {
        if b == 0 {
            return Err(EvalError::new("division by zero"));
        }
        Ok(a.wrapping_div(b))
    })
}

pub(super) fn rem(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    int_fold(interp, args, |a, b| {
        if b == 0 {
            return Err(EvalError::new("division by zero"));
        }
        Ok(a.wrapping_rem(b))
    })
}

pub(super) fn equal(_: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
}

fn compare(
    interp: &Interpreter,
    args: &[Value],
    cmp: fn(&i64, &i64) -> bool,
) -> EvalResult<Value> {
    let mut ints = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::Int(i) => ints.push(*i),
            other => {
                return Err(EvalError::new(format!(
                    "bad comparison argument: {}",
                    other.render(&interp.session)
                )));
            }
        }
    }
    Ok(Value::Bool(ints.windows(2).all(|w| cmp(&w[0], &w[1]))))
}

pub(super) fn less(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    compare(interp, &args, i64::lt)
}

pub(super) fn greater(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    compare(interp, &args, i64::gt)
}

pub(super) fn not(_: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    Ok(Value::Bool(!args.first().is_some_and(Value::truthy)))
}

pub(super) fn to_bool(_: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
}

pub(super) fn and(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    for op in ops {
        if !interp.eval(op, env)?.truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub(super) fn or(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    for op in ops {
        if interp.eval(op, env)?.truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

pub(super) fn if_(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    if ops.len() > 3 {
        return Err(EvalError::new("if takes a condition and at most two branches"));
    }
    if interp.eval(&ops[0], env)?.truthy() {
        interp.eval(&ops[1], env)
    } else {
        match ops.get(2) {
            Some(branch) => interp.eval(branch, env),
            None => Ok(empty()),
        }
    }
}

fn param_names(items: &[Expr]) -> EvalResult<Vec<String>> {
    items
        .iter()
        .map(|item| {
            item.as_ident()
                .map(str::to_string)
                .ok_or_else(|| EvalError::new("lambda argument names must be idents"))
        })
        .collect()
}

fn make_lambda(interp: &mut Interpreter, env: FrameId, params: Vec<String>, body: &[Expr]) -> Value {
    let frame = interp.frames.capture(env);
    Value::Lambda(Arc::new(Lambda {
        params,
        body: body.to_vec(),
        frame,
    }))
}

pub(super) fn define(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let (name, value) = match &ops[0] {
        Expr::Ident(name) => {
            if ops.len() != 2 {
                return Err(EvalError::new(format!(
                    "define binds exactly one value: {name}"
                )));
            }
            (name.clone(), interp.eval(&ops[1], env)?)
        }
        Expr::Sexp { items, .. } if !items.is_empty() => {
            let mut names = param_names(items)?;
            let name = names.remove(0);
            (name, make_lambda(interp, env, names, &ops[1..]))
        }
        other => {
            return Err(EvalError::new(format!(
                "define must name a variable or function: {other}"
            )));
        }
    };

    if !interp.frames.define(env, &name, value) {
        return Err(EvalError::new(format!("attempt to redefine: {}", quote(&name))));
    }
    Ok(empty())
}

pub(super) fn set(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let Some(name) = ops[0].as_ident() else {
        return Err(EvalError::new("set applies to variables"));
    };
    let value = interp.eval(&ops[1], env)?;
    if !interp.frames.assign(env, name, value) {
        return Err(EvalError::new(format!("undefined variable: {name}")));
    }
    Ok(empty())
}

pub(super) fn let_(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let Expr::Sexp { items: binds, .. } = &ops[0] else {
        return Err(EvalError::new("let binds must be defined in an S-expression"));
    };

    let frame = interp.frames.child(env);
    for bind in binds {
        let pair = match bind {
            Expr::Sexp { items, .. } if items.len() == 2 => items,
            other => {
                return Err(EvalError::new(format!(
                    "binds must be exactly 2 arguments: {other}"
                )));
            }
        };
        let Some(name) = pair[0].as_ident() else {
            return Err(EvalError::new(format!(
                "bind name must be an ident: {}",
                pair[0]
            )));
        };
        let value = interp.eval(&pair[1], frame)?;
        interp.frames.bind(frame, name, value);
    }
    interp.eval_body(&ops[1..], frame)
}

pub(super) fn lambda(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let Expr::Sexp { items, .. } = &ops[0] else {
        return Err(EvalError::new("lambda functions must define an argument list"));
    };
    let params = param_names(items)?;
    Ok(make_lambda(interp, env, params, &ops[1..]))
}

pub(super) fn progn(_: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    Ok(args.pop().unwrap_or_else(empty))
}

pub(super) fn module(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let name = match interp.eval(&ops[0], env)? {
        Value::Str(name) => name,
        other => {
            return Err(EvalError::new(format!(
                "module name must be a string: {}",
                other.render(&interp.session)
            )));
        }
    };
    interp.eval_module(&name, &ops[1..], env)
}

pub(super) fn import(_: &mut Interpreter, _: FrameId, _: &[Expr]) -> EvalResult<Value> {
    Err(EvalError::new("import must be begin the module"))
}

pub(super) fn panic(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    Err(EvalError::new(format!(
        "panic: runtime error: {}",
        args[0].text(&interp.session)
    )))
}

pub(super) fn log(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let message = args[1..]
        .iter()
        .map(|a| a.text(&interp.session))
        .collect::<Vec<_>>()
        .join(" ");
    match &args[0] {
        Value::Str(level) => match level.as_str() {
            "print" => tracing::info!(target: "loom::print", "{message}"),
            "debug" => tracing::debug!(target: "loom::spec", "{message}"),
            "info" => tracing::info!(target: "loom::spec", "{message}"),
            "warn" => tracing::warn!(target: "loom::spec", "{message}"),
            "error" => tracing::error!(target: "loom::spec", "{message}"),
            other => {
                return Err(EvalError::new(format!(
                    "log level must be one of print, debug, info, warn or error: {}",
                    quote(other)
                )));
            }
        },
        other => {
            return Err(EvalError::new(format!(
                "log level must be a string: {}",
                other.render(&interp.session)
            )));
        }
    }
    Ok(empty())
}

pub(super) fn sprintf(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let Value::Str(format) = &args[0] else {
        return Err(EvalError::new(format!(
            "sprintf format must be a string: {}",
            args[0].render(&interp.session)
        )));
    };

    let mut out = String::with_capacity(format.len());
    let mut operands = args[1..].iter();
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb @ ('s' | 'd' | 'v')) => match operands.next() {
                Some(Value::Int(i)) if verb == 'd' => out.push_str(&i.to_string()),
                Some(value) => out.push_str(&value.text(&interp.session)),
                None => out.push_str(&format!("%!{verb}(MISSING)")),
            },
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Ok(Value::Str(out))
}

//! List and hash-map primitives.

use crate::ast::Expr;
use crate::env::FrameId;
use crate::error::{EvalError, EvalResult};
use crate::eval::Interpreter;
use crate::value::Value;

fn type_error(interp: &Interpreter, message: &str, value: &Value) -> EvalError {
    EvalError::new(format!("{message}: {}", value.render(&interp.session)))
}

pub(super) fn list(_: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    Ok(Value::List(args))
}

pub(super) fn len(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    match &args[0] {
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        other => Err(type_error(interp, "len applies to lists", other)),
    }
}

pub(super) fn car(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    match &args[0] {
        Value::List(items) if !items.is_empty() => Ok(items[0].clone()),
        other => Err(type_error(interp, "car applies to populated lists", other)),
    }
}

pub(super) fn cdr(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    match &args[0] {
        Value::List(items) if !items.is_empty() => Ok(Value::List(items[1..].to_vec())),
        other => Err(type_error(interp, "cdr applies to populated lists", other)),
    }
}

pub(super) fn cons(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let tail = args.swap_remove(1);
    let head = args.swap_remove(0);
    match tail {
        Value::List(mut items) => {
            items.insert(0, head);
            Ok(Value::List(items))
        }
        other => Err(type_error(interp, "cons applies to lists", &other)),
    }
}

pub(super) fn append(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let rest = args.split_off(1);
    match args.remove(0) {
        Value::List(mut items) => {
            items.extend(rest);
            Ok(Value::List(items))
        }
        other => Err(type_error(interp, "append applies to lists", &other)),
    }
}

pub(super) fn nth(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let Value::Int(index) = args[0] else {
        return Err(type_error(interp, "nth list index must be an int", &args[0]));
    };
    let Value::List(items) = &args[1] else {
        return Err(type_error(interp, "nth applies to lists", &args[1]));
    };
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| EvalError::new(format!("array index out of bounds: {index}")))
}

pub(super) fn map(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let lists = args.split_off(1);
    let callee = args.remove(0);

    let mut columns = Vec::with_capacity(lists.len());
    for value in lists {
        match value {
            Value::List(items) => columns.push(items),
            other => return Err(type_error(interp, "map applies to list", &other)),
        }
    }
    let width = columns[0].len();
    if columns.iter().any(|c| c.len() != width) {
        return Err(EvalError::new("unbalanced lists"));
    }

    let mut mapped = Vec::with_capacity(width);
    for i in 0..width {
        let row = columns.iter().map(|c| c[i].clone()).collect();
        mapped.push(interp.apply(&callee, row)?);
    }
    Ok(Value::List(mapped))
}

pub(super) fn reduce(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let Value::List(items) = &args[1] else {
        return Err(type_error(interp, "reduce applies to lists", &args[1]));
    };
    if items.len() < 2 {
        return Err(type_error(interp, "not enough elements to reduce", &args[1]));
    }

    let mut acc = items[0].clone();
    for item in &items[1..] {
        acc = interp.apply(&args[0], vec![acc, item.clone()])?;
    }
    Ok(acc)
}

pub(super) fn apply(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let list = args.swap_remove(1);
    let callee = args.swap_remove(0);
    match list {
        Value::List(items) => interp.apply(&callee, items),
        other => Err(type_error(interp, "apply requires a list", &other)),
    }
}

pub(super) fn range(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let mut ints = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Value::Int(i) => ints.push(*i),
            other => return Err(type_error(interp, "range arguments must be integers", other)),
        }
    }

    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => {
            return Err(EvalError::new(format!(
                "range expects 1, 2 or 3 arguments, found: {}",
                ints.len()
            )));
        }
    };
    if step <= 0 {
        return Err(EvalError::new("step must be greater than zero"));
    }

    let mut out = Vec::new();
    let mut i = start;
    while i < stop {
        out.push(Value::Int(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::List(out))
}

pub(super) fn make_list(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let count = match interp.eval(&ops[0], env)? {
        Value::Int(n) if n >= 0 => n,
        _ => {
            return Err(EvalError::new(format!(
                "makeList must begin with a positive integer, found: {}",
                ops[0]
            )));
        }
    };

    let mut out = Vec::new();
    for _ in 0..count {
        out.push(interp.eval(&ops[1], env)?);
    }
    Ok(Value::List(out))
}

fn insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

pub(super) fn hmap(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let mut entries = Vec::with_capacity(ops.len());
    for op in ops {
        let pair = match op {
            Expr::Sexp { items, .. } if items.len() == 2 => items,
            other => {
                return Err(EvalError::new(format!(
                    "binds must be exactly 2 arguments: {other}"
                )));
            }
        };
        let key = interp.eval(&pair[0], env)?;
        let value = interp.eval(&pair[1], env)?;
        insert(&mut entries, key, value);
    }
    Ok(Value::Hmap(entries))
}

fn as_hmap<'a>(interp: &Interpreter, value: &'a Value) -> EvalResult<&'a [(Value, Value)]> {
    match value {
        Value::Hmap(entries) => Ok(entries),
        other => Err(EvalError::new(format!(
            "{} must be a hmap",
            other.render(&interp.session)
        ))),
    }
}

pub(super) fn hmap_get(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let entries = as_hmap(interp, &args[0])?;
    entries
        .iter()
        .find(|(k, _)| *k == args[1])
        .map(|(_, v)| v.clone())
        .ok_or_else(|| type_error(interp, "undefined key", &args[1]))
}

pub(super) fn hmap_set(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let mut entries = as_hmap(interp, &args[0])?.to_vec();
    let value = args.swap_remove(2);
    let key = args.swap_remove(1);
    insert(&mut entries, key, value);
    Ok(Value::Hmap(entries))
}

pub(super) fn hmap_contains(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let entries = as_hmap(interp, &args[0])?;
    Ok(Value::Bool(entries.iter().any(|(k, _)| *k == args[1])))
}

pub(super) fn hmap_keys(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let entries = as_hmap(interp, &args[0])?;
    Ok(Value::List(entries.iter().map(|(k, _)| k.clone()).collect()))
}

pub(super) fn hmap_values(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let entries = as_hmap(interp, &args[0])?;
    Ok(Value::List(entries.iter().map(|(_, v)| v.clone()).collect()))
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval_source, run};

    #[test]
    fn test_list_basics() {
        assert_eq!(run("(list 1 2)").unwrap(), "(list 1 2)");
        assert_eq!(run("(list)").unwrap(), "(list)");
        assert_eq!(run("(len (list 1 2 3))").unwrap(), "3");
        assert_eq!(run("(car (list 1 2))").unwrap(), "1");
        assert_eq!(run("(cdr (list 1 2 3))").unwrap(), "(list 2 3)");
        assert_eq!(run("(cons 0 (list 1 2))").unwrap(), "(list 0 1 2)");
        assert_eq!(run("(append (list 1) 2 3)").unwrap(), "(list 1 2 3)");
        assert_eq!(run("(nth 1 (list \"a\" \"b\"))").unwrap(), "\"b\"");
    }

    #[test]
    fn test_list_errors() {
        assert_eq!(
            run("(car (list))").unwrap_err(),
            "1: car applies to populated lists: (list)"
        );
        assert_eq!(
            run("(nth \"a\" (list 1))").unwrap_err(),
            "1: nth list index must be an int: \"a\""
        );
        assert_eq!(
            run("(nth 3 (list 1))").unwrap_err(),
            "1: array index out of bounds: 3"
        );
        assert_eq!(
            run("(nth -1 (list 1))").unwrap_err(),
            "1: array index out of bounds: -1"
        );
    }

    #[test]
    fn test_map() {
        assert_eq!(
            run("(map (lambda (x) (* x x)) (list 1 2 3))").unwrap(),
            "(list 1 4 9)"
        );
        assert_eq!(run("(map + (list 1 2) (list 10 20))").unwrap(), "(list 11 22)");
        assert_eq!(
            run("(map + (list 1 2) (list 1))").unwrap_err(),
            "1: unbalanced lists"
        );
        assert_eq!(run("(map + 1)").unwrap_err(), "1: map applies to list: 1");
        assert!(run("(map if (list 1))").is_err());
    }

    #[test]
    fn test_reduce_and_apply() {
        assert_eq!(run("(reduce + (list 1 2 3 4))").unwrap(), "10");
        assert_eq!(
            run("(reduce + (list 1))").unwrap_err(),
            "1: not enough elements to reduce: (list 1)"
        );
        assert_eq!(run("(apply + (list 1 2 3))").unwrap(), "6");
        assert_eq!(
            run("(apply + 1)").unwrap_err(),
            "1: apply requires a list: 1"
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(run("(range 3)").unwrap(), "(list 0 1 2)");
        assert_eq!(run("(range 2 5)").unwrap(), "(list 2 3 4)");
        assert_eq!(run("(range 0 10 4)").unwrap(), "(list 0 4 8)");
        assert_eq!(run("(range 5 2)").unwrap(), "(list)");
        assert_eq!(
            run("(range 0 10 0)").unwrap_err(),
            "1: step must be greater than zero"
        );
        assert_eq!(
            run("(range \"a\")").unwrap_err(),
            "1: range arguments must be integers: \"a\""
        );
    }

    #[test]
    fn test_make_list_reevaluates() {
        let (interp, values) = eval_source("(makeList 2 (docker \"a\"))").unwrap();
        assert_eq!(
            values[0].render(&interp.session),
            "(list (docker \"a\") (docker \"a\"))"
        );
        assert_eq!(interp.session.containers().len(), 2);
        assert_eq!(run("(makeList 0 1)").unwrap(), "(list)");
        assert_eq!(
            run("(makeList -1 1)").unwrap_err(),
            "1: makeList must begin with a positive integer, found: -1"
        );
    }

    #[test]
    fn test_hmap() {
        assert_eq!(
            run("(hmap (\"b\" 2) (\"a\" 1))").unwrap(),
            "(hmap (\"a\" 1) (\"b\" 2))"
        );
        assert_eq!(run("(hmapGet (hmap (\"a\" 1)) \"a\")").unwrap(), "1");
        assert_eq!(
            run("(hmapGet (hmap (\"a\" 1)) \"b\")").unwrap_err(),
            "1: undefined key: \"b\""
        );
        assert_eq!(run("(hmapContains (hmap (1 2)) 1)").unwrap(), "true");
        assert_eq!(
            run("(hmapKeys (hmap (\"x\" 1) (\"y\" 2)))").unwrap(),
            "(list \"x\" \"y\")"
        );
        assert_eq!(
            run("(hmapValues (hmap (\"x\" 1) (\"y\" 2)))").unwrap(),
            "(list 1 2)"
        );
        assert_eq!(run("(hmapGet 1 1)").unwrap_err(), "1: 1 must be a hmap");
    }

    #[test]
    fn test_hmap_set_copies() {
        let src = "(define m (hmap (\"a\" 1)))\n\
                   (define n (hmapSet m \"a\" 2))\n\
                   (list (hmapGet m \"a\") (hmapGet n \"a\"))";
        assert!(run(src).unwrap().ends_with("(list 1 2)"));
    }
}

//! Shared helpers for unit tests.

use crate::eval::Interpreter;
use crate::parser::parse;

/// Evaluate source and render each top-level value, one per line
pub(crate) fn run(src: &str) -> Result<String, String> {
    let (interp, values) = eval_source(src)?;
    Ok(values
        .iter()
        .map(|v| v.render(&interp.session))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Evaluate source, keeping the interpreter for inspection
pub(crate) fn eval_source(
    src: &str,
) -> Result<(Interpreter, Vec<crate::value::Value>), String> {
    let forms = parse(src, None).map_err(|e| e.to_string())?;
    let mut interp = Interpreter::new();
    let root = interp.frames.root();
    let mut values = Vec::new();
    for form in &forms {
        values.push(interp.eval(form, root).map_err(|e| e.to_string())?);
    }
    Ok((interp, values))
}

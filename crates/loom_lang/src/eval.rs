//! Tree-walking evaluator.
//!
//! Evaluation is strict except for the primitives flagged lazy in the
//! builtin table, which receive their operands unevaluated. Errors bubble
//! out unchanged; each S-expression on the way stamps its position if the
//! error does not have one yet.

use crate::ast::Expr;
use crate::builtins::{self, Dispatch};
use crate::env::{FrameId, Frames};
use crate::error::{EvalError, EvalResult};
use crate::session::Session;
use crate::value::{Lambda, Value, empty};
use std::sync::Arc;

/// Deepest chain of nested form evaluations, lambda calls included
pub const MAX_DEPTH: usize = 128;

/// Interpreter state for one pass
#[derive(Debug, Default)]
pub struct Interpreter {
    /// Shared accumulators
    pub session: Session,
    /// Binding frames
    pub frames: Frames,
    depth: usize,
}

impl Interpreter {
    /// Create an interpreter with an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one form in `env`.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation error, positioned at the nearest
    /// enclosing form that has a source position.
    pub fn eval(&mut self, expr: &Expr, env: FrameId) -> EvalResult<Value> {
        match expr {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Ident(name) => self.eval_ident(name, env),
            Expr::Sexp { items, pos } => self
                .nested(|interp| interp.eval_sexp(items, env))
                .map_err(|e| e.at(pos)),
            Expr::Module { name, body, pos } => self
                .nested(|interp| interp.eval_module(name, body, env))
                .map_err(|e| e.at(pos)),
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<Value>) -> EvalResult<Value> {
        if self.depth == MAX_DEPTH {
            return Err(EvalError::new("evaluation nested too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Evaluate forms in order, returning the last value (or `(list)`).
    ///
    /// # Errors
    ///
    /// Stops at the first failing form.
    pub fn eval_body(&mut self, body: &[Expr], env: FrameId) -> EvalResult<Value> {
        let mut last = empty();
        for expr in body {
            last = self.eval(expr, env)?;
        }
        Ok(last)
    }

    fn eval_ident(&self, name: &str, env: FrameId) -> EvalResult<Value> {
        if let Some(builtin) = builtins::lookup(name) {
            return Ok(Value::Builtin(builtin.name));
        }
        self.frames
            .lookup(env, name)
            .cloned()
            .ok_or_else(|| EvalError::new(format!("unassigned variable: {name}")))
    }

    fn eval_sexp(&mut self, items: &[Expr], env: FrameId) -> EvalResult<Value> {
        let Some((head, operands)) = items.split_first() else {
            return Err(EvalError::new(
                "s-expressions must start with a function call: ()",
            ));
        };

        if let Expr::Ident(name) = head {
            if builtins::lookup(name).is_none() && self.frames.lookup(env, name).is_none() {
                return Err(EvalError::new(format!("unknown function: {name}")));
            }
        }

        match self.eval(head, env)? {
            Value::Builtin(name) => self.call_builtin(name, operands, env),
            Value::Lambda(lambda) => {
                let args = self.eval_all(operands, env)?;
                self.call_lambda(&lambda, args)
            }
            other => Err(EvalError::new(format!(
                "s-expressions must start with a function call: {}",
                other.render(&self.session)
            ))),
        }
    }

    /// Evaluate each operand in order
    ///
    /// # Errors
    ///
    /// Stops at the first failing operand.
    pub fn eval_all(&mut self, exprs: &[Expr], env: FrameId) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, env)).collect()
    }

    fn call_builtin(&mut self, name: &str, operands: &[Expr], env: FrameId) -> EvalResult<Value> {
        let builtin = builtins::lookup(name)
            .ok_or_else(|| EvalError::new(format!("unknown function: {name}")))?;
        if operands.len() < builtin.min_args {
            return Err(EvalError::new(format!("not enough arguments: {name}")));
        }
        match builtin.dispatch {
            Dispatch::Lazy(f) => f(self, env, operands),
            Dispatch::Strict(f) => {
                let args = self.eval_all(operands, env)?;
                f(self, args)
            }
        }
    }

    /// Apply a function value to already-evaluated arguments.
    ///
    /// Used by `map`, `reduce` and `apply`.
    ///
    /// # Errors
    ///
    /// Fails for non-functions, for lazy primitives (whose operands must
    /// be unevaluated source), and for any error the call raises.
    pub fn apply(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Lambda(lambda) => self.call_lambda(lambda, args),
            Value::Builtin(name) => {
                let builtin = builtins::lookup(name)
                    .ok_or_else(|| EvalError::new(format!("unknown function: {name}")))?;
                if args.len() < builtin.min_args {
                    return Err(EvalError::new(format!("not enough arguments: {name}")));
                }
                match builtin.dispatch {
                    Dispatch::Strict(f) => f(self, args),
                    Dispatch::Lazy(_) => Err(EvalError::new(format!(
                        "{name} cannot be applied to evaluated arguments"
                    ))),
                }
            }
            other => Err(EvalError::new(format!(
                "s-expressions must start with a function call: {}",
                other.render(&self.session)
            ))),
        }
    }

    fn call_lambda(&mut self, lambda: &Arc<Lambda>, args: Vec<Value>) -> EvalResult<Value> {
        if args.len() != lambda.params.len() {
            return Err(EvalError::new("bad number of arguments"));
        }
        let frame = self.frames.child(lambda.frame);
        for (param, arg) in lambda.params.iter().zip(args) {
            self.frames.bind(frame, param.as_str(), arg);
        }
        self.eval_body(&lambda.body, frame)
    }

    /// Evaluate a module body in a private frame and export its
    /// capitalised bindings into `env` as `name.Binding`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing body form.
    pub fn eval_module(&mut self, name: &str, body: &[Expr], env: FrameId) -> EvalResult<Value> {
        let module_env = self.frames.root();
        let values = body
            .iter()
            .map(|expr| self.eval(expr, module_env))
            .collect::<EvalResult<Vec<_>>>()?;

        let exports: Vec<(String, Value)> = self
            .frames
            .binds(module_env)
            .filter(|(key, _)| key.chars().next().is_some_and(char::is_uppercase))
            .map(|(key, value)| (format!("{name}.{key}"), value.clone()))
            .collect();
        for (key, value) in exports {
            self.frames.bind(env, key, value);
        }

        tracing::debug!(module = name, "evaluated module");
        Ok(Value::Module {
            name: name.to_string(),
            body: values,
        })
    }
}

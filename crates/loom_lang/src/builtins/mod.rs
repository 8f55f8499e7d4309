//! The fixed primitive table.
//!
//! Lazy primitives receive unevaluated operands and decide what to
//! evaluate; strict ones receive evaluated arguments. Argument counts
//! below `min_args` are rejected before dispatch.

mod base;
mod infra;
mod list;
mod machine;

use crate::ast::Expr;
use crate::env::FrameId;
use crate::error::EvalResult;
use crate::eval::Interpreter;
use crate::value::Value;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Primitive over evaluated arguments
pub type StrictFn = fn(&mut Interpreter, Vec<Value>) -> EvalResult<Value>;

/// Primitive over unevaluated operands
pub type LazyFn = fn(&mut Interpreter, FrameId, &[Expr]) -> EvalResult<Value>;

/// How a primitive receives its operands
#[derive(Clone, Copy)]
pub enum Dispatch {
    /// Arguments evaluated first, left to right
    Strict(StrictFn),
    /// Operands passed through as source
    Lazy(LazyFn),
}

/// A table entry
pub struct Builtin {
    /// Name as written in source
    pub name: &'static str,
    /// Fewest operands accepted
    pub min_args: usize,
    /// Calling convention
    pub dispatch: Dispatch,
}

const fn strict(name: &'static str, min_args: usize, f: StrictFn) -> Builtin {
    Builtin {
        name,
        min_args,
        dispatch: Dispatch::Strict(f),
    }
}

const fn lazy(name: &'static str, min_args: usize, f: LazyFn) -> Builtin {
    Builtin {
        name,
        min_args,
        dispatch: Dispatch::Lazy(f),
    }
}

static TABLE: Lazy<IndexMap<&'static str, Builtin>> = Lazy::new(|| {
    [
        strict("!", 1, base::not),
        strict("%", 2, base::rem),
        strict("*", 2, base::mul),
        strict("+", 2, base::add),
        strict("-", 2, base::sub),
        strict("/", 2, base::div),
        strict("<", 2, base::less),
        strict("=", 2, base::equal),
        strict(">", 2, base::greater),
        lazy("and", 1, base::and),
        strict("append", 2, list::append),
        strict("apply", 2, list::apply),
        strict("bool", 1, base::to_bool),
        strict("car", 1, list::car),
        strict("cdr", 1, list::cdr),
        strict("connect", 3, infra::connect),
        strict("cons", 2, list::cons),
        strict("cpu", 1, machine::cpu),
        lazy("define", 2, base::define),
        strict("diskSize", 1, machine::disk_size),
        strict("docker", 1, infra::docker),
        strict("githubKey", 1, machine::github_key),
        lazy("hmap", 0, list::hmap),
        strict("hmapContains", 2, list::hmap_contains),
        strict("hmapGet", 2, list::hmap_get),
        strict("hmapKeys", 1, list::hmap_keys),
        strict("hmapSet", 3, list::hmap_set),
        strict("hmapValues", 1, list::hmap_values),
        lazy("if", 2, base::if_),
        lazy("import", 1, base::import),
        lazy("invariant", 1, infra::invariant),
        strict("label", 2, infra::label),
        strict("labelHost", 1, infra::label_host),
        strict("labelName", 1, infra::label_name),
        strict("labelRule", 2, infra::label_rule),
        lazy("lambda", 2, base::lambda),
        strict("len", 1, list::len),
        lazy("let", 1, base::let_),
        strict("list", 0, list::list),
        strict("log", 2, base::log),
        strict("machine", 0, machine::machine),
        strict("machineAttribute", 2, machine::machine_attribute),
        strict("machineRule", 2, infra::machine_rule),
        lazy("makeList", 2, list::make_list),
        strict("map", 2, list::map),
        lazy("module", 2, base::module),
        strict("nth", 2, list::nth),
        lazy("or", 1, base::or),
        strict("panic", 1, base::panic),
        strict("place", 2, infra::place),
        strict("progn", 1, base::progn),
        strict("provider", 1, machine::provider),
        strict("ram", 1, machine::ram),
        strict("range", 1, list::range),
        strict("reduce", 2, list::reduce),
        strict("region", 1, machine::region),
        strict("role", 1, machine::role),
        lazy("set", 2, base::set),
        strict("setEnv", 3, infra::set_env),
        strict("size", 1, machine::size),
        strict("sprintf", 1, base::sprintf),
        strict("sshkey", 1, machine::sshkey),
    ]
    .into_iter()
    .map(|b| (b.name, b))
    .collect()
});

/// Look up a primitive by name
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    TABLE.get(name)
}

/// Every primitive name, in table order
pub fn names() -> impl Iterator<Item = &'static str> {
    TABLE.keys().copied()
}

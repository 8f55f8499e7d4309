//! Evaluated values and their canonical text.
//!
//! Rendering needs the session, because containers, machines and labels
//! are handles into it; use [`Value::render`] rather than `Display`.

use crate::ast::Expr;
use crate::env::FrameId;
use crate::session::{Atom, Session};
use loom_core::{ContainerId, MachineId, MachineKey, Range, format_float, quote};
use std::sync::Arc;

/// A closure: parameters, body, and a frozen copy of its environment
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    /// Parameter names
    pub params: Vec<String>,
    /// Body forms, evaluated in order
    pub body: Vec<Expr>,
    /// Captured frame chain
    pub frame: FrameId,
}

/// One machine attribute, as produced by `provider`, `ram` and friends
#[derive(Debug, Clone, PartialEq)]
pub enum MachineAttr {
    /// `(provider "...")`
    Provider(String),
    /// `(region "...")`
    Region(String),
    /// `(size "...")`
    Size(String),
    /// `(role "...")`
    Role(String),
    /// `(diskSize n)`
    DiskSize(i64),
    /// `(cpu min [max])`
    Cpu(Range),
    /// `(ram min [max])`
    Ram(Range),
    /// `(sshkey ...)` or `(githubKey ...)`
    Key(MachineKey),
}

impl MachineAttr {
    fn render(&self) -> String {
        match self {
            Self::Provider(s) => format!("(provider {})", quote(s)),
            Self::Region(s) => format!("(region {})", quote(s)),
            Self::Size(s) => format!("(size {})", quote(s)),
            Self::Role(s) => format!("(role {})", quote(s)),
            Self::DiskSize(n) => format!("(diskSize {n})"),
            Self::Cpu(r) => r.render("cpu"),
            Self::Ram(r) => r.render("ram"),
            Self::Key(k) => k.to_string(),
        }
    }
}

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String
    Str(String),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Boolean
    Bool(bool),
    /// A primitive, by name
    Builtin(&'static str),
    /// `(list ...)`
    List(Vec<Value>),
    /// `(hmap ...)`, insertion ordered
    Hmap(Vec<(Value, Value)>),
    /// Closure
    Lambda(Arc<Lambda>),
    /// A defined label, by name
    Label(String),
    /// Container handle
    Container(ContainerId),
    /// Machine handle
    Machine(MachineId),
    /// An evaluated module and its body values
    Module {
        /// Module name
        name: String,
        /// Values of the body forms
        body: Vec<Value>,
    },
    /// A machine attribute
    Attr(MachineAttr),
    /// `(labelRule ...)`
    LabelRule {
        /// Exclusive or co-located
        exclusive: bool,
        /// Labels constrained against
        labels: Vec<String>,
    },
    /// `(machineRule ...)`
    MachineRule {
        /// Exclusive or on
        exclusive: bool,
        /// Provider, region and size constraints
        attrs: Vec<MachineAttr>,
    },
}

/// The empty list, returned by side-effecting primitives
#[must_use]
pub fn empty() -> Value {
    Value::List(Vec::new())
}

fn exclusiveness(exclusive: bool) -> &'static str {
    if exclusive { "\"exclusive\"" } else { "\"on\"" }
}

impl Value {
    /// Truthiness: `false`, `0`, `""` and the empty list are false
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    /// Canonical text
    #[must_use]
    pub fn render(&self, session: &Session) -> String {
        let mut out = String::new();
        self.render_into(session, &mut out);
        out
    }

    /// Strings unquoted, everything else canonical
    #[must_use]
    pub fn text(&self, session: &Session) -> String {
        match self {
            Self::Str(s) => s.clone(),
            other => other.render(session),
        }
    }

    fn render_into(&self, session: &Session, out: &mut String) {
        match self {
            Self::Str(s) => out.push_str(&quote(s)),
            Self::Int(i) => out.push_str(&i.to_string()),
            Self::Float(x) => out.push_str(&format_float(*x)),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Builtin(name) => out.push_str(name),
            Self::List(items) => {
                out.push_str("(list");
                for item in items {
                    out.push(' ');
                    item.render_into(session, out);
                }
                out.push(')');
            }
            Self::Hmap(entries) => {
                let mut rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("({} {})", k.render(session), v.render(session)))
                    .collect();
                rendered.sort();
                out.push_str("(hmap");
                for entry in rendered {
                    out.push(' ');
                    out.push_str(&entry);
                }
                out.push(')');
            }
            Self::Lambda(lambda) => {
                out.push_str("(lambda (");
                out.push_str(&lambda.params.join(" "));
                out.push(')');
                for expr in &lambda.body {
                    out.push(' ');
                    out.push_str(&expr.to_string());
                }
                out.push(')');
            }
            Self::Label(name) => {
                out.push_str("(label ");
                out.push_str(&quote(name));
                for atom in session.label(name).unwrap_or_default() {
                    out.push(' ');
                    match *atom {
                        Atom::Container(id) => Self::Container(id).render_into(session, out),
                        Atom::Machine(id) => Self::Machine(id).render_into(session, out),
                    }
                }
                out.push(')');
            }
            Self::Container(id) => match session.container(*id) {
                Some(c) => out.push_str(&c.to_string()),
                None => out.push_str("(docker)"),
            },
            Self::Machine(id) => match session.machine(*id) {
                Some(m) => out.push_str(&m.to_string()),
                None => out.push_str("(machine)"),
            },
            Self::Module { name, body } => {
                out.push_str("(module ");
                out.push_str(&quote(name));
                for value in body {
                    out.push(' ');
                    value.render_into(session, out);
                }
                out.push(')');
            }
            Self::Attr(attr) => out.push_str(&attr.render()),
            Self::LabelRule { exclusive, labels } => {
                out.push_str("(labelRule ");
                out.push_str(exclusiveness(*exclusive));
                for label in labels {
                    out.push(' ');
                    out.push_str(&quote(label));
                }
                out.push(')');
            }
            Self::MachineRule { exclusive, attrs } => {
                out.push_str("(machineRule ");
                out.push_str(exclusiveness(*exclusive));
                for attr in attrs {
                    out.push(' ');
                    out.push_str(&attr.render());
                }
                out.push(')');
            }
        }
    }
}

/// Expand nested lists into one flat sequence
#[must_use]
pub fn flatten(values: Vec<Value>) -> Vec<Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::List(items) => out.extend(flatten(items)),
            other => out.push(other),
        }
    }
    out
}

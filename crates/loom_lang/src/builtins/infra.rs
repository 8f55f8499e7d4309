//! Containers, labels, connections, placement and invariants.

use crate::ast::Expr;
use crate::env::FrameId;
use crate::error::{EvalError, EvalResult};
use crate::eval::Interpreter;
use crate::session::{Atom, Session};
use crate::value::{MachineAttr, Value, empty, flatten};
use loom_core::{
    Connection, Invariant, InvariantKind, PUBLIC_LABEL, PlacementConstraint, PlacementRule,
    check_port_range,
};
use std::collections::BTreeMap;

fn found(interp: &Interpreter, message: &str, value: &Value) -> EvalError {
    EvalError::new(format!("{message}: {}", value.render(&interp.session)))
}

/// Name of the label a value refers to, if any.
///
/// Strings name labels (or the public internet); label values name
/// themselves.
pub(crate) fn resolve_label(session: &Session, value: &Value) -> Option<String> {
    match value {
        Value::Str(name) if name == PUBLIC_LABEL || session.has_label(name) => Some(name.clone()),
        Value::Label(name) => Some(name.clone()),
        _ => None,
    }
}

fn flatten_labels(interp: &Interpreter, values: Vec<Value>) -> EvalResult<Vec<String>> {
    flatten(values)
        .iter()
        .map(|value| {
            resolve_label(&interp.session, value)
                .ok_or_else(|| found(interp, "expected label, found", value))
        })
        .collect()
}

fn flatten_strings(interp: &Interpreter, values: Vec<Value>) -> EvalResult<Vec<String>> {
    flatten(values)
        .into_iter()
        .map(|value| match value {
            Value::Str(s) => Ok(s),
            other => Err(found(interp, "expected string, found", &other)),
        })
        .collect()
}

pub(super) fn docker(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let mut env = BTreeMap::new();
    if args.len() > 1 {
        if let Some(Value::Hmap(entries)) = args.last() {
            for (key, value) in entries {
                match (key, value) {
                    (Value::Str(k), Value::Str(v)) => {
                        env.insert(k.clone(), v.clone());
                    }
                    (Value::Str(_), other) => {
                        return Err(found(interp, "setEnv value must be a string", other));
                    }
                    (other, _) => {
                        return Err(found(interp, "setEnv key must be a string", other));
                    }
                }
            }
            args.pop();
        }
    }

    let mut strings = flatten_strings(interp, args)?.into_iter();
    let Some(image) = strings.next() else {
        return Err(EvalError::new("docker requires an image"));
    };
    let id = interp.session.add_container(image, strings.collect(), env);
    Ok(Value::Container(id))
}

pub(super) fn set_env(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let value = match args.pop() {
        Some(Value::Str(v)) => v,
        Some(other) => return Err(found(interp, "setEnv value must be a string", &other)),
        None => return Ok(empty()),
    };
    let key = match args.pop() {
        Some(Value::Str(k)) => k,
        Some(other) => return Err(found(interp, "setEnv key must be a string", &other)),
        None => return Ok(empty()),
    };

    let mut targets = Vec::new();
    for target in flatten(args) {
        match &target {
            Value::Container(id) => targets.push(*id),
            Value::Str(_) | Value::Label(_) => {
                let name = resolve_label(&interp.session, &target)
                    .ok_or_else(|| found(interp, "cannot setEnv on invalid label", &target))?;
                let atoms = interp.session.label(&name).unwrap_or_default();
                targets.extend(atoms.iter().filter_map(|atom| match atom {
                    Atom::Container(id) => Some(*id),
                    Atom::Machine(_) => None,
                }));
            }
            other => {
                return Err(found(
                    interp,
                    "setEnv target must be either a label or container",
                    other,
                ));
            }
        }
    }

    for id in targets {
        if let Some(container) = interp.session.container_mut(id) {
            container.env.insert(key.clone(), value.clone());
        }
    }
    Ok(empty())
}

pub(super) fn label(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let members = args.split_off(1);
    let name = match args.remove(0) {
        Value::Str(name) => name,
        other => return Err(found(interp, "label must be a string, found", &other)),
    };
    if name != name.to_lowercase() {
        tracing::error!(label = %name, "labels must be lowercase");
    }
    if name == PUBLIC_LABEL {
        return Err(EvalError::new(
            "the \"public\" label is reserved for the public internet",
        ));
    }
    if interp.session.has_label(&name) {
        return Err(EvalError::new(format!("attempt to redefine label: {name}")));
    }

    let mut atoms: Vec<Atom> = Vec::new();
    let mut push = |atom: Atom| {
        if !atoms.contains(&atom) {
            atoms.push(atom);
        }
    };
    for member in flatten(members) {
        match &member {
            Value::Container(id) => push(Atom::Container(*id)),
            Value::Machine(id) => push(Atom::Machine(*id)),
            Value::Str(_) | Value::Label(_) => {
                let Some(other) = resolve_label(&interp.session, &member) else {
                    return Err(found(interp, "undefined label", &member));
                };
                for atom in interp.session.label(&other).unwrap_or_default() {
                    push(*atom);
                }
            }
            other => {
                return Err(found(
                    interp,
                    "label must apply to atoms or other labels, found",
                    other,
                ));
            }
        }
    }

    interp.session.define_label(&name, atoms);
    Ok(Value::Label(name))
}

pub(super) fn label_name(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    resolve_label(&interp.session, &args[0])
        .map(Value::Str)
        .ok_or_else(|| found(interp, "labelName applies to labels", &args[0]))
}

pub(super) fn label_host(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    resolve_label(&interp.session, &args[0])
        .map(|name| Value::Str(format!("{name}.q")))
        .ok_or_else(|| found(interp, "labelHost applies to labels", &args[0]))
}

fn port_range(interp: &Interpreter, value: &Value) -> EvalResult<(u16, u16)> {
    let (min, max) = match value {
        Value::Int(port) => (*port, *port),
        Value::List(items) => match items.as_slice() {
            [Value::Int(min), Value::Int(max)] => (*min, *max),
            _ => return Err(found(interp, "port range must have two ints", value)),
        },
        other => {
            return Err(found(
                interp,
                "port range must be an int or a list of ints",
                other,
            ));
        }
    };
    Ok(check_port_range(min, max)?)
}

pub(super) fn connect(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let (min, max) = port_range(interp, &args[0])?;
    let to = flatten_labels(interp, args.split_off(2))?;
    let from = flatten_labels(interp, args.split_off(1))?;

    for from in &from {
        for to in &to {
            let public = from == PUBLIC_LABEL || to == PUBLIC_LABEL;
            if public && min != max {
                return Err(EvalError::new(
                    "public internet cannot connect on port ranges",
                ));
            }
            if from == PUBLIC_LABEL && to == PUBLIC_LABEL {
                return Err(EvalError::new("cannot connect public internet to itself"));
            }
            let conn = Connection::new(from.as_str(), to.as_str(), min.into(), max.into())?;
            interp.session.connect(conn);
        }
    }
    Ok(empty())
}

fn exclusiveness(interp: &Interpreter, value: &Value) -> EvalResult<bool> {
    match value {
        Value::Str(s) if s == "exclusive" => Ok(true),
        Value::Str(s) if s == "on" => Ok(false),
        Value::Str(_) => Err(found(
            interp,
            "exclusiveness must be one of \"exclusive\" or \"on\"",
            value,
        )),
        other => Err(found(interp, "exclusiveness must be a string", other)),
    }
}

pub(super) fn label_rule(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let exclusive = exclusiveness(interp, &args[0])?;
    let mut labels = Vec::new();
    for value in flatten(args.split_off(1)) {
        let name = resolve_label(&interp.session, &value)
            .ok_or_else(|| found(interp, "labelRule constrains on labels", &value))?;
        labels.push(name);
    }
    Ok(Value::LabelRule { exclusive, labels })
}

pub(super) fn machine_rule(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let exclusive = exclusiveness(interp, &args[0])?;
    let mut attrs = Vec::new();
    for value in flatten(args.split_off(1)) {
        match value {
            Value::Attr(
                attr @ (MachineAttr::Provider(_) | MachineAttr::Region(_) | MachineAttr::Size(_)),
            ) => attrs.push(attr),
            other => return Err(found(interp, "can't constrain placement on", &other)),
        }
    }
    Ok(Value::MachineRule { exclusive, attrs })
}

fn machine_constraint(attrs: &[MachineAttr]) -> PlacementConstraint {
    let (mut provider, mut region, mut size) = (String::new(), String::new(), String::new());
    for attr in attrs {
        match attr {
            MachineAttr::Provider(p) => provider.clone_from(p),
            MachineAttr::Region(r) => region.clone_from(r),
            MachineAttr::Size(s) => size.clone_from(s),
            _ => {}
        }
    }
    PlacementConstraint::Machine {
        provider,
        region,
        size,
    }
}

pub(super) fn place(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let targets = flatten_labels(interp, args.split_off(1))?;

    let mut rules = Vec::new();
    for target in &targets {
        match &args[0] {
            Value::LabelRule { exclusive, labels } => {
                rules.extend(
                    labels
                        .iter()
                        .map(|other| PlacementRule::label(target.as_str(), *exclusive, other.as_str())),
                );
            }
            Value::MachineRule { exclusive, attrs } => rules.push(PlacementRule {
                target_label: target.clone(),
                exclusive: *exclusive,
                constraint: machine_constraint(attrs),
            }),
            other => return Err(found(interp, "invalid place rule", other)),
        }
    }

    for rule in rules {
        interp.session.place(rule);
    }
    Ok(empty())
}

pub(super) fn invariant(interp: &mut Interpreter, env: FrameId, ops: &[Expr]) -> EvalResult<Value> {
    let kind: InvariantKind = match ops[0].as_ident() {
        Some(form) => form.parse()?,
        None => {
            return Err(EvalError::new(format!(
                "invariant must begin with its form: {}",
                ops[0]
            )));
        }
    };

    let mut rest = &ops[1..];
    let desired = match (kind, rest.first()) {
        (InvariantKind::Enough, None) => true,
        (_, Some(first)) => {
            rest = &rest[1..];
            match interp.eval(first, env)? {
                Value::Bool(b) => b,
                other => return Err(found(interp, "invariant verdict must be a bool", &other)),
            }
        }
        (_, None) => {
            return Err(EvalError::new(format!(
                "not enough arguments: {}",
                kind.keyword()
            )));
        }
    };

    let values = interp.eval_all(rest, env)?;
    let labels = flatten_labels(interp, values)?;
    let invariant = Invariant::new(kind, desired, labels)?;
    tracing::debug!(invariant = %invariant, "recorded invariant");
    interp.session.add_invariant(invariant);
    Ok(empty())
}

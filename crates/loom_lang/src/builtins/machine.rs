//! Machine declarations and their attributes.

use crate::error::{EvalError, EvalResult};
use crate::eval::Interpreter;
use crate::value::{MachineAttr, Value, flatten};
use loom_core::{Machine, MachineKey, Range};

fn string_attr(
    interp: &Interpreter,
    name: &str,
    args: &[Value],
    attr: fn(String) -> MachineAttr,
) -> EvalResult<Value> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Attr(attr(s.clone()))),
        other => Err(EvalError::new(format!(
            "{name} must be a string: {}",
            other.render(&interp.session)
        ))),
    }
}

pub(super) fn provider(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    string_attr(interp, "provider", &args, MachineAttr::Provider)
}

pub(super) fn region(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    string_attr(interp, "region", &args, MachineAttr::Region)
}

pub(super) fn size(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    string_attr(interp, "size", &args, MachineAttr::Size)
}

pub(super) fn role(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    string_attr(interp, "role", &args, MachineAttr::Role)
}

pub(super) fn disk_size(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    match args[0] {
        Value::Int(n) => Ok(Value::Attr(MachineAttr::DiskSize(n))),
        ref other => Err(EvalError::new(format!(
            "diskSize must be an int: {}",
            other.render(&interp.session)
        ))),
    }
}

fn resource_range(interp: &Interpreter, args: &[Value]) -> EvalResult<Range> {
    let mut bounds = [0.0; 2];
    for (slot, arg) in bounds.iter_mut().zip(args) {
        *slot = match arg {
            Value::Int(i) => *i as f64,
            Value::Float(x) => *x,
            other => {
                return Err(EvalError::new(format!(
                    "range arguments must be convertable to floats: {}",
                    other.render(&interp.session)
                )));
            }
        };
    }
    if args.len() > 2 {
        return Err(EvalError::new(format!(
            "range arguments must be convertable to floats: {}",
            Value::List(args.to_vec()).render(&interp.session)
        )));
    }
    Ok(Range::new(bounds[0], bounds[1]))
}

pub(super) fn cpu(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    resource_range(interp, &args).map(|r| Value::Attr(MachineAttr::Cpu(r)))
}

pub(super) fn ram(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    resource_range(interp, &args).map(|r| Value::Attr(MachineAttr::Ram(r)))
}

pub(super) fn sshkey(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    match &args[0] {
        Value::Str(key) => Ok(Value::Attr(MachineAttr::Key(MachineKey::Plain(key.clone())))),
        other => Err(EvalError::new(format!(
            "key must be a string: {}",
            other.render(&interp.session)
        ))),
    }
}

pub(super) fn github_key(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    match &args[0] {
        Value::Str(user) => Ok(Value::Attr(MachineAttr::Key(MachineKey::Github(user.clone())))),
        other => Err(EvalError::new(format!(
            "github username must be a string: {}",
            other.render(&interp.session)
        ))),
    }
}

fn collect_attrs(interp: &Interpreter, args: Vec<Value>) -> EvalResult<Vec<MachineAttr>> {
    flatten(args)
        .into_iter()
        .map(|value| match value {
            Value::Attr(attr) => Ok(attr),
            other => Err(EvalError::new(format!(
                "unrecognized argument to machine definition: {}",
                other.render(&interp.session)
            ))),
        })
        .collect()
}

fn apply_attrs(machine: &mut Machine, attrs: &[MachineAttr]) {
    for attr in attrs {
        match attr {
            MachineAttr::Provider(p) => machine.provider.clone_from(p),
            MachineAttr::Region(r) => machine.region.clone_from(r),
            MachineAttr::Size(s) => machine.size.clone_from(s),
            MachineAttr::Role(r) => machine.role.clone_from(r),
            MachineAttr::DiskSize(n) => machine.disk_size = *n,
            MachineAttr::Cpu(r) => machine.cpu = *r,
            MachineAttr::Ram(r) => machine.ram = *r,
            MachineAttr::Key(k) => machine.keys.push(k.clone()),
        }
    }
}

pub(super) fn machine(interp: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let attrs = collect_attrs(interp, args)?;
    let mut machine = Machine::default();
    apply_attrs(&mut machine, &attrs);
    Ok(Value::Machine(interp.session.add_machine(machine)))
}

pub(super) fn machine_attribute(interp: &mut Interpreter, mut args: Vec<Value>) -> EvalResult<Value> {
    let attrs = collect_attrs(interp, args.split_off(1))?;

    let mut ids = Vec::new();
    for value in flatten(args) {
        match value {
            Value::Machine(id) => ids.push(id),
            other => {
                return Err(EvalError::new(format!(
                    "bad type, cannot change machine attributes: {}",
                    other.render(&interp.session)
                )));
            }
        }
    }

    for id in &ids {
        if let Some(machine) = interp.session.machine_mut(*id) {
            apply_attrs(machine, &attrs);
        }
    }
    Ok(Value::List(ids.into_iter().map(Value::Machine).collect()))
}

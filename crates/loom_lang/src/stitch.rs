//! A compiled specification.
//!
//! [`Stitch::compile`] runs the whole pipeline: parse, import expansion,
//! evaluation, key resolution, graph construction with placement packing,
//! and the in-program invariants. The result exposes the accumulated
//! records and the graph.

use crate::config::CompileConfig;
use crate::env::FrameId;
use crate::error::{EvalError, LoomError};
use crate::eval::Interpreter;
use crate::imports::{ModuleResolver, resolve_imports};
use crate::keys::{KeyResolver, resolve_keys};
use crate::parser::parse;
use crate::session::Atom;
use crate::value::Value;
use indexmap::IndexMap;
use loom_core::{Connection, Container, ContainerId, Invariant, Machine, PlacementRule};
use loom_graph::{Graph, Topology, check_invariants};
use serde::Serialize;
use std::fmt;

/// The result of compiling a specification
#[derive(Debug)]
pub struct Stitch {
    interp: Interpreter,
    root: FrameId,
    values: Vec<Value>,
    graph: Graph,
}

/// Serializable view of the compiled records
#[derive(Debug, Serialize)]
pub struct Records<'a> {
    /// Containers in id order
    pub containers: &'a [Container],
    /// Label name to container ids
    pub labels: IndexMap<String, Vec<ContainerId>>,
    /// Machines in declaration order
    pub machines: &'a [Machine],
    /// Sorted connections
    pub connections: Vec<Connection>,
    /// Placement rules
    pub placements: &'a [PlacementRule],
    /// In-program invariants
    pub invariants: &'a [Invariant],
}

impl Stitch {
    /// Compile with the resolvers described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the first parse, import, evaluation or invariant error.
    pub fn compile(source: &str, config: &CompileConfig) -> Result<Self, LoomError> {
        let modules = config.module_resolver();
        let keys = config.key_resolver();
        Self::compile_with(source, config.filename.as_deref(), &modules, keys.as_ref())
    }

    /// Compile with explicit resolvers.
    ///
    /// # Errors
    ///
    /// Returns the first parse, import, evaluation or invariant error.
    pub fn compile_with(
        source: &str,
        filename: Option<&str>,
        modules: &dyn ModuleResolver,
        keys: &dyn KeyResolver,
    ) -> Result<Self, LoomError> {
        let forms = parse(source, filename)?;
        let forms = resolve_imports(forms, modules)?;

        let mut interp = Interpreter::new();
        let root = interp.frames.root();
        let values = forms
            .iter()
            .map(|form| interp.eval(form, root))
            .collect::<Result<Vec<_>, _>>()?;

        for machine in interp.session.machines_mut() {
            machine.ssh_keys = resolve_keys(machine, keys);
        }

        let connections = interp.session.connections();
        let graph = Graph::build(&Topology {
            containers: interp.session.containers(),
            connections: &connections,
            placements: interp.session.placements(),
            machine_count: interp.session.machines().len(),
        });
        check_invariants(&graph, interp.session.invariants())?;

        tracing::info!(
            containers = interp.session.containers().len(),
            machines = interp.session.machines().len(),
            connections = connections.len(),
            avail_sets = graph.avail_sets.len(),
            "compiled specification"
        );
        Ok(Self {
            interp,
            root,
            values,
            graph,
        })
    }

    /// Registered containers in id order
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        self.interp.session.containers()
    }

    /// Label name to the ids of its containers
    #[must_use]
    pub fn labels(&self) -> IndexMap<String, Vec<ContainerId>> {
        self.interp.session.label_containers()
    }

    /// Declared machines, keys resolved
    #[must_use]
    pub fn machines(&self) -> &[Machine] {
        self.interp.session.machines()
    }

    /// Connections, sorted
    #[must_use]
    pub fn connections(&self) -> Vec<Connection> {
        self.interp.session.connections()
    }

    /// Placement rules in declaration order
    #[must_use]
    pub fn placements(&self) -> &[PlacementRule] {
        self.interp.session.placements()
    }

    /// In-program invariants in declaration order
    #[must_use]
    pub fn invariants(&self) -> &[Invariant] {
        self.interp.session.invariants()
    }

    /// The packed communication graph
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Everything compiled, ready to serialize
    #[must_use]
    pub fn records(&self) -> Records<'_> {
        Records {
            containers: self.containers(),
            labels: self.labels(),
            machines: self.machines(),
            connections: self.connections(),
            placements: self.placements(),
            invariants: self.invariants(),
        }
    }

    fn binding(&self, key: &str) -> Option<&Value> {
        self.interp.frames.lookup(self.root, key)
    }

    fn describe(&self, value: &Value) -> String {
        value.render(&self.interp.session)
    }

    /// A top-level float binding.
    ///
    /// # Errors
    ///
    /// Fails when `key` is unbound or not a float.
    pub fn query_float(&self, key: &str) -> Result<f64, EvalError> {
        match self.binding(key) {
            Some(Value::Float(x)) => Ok(*x),
            Some(other) => Err(EvalError::new(format!(
                "{key}: requested float, found {}",
                self.describe(other)
            ))),
            None => Err(EvalError::new(format!("{key} undefined"))),
        }
    }

    /// A top-level int binding, or 0 with a warning
    #[must_use]
    pub fn query_int(&self, key: &str) -> i64 {
        match self.binding(key) {
            Some(Value::Int(i)) => *i,
            Some(other) => {
                tracing::warn!(key, found = %self.describe(other), "requested int");
                0
            }
            None => {
                tracing::warn!(key, "undefined");
                0
            }
        }
    }

    /// A top-level string binding, or `""` with a warning
    #[must_use]
    pub fn query_string(&self, key: &str) -> String {
        match self.binding(key) {
            Some(Value::Str(s)) => s.clone(),
            Some(other) => {
                tracing::warn!(key, found = %self.describe(other), "requested string");
                String::new()
            }
            None => {
                tracing::warn!(key, "undefined");
                String::new()
            }
        }
    }

    /// A top-level list-of-strings binding, or empty with a warning
    #[must_use]
    pub fn query_str_slice(&self, key: &str) -> Vec<String> {
        let Some(value) = self.binding(key) else {
            tracing::warn!(key, "undefined");
            return Vec::new();
        };
        let Value::List(items) = value else {
            tracing::warn!(key, found = %self.describe(value), "requested list");
            return Vec::new();
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Str(s) => out.push(s.clone()),
                other => {
                    tracing::warn!(key, found = %self.describe(other), "requested string");
                    return Vec::new();
                }
            }
        }
        out
    }

    /// Machines under a label, or empty with a warning if it holds anything else
    #[must_use]
    pub fn query_machine_slice(&self, label: &str) -> Vec<Machine> {
        let Some(atoms) = self.interp.session.label(label) else {
            tracing::warn!(label, "undefined");
            return Vec::new();
        };
        let mut out = Vec::with_capacity(atoms.len());
        for atom in atoms {
            match *atom {
                Atom::Machine(id) => {
                    if let Some(machine) = self.interp.session.machine(id) {
                        out.push(machine.clone());
                    }
                }
                Atom::Container(id) => {
                    tracing::warn!(label, container = %id, "requested machines, found container");
                    return Vec::new();
                }
            }
        }
        out
    }
}

impl fmt::Display for Stitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&value.render(&self.interp.session))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::MemoryModuleResolver;
    use crate::keys::{NoKeys, StaticKeyResolver};
    use loom_core::PlacementConstraint;
    use proptest::prelude::*;

    fn compile(src: &str) -> Result<Stitch, LoomError> {
        Stitch::compile_with(src, None, &MemoryModuleResolver::new(), &NoKeys)
    }

    #[test]
    fn test_reach_and_between_scenario() {
        let src = r#"
            (label "a" (docker "a"))
            (label "b" (docker "b"))
            (label "c" (docker "c"))
            (connect 22 "a" "b")
            (connect 22 "b" "c")
            (invariant reach true "a" "c")
            (invariant reach false "c" "a")
            (invariant between true "a" "c" "b")
        "#;
        let stitch = compile(src).unwrap();
        assert_eq!(stitch.invariants().len(), 3);
        assert_eq!(stitch.connections().len(), 2);
    }

    #[test]
    fn test_failed_invariant_rejects() {
        let src = r#"
            (label "a" (docker "a"))
            (label "b" (docker "b"))
            (invariant reach true "a" "b")
        "#;
        let err = compile(src).unwrap_err();
        assert!(matches!(err, LoomError::Invariant(_)));
        assert_eq!(err.to_string(), "invariant failed: reach true \"a\" \"b\"");
    }

    #[test]
    fn test_exclusive_placement_scenario() {
        let src = r#"
            (label "red" (docker "r"))
            (label "blue" (docker "b"))
            (place (labelRule "exclusive" "red") "blue")
        "#;
        let stitch = compile(src).unwrap();
        assert_eq!(stitch.placements().len(), 1);
        let rule = &stitch.placements()[0];
        assert!(rule.exclusive);
        assert_eq!(rule.target_label, "blue");
        assert_eq!(rule.constraint, PlacementConstraint::Label("red".into()));

        let graph = stitch.graph();
        assert_ne!(graph.avail_set_of("1"), graph.avail_set_of("2"));
        assert_eq!(graph.avail_sets.len(), 3);
    }

    #[test]
    fn test_enough_without_machines() {
        let src = r#"
            (label "red" (docker "r"))
            (label "blue" (docker "b"))
            (place (labelRule "exclusive" "red") "blue")
            (invariant enough)
        "#;
        let err = compile(src).unwrap_err();
        assert_eq!(err.to_string(), "invariant failed: enough");

        let with_machines = format!("{src}\n(makeList 2 (machine))");
        assert!(compile(&with_machines).is_ok());
    }

    #[test]
    fn test_machine_round_trips() {
        let src = "(machine (provider \"Amazon\") (size \"m4.large\"))";
        let stitch = compile(src).unwrap();
        assert_eq!(stitch.to_string(), src);
        assert_eq!(compile(&stitch.to_string()).unwrap().to_string(), src);
    }

    #[test]
    fn test_negative_zero_renders_stably() {
        let first = compile("-0.0 (list -0.0 1.5)").unwrap().to_string();
        assert_eq!(first, "0\n(list 0 1.5)");
        assert_eq!(compile(&first).unwrap().to_string(), first);
    }

    #[test]
    fn test_invalid_port_range() {
        let src = "(label \"a\" (docker \"a\"))\n\
                   (label \"b\" (docker \"b\"))\n\
                   (connect (list 0 70000) \"a\" \"b\")";
        let err = compile(src).unwrap_err();
        assert!(matches!(err, LoomError::Eval(_)));
        assert_eq!(err.to_string(), "3: invalid port range: [0, 70000]");
    }

    #[test]
    fn test_error_positions_carry_module_file() {
        let modules = MemoryModuleResolver::new()
            .with_module("lib", "(define Boom (lambda () (+ 1 \"x\")))");
        let err = Stitch::compile_with(
            "(import \"lib\")\n(lib.Boom)",
            Some("main.spec"),
            &modules,
            &NoKeys,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "lib.spec:1: bad arithmetic argument: \"x\"");

        let err = Stitch::compile_with("\n(foo)", Some("main.spec"), &modules, &NoKeys)
            .unwrap_err();
        assert_eq!(err.to_string(), "main.spec:2: unknown function: foo");
    }

    #[test]
    fn test_keys_resolved_into_machines() {
        let keys = StaticKeyResolver::new().with_user("stitch-test-user", vec!["k".into()]);
        let stitch = Stitch::compile_with(
            "(machine (sshkey \"plain\") (githubKey \"stitch-test-user\"))",
            None,
            &MemoryModuleResolver::new(),
            &keys,
        )
        .unwrap();
        assert_eq!(stitch.machines()[0].ssh_keys, vec!["plain", "k"]);
    }

    #[test]
    fn test_typed_queries() {
        let src = r#"
            (define ratio 0.5)
            (define count 3)
            (define name "web")
            (define names (list "a" "b"))
            (define mixed (list "a" 1))
            (label "workers" (machine (role "Worker")) (machine (role "Worker")))
        "#;
        let stitch = compile(src).unwrap();
        assert_eq!(stitch.query_float("ratio").unwrap(), 0.5);
        assert_eq!(
            stitch.query_float("count").unwrap_err().to_string(),
            "count: requested float, found 3"
        );
        assert!(stitch.query_float("nope").is_err());
        assert_eq!(stitch.query_int("count"), 3);
        assert_eq!(stitch.query_int("name"), 0);
        assert_eq!(stitch.query_string("name"), "web");
        assert_eq!(stitch.query_string("missing"), "");
        assert_eq!(stitch.query_str_slice("names"), vec!["a", "b"]);
        assert!(stitch.query_str_slice("mixed").is_empty());
        assert_eq!(stitch.query_machine_slice("workers").len(), 2);
    }

    #[test]
    fn test_records_serialize() {
        let stitch = compile("(label \"web\" (docker \"nginx\"))").unwrap();
        let json = serde_json::to_value(stitch.records()).unwrap();
        assert_eq!(json["containers"][0]["image"], "nginx");
        assert_eq!(json["labels"]["web"][0], 1);
    }

    fn atom() -> impl Strategy<Value = String> {
        prop_oneof![
            (-100i64..100).prop_map(|i| i.to_string()),
            "[a-z]{0,6}".prop_map(|s| format!("\"{s}\"")),
            prop::sample::select(vec!["0.5", "2.25", "-0.0", "true", "false"])
                .prop_map(str::to_string),
            "[a-z]{1,6}".prop_map(|s| format!("(docker \"{s}\")")),
            prop::sample::select(vec![
                "(machine (provider \"Amazon\") (ram 1 4))",
                "(machine (role \"Master\") (cpu 2))",
                "(machine)",
            ])
            .prop_map(str::to_string),
        ]
    }

    fn form() -> impl Strategy<Value = String> {
        atom().prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4)
                    .prop_map(|items| format!("(list {})", items.join(" "))),
                (-50i64..50, -50i64..50).prop_map(|(a, b)| format!("(+ {a} {b})")),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..3).prop_map(|pairs| {
                    let entries: Vec<String> = pairs
                        .into_iter()
                        .map(|(k, v)| format!("(\"{k}\" {v})"))
                        .collect();
                    format!("(hmap {})", entries.join(" "))
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_stringify_round_trips(forms in prop::collection::vec(form(), 1..5)) {
            let src = forms.join("\n");
            let first = compile(&src).unwrap().to_string();
            let second = compile(&first).unwrap().to_string();
            prop_assert_eq!(first, second);
        }
    }
}

//! Counterfactual failure queries.
//!
//! A query deletes a node, or the node's whole availability set, from a
//! copy of the graph and re-checks the invariants. The original graph is
//! never touched.

use crate::error::QueryError;
use crate::graph::Graph;
use crate::invariant::holds;
use loom_core::Invariant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryKind {
    /// Just the named node
    RemoveOne,
    /// Every node sharing the named node's availability set
    RemoveSet,
}

impl QueryKind {
    /// Keyword as written in query files
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::RemoveOne => "removeOne",
            Self::RemoveSet => "removeSet",
        }
    }
}

/// One failure query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Mutation kind
    pub kind: QueryKind,
    /// Node name (container id or `public`) or label
    pub target: String,
}

impl Query {
    /// Parse `<removeOne|removeSet> <target>`
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Malformed`] for anything else.
    pub fn parse_line(line: &str) -> Result<Self, QueryError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let kind = match words.first() {
            Some(&"removeOne") => QueryKind::RemoveOne,
            Some(&"removeSet") => QueryKind::RemoveSet,
            _ => {
                return Err(QueryError::Malformed {
                    line: line.to_string(),
                });
            }
        };
        match words.as_slice() {
            [_, target] => Ok(Self {
                kind,
                target: target.trim_matches('"').to_string(),
            }),
            _ => Err(QueryError::Malformed {
                line: line.to_string(),
            }),
        }
    }

    fn targets(&self, graph: &Graph) -> Result<Vec<String>, QueryError> {
        if graph.nodes.contains_key(&self.target) {
            return Ok(vec![self.target.clone()]);
        }
        let labeled = graph.nodes_with_label(&self.target);
        if labeled.is_empty() {
            return Err(QueryError::UnknownTarget {
                target: self.target.clone(),
            });
        }
        Ok(labeled)
    }

    /// Apply the mutation to `graph`
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownTarget`] if the target matches nothing.
    pub fn apply(&self, graph: &mut Graph) -> Result<(), QueryError> {
        let mut doomed = Vec::new();
        for target in self.targets(graph)? {
            match self.kind {
                QueryKind::RemoveOne => doomed.push(target),
                QueryKind::RemoveSet => {
                    if let Some(idx) = graph.avail_set_of(&target) {
                        doomed.extend(graph.avail_sets[idx].nodes.iter().cloned());
                    }
                }
            }
        }
        for name in doomed {
            graph.remove_node(&name);
        }
        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.keyword(), self.target)
    }
}

/// Run one query; returns the first invariant the mutation would break.
///
/// # Errors
///
/// Returns an error if the query target matches nothing in the graph.
pub fn run_query(
    graph: &Graph,
    invariants: &[Invariant],
    query: &Query,
) -> Result<Option<Invariant>, QueryError> {
    let mut mutated = graph.clone();
    query.apply(&mut mutated)?;
    let broken = invariants.iter().find(|inv| !holds(&mutated, inv)).cloned();
    tracing::debug!(query = %query, broken = broken.is_some(), "ran failure query");
    Ok(broken)
}

/// Run queries in order, failing on the first that breaks an invariant.
///
/// # Errors
///
/// Returns [`QueryError::Failed`] naming the query and the invariant, or
/// the target-resolution error of a bad query.
pub fn check_queries(
    graph: &Graph,
    invariants: &[Invariant],
    queries: &[Query],
) -> Result<(), QueryError> {
    for query in queries {
        if let Some(invariant) = run_query(graph, invariants, query)? {
            return Err(QueryError::Failed {
                query: query.to_string(),
                invariant,
            });
        }
    }
    Ok(())
}

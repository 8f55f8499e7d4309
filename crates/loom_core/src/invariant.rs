//! Declarative assertions over the communication graph.

use crate::error::{CoreError, CoreResult};
use crate::model::quote;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three assertion forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvariantKind {
    /// `reach <bool> from to`
    Reach,
    /// `between <bool> from to via`
    Between,
    /// `enough`: enough machines for every availability set
    Enough,
}

impl InvariantKind {
    /// Keyword as written in source
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Reach => "reach",
            Self::Between => "between",
            Self::Enough => "enough",
        }
    }

    /// Number of label operands the form takes
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Reach => 2,
            Self::Between => 3,
            Self::Enough => 0,
        }
    }
}

impl FromStr for InvariantKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reach" => Ok(Self::Reach),
            "between" => Ok(Self::Between),
            "enough" => Ok(Self::Enough),
            other => Err(CoreError::UnknownInvariantForm {
                form: other.to_string(),
            }),
        }
    }
}

/// One assertion, with the text it is reported under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariant {
    /// Form
    pub kind: InvariantKind,
    /// Expected verdict
    pub desired: bool,
    /// Label operands in form order
    pub labels: Vec<String>,
    /// Canonical source text, e.g. `reach true "a" "c"`
    pub text: String,
}

impl Invariant {
    /// Build an invariant, checking the operand count
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedInvariant`] when the number of labels
    /// does not match the form.
    pub fn new(kind: InvariantKind, desired: bool, labels: Vec<String>) -> CoreResult<Self> {
        let text = render(kind, desired, &labels);
        if labels.len() != kind.arity() {
            return Err(CoreError::MalformedInvariant {
                text,
                reason: format!(
                    "{} takes {} labels, found {}",
                    kind.keyword(),
                    kind.arity(),
                    labels.len()
                ),
            });
        }
        Ok(Self {
            kind,
            desired,
            labels,
            text,
        })
    }

    /// Parse one line of an invariants file: `<form> <true|false> <label...>`.
    ///
    /// `enough` may omit its boolean. Labels may be bare or quoted.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown forms, a missing or non-boolean
    /// verdict, or the wrong number of labels.
    pub fn parse_line(line: &str) -> CoreResult<Self> {
        let mut words = line.split_whitespace();
        let form = words.next().ok_or_else(|| CoreError::MalformedInvariant {
            text: line.to_string(),
            reason: "empty line".to_string(),
        })?;
        let kind: InvariantKind = form.parse()?;

        let rest: Vec<&str> = words.collect();
        let (desired, labels) = match rest.split_first() {
            Some((&"true", labels)) => (true, labels),
            Some((&"false", labels)) => (false, labels),
            None if kind == InvariantKind::Enough => (true, &rest[..]),
            _ => {
                return Err(CoreError::MalformedInvariant {
                    text: line.to_string(),
                    reason: "expected true or false".to_string(),
                });
            }
        };

        let labels = labels
            .iter()
            .map(|l| l.trim_matches('"').to_string())
            .collect();
        Self::new(kind, desired, labels)
    }
}

fn render(kind: InvariantKind, desired: bool, labels: &[String]) -> String {
    if kind == InvariantKind::Enough {
        return kind.keyword().to_string();
    }
    let mut text = format!("{} {desired}", kind.keyword());
    for label in labels {
        text.push(' ');
        text.push_str(&quote(label));
    }
    text
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reach_line() {
        let inv = Invariant::parse_line("reach true a c").unwrap();
        assert_eq!(inv.kind, InvariantKind::Reach);
        assert!(inv.desired);
        assert_eq!(inv.labels, vec!["a", "c"]);
        assert_eq!(inv.text, "reach true \"a\" \"c\"");
    }

    #[test]
    fn test_parse_quoted_between_line() {
        let inv = Invariant::parse_line("between false \"a\" \"c\" \"b\"").unwrap();
        assert_eq!(inv.kind, InvariantKind::Between);
        assert!(!inv.desired);
        assert_eq!(inv.labels, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_parse_enough_without_verdict() {
        let inv = Invariant::parse_line("enough").unwrap();
        assert_eq!(inv.kind, InvariantKind::Enough);
        assert!(inv.desired);
        assert_eq!(inv.to_string(), "enough");
    }

    #[test]
    fn test_wrong_arity_rejected() {
        assert!(matches!(
            Invariant::parse_line("reach true a"),
            Err(CoreError::MalformedInvariant { .. })
        ));
        assert!(matches!(
            Invariant::parse_line("nearby true a b"),
            Err(CoreError::UnknownInvariantForm { .. })
        ));
        assert!(Invariant::parse_line("reach maybe a b").is_err());
    }

    #[test]
    fn test_invariant_serializes_with_text() {
        let inv = Invariant::parse_line("reach false a b").unwrap();
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["kind"], "Reach");
        assert_eq!(json["text"], "reach false \"a\" \"b\"");
    }

    proptest::proptest! {
        #[test]
        fn prop_parse_line_accepts_rendered_text(
            desired in proptest::bool::ANY,
            from in "[a-z][a-z0-9]{0,6}",
            to in "[a-z][a-z0-9]{0,6}",
        ) {
            let inv = Invariant::new(InvariantKind::Reach, desired, vec![from, to]).unwrap();
            let reparsed = Invariant::parse_line(&inv.text).unwrap();
            proptest::prop_assert_eq!(reparsed, inv);
        }
    }
}

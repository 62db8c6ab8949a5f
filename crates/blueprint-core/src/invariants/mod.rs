//! Structural invariants over canonical descriptors.
//!
//! An [`Invariant`] pairs an id, a severity and an enforcement point with a
//! parameterised [`InvariantRule`]. [`evaluate`] runs a set of invariants
//! against one descriptor and returns every [`Violation`] it finds; a failing
//! rule never stops evaluation of the remaining rules.

pub mod catalog;
pub mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::descriptor::CanonicalDescriptor;
use crate::domain::raw::SourceKind;
use crate::domain::registry::Registries;

pub use catalog::InvariantCatalog;
pub use rules::{InvariantRule, NumericAttribute, RuleFinding};

/// Violation severity. `Error` blocks the pipeline; `Warn` is reported only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warn,
    Error,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// Where an invariant is enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementPoint {
    Build,
    Runtime,
    Both,
}

impl EnforcementPoint {
    /// Whether an invariant declared with `self` runs at `point`.
    pub fn includes(self, point: EnforcementPoint) -> bool {
        self == EnforcementPoint::Both || self == point
    }
}

/// Descriptor category an invariant applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCategory {
    Form,
    Layout,
    List,
    Any,
}

impl InvariantCategory {
    pub fn matches(self, kind: SourceKind) -> bool {
        matches!(
            (self, kind),
            (InvariantCategory::Any, _)
                | (InvariantCategory::Form, SourceKind::Form)
                | (InvariantCategory::Layout, SourceKind::Layout)
                | (InvariantCategory::List, SourceKind::List)
        )
    }
}

/// A named structural rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invariant {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub enforcement: EnforcementPoint,
    pub category: InvariantCategory,
    pub rule: InvariantRule,
}

/// One failed invariant evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub invariant_id: String,
    pub severity: Severity,
    pub descriptor_kind: SourceKind,
    pub descriptor_key: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl Violation {
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invariant[{}] {}:{}: {}",
            self.invariant_id, self.descriptor_kind, self.descriptor_key, self.message
        )
    }
}

/// Invariant registry errors. These indicate programmer or configuration
/// mistakes, never a failed rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantError {
    #[error("unknown invariant id: {0}")]
    UnknownInvariant(String),

    #[error("duplicate invariant id: {0}")]
    DuplicateInvariant(String),
}

/// Evaluate invariants against one descriptor.
///
/// Invariants whose category does not match the descriptor kind are skipped.
/// Every applicable rule runs; the result lists all violations found.
pub fn evaluate(
    descriptor: &CanonicalDescriptor,
    applicable: &[&Invariant],
    registries: Registries<'_>,
) -> Vec<Violation> {
    let kind = descriptor.kind();
    let key = descriptor.key().to_string();

    applicable
        .iter()
        .filter(|inv| inv.category.matches(kind))
        .flat_map(|inv| {
            inv.rule
                .check(descriptor, registries)
                .into_iter()
                .map(|finding| Violation {
                    invariant_id: inv.id.clone(),
                    severity: inv.severity,
                    descriptor_kind: kind,
                    descriptor_key: key.clone(),
                    message: finding.message,
                    details: finding.details,
                })
        })
        .collect()
}

/// Split violations into blocking errors and warnings, rendered with the
/// stable `invariant[<id>]` prefix.
pub fn partition_violations(violations: &[Violation]) -> (Vec<String>, Vec<String>) {
    let (errors, warnings): (Vec<&Violation>, Vec<&Violation>) =
        violations.iter().partition(|v| v.is_blocking());
    (
        errors.iter().map(|v| v.to_string()).collect(),
        warnings.iter().map(|v| v.to_string()).collect(),
    )
}

//! Rule families and their checks.
//!
//! Each rule returns zero or more [`RuleFinding`]s. A rule reports one finding
//! per independent problem (one per duplicated id, one per misaligned
//! spacing value, ...) so callers can count problems precisely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::descriptor::{CanonicalDescriptor, CanonicalNode, NodeRole};
use crate::domain::registry::{Registries, RegistryKind};

/// Numeric attribute constrained by [`InvariantRule::AllowedValues`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NumericAttribute {
    /// `columns` of layout nodes.
    GridColumns,
    /// `columns` of form sections.
    SectionColumns,
    /// `page_size` of lists.
    PageSize,
}

impl NumericAttribute {
    pub fn name(&self) -> &'static str {
        match self {
            NumericAttribute::GridColumns => "grid columns",
            NumericAttribute::SectionColumns => "section columns",
            NumericAttribute::PageSize => "page size",
        }
    }
}

/// A closed set of parameterised structural rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InvariantRule {
    /// Layouts must contain exactly one scroll container.
    ExactlyOneScrollContainer,
    /// At most one form section may be marked default.
    AtMostOneDefaultSection,
    /// Ids must be unique among siblings of the same scope.
    UniqueSiblingIds,
    /// Every spacing value must be a multiple of `base`.
    SpacingGrid { base: u32 },
    /// A numeric attribute must be one of `allowed`.
    AllowedValues {
        attribute: NumericAttribute,
        allowed: Vec<u32>,
    },
    /// Every action id must exist in the action registry.
    ActionsResolvable,
    /// Every intent id must exist in the intent registry.
    IntentsResolvable,
    /// Every declared invariant id must exist in the invariant registry.
    InvariantsResolvable,
    /// Forms must show every required entity field.
    RequiredFieldsPresent,
    /// Forms must declare at least one action.
    SubmitActionDeclared,
}

/// One problem found by a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFinding {
    pub message: String,
    pub details: serde_json::Value,
}

impl RuleFinding {
    fn new(message: String, details: serde_json::Value) -> Self {
        Self { message, details }
    }
}

impl InvariantRule {
    /// Check this rule against a descriptor. Rules that do not apply to the
    /// descriptor's kind find nothing.
    pub fn check(
        &self,
        descriptor: &CanonicalDescriptor,
        registries: Registries<'_>,
    ) -> Vec<RuleFinding> {
        match self {
            InvariantRule::ExactlyOneScrollContainer => check_single_scroll(descriptor),
            InvariantRule::AtMostOneDefaultSection => check_single_default(descriptor),
            InvariantRule::UniqueSiblingIds => check_unique_ids(descriptor),
            InvariantRule::SpacingGrid { base } => check_spacing_grid(descriptor, *base),
            InvariantRule::AllowedValues { attribute, allowed } => {
                check_allowed_values(descriptor, *attribute, allowed)
            }
            InvariantRule::ActionsResolvable => {
                check_resolvable(descriptor.actions(), RegistryKind::Action, registries)
            }
            InvariantRule::IntentsResolvable => {
                check_resolvable(descriptor.intents(), RegistryKind::Intent, registries)
            }
            InvariantRule::InvariantsResolvable => {
                check_resolvable(descriptor.invariants(), RegistryKind::Invariant, registries)
            }
            InvariantRule::RequiredFieldsPresent => check_required_fields(descriptor),
            InvariantRule::SubmitActionDeclared => check_submit_action(descriptor),
        }
    }
}

fn check_single_scroll(descriptor: &CanonicalDescriptor) -> Vec<RuleFinding> {
    let CanonicalDescriptor::Layout(layout) = descriptor else {
        return Vec::new();
    };
    let scrolls: Vec<&str> = layout
        .root
        .walk()
        .into_iter()
        .filter(|n| n.role == NodeRole::Scroll)
        .map(|n| n.id.as_str())
        .collect();

    match scrolls.len() {
        1 => Vec::new(),
        0 => vec![RuleFinding::new(
            "no scroll container; exactly one is required".to_string(),
            json!({ "count": 0, "nodes": [] }),
        )],
        n => vec![RuleFinding::new(
            format!(
                "found {} scroll containers ({}); exactly one is required",
                n,
                scrolls.join(", ")
            ),
            json!({ "count": n, "nodes": scrolls }),
        )],
    }
}

fn check_single_default(descriptor: &CanonicalDescriptor) -> Vec<RuleFinding> {
    let CanonicalDescriptor::Form(form) = descriptor else {
        return Vec::new();
    };
    let defaults: Vec<&str> = form
        .sections
        .iter()
        .filter(|s| s.default)
        .map(|s| s.id.as_str())
        .collect();
    if defaults.len() <= 1 {
        return Vec::new();
    }
    vec![RuleFinding::new(
        format!(
            "{} sections marked default ({}); at most one is allowed",
            defaults.len(),
            defaults.join(", ")
        ),
        json!({ "count": defaults.len(), "sections": defaults }),
    )]
}

/// Report each id that appears more than once within `scope`.
fn duplicates<'a>(
    scope: &str,
    what: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Vec<RuleFinding> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut order = Vec::new();
    for id in ids {
        let count = counts.entry(id).or_insert(0);
        if *count == 1 {
            order.push(id);
        }
        *count += 1;
    }
    order
        .into_iter()
        .map(|id| {
            let count = counts[id];
            RuleFinding::new(
                format!("duplicate {what} '{id}' in {scope} ({count} occurrences)"),
                json!({ "id": id, "scope": scope, "count": count }),
            )
        })
        .collect()
}

fn check_unique_ids(descriptor: &CanonicalDescriptor) -> Vec<RuleFinding> {
    match descriptor {
        CanonicalDescriptor::Form(form) => {
            let mut findings = duplicates(
                "sections",
                "section id",
                form.sections.iter().map(|s| s.id.as_str()),
            );
            for section in &form.sections {
                findings.extend(duplicates(
                    &format!("section '{}'", section.id),
                    "field",
                    section.fields.iter().map(|f| f.name.as_str()),
                ));
            }
            findings
        }
        CanonicalDescriptor::Layout(layout) => {
            let mut findings = Vec::new();
            for node in layout.root.walk() {
                findings.extend(duplicates(
                    &format!("children of '{}'", node.id),
                    "node id",
                    node.children.iter().map(|c| c.id.as_str()),
                ));
            }
            findings
        }
        CanonicalDescriptor::List(list) => duplicates(
            "columns",
            "column",
            list.columns.iter().map(|c| c.field.name.as_str()),
        ),
    }
}

fn check_spacing_grid(descriptor: &CanonicalDescriptor, base: u32) -> Vec<RuleFinding> {
    let CanonicalDescriptor::Layout(layout) = descriptor else {
        return Vec::new();
    };
    if base == 0 {
        return Vec::new();
    }
    let mut findings = Vec::new();
    for node in layout.root.walk() {
        for (attribute, value) in node.spacing.values() {
            if value % base != 0 {
                findings.push(RuleFinding::new(
                    format!(
                        "{attribute} {value} on node '{}' is not a multiple of {base}",
                        node.id
                    ),
                    json!({
                        "node": node.id,
                        "attribute": attribute,
                        "value": value,
                        "base": base,
                    }),
                ));
            }
        }
    }
    findings
}

fn check_allowed_values(
    descriptor: &CanonicalDescriptor,
    attribute: NumericAttribute,
    allowed: &[u32],
) -> Vec<RuleFinding> {
    let values: Vec<(String, u32)> = match (attribute, descriptor) {
        (NumericAttribute::GridColumns, CanonicalDescriptor::Layout(layout)) => layout
            .root
            .walk()
            .into_iter()
            .filter_map(|n: &CanonicalNode| n.columns.map(|c| (format!("node '{}'", n.id), c)))
            .collect(),
        (NumericAttribute::SectionColumns, CanonicalDescriptor::Form(form)) => form
            .sections
            .iter()
            .map(|s| (format!("section '{}'", s.id), s.columns))
            .collect(),
        (NumericAttribute::PageSize, CanonicalDescriptor::List(list)) => {
            vec![("list".to_string(), list.page_size)]
        }
        _ => Vec::new(),
    };

    values
        .into_iter()
        .filter(|(_, value)| !allowed.contains(value))
        .map(|(location, value)| {
            RuleFinding::new(
                format!(
                    "{} {} on {} is not one of {:?}",
                    attribute.name(),
                    value,
                    location,
                    allowed
                ),
                json!({
                    "location": location,
                    "attribute": attribute,
                    "value": value,
                    "allowed": allowed,
                }),
            )
        })
        .collect()
}

fn check_resolvable(
    ids: &[String],
    kind: RegistryKind,
    registries: Registries<'_>,
) -> Vec<RuleFinding> {
    ids.iter()
        .filter(|id| !registries.contains(kind, id))
        .map(|id| {
            RuleFinding::new(
                format!("{} id '{}' is not registered", kind.name(), id),
                json!({ "registry": kind, "id": id }),
            )
        })
        .collect()
}

fn check_required_fields(descriptor: &CanonicalDescriptor) -> Vec<RuleFinding> {
    let CanonicalDescriptor::Form(form) = descriptor else {
        return Vec::new();
    };
    form.required_fields
        .iter()
        .filter(|name| {
            !form
                .sections
                .iter()
                .flat_map(|s| s.fields.iter())
                .any(|f| &f.name == *name)
        })
        .map(|name| {
            RuleFinding::new(
                format!("required field '{name}' is not shown by any section"),
                json!({ "field": name }),
            )
        })
        .collect()
}

fn check_submit_action(descriptor: &CanonicalDescriptor) -> Vec<RuleFinding> {
    match descriptor {
        CanonicalDescriptor::Form(form) if form.actions.is_empty() => vec![RuleFinding::new(
            "form declares no actions".to_string(),
            json!({}),
        )],
        _ => Vec::new(),
    }
}

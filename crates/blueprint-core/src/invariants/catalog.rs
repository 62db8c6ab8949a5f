//! Catalog of named invariants.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::descriptor::CanonicalDescriptor;
use crate::domain::raw::SourceKind;
use crate::domain::registry::{MembershipRegistry, Registries};

use super::rules::{InvariantRule, NumericAttribute};
use super::{
    evaluate, EnforcementPoint, Invariant, InvariantCategory, InvariantError, Severity, Violation,
};

/// Spacing base unit used by the standard catalog.
pub const SPACING_BASE: u32 = 4;

/// Grid column counts accepted by the standard catalog.
pub const GRID_COLUMNS: &[u32] = &[1, 2, 3, 4, 6, 12];

/// List page sizes accepted by the standard catalog.
pub const PAGE_SIZES: &[u32] = &[10, 25, 50, 100];

/// Invariants addressable by id.
///
/// Disabled invariants stay registered (declared references to them still
/// resolve) but are never returned by [`InvariantCatalog::applicable`].
#[derive(Debug, Clone, Default)]
pub struct InvariantCatalog {
    invariants: BTreeMap<String, Invariant>,
    disabled: BTreeSet<String>,
}

impl InvariantCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an invariant. Ids are unique.
    pub fn register(&mut self, invariant: Invariant) -> Result<(), InvariantError> {
        if self.invariants.contains_key(&invariant.id) {
            return Err(InvariantError::DuplicateInvariant(invariant.id));
        }
        self.invariants.insert(invariant.id.clone(), invariant);
        Ok(())
    }

    /// The standard preset shipped with blueprint.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for invariant in standard_invariants() {
            // ids in the preset are distinct
            catalog
                .invariants
                .insert(invariant.id.clone(), invariant);
        }
        catalog
    }

    /// Look up an invariant by id.
    pub fn get(&self, id: &str) -> Result<&Invariant, InvariantError> {
        self.invariants
            .get(id)
            .ok_or_else(|| InvariantError::UnknownInvariant(id.to_string()))
    }

    /// Exclude an invariant from evaluation.
    pub fn disable(&mut self, id: &str) -> Result<(), InvariantError> {
        self.get(id)?;
        self.disabled.insert(id.to_string());
        Ok(())
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.contains(id)
    }

    /// Lower an invariant's severity to `warn`.
    pub fn downgrade(&mut self, id: &str) -> Result<(), InvariantError> {
        let invariant = self
            .invariants
            .get_mut(id)
            .ok_or_else(|| InvariantError::UnknownInvariant(id.to_string()))?;
        invariant.severity = Severity::Warn;
        Ok(())
    }

    /// Invariants that run for a descriptor of `kind` at `point`.
    ///
    /// Every enabled catalog invariant whose category matches `kind` applies.
    /// `declared` lists the ids a descriptor explicitly requests; declared
    /// invariants of a matching category are included even if they would
    /// otherwise not be. Declared ids missing from the catalog are skipped
    /// here and reported by `descriptor.invariants-resolvable`. Results are
    /// ordered by id.
    pub fn applicable(
        &self,
        kind: SourceKind,
        point: EnforcementPoint,
        declared: &[String],
    ) -> Vec<&Invariant> {
        let mut ids: BTreeSet<&str> = declared
            .iter()
            .filter_map(|id| self.invariants.get(id))
            .map(|inv| inv.id.as_str())
            .collect();
        ids.extend(
            self.invariants
                .values()
                .filter(|inv| inv.category.matches(kind))
                .map(|inv| inv.id.as_str()),
        );

        ids.into_iter()
            .filter(|id| !self.disabled.contains(*id))
            .filter_map(|id| self.invariants.get(id))
            .filter(|inv| inv.category.matches(kind) && inv.enforcement.includes(point))
            .collect()
    }

    /// Evaluate every applicable invariant against one descriptor.
    pub fn evaluate_at(
        &self,
        descriptor: &CanonicalDescriptor,
        point: EnforcementPoint,
        registries: Registries<'_>,
    ) -> Vec<Violation> {
        let applicable = self.applicable(descriptor.kind(), point, descriptor.invariants());
        evaluate(descriptor, &applicable, registries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invariant> {
        self.invariants.values()
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

impl MembershipRegistry for InvariantCatalog {
    fn contains(&self, id: &str) -> bool {
        self.invariants.contains_key(id)
    }
}

fn invariant(
    id: &str,
    title: &str,
    severity: Severity,
    enforcement: EnforcementPoint,
    category: InvariantCategory,
    rule: InvariantRule,
) -> Invariant {
    Invariant {
        id: id.to_string(),
        title: title.to_string(),
        severity,
        enforcement,
        category,
        rule,
    }
}

fn standard_invariants() -> Vec<Invariant> {
    use EnforcementPoint::{Both, Build, Runtime};
    use InvariantCategory::{Any, Form, Layout, List};
    use Severity::{Error, Warn};

    vec![
        invariant(
            "layout.single-scroll",
            "Layouts have exactly one scroll container",
            Error,
            Build,
            Layout,
            InvariantRule::ExactlyOneScrollContainer,
        ),
        invariant(
            "form.single-default-section",
            "At most one form section is the default",
            Error,
            Build,
            Form,
            InvariantRule::AtMostOneDefaultSection,
        ),
        invariant(
            "form.unique-section-ids",
            "Form section and field ids are unique",
            Error,
            Build,
            Form,
            InvariantRule::UniqueSiblingIds,
        ),
        invariant(
            "layout.unique-node-ids",
            "Sibling layout nodes have unique ids",
            Error,
            Build,
            Layout,
            InvariantRule::UniqueSiblingIds,
        ),
        invariant(
            "list.unique-columns",
            "List columns are unique",
            Error,
            Build,
            List,
            InvariantRule::UniqueSiblingIds,
        ),
        invariant(
            "layout.spacing-grid",
            "Spacing values align to the spacing grid",
            Error,
            Build,
            Layout,
            InvariantRule::SpacingGrid { base: SPACING_BASE },
        ),
        invariant(
            "layout.grid-columns",
            "Grid column counts are canonical",
            Error,
            Build,
            Layout,
            InvariantRule::AllowedValues {
                attribute: NumericAttribute::GridColumns,
                allowed: GRID_COLUMNS.to_vec(),
            },
        ),
        invariant(
            "list.page-size",
            "List page sizes are canonical",
            Error,
            Build,
            List,
            InvariantRule::AllowedValues {
                attribute: NumericAttribute::PageSize,
                allowed: PAGE_SIZES.to_vec(),
            },
        ),
        invariant(
            "descriptor.actions-resolvable",
            "Action ids resolve in the action registry",
            Error,
            Both,
            Any,
            InvariantRule::ActionsResolvable,
        ),
        invariant(
            "descriptor.intents-resolvable",
            "Intent ids resolve in the intent registry",
            Error,
            Both,
            Any,
            InvariantRule::IntentsResolvable,
        ),
        invariant(
            "descriptor.invariants-resolvable",
            "Declared invariant ids resolve in the invariant registry",
            Error,
            Both,
            Any,
            InvariantRule::InvariantsResolvable,
        ),
        invariant(
            "form.required-fields",
            "Forms show every required entity field",
            Warn,
            Build,
            Form,
            InvariantRule::RequiredFieldsPresent,
        ),
        invariant(
            "form.submit-action",
            "Forms declare a submit action",
            Error,
            Runtime,
            Form,
            InvariantRule::SubmitActionDeclared,
        ),
    ]
}

//! Canonicalization: raw source + entity schema + registries -> descriptor.
//!
//! Canonicalization is all-or-nothing per source. The first structural
//! problem or unresolved reference aborts that source; callers aggregate
//! failures across sources.
//!
//! Derived attributes use total rules that depend only on the inputs, so the
//! same inputs always produce a byte-identical descriptor.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::descriptor::{
    CanonicalColumn, CanonicalDescriptor, CanonicalForm, CanonicalLayout, CanonicalList,
    CanonicalNode, CanonicalSection, ResolvedField, SortSpec, Widget, DEFAULT_PAGE_SIZE,
};
use crate::domain::entity::{snake_case, EntityIndex, EntitySchema, FieldSchema};
use crate::domain::error::SchemaError;
use crate::domain::raw::{
    DescriptorKey, RawFieldRef, RawForm, RawLayout, RawList, RawNode, RawSource, ValidatedSource,
};
use crate::domain::registry::{Registries, RegistryKind};
use crate::schema::validate_source;

/// Default number of columns for a form section.
pub const DEFAULT_SECTION_COLUMNS: u32 = 1;

/// Why a source could not be canonicalized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanonicalizeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("source names entity '{named}' but was resolved against '{schema}'")]
    EntityMismatch { named: String, schema: String },

    #[error("unknown field '{field}' on entity '{entity}' (referenced by {location})")]
    UnknownField {
        entity: String,
        field: String,
        location: String,
    },

    #[error("unknown {} id '{id}'", .kind.name())]
    UnknownReference { kind: RegistryKind, id: String },
}

/// Error class used as the stable prefix of reported failures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Schema,
    Reference,
}

impl ErrorClass {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorClass::Schema => "schema",
            ErrorClass::Reference => "reference",
        }
    }
}

impl CanonicalizeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CanonicalizeError::Schema(_) => ErrorClass::Schema,
            _ => ErrorClass::Reference,
        }
    }
}

/// Canonicalize a raw source against a specific entity schema.
///
/// # Errors
///
/// - `CanonicalizeError::Schema`: the document failed shape validation.
/// - `CanonicalizeError::EntityMismatch`: the source names another entity.
/// - `CanonicalizeError::UnknownField`: a referenced field is not on the entity.
/// - `CanonicalizeError::UnknownReference`: an action/intent/invariant id is
///   absent from its registry.
pub fn canonicalize(
    raw: &RawSource,
    entity: &EntitySchema,
    registries: Registries<'_>,
) -> Result<CanonicalDescriptor, CanonicalizeError> {
    let validated = validate_source(raw)?;
    if snake_case(validated.entity()) != entity.key() {
        return Err(CanonicalizeError::EntityMismatch {
            named: validated.entity().to_string(),
            schema: entity.name.clone(),
        });
    }
    resolve(raw, &validated, entity, registries)
}

/// Canonicalize a raw source, resolving its entity from an index first.
pub fn canonicalize_with_index(
    raw: &RawSource,
    index: &EntityIndex,
    registries: Registries<'_>,
) -> Result<CanonicalDescriptor, CanonicalizeError> {
    let validated = validate_source(raw)?;
    let entity = index
        .get(validated.entity())
        .ok_or_else(|| CanonicalizeError::UnknownEntity {
            entity: validated.entity().to_string(),
        })?;
    resolve(raw, &validated, entity, registries)
}

fn resolve(
    raw: &RawSource,
    validated: &ValidatedSource,
    entity: &EntitySchema,
    registries: Registries<'_>,
) -> Result<CanonicalDescriptor, CanonicalizeError> {
    let resolver = Resolver { entity, registries };
    let source = raw.origin();
    match validated {
        ValidatedSource::Form(form) => resolver.form(form, source).map(CanonicalDescriptor::Form),
        ValidatedSource::Layout(layout) => resolver
            .layout(layout, source)
            .map(CanonicalDescriptor::Layout),
        ValidatedSource::List(list) => resolver.list(list, source).map(CanonicalDescriptor::List),
    }
}

struct Resolver<'a> {
    entity: &'a EntitySchema,
    registries: Registries<'a>,
}

impl Resolver<'_> {
    fn field(&self, name: &str, location: &str) -> Result<&FieldSchema, CanonicalizeError> {
        self.entity
            .field(name)
            .ok_or_else(|| CanonicalizeError::UnknownField {
                entity: self.entity.name.clone(),
                field: name.to_string(),
                location: location.to_string(),
            })
    }

    fn check_ids(&self, kind: RegistryKind, ids: &[String]) -> Result<(), CanonicalizeError> {
        match ids.iter().find(|id| !self.registries.contains(kind, id)) {
            Some(id) => Err(CanonicalizeError::UnknownReference {
                kind,
                id: id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn title(&self, explicit: &Option<String>, variant: &str) -> String {
        explicit.clone().unwrap_or_else(|| {
            format!("{} {}", derive_label(&self.entity.name), derive_label(variant))
        })
    }

    fn form(&self, form: &RawForm, source: String) -> Result<CanonicalForm, CanonicalizeError> {
        let mut sections = Vec::with_capacity(form.sections.len());
        for section in &form.sections {
            let location = format!("section '{}'", section.id);
            let mut fields = Vec::with_capacity(section.fields.len());
            for field_ref in &section.fields {
                let schema = self.field(field_ref.field_name(), &location)?;
                fields.push(match field_ref {
                    RawFieldRef::Name(_) => resolve_field(schema, None, None, false),
                    RawFieldRef::Detailed(spec) => resolve_field(
                        schema,
                        spec.label.as_deref(),
                        spec.widget,
                        spec.readonly,
                    ),
                });
            }
            sections.push(CanonicalSection {
                id: section.id.clone(),
                title: section
                    .title
                    .clone()
                    .unwrap_or_else(|| derive_label(&section.id)),
                default: section.default,
                columns: section.columns.unwrap_or(DEFAULT_SECTION_COLUMNS),
                fields,
            });
        }

        self.check_ids(RegistryKind::Action, &form.actions)?;
        self.check_ids(RegistryKind::Intent, &form.intents)?;
        self.check_ids(RegistryKind::Invariant, &form.invariants)?;

        Ok(CanonicalForm {
            key: DescriptorKey::new(&self.entity.name, &form.variant),
            source,
            entity: self.entity.name.clone(),
            domain: self.entity.domain.clone(),
            title: self.title(&form.title, &form.variant),
            sections,
            required_fields: self
                .entity
                .required_fields()
                .map(|f| f.name.clone())
                .collect(),
            actions: form.actions.clone(),
            intents: form.intents.clone(),
            invariants: form.invariants.clone(),
        })
    }

    fn node(
        &self,
        node: &RawNode,
        actions: &mut Vec<String>,
    ) -> Result<CanonicalNode, CanonicalizeError> {
        let field = match &node.field {
            Some(name) => {
                let schema = self.field(name, &format!("node '{}'", node.id))?;
                Some(resolve_field(schema, None, None, false))
            }
            None => None,
        };
        if let Some(action) = &node.action {
            self.check_ids(RegistryKind::Action, std::slice::from_ref(action))?;
            if !actions.contains(action) {
                actions.push(action.clone());
            }
        }

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            children.push(self.node(child, actions)?);
        }

        Ok(CanonicalNode {
            id: node.id.clone(),
            role: node.role,
            field,
            action: node.action.clone(),
            columns: node.columns,
            spacing: node.spacing.unwrap_or_default(),
            children,
        })
    }

    fn layout(
        &self,
        layout: &RawLayout,
        source: String,
    ) -> Result<CanonicalLayout, CanonicalizeError> {
        let mut actions = Vec::new();
        let root = self.node(&layout.root, &mut actions)?;

        self.check_ids(RegistryKind::Intent, &layout.intents)?;
        self.check_ids(RegistryKind::Invariant, &layout.invariants)?;

        Ok(CanonicalLayout {
            key: DescriptorKey::new(&self.entity.name, &layout.variant),
            source,
            entity: self.entity.name.clone(),
            domain: self.entity.domain.clone(),
            title: self.title(&layout.title, &layout.variant),
            root,
            actions,
            intents: layout.intents.clone(),
            invariants: layout.invariants.clone(),
        })
    }

    fn list(&self, list: &RawList, source: String) -> Result<CanonicalList, CanonicalizeError> {
        let mut columns = Vec::with_capacity(list.columns.len());
        for column in &list.columns {
            let schema = self.field(&column.field, "columns")?;
            columns.push(CanonicalColumn {
                field: resolve_field(schema, column.label.as_deref(), None, true),
                sortable: column.sortable,
            });
        }
        let default_sort = match &list.default_sort {
            Some(sort) => {
                self.field(&sort.field, "default_sort")?;
                Some(SortSpec {
                    field: sort.field.clone(),
                    direction: sort.direction,
                })
            }
            None => None,
        };

        self.check_ids(RegistryKind::Action, &list.actions)?;
        self.check_ids(RegistryKind::Intent, &list.intents)?;
        self.check_ids(RegistryKind::Invariant, &list.invariants)?;

        Ok(CanonicalList {
            key: DescriptorKey::new(&self.entity.name, &list.variant),
            source,
            entity: self.entity.name.clone(),
            domain: self.entity.domain.clone(),
            title: self.title(&list.title, &list.variant),
            columns,
            default_sort,
            page_size: list.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            actions: list.actions.clone(),
            intents: list.intents.clone(),
            invariants: list.invariants.clone(),
        })
    }
}

/// Resolve an entity field for presentation, applying overrides.
pub fn resolve_field(
    schema: &FieldSchema,
    label: Option<&str>,
    widget: Option<Widget>,
    readonly: bool,
) -> ResolvedField {
    ResolvedField {
        name: schema.name.clone(),
        field_type: schema.field_type.clone(),
        required: schema.is_required(),
        label: label
            .map(str::to_string)
            .unwrap_or_else(|| derive_label(&schema.name)),
        widget: widget.unwrap_or_else(|| Widget::default_for(schema)),
        readonly,
    }
}

fn camel_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"))
}

/// Derive a display label from an identifier.
///
/// Inserts a space before each capital that follows a lowercase letter or
/// digit, treats `_` and `-` as spaces, and capitalizes every word:
/// `firstName` -> `First Name`, `created_at` -> `Created At`.
pub fn derive_label(name: &str) -> String {
    let spaced = camel_boundary_re().replace_all(name, "$1 $2");
    spaced
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::FieldType;
    use crate::domain::raw::SourceKind;
    use crate::domain::registry::StaticRegistry;
    use serde_json::json;

    fn entity() -> EntitySchema {
        serde_json::from_value(json!({
            "name": "User",
            "domain": "identity",
            "fields": [
                { "name": "firstName", "type": { "kind": "string" } },
                { "name": "bio", "type": { "kind": "text" }, "optional": true }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_derive_label() {
        assert_eq!(derive_label("firstName"), "First Name");
        assert_eq!(derive_label("created_at"), "Created At");
        assert_eq!(derive_label("last-login_at"), "Last Login At");
        assert_eq!(derive_label("page2Size"), "Page2 Size");
        assert_eq!(derive_label("userID"), "User ID");
        assert_eq!(derive_label("profile"), "Profile");
        assert_eq!(derive_label(""), "");
    }

    #[test]
    fn test_resolve_field_defaults() {
        let entity = entity();
        let field = resolve_field(entity.field("firstName").unwrap(), None, None, false);
        assert_eq!(field.label, "First Name");
        assert_eq!(field.widget, Widget::TextInput);
        assert!(field.required);
        assert_eq!(field.field_type, FieldType::String);
    }

    #[test]
    fn test_entity_mismatch() {
        let empty = StaticRegistry::default();
        let registries = Registries::new(&empty, &empty, &empty);
        let raw = RawSource::new(
            "account.edit.form.json",
            SourceKind::Form,
            DescriptorKey::new("account", "edit"),
            json!({
                "kind": "form",
                "entity": "Account",
                "variant": "edit",
                "sections": [{ "id": "main", "fields": ["firstName"] }]
            }),
        );
        let err = canonicalize(&raw, &entity(), registries).unwrap_err();
        assert!(matches!(err, CanonicalizeError::EntityMismatch { .. }));
        assert_eq!(err.class(), ErrorClass::Reference);
    }

    #[test]
    fn test_error_display_names_offender() {
        let err = CanonicalizeError::UnknownReference {
            kind: RegistryKind::Intent,
            id: "navigate.nowhere".to_string(),
        };
        assert_eq!(err.to_string(), "unknown intent id 'navigate.nowhere'");
    }
}

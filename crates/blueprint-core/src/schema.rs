//! Shape validation for raw sources.
//!
//! Checks that a [`RawSource`] document is a well-formed `form`, `layout` or
//! `list` before any cross-reference is resolved. Nothing here consults the
//! entity collection or the registries.
//!
//! Checks, in order:
//! 1. The document is an object with a known, non-empty `kind`.
//! 2. The declared kind matches the kind inferred from the file name.
//! 3. All required top-level fields are present.
//! 4. The document deserializes into the closed typed shape.
//! 5. Identifiers are well-formed and collections are non-empty.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::error::SchemaError;
use crate::domain::raw::{
    RawForm, RawLayout, RawList, RawNode, RawSource, SourceKind, ValidatedSource,
};
use crate::domain::{snake_case, NodeRole};

/// Required top-level fields per source kind.
pub const REQUIRED_FIELDS: &[(SourceKind, &[&str])] = &[
    (SourceKind::Form, &["entity", "variant", "sections"]),
    (SourceKind::Layout, &["entity", "variant", "root"]),
    (SourceKind::List, &["entity", "variant", "columns"]),
];

fn entity_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("static regex"))
}

fn local_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("static regex"))
}

fn registry_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_-]*(\.[a-z0-9_-]+)*$").expect("static regex")
    })
}

/// Validate the shape of a raw source.
///
/// # Errors
///
/// - `SchemaError::NotAnObject`: the document is not a JSON object.
/// - `SchemaError::MissingField`: `kind` or a required field is absent.
/// - `SchemaError::UnknownKind`: `kind` is not one of the closed kinds.
/// - `SchemaError::KindMismatch`: file name and document disagree on kind.
/// - `SchemaError::Malformed`: the document does not fit the typed shape.
/// - `SchemaError::InvalidIdentifier` / `SchemaError::Empty`: content checks.
pub fn validate_source(raw: &RawSource) -> Result<ValidatedSource, SchemaError> {
    let object = raw.document.as_object().ok_or(SchemaError::NotAnObject)?;

    let kind = object
        .get("kind")
        .and_then(|k| k.as_str())
        .ok_or_else(|| SchemaError::MissingField {
            field: "kind".to_string(),
        })?;
    let declared: SourceKind = kind.parse().map_err(|_| SchemaError::UnknownKind {
        kind: kind.to_string(),
    })?;
    if declared != raw.kind {
        return Err(SchemaError::KindMismatch {
            expected: raw.kind.to_string(),
            actual: declared.to_string(),
        });
    }

    if let Some((_, required)) = REQUIRED_FIELDS.iter().find(|(k, _)| *k == declared) {
        for &field in *required {
            if !object.contains_key(field) {
                return Err(SchemaError::MissingField {
                    field: field.to_string(),
                });
            }
        }
    }

    let validated = match declared {
        SourceKind::Form => ValidatedSource::Form(parse_typed(raw, declared)?),
        SourceKind::Layout => ValidatedSource::Layout(parse_typed(raw, declared)?),
        SourceKind::List => ValidatedSource::List(parse_typed(raw, declared)?),
    };

    check_entity_and_variant(raw, &validated)?;
    match &validated {
        ValidatedSource::Form(form) => check_form(form)?,
        ValidatedSource::Layout(layout) => check_layout(layout)?,
        ValidatedSource::List(list) => check_list(list)?,
    }

    Ok(validated)
}

fn parse_typed<T: serde::de::DeserializeOwned>(
    raw: &RawSource,
    kind: SourceKind,
) -> Result<T, SchemaError> {
    serde_json::from_value(raw.document.clone()).map_err(|e| SchemaError::Malformed {
        kind: kind.to_string(),
        message: e.to_string(),
    })
}

fn invalid(what: &str, value: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidIdentifier {
        what: what.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_entity_and_variant(raw: &RawSource, source: &ValidatedSource) -> Result<(), SchemaError> {
    let entity = source.entity();
    if !entity_name_re().is_match(entity) {
        return Err(invalid("entity name", entity, "must be an identifier"));
    }
    let variant = source.variant();
    if !local_id_re().is_match(variant) {
        return Err(invalid(
            "variant",
            variant,
            "must be lowercase letters, digits, '_' or '-'",
        ));
    }
    if snake_case(entity) != raw.key.entity() || snake_case(variant) != raw.key.variant() {
        return Err(invalid(
            "descriptor key",
            &format!("{}.{}", snake_case(entity), snake_case(variant)),
            &format!("does not match file name key '{}'", raw.key),
        ));
    }
    Ok(())
}

fn check_local_id(what: &str, id: &str) -> Result<(), SchemaError> {
    if local_id_re().is_match(id) {
        Ok(())
    } else {
        Err(invalid(what, id, "must be lowercase letters, digits, '_' or '-'"))
    }
}

fn check_registry_ids(what: &str, ids: &[String]) -> Result<(), SchemaError> {
    for id in ids {
        if !registry_id_re().is_match(id) {
            return Err(invalid(what, id, "must be a dotted lowercase id"));
        }
    }
    Ok(())
}

fn check_form(form: &RawForm) -> Result<(), SchemaError> {
    if form.sections.is_empty() {
        return Err(SchemaError::Empty {
            what: "sections".to_string(),
        });
    }
    for section in &form.sections {
        check_local_id("section id", &section.id)?;
        if section.fields.is_empty() {
            return Err(SchemaError::Empty {
                what: format!("section '{}' fields", section.id),
            });
        }
        for field in &section.fields {
            if field.field_name().is_empty() {
                return Err(SchemaError::Empty {
                    what: format!("field reference in section '{}'", section.id),
                });
            }
        }
    }
    check_registry_ids("action id", &form.actions)?;
    check_registry_ids("intent id", &form.intents)?;
    check_registry_ids("invariant id", &form.invariants)
}

fn check_layout(layout: &RawLayout) -> Result<(), SchemaError> {
    check_node(&layout.root)?;
    check_registry_ids("intent id", &layout.intents)?;
    check_registry_ids("invariant id", &layout.invariants)
}

fn check_node(node: &RawNode) -> Result<(), SchemaError> {
    check_local_id("node id", &node.id)?;

    let malformed = |message: String| SchemaError::Malformed {
        kind: SourceKind::Layout.to_string(),
        message,
    };
    match node.role {
        NodeRole::Field if node.field.is_none() => {
            return Err(malformed(format!("field node '{}' has no field", node.id)));
        }
        NodeRole::Action if node.action.is_none() => {
            return Err(malformed(format!(
                "action node '{}' has no action",
                node.id
            )));
        }
        NodeRole::Field | NodeRole::Action if !node.children.is_empty() => {
            return Err(malformed(format!(
                "leaf node '{}' must not have children",
                node.id
            )));
        }
        _ => {}
    }
    if node.field.is_some() && node.role != NodeRole::Field {
        return Err(malformed(format!(
            "only field nodes may reference a field ('{}')",
            node.id
        )));
    }
    if let Some(action) = &node.action {
        if node.role != NodeRole::Action {
            return Err(malformed(format!(
                "only action nodes may reference an action ('{}')",
                node.id
            )));
        }
        check_registry_ids("action id", std::slice::from_ref(action))?;
    }

    for child in &node.children {
        check_node(child)?;
    }
    Ok(())
}

fn check_list(list: &RawList) -> Result<(), SchemaError> {
    if list.columns.is_empty() {
        return Err(SchemaError::Empty {
            what: "columns".to_string(),
        });
    }
    if list.columns.iter().any(|c| c.field.is_empty()) {
        return Err(SchemaError::Empty {
            what: "column field".to_string(),
        });
    }
    check_registry_ids("action id", &list.actions)?;
    check_registry_ids("intent id", &list.intents)?;
    check_registry_ids("invariant id", &list.invariants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::raw::DescriptorKey;
    use serde_json::json;

    fn raw(kind: SourceKind, document: serde_json::Value) -> RawSource {
        RawSource::new(
            format!("user.edit.{kind}.json"),
            kind,
            DescriptorKey::new("user", "edit"),
            document,
        )
    }

    fn form_doc() -> serde_json::Value {
        json!({
            "kind": "form",
            "entity": "User",
            "variant": "edit",
            "sections": [{ "id": "profile", "fields": ["name", { "field": "bio", "readonly": true }] }],
            "actions": ["user.save"]
        })
    }

    #[test]
    fn test_valid_form_passes() {
        let validated = validate_source(&raw(SourceKind::Form, form_doc())).unwrap();
        assert_eq!(validated.kind(), SourceKind::Form);
        assert_eq!(validated.entity(), "User");
    }

    #[test]
    fn test_non_object_rejected() {
        let err = validate_source(&raw(SourceKind::Form, json!(["form"]))).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject);
    }

    #[test]
    fn test_missing_kind_rejected() {
        let mut doc = form_doc();
        doc.as_object_mut().unwrap().remove("kind");
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                field: "kind".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut doc = form_doc();
        doc["kind"] = json!("chart");
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownKind { kind } if kind == "chart"));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let err = validate_source(&raw(SourceKind::Layout, form_doc())).unwrap_err();
        assert!(matches!(err, SchemaError::KindMismatch { .. }));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let mut doc = form_doc();
        doc.as_object_mut().unwrap().remove("sections");
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                field: "sections".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut doc = form_doc();
        doc["colour"] = json!("blue");
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        match err {
            SchemaError::Malformed { kind, message } => {
                assert_eq!(kind, "form");
                assert!(message.contains("colour"));
            }
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_key_must_match_file_name() {
        let mut doc = form_doc();
        doc["variant"] = json!("create");
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_empty_sections_rejected() {
        let mut doc = form_doc();
        doc["sections"] = json!([]);
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        assert!(matches!(err, SchemaError::Empty { .. }));
    }

    #[test]
    fn test_bad_action_id_rejected() {
        let mut doc = form_doc();
        doc["actions"] = json!(["User Save"]);
        let err = validate_source(&raw(SourceKind::Form, doc)).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier { what, .. } if what == "action id"));
    }

    #[test]
    fn test_layout_field_node_requires_field() {
        let doc = json!({
            "kind": "layout",
            "entity": "User",
            "variant": "edit",
            "root": {
                "id": "root",
                "role": "scroll",
                "children": [{ "id": "email", "role": "field" }]
            }
        });
        let err = validate_source(&raw(SourceKind::Layout, doc)).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { message, .. } if message.contains("email")));
    }

    #[test]
    fn test_valid_list_passes() {
        let doc = json!({
            "kind": "list",
            "entity": "User",
            "variant": "edit",
            "columns": [{ "field": "name", "sortable": true }],
            "default_sort": { "field": "name", "direction": "desc" },
            "page_size": 50
        });
        let validated = validate_source(&raw(SourceKind::List, doc)).unwrap();
        assert_eq!(validated.kind(), SourceKind::List);
    }
}

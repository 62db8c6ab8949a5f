use blueprint_core::domain::descriptor::Widget;
use blueprint_core::{
    canonicalize, canonicalize_with_index, CanonicalDescriptor, CanonicalizeError, EntityIndex,
    EntitySchema, ErrorClass, RawSource, Registries, RegistryKind, StaticRegistry,
};
use serde_json::json;

fn user() -> EntitySchema {
    serde_json::from_value(json!({
        "name": "User",
        "domain": "identity",
        "fields": [
            { "name": "firstName", "type": { "kind": "string" } },
            { "name": "bio", "type": { "kind": "text" }, "nullable": true },
            { "name": "created_at", "type": { "kind": "datetime" }, "optional": true }
        ],
        "capabilities": ["user.save"]
    }))
    .unwrap()
}

fn registries() -> (StaticRegistry, StaticRegistry, StaticRegistry) {
    (
        StaticRegistry::new(["user.save", "user.cancel"]),
        StaticRegistry::new(["user.edit"]),
        StaticRegistry::new(["form.unique-section-ids"]),
    )
}

fn form_source(document: serde_json::Value) -> RawSource {
    RawSource::from_file_name("sources/user.edit.form.json", document).unwrap()
}

fn edit_form(fields: serde_json::Value) -> serde_json::Value {
    json!({
        "kind": "form",
        "entity": "User",
        "variant": "edit",
        "sections": [
            { "id": "profile", "default": true, "fields": fields }
        ],
        "actions": ["user.save"],
        "intents": ["user.edit"],
        "invariants": ["form.unique-section-ids"]
    })
}

#[test]
fn missing_field_is_reference_error_naming_field() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let raw = form_source(edit_form(json!(["firstName", "email"])));

    let err = canonicalize(&raw, &user(), regs).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Reference);
    match &err {
        CanonicalizeError::UnknownField { field, entity, .. } => {
            assert_eq!(field, "email");
            assert_eq!(entity, "User");
        }
        other => panic!("expected UnknownField, got {other:?}"),
    }
    assert!(err.to_string().contains("'email'"));
}

#[test]
fn canonicalization_is_deterministic() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let raw = form_source(edit_form(json!(["firstName", { "field": "bio", "readonly": true }])));

    let a = canonicalize(&raw, &user(), regs).unwrap();
    let b = canonicalize(&raw, &user(), regs).unwrap();
    assert_eq!(a.to_canonical_json().unwrap(), b.to_canonical_json().unwrap());
    assert_eq!(a.digest().unwrap(), b.digest().unwrap());
}

#[test]
fn defaults_are_derived() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let raw = form_source(edit_form(json!(["firstName", "bio", "created_at"])));

    let CanonicalDescriptor::Form(form) = canonicalize(&raw, &user(), regs).unwrap() else {
        panic!("expected form");
    };
    assert_eq!(form.title, "User Edit");
    assert_eq!(form.required_fields, vec!["firstName".to_string()]);

    let section = &form.sections[0];
    assert_eq!(section.columns, 1);
    let first = &section.fields[0];
    assert_eq!(first.label, "First Name");
    assert_eq!(first.widget, Widget::TextInput);
    assert!(first.required);
    assert_eq!(section.fields[1].widget, Widget::TextArea);
    assert!(!section.fields[1].required);
    assert_eq!(section.fields[2].widget, Widget::DateTimePicker);
    assert_eq!(section.fields[2].label, "Created At");
}

#[test]
fn unknown_action_names_id() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let mut document = edit_form(json!(["firstName"]));
    document["actions"] = json!(["user.archive"]);

    let err = canonicalize(&form_source(document), &user(), regs).unwrap_err();
    assert_eq!(
        err,
        CanonicalizeError::UnknownReference {
            kind: RegistryKind::Action,
            id: "user.archive".to_string()
        }
    );
}

#[test]
fn index_lookup_accepts_snake_case_entity() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let index = EntityIndex::new(&[user()]);
    let mut document = edit_form(json!(["firstName"]));
    document["entity"] = json!("user");

    let descriptor = canonicalize_with_index(&form_source(document), &index, regs).unwrap();
    assert_eq!(descriptor.entity(), "User");
    assert_eq!(descriptor.key().to_string(), "user.edit");
}

#[test]
fn index_lookup_unknown_entity() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let raw = RawSource::from_file_name(
        "sources/account.edit.form.json",
        json!({
            "kind": "form",
            "entity": "Account",
            "variant": "edit",
            "sections": [{ "id": "main", "fields": ["name"] }]
        }),
    )
    .unwrap();

    let err = canonicalize_with_index(&raw, &EntityIndex::new(&[user()]), regs).unwrap_err();
    assert!(matches!(err, CanonicalizeError::UnknownEntity { entity } if entity == "Account"));
}

#[test]
fn malformed_source_is_schema_error() {
    let (actions, intents, invariants) = registries();
    let regs = Registries::new(&actions, &intents, &invariants);
    let mut document = edit_form(json!(["firstName"]));
    document["colour"] = json!("blue");

    let err = canonicalize(&form_source(document), &user(), regs).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Schema);
}

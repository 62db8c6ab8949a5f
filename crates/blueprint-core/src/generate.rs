//! Generator seam and the reference generators.
//!
//! A generator is a pure function from an entity (or a canonical descriptor
//! plus its entity) to text. The pipeline owns paths, banners and writing;
//! generators only produce deterministic content.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::descriptor::CanonicalDescriptor;
use crate::domain::entity::{snake_case, EntitySchema, FieldConstraint, FieldSchema, FieldType};
use crate::domain::error::BlueprintError;
use crate::domain::raw::DescriptorKey;

/// Kind of generated artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Validation,
    Migration,
    UiDescriptor,
}

impl ArtifactKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Validation => "validation",
            ArtifactKind::Migration => "migration",
            ArtifactKind::UiDescriptor => "ui_descriptor",
        }
    }

    /// Whether the artifact is produced once per entity rather than once per
    /// descriptor.
    pub fn is_entity_level(&self) -> bool {
        !matches!(self, ArtifactKind::UiDescriptor)
    }

    /// Target path of an entity-level artifact, relative to the output root.
    pub fn entity_target(&self, entity_key: &str) -> PathBuf {
        let mut path = PathBuf::from(self.dir());
        path.push(match self {
            ArtifactKind::Validation => format!("{entity_key}.validation.ts"),
            ArtifactKind::Migration => format!("{entity_key}.sql"),
            ArtifactKind::UiDescriptor => format!("{entity_key}.ts"),
        });
        path
    }

    /// Target path of a descriptor-level artifact, relative to the output root.
    pub fn descriptor_target(&self, key: &DescriptorKey, kind: &str) -> PathBuf {
        PathBuf::from(self.dir())
            .join(key.entity())
            .join(format!("{}.{}.ts", key.variant(), kind))
    }

    fn dir(&self) -> &'static str {
        match self {
            ArtifactKind::Validation => "validation",
            ArtifactKind::Migration => "migrations",
            ArtifactKind::UiDescriptor => "ui",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a generator renders.
#[derive(Debug, Clone, Copy)]
pub enum GeneratorInput<'a> {
    Entity(&'a EntitySchema),
    Descriptor(&'a CanonicalDescriptor, &'a EntitySchema),
}

impl GeneratorInput<'_> {
    fn describe(&self) -> String {
        match self {
            GeneratorInput::Entity(entity) => format!("entity {}", entity.name),
            GeneratorInput::Descriptor(descriptor, _) => {
                format!("{} {}", descriptor.kind(), descriptor.key())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("{artifact} generator does not accept {input}")]
    Unsupported {
        artifact: ArtifactKind,
        input: String,
    },

    #[error("{0}")]
    Render(String),

    #[error(transparent)]
    Domain(#[from] BlueprintError),
}

/// A pure `input -> text` function for one artifact kind.
pub trait Generator: Send + Sync {
    fn artifact(&self) -> ArtifactKind;

    /// Render deterministic text. Identical input must yield identical text.
    fn render(&self, input: GeneratorInput<'_>) -> Result<String, GeneratorError>;
}

fn unsupported(artifact: ArtifactKind, input: &GeneratorInput<'_>) -> GeneratorError {
    GeneratorError::Unsupported {
        artifact,
        input: input.describe(),
    }
}

/// The reference generator set.
pub fn reference_generators() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(ValidationGenerator),
        Box::new(MigrationGenerator),
        Box::new(UiDescriptorGenerator),
    ]
}

/// Descriptor -> TypeScript module exporting the canonical JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct UiDescriptorGenerator;

impl Generator for UiDescriptorGenerator {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::UiDescriptor
    }

    fn render(&self, input: GeneratorInput<'_>) -> Result<String, GeneratorError> {
        let GeneratorInput::Descriptor(descriptor, _) = input else {
            return Err(unsupported(self.artifact(), &input));
        };
        let json = descriptor.to_canonical_json()?;
        let digest = descriptor.digest()?;
        Ok(format!(
            "export const digest = \"{digest}\";\n\
             \n\
             export const descriptor = {json} as const;\n\
             \n\
             export default descriptor;\n"
        ))
    }
}

/// Entity -> minimal `CREATE TABLE` statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationGenerator;

impl MigrationGenerator {
    fn column(field: &FieldSchema) -> String {
        let name = snake_case(&field.name);
        let sql_type = match &field.field_type {
            FieldType::String => format!("VARCHAR({})", field.max_length().unwrap_or(255)),
            FieldType::Text => "TEXT".to_string(),
            FieldType::Integer => "BIGINT".to_string(),
            FieldType::Decimal => "NUMERIC".to_string(),
            FieldType::Boolean => "BOOLEAN".to_string(),
            FieldType::Date => "DATE".to_string(),
            FieldType::Datetime => "TIMESTAMPTZ".to_string(),
            FieldType::Email => "VARCHAR(320)".to_string(),
            FieldType::Enum { .. } => "TEXT".to_string(),
            FieldType::Reference { entity } => {
                format!("BIGINT REFERENCES {}(id)", snake_case(entity))
            }
            FieldType::Json => "JSONB".to_string(),
        };

        let mut column = format!("{name} {sql_type}");
        if field.is_required() {
            column.push_str(" NOT NULL");
        }
        if field
            .constraints
            .iter()
            .any(|c| matches!(c, FieldConstraint::Unique))
        {
            column.push_str(" UNIQUE");
        }
        if let FieldType::Enum { values } = &field.field_type {
            let quoted: Vec<String> = values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect();
            column.push_str(&format!(" CHECK ({name} IN ({}))", quoted.join(", ")));
        }
        column
    }
}

impl Generator for MigrationGenerator {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::Migration
    }

    fn render(&self, input: GeneratorInput<'_>) -> Result<String, GeneratorError> {
        let GeneratorInput::Entity(entity) = input else {
            return Err(unsupported(self.artifact(), &input));
        };

        let mut columns = Vec::with_capacity(entity.fields.len() + 1);
        if entity.field("id").is_none() {
            columns.push("id BIGSERIAL PRIMARY KEY".to_string());
        }
        columns.extend(entity.fields.iter().map(Self::column));

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            entity.key(),
            columns.join(",\n    ")
        ))
    }
}

/// Entity -> TypeScript validation rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationGenerator;

impl ValidationGenerator {
    fn rules(field: &FieldSchema) -> Value {
        let mut rule = Map::new();
        rule.insert("type".into(), json!(field.field_type.name()));
        rule.insert("required".into(), json!(field.is_required()));
        rule.insert("nullable".into(), json!(field.nullable));
        match &field.field_type {
            FieldType::Enum { values } => {
                rule.insert("values".into(), json!(values));
            }
            FieldType::Reference { entity } => {
                rule.insert("references".into(), json!(entity));
            }
            _ => {}
        }
        for constraint in &field.constraints {
            let (key, value) = match constraint {
                FieldConstraint::MinLength { value } => ("minLength", json!(value)),
                FieldConstraint::MaxLength { value } => ("maxLength", json!(value)),
                FieldConstraint::Min { value } => ("min", json!(value)),
                FieldConstraint::Max { value } => ("max", json!(value)),
                FieldConstraint::Pattern { regex } => ("pattern", json!(regex)),
                FieldConstraint::Unique => ("unique", json!(true)),
            };
            rule.insert(key.into(), value);
        }
        Value::Object(rule)
    }
}

impl Generator for ValidationGenerator {
    fn artifact(&self) -> ArtifactKind {
        ArtifactKind::Validation
    }

    fn render(&self, input: GeneratorInput<'_>) -> Result<String, GeneratorError> {
        let GeneratorInput::Entity(entity) = input else {
            return Err(unsupported(self.artifact(), &input));
        };

        let mut table = Map::new();
        for field in &entity.fields {
            table.insert(field.name.clone(), Self::rules(field));
        }
        let body = serde_json::to_string_pretty(&Value::Object(table))
            .map_err(|e| GeneratorError::Render(e.to_string()))?;

        Ok(format!(
            "export const {}Rules = {} as const;\n",
            lower_camel(&entity.name),
            body
        ))
    }
}

/// `UserProfile` / `user_profile` -> `userProfile`.
fn lower_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, part) in snake_case(name).split('_').filter(|p| !p.is_empty()).enumerate() {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            if i == 0 {
                out.push(first);
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> EntitySchema {
        serde_json::from_value(json!({
            "name": "UserProfile",
            "domain": "identity",
            "fields": [
                { "name": "email", "type": { "kind": "email" },
                  "constraints": [{ "type": "unique" }] },
                { "name": "displayName", "type": { "kind": "string" }, "optional": true,
                  "constraints": [{ "type": "max_length", "value": 80 }] },
                { "name": "role", "type": { "kind": "enum", "values": ["admin", "member"] } }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_entity_targets() {
        assert_eq!(
            ArtifactKind::Migration.entity_target("user_profile"),
            PathBuf::from("migrations/user_profile.sql")
        );
        assert_eq!(
            ArtifactKind::UiDescriptor
                .descriptor_target(&DescriptorKey::new("UserProfile", "edit"), "form"),
            PathBuf::from("ui/user_profile/edit.form.ts")
        );
        assert!(!ArtifactKind::UiDescriptor.is_entity_level());
    }

    #[test]
    fn test_every_artifact_kind_has_a_reference_generator() {
        let kinds: Vec<ArtifactKind> =
            reference_generators().iter().map(|g| g.artifact()).collect();
        assert_eq!(
            kinds,
            vec![
                ArtifactKind::Validation,
                ArtifactKind::Migration,
                ArtifactKind::UiDescriptor
            ]
        );
        for name in ["service", "routes", "tests"] {
            assert!(serde_json::from_value::<ArtifactKind>(json!(name)).is_err());
        }
    }

    #[test]
    fn test_migration_renders_columns() {
        let sql = MigrationGenerator.render(GeneratorInput::Entity(&user())).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS user_profile (\n"));
        assert!(sql.contains("id BIGSERIAL PRIMARY KEY"));
        assert!(sql.contains("email VARCHAR(320) NOT NULL UNIQUE"));
        assert!(sql.contains("display_name VARCHAR(80),"));
        assert!(sql.contains("role TEXT NOT NULL CHECK (role IN ('admin', 'member'))"));
    }

    #[test]
    fn test_validation_is_deterministic() {
        let entity = user();
        let a = ValidationGenerator.render(GeneratorInput::Entity(&entity)).unwrap();
        let b = ValidationGenerator.render(GeneratorInput::Entity(&entity)).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("export const userProfileRules = {"));
        assert!(a.contains("\"maxLength\": 80"));
    }

    #[test]
    fn test_entity_generator_rejects_descriptor_input() {
        let entity = user();
        let err = UiDescriptorGenerator
            .render(GeneratorInput::Entity(&entity))
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Unsupported { artifact: ArtifactKind::UiDescriptor, .. }));
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("UserProfile"), "userProfile");
        assert_eq!(lower_camel("user"), "user");
    }
}

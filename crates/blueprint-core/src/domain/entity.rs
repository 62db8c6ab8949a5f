//! Entity schemas: the pre-resolved description of a domain entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Type of an entity field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Email,
    Enum { values: Vec<String> },
    Reference { entity: String },
    Json,
}

impl FieldType {
    /// Short type name used in diagnostics and generated output.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Email => "email",
            FieldType::Enum { .. } => "enum",
            FieldType::Reference { .. } => "reference",
            FieldType::Json => "json",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Decimal)
    }
}

/// Constraint attached to an entity field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldConstraint {
    MinLength { value: u32 },
    MaxLength { value: u32 },
    Min { value: f64 },
    Max { value: f64 },
    Pattern { regex: String },
    Unique,
}

/// A single field of an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub constraints: Vec<FieldConstraint>,
}

impl FieldSchema {
    /// A field is required when it may be neither null nor omitted.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.optional
    }

    /// Maximum length constraint, if declared.
    pub fn max_length(&self) -> Option<u32> {
        self.constraints.iter().find_map(|c| match c {
            FieldConstraint::MaxLength { value } => Some(*value),
            _ => None,
        })
    }
}

/// HTTP endpoint exposed for an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub method: String,
    pub path: String,

    /// Action id the endpoint performs, checked against the action registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Canonical description of a domain entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySchema {
    /// PascalCase entity name (e.g. `UserProfile`).
    pub name: String,

    /// Owning domain (e.g. `identity`).
    pub domain: String,

    #[serde(default)]
    pub fields: Vec<FieldSchema>,

    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// Action ids this entity requires.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Lookup key of the entity (`UserProfile` -> `user_profile`).
    pub fn key(&self) -> String {
        snake_case(&self.name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.is_required())
    }
}

/// Entities indexed by their snake_case key.
///
/// Lookups accept either the PascalCase name or the snake_case key.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    entities: BTreeMap<String, EntitySchema>,
}

impl EntityIndex {
    /// Build an index. On duplicate keys the first entity is kept; duplicates
    /// are reported by the entity validation phase, not here.
    pub fn new(entities: &[EntitySchema]) -> Self {
        let mut map = BTreeMap::new();
        for entity in entities {
            map.entry(entity.key()).or_insert_with(|| entity.clone());
        }
        Self { entities: map }
    }

    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(&snake_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in key order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }
}

/// Convert `UserProfile` / `userProfile` / `user-profile` to `user_profile`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

//! Canonical descriptors: fully-resolved, reference-checked artifact shapes.
//!
//! A canonical descriptor contains no unresolved references. Every entity,
//! field, action, intent and invariant it names has been checked against the
//! corresponding registry by the canonicalizer.

use serde::{Deserialize, Serialize};

use super::digest;
use super::entity::{FieldSchema, FieldType};
use super::error::Result;
use super::raw::{DescriptorKey, SourceKind};

/// Presentation widget for a field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    TextInput,
    TextArea,
    NumberInput,
    Checkbox,
    DatePicker,
    DateTimePicker,
    EmailInput,
    Select,
    EntityPicker,
    CodeEditor,
}

/// String fields longer than this default to a text area.
pub const LONG_TEXT_THRESHOLD: u32 = 255;

impl Widget {
    /// Default widget for a field, derived from its type alone.
    pub fn default_for(field: &FieldSchema) -> Self {
        match &field.field_type {
            FieldType::String => match field.max_length() {
                Some(max) if max > LONG_TEXT_THRESHOLD => Widget::TextArea,
                _ => Widget::TextInput,
            },
            FieldType::Text => Widget::TextArea,
            FieldType::Integer | FieldType::Decimal => Widget::NumberInput,
            FieldType::Boolean => Widget::Checkbox,
            FieldType::Date => Widget::DatePicker,
            FieldType::Datetime => Widget::DateTimePicker,
            FieldType::Email => Widget::EmailInput,
            FieldType::Enum { .. } => Widget::Select,
            FieldType::Reference { .. } => Widget::EntityPicker,
            FieldType::Json => Widget::CodeEditor,
        }
    }
}

/// An entity field resolved for presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub label: String,
    pub widget: Widget,
    pub readonly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalSection {
    pub id: String,
    pub title: String,
    pub default: bool,
    pub columns: u32,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalForm {
    pub key: DescriptorKey,
    pub source: String,
    pub entity: String,
    pub domain: String,
    pub title: String,
    pub sections: Vec<CanonicalSection>,
    /// Names of entity fields that are neither nullable nor optional.
    pub required_fields: Vec<String>,
    pub actions: Vec<String>,
    pub intents: Vec<String>,
    pub invariants: Vec<String>,
}

/// Role of a layout node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Stack,
    Grid,
    Scroll,
    Panel,
    Field,
    Action,
}

/// Spacing values of a layout node, in pixels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Spacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
}

impl Spacing {
    /// Declared values as `(attribute, value)` pairs in a fixed order.
    pub fn values(&self) -> Vec<(&'static str, u32)> {
        [("gap", self.gap), ("padding", self.padding), ("margin", self.margin)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalNode {
    pub id: String,
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<ResolvedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    pub spacing: Spacing,
    pub children: Vec<CanonicalNode>,
}

impl CanonicalNode {
    /// Depth-first walk over this node and its descendants.
    pub fn walk(&self) -> Vec<&CanonicalNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalLayout {
    pub key: DescriptorKey,
    pub source: String,
    pub entity: String,
    pub domain: String,
    pub title: String,
    pub root: CanonicalNode,
    /// Action ids referenced by action nodes, in first-occurrence order.
    pub actions: Vec<String>,
    pub intents: Vec<String>,
    pub invariants: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalColumn {
    pub field: ResolvedField,
    pub sortable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Default list page size when a source does not declare one.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalList {
    pub key: DescriptorKey,
    pub source: String,
    pub entity: String,
    pub domain: String,
    pub title: String,
    pub columns: Vec<CanonicalColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<SortSpec>,
    pub page_size: u32,
    pub actions: Vec<String>,
    pub intents: Vec<String>,
    pub invariants: Vec<String>,
}

/// A fully-resolved descriptor ready for code generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalDescriptor {
    Form(CanonicalForm),
    Layout(CanonicalLayout),
    List(CanonicalList),
}

impl CanonicalDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            CanonicalDescriptor::Form(_) => SourceKind::Form,
            CanonicalDescriptor::Layout(_) => SourceKind::Layout,
            CanonicalDescriptor::List(_) => SourceKind::List,
        }
    }

    pub fn key(&self) -> &DescriptorKey {
        match self {
            CanonicalDescriptor::Form(d) => &d.key,
            CanonicalDescriptor::Layout(d) => &d.key,
            CanonicalDescriptor::List(d) => &d.key,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            CanonicalDescriptor::Form(d) => &d.source,
            CanonicalDescriptor::Layout(d) => &d.source,
            CanonicalDescriptor::List(d) => &d.source,
        }
    }

    /// PascalCase name of the resolved entity.
    pub fn entity(&self) -> &str {
        match self {
            CanonicalDescriptor::Form(d) => &d.entity,
            CanonicalDescriptor::Layout(d) => &d.entity,
            CanonicalDescriptor::List(d) => &d.entity,
        }
    }

    pub fn actions(&self) -> &[String] {
        match self {
            CanonicalDescriptor::Form(d) => &d.actions,
            CanonicalDescriptor::Layout(d) => &d.actions,
            CanonicalDescriptor::List(d) => &d.actions,
        }
    }

    pub fn intents(&self) -> &[String] {
        match self {
            CanonicalDescriptor::Form(d) => &d.intents,
            CanonicalDescriptor::Layout(d) => &d.intents,
            CanonicalDescriptor::List(d) => &d.intents,
        }
    }

    /// Invariant ids the source explicitly requested.
    pub fn invariants(&self) -> &[String] {
        match self {
            CanonicalDescriptor::Form(d) => &d.invariants,
            CanonicalDescriptor::Layout(d) => &d.invariants,
            CanonicalDescriptor::List(d) => &d.invariants,
        }
    }

    /// Canonical JSON (sorted keys, compact).
    pub fn to_canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        digest::canonical_json(&value)
    }

    /// SHA-256 hex digest of the canonical JSON.
    pub fn digest(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        digest::compute_digest(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::FieldConstraint;

    fn field(field_type: FieldType, constraints: Vec<FieldConstraint>) -> FieldSchema {
        FieldSchema {
            name: "value".to_string(),
            field_type,
            nullable: false,
            optional: false,
            constraints,
        }
    }

    #[test]
    fn test_default_widget_is_total() {
        let cases = vec![
            (FieldType::String, Widget::TextInput),
            (FieldType::Text, Widget::TextArea),
            (FieldType::Integer, Widget::NumberInput),
            (FieldType::Decimal, Widget::NumberInput),
            (FieldType::Boolean, Widget::Checkbox),
            (FieldType::Date, Widget::DatePicker),
            (FieldType::Datetime, Widget::DateTimePicker),
            (FieldType::Email, Widget::EmailInput),
            (
                FieldType::Enum {
                    values: vec!["a".to_string()],
                },
                Widget::Select,
            ),
            (
                FieldType::Reference {
                    entity: "Account".to_string(),
                },
                Widget::EntityPicker,
            ),
            (FieldType::Json, Widget::CodeEditor),
        ];
        for (ty, expected) in cases {
            assert_eq!(Widget::default_for(&field(ty, vec![])), expected);
        }
    }

    #[test]
    fn test_long_string_defaults_to_text_area() {
        let long = field(
            FieldType::String,
            vec![FieldConstraint::MaxLength { value: 2000 }],
        );
        assert_eq!(Widget::default_for(&long), Widget::TextArea);

        let short = field(
            FieldType::String,
            vec![FieldConstraint::MaxLength { value: 80 }],
        );
        assert_eq!(Widget::default_for(&short), Widget::TextInput);
    }

    #[test]
    fn test_spacing_values_skip_unset() {
        let spacing = Spacing {
            gap: Some(8),
            padding: None,
            margin: Some(16),
        };
        assert_eq!(spacing.values(), vec![("gap", 8), ("margin", 16)]);
    }

    #[test]
    fn test_node_walk_is_depth_first() {
        let leaf = |id: &str| CanonicalNode {
            id: id.to_string(),
            role: NodeRole::Panel,
            field: None,
            action: None,
            columns: None,
            spacing: Spacing::default(),
            children: vec![],
        };
        let mut middle = leaf("b");
        middle.children.push(leaf("c"));
        let mut root = leaf("a");
        root.children.push(middle);
        root.children.push(leaf("d"));

        let ids: Vec<_> = root.walk().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }
}

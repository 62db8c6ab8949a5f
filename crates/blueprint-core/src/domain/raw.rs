//! Raw sources: human-authored documents before semantic resolution.
//!
//! A raw source arrives as a generic JSON tree. Its kind and key are inferred
//! from the file name (`<entity>.<variant>.<kind>.json`) and cross-checked
//! against the document by the schema validator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::descriptor::{NodeRole, SortDirection, Spacing, Widget};
use super::entity::snake_case;
use super::error::{BlueprintError, Result};

/// Closed set of raw source kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Form,
    Layout,
    List,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Form, SourceKind::Layout, SourceKind::List];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Form => "form",
            SourceKind::Layout => "layout",
            SourceKind::List => "list",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self> {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| BlueprintError::InvalidKey(format!("unknown source kind '{s}'")))
    }
}

/// Stable composite key `entity.variant`, both parts snake_case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorKey {
    entity: String,
    variant: String,
}

impl DescriptorKey {
    pub fn new(entity: &str, variant: &str) -> Self {
        Self {
            entity: snake_case(entity),
            variant: snake_case(variant),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.variant)
    }
}

impl FromStr for DescriptorKey {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((entity, variant))
                if !entity.is_empty() && !variant.is_empty() && !variant.contains('.') =>
            {
                Ok(Self::new(entity, variant))
            }
            _ => Err(BlueprintError::InvalidKey(s.to_string())),
        }
    }
}

impl Serialize for DescriptorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DescriptorKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse `<entity>.<variant>.<kind>.json` into a key and kind.
pub fn parse_source_file_name(path: &Path) -> Option<(DescriptorKey, SourceKind)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".json")?;
    let mut parts = stem.split('.');
    let (entity, variant, kind) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || entity.is_empty() || variant.is_empty() {
        return None;
    }
    let kind = kind.parse().ok()?;
    Some((DescriptorKey::new(entity, variant), kind))
}

/// A parsed but unvalidated source document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub key: DescriptorKey,
    pub document: serde_json::Value,
}

impl RawSource {
    pub fn new(
        path: impl Into<PathBuf>,
        kind: SourceKind,
        key: DescriptorKey,
        document: serde_json::Value,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            key,
            document,
        }
    }

    /// Build a raw source whose kind and key come from its file name.
    pub fn from_file_name(path: impl Into<PathBuf>, document: serde_json::Value) -> Result<Self> {
        let path = path.into();
        let (key, kind) = parse_source_file_name(&path)
            .ok_or_else(|| BlueprintError::InvalidKey(path.display().to_string()))?;
        Ok(Self::new(path, kind, key, document))
    }

    /// Read and parse a JSON source from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let document = serde_json::from_slice(&bytes)?;
        Self::from_file_name(path, document)
    }

    /// Origin label used in diagnostics and generated banners.
    pub fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Typed raw shapes (closed; unknown keys are rejected)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawForm {
    pub kind: String,
    pub entity: String,
    pub variant: String,
    #[serde(default)]
    pub title: Option<String>,
    pub sections: Vec<RawSection>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawSection {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub columns: Option<u32>,
    pub fields: Vec<RawFieldRef>,
}

/// A field reference: either a bare field name or a detailed override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawFieldRef {
    Name(String),
    Detailed(RawFieldSpec),
}

impl RawFieldRef {
    pub fn field_name(&self) -> &str {
        match self {
            RawFieldRef::Name(name) => name,
            RawFieldRef::Detailed(spec) => &spec.field,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawFieldSpec {
    pub field: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub widget: Option<Widget>,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawLayout {
    pub kind: String,
    pub entity: String,
    pub variant: String,
    #[serde(default)]
    pub title: Option<String>,
    pub root: RawNode,
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawNode {
    pub id: String,
    pub role: NodeRole,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub columns: Option<u32>,
    #[serde(default)]
    pub spacing: Option<Spacing>,
    #[serde(default)]
    pub children: Vec<RawNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawList {
    pub kind: String,
    pub entity: String,
    pub variant: String,
    #[serde(default)]
    pub title: Option<String>,
    pub columns: Vec<RawColumn>,
    #[serde(default)]
    pub default_sort: Option<RawSort>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub intents: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawColumn {
    pub field: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sortable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawSort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// A raw document after shape validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedSource {
    Form(RawForm),
    Layout(RawLayout),
    List(RawList),
}

impl ValidatedSource {
    pub fn entity(&self) -> &str {
        match self {
            ValidatedSource::Form(f) => &f.entity,
            ValidatedSource::Layout(l) => &l.entity,
            ValidatedSource::List(l) => &l.entity,
        }
    }

    pub fn variant(&self) -> &str {
        match self {
            ValidatedSource::Form(f) => &f.variant,
            ValidatedSource::Layout(l) => &l.variant,
            ValidatedSource::List(l) => &l.variant,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ValidatedSource::Form(_) => SourceKind::Form,
            ValidatedSource::Layout(_) => SourceKind::Layout,
            ValidatedSource::List(_) => SourceKind::List,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_key_display_and_parse() {
        let key = DescriptorKey::new("UserProfile", "edit");
        assert_eq!(key.to_string(), "user_profile.edit");

        let parsed: DescriptorKey = "user_profile.edit".parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_descriptor_key_rejects_malformed() {
        assert!("user".parse::<DescriptorKey>().is_err());
        assert!(".edit".parse::<DescriptorKey>().is_err());
        assert!("user.edit.extra".parse::<DescriptorKey>().is_err());
    }

    #[test]
    fn test_parse_source_file_name() {
        let (key, kind) = parse_source_file_name(Path::new("ui/user.edit.form.json")).unwrap();
        assert_eq!(key.to_string(), "user.edit");
        assert_eq!(kind, SourceKind::Form);

        assert!(parse_source_file_name(Path::new("user.edit.json")).is_none());
        assert!(parse_source_file_name(Path::new("user.edit.chart.json")).is_none());
        assert!(parse_source_file_name(Path::new("user.edit.form.yaml")).is_none());
    }

    #[test]
    fn test_field_ref_untagged() {
        let refs: Vec<RawFieldRef> = serde_json::from_value(serde_json::json!([
            "email",
            { "field": "bio", "widget": "text_area" }
        ]))
        .unwrap();
        assert_eq!(refs[0].field_name(), "email");
        assert_eq!(refs[1].field_name(), "bio");
    }
}

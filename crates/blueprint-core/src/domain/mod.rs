//! Domain models for Blueprint.
//!
//! Canonical definitions for the core entities:
//! - `EntitySchema`: pre-resolved description of a domain entity
//! - `RawSource`: a parsed, unvalidated declarative document
//! - `CanonicalDescriptor`: the fully-resolved structure handed to generators
//! - `Registries`: membership oracles for action, intent and invariant ids

pub mod descriptor;
pub mod digest;
pub mod entity;
pub mod error;
pub mod raw;
pub mod registry;

// Re-export main types and errors
pub use descriptor::{
    CanonicalColumn, CanonicalDescriptor, CanonicalForm, CanonicalLayout, CanonicalList,
    CanonicalNode, CanonicalSection, NodeRole, ResolvedField, SortDirection, SortSpec, Spacing,
    Widget,
};
pub use entity::{
    snake_case, Endpoint, EntityIndex, EntitySchema, FieldConstraint, FieldSchema, FieldType,
};
pub use error::{BlueprintError, Result, SchemaError};
pub use raw::{DescriptorKey, RawSource, SourceKind, ValidatedSource};
pub use registry::{MembershipRegistry, Registries, RegistryKind, StaticRegistry};

//! Blueprint Core Library
//!
//! Domain model, descriptor validation, canonicalization, invariant
//! evaluation, deterministic writing and the generator seam used by the
//! blueprint pipeline.

pub mod canonicalize;
pub mod domain;
pub mod generate;
pub mod invariants;
pub mod metrics;
pub mod obs;
pub mod schema;
pub mod telemetry;
pub mod writer;

pub use domain::{
    snake_case, BlueprintError, CanonicalDescriptor, DescriptorKey, EntityIndex, EntitySchema,
    FieldSchema, FieldType, MembershipRegistry, RawSource, Registries, RegistryKind, Result,
    SchemaError, SourceKind, StaticRegistry, ValidatedSource,
};

pub use canonicalize::{
    canonicalize, canonicalize_with_index, derive_label, CanonicalizeError, ErrorClass,
};
pub use generate::{
    reference_generators, ArtifactKind, Generator, GeneratorError, GeneratorInput,
    MigrationGenerator, UiDescriptorGenerator, ValidationGenerator,
};
pub use invariants::{
    evaluate, partition_violations, EnforcementPoint, Invariant, InvariantCatalog,
    InvariantCategory, InvariantError, InvariantRule, Severity, Violation,
};
pub use schema::validate_source;
pub use writer::{fingerprint, has_banner, WriteMode, WriteOptions, WriteResult, Writer};

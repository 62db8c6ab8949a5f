//! Blueprint Pipeline
//!
//! Turns an entity collection and a directory of declarative sources into
//! generated artifacts:
//! - plans the run ([`Manifest`])
//! - executes sparsely numbered, gating or non-gating phases
//! - threads descriptors between phases and merges them by key
//! - writes output deterministically in normal, check or dry-run mode

pub mod config;
pub mod manifest;
pub mod phase;
pub mod phases;
pub mod pipeline;

// Re-export key types
pub use config::{ConfigError, PipelineConfig, CONFIG_FILE};
pub use manifest::{ArtifactTarget, EntityPlan, Manifest, ManifestBuilder, SourcePlan};
pub use phase::{
    Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport, PhaseResult, RenderedFile,
};
pub use phases::standard_phases;
pub use pipeline::{Pipeline, PipelineResult};

//! Phase model: numbering, inputs, threaded outputs and results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use blueprint_core::generate::{ArtifactKind, Generator};
use blueprint_core::{
    CanonicalDescriptor, DescriptorKey, EntityIndex, EntitySchema, InvariantCatalog, RawSource,
    Registries, WriteResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::PipelineConfig;
use crate::manifest::Manifest;

/// Sparse phase number with one decimal of precision (`1`, `2.5`).
///
/// Stored in tenths so ordering and equality are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhaseNumber(u32);

impl PhaseNumber {
    pub const fn whole(n: u32) -> Self {
        Self(n * 10)
    }

    pub const fn from_tenths(tenths: u32) -> Self {
        Self(tenths)
    }

    pub fn tenths(&self) -> u32 {
        self.0
    }

    /// Convert a float such as `2.5`. Values with more than one decimal or
    /// below zero are rejected.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let scaled = value * 10.0;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 || rounded > u32::MAX as f64 {
            return None;
        }
        Some(Self(rounded as u32))
    }
}

impl fmt::Display for PhaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 10 == 0 {
            write!(f, "{}", self.0 / 10)
        } else {
            write!(f, "{}.{}", self.0 / 10, self.0 % 10)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phase number '{0}': expected e.g. 3 or 2.5")]
pub struct ParsePhaseNumberError(pub String);

impl FromStr for PhaseNumber {
    type Err = ParsePhaseNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePhaseNumberError(s.to_string());
        let (whole, frac) = match s.trim().split_once('.') {
            Some((w, f)) => (w, f),
            None => (s.trim(), "0"),
        };
        let whole: u32 = whole.parse().map_err(|_| err())?;
        let frac: u32 = match frac {
            f if f.len() == 1 => f.parse().map_err(|_| err())?,
            _ => return Err(err()),
        };
        whole
            .checked_mul(10)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or_else(err)
    }
}

impl Serialize for PhaseNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PhaseNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u32),
            Float(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(n) => Ok(PhaseNumber::whole(n)),
            Repr::Float(f) => PhaseNumber::from_f64(f)
                .ok_or_else(|| serde::de::Error::custom(ParsePhaseNumberError(f.to_string()))),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A file produced by the render phase, waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
    /// Provenance label for the banner.
    pub source: String,
    pub content: String,
}

/// Everything a phase may read.
pub struct PhaseInput<'a> {
    pub manifest: &'a Manifest,
    pub config: &'a PipelineConfig,
    pub entities: &'a [EntitySchema],
    pub registries: Registries<'a>,
    pub catalog: &'a InvariantCatalog,
    pub generators: &'a [Box<dyn Generator>],
    /// Timestamp shared by every file written in this run.
    pub generated_at: DateTime<Utc>,
}

/// Typed slots for outputs threaded from earlier phases to later ones.
#[derive(Debug, Default)]
pub struct PhaseOutputs {
    entity_index: Option<EntityIndex>,
    /// Shape-validated raw sources, in manifest order.
    pub sources: Vec<RawSource>,
    descriptors: BTreeMap<PhaseNumber, BTreeMap<DescriptorKey, CanonicalDescriptor>>,
    pub rendered: Vec<RenderedFile>,
    pub writes: Vec<WriteResult>,
}

impl PhaseOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entity_index(&mut self, index: EntityIndex) {
        self.entity_index = Some(index);
    }

    /// The validated entity index, or an index built directly from the
    /// input when the entity phase did not run.
    pub fn entity_index(&mut self, entities: &[EntitySchema]) -> &EntityIndex {
        self.entity_index
            .get_or_insert_with(|| EntityIndex::new(entities))
    }

    /// Record the descriptors produced by one phase.
    pub fn insert_descriptors(
        &mut self,
        phase: PhaseNumber,
        descriptors: BTreeMap<DescriptorKey, CanonicalDescriptor>,
    ) {
        self.descriptors.insert(phase, descriptors);
    }

    /// Descriptors of all phases merged by key. Phases are applied in
    /// ascending number order, so a higher-numbered phase wins a collision
    /// regardless of when it ran.
    pub fn merged_descriptors(&self) -> BTreeMap<DescriptorKey, CanonicalDescriptor> {
        let mut merged = BTreeMap::new();
        for descriptors in self.descriptors.values() {
            for (key, descriptor) in descriptors {
                merged.insert(key.clone(), descriptor.clone());
            }
        }
        merged
    }
}

/// What a phase reports back to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub payload: Option<serde_json::Value>,
}

impl PhaseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Result of one executed phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseResult {
    pub phase: PhaseNumber,
    pub name: String,
    pub gating: bool,
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl PhaseResult {
    pub fn passed(&self) -> bool {
        self.success
    }
}

/// One step of the pipeline.
pub trait Phase: Send + Sync {
    fn number(&self) -> PhaseNumber;

    fn name(&self) -> &'static str;

    /// Whether a failure stops the pipeline.
    fn gating(&self) -> bool;

    /// Run the phase. Per-item problems belong in the report; an `Err` is an
    /// infrastructure failure and fails the whole phase.
    fn run(
        &self,
        input: &PhaseInput<'_>,
        outputs: &mut PhaseOutputs,
    ) -> anyhow::Result<PhaseReport>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::domain::{CanonicalForm, CanonicalSection};

    fn form(variant: &str, title: &str) -> CanonicalDescriptor {
        CanonicalDescriptor::Form(CanonicalForm {
            key: DescriptorKey::new("user", variant),
            source: "test".to_string(),
            entity: "User".to_string(),
            domain: "identity".to_string(),
            title: title.to_string(),
            sections: Vec::<CanonicalSection>::new(),
            required_fields: vec![],
            actions: vec![],
            intents: vec![],
            invariants: vec![],
        })
    }

    #[test]
    fn test_phase_number_parse_and_display() {
        assert_eq!("2.5".parse::<PhaseNumber>().unwrap(), PhaseNumber::from_tenths(25));
        assert_eq!("3".parse::<PhaseNumber>().unwrap(), PhaseNumber::whole(3));
        assert_eq!(PhaseNumber::from_tenths(25).to_string(), "2.5");
        assert_eq!(PhaseNumber::whole(7).to_string(), "7");
        assert!("2.55".parse::<PhaseNumber>().is_err());
        assert!("two".parse::<PhaseNumber>().is_err());
        assert!(PhaseNumber::whole(2) < PhaseNumber::from_tenths(25));
    }

    #[test]
    fn test_phase_number_deserialize_forms() {
        let values: Vec<PhaseNumber> = serde_json::from_str(r#"[2, 2.5, "3"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                PhaseNumber::whole(2),
                PhaseNumber::from_tenths(25),
                PhaseNumber::whole(3)
            ]
        );
        assert!(serde_json::from_str::<PhaseNumber>("2.25").is_err());
        assert_eq!(
            serde_json::to_string(&PhaseNumber::from_tenths(25)).unwrap(),
            "\"2.5\""
        );
    }

    #[test]
    fn test_merge_prefers_higher_phase_regardless_of_insert_order() {
        let mut outputs = PhaseOutputs::new();
        let key = DescriptorKey::new("user", "default");

        let mut explicit = BTreeMap::new();
        explicit.insert(key.clone(), form("default", "Explicit"));
        outputs.insert_descriptors(PhaseNumber::whole(3), explicit);

        let mut scaffold = BTreeMap::new();
        scaffold.insert(key.clone(), form("default", "Scaffold"));
        scaffold.insert(DescriptorKey::new("user", "other"), form("other", "Other"));
        outputs.insert_descriptors(PhaseNumber::from_tenths(25), scaffold);

        let merged = outputs.merged_descriptors();
        assert_eq!(merged.len(), 2);
        let CanonicalDescriptor::Form(f) = &merged[&key] else {
            panic!("expected form");
        };
        assert_eq!(f.title, "Explicit");
    }
}

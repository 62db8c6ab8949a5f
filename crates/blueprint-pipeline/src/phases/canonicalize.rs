use std::collections::BTreeMap;

use blueprint_core::canonicalize_with_index;
use blueprint_core::metrics::METRICS;
use serde_json::json;
use tracing::debug;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Canonicalizes every shape-valid source against the entity index.
///
/// Each source fails on its first unresolved reference; siblings are still
/// canonicalized.
pub struct CanonicalizePhase;

impl Phase for CanonicalizePhase {
    fn number(&self) -> PhaseNumber {
        super::CANONICALIZE
    }

    fn name(&self) -> &'static str {
        "canonicalize"
    }

    fn gating(&self) -> bool {
        true
    }

    fn run(
        &self,
        input: &PhaseInput<'_>,
        outputs: &mut PhaseOutputs,
    ) -> anyhow::Result<PhaseReport> {
        let mut report = PhaseReport::new();
        let mut descriptors = BTreeMap::new();
        let mut origins: BTreeMap<String, String> = BTreeMap::new();

        let index = outputs.entity_index(input.entities).clone();
        for raw in &outputs.sources {
            let descriptor = match canonicalize_with_index(raw, &index, input.registries) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    report.error(format!("{}[{}] {}: {e}", e.class().name(), raw.key, raw.origin()));
                    continue;
                }
            };

            let key = descriptor.key().clone();
            if let Some(previous) = origins.insert(key.to_string(), raw.origin()) {
                report.error(format!(
                    "schema[{key}] {}: key already defined by {previous}",
                    raw.origin()
                ));
                continue;
            }
            debug!(key = %key, kind = %descriptor.kind(), "descriptor canonicalized");
            METRICS.inc_descriptors_canonicalized();
            descriptors.insert(key, descriptor);
        }

        let payload = json!({ "descriptors": descriptors.len() });
        outputs.insert_descriptors(self.number(), descriptors);
        Ok(report.with_payload(payload))
    }
}

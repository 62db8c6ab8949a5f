use blueprint_core::{validate_source, RawSource};
use serde_json::json;
use tracing::debug;

use crate::manifest::SourcePlan;
use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Reads and shape-validates every manifest source.
///
/// Every source is checked; one bad source never hides problems in another.
pub struct SourcesPhase;

impl Phase for SourcesPhase {
    fn number(&self) -> PhaseNumber {
        super::SOURCES
    }

    fn name(&self) -> &'static str {
        "sources"
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

        for plan in &input.manifest.sources {
            match load(plan) {
                Ok(raw) => {
                    debug!(source = %raw.origin(), "source validated");
                    outputs.sources.push(raw);
                }
                Err(message) => {
                    report.error(format!(
                        "schema[{}] {}: {message}",
                        plan.key,
                        plan.relative.display()
                    ));
                }
            }
        }

        let payload = json!({
            "sources": input.manifest.sources.len(),
            "valid": outputs.sources.len(),
        });
        Ok(report.with_payload(payload))
    }
}

/// Read, parse and validate one source. The raw source is labelled with its
/// path relative to the sources directory.
fn load(plan: &SourcePlan) -> Result<RawSource, String> {
    let bytes = std::fs::read(&plan.path).map_err(|e| format!("unreadable: {e}"))?;
    let document = serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON: {e}"))?;
    let raw = RawSource::new(plan.relative.clone(), plan.kind, plan.key.clone(), document);
    validate_source(&raw).map_err(|e| e.to_string())?;
    Ok(raw)
}

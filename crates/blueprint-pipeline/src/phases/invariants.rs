use blueprint_core::metrics::METRICS;
use blueprint_core::{partition_violations, EnforcementPoint};
use serde_json::json;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Evaluates build-time invariants on the merged descriptors.
///
/// `error` violations fail the phase; `warn` violations become warnings.
pub struct InvariantsPhase;

impl Phase for InvariantsPhase {
    fn number(&self) -> PhaseNumber {
        super::INVARIANTS
    }

    fn name(&self) -> &'static str {
        "invariants"
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
        let descriptors = outputs.merged_descriptors();

        let violations: Vec<_> = descriptors
            .values()
            .flat_map(|d| {
                input
                    .catalog
                    .evaluate_at(d, EnforcementPoint::Build, input.registries)
            })
            .collect();

        METRICS.add_violations(violations.len() as u64);
        let (errors, warnings) = partition_violations(&violations);
        report.errors.extend(errors);
        report.warnings.extend(warnings);

        Ok(report.with_payload(json!({
            "descriptors": descriptors.len(),
            "violations": violations.len(),
        })))
    }
}

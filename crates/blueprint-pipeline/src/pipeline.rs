//! Pipeline orchestration.

use std::time::Instant;

use blueprint_core::generate::{reference_generators, Generator};
use blueprint_core::metrics::{MetricsSnapshot, METRICS};
use blueprint_core::obs::{self, PipelineSpan};
use blueprint_core::{EntitySchema, MembershipRegistry, Registries, StaticRegistry};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::manifest::{Manifest, ManifestBuilder};
use crate::phase::{Phase, PhaseInput, PhaseOutputs, PhaseReport, PhaseResult};
use crate::phases::standard_phases;

/// Result of a complete pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,

    /// Whether every executed gating phase passed.
    pub success: bool,

    /// Results of executed phases, in execution order.
    pub phases: Vec<PhaseResult>,

    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    pub manifest: Manifest,

    /// Counters accumulated during this run only.
    #[serde(default)]
    pub metrics: MetricsSnapshot,
}

impl PipelineResult {
    /// Number of phases that passed.
    pub fn passed_count(&self) -> usize {
        self.phases.iter().filter(|p| p.passed()).count()
    }

    /// Number of phases that failed.
    pub fn failed_count(&self) -> usize {
        self.phases.iter().filter(|p| !p.passed()).count()
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.name == name)
    }
}

/// Pipeline orchestrator.
///
/// Phases run in ascending number order. A failing gating phase stops the
/// run; a failing non-gating phase only adds warnings.
pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
    generators: Vec<Box<dyn Generator>>,
    actions: Box<dyn MembershipRegistry>,
    intents: Box<dyn MembershipRegistry>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Standard phases, reference generators and empty registries.
    pub fn new() -> Self {
        Self {
            phases: standard_phases(),
            generators: reference_generators(),
            actions: Box::new(StaticRegistry::default()),
            intents: Box::new(StaticRegistry::default()),
        }
    }

    pub fn with_phases(mut self, phases: Vec<Box<dyn Phase>>) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_generators(mut self, generators: Vec<Box<dyn Generator>>) -> Self {
        self.generators = generators;
        self
    }

    /// Action and intent registries. Invariant ids resolve against the
    /// configured invariant catalog.
    pub fn with_registries(
        mut self,
        actions: impl MembershipRegistry + 'static,
        intents: impl MembershipRegistry + 'static,
    ) -> Self {
        self.actions = Box::new(actions);
        self.intents = Box::new(intents);
        self
    }

    /// Run every phase against `entities`.
    pub fn run(&self, entities: &[EntitySchema], config: &PipelineConfig) -> PipelineResult {
        let start = Instant::now();
        let counters = METRICS.snapshot();
        let run_id = Uuid::new_v4();
        let run_label = run_id.to_string();
        let _span = PipelineSpan::enter(&run_label);
        obs::emit_pipeline_started(&run_label, entities.len(), config.mode.name());

        let manifest = ManifestBuilder::new(config, entities)
            .artifacts(self.generators.iter().map(|g| g.artifact()))
            .build();

        let mut result = PipelineResult {
            run_id,
            success: true,
            phases: Vec::new(),
            errors: Vec::new(),
            warnings: manifest.warnings.clone(),
            duration_ms: 0,
            manifest: Manifest::default(),
            metrics: MetricsSnapshot::default(),
        };

        let catalog = match config.catalog() {
            Ok(catalog) => catalog,
            Err(e) => {
                result.success = false;
                result.errors.push(format!("config: {e}"));
                result.manifest = manifest;
                return finish(result, start, &counters);
            }
        };

        let input = PhaseInput {
            manifest: &manifest,
            config,
            entities,
            registries: Registries::new(self.actions.as_ref(), self.intents.as_ref(), &catalog),
            catalog: &catalog,
            generators: &self.generators,
            generated_at: Utc::now(),
        };
        let mut outputs = PhaseOutputs::new();

        let mut order: Vec<&dyn Phase> = self.phases.iter().map(|p| p.as_ref()).collect();
        order.sort_by_key(|p| p.number());

        for phase in order {
            let number = phase.number().to_string();
            let name = phase.name();
            if config.is_skipped(phase.number()) {
                obs::emit_phase_skipped(&number, name);
                continue;
            }

            obs::emit_phase_started(&number, name);
            let phase_start = Instant::now();
            // infrastructure errors already carry the phase name
            let (report, prefixed) = match phase.run(&input, &mut outputs) {
                Ok(report) => (report, false),
                Err(e) => {
                    warn!(phase = %number, name = %name, error = %e, "phase failed");
                    let report = PhaseReport {
                        errors: vec![format!("{name}: {e:#}")],
                        ..PhaseReport::default()
                    };
                    (report, true)
                }
            };

            let phase_result = PhaseResult {
                phase: phase.number(),
                name: name.to_string(),
                gating: phase.gating(),
                success: report.errors.is_empty(),
                errors: report.errors,
                warnings: report.warnings,
                duration_ms: phase_start.elapsed().as_millis() as u64,
                payload: report.payload,
            };
            obs::emit_phase_finished(
                &number,
                name,
                phase_result.success,
                phase_result.errors.len(),
                phase_result.warnings.len(),
                phase_result.duration_ms,
            );

            result.warnings.extend(phase_result.warnings.iter().cloned());
            if phase_result.success {
                result.phases.push(phase_result);
                continue;
            }

            if phase_result.gating {
                result.success = false;
                result.errors.extend(phase_result.errors.iter().cloned());
                result.phases.push(phase_result);
                obs::emit_pipeline_halted(&run_label, &number, name);
                result.manifest = manifest.clone();
                return finish(result, start, &counters);
            }

            info!(phase = %number, name = %name, "non-gating phase failed, continuing");
            result.warnings.extend(phase_result.errors.iter().map(|e| {
                if prefixed {
                    e.clone()
                } else {
                    format!("{name}: {e}")
                }
            }));
            result.phases.push(phase_result);
        }

        result.manifest = manifest;
        finish(result, start, &counters)
    }
}

fn finish(
    mut result: PipelineResult,
    start: Instant,
    counters: &MetricsSnapshot,
) -> PipelineResult {
    result.duration_ms = start.elapsed().as_millis() as u64;
    result.metrics = METRICS.snapshot().since(counters);
    obs::emit_pipeline_finished(
        &result.run_id.to_string(),
        result.duration_ms,
        result.phases.len(),
        result.success,
    );
    result.metrics.flush();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseNumber;

    fn phase_result(name: &str, success: bool) -> PhaseResult {
        PhaseResult {
            phase: PhaseNumber::whole(1),
            name: name.to_string(),
            gating: true,
            success,
            errors: if success { vec![] } else { vec!["boom".to_string()] },
            warnings: vec![],
            duration_ms: 1,
            payload: None,
        }
    }

    #[test]
    fn test_pipeline_result_counts() {
        let result = PipelineResult {
            run_id: Uuid::new_v4(),
            success: false,
            phases: vec![
                phase_result("entities", true),
                phase_result("sources", true),
                phase_result("canonicalize", false),
            ],
            errors: vec!["boom".to_string()],
            warnings: vec![],
            duration_ms: 3,
            manifest: Manifest::default(),
            metrics: MetricsSnapshot::default(),
        };

        assert_eq!(result.passed_count(), 2);
        assert_eq!(result.failed_count(), 1);
        assert!(result.phase("sources").is_some());
        assert!(result.phase("render").is_none());
    }
}

//! Structured lifecycle events for pipeline runs.
//!
//! - `PipelineSpan` enters a run-scoped span so every event carries `run_id`
//! - `emit_*` functions log the pipeline and phase lifecycle at `info!`

use tracing::{info, warn};

/// RAII guard for a run-scoped tracing span.
///
/// ```ignore
/// let _span = PipelineSpan::enter(&run_id.to_string());
/// ```
pub struct PipelineSpan {
    _span: tracing::span::EnteredSpan,
}

impl PipelineSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("blueprint.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_pipeline_started(run_id: &str, entities: usize, mode: &str) {
    info!(event = "pipeline.started", run_id = %run_id, entities = entities, mode = %mode);
}

pub fn emit_pipeline_finished(run_id: &str, duration_ms: u64, phases: usize, success: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        phases = phases,
        success = success,
    );
}

pub fn emit_phase_started(phase: &str, name: &str) {
    info!(event = "phase.started", phase = %phase, name = %name);
}

/// Emit event: phase finished with its error and warning counts.
pub fn emit_phase_finished(
    phase: &str,
    name: &str,
    success: bool,
    errors: usize,
    warnings: usize,
    duration_ms: u64,
) {
    info!(
        event = "phase.finished",
        phase = %phase,
        name = %name,
        success = success,
        errors = errors,
        warnings = warnings,
        duration_ms = duration_ms,
    );
}

pub fn emit_phase_skipped(phase: &str, name: &str) {
    info!(event = "phase.skipped", phase = %phase, name = %name);
}

/// Emit event: a gating phase failed and the run stops here.
pub fn emit_pipeline_halted(run_id: &str, phase: &str, name: &str) {
    warn!(event = "pipeline.halted", run_id = %run_id, phase = %phase, name = %name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_span_create() {
        let _span = PipelineSpan::enter("test-run-id");
        emit_phase_started("1", "entities");
        emit_phase_finished("1", "entities", true, 0, 0, 3);
    }
}

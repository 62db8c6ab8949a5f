//! Lifecycle events and counters emitted during a run.

use blueprint_core::metrics::Metrics;
use blueprint_core::obs::{
    emit_phase_finished, emit_phase_skipped, emit_phase_started, emit_pipeline_finished,
    emit_pipeline_halted, emit_pipeline_started, PipelineSpan,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn pipeline_lifecycle_events_are_logged() {
    let _span = PipelineSpan::enter("run-123");
    emit_pipeline_started("run-123", 2, "normal");
    emit_phase_started("2.5", "scaffold");
    emit_phase_finished("2.5", "scaffold", true, 0, 1, 4);
    emit_phase_skipped("3", "canonicalize");
    emit_pipeline_finished("run-123", 12, 7, true);

    assert!(logs_contain("pipeline.started"));
    assert!(logs_contain("phase.finished"));
    assert!(logs_contain("phase.skipped"));
}

#[traced_test]
#[test]
fn halted_pipeline_logs_warning() {
    emit_pipeline_halted("run-9", "4", "invariants");
    assert!(logs_contain("pipeline.halted"));
}

#[traced_test]
#[test]
fn metrics_flush_reports_counters() {
    let metrics = Metrics::new();
    metrics.inc_files_written();
    metrics.add_violations(2);
    metrics.snapshot().flush();
    assert!(logs_contain("files_written=1"));
    assert!(logs_contain("violations=2"));
}

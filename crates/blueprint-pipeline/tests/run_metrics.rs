//! Per-run counters. Kept in its own test binary so no other pipeline run
//! touches the global counters while these assertions hold.

use std::fs;

use blueprint_core::{EntitySchema, StaticRegistry, WriteMode};
use blueprint_pipeline::{Pipeline, PipelineConfig};
use serde_json::json;

fn entities() -> Vec<EntitySchema> {
    serde_json::from_value(json!([
        {
            "name": "User",
            "domain": "identity",
            "fields": [
                { "name": "firstName", "type": { "kind": "string" } },
                { "name": "email", "type": { "kind": "email" } }
            ]
        }
    ]))
    .unwrap()
}

#[test]
fn test_metrics_cover_a_single_run() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("sources");
    fs::create_dir_all(&sources).unwrap();
    let form = json!({
        "kind": "form",
        "entity": "User",
        "variant": "edit",
        "sections": [
            { "id": "profile", "default": true, "fields": ["firstName", "email"] }
        ],
        "actions": ["user.save"]
    });
    fs::write(
        sources.join("user.edit.form.json"),
        serde_json::to_vec_pretty(&form).unwrap(),
    )
    .unwrap();

    let config = PipelineConfig::default()
        .with_sources_dir(sources)
        .with_output_dir(dir.path().join("out"))
        .with_mode(WriteMode::Normal);
    let pipeline = Pipeline::new().with_registries(
        StaticRegistry::new(["user.save"]),
        StaticRegistry::default(),
    );

    let first = pipeline.run(&entities(), &config);
    assert!(first.success, "errors: {:?}", first.errors);
    assert!(first.metrics.descriptors_canonicalized > 0);
    assert!(first.metrics.files_written > 0);

    // nothing left to write, and the first run's counts are not carried over
    let second = pipeline.run(&entities(), &config);
    assert!(second.success, "errors: {:?}", second.errors);
    assert_eq!(
        second.metrics.descriptors_canonicalized,
        first.metrics.descriptors_canonicalized
    );
    assert_eq!(second.metrics.violations, first.metrics.violations);
    assert_eq!(second.metrics.files_written, 0);
    assert_eq!(second.metrics.drift_detected, 0);
}

use blueprint_core::metrics::METRICS;
use blueprint_core::{WriteMode, WriteOptions, Writer};
use serde_json::json;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Hands every rendered file to the deterministic writer.
///
/// Drift is an error only in check mode. In dry-run mode it is reported as a
/// warning; in normal mode it simply triggers a rewrite.
pub struct WritePhase;

impl Phase for WritePhase {
    fn number(&self) -> PhaseNumber {
        super::WRITE
    }

    fn name(&self) -> &'static str {
        "write"
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
        let writer = Writer::new();
        let mode = input.config.mode;

        let mut results = Vec::with_capacity(outputs.rendered.len());
        for file in &outputs.rendered {
            let options = WriteOptions::new(mode, file.source.clone()).at(input.generated_at);
            let result = writer.write(&file.path, &file.content, &options);
            let path = file.path.display();

            if let Some(error) = &result.error {
                report.error(format!("write[{path}] {error}"));
            } else if result.has_drift {
                METRICS.inc_drift();
                match mode {
                    WriteMode::Check => {
                        report.error(format!("drift[{path}] generated output is stale"))
                    }
                    WriteMode::DryRun => report.warn(format!("drift[{path}] would be rewritten")),
                    WriteMode::Normal => {}
                }
            }
            if result.written {
                METRICS.inc_files_written();
            }
            results.push(result);
        }

        let written = results.iter().filter(|r| r.written).count();
        let drifted = results.iter().filter(|r| r.has_drift).count();
        let payload = json!({
            "mode": mode.name(),
            "files": results.len(),
            "written": written,
            "drifted": drifted,
            "unchanged": results.len() - drifted,
        });
        outputs.writes = results;
        Ok(report.with_payload(payload))
    }
}

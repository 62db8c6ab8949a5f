use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use blueprint_core::has_banner;
use serde_json::json;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Completeness check over the output tree.
///
/// Every rendered or planned target must exist with a banner, and banner
/// files under the output root that this run did not produce are reported
/// as orphans. Missing targets are only expected to exist after a normal
/// write.
pub struct AuditPhase;

impl Phase for AuditPhase {
    fn number(&self) -> PhaseNumber {
        super::AUDIT
    }

    fn name(&self) -> &'static str {
        "audit"
    }

    fn gating(&self) -> bool {
        false
    }

    fn run(
        &self,
        input: &PhaseInput<'_>,
        outputs: &mut PhaseOutputs,
    ) -> anyhow::Result<PhaseReport> {
        let mut report = PhaseReport::new();
        let expect_present = input.config.mode.mutates();

        let expected: BTreeSet<PathBuf> = outputs
            .rendered
            .iter()
            .map(|f| f.path.clone())
            .chain(input.manifest.targets().map(|t| t.path.clone()))
            .collect();

        for path in &expected {
            match std::fs::read_to_string(path) {
                Ok(text) if has_banner(&text) => {}
                Ok(_) => report.error(format!(
                    "audit[{}] generated file has no banner",
                    path.display()
                )),
                Err(_) if expect_present => report.error(format!(
                    "audit[{}] planned target is missing",
                    path.display()
                )),
                Err(_) => {}
            }
        }

        let mut orphans = 0;
        let output_dir = &input.config.layout.output_dir;
        if output_dir.is_dir() {
            let mut files = Vec::new();
            collect_files(output_dir, &mut files)?;
            files.sort();
            for path in files {
                if expected.contains(&path) {
                    continue;
                }
                let generated = std::fs::read_to_string(&path)
                    .map(|text| has_banner(&text))
                    .unwrap_or(false);
                if generated {
                    orphans += 1;
                    report.warn(format!(
                        "audit[{}] orphaned generated file",
                        path.display()
                    ));
                }
            }
        }

        Ok(report.with_payload(json!({
            "checked": expected.len(),
            "orphans": orphans,
        })))
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

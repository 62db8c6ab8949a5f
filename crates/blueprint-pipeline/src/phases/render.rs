use blueprint_core::generate::{Generator, GeneratorInput};
use serde_json::json;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport, RenderedFile};

/// Runs every generator over the entities and merged descriptors.
pub struct RenderPhase;

impl Phase for RenderPhase {
    fn number(&self) -> PhaseNumber {
        super::RENDER
    }

    fn name(&self) -> &'static str {
        "render"
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
        let output_dir = &input.config.layout.output_dir;
        let descriptors = outputs.merged_descriptors();
        let index = outputs.entity_index(input.entities).clone();
        let entity_label = input.config.entity_source_label();

        let mut rendered = Vec::new();
        for generator in input.generators {
            let artifact = generator.artifact();
            if artifact.is_entity_level() {
                for entity in index.iter() {
                    let path = output_dir.join(artifact.entity_target(&entity.key()));
                    let source = format!("{entity_label}#{}", entity.name);
                    render_one(
                        generator.as_ref(),
                        GeneratorInput::Entity(entity),
                        path,
                        source,
                        &mut rendered,
                        &mut report,
                    );
                }
                continue;
            }

            for (key, descriptor) in &descriptors {
                let path = output_dir.join(artifact.descriptor_target(key, descriptor.kind().name()));
                let Some(entity) = index.get(descriptor.entity()) else {
                    report.error(format!(
                        "render[{}] entity '{}' is not in the entity index",
                        path.display(),
                        descriptor.entity()
                    ));
                    continue;
                };
                render_one(
                    generator.as_ref(),
                    GeneratorInput::Descriptor(descriptor, entity),
                    path,
                    descriptor.source().to_string(),
                    &mut rendered,
                    &mut report,
                );
            }
        }

        let payload = json!({ "files": rendered.len() });
        outputs.rendered = rendered;
        Ok(report.with_payload(payload))
    }
}

fn render_one(
    generator: &dyn Generator,
    input: GeneratorInput<'_>,
    path: std::path::PathBuf,
    source: String,
    rendered: &mut Vec<RenderedFile>,
    report: &mut PhaseReport,
) {
    match generator.render(input) {
        Ok(content) => rendered.push(RenderedFile {
            artifact: generator.artifact(),
            path,
            source,
            content,
        }),
        Err(e) => report.error(format!("render[{}] {e}", path.display())),
    }
}

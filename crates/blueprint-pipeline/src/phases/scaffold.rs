use std::collections::BTreeMap;
use std::path::PathBuf;

use blueprint_core::{
    canonicalize, DescriptorKey, EntitySchema, RawSource, RegistryKind, SourceKind,
};
use serde_json::json;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Variant name of scaffolded forms.
pub const SCAFFOLD_VARIANT: &str = "default";

/// Synthesizes a `<entity>.default` form for every entity.
///
/// Explicit sources with the same key replace the scaffold when descriptors
/// are merged, since canonicalization runs at a higher phase number.
pub struct ScaffoldPhase;

impl Phase for ScaffoldPhase {
    fn number(&self) -> PhaseNumber {
        super::SCAFFOLD
    }

    fn name(&self) -> &'static str {
        "scaffold"
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
        let mut descriptors = BTreeMap::new();

        let entities: Vec<EntitySchema> = outputs.entity_index(input.entities).iter().cloned().collect();
        for entity in &entities {
            if entity.fields.is_empty() {
                report.warn(format!(
                    "entity[{}] has no fields; no default form scaffolded",
                    entity.name
                ));
                continue;
            }

            let raw = scaffold_source(entity, input, &mut report);
            match canonicalize(&raw, entity, input.registries) {
                Ok(descriptor) => {
                    descriptors.insert(descriptor.key().clone(), descriptor);
                }
                Err(e) => report.error(format!("{}[{}] {e}", e.class().name(), raw.key)),
            }
        }

        let payload = json!({ "scaffolded": descriptors.len() });
        outputs.insert_descriptors(self.number(), descriptors);
        Ok(report.with_payload(payload))
    }
}

/// A form showing every entity field in one default section. Only registered
/// capabilities become form actions.
fn scaffold_source(
    entity: &EntitySchema,
    input: &PhaseInput<'_>,
    report: &mut PhaseReport,
) -> RawSource {
    let key = DescriptorKey::new(&entity.name, SCAFFOLD_VARIANT);
    let mut actions = Vec::new();
    for capability in &entity.capabilities {
        if input.registries.contains(RegistryKind::Action, capability) {
            actions.push(capability.clone());
        } else {
            report.warn(format!(
                "entity[{}] capability '{capability}' is not a registered action; left out of {key}",
                entity.name
            ));
        }
    }

    let fields: Vec<&str> = entity.fields.iter().map(|f| f.name.as_str()).collect();
    let document = json!({
        "kind": SourceKind::Form.name(),
        "entity": entity.name,
        "variant": SCAFFOLD_VARIANT,
        "sections": [{ "id": "main", "default": true, "fields": fields }],
        "actions": actions,
    });
    let path = PathBuf::from("scaffold").join(format!("{key}.form.json"));
    RawSource::new(path, SourceKind::Form, key, document)
}

use std::collections::BTreeSet;

use blueprint_core::{EntityIndex, EntitySchema, FieldType, RegistryKind};
use serde_json::json;

use crate::phase::{Phase, PhaseInput, PhaseNumber, PhaseOutputs, PhaseReport};

/// Validates the entity collection and publishes the [`EntityIndex`].
pub struct EntitiesPhase;

impl Phase for EntitiesPhase {
    fn number(&self) -> PhaseNumber {
        super::ENTITIES
    }

    fn name(&self) -> &'static str {
        "entities"
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
        let index = EntityIndex::new(input.entities);

        let mut seen = BTreeSet::new();
        for (position, entity) in input.entities.iter().enumerate() {
            if entity.name.trim().is_empty() {
                report.error(format!("entity[#{position}] entity name is empty"));
                continue;
            }
            if !seen.insert(entity.key()) {
                report.error(format!(
                    "entity[{}] duplicate entity (key '{}')",
                    entity.name,
                    entity.key()
                ));
            }
            check_entity(entity, &index, input, &mut report);
        }

        tracing::debug!(entities = index.len(), "entity index built");
        let payload = json!({ "entities": index.len() });
        outputs.set_entity_index(index);
        Ok(report.with_payload(payload))
    }
}

fn check_entity(
    entity: &EntitySchema,
    index: &EntityIndex,
    input: &PhaseInput<'_>,
    report: &mut PhaseReport,
) {
    let name = &entity.name;
    let mut fields = BTreeSet::new();
    for field in &entity.fields {
        if field.name.trim().is_empty() {
            report.error(format!("entity[{name}] field name is empty"));
            continue;
        }
        if !fields.insert(field.name.as_str()) {
            report.error(format!("entity[{name}] duplicate field '{}'", field.name));
        }
        match &field.field_type {
            FieldType::Enum { values } if values.is_empty() => {
                report.error(format!(
                    "entity[{name}] enum field '{}' declares no values",
                    field.name
                ));
            }
            FieldType::Reference { entity: target } if !index.contains(target) => {
                report.error(format!(
                    "entity[{name}] field '{}' references unknown entity '{target}'",
                    field.name
                ));
            }
            _ => {}
        }
    }

    for endpoint in &entity.endpoints {
        if let Some(action) = &endpoint.action {
            if !input.registries.contains(RegistryKind::Action, action) {
                report.error(format!(
                    "entity[{name}] endpoint {} {} uses unregistered action '{action}'",
                    endpoint.method, endpoint.path
                ));
            }
        }
    }
}

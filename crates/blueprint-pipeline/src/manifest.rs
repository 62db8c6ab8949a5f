//! Run manifest: every known raw source and the artifacts planned for it.

use std::path::{Path, PathBuf};

use blueprint_core::domain::raw::parse_source_file_name;
use blueprint_core::generate::ArtifactKind;
use blueprint_core::{DescriptorKey, EntitySchema, SourceKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PipelineConfig;

/// One planned output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArtifactTarget {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityPlan {
    pub entity: String,
    pub domain: String,
    pub targets: Vec<ArtifactTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcePlan {
    /// Location on disk.
    pub path: PathBuf,
    /// Path relative to the sources directory; used as the provenance label.
    pub relative: PathBuf,
    pub key: DescriptorKey,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ArtifactTarget>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub entities: Vec<EntityPlan>,
    /// Sources sorted by relative path.
    pub sources: Vec<SourcePlan>,
    pub warnings: Vec<String>,
}

impl Manifest {
    /// Every planned target, entity-level first.
    pub fn targets(&self) -> impl Iterator<Item = &ArtifactTarget> {
        self.entities
            .iter()
            .flat_map(|e| e.targets.iter())
            .chain(self.sources.iter().filter_map(|s| s.target.as_ref()))
    }
}

/// Builds a [`Manifest`] from the entity collection and the workspace layout.
pub struct ManifestBuilder<'a> {
    config: &'a PipelineConfig,
    entities: &'a [EntitySchema],
    artifacts: Vec<ArtifactKind>,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(config: &'a PipelineConfig, entities: &'a [EntitySchema]) -> Self {
        Self {
            config,
            entities,
            artifacts: Vec::new(),
        }
    }

    /// Artifact kinds to plan targets for (usually one per generator).
    pub fn artifacts(mut self, artifacts: impl IntoIterator<Item = ArtifactKind>) -> Self {
        self.artifacts = artifacts.into_iter().collect();
        self.artifacts.sort();
        self.artifacts.dedup();
        self
    }

    pub fn build(self) -> Manifest {
        let mut manifest = Manifest::default();
        let output = &self.config.layout.output_dir;

        if self.entities.is_empty() {
            manifest
                .warnings
                .push("manifest: no entities declared; nothing to generate".to_string());
        }

        for entity in self.entities {
            let key = entity.key();
            let targets = self
                .artifacts
                .iter()
                .filter(|a| a.is_entity_level())
                .map(|a| ArtifactTarget {
                    artifact: *a,
                    path: output.join(a.entity_target(&key)),
                })
                .collect();
            manifest.entities.push(EntityPlan {
                entity: entity.name.clone(),
                domain: entity.domain.clone(),
                targets,
            });
        }

        let sources_dir = &self.config.layout.sources_dir;
        if !sources_dir.is_dir() {
            let message = format!(
                "manifest: sources directory {} does not exist",
                sources_dir.display()
            );
            warn!("{message}");
            manifest.warnings.push(message);
            return manifest;
        }

        let mut files = Vec::new();
        if let Err(e) = collect_files(sources_dir, &mut files) {
            manifest.warnings.push(format!(
                "manifest: failed to list {}: {e}",
                sources_dir.display()
            ));
        }
        files.sort();

        let descriptor_artifact = self
            .artifacts
            .iter()
            .copied()
            .find(|a| !a.is_entity_level());

        for path in files {
            let relative = path
                .strip_prefix(sources_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            let Some((key, kind)) = parse_source_file_name(&path) else {
                manifest.warnings.push(format!(
                    "manifest: ignoring {}: expected <entity>.<variant>.<kind>.json",
                    relative.display()
                ));
                continue;
            };
            debug!(source = %relative.display(), key = %key, kind = %kind, "planned source");
            let target = descriptor_artifact.map(|a| ArtifactTarget {
                artifact: a,
                path: output.join(a.descriptor_target(&key, kind.name())),
            });
            manifest.sources.push(SourcePlan {
                path,
                relative,
                key,
                kind,
                target,
            });
        }

        manifest
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> EntitySchema {
        serde_json::from_value(json!({ "name": "UserProfile", "domain": "identity" })).unwrap()
    }

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig::default()
            .with_sources_dir(root.join("sources"))
            .with_output_dir(root.join("out"))
    }

    #[test]
    fn test_missing_sources_dir_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let entities = [user()];
        let manifest = ManifestBuilder::new(&config, &entities)
            .artifacts([ArtifactKind::Migration])
            .build();

        assert!(manifest.sources.is_empty());
        assert_eq!(manifest.entities.len(), 1);
        assert_eq!(
            manifest.entities[0].targets[0].path,
            dir.path().join("out/migrations/user_profile.sql")
        );
        assert!(manifest.warnings[0].contains("does not exist"));
    }

    #[test]
    fn test_sources_sorted_and_bad_names_warned() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources");
        std::fs::create_dir_all(sources.join("nested")).unwrap();
        std::fs::write(sources.join("user_profile.list.list.json"), "{}").unwrap();
        std::fs::write(sources.join("nested/user_profile.edit.form.json"), "{}").unwrap();
        std::fs::write(sources.join("README.md"), "notes").unwrap();

        let config = config(dir.path());
        let entities = [user()];
        let manifest = ManifestBuilder::new(&config, &entities)
            .artifacts([ArtifactKind::UiDescriptor, ArtifactKind::Validation])
            .build();

        let relative: Vec<_> = manifest
            .sources
            .iter()
            .map(|s| s.relative.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            relative,
            vec!["nested/user_profile.edit.form.json", "user_profile.list.list.json"]
        );
        assert_eq!(manifest.sources[0].kind, SourceKind::Form);
        assert_eq!(
            manifest.sources[0].target.as_ref().unwrap().path,
            dir.path().join("out/ui/user_profile/edit.form.ts")
        );
        assert_eq!(manifest.warnings.len(), 1);
        assert!(manifest.warnings[0].contains("README.md"));
        assert_eq!(manifest.targets().count(), 3);
    }

    #[test]
    fn test_empty_entities_warned() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let manifest = ManifestBuilder::new(&config, &[]).build();
        assert!(manifest.entities.is_empty());
        assert!(manifest.warnings.iter().any(|w| w.contains("no entities")));
    }
}

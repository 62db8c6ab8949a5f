//! Pipeline configuration, loaded from `blueprint.toml`.
//!
//! ```toml
//! mode = "check"
//! skip_phases = [2.5]
//!
//! [layout]
//! sources_dir = "blueprint/sources"
//! output_dir = "generated"
//!
//! [invariants]
//! disabled = ["layout.spacing-grid"]
//! warn_only = ["list.page-size"]
//! ```

use std::path::{Path, PathBuf};

use blueprint_core::{InvariantCatalog, InvariantError, WriteMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phase::PhaseNumber;

/// Default config file name, looked up in the workspace root.
pub const CONFIG_FILE: &str = "blueprint.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [invariants] entry: {0}")]
    Invariant(#[from] InvariantError),
}

/// Workspace layout. Relative paths are resolved against the workspace
/// root by [`PipelineConfig::rooted`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub sources_dir: PathBuf,
    pub output_dir: PathBuf,
    pub entities_file: PathBuf,
    pub registries_dir: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sources_dir: PathBuf::from("blueprint/sources"),
            output_dir: PathBuf::from("generated"),
            entities_file: PathBuf::from("blueprint/entities.json"),
            registries_dir: PathBuf::from("blueprint/registries"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InvariantsConfig {
    /// Catalog ids excluded from evaluation.
    pub disabled: Vec<String>,
    /// Catalog ids whose severity is lowered to `warn`.
    pub warn_only: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BannerConfig {
    /// Provenance label for entity-level artifacts. Defaults to the entities
    /// file path.
    pub source_label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub layout: LayoutConfig,
    pub mode: WriteMode,
    /// Phases removed from the run, matched by exact number.
    pub skip_phases: Vec<PhaseNumber>,
    pub invariants: InvariantsConfig,
    pub banner: BannerConfig,
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Resolve relative layout paths against `root`.
    pub fn rooted(mut self, root: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        resolve(&mut self.layout.sources_dir);
        resolve(&mut self.layout.output_dir);
        resolve(&mut self.layout.entities_file);
        resolve(&mut self.layout.registries_dir);
        self
    }

    pub fn is_skipped(&self, phase: PhaseNumber) -> bool {
        self.skip_phases.contains(&phase)
    }

    pub fn skip(mut self, phase: PhaseNumber) -> Self {
        if !self.skip_phases.contains(&phase) {
            self.skip_phases.push(phase);
        }
        self
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layout.output_dir = dir.into();
        self
    }

    pub fn with_sources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.layout.sources_dir = dir.into();
        self
    }

    /// The standard invariant catalog with `[invariants]` applied.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invariant` when an id is not in the catalog.
    pub fn catalog(&self) -> Result<InvariantCatalog, ConfigError> {
        let mut catalog = InvariantCatalog::standard();
        for id in &self.invariants.disabled {
            catalog.disable(id)?;
        }
        for id in &self.invariants.warn_only {
            catalog.downgrade(id)?;
        }
        Ok(catalog)
    }

    /// Banner label for entity-level artifacts.
    pub fn entity_source_label(&self) -> String {
        self.banner
            .source_label
            .clone()
            .unwrap_or_else(|| self.layout.entities_file.display().to_string())
    }
}

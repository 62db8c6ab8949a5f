//! Deterministic, idempotent emission of generated files.
//!
//! Every generated file starts with a provenance banner. Whether a file needs
//! rewriting is decided by comparing fingerprints: SHA-256 over the banner and
//! content with the `@generated-at` line left out, so regenerating unchanged
//! inputs at a later time is not drift.

pub mod fs;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};

pub use fs::Writer;

/// Name stamped into every banner.
pub const GENERATOR_NAME: &str = "blueprint";

const GENERATED_BY: &str = "@generated by";
const GENERATED_AT: &str = "@generated-at";
const DO_NOT_EDIT: &str =
    "DO NOT EDIT: this file is regenerated from its source; manual changes will be overwritten.";

/// Writer mode. Exactly one applies per invocation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Rewrite drifted files.
    #[default]
    Normal,
    /// Report drift as failure, never touch the filesystem.
    Check,
    /// Report drift as information, never touch the filesystem.
    DryRun,
}

impl WriteMode {
    pub fn name(&self) -> &'static str {
        match self {
            WriteMode::Normal => "normal",
            WriteMode::Check => "check",
            WriteMode::DryRun => "dry_run",
        }
    }

    /// Whether this mode may mutate the filesystem.
    pub fn mutates(&self) -> bool {
        matches!(self, WriteMode::Normal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub mode: WriteMode,
    /// Provenance label written into the banner.
    pub source: String,
    pub generated_at: DateTime<Utc>,
}

impl WriteOptions {
    pub fn new(mode: WriteMode, source: impl Into<String>) -> Self {
        Self {
            mode,
            source: source.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }
}

/// Outcome of one writer invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteResult {
    pub path: PathBuf,
    pub success: bool,
    pub written: bool,
    /// Fingerprint of the freshly generated text.
    pub hash: String,
    /// Fingerprint of the file on disk, when it could be read.
    pub existing_hash: Option<String>,
    pub has_drift: bool,
    pub error: Option<String>,
}

/// Comment leader for a target path, chosen by extension.
pub fn comment_prefix(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py" | "rb" | "sh" | "toml" | "yaml" | "yml" | "nix") => "#",
        Some("sql") => "--",
        _ => "//",
    }
}

/// Render the provenance banner for `path`, including the trailing blank line.
pub fn banner(path: &Path, source: &str, generated_at: DateTime<Utc>) -> String {
    let c = comment_prefix(path);
    format!(
        "{c} {GENERATED_BY} {GENERATOR_NAME} from {source}\n\
         {c} {GENERATED_AT} {}\n\
         {c} {DO_NOT_EDIT}\n\
         \n",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Whether `text` starts with a blueprint banner.
pub fn has_banner(text: &str) -> bool {
    text.lines()
        .next()
        .map(|line| strip_comment(line).starts_with(GENERATED_BY))
        .unwrap_or(false)
}

fn strip_comment(line: &str) -> &str {
    line.trim_start_matches(['/', '#', '-'])
        .trim_start()
}

fn is_timestamp_line(line: &[u8]) -> bool {
    std::str::from_utf8(line)
        .map(|l| strip_comment(l).starts_with(GENERATED_AT))
        .unwrap_or(false)
}

/// Timestamp-insensitive SHA-256 of generated text.
///
/// Only the leading banner block (up to the first blank line) is scanned for
/// the `@generated-at` line; content below it is hashed verbatim.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    let mut in_banner = true;
    for line in bytes.split_inclusive(|b| *b == b'\n') {
        if in_banner {
            if line == b"\n" || line == b"\r\n" {
                in_banner = false;
            } else if is_timestamp_line(line) {
                continue;
            }
        }
        hasher.update(line);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_banner_comment_syntax_by_extension() {
        let ts = banner(Path::new("ui/user.ts"), "sources/user.edit.form.json", at(9));
        assert!(ts.starts_with("// @generated by blueprint from sources/user.edit.form.json\n"));
        assert!(ts.contains("// @generated-at 2026-03-01T09:00:00Z\n"));
        assert!(ts.ends_with("\n\n"));

        let sql = banner(Path::new("migrations/user.sql"), "entity User", at(9));
        assert!(sql.starts_with("-- @generated"));

        let py = banner(Path::new("tests/test_user.py"), "entity User", at(9));
        assert!(py.starts_with("# @generated"));
    }

    #[test]
    fn test_fingerprint_ignores_timestamp_line() {
        let path = Path::new("ui/user.ts");
        let a = format!("{}export const x = 1;\n", banner(path, "src", at(9)));
        let b = format!("{}export const x = 1;\n", banner(path, "src", at(17)));
        assert_ne!(a, b);
        assert_eq!(fingerprint(a.as_bytes()), fingerprint(b.as_bytes()));
    }

    #[test]
    fn test_fingerprint_sees_content_and_source_changes() {
        let path = Path::new("ui/user.ts");
        let base = format!("{}export const x = 1;\n", banner(path, "src", at(9)));
        let content = format!("{}export const x = 2;\n", banner(path, "src", at(9)));
        let source = format!("{}export const x = 1;\n", banner(path, "other", at(9)));
        assert_ne!(fingerprint(base.as_bytes()), fingerprint(content.as_bytes()));
        assert_ne!(fingerprint(base.as_bytes()), fingerprint(source.as_bytes()));
    }

    #[test]
    fn test_fingerprint_keeps_timestamp_text_in_body() {
        let a = "// header\n\n// @generated-at 1\n";
        let b = "// header\n\n// @generated-at 2\n";
        assert_ne!(fingerprint(a.as_bytes()), fingerprint(b.as_bytes()));
    }

    #[test]
    fn test_has_banner() {
        let text = format!("{}body\n", banner(Path::new("a.sql"), "x", at(1)));
        assert!(has_banner(&text));
        assert!(!has_banner("CREATE TABLE users ();\n"));
        assert!(!has_banner(""));
    }

    #[test]
    fn test_write_mode_mutates() {
        assert!(WriteMode::Normal.mutates());
        assert!(!WriteMode::Check.mutates());
        assert!(!WriteMode::DryRun.mutates());
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{banner, fingerprint, WriteMode, WriteOptions, WriteResult};

/// Filesystem writer for generated artifacts.
///
/// Writes are whole-file: content goes to a temp file in the target
/// directory and is renamed into place. Filesystem failures are reported in
/// [`WriteResult::error`], never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct Writer;

impl Writer {
    pub fn new() -> Self {
        Self
    }

    /// Emit `content` at `path` under a provenance banner.
    pub fn write(&self, path: &Path, content: &str, options: &WriteOptions) -> WriteResult {
        let text = format!(
            "{}{}",
            banner(path, &options.source, options.generated_at),
            content
        );
        let hash = fingerprint(text.as_bytes());

        let existing_hash = match fs::read(path) {
            Ok(bytes) => Some(fingerprint(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable generated file, treating as drift");
                None
            }
        };

        let mut result = WriteResult {
            path: path.to_path_buf(),
            success: true,
            written: false,
            has_drift: existing_hash.as_deref() != Some(hash.as_str()),
            hash,
            existing_hash,
            error: None,
        };

        if !result.has_drift {
            debug!(path = %path.display(), "generated file up to date");
            return result;
        }

        match options.mode {
            WriteMode::Normal => match write_atomic(path, text.as_bytes()) {
                Ok(()) => {
                    debug!(path = %path.display(), "generated file written");
                    result.written = true;
                }
                Err(e) => {
                    result.success = false;
                    result.error = Some(e.to_string());
                }
            },
            WriteMode::Check => {
                result.success = false;
            }
            WriteMode::DryRun => {
                debug!(path = %path.display(), "dry run: would write");
            }
        }
        result
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

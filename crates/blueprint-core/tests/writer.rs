use std::fs;

use blueprint_core::writer::banner;
use blueprint_core::{fingerprint, has_banner, WriteMode, WriteOptions, Writer};
use chrono::{TimeZone, Utc};

fn options(mode: WriteMode, hour: u32) -> WriteOptions {
    WriteOptions::new(mode, "sources/user.edit.form.json")
        .at(Utc.with_ymd_and_hms(2026, 5, 4, hour, 0, 0).unwrap())
}

#[test]
fn check_mode_against_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migrations/user.sql");

    let result = Writer::new().write(&path, "CREATE TABLE user ();\n", &options(WriteMode::Check, 1));
    assert!(result.has_drift);
    assert!(!result.written);
    assert!(!result.success);
    assert!(!path.exists());
}

#[test]
fn normal_mode_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ui/user/edit.form.ts");
    let writer = Writer::new();

    let first = writer.write(&path, "export {};\n", &options(WriteMode::Normal, 1));
    assert!(first.written);
    let second = writer.write(&path, "export {};\n", &options(WriteMode::Normal, 1));
    assert!(!second.written);
    assert!(second.success);
}

#[test]
fn later_timestamp_is_not_drift() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.validation.ts");
    let writer = Writer::new();

    writer.write(&path, "export const rules = {};\n", &options(WriteMode::Normal, 1));
    let before = fs::read_to_string(&path).unwrap();

    let check = writer.write(&path, "export const rules = {};\n", &options(WriteMode::Check, 23));
    assert!(check.success);
    assert!(!check.has_drift);

    let normal = writer.write(&path, "export const rules = {};\n", &options(WriteMode::Normal, 23));
    assert!(!normal.written);
    // the original timestamp survives
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn written_file_carries_banner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.sql");
    let opts = options(WriteMode::Normal, 2);

    let result = Writer::new().write(&path, "SELECT 1;\n", &opts);
    let text = fs::read_to_string(&path).unwrap();
    assert!(has_banner(&text));
    assert!(text.starts_with(&banner(&path, &opts.source, opts.generated_at)));
    assert_eq!(fingerprint(text.as_bytes()), result.hash);
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::time::Duration;

use rstest::rstest;

use super::{apply_overrides, load_from_path, load_or_default, ConfigError, SyncConfig};
use crate::store::{KeyValueStorage, StorageError};
use crate::test_support::TempDir;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("hearth.json");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn defaults_match_documented_values() {
    let config = SyncConfig::default();
    assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.base_delay_ms, 1000);

    let layout = config.local_layout();
    assert_eq!(layout.record_key, "simulatorData");
    assert_eq!(layout.stale_prefix, "simulator-stale:");
    assert_eq!(config.storage.quota_bytes, None);
}

#[test]
fn partial_file_keeps_defaults_for_missing_fields() {
    let dir = TempDir::new("config");
    let path = write_config(&dir, r#"{ "retry": { "base_delay_ms": 10 } }"#);

    let config = load_from_path(&path).unwrap();

    assert_eq!(config.retry.base_delay_ms, 10);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.cache_ttl_ms, 300_000);
}

#[rstest]
#[case::zero_attempts(r#"{ "retry": { "max_attempts": 0 } }"#)]
#[case::blank_record_key(r#"{ "storage": { "record_key": " " } }"#)]
#[case::record_key_under_stale_prefix(r#"{ "storage": { "record_key": "simulator-stale:x" } }"#)]
fn invalid_values_are_rejected(#[case] contents: &str) {
    let dir = TempDir::new("config");
    let path = write_config(&dir, contents);

    assert!(matches!(load_from_path(&path), Err(ConfigError::Invalid { .. })));
}

#[test]
fn unreadable_or_malformed_files_report_their_path() {
    let dir = TempDir::new("config");
    let missing = dir.path().join("missing.json");
    match load_from_path(&missing) {
        Err(ConfigError::Read { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected read error, got: {other:?}"),
    }

    let malformed = write_config(&dir, "{ nope");
    assert!(matches!(load_from_path(&malformed), Err(ConfigError::Parse { .. })));
}

#[test]
fn load_or_default_falls_back_when_the_file_is_broken() {
    let dir = TempDir::new("config");
    let path = write_config(&dir, "42");

    let config = load_or_default(Some(path.as_path()));

    assert_eq!(config.storage, SyncConfig::default().storage);
}

#[test]
fn overrides_apply_and_bad_values_are_ignored() {
    let env = HashMap::from([
        ("HEARTH_CACHE_TTL_MS", "1500"),
        ("HEARTH_RETRY_MAX_ATTEMPTS", "five"),
        ("HEARTH_RETRY_BASE_DELAY_MS", " 20 "),
        ("HEARTH_STORAGE_QUOTA_BYTES", "5242880"),
    ]);
    let mut config = SyncConfig::default();

    apply_overrides(&mut config, |name| env.get(name).map(|value| value.to_string()));

    assert_eq!(config.cache_ttl_ms, 1500);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.base_delay_ms, 20);
    assert_eq!(config.storage.quota_bytes, Some(5_242_880));
}

#[test]
fn configured_quota_bounds_folder_storage() {
    let dir = TempDir::new("config");
    let mut config = SyncConfig::default();
    config.storage.quota_bytes = Some(8);

    let storage = config.storage.open_folder(dir.path().join("profile"));

    storage.set("k", "1234").unwrap();
    assert!(matches!(storage.set("other", "1234"), Err(StorageError::QuotaExceeded { .. })));
}

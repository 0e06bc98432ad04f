// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::{ConfigError, SyncConfig};

pub const ENV_CACHE_TTL_MS: &str = "HEARTH_CACHE_TTL_MS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "HEARTH_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "HEARTH_RETRY_BASE_DELAY_MS";
pub const ENV_STORAGE_QUOTA_BYTES: &str = "HEARTH_STORAGE_QUOTA_BYTES";

/// Reads a JSON config file. Missing fields take their defaults.
pub fn load_from_path(path: &Path) -> Result<SyncConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let config: SyncConfig = serde_json::from_str(&contents)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    validate(path, &config)?;
    Ok(config)
}

/// File (when given) plus environment overrides; any failure is logged and replaced by the
/// defaults.
pub fn load_or_default(path: Option<&Path>) -> SyncConfig {
    let mut config = match path {
        Some(path) => load_from_path(path).unwrap_or_else(|err| {
            tracing::warn!("config load failed, using defaults: {err}");
            SyncConfig::default()
        }),
        None => SyncConfig::default(),
    };
    apply_env_overrides(&mut config);
    config
}

pub fn apply_env_overrides(config: &mut SyncConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

/// Applies `HEARTH_*` overrides resolved through `lookup`. Unparseable values are logged and
/// ignored.
pub fn apply_overrides(config: &mut SyncConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = parse_override::<u64>(&lookup, ENV_CACHE_TTL_MS) {
        config.cache_ttl_ms = value;
    }
    if let Some(value) = parse_override::<u32>(&lookup, ENV_RETRY_MAX_ATTEMPTS) {
        config.retry.max_attempts = value.max(1);
    }
    if let Some(value) = parse_override::<u64>(&lookup, ENV_RETRY_BASE_DELAY_MS) {
        config.retry.base_delay_ms = value;
    }
    if let Some(value) = parse_override::<usize>(&lookup, ENV_STORAGE_QUOTA_BYTES) {
        config.storage.quota_bytes = Some(value);
    }
}

fn parse_override<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("invalid {name}, ignoring: {err}");
            None
        }
    }
}

fn validate(path: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    };
    if config.retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts must be at least 1"));
    }
    if config.storage.record_key.trim().is_empty() {
        return Err(invalid("storage.record_key must not be empty"));
    }
    if !config.storage.stale_prefix.is_empty()
        && config.storage.record_key.starts_with(&config.storage.stale_prefix)
    {
        return Err(invalid("storage.record_key must not start with storage.stale_prefix"));
    }
    Ok(())
}

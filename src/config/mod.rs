// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a complete configuration. Hosts load
//! it with [`load_or_default`] and hand the result to
//! [`DataManager::new`](crate::sync::DataManager::new).

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{FolderStorage, LocalLayout, DEFAULT_RECORD_KEY, DEFAULT_STALE_PREFIX};
use crate::sync::RetryPolicy;

mod load;

pub use load::{apply_env_overrides, apply_overrides, load_from_path, load_or_default};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SyncConfig {
    pub cache_ttl_ms: u64,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 5 * 60 * 1000,
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, Duration::from_millis(self.retry.base_delay_ms))
    }

    pub fn local_layout(&self) -> LocalLayout {
        LocalLayout {
            record_key: self.storage.record_key.clone(),
            stale_prefix: self.storage.stale_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub record_key: String,
    pub stale_prefix: String,
    /// Byte budget for folder-backed storage; `None` is unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            record_key: DEFAULT_RECORD_KEY.to_owned(),
            stale_prefix: DEFAULT_STALE_PREFIX.to_owned(),
            quota_bytes: None,
        }
    }
}

impl StorageConfig {
    /// Folder-backed storage under `root`, bounded by the configured quota.
    pub fn open_folder(&self, root: impl Into<PathBuf>) -> FolderStorage {
        let storage = FolderStorage::new(root);
        match self.quota_bytes {
            Some(quota_bytes) => storage.with_quota(quota_bytes),
            None => storage,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests;

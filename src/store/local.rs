// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cache::{CacheKey, ReadCache};
use crate::model::{Clock, SimulatorRecord};

use super::mirror::{self, FlatEntries};
use super::storage::{KeyValueStorage, StorageError};

pub const DEFAULT_RECORD_KEY: &str = "simulatorData";
pub const DEFAULT_STALE_PREFIX: &str = "simulator-stale:";

/// Where the local store puts things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalLayout {
    /// Key of the consolidated JSON record.
    pub record_key: String,
    /// Keys with this prefix are leftovers (old snapshots, abandoned drafts) and may be evicted
    /// whenever space runs out.
    pub stale_prefix: String,
}

impl Default for LocalLayout {
    fn default() -> Self {
        Self {
            record_key: DEFAULT_RECORD_KEY.to_owned(),
            stale_prefix: DEFAULT_STALE_PREFIX.to_owned(),
        }
    }
}

/// The anonymous visitor's durable record.
///
/// Holds the consolidated record under [`LocalLayout::record_key`] plus one mirror entry per
/// allow-listed field for older readers. Without a storage backend every read is empty and
/// every write fails with [`StorageError::Unavailable`].
pub struct LocalCacheStore {
    storage: Option<Arc<dyn KeyValueStorage>>,
    cache: Arc<ReadCache>,
    clock: Arc<dyn Clock>,
    layout: LocalLayout,
}

impl LocalCacheStore {
    pub fn new(
        storage: Option<Arc<dyn KeyValueStorage>>,
        cache: Arc<ReadCache>,
        clock: Arc<dyn Clock>,
        layout: LocalLayout,
    ) -> Self {
        Self { storage, cache, clock, layout }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn layout(&self) -> &LocalLayout {
        &self.layout
    }

    /// Reads the stored record straight from the backend (the read cache is the engine's
    /// concern).
    ///
    /// Falls back to the per-field legacy entries when the consolidated record is missing or
    /// unreadable.
    pub fn read(&self) -> Result<Option<SimulatorRecord>, StorageError> {
        let Some(storage) = self.storage.as_deref() else {
            return Ok(None);
        };

        if let Some(raw) = storage.get(&self.layout.record_key)? {
            match serde_json::from_str::<SimulatorRecord>(&raw) {
                Ok(mut record) => {
                    record.reconcile_legacy_mirrors();
                    return Ok(Some(record));
                }
                Err(err) => {
                    tracing::warn!(
                        key = %self.layout.record_key,
                        error = %err,
                        "consolidated record is unreadable; rebuilding from legacy entries"
                    );
                }
            }
        }

        let mut entries = FlatEntries::new();
        for key in mirror::mirror_keys() {
            if let Some(value) = storage.get(key)? {
                entries.insert(key.to_owned(), value);
            }
        }
        if entries.is_empty() {
            return Ok(None);
        }

        let record = mirror::collapse(&entries);
        Ok((!record.is_empty()).then_some(record))
    }

    /// Merges `partial` onto the stored record and persists the result together with its
    /// mirror entries. Returns the record as stored.
    pub fn write(&self, partial: &SimulatorRecord) -> Result<SimulatorRecord, StorageError> {
        let Some(storage) = self.storage.as_deref() else {
            return Err(StorageError::Unavailable);
        };

        let mut record = self.read()?.unwrap_or_default();
        record.merge_from(partial);
        if record.created_at.is_none() {
            record.created_at = Some(self.clock.now());
        }
        record.reconcile_legacy_mirrors();

        match self.persist(storage, &record) {
            Ok(()) => {}
            Err(err) if err.is_quota_exceeded() => {
                let evicted = self.evict_stale(storage)?;
                tracing::warn!(evicted, error = %err, "local storage full; evicted stale keys");
                self.persist(storage, &record)?;
            }
            Err(err) => return Err(err),
        }

        self.cache.invalidate(&CacheKey::Local);
        Ok(record)
    }

    /// Removes the record, its mirror entries and every stale key.
    pub fn clear(&self) -> Result<(), StorageError> {
        let Some(storage) = self.storage.as_deref() else {
            return Ok(());
        };

        storage.remove(&self.layout.record_key)?;
        for key in mirror::mirror_keys() {
            storage.remove(key)?;
        }
        self.evict_stale(storage)?;

        self.cache.invalidate(&CacheKey::Local);
        Ok(())
    }

    fn persist(
        &self,
        storage: &dyn KeyValueStorage,
        record: &SimulatorRecord,
    ) -> Result<(), StorageError> {
        let key = &self.layout.record_key;
        let json = serde_json::to_string(record)
            .map_err(|source| StorageError::Json { key: key.clone(), source })?;
        storage.set(key, &json)?;

        let entries = mirror::expand(record)
            .map_err(|source| StorageError::Json { key: key.clone(), source })?;
        let written = entries.keys().map(String::as_str).collect::<BTreeSet<_>>();
        for (mirror_key, value) in &entries {
            storage.set(mirror_key, value)?;
        }
        for mirror_key in mirror::mirror_keys() {
            if !written.contains(mirror_key) {
                storage.remove(mirror_key)?;
            }
        }
        Ok(())
    }

    fn evict_stale(&self, storage: &dyn KeyValueStorage) -> Result<usize, StorageError> {
        if self.layout.stale_prefix.is_empty() {
            return Ok(0);
        }
        let stale = storage
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(&self.layout.stale_prefix))
            .collect::<Vec<_>>();
        for key in &stale {
            storage.remove(key)?;
        }
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests;

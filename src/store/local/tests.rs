// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::{LocalCacheStore, LocalLayout};
use crate::cache::{CacheKey, ReadCache, DEFAULT_TTL};
use crate::model::{BuildingLocation, ManualClock, SimulatorRecord, Timestamp};
use crate::store::{KeyValueStorage, MemoryStorage, StorageError};

const NOW: Timestamp = Timestamp::from_millis(1_000_000);

struct LocalCtx {
    storage: Arc<MemoryStorage>,
    cache: Arc<ReadCache>,
    store: LocalCacheStore,
}

impl LocalCtx {
    fn with_storage(storage: MemoryStorage) -> Self {
        let storage = Arc::new(storage);
        let clock = Arc::new(ManualClock::new(NOW));
        let cache = Arc::new(ReadCache::new(DEFAULT_TTL, clock.clone()));
        let store = LocalCacheStore::new(
            Some(storage.clone()),
            cache.clone(),
            clock,
            LocalLayout::default(),
        );
        Self { storage, cache, store }
    }
}

#[fixture]
fn ctx() -> LocalCtx {
    LocalCtx::with_storage(MemoryStorage::new())
}

fn budget(total_budget: i64) -> SimulatorRecord {
    SimulatorRecord { total_budget: Some(total_budget), ..SimulatorRecord::default() }
}

#[test]
fn headless_store_reads_nothing_and_refuses_writes() {
    let clock = Arc::new(ManualClock::new(NOW));
    let cache = Arc::new(ReadCache::new(DEFAULT_TTL, clock.clone()));
    let store = LocalCacheStore::new(None, cache, clock, LocalLayout::default());

    assert!(!store.is_available());
    assert_eq!(store.read().unwrap(), None);
    assert!(matches!(store.write(&budget(1)), Err(StorageError::Unavailable)));
    store.clear().unwrap();
}

#[rstest]
fn write_merges_onto_existing_record_and_stamps_created_at(ctx: LocalCtx) {
    ctx.store.write(&budget(4000)).unwrap();
    let partial = SimulatorRecord { land_budget: Some(500), ..SimulatorRecord::default() };
    let stored = ctx.store.write(&partial).unwrap();

    assert_eq!(stored.total_budget, Some(4000));
    assert_eq!(stored.land_budget, Some(500));
    assert_eq!(stored.created_at, Some(NOW));
    assert_eq!(ctx.store.read().unwrap(), Some(stored));
}

#[rstest]
fn write_persists_consolidated_record_and_mirror_entries(ctx: LocalCtx) {
    let partial = SimulatorRecord {
        total_budget: Some(4000),
        building_location: Some(BuildingLocation::new("A", "B")),
        ..SimulatorRecord::default()
    };
    ctx.store.write(&partial).unwrap();

    let consolidated = ctx.storage.get("simulatorData").unwrap().expect("consolidated");
    let json: serde_json::Value = serde_json::from_str(&consolidated).unwrap();
    assert_eq!(json["totalBudget"], serde_json::json!(4000));
    assert_eq!(json["selectedPrefecture"], serde_json::json!("A"));

    assert_eq!(ctx.storage.get("totalBudget").unwrap().as_deref(), Some("4000"));
    assert_eq!(ctx.storage.get("selectedPrefecture").unwrap().as_deref(), Some("A"));
    assert_eq!(ctx.storage.get("selectedCity").unwrap().as_deref(), Some("B"));
    assert_eq!(ctx.storage.get("createdAt").unwrap(), None);
}

#[rstest]
fn legacy_only_layout_is_reconstructed(ctx: LocalCtx) {
    ctx.storage.set("selectedPrefecture", "A").unwrap();
    ctx.storage.set("selectedCity", "B").unwrap();
    ctx.storage.set("totalBudget", "3500").unwrap();

    let record = ctx.store.read().unwrap().expect("record from legacy keys");

    assert_eq!(record.building_location, Some(BuildingLocation::new("A", "B")));
    assert_eq!(record.total_budget, Some(3500));
}

#[rstest]
fn unreadable_consolidated_record_falls_back_to_mirrors(ctx: LocalCtx) {
    ctx.storage.set("simulatorData", "{not json").unwrap();
    ctx.storage.set("landBudget", "700").unwrap();

    let record = ctx.store.read().unwrap().expect("record");
    assert_eq!(record.land_budget, Some(700));
}

#[rstest]
fn stale_mirror_keys_are_removed_when_the_field_disappears(ctx: LocalCtx) {
    let mut diagnosis = crate::model::HouseTypeDiagnosis::new();
    diagnosis.insert("q1".to_owned(), 1);
    ctx.storage.set("q2", "4").unwrap();

    let partial =
        SimulatorRecord { house_type_diagnosis: Some(diagnosis), ..SimulatorRecord::default() };
    ctx.store.write(&partial).unwrap();

    assert_eq!(ctx.storage.get("q1").unwrap().as_deref(), Some("1"));
    assert_eq!(ctx.storage.get("q2").unwrap(), None);
}

#[test]
fn quota_exhaustion_evicts_stale_keys_and_retries_once() {
    let ctx = LocalCtx::with_storage(MemoryStorage::with_quota(250));
    ctx.storage.set("simulator-stale:old", &"x".repeat(200)).unwrap();
    ctx.storage.set("unrelated", "keep").unwrap();

    ctx.store.write(&budget(4000)).unwrap();

    assert_eq!(ctx.storage.get("simulator-stale:old").unwrap(), None);
    assert_eq!(ctx.storage.get("unrelated").unwrap().as_deref(), Some("keep"));
    assert_eq!(ctx.store.read().unwrap().and_then(|r| r.total_budget), Some(4000));
}

#[test]
fn quota_exhaustion_surfaces_when_eviction_does_not_help() {
    let ctx = LocalCtx::with_storage(MemoryStorage::with_quota(40));

    let err = ctx.store.write(&budget(4000)).unwrap_err();

    assert!(err.is_quota_exceeded(), "expected quota error, got: {err:?}");
}

#[rstest]
fn clear_removes_record_mirrors_and_stale_keys_only(ctx: LocalCtx) {
    ctx.store.write(&budget(4000)).unwrap();
    ctx.storage.set("simulator-stale:draft", "{}").unwrap();
    ctx.storage.set("theme", "dark").unwrap();

    ctx.store.clear().unwrap();

    assert_eq!(ctx.store.read().unwrap(), None);
    assert_eq!(ctx.storage.keys().unwrap(), vec!["theme".to_owned()]);
}

#[rstest]
fn write_and_clear_invalidate_the_local_cache_slot(ctx: LocalCtx) {
    ctx.cache.put(CacheKey::Local, budget(1));
    ctx.store.write(&budget(2)).unwrap();
    assert_eq!(ctx.cache.get(&CacheKey::Local), None);

    ctx.cache.put(CacheKey::Local, budget(2));
    ctx.store.clear().unwrap();
    assert_eq!(ctx.cache.get(&CacheKey::Local), None);
}

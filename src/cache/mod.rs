// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Short-lived in-process read cache.
//!
//! Sits in front of both the local store and the remote adapter so repeated reads within one
//! process do not hit either. Entries age out after a fixed TTL; an expired entry is treated as
//! a miss even though it stays in the map until overwritten or invalidated.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::model::{Clock, SimulatorRecord, Timestamp, UserId};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The anonymous record held by the local store.
    Local,
    /// The remote record of one user.
    User(UserId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::User(user_id) => write!(f, "user:{user_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub record: SimulatorRecord,
    pub age: Duration,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: SimulatorRecord,
    stored_at: Timestamp,
}

pub struct ReadCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ReadCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock, entries: Mutex::default() }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached record and its age, or `None` when missing or older than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<CacheHit> {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        let age = now.saturating_since(entry.stored_at);
        if age > self.ttl {
            return None;
        }
        Some(CacheHit { record: entry.record.clone(), age })
    }

    pub fn put(&self, key: CacheKey, record: SimulatorRecord) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, CacheEntry { record, stored_at });
    }

    /// Merges `partial` into a live entry, keeping its original age.
    ///
    /// Returns `false` (and caches nothing) when there is no live entry: a partial alone is not
    /// a complete record.
    pub fn merge(&self, key: &CacheKey, partial: &SimulatorRecord) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        if now.saturating_since(entry.stored_at) > self.ttl {
            entries.remove(key);
            return false;
        }
        entry.record.merge_from(partial);
        true
    }

    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }
}

impl fmt::Debug for ReadCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ReadCache")
            .field("ttl", &self.ttl)
            .field("keys", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::{CacheKey, ReadCache, DEFAULT_TTL};
    use crate::model::{ManualClock, SimulatorRecord, Timestamp, UserId};

    struct CacheCtx {
        clock: Arc<ManualClock>,
        cache: ReadCache,
    }

    #[fixture]
    fn ctx() -> CacheCtx {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)));
        let cache = ReadCache::new(DEFAULT_TTL, clock.clone());
        CacheCtx { clock, cache }
    }

    fn record(total_budget: i64) -> SimulatorRecord {
        SimulatorRecord { total_budget: Some(total_budget), ..SimulatorRecord::default() }
    }

    #[rstest]
    fn entry_is_a_hit_just_before_ttl(ctx: CacheCtx) {
        ctx.cache.put(CacheKey::Local, record(4000));
        ctx.clock.advance(DEFAULT_TTL - Duration::from_millis(1));

        let hit = ctx.cache.get(&CacheKey::Local).expect("hit");
        assert_eq!(hit.record, record(4000));
        assert_eq!(hit.age, DEFAULT_TTL - Duration::from_millis(1));
    }

    #[rstest]
    fn entry_is_a_miss_just_after_ttl(ctx: CacheCtx) {
        ctx.cache.put(CacheKey::Local, record(4000));
        ctx.clock.advance(DEFAULT_TTL + Duration::from_millis(1));

        assert_eq!(ctx.cache.get(&CacheKey::Local), None);
    }

    #[rstest]
    fn keys_do_not_alias(ctx: CacheCtx) {
        let alice = CacheKey::User(UserId::new("alice").unwrap());
        let bob = CacheKey::User(UserId::new("bob").unwrap());
        ctx.cache.put(alice.clone(), record(1));

        assert!(ctx.cache.get(&alice).is_some());
        assert_eq!(ctx.cache.get(&bob), None);
        assert_eq!(ctx.cache.get(&CacheKey::Local), None);
    }

    #[rstest]
    fn merge_updates_live_entries_only(ctx: CacheCtx) {
        let partial = SimulatorRecord { land_budget: Some(500), ..SimulatorRecord::default() };
        assert!(!ctx.cache.merge(&CacheKey::Local, &partial));
        assert_eq!(ctx.cache.get(&CacheKey::Local), None);

        ctx.cache.put(CacheKey::Local, record(4000));
        assert!(ctx.cache.merge(&CacheKey::Local, &partial));
        let merged = ctx.cache.get(&CacheKey::Local).unwrap().record;
        assert_eq!(merged.total_budget, Some(4000));
        assert_eq!(merged.land_budget, Some(500));

        ctx.clock.advance(DEFAULT_TTL + Duration::from_millis(1));
        assert!(!ctx.cache.merge(&CacheKey::Local, &partial));
    }

    #[rstest]
    fn invalidation_drops_entries(ctx: CacheCtx) {
        let user = CacheKey::User(UserId::new("u1").unwrap());
        ctx.cache.put(CacheKey::Local, record(1));
        ctx.cache.put(user.clone(), record(2));

        ctx.cache.invalidate(&CacheKey::Local);
        assert_eq!(ctx.cache.get(&CacheKey::Local), None);
        assert!(ctx.cache.get(&user).is_some());

        ctx.cache.invalidate_all();
        assert_eq!(ctx.cache.get(&user), None);
    }
}

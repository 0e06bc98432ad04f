// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The synchronization engine.
//!
//! [`DataManager`] decides, per call, whether the local store or the remote document is
//! authoritative (the [`Session`] passed in), retries remote calls, keeps the read cache warm
//! and hands out live subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::{CacheKey, ReadCache};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::{AuthWatch, Clock, Session, SimulatorRecord, UserId};
use crate::remote::RemoteDocumentStore;
use crate::store::{KeyValueStorage, LocalCacheStore};

mod retry;
mod subscription;

pub use retry::{execute_with_policy, RetryPolicy};
pub use subscription::Unsubscribe;

/// Which side survived a migration that found a remote record already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationWinner {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The local store held no record.
    NothingToMigrate,
    /// No remote record existed; the local record was copied over.
    Migrated,
    /// Both sides held a record and `winner` is now the remote one.
    Conflict { winner: MigrationWinner },
}

pub struct DataManager {
    local: LocalCacheStore,
    remote: Arc<dyn RemoteDocumentStore>,
    cache: Arc<ReadCache>,
    auth: AuthWatch,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    subscriptions: Mutex<HashMap<UserId, Unsubscribe>>,
}

impl DataManager {
    /// `storage` is `None` on hosts without durable local storage; local reads are then empty
    /// and local writes fail.
    pub fn new(
        config: &SyncConfig,
        storage: Option<Arc<dyn KeyValueStorage>>,
        remote: Arc<dyn RemoteDocumentStore>,
        auth: AuthWatch,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(ReadCache::new(config.cache_ttl(), clock.clone()));
        let local =
            LocalCacheStore::new(storage, cache.clone(), clock.clone(), config.local_layout());
        Self {
            local,
            remote,
            cache,
            auth,
            clock,
            retry: config.retry_policy(),
            subscriptions: Mutex::default(),
        }
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    pub fn local_store(&self) -> &LocalCacheStore {
        &self.local
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The live session according to the authentication signal.
    pub fn current_session(&self) -> Session {
        self.auth.current()
    }

    /// Saves `partial`, routed by `session`.
    ///
    /// Authenticated saves go to the remote document. If that fails the partial is written to
    /// the local store instead so nothing typed is lost, and the remote error is returned.
    #[tracing::instrument(
        skip_all,
        fields(session = %session, fields = partial.present_keys().len())
    )]
    pub async fn save_data(
        &self,
        session: &Session,
        partial: &SimulatorRecord,
    ) -> Result<(), SyncError> {
        let now = self.clock.now();
        let mut stamped = partial.clone();
        stamped.updated_at = Some(now);
        stamped.reconcile_legacy_mirrors();

        let Session::Authenticated(user_id) = session else {
            self.local.write(&stamped)?;
            return Ok(());
        };

        let mut synced = stamped.clone();
        synced.last_synced_at = Some(now);
        let result = execute_with_policy(&self.retry, "merge_update", || {
            self.remote.merge_update(user_id, &synced)
        })
        .await;
        self.ensure_current(session)?;

        match result {
            Ok(()) => {
                self.cache.merge(&CacheKey::User(user_id.clone()), &synced);
                Ok(())
            }
            Err(err) => {
                match self.local.write(&stamped) {
                    Ok(_) => tracing::info!("remote save failed; kept the data locally"),
                    Err(local_err) => {
                        tracing::error!(error = %local_err, "local fallback write failed")
                    }
                }
                Err(err)
            }
        }
    }

    /// Field-level remote update for authenticated sessions. Unspecified fields are left alone
    /// remotely; the partial is also mirrored into the local store when possible.
    #[tracing::instrument(
        skip_all,
        fields(session = %session, fields = partial.present_keys().len())
    )]
    pub async fn update_partial_data(
        &self,
        session: &Session,
        partial: &SimulatorRecord,
    ) -> Result<(), SyncError> {
        let user_id = session.user_id().ok_or(SyncError::Unauthenticated)?;

        let now = self.clock.now();
        let mut stamped = partial.clone();
        stamped.updated_at = Some(now);
        stamped.last_partial_synced_at = Some(now);
        stamped.reconcile_legacy_mirrors();

        let result = execute_with_policy(&self.retry, "merge_update", || {
            self.remote.merge_update(user_id, &stamped)
        })
        .await;
        self.ensure_current(session)?;
        result?;

        self.cache.merge(&CacheKey::User(user_id.clone()), &stamped);
        if self.local.is_available() {
            if let Err(err) = self.local.write(&stamped) {
                tracing::warn!(error = %err, "local mirror of partial update failed");
            }
        }
        Ok(())
    }

    /// The anonymous record, through the read cache.
    pub fn get_from_local_storage(&self) -> Result<Option<SimulatorRecord>, SyncError> {
        if let Some(hit) = self.cache.get(&CacheKey::Local) {
            tracing::trace!(age_ms = hit.age.as_millis() as u64, "local cache hit");
            return Ok(Some(hit.record));
        }
        let record = self.local.read()?;
        if let Some(record) = &record {
            self.cache.put(CacheKey::Local, record.clone());
        }
        Ok(record)
    }

    /// The user's remote record, through the read cache.
    #[tracing::instrument(skip_all, fields(session = %session))]
    pub async fn get_from_remote(
        &self,
        session: &Session,
    ) -> Result<Option<SimulatorRecord>, SyncError> {
        let user_id = session.user_id().ok_or(SyncError::Unauthenticated)?;
        let key = CacheKey::User(user_id.clone());
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(age_ms = hit.age.as_millis() as u64, "remote cache hit");
            return Ok(Some(hit.record));
        }

        let record =
            execute_with_policy(&self.retry, "read", || self.remote.read(user_id)).await?;
        self.ensure_current(session)?;

        if let Some(record) = &record {
            self.cache.put(key, record.clone());
        }
        Ok(record)
    }

    /// Streams the user's remote record.
    ///
    /// `on_next` sees the initial snapshot and every later change (`None` while the document
    /// does not exist); each snapshot refreshes the read cache first. Stream failures go to
    /// `on_error` and do not end the subscription. Subscribing again for the same user tears
    /// the previous subscription down. Must be called inside a tokio runtime.
    #[tracing::instrument(skip_all, fields(session = %session))]
    pub async fn subscribe_to_remote<N, E>(
        &self,
        session: &Session,
        on_next: N,
        on_error: E,
    ) -> Result<Unsubscribe, SyncError>
    where
        N: Fn(Option<SimulatorRecord>) + Send + Sync + 'static,
        E: Fn(SyncError) + Send + Sync + 'static,
    {
        let user_id = session.user_id().ok_or(SyncError::Unauthenticated)?.clone();

        let mut stream =
            execute_with_policy(&self.retry, "subscribe", || self.remote.subscribe(&user_id))
                .await?;
        if let Err(err) = self.ensure_current(session) {
            stream.close();
            return Err(err);
        }

        let handle = Unsubscribe::new();
        let previous = self.lock_subscriptions().insert(user_id.clone(), handle.clone());
        if let Some(previous) = previous {
            tracing::debug!(user = %user_id, "replacing existing subscription");
            previous.unsubscribe();
        }

        let driver = handle.clone();
        let cache = self.cache.clone();
        let auth = self.auth.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let key = CacheKey::User(user_id.clone());
            loop {
                let event = tokio::select! {
                    biased;
                    _ = driver.cancelled() => break,
                    event = stream.next() => event,
                };
                let Some(event) = event else {
                    tracing::debug!(user = %user_id, "remote stream ended");
                    break;
                };
                if driver.is_unsubscribed() {
                    break;
                }
                if auth.current() != session {
                    tracing::debug!(user = %user_id, "dropping snapshot for a stale session");
                    continue;
                }
                match event {
                    Ok(Some(record)) => {
                        cache.put(key.clone(), record.clone());
                        on_next(Some(record));
                    }
                    Ok(None) => {
                        cache.invalidate(&key);
                        on_next(None);
                    }
                    Err(err) => {
                        tracing::warn!(user = %user_id, error = %err, "remote stream error");
                        on_error(SyncError::from_remote("subscribe", 1, err));
                    }
                }
            }
            stream.close();
            tracing::debug!(user = %user_id, "subscription closed");
        });

        Ok(handle)
    }

    /// Moves the anonymous record into the user's remote document.
    ///
    /// When the user already has a remote record the newer `updatedAt` wins (a missing stamp
    /// counts as oldest, ties keep the remote). The local record is cleared afterwards. A
    /// failure before the remote write leaves both sides untouched. A session change or a
    /// failure to clear the local record after it rolls the remote write back.
    #[tracing::instrument(skip_all, fields(session = %session))]
    pub async fn migrate_local_to_remote(
        &self,
        session: &Session,
    ) -> Result<MigrationOutcome, SyncError> {
        let user_id = session.user_id().ok_or(SyncError::Unauthenticated)?;

        let Some(local) = self.local.read()? else {
            tracing::debug!("no local record to migrate");
            return Ok(MigrationOutcome::NothingToMigrate);
        };

        let existing =
            execute_with_policy(&self.retry, "read", || self.remote.read(user_id)).await?;
        self.ensure_current(session)?;

        let local_wins = existing
            .as_ref()
            .map_or(true, |remote| local.updated_at_or_epoch() > remote.updated_at_or_epoch());

        let key = CacheKey::User(user_id.clone());
        if !local_wins {
            self.local.clear()?;
            if let Some(remote) = existing {
                self.cache.put(key, remote);
            }
            tracing::info!("remote record is newer; discarded local record");
            return Ok(MigrationOutcome::Conflict { winner: MigrationWinner::Remote });
        }

        let mut migrated = local;
        migrated.migrated_at = Some(self.clock.now());
        migrated.reconcile_legacy_mirrors();
        execute_with_policy(&self.retry, "create", || self.remote.create(user_id, &migrated))
            .await?;
        if let Err(err) = self.ensure_current(session) {
            self.compensate_remote_write(user_id, existing.as_ref()).await;
            return Err(err);
        }

        if let Err(err) = self.local.clear() {
            self.cache.invalidate(&key);
            self.compensate_remote_write(user_id, existing.as_ref()).await;
            return Err(err.into());
        }
        self.cache.put(key, migrated);

        if existing.is_some() {
            tracing::info!("local record is newer; replaced remote record");
            Ok(MigrationOutcome::Conflict { winner: MigrationWinner::Local })
        } else {
            tracing::info!("migrated local record");
            Ok(MigrationOutcome::Migrated)
        }
    }

    /// Deletes everything: live subscriptions, cached reads, the local record and (when
    /// authenticated) the remote document.
    #[tracing::instrument(skip_all, fields(session = %session))]
    pub async fn clear_all_data(&self, session: &Session) -> Result<(), SyncError> {
        self.unsubscribe_all();
        self.cache.invalidate_all();
        self.local.clear()?;

        if let Session::Authenticated(user_id) = session {
            execute_with_policy(&self.retry, "delete", || self.remote.delete(user_id)).await?;
            self.ensure_current(session)?;
        }
        tracing::info!("cleared all simulator data");
        Ok(())
    }

    /// Tears down every live subscription (sign-out).
    pub fn unsubscribe_all(&self) {
        let drained = self.lock_subscriptions().drain().collect::<Vec<_>>();
        for (user_id, handle) in drained {
            tracing::debug!(user = %user_id, "unsubscribing");
            handle.unsubscribe();
        }
    }

    /// Live subscriptions currently registered.
    pub fn active_subscriptions(&self) -> usize {
        let mut subscriptions = self.lock_subscriptions();
        subscriptions.retain(|_, handle| !handle.is_unsubscribed());
        subscriptions.len()
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    fn ensure_current(&self, session: &Session) -> Result<(), SyncError> {
        let live = self.auth.current();
        if live == *session {
            return Ok(());
        }
        tracing::warn!(started = %session, live = %live, "session changed; discarding result");
        Err(SyncError::SessionChanged)
    }

    async fn compensate_remote_write(&self, user_id: &UserId, prior: Option<&SimulatorRecord>) {
        let rollback = match prior {
            Some(prior) => {
                execute_with_policy(&self.retry, "create", || self.remote.create(user_id, prior))
                    .await
            }
            None => {
                execute_with_policy(&self.retry, "delete", || self.remote.delete(user_id)).await
            }
        };
        match rollback {
            Ok(()) => tracing::warn!(user = %user_id, "rolled back remote migration write"),
            Err(err) => {
                tracing::error!(user = %user_id, error = %err, "failed to roll back migration")
            }
        }
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Unsubscribe>> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DataManager {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{RemoteDocumentStore, RemoteError, SnapshotSender, SnapshotStream};
use crate::model::{SimulatorRecord, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Create,
    Read,
    MergeUpdate,
    Delete,
    Subscribe,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<UserId, SimulatorRecord>,
    subscribers: HashMap<UserId, Vec<SnapshotSender>>,
    faults: HashMap<RemoteOp, VecDeque<RemoteError>>,
    calls: HashMap<RemoteOp, u32>,
}

/// In-process [`RemoteDocumentStore`].
///
/// Behaves like a document database with merge writes and live listeners. Failures can be
/// queued per operation to exercise retry and fallback paths, and an optional latency turns
/// every call into a real suspension point.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The next call of `op` fails with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.fail_times(op, 1, error);
    }

    pub fn fail_times(&self, op: RemoteOp, times: usize, error: RemoteError) {
        let mut state = self.lock();
        let queue = state.faults.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// How many times `op` was attempted, failed attempts included.
    pub fn calls(&self, op: RemoteOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn document(&self, user_id: &UserId) -> Option<SimulatorRecord> {
        self.lock().documents.get(user_id).cloned()
    }

    /// Seeds or overwrites a document out of band (another device, an admin tool), notifying
    /// listeners.
    pub fn put_document(&self, user_id: &UserId, record: SimulatorRecord) {
        let mut state = self.lock();
        state.documents.insert(user_id.clone(), record);
        Self::notify(&mut state, user_id);
    }

    /// Pushes an error to every live listener of `user_id`.
    pub fn emit_error(&self, user_id: &UserId, error: RemoteError) {
        let mut state = self.lock();
        if let Some(senders) = state.subscribers.get_mut(user_id) {
            senders.retain(|sender| sender.send(Err(error.clone())));
        }
    }

    pub fn listener_count(&self, user_id: &UserId) -> usize {
        let mut state = self.lock();
        match state.subscribers.get_mut(user_id) {
            Some(senders) => {
                senders.retain(|sender| !sender.is_closed());
                senders.len()
            }
            None => 0,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn begin(&self, op: RemoteOp) -> Result<(), RemoteError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        match state.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn notify(state: &mut MemoryState, user_id: &UserId) {
        let snapshot = state.documents.get(user_id).cloned();
        if let Some(senders) = state.subscribers.get_mut(user_id) {
            senders.retain(|sender| sender.send(Ok(snapshot.clone())));
        }
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryRemoteStore {
    async fn create(&self, user_id: &UserId, record: &SimulatorRecord) -> Result<(), RemoteError> {
        self.begin(RemoteOp::Create).await?;
        let mut state = self.lock();
        state.documents.insert(user_id.clone(), record.clone());
        Self::notify(&mut state, user_id);
        Ok(())
    }

    async fn read(&self, user_id: &UserId) -> Result<Option<SimulatorRecord>, RemoteError> {
        self.begin(RemoteOp::Read).await?;
        Ok(self.lock().documents.get(user_id).cloned())
    }

    async fn merge_update(
        &self,
        user_id: &UserId,
        partial: &SimulatorRecord,
    ) -> Result<(), RemoteError> {
        self.begin(RemoteOp::MergeUpdate).await?;
        let mut state = self.lock();
        let document = state.documents.entry(user_id.clone()).or_default();
        let previous_updated_at = document.updated_at;
        document.merge_from(partial);
        // updatedAt never moves backwards, whatever the writer's clock says.
        document.updated_at = match (previous_updated_at, document.updated_at) {
            (Some(previous), Some(incoming)) => Some(previous.max(incoming)),
            (previous, incoming) => incoming.or(previous),
        };
        Self::notify(&mut state, user_id);
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), RemoteError> {
        self.begin(RemoteOp::Delete).await?;
        let mut state = self.lock();
        if state.documents.remove(user_id).is_some() {
            Self::notify(&mut state, user_id);
        }
        Ok(())
    }

    async fn subscribe(&self, user_id: &UserId) -> Result<SnapshotStream, RemoteError> {
        self.begin(RemoteOp::Subscribe).await?;
        let (sender, stream) = SnapshotStream::channel();
        let mut state = self.lock();
        let initial = state.documents.get(user_id).cloned();
        sender.send(Ok(initial));
        state.subscribers.entry(user_id.clone()).or_default().push(sender);
        Ok(stream)
    }
}

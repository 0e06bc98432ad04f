// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Remote document store seam.
//!
//! One document per authenticated user. Adapters never retry on their own; they classify each
//! failure with a [`RemoteErrorKind`] and the engine decides what to do with it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::{SimulatorRecord, UserId};

pub mod memory;

pub use memory::{MemoryRemoteStore, RemoteOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    Network,
    Unavailable,
    Timeout,
    PermissionDenied,
    NotFound,
    InvalidArgument,
    ResourceExhausted,
}

impl RemoteErrorKind {
    /// Only transport-level trouble is worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Unavailable | Self::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::InvalidArgument => "invalid-argument",
            Self::ResourceExhausted => "resource-exhausted",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    kind: RemoteErrorKind,
    message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidArgument, message)
    }

    pub fn kind(&self) -> RemoteErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// State of one user's document as seen by a live subscription; `None` means it does not
/// exist.
pub type Snapshot = Option<SimulatorRecord>;

pub type SnapshotEvent = Result<Snapshot, RemoteError>;

/// Adapter half of a live subscription.
#[derive(Debug, Clone)]
pub struct SnapshotSender {
    tx: mpsc::UnboundedSender<SnapshotEvent>,
    closed: Arc<AtomicBool>,
}

impl SnapshotSender {
    /// Queues an event. Returns `false` once the consumer closed the stream; the sender should
    /// then be dropped.
    pub fn send(&self, event: SnapshotEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// Consumer half of a live subscription: an initial snapshot followed by updates.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    closed: Arc<AtomicBool>,
}

impl SnapshotStream {
    pub fn channel() -> (SnapshotSender, SnapshotStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (SnapshotSender { tx, closed: closed.clone() }, SnapshotStream { rx, closed })
    }

    /// Next event, or `None` once closed. Nothing queued before [`close`](Self::close) is
    /// delivered after it.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        if self.is_closed() {
            return None;
        }
        let event = self.rx.recv().await;
        if self.is_closed() {
            return None;
        }
        event
    }

    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.rx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Create/read/merge/subscribe against one document per user id.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Writes `record` as the whole document, replacing whatever was there.
    async fn create(&self, user_id: &UserId, record: &SimulatorRecord) -> Result<(), RemoteError>;

    async fn read(&self, user_id: &UserId) -> Result<Option<SimulatorRecord>, RemoteError>;

    /// Field-level merge: only fields present in `partial` change. Creates the document when it
    /// does not exist yet.
    async fn merge_update(
        &self,
        user_id: &UserId,
        partial: &SimulatorRecord,
    ) -> Result<(), RemoteError>;

    /// Removes the document; deleting a missing document succeeds.
    async fn delete(&self, user_id: &UserId) -> Result<(), RemoteError>;

    async fn subscribe(&self, user_id: &UserId) -> Result<SnapshotStream, RemoteError>;
}

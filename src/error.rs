// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use thiserror::Error;

use crate::remote::{RemoteError, RemoteErrorKind};
use crate::store::StorageError;

/// Failure of a [`DataManager`](crate::sync::DataManager) operation.
///
/// The engine only classifies; callers decide what to tell the user. A migration conflict is
/// not an error: it is reported through
/// [`MigrationOutcome::Conflict`](crate::sync::MigrationOutcome::Conflict).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("operation requires an authenticated session")]
    Unauthenticated,

    /// A retryable remote failure that outlived the retry budget.
    #[error("remote {operation} failed after {attempts} attempt(s): {source}")]
    Retryable {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// A remote failure that retrying cannot fix (permission, not found, malformed request).
    #[error("remote {operation} failed: {source}")]
    Terminal {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("local storage quota exceeded while writing {key:?}")]
    QuotaExceeded { key: String },

    #[error(transparent)]
    Storage(StorageError),

    /// The session the operation started with is no longer the live one; its result was
    /// discarded.
    #[error("session changed while the operation was in flight")]
    SessionChanged,
}

impl SyncError {
    pub(crate) fn from_remote(operation: &'static str, attempts: u32, source: RemoteError) -> Self {
        if source.is_retryable() {
            Self::Retryable { operation, attempts, source }
        } else {
            Self::Terminal { operation, source }
        }
    }

    /// Classification of the underlying remote failure, if any.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Self::Retryable { source, .. } | Self::Terminal { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::QuotaExceeded { key, .. } => Self::QuotaExceeded { key },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SyncError;
    use crate::remote::{RemoteError, RemoteErrorKind};
    use crate::store::StorageError;

    #[test]
    fn remote_errors_split_by_classification() {
        let retryable = SyncError::from_remote("read", 3, RemoteError::unavailable("down"));
        assert!(matches!(retryable, SyncError::Retryable { attempts: 3, .. }));
        assert_eq!(retryable.remote_kind(), Some(RemoteErrorKind::Unavailable));

        let terminal = SyncError::from_remote("read", 1, RemoteError::permission_denied("no"));
        assert!(matches!(terminal, SyncError::Terminal { .. }));
    }

    #[test]
    fn quota_storage_error_becomes_quota_exceeded() {
        let err: SyncError =
            StorageError::QuotaExceeded { key: "simulatorData".to_owned(), needed: 10, quota: 5 }
                .into();
        assert!(matches!(err, SyncError::QuotaExceeded { ref key } if key == "simulatorData"));
    }
}

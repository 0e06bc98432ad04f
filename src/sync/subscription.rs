// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Cancellation {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Handle to a live remote subscription.
///
/// Clones share the same subscription. [`unsubscribe`](Self::unsubscribe) is idempotent. On a
/// current-thread runtime no snapshot is delivered once it returns; on a multi-thread runtime
/// a delivery already past the cancellation check may still complete.
#[derive(Debug, Clone, Default)]
pub struct Unsubscribe {
    inner: Arc<Cancellation>,
}

impl Unsubscribe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn unsubscribe(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_one();
        }
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`unsubscribe`](Self::unsubscribe) has been called. Meant for the single
    /// task that drives the subscription.
    pub(crate) async fn cancelled(&self) {
        if self.is_unsubscribed() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

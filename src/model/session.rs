// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use tokio::sync::watch;

use super::ids::UserId;

/// Who the current visitor is, as far as routing is concerned.
///
/// Every engine operation receives the session explicitly; the live [`AuthSignal`] is only
/// consulted to detect that the session changed while an operation was in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(UserId),
}

impl Session {
    pub fn authenticated(user_id: UserId) -> Self {
        Self::Authenticated(user_id)
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user_id) => Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated(user_id) => write!(f, "user:{user_id}"),
        }
    }
}

/// Publishing side of the authentication signal, owned by the identity integration.
#[derive(Debug)]
pub struct AuthSignal {
    tx: watch::Sender<Session>,
}

impl AuthSignal {
    pub fn new(initial: Session) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn anonymous() -> Self {
        Self::new(Session::Anonymous)
    }

    /// Publishes a new session. Subscribers are only woken when the value actually changes.
    pub fn set(&self, session: Session) {
        self.tx.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            *current = session;
            true
        });
    }

    pub fn sign_in(&self, user_id: UserId) {
        self.set(Session::Authenticated(user_id));
    }

    pub fn sign_out(&self) {
        self.set(Session::Anonymous);
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> AuthWatch {
        AuthWatch { rx: self.tx.subscribe() }
    }
}

/// Read side of the authentication signal.
#[derive(Debug, Clone)]
pub struct AuthWatch {
    rx: watch::Receiver<Session>,
}

impl AuthWatch {
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    /// Waits for the next session change. Returns `None` once the signal owner is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthSignal, Session};
    use crate::model::UserId;

    #[test]
    fn session_exposes_user_id_only_when_authenticated() {
        let user_id = UserId::new("u1").unwrap();
        assert_eq!(Session::Anonymous.user_id(), None);
        assert_eq!(Session::authenticated(user_id.clone()).user_id(), Some(&user_id));
    }

    #[tokio::test]
    async fn watch_sees_sign_in_and_skips_redundant_updates() {
        let signal = AuthSignal::anonymous();
        let mut watch = signal.watch();
        let user_id = UserId::new("u1").unwrap();

        signal.sign_in(user_id.clone());
        assert_eq!(watch.changed().await, Some(Session::Authenticated(user_id.clone())));

        signal.sign_in(user_id.clone());
        assert!(!watch.rx.has_changed().unwrap());

        signal.sign_out();
        assert_eq!(watch.changed().await, Some(Session::Anonymous));
        assert_eq!(signal.current(), Session::Anonymous);
    }
}

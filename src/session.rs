//! Per-client session state.
//!
//! Handlers only read from [`Sessions`]. Writes come from the identity listener
//! in [`crate::background::session_listener`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::backend::{AuthUser, SessionId};
use crate::models::user::User;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// `None` until the identity provider has reported on this session.
    pub signed_in: Option<bool>,
    pub profile: Option<User>,
}

impl From<Option<AuthUser>> for SessionState {
    fn from(user: Option<AuthUser>) -> Self {
        Self {
            signed_in: Some(user.is_some()),
            profile: user.map(User::from),
        }
    }
}

#[derive(Clone, Default)]
pub struct Sessions {
    states: Arc<DashMap<SessionId, watch::Sender<SessionState>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SessionId) -> SessionState {
        self.states
            .get(&id)
            .map(|state| state.borrow().clone())
            .unwrap_or_default()
    }

    pub fn viewer(&self, id: SessionId) -> Option<User> {
        self.get(id).profile
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.states.iter().map(|entry| *entry.key()).collect()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.states.contains_key(&id)
    }

    /// Records what the identity provider reported. A signed-out session is dropped
    /// from the registry once its waiters have been woken.
    pub(crate) fn publish(&self, id: SessionId, state: SessionState) {
        if state.signed_in == Some(false) {
            if let Some((_, sender)) = self.states.remove(&id) {
                sender.send_replace(state);
            }
            return;
        }
        self.states
            .entry(id)
            .or_insert_with(|| watch::channel(SessionState::default()).0)
            .send_replace(state);
    }

    /// Waits until the session satisfies `ready`, giving up after `timeout`.
    ///
    /// An entry left undetermined by a timeout is removed again.
    pub async fn settle<F>(&self, id: SessionId, timeout: Duration, ready: F) -> bool
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut rx = self
            .states
            .entry(id)
            .or_insert_with(|| watch::channel(SessionState::default()).0)
            .subscribe();

        let settled = tokio::time::timeout(timeout, rx.wait_for(ready))
            .await
            .is_ok_and(|waited| waited.is_ok());
        if !settled {
            self.states
                .remove_if(&id, |_, sender| sender.borrow().signed_in.is_none());
        }
        settled
    }

    /// Waits until a sign-out of `id` has been published. An id the registry no
    /// longer holds counts as signed out.
    pub async fn settle_signed_out(&self, id: SessionId, timeout: Duration) -> bool {
        let Some(mut rx) = self.states.get(&id).map(|sender| sender.subscribe()) else {
            return true;
        };
        let settled = tokio::time::timeout(timeout, rx.wait_for(|s| s.signed_in == Some(false)))
            .await
            .is_ok_and(|waited| waited.is_ok());
        settled
    }
}

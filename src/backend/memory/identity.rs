use axum::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::backend::{
    AuthError, AuthEvent, AuthProvider, AuthUser, FederatedAssertion, IdentityProvider,
    ProfileUpdate, SessionId,
};

const MIN_PASSWORD_LEN: usize = 6;
const EVENT_CAPACITY: usize = 256;

struct PasswordAccount {
    uid: String,
    password: String,
}

/// Identity provider kept in process memory. Passwords are compared verbatim.
pub struct MemoryIdentityProvider {
    users: DashMap<String, AuthUser>,
    by_email: DashMap<String, PasswordAccount>,
    federated: DashMap<String, String>,
    sessions: DashMap<SessionId, String>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            users: DashMap::new(),
            by_email: DashMap::new(),
            federated: DashMap::new(),
            sessions: DashMap::new(),
            events,
        }
    }

    fn user(&self, uid: &str) -> Result<AuthUser, AuthError> {
        self.users
            .get(uid)
            .map(|u| u.value().clone())
            .ok_or_else(|| AuthError::Backend(format!("account {uid} vanished")))
    }

    fn start_session(&self, session: SessionId, user: AuthUser) -> AuthUser {
        self.sessions.insert(session, user.uid.clone());
        self.emit(session, Some(user.clone()));
        user
    }

    fn emit(&self, session: SessionId, user: Option<AuthUser>) {
        // Nobody listening is fine.
        let _ = self.events.send(AuthEvent { session, user });
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up_with_email(
        &self,
        session: SessionId,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let uid = Uuid::now_v7().simple().to_string();
        match self.by_email.entry(email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(AuthError::EmailInUse),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(PasswordAccount {
                    uid: uid.clone(),
                    password: password.to_string(),
                });
            }
        }

        let user = AuthUser {
            uid: uid.clone(),
            email: Some(email),
            display_name: None,
            photo_url: None,
        };
        self.users.insert(uid, user.clone());
        Ok(self.start_session(session, user))
    }

    async fn sign_in_with_email(
        &self,
        session: SessionId,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let uid = self
            .by_email
            .get(&normalize_email(email))
            .filter(|account| account.password == password)
            .map(|account| account.uid.clone())
            .ok_or(AuthError::InvalidCredentials)?;

        let user = self.user(&uid)?;
        Ok(self.start_session(session, user))
    }

    async fn sign_in_with_provider(
        &self,
        session: SessionId,
        provider: AuthProvider,
        assertion: FederatedAssertion,
    ) -> Result<AuthUser, AuthError> {
        if assertion.subject.trim().is_empty() {
            return Err(AuthError::Cancelled);
        }

        let key = format!("{}:{}", provider.as_str(), assertion.subject);
        let existing = self.federated.get(&key).map(|uid| uid.value().clone());
        let user = match existing {
            Some(uid) => self.user(&uid)?,
            None => {
                let user = AuthUser {
                    uid: Uuid::now_v7().simple().to_string(),
                    email: assertion.email.map(|e| normalize_email(&e)),
                    display_name: assertion.display_name,
                    photo_url: assertion.photo_url,
                };
                self.users.insert(user.uid.clone(), user.clone());
                self.federated.insert(key, user.uid.clone());
                user
            }
        };
        Ok(self.start_session(session, user))
    }

    async fn update_profile(
        &self,
        session: SessionId,
        update: ProfileUpdate,
    ) -> Result<AuthUser, AuthError> {
        let uid = self
            .sessions
            .get(&session)
            .map(|uid| uid.value().clone())
            .ok_or(AuthError::NoSession)?;

        let user = {
            let mut user = self
                .users
                .get_mut(&uid)
                .ok_or_else(|| AuthError::Backend(format!("account {uid} vanished")))?;
            if let Some(name) = update.display_name {
                user.display_name = Some(name);
            }
            if let Some(photo) = update.photo_url {
                user.photo_url = Some(photo);
            }
            user.clone()
        };

        self.emit(session, Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self, session: SessionId) -> Result<(), AuthError> {
        self.sessions.remove(&session);
        self.emit(session, None);
        Ok(())
    }

    fn current_user(&self, session: SessionId) -> Option<AuthUser> {
        let uid = self.sessions.get(&session)?.value().clone();
        self.users.get(&uid).map(|u| u.value().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in_resolves_same_account() {
        let idp = MemoryIdentityProvider::new();
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();

        let created = idp
            .sign_up_with_email(first, "Ada@Example.com", "hunter22")
            .await
            .unwrap();
        let signed_in = idp
            .sign_in_with_email(second, "ada@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(created.uid, signed_in.uid);
        assert_eq!(idp.current_user(first), Some(created));
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_bad_password() {
        let idp = MemoryIdentityProvider::new();
        let session = Uuid::now_v7();
        idp.sign_up_with_email(session, "a@b.c", "secret1")
            .await
            .unwrap();

        assert_eq!(
            idp.sign_up_with_email(session, "a@b.c", "secret2").await,
            Err(AuthError::EmailInUse)
        );
        assert_eq!(
            idp.sign_in_with_email(session, "a@b.c", "wrong!!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            idp.sign_up_with_email(session, "x@y.z", "123").await,
            Err(AuthError::WeakPassword)
        );
    }

    #[tokio::test]
    async fn federated_sign_in_reuses_account_per_subject() {
        let idp = MemoryIdentityProvider::new();
        let assertion = FederatedAssertion {
            subject: "octocat".into(),
            display_name: Some("Octo".into()),
            ..Default::default()
        };

        let a = idp
            .sign_in_with_provider(Uuid::now_v7(), AuthProvider::Github, assertion.clone())
            .await
            .unwrap();
        let b = idp
            .sign_in_with_provider(Uuid::now_v7(), AuthProvider::Github, assertion.clone())
            .await
            .unwrap();
        let c = idp
            .sign_in_with_provider(Uuid::now_v7(), AuthProvider::Google, assertion)
            .await
            .unwrap();

        assert_eq!(a.uid, b.uid);
        assert_ne!(a.uid, c.uid);
    }

    #[tokio::test]
    async fn empty_federated_subject_counts_as_cancelled() {
        let idp = MemoryIdentityProvider::new();
        let result = idp
            .sign_in_with_provider(
                Uuid::now_v7(),
                AuthProvider::Google,
                FederatedAssertion::default(),
            )
            .await;
        assert_eq!(result, Err(AuthError::Cancelled));
    }

    #[tokio::test]
    async fn state_changes_are_pushed_to_subscribers() {
        let idp = MemoryIdentityProvider::new();
        let mut events = idp.subscribe();
        let session = Uuid::now_v7();

        let user = idp
            .sign_up_with_email(session, "a@b.c", "secret1")
            .await
            .unwrap();
        idp.sign_out(session).await.unwrap();

        let signed_in = events.recv().await.unwrap();
        assert_eq!(signed_in.session, session);
        assert_eq!(signed_in.user, Some(user));

        let signed_out = events.recv().await.unwrap();
        assert_eq!(signed_out.user, None);
        assert_eq!(idp.current_user(session), None);
    }
}

use tracing::{info, warn};
use uuid::Uuid;

use super::{MutationError, MutationResult};
use crate::backend::{
    AuthError, AuthProvider, AuthUser, Backend, DocumentRef, FederatedAssertion, ProfileUpdate,
    SessionId,
};
use crate::config::{IdentityCfg, SeedAccount};
use crate::models::to_fields;
use crate::models::user::User;
use crate::schema::users;

#[derive(Clone)]
pub struct UserStore {
    backend: Backend,
    identity: IdentityCfg,
}

fn user_ref(uid: &str) -> DocumentRef {
    DocumentRef::new(users::COLLECTION, uid)
}

impl UserStore {
    pub fn new(backend: Backend, identity: IdentityCfg) -> Self {
        Self { backend, identity }
    }

    /// The stored profile, or `None` when it is missing or unreadable.
    pub async fn get_user(&self, uid: &str) -> Option<User> {
        match self.backend.documents.get(&user_ref(uid)).await {
            Ok(Some(doc)) => doc
                .decode()
                .inspect_err(|e| warn!(uid, error = %e, "unreadable user profile"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(uid, error = %e, "user lookup failed");
                None
            }
        }
    }

    /// Creates the account, names it, and stores its profile with the placeholder avatar.
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_up_with_email(
        &self,
        session: SessionId,
        email: &str,
        nickname: &str,
        password: &str,
    ) -> MutationResult<User> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(MutationError::InvalidArgument("nickname is required".into()));
        }

        let identity = &self.backend.identity;
        identity.sign_up_with_email(session, email, password).await?;
        let auth = identity
            .update_profile(
                session,
                ProfileUpdate {
                    display_name: Some(nickname.to_string()),
                    photo_url: Some(self.identity.default_photo_url.clone()),
                },
            )
            .await?;

        let user = User {
            uid: auth.uid,
            display_name: nickname.to_string(),
            photo_url: self.identity.default_photo_url.clone(),
            admin: false,
        };
        self.backend
            .documents
            .set(&user_ref(&user.uid), to_fields(&user)?, false)
            .await?;
        info!(uid = %user.uid, "signed up");
        Ok(user)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in_with_email(
        &self,
        session: SessionId,
        email: &str,
        password: &str,
    ) -> MutationResult<User> {
        let auth = self
            .backend
            .identity
            .sign_in_with_email(session, email, password)
            .await?;
        self.record_profile(&auth).await
    }

    #[tracing::instrument(skip(self, assertion))]
    pub async fn sign_in_with_provider(
        &self,
        session: SessionId,
        provider: AuthProvider,
        assertion: FederatedAssertion,
    ) -> MutationResult<User> {
        let auth = self
            .backend
            .identity
            .sign_in_with_provider(session, provider, assertion)
            .await?;
        self.record_profile(&auth).await
    }

    pub async fn sign_out(&self, session: SessionId) -> MutationResult {
        self.backend.identity.sign_out(session).await?;
        Ok(())
    }

    /// Creates (or reuses) the configured account and marks it as an administrator.
    pub async fn bootstrap_admin(&self, seed: &SeedAccount) -> MutationResult<User> {
        let session = Uuid::now_v7();
        let identity = &self.backend.identity;
        let auth = match identity
            .sign_up_with_email(session, &seed.email, &seed.password)
            .await
        {
            Ok(_) => {
                identity
                    .update_profile(
                        session,
                        ProfileUpdate {
                            display_name: Some(seed.display_name.clone()),
                            photo_url: None,
                        },
                    )
                    .await?
            }
            Err(AuthError::EmailInUse) => {
                identity
                    .sign_in_with_email(session, &seed.email, &seed.password)
                    .await?
            }
            Err(e) => return Err(e.into()),
        };
        let user = self.record_profile(&auth).await?;

        let mut admin = serde_json::Map::new();
        admin.insert(users::ADMIN.to_string(), serde_json::Value::Bool(true));
        self.backend
            .documents
            .set(&user_ref(&user.uid), admin, true)
            .await?;
        self.sign_out(session).await?;

        info!(uid = %user.uid, "administrator ready");
        Ok(User {
            admin: true,
            ..user
        })
    }

    /// Overwrites name and photo from the identity provider, keeping everything else.
    async fn record_profile(&self, auth: &AuthUser) -> MutationResult<User> {
        let write = User::profile_write(auth, &self.identity.default_photo_url);
        let doc = user_ref(&auth.uid);
        self.backend
            .documents
            .set(&doc, to_fields(&write)?, true)
            .await?;

        let stored = self
            .backend
            .documents
            .get(&doc)
            .await?
            .ok_or_else(|| MutationError::Internal(format!("{doc} missing after write")))?
            .decode()?;
        info!(uid = %auth.uid, "signed in");
        Ok(stored)
    }
}

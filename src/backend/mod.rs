//! Capabilities of the hosted backend the client talks to.
//!
//! Everything the application persists goes through one of three seams: a
//! [`DocumentStore`] for records, an [`ObjectStore`] for blobs and an
//! [`IdentityProvider`] for sessions. [`memory`] implements all three in-process.

pub mod memory;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type Fields = Map<String, Value>;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArgument(format!("malformed document: {err}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// A filter, sort and limit over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Single-field mutation applied without reading the document first.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    /// Adds each value not already present.
    ArrayUnion(Vec<Value>),
    /// Removes every occurrence of each value.
    ArrayRemove(Vec<Value>),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document with a generated id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentRef, BackendError>;
    /// Overwrites the document, or merges top-level fields into it when `merge` is set.
    async fn set(&self, doc: &DocumentRef, fields: Fields, merge: bool) -> Result<(), BackendError>;
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, BackendError>;
    /// Fails with [`BackendError::NotFound`] when the document does not exist.
    async fn update(
        &self,
        doc: &DocumentRef,
        field: &str,
        update: FieldUpdate,
    ) -> Result<(), BackendError>;
    async fn delete(&self, doc: &DocumentRef) -> Result<(), BackendError>;
    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError>;
    /// Opens a read-only transaction. Every read made through it sees the same snapshot.
    async fn read_transaction(&self) -> Result<Box<dyn ReadTransaction>, BackendError>;
}

#[async_trait]
pub trait ReadTransaction: Send {
    async fn get(&mut self, doc: &DocumentRef) -> Result<Option<Document>, BackendError>;
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
    async fn download_url(&self, key: &str) -> Result<String, StorageError>;
    async fn download(&self, key: &str) -> Result<StoredObject, StorageError>;
}

/// Identifies one client's session with the identity provider.
pub type SessionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthProvider {
    Google,
    Github,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
        }
    }
}

impl FromStr for AuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(AuthProvider::Google),
            "github" => Ok(AuthProvider::Github),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// What a federated provider vouches for after its own sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FederatedAssertion {
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Pushed whenever a session signs in, signs out or its profile changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub session: SessionId,
    pub user: Option<AuthUser>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already in use")]
    EmailInUse,

    #[error("password too weak")]
    WeakPassword,

    #[error("sign-in cancelled")]
    Cancelled,

    #[error("no signed-in user")]
    NoSession,

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("identity failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up_with_email(
        &self,
        session: SessionId,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError>;
    async fn sign_in_with_email(
        &self,
        session: SessionId,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError>;
    async fn sign_in_with_provider(
        &self,
        session: SessionId,
        provider: AuthProvider,
        assertion: FederatedAssertion,
    ) -> Result<AuthUser, AuthError>;
    async fn update_profile(
        &self,
        session: SessionId,
        update: ProfileUpdate,
    ) -> Result<AuthUser, AuthError>;
    async fn sign_out(&self, session: SessionId) -> Result<(), AuthError>;
    fn current_user(&self, session: SessionId) -> Option<AuthUser>;
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// The three backend capabilities, shared by every store.
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backend {
    pub fn in_memory(public_base_url: &str) -> Self {
        Self {
            documents: Arc::new(memory::MemoryDocumentStore::new()),
            objects: Arc::new(memory::MemoryObjectStore::new(public_base_url)),
            identity: Arc::new(memory::MemoryIdentityProvider::new()),
        }
    }
}

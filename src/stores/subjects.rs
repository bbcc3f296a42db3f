use tracing::info;

use super::{require_admin, MutationError, MutationResult};
use crate::backend::{Backend, BackendError, Direction, DocumentRef, Query};
use crate::models::subject::{Subject, SubjectEntity};
use crate::models::to_fields;
use crate::models::user::User;
use crate::schema::subjects;

/// Tags a post can be filed under. Only administrators add or remove them.
#[derive(Clone)]
pub struct SubjectStore {
    backend: Backend,
}

impl SubjectStore {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn list_subjects(&self) -> Result<Vec<Subject>, BackendError> {
        let plan = Query::collection(subjects::COLLECTION).order_by(subjects::NAME, Direction::Asc);
        self.backend
            .documents
            .query(&plan)
            .await?
            .into_iter()
            .map(|doc| -> Result<Subject, BackendError> {
                let entity: SubjectEntity = doc.decode()?;
                Ok(Subject {
                    id: doc.id,
                    name: entity.name,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip(self, viewer))]
    pub async fn create_subject(&self, viewer: Option<&User>, name: &str) -> MutationResult<String> {
        require_admin(&self.backend, viewer).await?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MutationError::InvalidArgument("subject name is empty".into()));
        }

        let entity = SubjectEntity {
            name: name.to_string(),
        };
        let created = self
            .backend
            .documents
            .add(subjects::COLLECTION, to_fields(&entity)?)
            .await?;
        info!(id = %created.id, "subject created");
        Ok(created.id)
    }

    #[tracing::instrument(skip(self, viewer))]
    pub async fn delete_subject(&self, viewer: Option<&User>, id: &str) -> MutationResult {
        require_admin(&self.backend, viewer).await?;
        let doc = DocumentRef::new(subjects::COLLECTION, id);
        if self.backend.documents.get(&doc).await?.is_none() {
            return Err(MutationError::NotFound(doc.to_string()));
        }
        self.backend.documents.delete(&doc).await?;
        info!(id, "subject deleted");
        Ok(())
    }
}

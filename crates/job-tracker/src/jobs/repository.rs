use super::domain::{JobApplication, JobChanges, JobId, NewJobApplication};
use super::query::JobQuery;

/// Document-store port for job applications.
pub trait JobRepository: Send + Sync {
    /// Persist a new record; the store assigns its id.
    fn insert(&self, job: NewJobApplication) -> Result<JobApplication, RepositoryError>;
    fn fetch(&self, id: &JobId) -> Result<Option<JobApplication>, RepositoryError>;
    fn list(&self, query: &JobQuery) -> Result<Vec<JobApplication>, RepositoryError>;
    /// Overwrite only the supplied fields and return the updated record.
    fn update(&self, id: &JobId, changes: &JobChanges) -> Result<JobApplication, RepositoryError>;
    fn delete(&self, id: &JobId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

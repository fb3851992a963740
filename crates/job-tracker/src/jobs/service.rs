use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{JobApplication, JobId, JobPatch, JobSubmission, JobValidationError};
use super::query::{JobListParams, JobQuery, QueryError};
use super::repository::{JobRepository, RepositoryError};

/// CRUD facade over the job repository.
pub struct JobApplicationService<R> {
    repository: Arc<R>,
}

impl<R> JobApplicationService<R>
where
    R: JobRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(&self, submission: JobSubmission) -> Result<JobApplication, JobServiceError> {
        let job = submission.validate(Utc::now())?;
        let stored = self.repository.insert(job)?;
        info!(job_id = %stored.id, status = %stored.status, "job application created");
        Ok(stored)
    }

    pub fn get(&self, id: &JobId) -> Result<JobApplication, JobServiceError> {
        let job = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(job)
    }

    pub fn list(&self, params: &JobListParams) -> Result<Vec<JobApplication>, JobServiceError> {
        let query = JobQuery::build(params)?;
        let jobs = self.repository.list(&query)?;
        Ok(jobs)
    }

    /// Apply a partial edit. An empty patch returns the record unchanged.
    pub fn update(&self, id: &JobId, patch: JobPatch) -> Result<JobApplication, JobServiceError> {
        let changes = patch.validate()?;
        if changes.is_empty() {
            return self.get(id);
        }
        let updated = self.repository.update(id, &changes)?;
        info!(job_id = %updated.id, "job application updated");
        Ok(updated)
    }

    pub fn delete(&self, id: &JobId) -> Result<(), JobServiceError> {
        self.repository.delete(id)?;
        info!(job_id = %id, "job application removed");
        Ok(())
    }
}

/// Error raised by the job service.
#[derive(Debug, thiserror::Error)]
pub enum JobServiceError {
    #[error(transparent)]
    Validation(#[from] JobValidationError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

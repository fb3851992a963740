use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::jobs::domain::{JobApplication, JobChanges, JobId, JobSubmission, NewJobApplication};
use crate::jobs::query::JobQuery;
use crate::jobs::repository::{JobRepository, RepositoryError};
use crate::jobs::{job_router, JobApplicationService};

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<JobId, JobApplication>>,
    sequence: AtomicU64,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl JobRepository for MemoryRepository {
    fn insert(&self, job: NewJobApplication) -> Result<JobApplication, RepositoryError> {
        let next = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = job.into_record(JobId(format!("job-{next:04}")));
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &JobId) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned())
    }

    fn list(&self, query: &JobQuery) -> Result<Vec<JobApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(query.apply(guard.values().cloned()))
    }

    fn update(&self, id: &JobId, changes: &JobChanges) -> Result<JobApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        changes.apply(record);
        Ok(record.clone())
    }

    fn delete(&self, id: &JobId) -> Result<(), RepositoryError> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

pub(super) struct UnavailableRepository;

impl JobRepository for UnavailableRepository {
    fn insert(&self, _job: NewJobApplication) -> Result<JobApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &JobId) -> Result<Option<JobApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _query: &JobQuery) -> Result<Vec<JobApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _id: &JobId, _changes: &JobChanges) -> Result<JobApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &JobId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    JobApplicationService<MemoryRepository>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = JobApplicationService::new(repository.clone());
    (service, repository)
}

pub(super) fn submission() -> JobSubmission {
    JobSubmission {
        link: Some("https://acme.example/careers/42".to_string()),
        notes: Some("Referred by alumni network".to_string()),
        ..JobSubmission::new("Acme", "Engineer")
    }
}

pub(super) fn dated_submission(company: &str, status: &str, date: &str) -> JobSubmission {
    JobSubmission {
        status: Some(status.to_string()),
        application_date: Some(date.to_string()),
        ..JobSubmission::new(company, "Analyst")
    }
}

pub(super) fn router_with_service(
    service: JobApplicationService<MemoryRepository>,
) -> axum::Router {
    job_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

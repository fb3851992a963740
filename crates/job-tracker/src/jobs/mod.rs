//! Job application records: validation, listing queries, storage port,
//! service facade, and HTTP routes.

pub mod domain;
pub mod query;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    JobApplication, JobChanges, JobId, JobPatch, JobStatus, JobSubmission, JobValidationError,
    NewJobApplication,
};
pub use query::{
    DateRange, JobFilter, JobListParams, JobQuery, JobSort, QueryError, SortDirection, SortKey,
};
pub use repository::{JobRepository, RepositoryError};
pub use router::job_router;
pub use service::{JobApplicationService, JobServiceError};

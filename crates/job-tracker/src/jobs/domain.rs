use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a job application record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stage of an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobStatus {
    type Err = JobValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.label() == trimmed)
            .ok_or_else(|| JobValidationError::UnknownStatus(trimmed.to_string()))
    }
}

/// A persisted job application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    #[serde(rename = "_id")]
    pub id: JobId,
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub application_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw create payload as posted by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub application_date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl JobSubmission {
    pub fn new(company: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            company: Some(company.into()),
            role: Some(role.into()),
            ..Self::default()
        }
    }

    /// Check required fields and fill defaults relative to `now`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewJobApplication, JobValidationError> {
        let company = optional_text(self.company).ok_or(JobValidationError::MissingCompany)?;
        let role = optional_text(self.role).ok_or(JobValidationError::MissingRole)?;
        let status = match optional_text(self.status) {
            Some(raw) => raw.parse()?,
            None => JobStatus::default(),
        };
        let application_date = match optional_text(self.application_date) {
            Some(raw) => parse_application_date(&raw)?,
            None => now,
        };

        Ok(NewJobApplication {
            company,
            role,
            status,
            application_date,
            link: optional_text(self.link),
            notes: optional_text(self.notes),
            created_at: now,
        })
    }
}

/// A validated application that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJobApplication {
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub application_date: DateTime<Utc>,
    pub link: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewJobApplication {
    pub fn into_record(self, id: JobId) -> JobApplication {
        JobApplication {
            id,
            company: self.company,
            role: self.role,
            status: self.status,
            application_date: self.application_date,
            link: self.link,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// Raw edit payload. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub application_date: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl JobPatch {
    pub fn validate(self) -> Result<JobChanges, JobValidationError> {
        let company = self
            .company
            .map(|raw| optional_text(Some(raw)).ok_or(JobValidationError::MissingCompany))
            .transpose()?;
        let role = self
            .role
            .map(|raw| optional_text(Some(raw)).ok_or(JobValidationError::MissingRole))
            .transpose()?;
        let status = optional_text(self.status)
            .map(|raw| raw.parse::<JobStatus>())
            .transpose()?;
        let application_date = optional_text(self.application_date)
            .map(|raw| parse_application_date(&raw))
            .transpose()?;

        Ok(JobChanges {
            company,
            role,
            status,
            application_date,
            link: self.link.map(|raw| optional_text(Some(raw))),
            notes: self.notes.map(|raw| optional_text(Some(raw))),
        })
    }
}

/// Validated partial update. `link`/`notes` use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobChanges {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<JobStatus>,
    pub application_date: Option<DateTime<Utc>>,
    pub link: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl JobChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, job: &mut JobApplication) {
        if let Some(company) = &self.company {
            job.company.clone_from(company);
        }
        if let Some(role) = &self.role {
            job.role.clone_from(role);
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(date) = self.application_date {
            job.application_date = date;
        }
        if let Some(link) = &self.link {
            job.link.clone_from(link);
        }
        if let Some(notes) = &self.notes {
            job.notes.clone_from(notes);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobValidationError {
    #[error("company is required")]
    MissingCompany,
    #[error("role is required")]
    MissingRole,
    #[error("status '{0}' is not one of Applied, Interview, Offer, Rejected")]
    UnknownStatus(String),
    #[error("applicationDate '{0}' is not a valid date")]
    InvalidApplicationDate(String),
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_application_date(raw: &str) -> Result<DateTime<Utc>, JobValidationError> {
    parse_timestamp(raw).ok_or_else(|| JobValidationError::InvalidApplicationDate(raw.to_string()))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

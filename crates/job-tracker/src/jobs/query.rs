//! Translation of listing parameters into a filter + sort descriptor.
//!
//! The descriptor is plain data: store adapters either translate it into
//! their native query language or evaluate it in memory through
//! [`JobFilter::matches`] and [`JobSort::compare`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{parse_timestamp, JobApplication};

/// Optional query-string parameters accepted by the listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// Deterministic filter + single-key sort for the job collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub filter: JobFilter,
    pub sort: JobSort,
}

impl JobQuery {
    /// Build the descriptor. Empty parameters count as absent; dates that do
    /// not parse are rejected instead of being forwarded to the store.
    pub fn build(params: &JobListParams) -> Result<Self, QueryError> {
        let status = present(params.status.as_deref()).map(str::to_string);
        let start = present(params.start_date.as_deref())
            .map(|raw| parse_bound("startDate", raw))
            .transpose()?;
        let end = present(params.end_date.as_deref())
            .map(|raw| parse_bound("endDate", raw))
            .transpose()?;

        let application_date = match (start, end) {
            (Some(start), Some(end)) => Some(DateRange::Between { start, end }),
            (Some(start), None) => Some(DateRange::From(start)),
            (None, Some(end)) => Some(DateRange::Until(end)),
            (None, None) => None,
        };

        Ok(Self {
            filter: JobFilter {
                status,
                application_date,
            },
            sort: JobSort::from_param(present(params.sort_by.as_deref())),
        })
    }

    /// Filter and order an in-memory collection with this descriptor.
    pub fn apply<I>(&self, jobs: I) -> Vec<JobApplication>
    where
        I: IntoIterator<Item = JobApplication>,
    {
        let mut selected: Vec<JobApplication> = jobs
            .into_iter()
            .filter(|job| self.filter.matches(job))
            .collect();
        selected.sort_by(|left, right| self.sort.compare(left, right));
        selected
    }
}

/// Filter predicate. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    /// Exact match on the status label. Unknown labels match nothing.
    pub status: Option<String>,
    pub application_date: Option<DateRange>,
}

impl JobFilter {
    pub fn matches(&self, job: &JobApplication) -> bool {
        let status_ok = self
            .status
            .as_deref()
            .map_or(true, |status| job.status.label() == status);
        let date_ok = self
            .application_date
            .as_ref()
            .map_or(true, |range| range.contains(job.application_date));
        status_ok && date_ok
    }
}

/// Inclusive bounds on `applicationDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Between {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    From(DateTime<Utc>),
    Until(DateTime<Utc>),
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        match *self {
            DateRange::Between { start, end } => start <= instant && instant <= end,
            DateRange::From(start) => start <= instant,
            DateRange::Until(end) => instant <= end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Company,
    Role,
    Status,
    ApplicationDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl JobSort {
    /// Newest applications first.
    pub const DEFAULT: JobSort = JobSort {
        key: SortKey::ApplicationDate,
        direction: SortDirection::Descending,
    };

    pub fn from_param(sort_by: Option<&str>) -> Self {
        let ascending = |key| JobSort {
            key,
            direction: SortDirection::Ascending,
        };
        match sort_by {
            Some("company") => ascending(SortKey::Company),
            Some("role") => ascending(SortKey::Role),
            Some("status") => ascending(SortKey::Status),
            Some("dateAsc") => ascending(SortKey::ApplicationDate),
            _ => Self::DEFAULT,
        }
    }

    /// Order two records by the sort key; ties fall back to the record id so
    /// listings are stable across calls.
    pub fn compare(&self, left: &JobApplication, right: &JobApplication) -> Ordering {
        let primary = match self.key {
            SortKey::Company => left.company.cmp(&right.company),
            SortKey::Role => left.role.cmp(&right.role),
            SortKey::Status => left.status.label().cmp(right.status.label()),
            SortKey::ApplicationDate => left.application_date.cmp(&right.application_date),
        };
        let primary = match self.direction {
            SortDirection::Ascending => primary,
            SortDirection::Descending => primary.reverse(),
        };
        primary.then_with(|| left.id.0.cmp(&right.id.0))
    }
}

impl Default for JobSort {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("{field} '{value}' is not a valid date")]
    InvalidDate { field: &'static str, value: String },
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

fn parse_bound(field: &'static str, raw: &str) -> Result<DateTime<Utc>, QueryError> {
    parse_timestamp(raw).ok_or_else(|| QueryError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::domain::{JobId, JobStatus};
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .expect("valid date")
    }

    fn params() -> JobListParams {
        JobListParams::default()
    }

    fn job(id: &str, company: &str, status: JobStatus, applied: DateTime<Utc>) -> JobApplication {
        JobApplication {
            id: JobId(id.to_string()),
            company: company.to_string(),
            role: "Engineer".to_string(),
            status,
            application_date: applied,
            link: None,
            notes: None,
            created_at: applied,
        }
    }

    #[test]
    fn status_filter_uses_default_sort() {
        let query = JobQuery::build(&JobListParams {
            status: Some("Offer".to_string()),
            ..params()
        })
        .expect("valid query");

        assert_eq!(query.filter.status.as_deref(), Some("Offer"));
        assert_eq!(query.filter.application_date, None);
        assert_eq!(query.sort, JobSort::DEFAULT);
        assert_eq!(query.sort.key, SortKey::ApplicationDate);
        assert_eq!(query.sort.direction, SortDirection::Descending);
    }

    #[test]
    fn both_dates_form_an_inclusive_range() {
        let query = JobQuery::build(&JobListParams {
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-31".to_string()),
            ..params()
        })
        .expect("valid query");

        let range = query.filter.application_date.expect("date filter");
        assert_eq!(
            range,
            DateRange::Between {
                start: at(2024, 1, 1),
                end: at(2024, 1, 31),
            }
        );
        assert!(range.contains(at(2024, 1, 1)));
        assert!(range.contains(at(2024, 1, 31)));
        assert!(!range.contains(at(2023, 12, 31)));
        assert!(!range.contains(at(2024, 2, 1)));
    }

    #[test]
    fn single_bounds_are_open_ended() {
        let from = JobQuery::build(&JobListParams {
            start_date: Some("2024-01-01T00:00:00.000Z".to_string()),
            ..params()
        })
        .expect("valid query");
        assert_eq!(
            from.filter.application_date,
            Some(DateRange::From(at(2024, 1, 1)))
        );

        let until = JobQuery::build(&JobListParams {
            end_date: Some("2024-01-31".to_string()),
            ..params()
        })
        .expect("valid query");
        assert_eq!(
            until.filter.application_date,
            Some(DateRange::Until(at(2024, 1, 31)))
        );
    }

    #[test]
    fn empty_parameters_are_ignored() {
        let query = JobQuery::build(&JobListParams {
            status: Some(String::new()),
            start_date: Some("  ".to_string()),
            end_date: Some(String::new()),
            sort_by: Some(String::new()),
        })
        .expect("valid query");
        assert_eq!(query.filter, JobFilter::default());
        assert_eq!(query.sort, JobSort::DEFAULT);
    }

    #[test]
    fn recognised_sort_keys_are_ascending() {
        for (param, key) in [
            ("company", SortKey::Company),
            ("role", SortKey::Role),
            ("status", SortKey::Status),
            ("dateAsc", SortKey::ApplicationDate),
        ] {
            let sort = JobSort::from_param(Some(param));
            assert_eq!(sort.key, key, "sortBy={param}");
            assert_eq!(sort.direction, SortDirection::Ascending, "sortBy={param}");
        }
    }

    #[test]
    fn unknown_sort_falls_back_to_newest_first() {
        assert_eq!(JobSort::from_param(Some("salary")), JobSort::DEFAULT);
        assert_eq!(JobSort::from_param(Some("Company")), JobSort::DEFAULT);
        assert_eq!(JobSort::from_param(None), JobSort::DEFAULT);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let err = JobQuery::build(&JobListParams {
            start_date: Some("last tuesday".to_string()),
            ..params()
        })
        .expect_err("invalid date");
        assert_eq!(
            err,
            QueryError::InvalidDate {
                field: "startDate",
                value: "last tuesday".to_string(),
            }
        );
    }

    #[test]
    fn unknown_status_matches_nothing() {
        let query = JobQuery::build(&JobListParams {
            status: Some("Ghosted".to_string()),
            ..params()
        })
        .expect("unknown status still builds");
        let jobs = JobStatus::ALL
            .into_iter()
            .enumerate()
            .map(|(idx, status)| job(&format!("job-{idx}"), "Acme", status, at(2024, 1, 1)));
        assert!(query.apply(jobs).is_empty());
    }

    #[test]
    fn apply_filters_and_orders_records() {
        let jobs = vec![
            job("a", "Initech", JobStatus::Applied, at(2024, 1, 5)),
            job("b", "Acme", JobStatus::Offer, at(2024, 1, 20)),
            job("c", "Globex", JobStatus::Applied, at(2024, 2, 3)),
            job("d", "Hooli", JobStatus::Applied, at(2024, 1, 12)),
        ];

        let newest_first = JobQuery::build(&JobListParams {
            status: Some("Applied".to_string()),
            ..params()
        })
        .expect("valid query")
        .apply(jobs.clone());
        let ids: Vec<&str> = newest_first.iter().map(|job| job.id.0.as_str()).collect();
        assert_eq!(ids, ["c", "d", "a"]);

        let by_company = JobQuery::build(&JobListParams {
            end_date: Some("2024-01-31".to_string()),
            sort_by: Some("company".to_string()),
            ..params()
        })
        .expect("valid query")
        .apply(jobs);
        let companies: Vec<&str> = by_company.iter().map(|job| job.company.as_str()).collect();
        assert_eq!(companies, ["Acme", "Hooli", "Initech"]);
    }
}

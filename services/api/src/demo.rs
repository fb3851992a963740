use crate::infra::{InMemoryAccountRepository, InMemoryJobRepository, InMemoryResetOutbox};
use chrono::{Local, NaiveDate};
use clap::Args;
use job_tracker::accounts::{
    AccountService, LoginRequest, PasswordReset, PasswordResetRequest, Registration, SessionKeys,
};
use job_tracker::error::AppError;
use job_tracker::jobs::{
    JobApplicationService, JobListParams, JobPatch, JobStatus, JobSubmission,
};
use std::sync::Arc;

const DEMO_SESSION_SECRET: &[u8] = b"job-tracker-demo-secret";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the sample applications were sent (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) applied_on: Option<NaiveDate>,
    /// Status filter for the listing step (Applied, Interview, Offer, Rejected).
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Sort key for the listing step (company, role, status, dateAsc).
    #[arg(long)]
    pub(crate) sort_by: Option<String>,
    /// Skip the account portion of the demo.
    #[arg(long)]
    pub(crate) skip_accounts: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        applied_on,
        status,
        sort_by,
        skip_accounts,
    } = args;

    let applied_on = applied_on.unwrap_or_else(|| Local::now().date_naive());

    println!("Job tracking demo");
    let service = JobApplicationService::new(Arc::new(InMemoryJobRepository::default()));
    let samples = [
        ("Initech", "Backend Intern", JobStatus::Applied, 0),
        ("Hooli", "Data Analyst", JobStatus::Interview, 3),
        ("Pied Piper", "Platform Engineer", JobStatus::Offer, 7),
        ("Globex", "QA Intern", JobStatus::Rejected, 10),
    ];

    let mut created = Vec::new();
    for (company, role, job_status, days_before) in samples {
        let date = applied_on - chrono::Duration::days(days_before);
        let submission = JobSubmission {
            status: Some(job_status.label().to_string()),
            application_date: Some(date.format("%Y-%m-%d").to_string()),
            ..JobSubmission::new(company, role)
        };
        match service.create(submission) {
            Ok(job) => {
                println!(
                    "- Tracked {} / {} ({}) on {}",
                    job.company,
                    job.role,
                    job.status,
                    job.application_date.date_naive()
                );
                created.push(job);
            }
            Err(err) => println!("  Submission rejected: {}", err),
        }
    }

    let params = JobListParams {
        status,
        sort_by,
        ..JobListParams::default()
    };
    match service.list(&params) {
        Ok(jobs) => {
            println!("\nListing ({} matches)", jobs.len());
            for job in jobs {
                println!(
                    "  - {:<12} {:<18} {:<10} {}",
                    job.company,
                    job.role,
                    job.status.label(),
                    job.application_date.date_naive()
                );
            }
        }
        Err(err) => println!("\nListing unavailable: {}", err),
    }

    if let Some(first) = created.first() {
        let patch = JobPatch {
            status: Some(JobStatus::Interview.label().to_string()),
            notes: Some("Phone screen booked".to_string()),
            ..JobPatch::default()
        };
        match service.update(&first.id, patch) {
            Ok(job) => println!(
                "\nUpdated {} -> {} ({})",
                job.company,
                job.status,
                job.notes.as_deref().unwrap_or_default()
            ),
            Err(err) => println!("\nUpdate failed: {}", err),
        }
    }
    if let Some(last) = created.last() {
        match service.delete(&last.id) {
            Ok(()) => println!("Removed {}", last.company),
            Err(err) => println!("Removal failed: {}", err),
        }
    }

    if skip_accounts {
        return Ok(());
    }

    println!("\nAccount demo (credentials redacted)");
    let outbox = Arc::new(InMemoryResetOutbox::default());
    let accounts = AccountService::new(
        Arc::new(InMemoryAccountRepository::default()),
        outbox.clone(),
        SessionKeys::new(DEMO_SESSION_SECRET, chrono::Duration::days(30)),
    );

    let grant = match accounts.register(Registration {
        name: Some("Demo Student".to_string()),
        email: Some("student@example.edu".to_string()),
        mobile: Some("+15550001234".to_string()),
        password: Some("first-password".to_string()),
    }) {
        Ok(grant) => grant,
        Err(err) => {
            println!("  Registration rejected: {}", err);
            return Ok(());
        }
    };
    println!(
        "- Registered {} <{}> with a {}-day session",
        grant.account.name,
        grant.account.email.as_str(),
        accounts.sessions().ttl().num_days()
    );

    if let Err(err) = accounts.request_password_reset(PasswordResetRequest {
        email: Some("student@example.edu".to_string()),
    }) {
        println!("  Reset request failed: {}", err);
        return Ok(());
    }
    let Some(token) = outbox.latest_for(&grant.account.id) else {
        println!("  No reset message queued");
        return Ok(());
    };
    println!("- Reset token queued for delivery");

    match accounts.reset_password(PasswordReset {
        token: Some(token.expose().to_string()),
        new_password: Some("second-password".to_string()),
    }) {
        Ok(()) => println!("- Password reset completed"),
        Err(err) => println!("  Reset failed: {}", err),
    }

    let login = accounts.login(LoginRequest {
        email: None,
        mobile: Some("+15550001234".to_string()),
        password: Some("second-password".to_string()),
    });
    match login {
        Ok(grant) => match serde_json::to_string_pretty(&grant.account) {
            Ok(json) => println!("- Signed in with new password:\n{}", json),
            Err(err) => println!("  Summary unavailable: {}", err),
        },
        Err(err) => println!("  Sign-in failed: {}", err),
    }

    Ok(())
}

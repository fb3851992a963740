use chrono::NaiveDate;
use job_tracker::accounts::{
    ensure_current, unique_conflict, AccountRepository, DeliveryError,
    RepositoryError as AccountRepositoryError, ResetRecipient, ResetToken, ResetTokenDelivery,
    UserAccount, UserId,
};
use job_tracker::jobs::{
    JobApplication, JobChanges, JobId, JobQuery, JobRepository, NewJobApplication,
    RepositoryError as JobRepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex
        .lock()
        .map_err(|_| "in-memory store mutex poisoned".to_string())
}

/// Development job store. Ids are random UUIDs, like a document store's
/// generated keys.
#[derive(Default, Clone)]
pub(crate) struct InMemoryJobRepository {
    records: Arc<Mutex<HashMap<JobId, JobApplication>>>,
}

impl JobRepository for InMemoryJobRepository {
    fn insert(&self, job: NewJobApplication) -> Result<JobApplication, JobRepositoryError> {
        let mut guard = lock(&self.records).map_err(JobRepositoryError::Unavailable)?;
        let record = job.into_record(JobId(Uuid::new_v4().simple().to_string()));
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &JobId) -> Result<Option<JobApplication>, JobRepositoryError> {
        let guard = lock(&self.records).map_err(JobRepositoryError::Unavailable)?;
        Ok(guard.get(id).cloned())
    }

    fn list(&self, query: &JobQuery) -> Result<Vec<JobApplication>, JobRepositoryError> {
        let guard = lock(&self.records).map_err(JobRepositoryError::Unavailable)?;
        Ok(query.apply(guard.values().cloned()))
    }

    fn update(&self, id: &JobId, changes: &JobChanges) -> Result<JobApplication, JobRepositoryError> {
        let mut guard = lock(&self.records).map_err(JobRepositoryError::Unavailable)?;
        let record = guard.get_mut(id).ok_or(JobRepositoryError::NotFound)?;
        changes.apply(record);
        Ok(record.clone())
    }

    fn delete(&self, id: &JobId) -> Result<(), JobRepositoryError> {
        let mut guard = lock(&self.records).map_err(JobRepositoryError::Unavailable)?;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(JobRepositoryError::NotFound)
    }
}

/// Development account store. Unique e-mail and mobile indexes and the
/// revision check run under the same lock as the write.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAccountRepository {
    records: Arc<Mutex<HashMap<UserId, UserAccount>>>,
}

impl InMemoryAccountRepository {
    fn find(
        &self,
        predicate: impl Fn(&UserAccount) -> bool,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let guard = lock(&self.records).map_err(AccountRepositoryError::Unavailable)?;
        Ok(guard.values().find(|account| predicate(account)).cloned())
    }

    fn write(
        &self,
        account: UserAccount,
        must_exist: bool,
    ) -> Result<UserAccount, AccountRepositoryError> {
        let mut guard = lock(&self.records).map_err(AccountRepositoryError::Unavailable)?;
        if must_exist {
            let stored = guard
                .get(&account.id)
                .ok_or(AccountRepositoryError::NotFound)?;
            ensure_current(stored, &account)?;
        }
        if let Some(field) = guard
            .values()
            .find_map(|existing| unique_conflict(existing, &account))
        {
            return Err(AccountRepositoryError::Duplicate(field));
        }
        let mut written = account;
        if must_exist {
            written.version += 1;
        }
        guard.insert(written.id.clone(), written.clone());
        Ok(written)
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, AccountRepositoryError> {
        self.write(account, false)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, AccountRepositoryError> {
        let guard = lock(&self.records).map_err(AccountRepositoryError::Unavailable)?;
        Ok(guard.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AccountRepositoryError> {
        self.find(|account| account.email.as_str() == email)
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Option<UserAccount>, AccountRepositoryError> {
        self.find(|account| {
            account
                .mobile
                .as_ref()
                .is_some_and(|stored| stored.as_str() == mobile)
        })
    }

    fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, AccountRepositoryError> {
        self.find(|account| {
            account
                .reset
                .as_ref()
                .is_some_and(|ticket| ticket.token_hash == token_hash)
        })
    }

    fn save(&self, account: UserAccount) -> Result<UserAccount, AccountRepositoryError> {
        self.write(account, true)
    }
}

/// Reset delivery for the running server until a mail transport exists. Logs
/// the recipient and drops the token.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingResetDelivery;

impl ResetTokenDelivery for LoggingResetDelivery {
    fn deliver(&self, recipient: &ResetRecipient, _token: &ResetToken) -> Result<(), DeliveryError> {
        info!(user_id = %recipient.user_id, "password reset message dispatched");
        Ok(())
    }
}

/// Keeps delivered tokens so the CLI demo can redeem them. Only the
/// recipient is logged.
#[derive(Default, Clone)]
pub(crate) struct InMemoryResetOutbox {
    messages: Arc<Mutex<Vec<(ResetRecipient, ResetToken)>>>,
}

impl ResetTokenDelivery for InMemoryResetOutbox {
    fn deliver(&self, recipient: &ResetRecipient, token: &ResetToken) -> Result<(), DeliveryError> {
        let mut guard = lock(&self.messages).map_err(DeliveryError::Transport)?;
        guard.push((recipient.clone(), token.clone()));
        info!(user_id = %recipient.user_id, "password reset message queued");
        Ok(())
    }
}

impl InMemoryResetOutbox {
    pub(crate) fn latest_for(&self, user: &UserId) -> Option<ResetToken> {
        lock(&self.messages).ok().and_then(|messages| {
            messages
                .iter()
                .rev()
                .find(|(recipient, _)| &recipient.user_id == user)
                .map(|(_, token)| token.clone())
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Duration;
use serde_json::Value;

use crate::accounts::credentials::ResetToken;
use crate::accounts::domain::{Registration, UserAccount, UserId};
use crate::accounts::repository::{
    ensure_current, unique_conflict, AccountRepository, DeliveryError, RepositoryError,
    ResetRecipient, ResetTokenDelivery,
};
use crate::accounts::session::SessionKeys;
use crate::accounts::{account_router, AccountService};

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<UserId, UserAccount>>,
}

impl MemoryRepository {
    pub(super) fn get(&self, id: &UserId) -> Option<UserAccount> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }

    fn find(&self, predicate: impl Fn(&UserAccount) -> bool) -> Option<UserAccount> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .find(|account| predicate(account))
            .cloned()
    }
}

impl AccountRepository for MemoryRepository {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if let Some(field) = guard
            .values()
            .find_map(|existing| unique_conflict(existing, &account))
        {
            return Err(RepositoryError::Duplicate(field));
        }
        guard.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.get(id))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.find(|account| account.email.as_str() == email))
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.find(|account| {
            account
                .mobile
                .as_ref()
                .is_some_and(|stored| stored.as_str() == mobile)
        }))
    }

    fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        Ok(self.find(|account| {
            account
                .reset
                .as_ref()
                .is_some_and(|ticket| ticket.token_hash == token_hash)
        }))
    }

    fn save(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&account.id).ok_or(RepositoryError::NotFound)?;
        ensure_current(stored, &account)?;
        if let Some(field) = guard
            .values()
            .find_map(|existing| unique_conflict(existing, &account))
        {
            return Err(RepositoryError::Duplicate(field));
        }
        let mut saved = account;
        saved.version += 1;
        guard.insert(saved.id.clone(), saved.clone());
        Ok(saved)
    }
}

type Hook = Box<dyn FnOnce() + Send>;

/// Wraps the memory store and runs a one-shot hook right after the next
/// read, so another request can land between a read and its save.
pub(super) struct InterleavingRepository {
    inner: Arc<MemoryRepository>,
    after_read: Mutex<Option<Hook>>,
}

impl InterleavingRepository {
    pub(super) fn new(inner: Arc<MemoryRepository>) -> Self {
        Self {
            inner,
            after_read: Mutex::new(None),
        }
    }

    pub(super) fn after_next_read(&self, hook: impl FnOnce() + Send + 'static) {
        *self.after_read.lock().expect("hook mutex poisoned") = Some(Box::new(hook));
    }

    fn read<T>(&self, value: T) -> T {
        let hook = self.after_read.lock().expect("hook mutex poisoned").take();
        if let Some(hook) = hook {
            hook();
        }
        value
    }
}

impl AccountRepository for InterleavingRepository {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        self.inner.insert(account)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.read(self.inner.fetch(id))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        self.read(self.inner.find_by_email(email))
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Option<UserAccount>, RepositoryError> {
        self.read(self.inner.find_by_mobile(mobile))
    }

    fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.read(self.inner.find_by_reset_token_hash(token_hash))
    }

    fn save(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        self.inner.save(account)
    }
}

/// Store whose saves always lose the race.
pub(super) struct ContendedRepository {
    pub(super) inner: MemoryRepository,
}

impl AccountRepository for ContendedRepository {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        self.inner.insert(account)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.find_by_email(email)
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.find_by_mobile(mobile)
    }

    fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.inner.find_by_reset_token_hash(token_hash)
    }

    fn save(&self, _account: UserAccount) -> Result<UserAccount, RepositoryError> {
        Err(RepositoryError::Stale)
    }
}

/// Captures delivered tokens so tests can redeem them.
#[derive(Default)]
pub(super) struct MemoryOutbox {
    sent: Mutex<Vec<(ResetRecipient, ResetToken)>>,
}

impl MemoryOutbox {
    pub(super) fn last_token(&self) -> Option<ResetToken> {
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .last()
            .map(|(_, token)| token.clone())
    }

    pub(super) fn len(&self) -> usize {
        self.sent.lock().expect("outbox mutex poisoned").len()
    }
}

impl ResetTokenDelivery for MemoryOutbox {
    fn deliver(&self, recipient: &ResetRecipient, token: &ResetToken) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .push((recipient.clone(), token.clone()));
        Ok(())
    }
}

pub(super) struct OfflineOutbox;

impl ResetTokenDelivery for OfflineOutbox {
    fn deliver(&self, _recipient: &ResetRecipient, _token: &ResetToken) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("smtp offline".to_string()))
    }
}

pub(super) type TestService = AccountService<MemoryRepository, MemoryOutbox>;

pub(super) fn session_keys() -> SessionKeys {
    SessionKeys::new(b"account-tests-secret", Duration::days(30))
}

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryOutbox>) {
    let repository = Arc::new(MemoryRepository::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let service = AccountService::new(repository.clone(), outbox.clone(), session_keys());
    (service, repository, outbox)
}

pub(super) fn registration() -> Registration {
    Registration {
        name: Some("Grace Hopper".to_string()),
        email: Some("grace@navy.mil".to_string()),
        mobile: Some("+12025550143".to_string()),
        password: Some("cobol-1959".to_string()),
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    account_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

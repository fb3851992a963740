use std::fmt;

use super::credentials::ResetToken;
use super::domain::{EmailAddress, MobileNumber, UserAccount, UserId};

/// Unique index that rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Mobile,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Email => f.write_str("email"),
            UniqueField::Mobile => f.write_str("mobile"),
        }
    }
}

/// Document-store port for accounts. Implementations own the unique indexes
/// on e-mail and (when present) mobile, and must check and write atomically.
pub trait AccountRepository: Send + Sync {
    fn insert(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError>;
    fn find_by_mobile(&self, mobile: &str) -> Result<Option<UserAccount>, RepositoryError>;
    fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, RepositoryError>;
    /// Replace an existing account, re-checking the unique indexes. Fails with
    /// [`RepositoryError::Stale`] when `account.version` is not the stored
    /// revision; on success the returned copy carries the next revision.
    fn save(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("duplicate {0}")]
    Duplicate(UniqueField),
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Which unique field, if any, `candidate` would collide on in `existing`.
pub fn unique_conflict(existing: &UserAccount, candidate: &UserAccount) -> Option<UniqueField> {
    if existing.id == candidate.id {
        return None;
    }
    if existing.email == candidate.email {
        return Some(UniqueField::Email);
    }
    match (&existing.mobile, &candidate.mobile) {
        (Some(left), Some(right)) if left == right => Some(UniqueField::Mobile),
        _ => None,
    }
}

/// Compare-and-swap check for [`AccountRepository::save`]: the candidate must
/// have been read at the stored revision.
pub fn ensure_current(stored: &UserAccount, candidate: &UserAccount) -> Result<(), RepositoryError> {
    if stored.version == candidate.version {
        Ok(())
    } else {
        Err(RepositoryError::Stale)
    }
}

/// Out-of-band channel (e-mail, SMS) that hands a reset token to its owner.
pub trait ResetTokenDelivery: Send + Sync {
    fn deliver(&self, recipient: &ResetRecipient, token: &ResetToken) -> Result<(), DeliveryError>;
}

/// Addressing details for a reset message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRecipient {
    pub user_id: UserId,
    pub name: String,
    pub email: EmailAddress,
    pub mobile: Option<MobileNumber>,
}

impl From<&UserAccount> for ResetRecipient {
    fn from(account: &UserAccount) -> Self {
        Self {
            user_id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            mobile: account.mobile.clone(),
        }
    }
}

/// Delivery error.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery transport unavailable: {0}")]
    Transport(String),
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::credentials::{hash_reset_token, PasswordCredential, ResetToken};
use super::domain::{
    check_password_policy, AccountSummary, AccountValidationError, EmailAddress, LoginIdentifier,
    LoginRequest, PasswordChange, PasswordReset, PasswordResetRequest, ProfileUpdate,
    PublicProfile, Registration, UserAccount, UserId,
};
use super::repository::{
    AccountRepository, DeliveryError, RepositoryError, ResetRecipient, ResetTokenDelivery,
    UniqueField,
};
use super::session::{SessionError, SessionKeys};

const SAVE_ATTEMPTS: usize = 3;

/// Account summary plus a freshly signed session token.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    #[serde(flatten)]
    pub account: AccountSummary,
    pub token: String,
}

/// Registration, login, profile and password workflows.
pub struct AccountService<R, D> {
    repository: Arc<R>,
    delivery: Arc<D>,
    sessions: SessionKeys,
}

impl<R, D> AccountService<R, D>
where
    R: AccountRepository + 'static,
    D: ResetTokenDelivery + 'static,
{
    pub fn new(repository: Arc<R>, delivery: Arc<D>, sessions: SessionKeys) -> Self {
        Self {
            repository,
            delivery,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionKeys {
        &self.sessions
    }

    /// Create an account. Duplicate e-mail or mobile is detected by the
    /// repository's unique indexes, not by a prior lookup.
    pub fn register(&self, registration: Registration) -> Result<SessionGrant, AccountServiceError> {
        let details = registration.validate()?;
        let now = Utc::now();
        let account = UserAccount::register(UserId::generate(), details, now);
        let stored = self.repository.insert(account)?;
        info!(user_id = %stored.id, "account registered");
        self.grant(&stored, now)
    }

    /// Authenticate by e-mail or mobile. Unknown handles and wrong passwords
    /// produce the same error and cost the same key derivation.
    pub fn login(&self, request: LoginRequest) -> Result<SessionGrant, AccountServiceError> {
        let account = match request.identifier()? {
            LoginIdentifier::Email(email) => self.repository.find_by_email(&email)?,
            LoginIdentifier::Mobile(mobile) => self.repository.find_by_mobile(&mobile)?,
        };
        let authenticated = match account {
            Some(account) if account.valid_password(request.password()) => account,
            Some(_) => return Err(AccountServiceError::InvalidCredentials),
            None => {
                PasswordCredential::verify_absent(request.password());
                return Err(AccountServiceError::InvalidCredentials);
            }
        };
        info!(user_id = %authenticated.id, "account signed in");
        self.grant(&authenticated, Utc::now())
    }

    pub fn profile(&self, user: &UserId) -> Result<PublicProfile, AccountServiceError> {
        Ok(self.load(user)?.public_profile())
    }

    pub fn update_profile(
        &self,
        user: &UserId,
        update: ProfileUpdate,
    ) -> Result<PublicProfile, AccountServiceError> {
        let stored = self.modify(
            || self.load(user),
            |account| Ok(update.clone().apply(account)?),
        )?;
        info!(user_id = %stored.id, "profile updated");
        Ok(stored.public_profile())
    }

    pub fn change_password(
        &self,
        user: &UserId,
        change: PasswordChange,
    ) -> Result<(), AccountServiceError> {
        let current = change.current_password.unwrap_or_default();
        let new_password = change.new_password.unwrap_or_default();

        self.modify(
            || self.load(user),
            |account| {
                if !account.valid_password(&current) {
                    return Err(AccountServiceError::IncorrectPassword);
                }
                check_password_policy(&new_password)?;
                account.set_password(&new_password);
                account.clear_reset_token();
                Ok(())
            },
        )?;
        info!(user_id = %user, "password changed");
        Ok(())
    }

    /// Issue and deliver a reset token when the e-mail belongs to an account.
    /// Unknown or unusable addresses succeed silently so callers cannot enumerate
    /// accounts.
    pub fn request_password_reset(
        &self,
        request: PasswordResetRequest,
    ) -> Result<(), AccountServiceError> {
        self.request_password_reset_at(request, Utc::now())
    }

    pub fn request_password_reset_at(
        &self,
        request: PasswordResetRequest,
        now: DateTime<Utc>,
    ) -> Result<(), AccountServiceError> {
        let Ok(email) = EmailAddress::parse(request.email.as_deref().unwrap_or_default()) else {
            info!("password reset requested without a usable address");
            return Ok(());
        };
        let Some(existing) = self.repository.find_by_email(email.as_str())? else {
            info!("password reset requested for unknown address");
            return Ok(());
        };

        let mut token = None;
        let stored = self.modify(
            || self.load(&existing.id),
            |account| {
                token = Some(account.issue_password_reset_token(now));
                Ok(())
            },
        )?;
        if let Some(token) = token {
            self.delivery
                .deliver(&ResetRecipient::from(&stored), &token)?;
        }
        info!(user_id = %stored.id, "password reset token issued");
        Ok(())
    }

    /// Redeem a reset token. The token is cleared on success, so it works once.
    pub fn reset_password(&self, reset: PasswordReset) -> Result<(), AccountServiceError> {
        self.reset_password_at(reset, Utc::now())
    }

    pub fn reset_password_at(
        &self,
        reset: PasswordReset,
        now: DateTime<Utc>,
    ) -> Result<(), AccountServiceError> {
        let token = reset
            .token
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(ResetToken::new)
            .ok_or(AccountServiceError::Validation(
                AccountValidationError::MissingResetToken,
            ))?;
        let new_password = reset.new_password.unwrap_or_default();
        check_password_policy(&new_password)?;
        let token_hash = hash_reset_token(token.expose());

        // A concurrent redemption clears the ticket, so the reload after a
        // stale save finds nothing and this attempt is rejected.
        let stored = self.modify(
            || {
                self.repository
                    .find_by_reset_token_hash(&token_hash)?
                    .filter(|account| account.accepts_reset_token(&token, now))
                    .ok_or(AccountServiceError::InvalidResetToken)
            },
            |account| {
                account.set_password(&new_password);
                account.clear_reset_token();
                Ok(())
            },
        )?;
        info!(user_id = %stored.id, "password reset completed");
        Ok(())
    }

    /// Read-modify-write with optimistic concurrency: a save that lost the
    /// race is retried against a fresh read.
    fn modify<L, M>(&self, mut load: L, mut change: M) -> Result<UserAccount, AccountServiceError>
    where
        L: FnMut() -> Result<UserAccount, AccountServiceError>,
        M: FnMut(&mut UserAccount) -> Result<(), AccountServiceError>,
    {
        for attempt in 1..=SAVE_ATTEMPTS {
            let mut account = load()?;
            change(&mut account)?;
            let user_id = account.id.clone();
            match self.repository.save(account) {
                Err(RepositoryError::Stale) => {
                    warn!(user_id = %user_id, attempt, "account changed concurrently, retrying");
                }
                result => return Ok(result?),
            }
        }
        Err(AccountServiceError::Contended)
    }

    fn load(&self, user: &UserId) -> Result<UserAccount, AccountServiceError> {
        self.repository.fetch(user)?.ok_or_else(|| {
            warn!(user_id = %user, "session refers to a missing account");
            AccountServiceError::NotFound
        })
    }

    fn grant(
        &self,
        account: &UserAccount,
        now: DateTime<Utc>,
    ) -> Result<SessionGrant, AccountServiceError> {
        let token = self.sessions.issue(&account.id, now)?;
        Ok(SessionGrant {
            account: account.summary(),
            token,
        })
    }
}

/// Error raised by the account service.
#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error(transparent)]
    Validation(#[from] AccountValidationError),
    #[error("{0} already registered")]
    Conflict(UniqueField),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    IncorrectPassword,
    #[error("Reset token is invalid or has expired")]
    InvalidResetToken,
    #[error("User not found")]
    NotFound,
    #[error("Account is being updated, try again")]
    Contended,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AccountServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Duplicate(field) => Self::Conflict(field),
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Stale => Self::Contended,
            other => Self::Repository(other),
        }
    }
}

//! Student accounts: registration, salted password credentials, bearer
//! sessions, profile editing, and password reset.

pub mod credentials;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use credentials::{
    hash_reset_token, issue_reset_token, CredentialError, PasswordCredential, ResetTicket,
    ResetToken,
};
pub use domain::{
    AccountSummary, AccountValidationError, Education, EmailAddress, LoginRequest, MobileNumber,
    NewAccount, PasswordChange, PasswordReset, PasswordResetRequest, ProfileUpdate, PublicProfile,
    Registration, UserAccount, UserId,
};
pub use repository::{
    ensure_current, unique_conflict, AccountRepository, DeliveryError, RepositoryError,
    ResetRecipient, ResetTokenDelivery, UniqueField,
};
pub use router::account_router;
pub use service::{AccountService, AccountServiceError, SessionGrant};
pub use session::{AuthenticatedUser, Claims, SessionError, SessionKeys};

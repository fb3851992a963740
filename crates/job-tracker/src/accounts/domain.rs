use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::credentials::{issue_reset_token, PasswordCredential, ResetTicket, ResetToken};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Opaque account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trimmed, lower-cased, format-checked e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, AccountValidationError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AccountValidationError::MissingEmail);
        }
        if !email_regex().is_match(&normalized) {
            return Err(AccountValidationError::InvalidEmail);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Optional international-style mobile number, e.g. `+15551234567`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MobileNumber(String);

impl MobileNumber {
    pub fn parse(raw: &str) -> Result<Self, AccountValidationError> {
        let trimmed = raw.trim();
        if !mobile_regex().is_match(trimmed) {
            return Err(AccountValidationError::InvalidMobile);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MobileNumber {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MobileNumber> for String {
    fn from(value: MobileNumber) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_year: Option<i32>,
}

/// A stored student account. Deliberately not `Serialize`: clients only
/// ever see [`PublicProfile`] or [`AccountSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: EmailAddress,
    pub mobile: Option<MobileNumber>,
    pub credential: PasswordCredential,
    pub profile_picture: String,
    pub bio: String,
    pub education: Option<Education>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub reset: Option<ResetTicket>,
    /// Store revision this copy was read at; bumped on every save.
    pub version: u64,
}

impl UserAccount {
    pub fn register(id: UserId, details: NewAccount, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: details.name,
            email: details.email,
            mobile: details.mobile,
            credential: PasswordCredential::derive(&details.password),
            profile_picture: String::new(),
            bio: String::new(),
            education: None,
            skills: Vec::new(),
            created_at: now,
            reset: None,
            version: 0,
        }
    }

    /// Replace the credential with one derived under a fresh salt.
    pub fn set_password(&mut self, raw_password: &str) {
        self.credential = PasswordCredential::derive(raw_password);
    }

    pub fn valid_password(&self, raw_password: &str) -> bool {
        self.credential.verify(raw_password)
    }

    /// Store a new reset ticket and return the plaintext token for delivery.
    pub fn issue_password_reset_token(&mut self, now: DateTime<Utc>) -> ResetToken {
        let (token, ticket) = issue_reset_token(now);
        self.reset = Some(ticket);
        token
    }

    /// True when `token` matches the stored ticket and it has not expired.
    pub fn accepts_reset_token(&self, token: &ResetToken, now: DateTime<Utc>) -> bool {
        self.reset
            .as_ref()
            .is_some_and(|ticket| ticket.is_valid_at(now) && ticket.matches(token))
    }

    pub fn clear_reset_token(&mut self) {
        self.reset = None;
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
        }
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
            profile_picture: self.profile_picture.clone(),
            bio: self.bio.clone(),
            education: self.education.clone(),
            skills: self.skills.clone(),
            created_at: self.created_at,
        }
    }
}

/// Validated registration input.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: EmailAddress,
    pub mobile: Option<MobileNumber>,
    pub password: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("mobile", &self.mobile)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Raw `POST /api/users/register` payload.
#[derive(Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Registration {
    pub fn validate(self) -> Result<NewAccount, AccountValidationError> {
        let name = non_blank(self.name).ok_or(AccountValidationError::MissingName)?;
        let email = EmailAddress::parse(self.email.as_deref().unwrap_or_default())?;
        let mobile = non_blank(self.mobile)
            .map(|raw| MobileNumber::parse(&raw))
            .transpose()?;
        let password = self.password.unwrap_or_default();
        check_password_policy(&password)?;

        Ok(NewAccount {
            name,
            email,
            mobile,
            password,
        })
    }
}

/// Which unique handle a login attempt names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Mobile(String),
}

/// Raw `POST /api/users/login` payload.
#[derive(Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    /// E-mail wins when both handles are supplied.
    pub fn identifier(&self) -> Result<LoginIdentifier, AccountValidationError> {
        if let Some(email) = non_blank(self.email.clone()) {
            return Ok(LoginIdentifier::Email(email.to_lowercase()));
        }
        if let Some(mobile) = non_blank(self.mobile.clone()) {
            return Ok(LoginIdentifier::Mobile(mobile));
        }
        Err(AccountValidationError::MissingIdentifier)
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

/// Raw `PUT /api/users/profile` payload. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub education: Option<Education>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Validate every supplied field, then write them onto `account`. Nothing
    /// is written when any field is invalid.
    pub fn apply(self, account: &mut UserAccount) -> Result<(), AccountValidationError> {
        let name = self
            .name
            .map(|raw| non_blank(Some(raw)).ok_or(AccountValidationError::MissingName))
            .transpose()?;
        let email = self
            .email
            .map(|raw| EmailAddress::parse(&raw))
            .transpose()?;
        let mobile = self
            .mobile
            .map(|raw| non_blank(Some(raw)).map(|raw| MobileNumber::parse(&raw)).transpose())
            .transpose()?;

        if let Some(name) = name {
            account.name = name;
        }
        if let Some(email) = email {
            account.email = email;
        }
        if let Some(mobile) = mobile {
            account.mobile = mobile;
        }
        if let Some(bio) = self.bio {
            account.bio = bio.trim().to_string();
        }
        if let Some(picture) = self.profile_picture {
            account.profile_picture = picture.trim().to_string();
        }
        if let Some(education) = self.education {
            account.education = Some(education);
        }
        if let Some(skills) = self.skills {
            account.skills = skills
                .into_iter()
                .filter_map(|skill| non_blank(Some(skill)))
                .collect();
        }
        Ok(())
    }
}

/// Raw `PUT /api/users/password` payload.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Raw `POST /api/users/password/forgot` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Raw `POST /api/users/password/reset` payload.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Identity fields returned alongside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileNumber>,
}

/// Client-facing profile. Carries no credential or reset material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileNumber>,
    pub profile_picture: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Education>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountValidationError {
    #[error("Name is required")]
    MissingName,
    #[error("Email is required")]
    MissingEmail,
    #[error("Please enter a valid email")]
    InvalidEmail,
    #[error("Please enter a valid mobile number")]
    InvalidMobile,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Please provide email or mobile number")]
    MissingIdentifier,
    #[error("Reset token is required")]
    MissingResetToken,
}

pub fn check_password_policy(password: &str) -> Result<(), AccountValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static MOBILE_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        let word = "[A-Za-z0-9_]";
        let pattern =
            format!(r"^{word}+([.-]?{word}+)*@{word}+([.-]?{word}+)*(\.{word}{{2,3}})+$");
        Regex::new(&pattern)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

fn mobile_regex() -> &'static Regex {
    MOBILE_RE.get_or_init(|| {
        Regex::new(r"^\+?[1-9][0-9]{9,14}$")
            .unwrap_or_else(|error| panic!("mobile regex failed to compile: {error}"))
    })
}

//! Password and reset-token material.
//!
//! Passwords are stored as a PBKDF2-HMAC-SHA512 digest next to a random
//! per-account salt. Reset tokens are handed to the caller once in plaintext
//! and only their SHA-256 digest is kept. Changing any constant below
//! invalidates every stored credential.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

pub const SALT_BYTES: usize = 16;
pub const PBKDF2_ITERATIONS: u32 = 1_000;
pub const DERIVED_KEY_BYTES: usize = 64;
pub const RESET_TOKEN_BYTES: usize = 20;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Salted password digest. Never carries the raw password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCredential", into = "StoredCredential")]
pub struct PasswordCredential {
    hash: String,
    salt: String,
}

impl PasswordCredential {
    /// Derive a credential under a freshly generated salt.
    pub fn derive(raw_password: &str) -> Self {
        let salt = random_hex(SALT_BYTES);
        let hash = hex::encode(derive_key(raw_password, &salt));
        Self { hash, salt }
    }

    /// Rehydrate a credential read back from storage.
    pub fn from_stored(
        hash: impl Into<String>,
        salt: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let hash = hash.into();
        let salt = salt.into();
        if salt.is_empty() {
            return Err(CredentialError::MissingSalt);
        }
        if hash.is_empty() {
            return Err(CredentialError::MissingHash);
        }
        match hex::decode(&hash) {
            Ok(bytes) if bytes.len() == DERIVED_KEY_BYTES => Ok(Self { hash, salt }),
            _ => Err(CredentialError::MalformedHash),
        }
    }

    /// Recompute the digest for `raw_password` and compare in constant time.
    pub fn verify(&self, raw_password: &str) -> bool {
        let candidate = derive_key(raw_password, &self.salt);
        match hex::decode(&self.hash) {
            Ok(stored) => candidate.as_slice().ct_eq(stored.as_slice()).into(),
            Err(_) => false,
        }
    }

    /// Pay the cost of [`verify`](Self::verify) when no account matched, so
    /// response timing does not reveal which handles exist. Always false.
    pub fn verify_absent(raw_password: &str) -> bool {
        static DECOY: OnceLock<PasswordCredential> = OnceLock::new();
        let decoy = DECOY.get_or_init(|| Self::derive(""));
        let _ = decoy.verify(raw_password);
        false
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("hash", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

/// Persisted shape of a credential.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredential {
    password_hash: String,
    password_salt: String,
}

impl TryFrom<StoredCredential> for PasswordCredential {
    type Error = CredentialError;

    fn try_from(value: StoredCredential) -> Result<Self, Self::Error> {
        Self::from_stored(value.password_hash, value.password_salt)
    }
}

impl From<PasswordCredential> for StoredCredential {
    fn from(value: PasswordCredential) -> Self {
        Self {
            password_hash: value.hash,
            password_salt: value.salt,
        }
    }
}

/// Plaintext reset token. Only ever handed to the delivery channel.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl ResetToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> String {
        hash_reset_token(&self.0)
    }
}

impl fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResetToken(<redacted>)")
    }
}

/// Stored half of a reset token: its digest and absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTicket {
    #[serde(rename = "resetPasswordTokenHash")]
    pub token_hash: String,
    #[serde(rename = "resetPasswordExpiry")]
    pub expires_at: DateTime<Utc>,
}

impl ResetTicket {
    /// The ticket is usable strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn matches(&self, token: &ResetToken) -> bool {
        token
            .digest()
            .as_bytes()
            .ct_eq(self.token_hash.as_bytes())
            .into()
    }
}

/// Generate a reset token at `now`, returning the plaintext and its ticket.
pub fn issue_reset_token(now: DateTime<Utc>) -> (ResetToken, ResetTicket) {
    let token = ResetToken(random_hex(RESET_TOKEN_BYTES));
    let ticket = ResetTicket {
        token_hash: token.digest(),
        expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    };
    (token, ticket)
}

/// One-way hash used to look tickets up by presented token.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Stored credential material that violates the account invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("stored credential has no salt")]
    MissingSalt,
    #[error("stored credential has no hash")]
    MissingHash,
    #[error("stored credential hash is not a 64-byte hex digest")]
    MalformedHash,
}

fn derive_key(raw_password: &str, salt: &str) -> [u8; DERIVED_KEY_BYTES] {
    let mut output = [0u8; DERIVED_KEY_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha512>(
        raw_password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut output,
    );
    output
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

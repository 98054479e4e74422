//! Credentials and the authenticated principal.
//!
//! The engine has no hidden "current customer": [`login`] returns a
//! [`Principal`] value and every orchestrator call takes it as an explicit
//! parameter. Passwords are stored bcrypt-hashed, never in clear.
//!
//! [`login`]: crate::Bank::login

use serde::{Deserialize, Serialize};

use crate::store::Keyed;
use crate::{BankError, BankResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Manager,
}

/// A stored login record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl Credential {
    /// Hashes `password` with the default bcrypt cost.
    pub fn new(username: &str, password: &str, role: Role) -> BankResult<Self> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|err| BankError::Storage(format!("password hash: {err}")))?;
        Ok(Self {
            username: username.to_string(),
            password_hash,
            role,
        })
    }

    /// Constant-time-ish verify; any bcrypt error counts as a mismatch.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

impl Keyed for Credential {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.username.clone()
    }
}

/// The authenticated actor a façade call runs as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

impl From<&Credential> for Principal {
    fn from(credential: &Credential) -> Self {
        Self {
            username: credential.username.clone(),
            role: credential.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_round_trip() {
        let credential = Credential::new("alice", "hunter2", Role::Customer).unwrap();
        assert!(credential.verify("hunter2"));
        assert!(!credential.verify("hunter3"));
        assert_ne!(credential.password_hash, "hunter2");
    }

    #[test]
    fn principal_from_credential() {
        let credential = Credential::new("boss", "secret", Role::Manager).unwrap();
        let principal = Principal::from(&credential);
        assert!(principal.is_manager());
        assert_eq!(principal.username, "boss");
    }
}

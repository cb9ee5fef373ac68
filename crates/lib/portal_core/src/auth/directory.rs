//! External identity authorities.
//!
//! The enterprise directory (employees) and the helpdesk (externally managed
//! customers) are both modelled as capabilities that verify a credential pair
//! and hand back profile attributes. Credentials are never persisted.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::password::verify_password;

/// Profile attributes returned by the directory on a successful bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryProfile {
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Profile attributes returned by the customer authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerProfile {
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory unreachable: {0}")]
    Unreachable(String),

    #[error("Directory configuration error: {0}")]
    Config(String),
}

/// Enterprise directory (employee) credential check.
#[async_trait]
pub trait Directory: Send + Sync {
    /// `Ok(None)` means the directory rejected the credentials.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<DirectoryProfile>, DirectoryError>;
}

/// Credential check for customers whose password lives outside the portal.
#[async_trait]
pub trait CustomerAuthority: Send + Sync {
    /// `Ok(None)` means the authority rejected the credentials.
    async fn verify_customer(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<CustomerProfile>, DirectoryError>;
}

/// One account of a [`StaticDirectory`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticAccount {
    pub username: String,
    /// bcrypt hash of the account password.
    pub password_hash: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountsFile {
    accounts: Vec<StaticAccount>,
}

/// Directory backed by a fixed account list, for development and tests.
///
/// Usernames match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    accounts: HashMap<String, StaticAccount>,
}

impl StaticDirectory {
    pub fn new(accounts: impl IntoIterator<Item = StaticAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|a| (a.username.to_lowercase(), a))
                .collect(),
        }
    }

    /// Parse `{"accounts": [{"username", "passwordHash", "email", "fullName"}]}`.
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let file: AccountsFile = serde_json::from_str(json)
            .map_err(|e| DirectoryError::Config(format!("accounts file: {e}")))?;
        Ok(Self::new(file.accounts))
    }

    pub fn from_file(path: &Path) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<DirectoryProfile>, DirectoryError> {
        let Some(account) = self.accounts.get(&username.to_lowercase()) else {
            debug!(username, "static directory: unknown account");
            return Ok(None);
        };
        let ok = verify_password(password, &account.password_hash)
            .map_err(|e| DirectoryError::Config(format!("account '{}': {e}", account.username)))?;
        if !ok {
            return Ok(None);
        }
        Ok(Some(DirectoryProfile {
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;

    fn directory() -> StaticDirectory {
        let json = format!(
            r#"{{"accounts": [{{"username": "John.Doe", "passwordHash": "{}", "email": "john.doe@example.com", "fullName": "John Doe"}}]}}"#,
            hash_password("password123").unwrap()
        );
        StaticDirectory::from_json(&json).unwrap()
    }

    #[tokio::test]
    async fn accepts_known_account_case_insensitively() {
        let profile = directory()
            .authenticate("john.doe", "password123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.username, "John.Doe");
        assert_eq!(profile.full_name.as_deref(), Some("John Doe"));
    }

    #[tokio::test]
    async fn rejects_wrong_password_and_unknown_user() {
        let dir = directory();
        assert!(dir.authenticate("john.doe", "nope").await.unwrap().is_none());
        assert!(dir.authenticate("jane", "password123").await.unwrap().is_none());
    }

    #[test]
    fn malformed_accounts_file_is_a_config_error() {
        assert!(matches!(
            StaticDirectory::from_json("{\"accounts\": 3}"),
            Err(DirectoryError::Config(_))
        ));
    }
}

//! Identity store: exchanges credentials for identity records.
//!
//! Local accounts are verified against their bcrypt hash, or against the
//! customer authority when they hold no password. Directory accounts are
//! verified by the [`Directory`] and provisioned here on first login.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::AuthError;
use super::directory::{CustomerAuthority, CustomerProfile, Directory, DirectoryProfile};
use super::password::{hash_password, password_problem, verify_password};
use crate::models::{
    AccountStatus, DirectoryRole, DirectoryUser, LocalRole, LocalUser, NewDirectoryUser,
    NewLocalUser,
};
use crate::store::{ProfileChanges, Store, StoreError};
use crate::validation::{FieldErrors, looks_like_email};

/// Self-service registration request.
#[derive(Debug, Clone)]
pub struct CustomerRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone)]
pub struct IdentityStore {
    store: Arc<dyn Store>,
    directory: Arc<dyn Directory>,
    customers: Option<Arc<dyn CustomerAuthority>>,
    directory_admins: Vec<String>,
}

impl IdentityStore {
    pub fn new(store: Arc<dyn Store>, directory: Arc<dyn Directory>) -> Self {
        Self {
            store,
            directory,
            customers: None,
            directory_admins: vec!["admin".to_string()],
        }
    }

    /// Verify password-less customers against an external authority.
    pub fn with_customer_authority(mut self, authority: Arc<dyn CustomerAuthority>) -> Self {
        self.customers = Some(authority);
        self
    }

    /// Directory usernames provisioned with the `admin` role.
    pub fn with_directory_admins(mut self, admins: Vec<String>) -> Self {
        self.directory_admins = admins;
        self
    }

    // -----------------------------------------------------------------------
    // Local accounts
    // -----------------------------------------------------------------------

    /// Authenticate a local account by username or email.
    ///
    /// The password is checked before the account status, so a wrong password
    /// never reveals whether an account is pending or inactive.
    pub async fn authenticate_local(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<LocalUser, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.store.user_by_login(identifier).await? else {
            return self.provision_external_customer(identifier, password).await;
        };

        match user.password_hash.as_deref() {
            Some(hash) => {
                if !verify_password(password, hash)? {
                    debug!(user_id = user.id, "local login: password mismatch");
                    return Err(AuthError::InvalidCredentials);
                }
            }
            None => {
                let email = user.email.as_deref().unwrap_or(identifier);
                if self.verify_external(email, password).await?.is_none() {
                    debug!(user_id = user.id, "local login: external authority rejected");
                    return Err(AuthError::InvalidCredentials);
                }
            }
        }

        ensure_active(&user)?;
        info!(user_id = user.id, username = %user.username, "customer authenticated");
        Ok(user)
    }

    /// First login of a customer known only to the external authority.
    async fn provision_external_customer(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<LocalUser, AuthError> {
        if !looks_like_email(identifier) {
            return Err(AuthError::InvalidCredentials);
        }
        let Some(profile) = self.verify_external(identifier, password).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let new_user = NewLocalUser {
            username: profile.email.clone(),
            email: Some(profile.email.clone()),
            password_hash: None,
            full_name: profile.full_name.clone(),
            company_name: None,
            phone: None,
            role: LocalRole::Customer,
            status: AccountStatus::Active,
        };
        match self.store.insert_user(new_user).await {
            Ok(user) => {
                info!(user_id = user.id, email = %profile.email, "provisioned externally verified customer");
                Ok(user)
            }
            // A concurrent first login won the insert.
            Err(StoreError::Conflict(_)) => {
                let user = self
                    .store
                    .user_by_email(&profile.email)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                ensure_active(&user)?;
                Ok(user)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn verify_external(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<CustomerProfile>, AuthError> {
        let Some(authority) = &self.customers else {
            return Ok(None);
        };
        authority.verify_customer(email, password).await.map_err(|e| {
            warn!(error = %e, "customer authority unavailable");
            AuthError::DirectoryUnavailable(e.to_string())
        })
    }

    /// Create a pending customer account awaiting admin approval.
    pub async fn register_customer(
        &self,
        registration: CustomerRegistration,
    ) -> Result<LocalUser, AuthError> {
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();

        let mut errors = FieldErrors::new();
        errors.require("username", &username, "Username is required");
        if !looks_like_email(&email) {
            errors.add("email", "Valid email is required");
        }
        if let Some(problem) = password_problem(&registration.password) {
            errors.add("password", problem);
        }
        if !username.is_empty() && self.store.user_by_username(&username).await?.is_some() {
            errors.add("username", "Username is already registered");
        }
        if looks_like_email(&email) && self.store.user_by_email(&email).await?.is_some() {
            errors.add("email", "Email is already registered");
        }
        errors.into_result().map_err(AuthError::Validation)?;

        let password_hash = hash_password(&registration.password)?;
        let user = self
            .store
            .insert_user(NewLocalUser {
                username,
                email: Some(email),
                password_hash: Some(password_hash),
                full_name: registration.full_name,
                company_name: registration.company_name,
                phone: registration.phone,
                role: LocalRole::Customer,
                status: AccountStatus::Pending,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::Validation(FieldErrors::single(
                    "username",
                    "Username or email is already registered",
                )),
                other => other.into(),
            })?;

        info!(user_id = user.id, username = %user.username, "customer registered, awaiting approval");
        Ok(user)
    }

    /// Move a pending customer to `active`. Callers must already be admins.
    pub async fn approve_customer(&self, user_id: i64) -> Result<LocalUser, AuthError> {
        let user = self.local_user(user_id).await?;
        if user.status != AccountStatus::Pending {
            return Err(AuthError::Validation(FieldErrors::single(
                "status",
                format!("Customer is {}, not awaiting approval", user.status),
            )));
        }
        let user = self
            .store
            .set_user_status(user_id, AccountStatus::Active)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("user {user_id}")))?;
        info!(user_id, "customer approved");
        Ok(user)
    }

    /// Move a customer to `inactive`. Accounts are never deleted.
    pub async fn deactivate_customer(&self, user_id: i64) -> Result<LocalUser, AuthError> {
        self.local_user(user_id).await?;
        let user = self
            .store
            .set_user_status(user_id, AccountStatus::Inactive)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("user {user_id}")))?;
        info!(user_id, "customer deactivated");
        Ok(user)
    }

    pub async fn pending_customers(&self) -> Result<Vec<LocalUser>, AuthError> {
        Ok(self.store.users_with_status(AccountStatus::Pending).await?)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        changes: &ProfileChanges,
    ) -> Result<LocalUser, AuthError> {
        self.store
            .update_user_profile(user_id, changes)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("user {user_id}")))
    }

    async fn local_user(&self, user_id: i64) -> Result<LocalUser, AuthError> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("user {user_id}")))
    }

    // -----------------------------------------------------------------------
    // Directory accounts
    // -----------------------------------------------------------------------

    /// Authenticate an employee against the directory, provisioning or
    /// refreshing the local directory record on success.
    pub async fn authenticate_directory(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryUser, AuthError> {
        let username = directory_username(username);
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let profile = self
            .directory
            .authenticate(username, password)
            .await
            .map_err(|e| {
                warn!(error = %e, username, "directory unavailable");
                AuthError::DirectoryUnavailable(e.to_string())
            })?
            .ok_or_else(|| {
                debug!(username, "directory rejected credentials");
                AuthError::InvalidCredentials
            })?;

        let user = match self.store.directory_user_by_username(&profile.username).await? {
            Some(existing) => self.record_login(existing, &profile).await?,
            None => self.provision_directory_user(&profile).await?,
        };
        info!(ad_user_id = user.id, username = %user.username, role = %user.role, "employee authenticated");
        Ok(user)
    }

    async fn provision_directory_user(
        &self,
        profile: &DirectoryProfile,
    ) -> Result<DirectoryUser, AuthError> {
        let role = if self
            .directory_admins
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&profile.username))
        {
            DirectoryRole::Admin
        } else {
            DirectoryRole::Employee
        };

        let new_user = NewDirectoryUser {
            username: profile.username.clone(),
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            role,
            last_login: Utc::now(),
        };
        match self.store.insert_directory_user(new_user).await {
            Ok(user) => {
                info!(ad_user_id = user.id, username = %user.username, role = %role, "provisioned directory user");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => {
                let existing = self
                    .store
                    .directory_user_by_username(&profile.username)
                    .await?
                    .ok_or_else(|| AuthError::Internal("directory user vanished".into()))?;
                self.record_login(existing, profile).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn record_login(
        &self,
        existing: DirectoryUser,
        profile: &DirectoryProfile,
    ) -> Result<DirectoryUser, AuthError> {
        let updated = self
            .store
            .record_directory_login(
                existing.id,
                profile.email.as_deref(),
                profile.full_name.as_deref(),
                Utc::now(),
            )
            .await?;
        Ok(updated.unwrap_or(existing))
    }
}

/// `user@domain` is reduced to `user`.
fn directory_username(username: &str) -> &str {
    let username = username.trim();
    username.split('@').next().unwrap_or(username)
}

fn ensure_active(user: &LocalUser) -> Result<(), AuthError> {
    match user.status {
        AccountStatus::Active => Ok(()),
        AccountStatus::Pending => Err(AuthError::PendingApproval),
        AccountStatus::Inactive => Err(AuthError::AccountInactive),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::directory::{DirectoryError, StaticAccount, StaticDirectory};
    use crate::store::{MemoryStore, UserStore};

    struct UnreachableDirectory;

    #[async_trait]
    impl Directory for UnreachableDirectory {
        async fn authenticate(
            &self,
            _username: &str,
            _password: &str,
        ) -> Result<Option<DirectoryProfile>, DirectoryError> {
            Err(DirectoryError::Unreachable("connection refused".into()))
        }
    }

    /// Accepts exactly one email/password pair.
    struct OneCustomer;

    #[async_trait]
    impl CustomerAuthority for OneCustomer {
        async fn verify_customer(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Option<CustomerProfile>, DirectoryError> {
            Ok((email == "ext@example.com" && password == "Secret55").then(|| CustomerProfile {
                email: email.to_string(),
                full_name: Some("External Customer".into()),
            }))
        }
    }

    fn static_directory() -> Arc<StaticDirectory> {
        let hash = hash_password("admin123").unwrap();
        Arc::new(StaticDirectory::new([
            StaticAccount {
                username: "admin".into(),
                password_hash: hash.clone(),
                email: Some("admin@example.com".into()),
                full_name: Some("Admin User".into()),
            },
            StaticAccount {
                username: "jane.smith".into(),
                password_hash: hash,
                email: Some("jane.smith@example.com".into()),
                full_name: Some("Jane Smith".into()),
            },
        ]))
    }

    fn identities(store: Arc<MemoryStore>) -> IdentityStore {
        IdentityStore::new(store, static_directory())
    }

    fn registration(username: &str, email: &str) -> CustomerRegistration {
        CustomerRegistration {
            username: username.into(),
            email: email.into(),
            password: "Secret55".into(),
            full_name: Some("Test Customer".into()),
            company_name: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn pending_customer_with_correct_password_is_pending_approval() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store.clone());
        ids.register_customer(registration("cust", "cust@example.com"))
            .await
            .unwrap();

        let err = ids.authenticate_local("cust", "Secret55").await.unwrap_err();
        assert!(matches!(err, AuthError::PendingApproval));
    }

    #[tokio::test]
    async fn wrong_password_hides_account_status() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store);
        ids.register_customer(registration("cust", "cust@example.com"))
            .await
            .unwrap();

        let err = ids.authenticate_local("cust", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn approved_customer_logs_in_by_email() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store);
        let user = ids
            .register_customer(registration("cust", "cust@example.com"))
            .await
            .unwrap();
        ids.approve_customer(user.id).await.unwrap();

        let logged_in = ids
            .authenticate_local("cust@example.com", "Secret55")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(logged_in.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn approving_twice_is_rejected_and_deactivation_blocks_login() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store);
        let user = ids
            .register_customer(registration("cust", "cust@example.com"))
            .await
            .unwrap();
        ids.approve_customer(user.id).await.unwrap();
        assert!(matches!(
            ids.approve_customer(user.id).await,
            Err(AuthError::Validation(_))
        ));

        ids.deactivate_customer(user.id).await.unwrap();
        assert!(matches!(
            ids.authenticate_local("cust", "Secret55").await,
            Err(AuthError::AccountInactive)
        ));
        assert!(matches!(
            ids.approve_customer(9999).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn registration_reports_every_bad_field() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store);
        ids.register_customer(registration("taken", "taken@example.com"))
            .await
            .unwrap();

        let err = ids
            .register_customer(CustomerRegistration {
                password: "123".into(),
                ..registration("taken", "not-an-email")
            })
            .await
            .unwrap_err();
        let AuthError::Validation(fields) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["email", "password", "username"]);
    }

    #[tokio::test]
    async fn passwordless_account_without_authority_cannot_log_in() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(NewLocalUser {
                username: "sso".into(),
                email: Some("sso@example.com".into()),
                password_hash: None,
                full_name: None,
                company_name: None,
                phone: None,
                role: LocalRole::Customer,
                status: AccountStatus::Active,
            })
            .await
            .unwrap();
        let ids = identities(store);

        assert!(matches!(
            ids.authenticate_local("sso", "anything").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn externally_verified_customer_is_provisioned_once() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store.clone()).with_customer_authority(Arc::new(OneCustomer));

        let first = ids
            .authenticate_local("ext@example.com", "Secret55")
            .await
            .unwrap();
        assert!(first.password_hash.is_none());
        assert_eq!(first.status, AccountStatus::Active);
        assert_eq!(first.full_name.as_deref(), Some("External Customer"));

        let second = ids
            .authenticate_local("ext@example.com", "Secret55")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        assert!(matches!(
            ids.authenticate_local("ext@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn directory_login_provisions_then_refreshes() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store.clone());

        let admin = ids.authenticate_directory("admin", "admin123").await.unwrap();
        assert_eq!(admin.role, DirectoryRole::Admin);
        assert!(admin.last_login.is_some());

        let jane = ids
            .authenticate_directory("jane.smith@corp.example", "admin123")
            .await
            .unwrap();
        assert_eq!(jane.username, "jane.smith");
        assert_eq!(jane.role, DirectoryRole::Employee);

        let again = ids.authenticate_directory("admin", "admin123").await.unwrap();
        assert_eq!(again.id, admin.id);
        assert!(again.last_login >= admin.last_login);
    }

    #[tokio::test]
    async fn directory_rejection_and_outage_are_distinct() {
        let store = Arc::new(MemoryStore::new());
        let ids = identities(store.clone());
        assert!(matches!(
            ids.authenticate_directory("admin", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));

        let offline = IdentityStore::new(store, Arc::new(UnreachableDirectory));
        assert!(matches!(
            offline.authenticate_directory("admin", "admin123").await,
            Err(AuthError::DirectoryUnavailable(_))
        ));
    }

    #[test]
    fn directory_username_strips_domain() {
        assert_eq!(directory_username(" john.doe@corp.example "), "john.doe");
        assert_eq!(directory_username("john.doe"), "john.doe");
    }
}

//! Authorization guard: a pure decision over a resolved session.

use thiserror::Error;

use super::sessions::ResolvedSession;
use crate::models::Identity;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EMPLOYEE: &str = "employee";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Whether `identity` satisfies `required`.
///
/// Exact match, plus an `admin` satisfies the base role of its own identity
/// kind: a directory admin passes `employee` checks, a local admin passes
/// `customer` checks, and neither crosses over.
pub fn role_satisfies(identity: &Identity, required: &str) -> bool {
    let role = identity.role();
    role == required || (role == ROLE_ADMIN && identity.kind().base_role() == required)
}

/// Allow a session whose role satisfies `required`, or reject with 401/403
/// semantics.
pub fn authorize<'a>(
    session: Option<&'a ResolvedSession>,
    required: &str,
) -> Result<&'a ResolvedSession, GuardError> {
    let session = session.ok_or(GuardError::Unauthenticated)?;
    let identity = &session.identity;
    if role_satisfies(identity, required) {
        Ok(session)
    } else {
        Err(GuardError::Forbidden(format!(
            "role '{}' may not access this resource",
            identity.role()
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{
        AccountStatus, DirectoryRole, DirectoryUser, LocalRole, LocalUser, Session,
    };

    fn local(role: LocalRole) -> ResolvedSession {
        let now = Utc::now();
        let user = LocalUser {
            id: 1,
            username: "cust".into(),
            email: None,
            password_hash: None,
            full_name: None,
            company_name: None,
            phone: None,
            role,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        resolved(Identity::Local(user))
    }

    fn directory(role: DirectoryRole) -> ResolvedSession {
        let now = Utc::now();
        let user = DirectoryUser {
            id: 1,
            username: "emp".into(),
            email: None,
            full_name: None,
            role,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        };
        resolved(Identity::Directory(user))
    }

    fn resolved(identity: Identity) -> ResolvedSession {
        let now = Utc::now();
        ResolvedSession {
            session: Session {
                id: "digest".into(),
                owner: identity.reference(),
                expires_at: now + chrono::Duration::hours(1),
                created_at: now,
            },
            identity,
        }
    }

    #[test]
    fn missing_session_is_unauthenticated() {
        assert_eq!(
            authorize(None, ROLE_EMPLOYEE).unwrap_err(),
            GuardError::Unauthenticated
        );
        assert_eq!(
            authorize(None, ROLE_ADMIN).unwrap_err(),
            GuardError::Unauthenticated
        );
    }

    #[test]
    fn exact_role_match_passes() {
        let admin = directory(DirectoryRole::Admin);
        assert!(authorize(Some(&admin), ROLE_ADMIN).is_ok());
        let employee = directory(DirectoryRole::Employee);
        assert!(authorize(Some(&employee), ROLE_EMPLOYEE).is_ok());
        let customer = local(LocalRole::Customer);
        assert!(authorize(Some(&customer), LocalRole::Customer.as_str()).is_ok());
    }

    #[test]
    fn admin_satisfies_only_its_own_kinds_base_role() {
        let ad_admin = directory(DirectoryRole::Admin);
        assert!(authorize(Some(&ad_admin), ROLE_EMPLOYEE).is_ok());
        assert!(matches!(
            authorize(Some(&ad_admin), LocalRole::Customer.as_str()),
            Err(GuardError::Forbidden(_))
        ));

        let local_admin = local(LocalRole::Admin);
        assert!(authorize(Some(&local_admin), LocalRole::Customer.as_str()).is_ok());
        assert!(matches!(
            authorize(Some(&local_admin), ROLE_EMPLOYEE),
            Err(GuardError::Forbidden(_))
        ));
    }

    #[test]
    fn non_admin_is_forbidden_from_admin_routes() {
        let employee = directory(DirectoryRole::Employee);
        assert!(matches!(
            authorize(Some(&employee), ROLE_ADMIN),
            Err(GuardError::Forbidden(_))
        ));
        let customer = local(LocalRole::Customer);
        assert!(matches!(
            authorize(Some(&customer), ROLE_EMPLOYEE),
            Err(GuardError::Forbidden(_))
        ));
    }
}

//! Identity domain models.
//!
//! Two disjoint user kinds live side by side: local accounts (customers and
//! portal admins, optionally holding a password hash) and directory accounts
//! (employees verified against the enterprise directory, never holding a
//! password). [`Identity`] unions them for everything downstream of login.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which identity source a session or ticket owner belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Local,
    Directory,
}

impl IdentityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentityKind::Local => "local",
            IdentityKind::Directory => "directory",
        }
    }

    /// The non-admin role every account of this kind carries.
    ///
    /// An `admin` of this kind also satisfies a requirement for this role.
    pub fn base_role(self) -> &'static str {
        match self {
            IdentityKind::Local => LocalRole::Customer.as_str(),
            IdentityKind::Directory => DirectoryRole::Employee.as_str(),
        }
    }
}

/// Reference to exactly one account of exactly one kind.
///
/// Replaces a pair of nullable foreign keys: a value of this type can never
/// point at both tables or at neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum IdentityRef {
    Local(i64),
    Directory(i64),
}

impl IdentityRef {
    pub fn kind(self) -> IdentityKind {
        match self {
            IdentityRef::Local(_) => IdentityKind::Local,
            IdentityRef::Directory(_) => IdentityKind::Directory,
        }
    }

    /// Split into the `(user_id, ad_user_id)` column pair used by storage.
    pub fn to_columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            IdentityRef::Local(id) => (Some(id), None),
            IdentityRef::Directory(id) => (None, Some(id)),
        }
    }

    /// Rebuild from the column pair. Returns `None` unless exactly one is set.
    pub fn from_columns(user_id: Option<i64>, ad_user_id: Option<i64>) -> Option<Self> {
        match (user_id, ad_user_id) {
            (Some(id), None) => Some(IdentityRef::Local(id)),
            (None, Some(id)) => Some(IdentityRef::Directory(id)),
            _ => None,
        }
    }
}

/// Error for unrecognised enum text coming out of storage or requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::models::identity::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::identity::UnknownVariant {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

/// Role of a local account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalRole {
    Customer,
    Admin,
}

text_enum!(LocalRole, "local role", { Customer => "customer", Admin => "admin" });

/// Lifecycle status of a local account. Accounts are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Inactive,
}

text_enum!(AccountStatus, "account status", {
    Pending => "pending",
    Active => "active",
    Inactive => "inactive",
});

/// Role of a directory account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryRole {
    Employee,
    Admin,
}

text_enum!(DirectoryRole, "directory role", { Employee => "employee", Admin => "admin" });

/// Local (customer / portal admin) account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    /// bcrypt hash. `None` means the account is verified by an external authority.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub role: LocalRole,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a local account.
#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub role: LocalRole,
    pub status: AccountStatus,
}

/// Directory-backed employee account. Holds no credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: DirectoryRole,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for provisioning a directory account on first login.
#[derive(Debug, Clone)]
pub struct NewDirectoryUser {
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: DirectoryRole,
    pub last_login: DateTime<Utc>,
}

/// An authenticated principal of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user", rename_all = "lowercase")]
pub enum Identity {
    Local(LocalUser),
    Directory(DirectoryUser),
}

impl Identity {
    pub fn kind(&self) -> IdentityKind {
        match self {
            Identity::Local(_) => IdentityKind::Local,
            Identity::Directory(_) => IdentityKind::Directory,
        }
    }

    pub fn reference(&self) -> IdentityRef {
        match self {
            Identity::Local(u) => IdentityRef::Local(u.id),
            Identity::Directory(u) => IdentityRef::Directory(u.id),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Identity::Local(u) => u.role.as_str(),
            Identity::Directory(u) => u.role.as_str(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Identity::Local(u) => &u.username,
            Identity::Directory(u) => &u.username,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::Local(u) => u.email.as_deref(),
            Identity::Directory(u) => u.email.as_deref(),
        }
    }

    /// Full name if known, otherwise the username.
    pub fn display_name(&self) -> &str {
        let full_name = match self {
            Identity::Local(u) => u.full_name.as_deref(),
            Identity::Directory(u) => u.full_name.as_deref(),
        };
        full_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.username())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == "admin"
    }
}

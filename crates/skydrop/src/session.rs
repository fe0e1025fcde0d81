//! Session identity.
//!
//! Authentication lives outside skydrop. Views only need to know who is
//! signed in and with which role, which a [`SessionProvider`] answers.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;

/// Prefix of every per-user order log key.
pub const ORDER_LOG_PREFIX: &str = "drone_orders_";

/// Identity used when nobody is signed in.
pub const GUEST_ID: &str = "guest";

/// Role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Operator with fleet-wide statistics.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable identifier, usually the email address.
    pub id: String,
    /// Name shown in greetings.
    pub display_name: String,
    /// Role.
    pub role: Role,
}

impl UserIdentity {
    /// Create an identity.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    /// The anonymous identity.
    #[must_use]
    pub fn guest() -> Self {
        Self::new(GUEST_ID, "Guest", Role::User)
    }

    /// Storage key of this user's order log.
    #[must_use]
    pub fn order_log_key(&self) -> String {
        format!("{ORDER_LOG_PREFIX}{}", self.id)
    }

    /// Check if this user is an operator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Source of the current user identity.
pub trait SessionProvider: Send + Sync + std::fmt::Debug {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<UserIdentity>;

    /// The signed-in user, or the guest identity.
    fn current_user_or_guest(&self) -> UserIdentity {
        self.current_user().unwrap_or_else(UserIdentity::guest)
    }
}

/// A session fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<UserIdentity>,
}

impl StaticSession {
    /// Create a session for the given user.
    #[must_use]
    pub fn new(user: Option<UserIdentity>) -> Self {
        Self { user }
    }

    /// Create a session nobody is signed in to.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create a session from configuration.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        let user = config
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                let display_name = config
                    .display_name
                    .clone()
                    .unwrap_or_else(|| id.split('@').next().unwrap_or(id).to_string());
                UserIdentity::new(id, display_name, config.role)
            });
        Self { user }
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<UserIdentity> {
        self.user.clone()
    }
}

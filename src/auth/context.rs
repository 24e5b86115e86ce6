//! Mapping from an authenticated key to the caller's context type.

use serde::{Deserialize, Serialize};

use crate::types::{SecurityLevel, UserId};

/// Builds the application-defined context for an authenticated request.
///
/// Invoked concurrently from in-flight authentications without any
/// synchronization, so implementations must be safe to call from many tasks.
/// Any `Fn(UserId, SecurityLevel) -> T + Send + Sync` qualifies.
pub trait AuthContextFactory<T>: Send + Sync {
    fn create_context(&self, user_id: UserId, security_level: SecurityLevel) -> T;
}

impl<T, F> AuthContextFactory<T> for F
where
    F: Fn(UserId, SecurityLevel) -> T + Send + Sync,
{
    fn create_context(&self, user_id: UserId, security_level: SecurityLevel) -> T {
        self(user_id, security_level)
    }
}

/// Default context: who signed the request and at which tier.
///
/// Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPrincipal {
    user_id: UserId,
    security_level: SecurityLevel,
}

impl KeyPrincipal {
    pub fn new(user_id: UserId, security_level: SecurityLevel) -> Self {
        Self {
            user_id,
            security_level,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    /// Whether this principal may perform an operation gated at `required`.
    pub fn has_level(&self, required: SecurityLevel) -> bool {
        self.security_level.satisfies(required)
    }
}

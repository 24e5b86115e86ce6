//! NewType wrappers for strong typing throughout the authenticator.
//!
//! These types prevent accidental mixing of semantically different integers
//! (e.g., passing a user ID where a key identifier is expected).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate a NewType wrapper around `u64` with standard trait implementations.
macro_rules! newtype_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new instance.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Get the inner value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_id!(
    /// Identifier a client presents to select the key it signed with.
    ///
    /// This is the stable lookup key into the key store and the first half
    /// of the `<identifier>:<signature>` credential parameter.
    KeyId
);

newtype_id!(
    /// Principal a key authenticates.
    ///
    /// Several keys may belong to the same user, each with its own
    /// security level and expiration.
    UserId
);

/// Ordinal privilege tier attached to a key.
///
/// An authenticator configured with a minimum level accepts only keys whose
/// level is greater than or equal to it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// The lowest tier; every key satisfies it.
    pub const MIN: SecurityLevel = SecurityLevel(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether a key at this level may be accepted by an authenticator requiring `required`.
    pub fn satisfies(self, required: SecurityLevel) -> bool {
        self >= required
    }
}

impl From<u8> for SecurityLevel {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Key records and the key store contract.
//!
//! The authenticator only ever talks to a [`KeyStore`] through `lookup` and
//! `refresh`; where keys live and how they are persisted is up to the
//! implementation. [`MemoryKeyStore`] is the in-process reference store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{KeyId, SecurityLevel, UserId};

/// Default lifetime granted by a refresh (1 hour).
pub const DEFAULT_KEY_TTL_SECONDS: i64 = 3600;

/// Shared secret material of a key.
///
/// Never printed and never serialized.
#[derive(Clone)]
pub struct KeySecret(Vec<u8>);

impl KeySecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw secret bytes, for signature computation only.
    pub fn expose_secret(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeySecret(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for KeySecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self(s.into_bytes()))
    }
}

/// Key record retrieved from the key store.
///
/// The security level is fixed at issuance. The expiration only moves through
/// [`Key::with_expiry`], which stores call when they accept a refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    identifier: KeyId,
    user_id: UserId,
    security_level: SecurityLevel,
    secret: KeySecret,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expires_at: DateTime<Utc>,
}

impl Key {
    pub fn new(
        identifier: KeyId,
        user_id: UserId,
        security_level: SecurityLevel,
        secret: impl Into<Vec<u8>>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier,
            user_id,
            security_level,
            secret: KeySecret::new(secret),
            expires_at,
        }
    }

    pub fn identifier(&self) -> KeyId {
        self.identifier
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    pub fn secret(&self) -> &KeySecret {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the key is still within its lifetime at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at >= now
    }

    /// Copy of this key with a new expiration. Used by stores to implement refresh.
    pub fn with_expiry(&self, expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            ..self.clone()
        }
    }
}

/// Infrastructure failures reported by a key store.
///
/// These are distinct from "no such key": a store that cannot answer must
/// say so rather than pretend the key does not exist.
#[derive(Debug, Clone)]
pub enum KeyStoreError {
    /// Backend unreachable (connection refused, pool exhausted, ...)
    Unavailable(String),
    /// Backend did not answer in time
    Timeout,
    /// Backend answered with something unusable
    Internal(String),
}

impl KeyStoreError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

impl fmt::Display for KeyStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "Key store unavailable: {}", msg),
            Self::Timeout => write!(f, "Key store timed out"),
            Self::Internal(msg) => write!(f, "Key store internal error: {}", msg),
        }
    }
}

impl std::error::Error for KeyStoreError {}

/// Lookup and refresh of key records.
///
/// Implementations must tolerate concurrent calls. Concurrent refreshes of the
/// same key may be coalesced or resolved last-write-wins. Any connection or
/// lock taken inside a call must be released when the returned future is
/// dropped, since callers may abandon an authentication mid-flight.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Find the key registered under `identifier`, if any.
    async fn lookup(&self, identifier: KeyId) -> Result<Option<Key>, KeyStoreError>;

    /// Extend the key's lifetime. `Ok(None)` means the store refused the
    /// refresh (e.g. the key was revoked in the meantime).
    async fn refresh(&self, key: &Key) -> Result<Option<Key>, KeyStoreError>;
}

/// In-memory key store.
#[derive(Clone)]
pub struct MemoryKeyStore {
    keys: Arc<RwLock<HashMap<KeyId, Key>>>,
    ttl: Duration,
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_KEY_TTL_SECONDS))
    }
}

impl MemoryKeyStore {
    /// Create an empty store whose refreshes extend keys by `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a store pre-populated with `keys`.
    pub fn with_keys(ttl: Duration, keys: impl IntoIterator<Item = Key>) -> Self {
        let map = keys.into_iter().map(|k| (k.identifier(), k)).collect();
        Self {
            keys: Arc::new(RwLock::new(map)),
            ttl,
        }
    }

    /// Register or replace a key.
    pub async fn insert(&self, key: Key) {
        self.keys.write().await.insert(key.identifier(), key);
    }

    /// Remove a key. Returns whether it was registered.
    pub async fn revoke(&self, identifier: KeyId) -> bool {
        self.keys.write().await.remove(&identifier).is_some()
    }

    /// Current record for `identifier`, bypassing the store contract.
    pub async fn get(&self, identifier: KeyId) -> Option<Key> {
        self.keys.read().await.get(&identifier).cloned()
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn lookup(&self, identifier: KeyId) -> Result<Option<Key>, KeyStoreError> {
        Ok(self.keys.read().await.get(&identifier).cloned())
    }

    async fn refresh(&self, key: &Key) -> Result<Option<Key>, KeyStoreError> {
        let now = Utc::now();
        let mut keys = self.keys.write().await;

        let Some(current) = keys.get_mut(&key.identifier()) else {
            debug!("Refresh refused, key {} is not registered", key.identifier());
            return Ok(None);
        };

        // An expired key is not revived by use
        if !current.is_live_at(now) {
            debug!("Refresh refused, key {} already expired", key.identifier());
            return Ok(None);
        }

        *current = current.with_expiry(now + self.ttl);
        Ok(Some(current.clone()))
    }
}

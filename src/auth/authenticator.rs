//! The authentication decision pipeline.

use std::fmt;
use std::sync::Arc;

use http::{Method, Uri};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::challenge::Challenge;
use crate::auth::context::AuthContextFactory;
use crate::auth::credentials::{CredentialExtractor, DhmacCredentialExtractor};
use crate::auth::key_store::{KeyStore, KeyStoreError};
use crate::auth::lifecycle::KeyLifecycleManager;
use crate::auth::signature::{HmacSha256Validator, SignatureValidator};
use crate::types::SecurityLevel;

/// Default realm presented in challenges.
pub const DEFAULT_REALM: &str = "dhmac";

/// Authenticator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorConfig {
    /// Realm presented in the challenge
    #[serde(default = "default_realm")]
    pub realm: String,
    /// Lowest key security level this authenticator accepts
    #[serde(default)]
    pub min_security_level: SecurityLevel,
    /// Whether each successful use asks the store to extend the key
    #[serde(default)]
    pub refresh_on_valid_use: bool,
}

fn default_realm() -> String {
    DEFAULT_REALM.to_string()
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            realm: default_realm(),
            min_security_level: SecurityLevel::MIN,
            refresh_on_valid_use: false,
        }
    }
}

/// Result of a completed authentication attempt.
///
/// A rejection carries no reason: callers only learn that the
/// request must be challenged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome<T> {
    Authenticated(T),
    Rejected,
}

impl<T> AuthOutcome<T> {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn into_context(self) -> Option<T> {
        match self {
            Self::Authenticated(ctx) => Some(ctx),
            Self::Rejected => None,
        }
    }
}

/// Failures that prevented a decision from being made at all.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The key store could not answer
    KeyStore(KeyStoreError),
}

impl AuthError {
    /// Whether the caller should ask the client to retry later instead of
    /// treating the request as unauthenticated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::KeyStore(e) => e.is_retryable(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyStore(e) => write!(f, "Authentication unavailable: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::KeyStore(e) => Some(e),
        }
    }
}

impl From<KeyStoreError> for AuthError {
    fn from(e: KeyStoreError) -> Self {
        Self::KeyStore(e)
    }
}

/// Verifies `dHMACSignature` credentials and produces a context of type `T`.
///
/// Instances are immutable. The `with_*` methods return a new authenticator
/// that shares the key store, context factory and strategies with the
/// receiver and differs in one setting.
pub struct Authenticator<T> {
    config: AuthenticatorConfig,
    store: Arc<dyn KeyStore>,
    factory: Arc<dyn AuthContextFactory<T>>,
    extractor: Arc<dyn CredentialExtractor>,
    validator: Arc<dyn SignatureValidator>,
}

impl<T> Clone for Authenticator<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            factory: Arc::clone(&self.factory),
            extractor: Arc::clone(&self.extractor),
            validator: Arc::clone(&self.validator),
        }
    }
}

impl<T> fmt::Debug for Authenticator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T> Authenticator<T> {
    /// Create an authenticator with the default extractor and HMAC-SHA256 validator.
    pub fn new(
        config: AuthenticatorConfig,
        store: Arc<dyn KeyStore>,
        factory: Arc<dyn AuthContextFactory<T>>,
    ) -> Self {
        Self {
            config,
            store,
            factory,
            extractor: Arc::new(DhmacCredentialExtractor),
            validator: Arc::new(HmacSha256Validator),
        }
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    pub fn min_security_level(&self) -> SecurityLevel {
        self.config.min_security_level
    }

    pub fn refresh_on_valid_use(&self) -> bool {
        self.config.refresh_on_valid_use
    }

    /// Same authenticator, different realm.
    pub fn with_realm(&self, realm: impl Into<String>) -> Self {
        self.reconfigured(|config| config.realm = realm.into())
    }

    /// Same authenticator, different minimum key level.
    pub fn with_security_level(&self, level: SecurityLevel) -> Self {
        self.reconfigured(|config| config.min_security_level = level)
    }

    /// Same authenticator, different refresh policy.
    pub fn with_refresh_on_valid_use(&self, refresh: bool) -> Self {
        self.reconfigured(|config| config.refresh_on_valid_use = refresh)
    }

    /// Same authenticator with a custom credential extractor.
    pub fn with_extractor(&self, extractor: Arc<dyn CredentialExtractor>) -> Self {
        Self {
            extractor,
            ..self.clone()
        }
    }

    /// Same authenticator with a custom signature validator.
    pub fn with_validator(&self, validator: Arc<dyn SignatureValidator>) -> Self {
        Self {
            validator,
            ..self.clone()
        }
    }

    fn reconfigured(&self, change: impl FnOnce(&mut AuthenticatorConfig)) -> Self {
        let mut config = self.config.clone();
        change(&mut config);
        Self {
            config,
            ..self.clone()
        }
    }

    /// Challenge to send with a rejection.
    pub fn challenge(&self) -> Challenge {
        Challenge::new(self.config.realm.clone(), self.config.min_security_level)
    }

    /// Decide whether the request is authenticated.
    ///
    /// Checks run in order: credential parsing, key lookup, signature, security
    /// level, expiration or refresh. The first failing check rejects. Only key
    /// store faults surface as `Err`.
    pub async fn authenticate(
        &self,
        credentials: Option<&str>,
        method: &Method,
        uri: &Uri,
    ) -> Result<AuthOutcome<T>, AuthError> {
        let Some(credential) = self.extractor.extract(credentials) else {
            debug!("Rejected request to {}: missing or malformed credentials", uri);
            return Ok(AuthOutcome::Rejected);
        };
        let key_id = credential.key_id;

        let key = match self.store.lookup(key_id).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                debug!("Rejected key {}: not registered", key_id);
                return Ok(AuthOutcome::Rejected);
            }
            Err(e) => {
                warn!("Key store lookup failed for key {}: {}", key_id, e);
                return Err(e.into());
            }
        };

        if !self
            .validator
            .is_valid(&key, &credential.signature, method, uri)
        {
            debug!("Rejected key {}: signature mismatch", key_id);
            return Ok(AuthOutcome::Rejected);
        }

        if !key
            .security_level()
            .satisfies(self.config.min_security_level)
        {
            debug!(
                "Rejected key {}: level {} below required {}",
                key_id,
                key.security_level(),
                self.config.min_security_level
            );
            return Ok(AuthOutcome::Rejected);
        }

        let lifecycle = KeyLifecycleManager::new(self.config.refresh_on_valid_use);
        match lifecycle.check(self.store.as_ref(), &key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Rejected key {}: expired or refresh refused", key_id);
                return Ok(AuthOutcome::Rejected);
            }
            Err(e) => {
                warn!("Key store refresh failed for key {}: {}", key_id, e);
                return Err(e.into());
            }
        }

        debug!("Authenticated key {} for user {}", key_id, key.user_id());
        Ok(AuthOutcome::Authenticated(
            self.factory
                .create_context(key.user_id(), key.security_level()),
        ))
    }
}

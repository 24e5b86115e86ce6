// Core modules
pub mod auth;
mod config;
pub mod types;

// HTTP surface
pub mod api;

// Re-export key types and functions
pub use auth::{
    AuthContextFactory, AuthError, AuthOutcome, Authenticator, AuthenticatorConfig, Challenge,
    Key, KeyPrincipal, KeyStore, KeyStoreError, MemoryKeyStore,
};
pub use config::{DEFAULT_BIND, ServiceConfig, load_service_config, resolve_config_path};
pub use types::{KeyId, SecurityLevel, UserId};

use std::sync::Arc;

/// Convenience function to build an authenticator over an in-memory store
/// seeded from the service configuration.
///
/// Returns the store alongside so callers can add or revoke keys at runtime.
pub fn create_authenticator(
    config: &ServiceConfig,
) -> (Arc<Authenticator<KeyPrincipal>>, Arc<MemoryKeyStore>) {
    let store = Arc::new(MemoryKeyStore::with_keys(
        config.key_ttl,
        config.keys.iter().cloned(),
    ));

    let authenticator = Authenticator::<KeyPrincipal>::new(
        config.authenticator.clone(),
        store.clone(),
        Arc::new(KeyPrincipal::new),
    );

    (Arc::new(authenticator), store)
}

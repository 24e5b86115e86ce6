//! Distributed-HMAC request authentication.
//!
//! This module decides, per request, whether the caller holds a valid key:
//!
//! - **Credentials**: `Authorization: dHMACSignature <identifier>:<signature>`
//! - **Signature**: hex HMAC-SHA256 of `"{METHOD}:{URI}:placeholder:"` under the key secret
//! - **Policy**: the key's security level must reach the authenticator's minimum
//! - **Lifecycle**: the key must be unexpired, or accept a refresh when refresh-on-use is on
//!
//! ## Security Model
//!
//! - Every failed check produces the same `Rejected` outcome; which check failed
//!   is only visible in debug logs
//! - Key store faults are reported as errors so they are not mistaken for bad
//!   credentials
//! - Signatures are compared in constant time
//! - The canonical string carries no nonce or timestamp, so signatures are
//!   replayable for the same method and URI while the key is valid
//!
//! ## Usage
//!
//! ```ignore
//! let authenticator = Authenticator::new(
//!     AuthenticatorConfig::default(),
//!     Arc::new(MemoryKeyStore::default()),
//!     Arc::new(KeyPrincipal::new),
//! )
//! .with_security_level(SecurityLevel::new(2));
//!
//! match authenticator.authenticate(header, &method, &uri).await? {
//!     AuthOutcome::Authenticated(principal) => { /* serve */ }
//!     AuthOutcome::Rejected => { /* 401 + authenticator.challenge() */ }
//! }
//! ```

mod authenticator;
mod challenge;
mod context;
mod credentials;
mod key_store;
mod lifecycle;
mod signature;


pub use authenticator::{
    AuthError, AuthOutcome, Authenticator, AuthenticatorConfig, DEFAULT_REALM,
};
pub use challenge::Challenge;
pub use context::{AuthContextFactory, KeyPrincipal};
pub use credentials::{
    Credential, CredentialExtractor, DHMAC_SCHEME, DhmacCredentialExtractor, format_credentials,
};
pub use key_store::{
    DEFAULT_KEY_TTL_SECONDS, Key, KeySecret, KeyStore, KeyStoreError, MemoryKeyStore,
};
pub use lifecycle::KeyLifecycleManager;
pub use signature::{
    HmacSha256Validator, SIGNATURE_PLACEHOLDER, SignatureValidator, canonical_string,
    sign_request,
};

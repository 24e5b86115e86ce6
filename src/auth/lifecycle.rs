//! Temporal validity of keys that already passed signature and level checks.

use chrono::Utc;
use tracing::debug;

use crate::auth::key_store::{Key, KeyStore, KeyStoreError};

/// Decides whether a key is still valid, optionally refreshing it.
///
/// With refresh enabled, every successful use asks the store to extend the
/// key, and the key is valid exactly when the store agrees. Without refresh,
/// the stored expiration is compared to the current time and nothing is
/// written.
#[derive(Debug, Clone, Copy)]
pub struct KeyLifecycleManager {
    refresh_on_valid_use: bool,
}

impl KeyLifecycleManager {
    pub fn new(refresh_on_valid_use: bool) -> Self {
        Self {
            refresh_on_valid_use,
        }
    }

    pub fn refreshes_on_use(&self) -> bool {
        self.refresh_on_valid_use
    }

    /// Check `key`, refreshing it through `store` when configured to.
    pub async fn check(&self, store: &dyn KeyStore, key: &Key) -> Result<bool, KeyStoreError> {
        if self.refresh_on_valid_use {
            let refreshed = store.refresh(key).await?;
            if refreshed.is_none() {
                debug!("Store refused refresh of key {}", key.identifier());
            }
            return Ok(refreshed.is_some());
        }

        let live = key.is_live_at(Utc::now());
        if !live {
            debug!("Key {} expired at {}", key.identifier(), key.expires_at());
        }
        Ok(live)
    }
}

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! Token revocation provider.
//!
//! The identity service publishes a signed list of revoked tokens so that
//! consumers can reject a token before its natural expiry. Tokens do not
//! appear in the list by value: each entry carries the fixed width hash of
//! the token identifier together with the token's expiration time, the same
//! hash [crate::cms::hash::hash_token] produces. An opaque token is its own
//! identifier, so for those the entry id is the token itself.
//!
//! Entries stay relevant for a while after the token has expired - clock
//! skew between services would otherwise let an expired-here token pass
//! elsewhere - which is what the `[revoke] expiration_buffer` option
//! controls during pruning.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, RwLock};
use tracing::debug;

pub mod error;
pub mod types;

use crate::cms::hash_token;
use crate::config::Config;

pub use error::RevokeProviderError;
pub use types::*;

/// Revocation provider interface.
pub trait RevokeApi: Send + Sync {
    /// Replace the held revocation list with the given JSON document.
    fn update_list(&self, document: &str) -> Result<(), RevokeProviderError>;

    /// Check whether the token has been revoked or not.
    ///
    /// The credential is reduced to its identifier hash and matched against
    /// the list entries.
    fn is_token_revoked(&self, credential: &str) -> Result<bool, RevokeProviderError>;

    /// Drop entries whose token expired longer than the configured
    /// expiration buffer ago, returning how many were removed.
    fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize, RevokeProviderError>;
}

/// Revocation provider.
#[derive(Clone, Debug)]
pub struct RevokeProvider {
    config: Config,
    /// The most recently loaded revocation list.
    list: Arc<RwLock<RevocationList>>,
}

impl RevokeProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            list: Arc::default(),
        }
    }
}

impl RevokeApi for RevokeProvider {
    /// Replace the held revocation list with the given JSON document.
    #[tracing::instrument(level = "trace", skip(self, document))]
    fn update_list(&self, document: &str) -> Result<(), RevokeProviderError> {
        let parsed: RevocationList = serde_json::from_str(document)?;
        debug!("Loaded a revocation list with {} entries", parsed.revoked.len());
        let mut list = self
            .list
            .write()
            .map_err(|_| RevokeProviderError::ListLockPoisoned)?;
        *list = parsed;
        Ok(())
    }

    /// Check whether the token has been revoked or not.
    #[tracing::instrument(level = "trace", skip(self, credential))]
    fn is_token_revoked(&self, credential: &str) -> Result<bool, RevokeProviderError> {
        let hashed = hash_token(credential, &self.config.token.hash_algorithm);
        let list = self
            .list
            .read()
            .map_err(|_| RevokeProviderError::ListLockPoisoned)?;
        Ok(list.contains(&hashed))
    }

    /// Drop entries whose token expired longer than the configured
    /// expiration buffer ago.
    #[tracing::instrument(level = "trace", skip(self))]
    fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize, RevokeProviderError> {
        let cutoff = now - TimeDelta::seconds(self.config.revoke.expiration_buffer as i64);
        let mut list = self
            .list
            .write()
            .map_err(|_| RevokeProviderError::ListLockPoisoned)?;
        let removed = list.prune_expired(cutoff);
        if removed > 0 {
            debug!("Pruned {removed} expired revocation entries");
        }
        Ok(removed)
    }
}

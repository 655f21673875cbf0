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

//! # OpenStack Keystone PKI token handling
//!
//! Keystone deployments that issue PKI tokens hand their clients a signed
//! CMS (Cryptographic Message Syntax, RFC 5652) structure instead of a short
//! opaque identifier. Such a token is the base64 body of the CMS block with
//! the PEM armor stripped and `/` replaced by `-` so that the result can
//! travel in an HTTP header. Before the token data can be trusted, the
//! signature has to be authenticated against the deployment's signing
//! certificate and CA; before the token can be looked up in a cache or in
//! the revocation list published by the identity service, it has to be
//! reduced to a short fixed-width hash, because a signed token can easily be
//! several kilobytes long.
//!
//! This crate implements exactly that slice of the identity machinery:
//!
//! - [`cms::codec`] converts between the compact header-safe token form and
//!   the PEM-armored CMS block the cryptographic tooling expects, and
//!   classifies a credential as a signed token (PKI or compressed PKIZ) or
//!   an opaque identifier;
//! - [`cms::backend`] performs the actual signing and verification. The
//!   default driver shells out to the `openssl cms` command the same way the
//!   Python implementation always has; the driver is a trait object chosen
//!   through configuration and may be injected explicitly, so alternative
//!   (e.g. in-process) implementations slot in without touching callers;
//! - [`cms::hash`] produces the fixed-width token identifier hashes;
//! - [`revoke`] matches hashed identifiers against the revocation list
//!   document published by the identity service.
//!
//! The HTTP resource managers, authentication plugins, service catalog and
//! CLI layers of the wider client live outside of this crate: they only ever
//! exchange token strings and hashes with it.

use crate::cms::CmsApi;
use crate::error::KeystonePkiError;
use crate::revoke::RevokeApi;

pub mod cms;
pub mod config;
pub mod error;
pub mod revoke;

/// Authenticate a signed token and check it against the revocation list.
///
/// The payload is only returned when the signature verifies and no
/// revocation entry matches the hashed token identifier. Any error means
/// the token must be treated as invalid by the caller.
pub async fn authenticate_token(
    cms: &impl CmsApi,
    revoke: &impl RevokeApi,
    credential: &str,
) -> Result<Vec<u8>, KeystonePkiError> {
    let payload = cms.verify_token(credential).await?;
    if revoke.is_token_revoked(credential)? {
        return Err(KeystonePkiError::TokenRevoked);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{CmsProvider, MockBackend, hash_token};
    use crate::config::Config;
    use crate::revoke::RevokeProvider;

    fn setup_config() -> Config {
        Config::default()
    }

    #[tokio::test]
    async fn test_authenticate_token() {
        let config = setup_config();
        let mut backend = MockBackend::new();
        backend.expect_set_config().return_const(());
        backend
            .expect_verify_data()
            .returning(|_, _| Ok(b"payload".to_vec()));
        let cms = CmsProvider::with_backend(&config, Box::new(backend));
        let revoke = RevokeProvider::new(&config);

        let payload = authenticate_token(&cms, &revoke, "MIIfoobar")
            .await
            .unwrap();
        assert_eq!(b"payload".to_vec(), payload);
    }

    #[tokio::test]
    async fn test_authenticate_token_revoked() {
        let config = setup_config();
        let mut backend = MockBackend::new();
        backend.expect_set_config().return_const(());
        backend
            .expect_verify_data()
            .returning(|_, _| Ok(b"payload".to_vec()));
        let cms = CmsProvider::with_backend(&config, Box::new(backend));
        let revoke = RevokeProvider::new(&config);
        let hashed = hash_token("MIIfoobar", &config.token.hash_algorithm);
        revoke
            .update_list(&format!(
                r#"{{"revoked": [{{"id": "{hashed}", "expires": "2035-01-01T00:00:00"}}]}}"#
            ))
            .unwrap();

        match authenticate_token(&cms, &revoke, "MIIfoobar").await {
            Err(KeystonePkiError::TokenRevoked) => {}
            other => panic!("expected a revoked token error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_token_opaque() {
        let config = setup_config();
        let mut backend = MockBackend::new();
        backend.expect_set_config().return_const(());
        let cms = CmsProvider::with_backend(&config, Box::new(backend));
        let revoke = RevokeProvider::new(&config);

        assert!(
            authenticate_token(&cms, &revoke, "8286720fbe4941e69fa8241723bb02df")
                .await
                .is_err()
        );
    }
}

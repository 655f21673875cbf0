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
//! # CMS signed token provider.
//!
//! A PKI token is the CMS signature structure over the token data, carried
//! in a compact header-safe form; a PKIZ token additionally zlib-compresses
//! the structure. The provider here owns the round trip between those forms
//! and the cryptographic backend: it classifies a credential, normalizes it
//! into the shape the backend understands (PEM armor or raw DER), and hands
//! the result to the configured backend driver for the actual signing or
//! verification. Opaque tokens never reach the backend - there is nothing
//! to verify about a random identifier.
//!
//! The backend is a trait object selected by the `[signing] driver` option,
//! or injected explicitly through [CmsProvider::with_backend]. The only
//! driver shipped is [backend::openssl_cli::OpensslCliBackend].

use async_trait::async_trait;
use tracing::debug;

pub mod backend;
pub mod codec;
pub mod error;
pub mod hash;
#[cfg(test)]
mod mock;

use crate::cms::backend::{CmsBackend, CmsForm, openssl_cli::OpensslCliBackend};
use crate::config::Config;

pub use codec::{
    PKI_ASN1_PREFIX, PKIZ_PREFIX, cms_to_token, is_asn1_token, is_pkiz, is_signed_token,
    pkiz_decode, pkiz_encode, token_to_cms,
};
pub use error::CmsProviderError;
pub use hash::hash_token;
#[cfg(test)]
pub use mock::MockBackend;

/// CMS provider interface.
#[async_trait]
pub trait CmsApi: Send + Sync {
    /// Sign the payload into the compact PKI token form.
    async fn sign_token(&self, data: &[u8]) -> Result<String, CmsProviderError>;

    /// Sign the payload into the compressed PKIZ token form.
    async fn sign_token_compressed(&self, data: &[u8]) -> Result<String, CmsProviderError>;

    /// Authenticate a signed token and recover the payload.
    async fn verify_token(&self, credential: &str) -> Result<Vec<u8>, CmsProviderError>;

    /// Reduce the token to the fixed width identifier used as a lookup key.
    fn hash_token(&self, credential: &str) -> String;
}

/// CMS provider.
#[derive(Clone, Debug)]
pub struct CmsProvider {
    config: Config,
    /// Backend driver.
    backend_driver: Box<dyn CmsBackend>,
}

impl CmsProvider {
    pub fn new(config: &Config) -> Result<Self, CmsProviderError> {
        let backend_driver: Box<dyn CmsBackend> = match config.signing.driver.as_str() {
            "openssl_cli" => Box::new(OpensslCliBackend::new(config.clone())),
            other => {
                return Err(CmsProviderError::UnsupportedDriver(other.to_string()));
            }
        };
        Ok(Self {
            config: config.clone(),
            backend_driver,
        })
    }

    /// Construct the provider around an explicitly injected backend driver
    /// instead of resolving one from the configuration.
    pub fn with_backend(config: &Config, mut backend_driver: Box<dyn CmsBackend>) -> Self {
        backend_driver.set_config(config.clone());
        Self {
            config: config.clone(),
            backend_driver,
        }
    }
}

#[async_trait]
impl CmsApi for CmsProvider {
    /// Sign the payload into the compact PKI token form.
    ///
    /// The backend produces the PEM armored structure; stripping the armor
    /// yields the token.
    #[tracing::instrument(level = "trace", skip(self, data))]
    async fn sign_token(&self, data: &[u8]) -> Result<String, CmsProviderError> {
        let signed = self.backend_driver.sign_data(data, CmsForm::Pem).await?;
        let armored = String::from_utf8(signed)?;
        Ok(codec::cms_to_token(&armored))
    }

    /// Sign the payload into the compressed PKIZ token form.
    #[tracing::instrument(level = "trace", skip(self, data))]
    async fn sign_token_compressed(&self, data: &[u8]) -> Result<String, CmsProviderError> {
        let signed = self.backend_driver.sign_data(data, CmsForm::Der).await?;
        codec::pkiz_encode(&signed, self.config.signing.compression_level)
    }

    /// Authenticate a signed token and recover the payload.
    #[tracing::instrument(level = "trace", skip(self, credential))]
    async fn verify_token(&self, credential: &str) -> Result<Vec<u8>, CmsProviderError> {
        if codec::is_pkiz(credential) {
            let der = codec::pkiz_decode(credential)?;
            self.backend_driver.verify_data(&der, CmsForm::Der).await
        } else if codec::is_asn1_token(credential) {
            let armored = codec::token_to_cms(credential);
            self.backend_driver
                .verify_data(armored.as_bytes(), CmsForm::Pem)
                .await
        } else {
            debug!("Refusing to verify an opaque token");
            Err(CmsProviderError::NotSignedToken)
        }
    }

    /// Reduce the token to the fixed width identifier used as a lookup key.
    fn hash_token(&self, credential: &str) -> String {
        hash::hash_token(credential, &self.config.token.hash_algorithm)
    }
}

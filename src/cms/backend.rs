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
//! CMS signing backend trait.
use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::cms::error::CmsProviderError;
use crate::config::Config;

pub mod openssl_cli;

/// Encoding of a signed CMS structure.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CmsForm {
    /// PEM armored text, the shape behind uncompressed PKI tokens.
    #[default]
    Pem,
    /// Raw DER bytes, the shape behind compressed PKIZ tokens.
    Der,
}

impl CmsForm {
    /// The `-inform`/`-outform` argument value of the external tool.
    pub fn as_arg(&self) -> &'static str {
        match self {
            CmsForm::Pem => "PEM",
            CmsForm::Der => "DER",
        }
    }
}

#[async_trait]
/// CmsBackend trait.
///
/// Backend driver interface expected by the CMS provider. Drivers are
/// selected by name through the configuration or injected explicitly at
/// provider construction.
pub trait CmsBackend: DynClone + Send + Sync + std::fmt::Debug {
    /// Set config
    fn set_config(&mut self, config: Config);

    /// Produce the signed CMS structure over the payload in the requested
    /// form.
    async fn sign_data(
        &self,
        data: &[u8],
        outform: CmsForm,
    ) -> Result<Vec<u8>, CmsProviderError>;

    /// Authenticate a signed CMS structure against the configured trust
    /// material and recover the payload.
    async fn verify_data(
        &self,
        data: &[u8],
        inform: CmsForm,
    ) -> Result<Vec<u8>, CmsProviderError>;
}

dyn_clone::clone_trait_object!(CmsBackend);

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
//! Internal mock structures for the [CmsBackend](crate::cms::backend::CmsBackend).

use async_trait::async_trait;
use mockall::mock;

use crate::cms::backend::{CmsBackend, CmsForm};
use crate::cms::error::CmsProviderError;
use crate::config::Config;

mock! {
    pub Backend {}

    #[async_trait]
    impl CmsBackend for Backend {
        fn set_config(&mut self, config: Config);

        async fn sign_data(
            &self,
            data: &[u8],
            outform: CmsForm,
        ) -> Result<Vec<u8>, CmsProviderError>;

        async fn verify_data(
            &self,
            data: &[u8],
            inform: CmsForm,
        ) -> Result<Vec<u8>, CmsProviderError>;
    }

    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish()
    }
}

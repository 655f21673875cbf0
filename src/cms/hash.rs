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
//! Token identifier hashing.
//!
//! Caches and the revocation list key tokens by their identifier. For an
//! opaque token that identifier is the token itself, but a signed token can
//! be several kilobytes long, so it is collapsed into the hex digest of its
//! exact bytes. The digest stays stable across calls, which is what makes
//! it usable as a lookup key.

use md5::Md5;
use sha2::{Digest, Sha256};

use crate::cms::codec::is_signed_token;
use crate::config::HashAlgorithm;

/// Reduce a token to its fixed width identifier.
///
/// Signed (PKI or PKIZ) tokens are hashed over their exact compact-form
/// bytes into a lowercase hex digest: 32 characters for md5, 64 for sha256.
/// Opaque tokens are already short and unique and pass through unchanged.
pub fn hash_token(token_id: &str, algorithm: &HashAlgorithm) -> String {
    if !is_signed_token(token_id) {
        return token_id.to_string();
    }
    match algorithm {
        HashAlgorithm::Md5 => hex::encode(Md5::digest(token_id.as_bytes())),
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(token_id.as_bytes())),
    }
}

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
//! Revocation list types.
//!
//! Wire format of the revocation list document:
//!
//! ```json
//! {"revoked": [{"id": "<token hash>", "expires": "2035-06-01T12:00:00"}]}
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Timestamp format the identity service emits in the revocation list:
/// UTC without an offset designator.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Revocation list entry.
#[derive(Builder, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[builder(setter(into))]
pub struct RevokedTokenEntry {
    /// Hash of the token identifier.
    pub id: String,
    /// Expiration time of the revoked token.
    #[serde(
        deserialize_with = "deserialize_expiry",
        serialize_with = "serialize_expiry"
    )]
    pub expires: DateTime<Utc>,
}

/// Token revocation list document.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RevocationList {
    /// Revoked token entries.
    #[serde(default)]
    pub revoked: Vec<RevokedTokenEntry>,
}

impl RevocationList {
    /// Whether a hashed token identifier is present in the list.
    pub fn contains(&self, token_hash: &str) -> bool {
        self.revoked.iter().any(|entry| entry.id == token_hash)
    }

    /// Drop entries expired before the cutoff, returning how many were
    /// removed.
    pub fn prune_expired(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.revoked.len();
        self.revoked.retain(|entry| entry.expires >= cutoff);
        before - self.revoked.len()
    }
}

/// Parse the `expires` value. The service emits the naive UTC form; RFC
/// 3339 input is tolerated as well.
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

fn serialize_expiry<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
}

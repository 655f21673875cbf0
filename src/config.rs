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

use config::{File, FileFormat};
use eyre::{Report, WrapErr};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Global configuration options
    #[serde(rename = "DEFAULT")]
    pub default: Option<DefaultSection>,

    /// Revocation list configuration.
    #[serde(default)]
    pub revoke: RevokeSection,

    /// Token signing configuration.
    #[serde(default)]
    pub signing: SigningSection,

    /// Token handling configuration.
    #[serde(default)]
    pub token: TokenSection,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct DefaultSection {
    /// Debug logging
    pub debug: Option<bool>,
}

/// Token signing configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct SigningSection {
    /// Entry point for the CMS signing backend driver in the
    /// `keystone.signing` namespace. Only an `openssl_cli` driver is
    /// provided.
    #[serde(default = "default_signing_driver")]
    pub driver: String,

    /// Path of the external tool invoked for CMS signing and verification.
    #[serde(default = "default_cms_executable")]
    pub cms_executable: PathBuf,

    /// Path of the certfile for token signing.
    #[serde(default = "default_certfile")]
    pub certfile: PathBuf,

    /// Path of the keyfile for token signing.
    #[serde(default = "default_keyfile")]
    pub keyfile: PathBuf,

    /// Path of the CA for token signing.
    #[serde(default = "default_ca_certs")]
    pub ca_certs: PathBuf,

    /// The number of seconds the signing subprocess may run before it is
    /// killed and the operation fails with a timeout error.
    pub subprocess_timeout: u64,

    /// zlib compression level applied to PKIZ tokens.
    pub compression_level: u32,
}

impl Default for SigningSection {
    fn default() -> Self {
        Self {
            driver: default_signing_driver(),
            cms_executable: default_cms_executable(),
            certfile: default_certfile(),
            keyfile: default_keyfile(),
            ca_certs: default_ca_certs(),
            subprocess_timeout: 30,
            compression_level: 6,
        }
    }
}

/// Revocation list configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RevokeSection {
    /// The number of seconds after a token has expired before a corresponding
    /// revocation list entry may be purged.
    pub expiration_buffer: u64,
}

impl Default for RevokeSection {
    fn default() -> Self {
        Self {
            expiration_buffer: 1800,
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct TokenSection {
    /// The hash algorithm used to reduce a signed token to the fixed width
    /// identifier under which it appears in caches and the revocation list.
    /// `md5` is what the python implementation has always produced; `sha256`
    /// trades compatibility for collision resistance.
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

/// Token identifier hash algorithm.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "md5")]
    Md5,
    #[serde(rename = "sha256")]
    Sha256,
}

fn default_signing_driver() -> String {
    "openssl_cli".into()
}

fn default_cms_executable() -> PathBuf {
    "openssl".into()
}

fn default_certfile() -> PathBuf {
    "/etc/keystone/ssl/certs/signing_cert.pem".into()
}

fn default_keyfile() -> PathBuf {
    "/etc/keystone/ssl/private/signing_key.pem".into()
}

fn default_ca_certs() -> PathBuf {
    "/etc/keystone/ssl/certs/ca.pem".into()
}

impl Config {
    pub fn new(path: PathBuf) -> Result<Self, Report> {
        let mut builder = config::Config::builder();

        if std::path::Path::new(&path).is_file() {
            builder = builder.add_source(File::from(path).format(FileFormat::Ini));
        }

        builder.try_into()
    }
}

impl TryFrom<config::ConfigBuilder<config::builder::DefaultState>> for Config {
    type Error = Report;
    fn try_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Self::Error> {
        let mut builder = builder;
        builder = builder
            .set_default("revoke.expiration_buffer", "1800")?
            .set_default("signing.driver", "openssl_cli")?
            .set_default("signing.cms_executable", "openssl")?
            .set_default("signing.certfile", "/etc/keystone/ssl/certs/signing_cert.pem")?
            .set_default("signing.keyfile", "/etc/keystone/ssl/private/signing_key.pem")?
            .set_default("signing.ca_certs", "/etc/keystone/ssl/certs/ca.pem")?
            .set_default("signing.subprocess_timeout", "30")?
            .set_default("signing.compression_level", "6")?
            .set_default("token.hash_algorithm", "md5")?;

        builder
            .build()
            .wrap_err("Failed to read configuration file")?
            .try_deserialize()
            .wrap_err("Failed to parse configuration file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let builder = config::Config::builder();
        let conf: Config = Config::try_from(builder).expect("can build a valid config");
        assert_eq!("openssl_cli", conf.signing.driver);
        assert_eq!(PathBuf::from("openssl"), conf.signing.cms_executable);
        assert_eq!(
            PathBuf::from("/etc/keystone/ssl/certs/signing_cert.pem"),
            conf.signing.certfile
        );
        assert_eq!(30, conf.signing.subprocess_timeout);
        assert_eq!(6, conf.signing.compression_level);
        assert_eq!(HashAlgorithm::Md5, conf.token.hash_algorithm);
        assert_eq!(1800, conf.revoke.expiration_buffer);
    }

    #[test]
    fn test_ini_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystone.conf");
        std::fs::write(
            &path,
            "[signing]\ncertfile = /opt/stack/cert.pem\nsubprocess_timeout = 10\n\n[token]\nhash_algorithm = sha256\n",
        )
        .unwrap();

        let conf = Config::new(path).expect("can read the config file");
        assert_eq!(PathBuf::from("/opt/stack/cert.pem"), conf.signing.certfile);
        assert_eq!(10, conf.signing.subprocess_timeout);
        assert_eq!(HashAlgorithm::Sha256, conf.token.hash_algorithm);
        // Untouched options keep their defaults.
        assert_eq!(PathBuf::from("openssl"), conf.signing.cms_executable);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let conf = Config::new(PathBuf::from("/nonexistent/keystone.conf"))
            .expect("can build a valid config");
        assert_eq!("openssl_cli", conf.signing.driver);
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("token.hash_algorithm", "sha256")
            .unwrap()
            .set_override("signing.subprocess_timeout", "5")
            .unwrap()
            .set_override("signing.certfile", "/tmp/cert.pem")
            .unwrap();
        let conf: Config = Config::try_from(builder).expect("can build a valid config");
        assert_eq!(HashAlgorithm::Sha256, conf.token.hash_algorithm);
        assert_eq!(5, conf.signing.subprocess_timeout);
        assert_eq!(PathBuf::from("/tmp/cert.pem"), conf.signing.certfile);
    }
}

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
//! CMS provider errors.

use std::path::PathBuf;

use thiserror::Error;

/// CMS provider error.
#[derive(Debug, Error)]
pub enum CmsProviderError {
    /// PKIZ token body is not valid urlsafe base64.
    #[error("b64 decode error")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error.
    #[error("io error: {}", source)]
    Io {
        /// The source of the error.
        #[from]
        source: std::io::Error,
    },

    /// The credential is a plain opaque identifier; there is no signature
    /// to authenticate.
    #[error("token is not a PKI or PKIZ signed token")]
    NotSignedToken,

    /// The signing subprocess failed. The tool's stderr is carried as the
    /// diagnostic payload; the partial stdout must not be interpreted.
    #[error("cms signing failed")]
    Signing {
        /// Stderr of the signing subprocess.
        stderr: String,
    },

    /// The stdin/stdout exchange with the subprocess failed at the OS
    /// level.
    #[error("cms subprocess communication failed while {context}: {}", source)]
    SubprocessCommunication {
        /// What the exchange was doing when it failed.
        context: String,
        /// The source of the error.
        source: std::io::Error,
    },

    /// The external tool could not be started at all.
    #[error("failed to spawn the cms executable {executable:?}: {}", source)]
    SubprocessSpawn {
        /// The configured executable.
        executable: PathBuf,
        /// The source of the error.
        source: std::io::Error,
    },

    /// The subprocess exceeded the configured timeout and was killed.
    #[error("the cms executable {executable:?} did not finish within {seconds} seconds")]
    SubprocessTimeout {
        /// The configured executable.
        executable: PathBuf,
        /// The configured timeout.
        seconds: u64,
    },

    /// The tool produced a signed structure that is not valid UTF-8 where
    /// PEM text was requested.
    #[error("cms output is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Unsupported signing backend driver.
    #[error("unsupported signing driver {0}")]
    UnsupportedDriver(String),

    /// Verification failed. Bad signatures and missing or unreadable
    /// certificate files intentionally surface the same way; the stderr
    /// payload is kept for logging but never rendered to the caller.
    #[error("token verification failed: invalid token or misconfigured trust chain")]
    Verification {
        /// Stderr of the verification subprocess.
        stderr: String,
    },
}

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
//! CMS backend shelling out to the `openssl cms` command line tool.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

use crate::cms::backend::{CmsBackend, CmsForm};
use crate::cms::error::CmsProviderError;
use crate::config::Config;

/// Some versions of the tool exit with status 0 while still reporting a
/// signing problem on stderr, so stderr is scanned for this marker as well.
const STDERR_ERROR_MARKER: &str = "Error";

/// Backend driver invoking the external `openssl cms` tool.
///
/// One child process is spawned per call and fully reaped before the call
/// returns; there is no pooling or reuse. The payload is fed on stdin while
/// stdout and stderr are drained concurrently, so an arbitrarily large
/// token cannot deadlock on a full pipe buffer. The child runs under the
/// configured timeout and is killed on expiry.
#[derive(Clone, Debug, Default)]
pub struct OpensslCliBackend {
    config: Config,
}

struct CommandOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn pipe_error(context: &str) -> CmsProviderError {
    CmsProviderError::SubprocessCommunication {
        context: context.into(),
        source: std::io::Error::other("pipe was not captured"),
    }
}

fn exchange_error(context: &str, source: std::io::Error) -> CmsProviderError {
    CmsProviderError::SubprocessCommunication {
        context: context.into(),
        source,
    }
}

impl OpensslCliBackend {
    /// Construct new OpensslCliBackend
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the external tool, feeding `input` on stdin and collecting the
    /// exit status together with the fully drained stdout and stderr.
    async fn communicate(
        &self,
        mut command: Command,
        input: &[u8],
    ) -> Result<CommandOutput, CmsProviderError> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Invoking the cms tool: {:?}", command);

        let mut child =
            command
                .spawn()
                .map_err(|source| CmsProviderError::SubprocessSpawn {
                    executable: self.config.signing.cms_executable.clone(),
                    source,
                })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| pipe_error("opening the stdin pipe"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| pipe_error("opening the stdout pipe"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| pipe_error("opening the stderr pipe"))?;

        let payload = input.to_vec();
        let exchange = async {
            let mut stdout_buf: Vec<u8> = Vec::new();
            let mut stderr_buf: Vec<u8> = Vec::new();
            let feed = async {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
                // Closing the pipe is what lets the child see EOF.
                drop(stdin);
                Ok::<(), std::io::Error>(())
            };
            let (fed, out_read, err_read) = tokio::join!(
                feed,
                stdout.read_to_end(&mut stdout_buf),
                stderr.read_to_end(&mut stderr_buf)
            );
            out_read.map_err(|source| exchange_error("draining stdout", source))?;
            err_read.map_err(|source| exchange_error("draining stderr", source))?;
            let status = child
                .wait()
                .await
                .map_err(|source| exchange_error("waiting for the child to exit", source))?;
            if let Err(source) = fed {
                // A child that fails early stops reading its stdin and the
                // feed side sees a broken pipe; the exit status already
                // tells that story, so only an unexpected pipe failure is
                // raised as a communication error.
                if source.kind() != std::io::ErrorKind::BrokenPipe || status.success() {
                    return Err(exchange_error("feeding the payload to stdin", source));
                }
            }
            Ok::<CommandOutput, CmsProviderError>(CommandOutput {
                status,
                stdout: stdout_buf,
                stderr: stderr_buf,
            })
        };

        let seconds = self.config.signing.subprocess_timeout;
        let result = time::timeout(Duration::from_secs(seconds), exchange).await;
        match result {
            Ok(output) => output,
            Err(_) => {
                warn!("The cms subprocess did not finish within {seconds} seconds, killing it");
                child.start_kill().ok();
                child.wait().await.ok();
                Err(CmsProviderError::SubprocessTimeout {
                    executable: self.config.signing.cms_executable.clone(),
                    seconds,
                })
            }
        }
    }
}

#[async_trait]
impl CmsBackend for OpensslCliBackend {
    /// Set config
    fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Sign the payload.
    #[tracing::instrument(level = "trace", skip(self, data))]
    async fn sign_data(
        &self,
        data: &[u8],
        outform: CmsForm,
    ) -> Result<Vec<u8>, CmsProviderError> {
        let signing = &self.config.signing;
        let mut command = Command::new(&signing.cms_executable);
        command
            .arg("cms")
            .arg("-sign")
            .arg("-signer")
            .arg(&signing.certfile)
            .arg("-inkey")
            .arg(&signing.keyfile)
            .arg("-outform")
            .arg(outform.as_arg())
            .arg("-nosmimecap")
            .arg("-nodetach")
            .arg("-nocerts")
            .arg("-noattr");

        let output = self.communicate(command, data).await?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() || stderr.contains(STDERR_ERROR_MARKER) {
            debug!("cms signing stderr: {stderr}");
            return Err(CmsProviderError::Signing { stderr });
        }
        Ok(output.stdout)
    }

    /// Verify the signed structure and recover the payload.
    #[tracing::instrument(level = "trace", skip(self, data))]
    async fn verify_data(
        &self,
        data: &[u8],
        inform: CmsForm,
    ) -> Result<Vec<u8>, CmsProviderError> {
        let signing = &self.config.signing;
        let mut command = Command::new(&signing.cms_executable);
        command
            .arg("cms")
            .arg("-verify")
            .arg("-certfile")
            .arg(&signing.certfile)
            .arg("-CAfile")
            .arg(&signing.ca_certs)
            .arg("-inform")
            .arg(inform.as_arg())
            .arg("-nosmimecap")
            .arg("-nodetach")
            .arg("-nocerts")
            .arg("-noattr");

        let output = self.communicate(command, data).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            debug!("cms verification stderr: {stderr}");
            return Err(CmsProviderError::Verification { stderr });
        }
        Ok(output.stdout)
    }
}

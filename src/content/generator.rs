//! Content identifier generation through a local hashing container.
//!
//! # Lifecycle
//! ```text
//! start():    docker run -d -p 127.0.0.1:<port>:3000 <image>
//!             → poll the port until it accepts connections (bounded)
//! cid_for_file(): POST /api/hashFile (multipart, field "myFile") → {hash}
//! shutdown() / Drop: docker kill + docker rm
//! ```
//!
//! The container is released on every exit path: `shutdown` does it
//! asynchronously, `Drop` falls back to a blocking `docker kill`/`rm`.

use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::process::Command;

use crate::content::ContentError;

/// Image serving the IPFS only-hash endpoint.
pub const GENERATOR_IMAGE: &str = "itsmonty/docker-ipfs-only-hash-v0p1";

/// Host port the container is published on.
pub const DEFAULT_PORT: u16 = 3030;

const CONTAINER_PORT: u16 = 3000;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct HashFileResponse {
    hash: String,
}

/// Running hashing container.
#[derive(Debug)]
pub struct CidGenerator {
    container_id: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl CidGenerator {
    /// Start the container and wait until it is ready.
    pub async fn start(port: u16, ready_timeout: Duration) -> Result<Self, ContentError> {
        tracing::info!(image = GENERATOR_IMAGE, port, "Starting CID generator container");

        let output = Command::new("docker")
            .args(run_args(port))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ContentError::Docker(format!("failed to invoke docker: {}", e)))?;

        if !output.status.success() {
            return Err(ContentError::Docker(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let generator = Self {
            container_id: Some(container_id),
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        };

        // On failure the generator is dropped here, which removes the container.
        wait_for_port(port, ready_timeout).await?;
        tracing::info!(port, "CID generator ready");
        Ok(generator)
    }

    /// Compute the CIDv0 of a file.
    pub async fn cid_for_file(&self, path: &Path) -> Result<String, ContentError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        let form = Form::new().part("myFile", Part::bytes(data).file_name(file_name));
        let response = self
            .client
            .post(format!("{}/api/hashFile", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let parsed: HashFileResponse = response.json().await?;
        tracing::debug!(path = %path.display(), cid = %parsed.hash, "CID computed");
        Ok(parsed.hash)
    }

    /// Stop and remove the container.
    pub async fn shutdown(mut self) -> Result<(), ContentError> {
        if let Some(id) = self.container_id.take() {
            for action in ["kill", "rm"] {
                let status = Command::new("docker")
                    .args([action, id.as_str()])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await?;
                if !status.success() {
                    tracing::warn!(container = %id, action, "docker command failed");
                }
            }
            tracing::info!(container = %id, "CID generator stopped");
        }
        Ok(())
    }
}

impl Drop for CidGenerator {
    fn drop(&mut self) {
        if let Some(id) = self.container_id.take() {
            for action in ["kill", "rm"] {
                let _ = StdCommand::new("docker")
                    .args([action, id.as_str()])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
            }
            tracing::debug!(container = %id, "CID generator released on drop");
        }
    }
}

fn run_args(port: u16) -> Vec<String> {
    vec![
        "run".to_string(),
        "-d".to_string(),
        "-p".to_string(),
        format!("127.0.0.1:{}:{}", port, CONTAINER_PORT),
        GENERATOR_IMAGE.to_string(),
    ]
}

async fn wait_for_port(port: u16, timeout: Duration) -> Result<(), ContentError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ContentError::NotReady { port, waited: timeout });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

//! Single-attempt HTTP fetch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::manifest::FetchTask;

/// Suffix of the temporary file a body is streamed into.
const PART_SUFFIX: &str = ".part";

/// Result of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 and the full body is on disk.
    Success { bytes: u64 },
    /// HTTP 429.
    RateLimited,
    /// Any other HTTP status; the server declined this file.
    ServerRejected(u16),
    /// Connection, timeout or body-transfer failure.
    TransportError(String),
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success { bytes } => write!(f, "success ({} bytes)", bytes),
            FetchOutcome::RateLimited => write!(f, "rate limited (HTTP 429)"),
            FetchOutcome::ServerRejected(code) => write!(f, "rejected (HTTP {})", code),
            FetchOutcome::TransportError(cause) => write!(f, "transport error: {}", cause),
        }
    }
}

/// Executes one download attempt for a task.
///
/// `Ok` carries every network-side outcome; `Err` is reserved for local
/// filesystem failures.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn attempt(&self, task: &FetchTask, destination: &Path) -> Result<FetchOutcome>;
}

/// Fetcher backed by a reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with a browser user agent and a per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Download(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Build from the `[http]` config section.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.http.user_agent, config.request_timeout())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn attempt(&self, task: &FetchTask, destination: &Path) -> Result<FetchOutcome> {
        tracing::debug!("GET {}", task.source_url);

        let response = match self.client.get(&task.source_url).send().await {
            Ok(response) => response,
            Err(e) => return Ok(FetchOutcome::TransportError(describe(&e))),
        };

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(FetchOutcome::RateLimited);
        }

        if status != StatusCode::OK {
            return Ok(FetchOutcome::ServerRejected(status.as_u16()));
        }

        let part = part_path(destination);
        let streamed = stream_to_file(response, &part).await;

        match streamed {
            Ok(Streamed::Complete(bytes)) => {
                tokio::fs::rename(&part, destination)
                    .await
                    .map_err(|e| Error::filesystem(destination, e))?;
                Ok(FetchOutcome::Success { bytes })
            }
            Ok(Streamed::Interrupted(cause)) => {
                let _ = tokio::fs::remove_file(&part).await;
                Ok(FetchOutcome::TransportError(cause))
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

/// How a body transfer ended.
enum Streamed {
    Complete(u64),
    Interrupted(String),
}

/// Stream a response body into `path`.
async fn stream_to_file(response: Response, path: &Path) -> Result<Streamed> {
    let expected = response.content_length();

    let mut file = File::create(path)
        .await
        .map_err(|e| Error::filesystem(path, e))?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Ok(Streamed::Interrupted(format!("Stream error: {}", describe(&e)))),
        };
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::filesystem(path, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| Error::filesystem(path, e))?;

    if let Some(expected) = expected {
        if written != expected {
            return Ok(Streamed::Interrupted(format!(
                "Short read: got {} of {} bytes",
                written, expected
            )));
        }
    }

    Ok(Streamed::Complete(written))
}

/// Temporary path a download is written to before being moved into place.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Human-readable cause for a reqwest error.
fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out ({})", error)
    } else if error.is_connect() {
        format!("connection failed ({})", error)
    } else {
        error.to_string()
    }
}

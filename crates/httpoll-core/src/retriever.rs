//! Bounded-retry HTTP retrieval.
//!
//! One [`Retriever::fetch`] call performs up to `max_retries + 1` GET
//! attempts against an endpoint, sleeping the backoff interval between
//! failed attempts. A non-200 status or any transport error counts as one
//! failed attempt; only the last observed cause is reported once retries
//! are exhausted.
//!
//! Body decoding is chunk-wise and honors two stop conditions: a
//! configurable byte limit, and the legacy end-of-transmission sentinel
//! (byte 0x04 as the first byte of a chunk), which truncates the body
//! exactly at the preceding chunk boundary. Several fielded devices
//! terminate their output this way, so the truncation point is a
//! compatibility requirement.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tracing::debug;

use crate::backoff::{BackoffPolicy, FixedDelay};
use crate::domain::{RawPayload, RetrievalError, TransportError};

/// "End of transmission" control code terminating device output.
const EOT: u8 = 0x04;

/// Upper bound on accumulated body bytes (1 MiB), matching the legacy
/// read limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP fetcher with bounded retry and injectable backoff.
pub struct Retriever {
    client: reqwest::Client,
    backoff: Arc<dyn BackoffPolicy>,
    max_body_bytes: usize,
}

impl Retriever {
    /// Create a retriever with default fixed one-second backoff.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("httpoll/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            backoff: Arc::new(FixedDelay::default()),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Substitute the backoff policy (tests collapse it to zero).
    pub fn with_backoff(mut self, backoff: Arc<dyn BackoffPolicy>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Fetch the endpoint body as text.
    ///
    /// Attempts the GET up to `max_retries + 1` times, each attempt
    /// bounded by `timeout_per_attempt`. Fails only after all attempts
    /// are exhausted, carrying the last observed cause.
    pub async fn fetch(
        &self,
        endpoint: &str,
        timeout_per_attempt: Duration,
        max_retries: u32,
    ) -> Result<RawPayload, RetrievalError> {
        let mut attempt = 0u32;
        loop {
            match self.attempt(endpoint, timeout_per_attempt).await {
                Ok(body) => return Ok(RawPayload::new(body, Utc::now())),
                Err(cause) => {
                    if attempt >= max_retries {
                        return Err(RetrievalError {
                            endpoint: endpoint.to_string(),
                            attempts: attempt + 1,
                            cause,
                        });
                    }
                    debug!(
                        endpoint,
                        attempt,
                        %cause,
                        "fetch attempt failed, backing off before retry"
                    );
                    tokio::time::sleep(self.backoff.delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One GET attempt. The response (and with it the connection) is
    /// released when this function returns, on every path.
    async fn attempt(
        &self,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let response = self
            .client
            .get(endpoint)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::Status {
                code: status.as_u16(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransportError::Transport(e.to_string()))?;
            if !push_chunk(&mut buf, &chunk, self.max_body_bytes) {
                break;
            }
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new()
    }
}

/// Append one chunk to the body buffer.
///
/// Returns `false` when accumulation must stop: the chunk opens with the
/// EOT sentinel (the chunk itself is discarded), or the byte limit is
/// already reached. A sentinel byte anywhere other than the first
/// position of a chunk is ordinary payload.
fn push_chunk(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    if chunk.first() == Some(&EOT) {
        return false;
    }
    let remaining = limit.saturating_sub(buf.len());
    if remaining == 0 {
        return false;
    }
    let take = chunk.len().min(remaining);
    buf.extend_from_slice(&chunk[..take]);
    true
}

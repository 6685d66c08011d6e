//! Report notification dispatch for the attendance system.
//!
//! Posts the finalized session report as JSON to a configured webhook
//! (an email gateway in the original deployment). Exactly one attempt per
//! session; the caller treats failures as non-fatal.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use rollcall_core::{Notifier, SessionReport};

/// Default request timeout for dispatch calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Notifier errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The configured endpoint was invalid.
    #[error("invalid endpoint: {reason}")]
    InvalidEndpoint { reason: &'static str },
    /// Failed to build the HTTP client or runtime.
    #[error("failed to initialize notifier: {0}")]
    Init(String),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The endpoint returned an error response.
    #[error("endpoint error: status {status}: {body}")]
    Api { status: u16, body: String },
}

/// Webhook dispatch client.
///
/// # Thread Safety
///
/// Safe to clone and share across threads; clones share the underlying
/// HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    recipient: &'a str,
    report: &'a SessionReport,
}

impl Client {
    /// Creates a client for the given webhook endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or not an HTTP(S) URL,
    /// or if the HTTP client fails to build.
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>) -> Result<Self, NotifyError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(NotifyError::InvalidEndpoint {
                reason: "endpoint cannot be empty",
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(NotifyError::InvalidEndpoint {
                reason: "endpoint must be an http(s) URL",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Init(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            auth_token,
        })
    }

    /// Posts the report to the endpoint.
    pub async fn send_report(
        &self,
        report: &SessionReport,
        recipient: &str,
    ) -> Result<(), NotifyError> {
        let body = DispatchBody { recipient, report };
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(recipient, date = %report.session_date, "report posted");
        Ok(())
    }
}

/// Synchronous wrapper for the session flow.
///
/// Owns a current-thread tokio runtime so the blocking session pipeline
/// can drive the async client through the core [`Notifier`] trait.
#[derive(Debug)]
pub struct BlockingNotifier {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl BlockingNotifier {
    pub fn new(endpoint: impl Into<String>, auth_token: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::new(endpoint, auth_token)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| NotifyError::Init(e.to_string()))?;
        Ok(Self { client, runtime })
    }
}

impl Notifier for BlockingNotifier {
    type Error = NotifyError;

    fn send(&mut self, report: &SessionReport, recipient: &str) -> Result<(), Self::Error> {
        self.runtime.block_on(self.client.send_report(report, recipient))
    }
}

//! Bounded-time JSON requests against the reader service.
//!
//! [`TimedRequest`] issues one GET, enforces a single deadline across both
//! the response headers and the body, and reports every failure as exactly
//! one of:
//!
//! * `Error::Timeout`: the deadline elapsed (before the response, or while
//!   reading the body),
//! * `Error::Network`: the transport failed for any other reason,
//! * `Error::Status`: the service answered with a non-2xx status,
//! * `Error::Decode`: the body was not the expected JSON shape.
//!
//! Callers never need to inspect transport errors themselves.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use scl_domain::error::{body_excerpt, Error, Result};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

/// Single-shot GET executor. Cheap to clone; the inner `reqwest::Client`
/// keeps a connection pool.
#[derive(Debug, Clone)]
pub struct TimedRequest {
    http: Client,
}

impl TimedRequest {
    pub fn new() -> Result<Self> {
        let http = Client::builder().build().map_err(from_reqwest)?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// GET `url` and parse the body as `T`.
    ///
    /// `timeout = None` enforces no deadline. `Some(Duration::ZERO)` is an
    /// already-expired deadline and fails with `Error::Timeout` without
    /// touching the network.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let start = Instant::now();

        let resp = within(deadline, url, self.http.get(url).send())
            .await?
            .map_err(from_reqwest)?;
        let status = resp.status();

        let body = within(deadline, url, resp.text())
            .await?
            .map_err(from_reqwest)?;

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "reader service call"
        );

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Decode(format!("{url}: {e}: {}", body_excerpt(&body))))
    }
}

/// Run `fut` against an optional deadline.
///
/// The deadline is checked before polling so that an expired deadline
/// never races a fast response.
async fn within<F: Future>(deadline: Option<Instant>, url: &str, fut: F) -> Result<F::Output> {
    let Some(deadline) = deadline else {
        return Ok(fut.await);
    };
    if Instant::now() >= deadline {
        return Err(Error::Timeout(format!("{url}: deadline elapsed")));
    }
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| Error::Timeout(format!("{url}: deadline elapsed")))
}

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Network`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

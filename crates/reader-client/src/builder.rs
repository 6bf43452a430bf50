//! Builder pattern for constructing a [`ReaderClient`].

use std::sync::Arc;
use std::time::Duration;

use scl_domain::card::CardRecord;
use scl_domain::config::ReaderConfig;
use scl_domain::error::Result;

use crate::channel::{ChannelHooks, LiveChannel};
use crate::client::ReaderClient;
use crate::endpoint::ServiceEndpoint;
use crate::events::ChannelEvent;
use crate::http::TimedRequest;
use crate::query::{QueryClient, DEFAULT_CARD_LIST_TIMEOUT, DEFAULT_VERSION_TIMEOUT};
use crate::retry::{ReconnectPacing, RetryPolicy, MIN_RETRY_SPACING};

/// Fluent builder for [`ReaderClient`].
///
/// # Example
///
/// ```rust,no_run
/// # use scl_client::ReaderClientBuilder;
/// let client = ReaderClientBuilder::new()
///     .base_url("http://127.0.0.1:12345")
///     .on_update(|cards| {
///         println!("{} card(s) inserted", cards.len());
///         Ok(())
///     })
///     .retry_policy(|attempt: u32| attempt <= 10)
///     .build()
///     .unwrap();
/// ```
pub struct ReaderClientBuilder {
    base_url: String,
    version_timeout: Option<Duration>,
    card_list_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    min_retry_spacing: Duration,
    http: Option<reqwest::Client>,
    hooks: ChannelHooks,
}

impl ReaderClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:12345".into(),
            version_timeout: Some(DEFAULT_VERSION_TIMEOUT),
            card_list_timeout: Some(DEFAULT_CARD_LIST_TIMEOUT),
            connect_timeout: Some(Duration::from_secs(10)),
            min_retry_spacing: MIN_RETRY_SPACING,
            http: None,
            hooks: ChannelHooks::default(),
        }
    }

    /// Start from a loaded [`ReaderConfig`].
    pub fn from_config(cfg: &ReaderConfig) -> Self {
        Self::new()
            .base_url(&cfg.base_url)
            .version_timeout(Some(cfg.version_timeout()))
            .card_list_timeout(Some(cfg.card_list_timeout()))
            .connect_timeout(Some(cfg.connect_timeout()))
            .min_retry_spacing(cfg.min_retry_spacing())
    }

    // ── Service ──────────────────────────────────────────────────────

    /// Set the reader service base URL (`http://` or `https://`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use a preconfigured `reqwest::Client` (proxies, TLS roots, ...).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    // ── Deadlines ────────────────────────────────────────────────────

    /// Default deadline for `version()`. `None` disables it.
    pub fn version_timeout(mut self, t: Option<Duration>) -> Self {
        self.version_timeout = t;
        self
    }

    /// Default deadline for `card_list()`. `None` disables it.
    pub fn card_list_timeout(mut self, t: Option<Duration>) -> Self {
        self.card_list_timeout = t;
        self
    }

    /// Deadline for each live-update connect. `None` disables it.
    pub fn connect_timeout(mut self, t: Option<Duration>) -> Self {
        self.connect_timeout = t;
        self
    }

    /// Raise the spacing between reconnect attempts (floor: 1s).
    pub fn min_retry_spacing(mut self, d: Duration) -> Self {
        self.min_retry_spacing = d;
        self
    }

    // ── Hooks ────────────────────────────────────────────────────────

    /// Called with the full card list on every push.
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<CardRecord>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on_update = Some(Arc::new(f));
        self
    }

    /// Consulted before every reconnect attempt.
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.hooks.retry_policy = Some(Arc::new(policy));
        self
    }

    /// Receives every [`ChannelEvent`] in addition to the `tracing` log.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.hooks.on_event = Some(Arc::new(f));
        self
    }

    /// Build the [`ReaderClient`].
    pub fn build(self) -> Result<ReaderClient> {
        let endpoint = Arc::new(ServiceEndpoint::new(&self.base_url)?);

        let exec = match self.http {
            Some(http) => TimedRequest::with_client(http),
            None => TimedRequest::new()?,
        };
        let query = QueryClient::new(exec, endpoint.clone())
            .with_timeouts(self.version_timeout, self.card_list_timeout);

        let channel = LiveChannel::new(
            endpoint,
            self.hooks,
            self.connect_timeout,
            ReconnectPacing::new(self.min_retry_spacing),
        );

        Ok(ReaderClient::from_parts(query, channel))
    }
}

impl Default for ReaderClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

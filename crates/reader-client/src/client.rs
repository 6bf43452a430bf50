//! [`ReaderClient`]: queries and the live-update channel behind one handle.

use std::time::Duration;

use scl_domain::card::{CardRecord, VersionInfo};
use scl_domain::error::Result;
use tokio::sync::watch;

use crate::channel::{ConnectionState, LiveChannel};
use crate::endpoint::ServiceEndpoint;
use crate::query::QueryClient;

/// Client for one reader service.
///
/// Create via [`ReaderClientBuilder`](crate::builder::ReaderClientBuilder).
/// Cheap to clone; clones share the same live-update channel.
#[derive(Clone)]
pub struct ReaderClient {
    query: QueryClient,
    channel: LiveChannel,
}

impl ReaderClient {
    /// Start a new builder.
    pub fn builder() -> crate::builder::ReaderClientBuilder {
        crate::builder::ReaderClientBuilder::new()
    }

    pub(crate) fn from_parts(query: QueryClient, channel: LiveChannel) -> Self {
        Self { query, channel }
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        self.query.endpoint()
    }

    pub fn query(&self) -> &QueryClient {
        &self.query
    }

    pub fn channel(&self) -> &LiveChannel {
        &self.channel
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn version(&self) -> Result<VersionInfo> {
        self.query.version().await
    }

    pub async fn version_within(&self, timeout: Option<Duration>) -> Result<VersionInfo> {
        self.query.version_within(timeout).await
    }

    pub async fn card_list(&self) -> Result<Vec<CardRecord>> {
        self.query.card_list().await
    }

    pub async fn card_list_within(&self, timeout: Option<Duration>) -> Result<Vec<CardRecord>> {
        self.query.card_list_within(timeout).await
    }

    // ── Live updates ─────────────────────────────────────────────────

    /// See [`LiveChannel::open`].
    pub async fn open(&self, interval: Option<f64>) -> Result<()> {
        self.channel.open(interval).await
    }

    pub fn close(&self) {
        self.channel.close();
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_running()
    }

    /// See [`LiveChannel::set_interval`].
    pub fn set_interval(&self, interval: Option<f64>) -> bool {
        self.channel.set_interval(interval)
    }

    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.channel.state_receiver()
    }
}

//! Read-only queries: service version and the current card list.

use std::sync::Arc;
use std::time::Duration;

use scl_domain::card::{reshape_cards, CardRecord, VersionInfo, WireCard};
use scl_domain::error::Result;

use crate::endpoint::ServiceEndpoint;
use crate::http::TimedRequest;

pub const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_CARD_LIST_TIMEOUT: Duration = Duration::from_millis(15000);

/// Stateless query client. Safe to clone and call concurrently.
#[derive(Debug, Clone)]
pub struct QueryClient {
    exec: TimedRequest,
    endpoint: Arc<ServiceEndpoint>,
    version_timeout: Option<Duration>,
    card_list_timeout: Option<Duration>,
}

impl QueryClient {
    pub fn new(exec: TimedRequest, endpoint: Arc<ServiceEndpoint>) -> Self {
        Self {
            exec,
            endpoint,
            version_timeout: Some(DEFAULT_VERSION_TIMEOUT),
            card_list_timeout: Some(DEFAULT_CARD_LIST_TIMEOUT),
        }
    }

    pub fn with_timeouts(
        mut self,
        version_timeout: Option<Duration>,
        card_list_timeout: Option<Duration>,
    ) -> Self {
        self.version_timeout = version_timeout;
        self.card_list_timeout = card_list_timeout;
        self
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// GET /version with the configured timeout (5s unless overridden).
    pub async fn version(&self) -> Result<VersionInfo> {
        self.version_within(self.version_timeout).await
    }

    pub async fn version_within(&self, timeout: Option<Duration>) -> Result<VersionInfo> {
        self.exec
            .get_json(self.endpoint.version_url(), timeout)
            .await
    }

    /// GET / with the configured timeout (15s unless overridden).
    pub async fn card_list(&self) -> Result<Vec<CardRecord>> {
        self.card_list_within(self.card_list_timeout).await
    }

    /// Cards come back in wire order; nothing is filtered or sorted.
    pub async fn card_list_within(&self, timeout: Option<Duration>) -> Result<Vec<CardRecord>> {
        let wire: Vec<WireCard> = self
            .exec
            .get_json(self.endpoint.card_list_url(), timeout)
            .await?;
        reshape_cards(wire)
    }
}

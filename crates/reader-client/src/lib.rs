//! `scl-client`: client SDK for a local smart-card reader service.
//!
//! The service answers two HTTP queries and pushes card-list snapshots
//! over a WebSocket. This crate wraps both:
//!
//! * [`QueryClient`]: `GET /version` and `GET /` through a bounded-time
//!   executor ([`TimedRequest`]) that tells timeouts apart from unreachable
//!   hosts.
//! * [`LiveChannel`]: one long-lived `/ws` connection with an explicit
//!   reconnect state machine, a caller [`RetryPolicy`] veto, and at least
//!   one second between reconnect attempts.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use scl_client::ReaderClientBuilder;
//!
//! # async fn example() -> scl_domain::Result<()> {
//! let client = ReaderClientBuilder::new()
//!     .base_url("http://127.0.0.1:12345")
//!     .on_update(|cards| {
//!         for card in &cards {
//!             println!("{}: {}", card.reader_name, card.full_name);
//!         }
//!         Ok(())
//!     })
//!     .build()?;
//!
//! println!("service {}", client.version().await?.text);
//! client.open(Some(3.0)).await?;
//! # client.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Transport failures are `Error::Network`, deadlines are `Error::Timeout`
//! (`is_network()` is true for both). A non-2xx answer is `Error::Status`,
//! which is deliberately not a network error: the service was reached.

pub mod builder;
pub mod channel;
pub mod client;
pub mod endpoint;
pub mod events;
pub mod http;
pub mod query;
pub mod retry;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::ReaderClientBuilder;
pub use channel::{ChannelHooks, ConnectionState, LiveChannel, UpdateCallback};
pub use client::ReaderClient;
pub use endpoint::{clamp_interval, ServiceEndpoint};
pub use events::{ChannelEvent, EventHook};
pub use http::{from_reqwest, TimedRequest};
pub use query::QueryClient;
pub use retry::{ReconnectPacing, RetryPolicy, MIN_RETRY_SPACING};

// Re-export domain types so callers never need to import scl-domain directly.
pub use scl_domain::{CardRecord, Error, Result, Sex, VersionInfo};

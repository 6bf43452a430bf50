use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::Serialize;

/// Everything the live-update channel reports about itself.
///
/// Each event is logged through `tracing` by [`ChannelEvent::emit`] and,
/// when the owner registered one, handed to an [`EventHook`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    Connected {
        url: String,
    },
    Disconnected {
        reason: String,
    },
    ReconnectAttempt {
        attempt: u32,
        url: String,
    },
    ReconnectFailed {
        attempt: u32,
        error: String,
    },
    RetryVetoed {
        attempt: u32,
    },
    RetryPolicyFailed {
        attempt: u32,
        error: String,
    },
    UpdateCallbackFailed {
        error: String,
    },
    MalformedMessage {
        error: String,
    },
    IntervalChanged {
        interval: Option<u32>,
    },
    Closed,
}

/// Observer for [`ChannelEvent`]s, configured when the client is built.
pub type EventHook = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

impl ChannelEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            ChannelEvent::ReconnectFailed { .. }
            | ChannelEvent::RetryPolicyFailed { .. }
            | ChannelEvent::UpdateCallbackFailed { .. }
            | ChannelEvent::MalformedMessage { .. } => {
                tracing::warn!(channel_event = %json, "scl_event");
            }
            ChannelEvent::ReconnectAttempt { .. } | ChannelEvent::IntervalChanged { .. } => {
                tracing::debug!(channel_event = %json, "scl_event");
            }
            _ => tracing::info!(channel_event = %json, "scl_event"),
        }
    }

    /// Log the event, then pass it to `hook`. A panicking hook is logged
    /// and otherwise ignored.
    pub(crate) fn dispatch(self, hook: Option<&EventHook>) {
        self.emit();
        if let Some(hook) = hook {
            if std::panic::catch_unwind(AssertUnwindSafe(|| hook(&self))).is_err() {
                tracing::error!(event = ?self, "event hook panicked");
            }
        }
    }
}

/// Shared error type used across all smart-card link crates.
///
/// `Network` and `Timeout` form the transport taxonomy: every failure to
/// reach the reader service, or to finish talking to it in time, is one of
/// the two. `Timeout` is the narrower kind, see [`Error::is_network`].
///
/// `Status` is intentionally outside that taxonomy. The service was reached
/// and answered, it just answered with a failure status.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("network: {0}")]
    Network(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode: {0}")]
    Decode(String),

    #[error("channel closed")]
    Closed,

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// True for transport-level failures, including timeouts.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }

    /// True only when a deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Longest slice of a response body quoted in an error message.
pub const MAX_BODY_EXCERPT: usize = 256;

/// Shorten a response body for an error message, respecting UTF-8 boundaries.
pub fn body_excerpt(body: &str) -> String {
    if body.len() <= MAX_BODY_EXCERPT {
        return body.to_owned();
    }
    let mut end = MAX_BODY_EXCERPT;
    while !body.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

//! Addresses of the reader service, derived once from its base URL.

use scl_domain::error::{Error, Result};

/// The reader service's base address plus the three addresses derived
/// from it. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    base_url: String,
    version_url: String,
    card_list_url: String,
    live_url: String,
}

impl ServiceEndpoint {
    /// Derive all addresses from `base_url` (`http://` or `https://`).
    ///
    /// The live-update address uses `ws://` for a plain base and `wss://`
    /// for a secure one.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Config("base_url is required".into()));
        }

        let live_base = if let Some(rest) = base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got {base_url}"
            )));
        };

        Ok(Self {
            version_url: format!("{base_url}/version"),
            card_list_url: format!("{base_url}/"),
            live_url: format!("{live_base}/ws"),
            base_url: base_url.to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    pub fn card_list_url(&self) -> &str {
        &self.card_list_url
    }

    /// Live-update address with the push interval appended when one is set.
    pub fn live_url(&self, interval: Option<u32>) -> String {
        match interval {
            Some(secs) => format!("{}?interval={secs}", self.live_url),
            None => self.live_url.clone(),
        }
    }
}

/// Clamp a caller-supplied interval (seconds) to a non-negative whole number.
///
/// Negative values and NaN become `0`; fractions are floored.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_interval(secs: f64) -> u32 {
    // `as` saturates, and NaN.max(0.0) is 0.0.
    secs.max(0.0).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_plain_addresses() {
        let ep = ServiceEndpoint::new("http://127.0.0.1:12345").unwrap();
        assert_eq!(ep.version_url(), "http://127.0.0.1:12345/version");
        assert_eq!(ep.card_list_url(), "http://127.0.0.1:12345/");
        assert_eq!(ep.live_url(None), "ws://127.0.0.1:12345/ws");
    }

    #[test]
    fn secure_base_upgrades_to_wss() {
        let ep = ServiceEndpoint::new("https://reader.local:8443").unwrap();
        assert_eq!(ep.live_url(None), "wss://reader.local:8443/ws");
        assert_eq!(ep.version_url(), "https://reader.local:8443/version");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let ep = ServiceEndpoint::new("http://localhost:12345/").unwrap();
        assert_eq!(ep.base_url(), "http://localhost:12345");
        assert_eq!(ep.card_list_url(), "http://localhost:12345/");
    }

    #[test]
    fn path_prefix_is_kept() {
        let ep = ServiceEndpoint::new("http://gw.local/reader").unwrap();
        assert_eq!(ep.version_url(), "http://gw.local/reader/version");
        assert_eq!(ep.live_url(Some(5)), "ws://gw.local/reader/ws?interval=5");
    }

    #[test]
    fn interval_becomes_query_param() {
        let ep = ServiceEndpoint::new("http://127.0.0.1:12345").unwrap();
        assert_eq!(ep.live_url(Some(0)), "ws://127.0.0.1:12345/ws?interval=0");
        assert_eq!(ep.live_url(Some(3)), "ws://127.0.0.1:12345/ws?interval=3");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            ServiceEndpoint::new("ftp://127.0.0.1"),
            Err(Error::Config(_))
        ));
        assert!(matches!(ServiceEndpoint::new("  "), Err(Error::Config(_))));
    }

    #[test]
    fn clamp_floors_and_rejects_negatives() {
        assert_eq!(clamp_interval(-5.0), 0);
        assert_eq!(clamp_interval(2.9), 2);
        assert_eq!(clamp_interval(0.0), 0);
        assert_eq!(clamp_interval(7.0), 7);
        assert_eq!(clamp_interval(f64::NAN), 0);
        assert_eq!(clamp_interval(1e12), u32::MAX);
    }
}

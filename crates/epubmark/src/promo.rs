//! Promotional insert content.
//!
//! The promo chapter's content comes from an external JSON endpoint. Every
//! failure mode (network, status, payload shape) is a "no promo" outcome;
//! a book must never fail to build because a promo server is down.

use serde_json::Value;

/// Default promo endpoint, overridable from the command line.
pub const DEFAULT_PROMO_URL: &str = "https://knihomol.org/promo.json";

/// Source of promo chapter content.
pub trait PromoSource {
    /// A finished markdown document, or `None` when there is nothing to
    /// insert.
    fn fetch(&self) -> Option<String>;
}

/// Disabled promo fetching.
pub struct NoPromo;

impl PromoSource for NoPromo {
    fn fetch(&self) -> Option<String> {
        None
    }
}

/// Fetches promo data over HTTPS.
pub struct HttpPromoSource {
    url: String,
}

impl HttpPromoSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PromoSource for HttpPromoSource {
    fn fetch(&self) -> Option<String> {
        let payload: Value = match ureq::get(&self.url).call() {
            Ok(response) => match response.into_json() {
                Ok(payload) => payload,
                Err(err) => {
                    log::warn!("promo payload from {} is not JSON: {}", self.url, err);
                    return None;
                }
            },
            Err(err) => {
                log::warn!("promo fetch from {} failed: {}", self.url, err);
                return None;
            }
        };
        render_promo(&payload)
    }
}

/// Turn a promo payload into a front-matter-only markdown document. Payloads
/// without a `publisher` key are considered empty.
pub fn render_promo(payload: &Value) -> Option<String> {
    if payload.get("publisher").is_none() {
        log::warn!("promo payload has no publisher, skipping");
        return None;
    }
    let yaml = serde_yaml::to_string(payload).ok()?;
    Some(format!("---\n{}---\n", yaml))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_render_promo() {
        let payload = json!({"publisher": "Knihomol", "link": "https://example.com"});
        let text = render_promo(&payload).unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("publisher: Knihomol"));
        assert!(text.ends_with("---\n"));
    }

    #[test]
    fn test_render_promo_without_publisher() {
        assert_eq!(render_promo(&json!({"other": 1})), None);
    }

    #[test]
    fn test_no_promo() {
        assert_eq!(NoPromo.fetch(), None);
    }
}

//! affipress HTTP reachability adapter.
//!
//! Implements [`pipeline::ReachabilityProbe`] with a plain `GET`. Used by the
//! setup checklist to confirm that the site root, `sitemap.xml` and
//! `robots.txt` are publicly served.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** A probe never fails: transport errors are folded into
//! the returned [`ProbeResult`] so that one unreachable URL only fails its own
//! checklist item.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use pipeline::{ProbeResult, ReachabilityProbe};

const USER_AGENT: &str = concat!("affipress/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
#[error("Failed to build HTTP client: {0}")]
pub struct ProbeError(String);

/// Classifies a transport error for the result detail.
fn error_kind(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_builder() {
        "invalid url"
    } else if err.is_redirect() {
        "redirect"
    } else {
        "request"
    }
}

#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout_secs: u64) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProbeError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self, url: &str) -> ProbeResult {
        let result = match self.client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                ProbeResult {
                    url: url.to_string(),
                    reachable: status.as_u16() < 400,
                    detail: format!("HTTP {}", status.as_u16()),
                }
            }
            Err(err) => ProbeResult {
                url: url.to_string(),
                reachable: false,
                detail: format!("error: {}", error_kind(&err)),
            },
        };
        debug!(url, reachable = result.reachable, detail = %result.detail, "Probed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_is_unreachable() {
        let probe = HttpProbe::new(2).unwrap();
        let result = probe.check("not a url").await;
        assert!(!result.reachable);
        assert!(result.detail.starts_with("error: "));
        assert_eq!(result.url, "not a url");
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let probe = HttpProbe::new(2).unwrap();
        let result = probe.check("http://127.0.0.1:9/robots.txt").await;
        assert!(!result.reachable);
        assert!(result.detail.starts_with("error: "));
    }
}

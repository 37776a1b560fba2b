// src/core/scanner/probe.rs

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::models::{FetchOutcome, ProbeOutcome, TargetDescriptor};

/// Primary location defined by RFC 9116.
pub const WELL_KNOWN_PATH: &str = "/.well-known/security.txt";
/// Legacy location at the web root, tried only when the primary one fails.
pub const LEGACY_PATH: &str = "/security.txt";
/// Largest body accepted as a security.txt file. Bigger responses count as failed fetches.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Candidate URLs for a target, in the order they must be tried.
pub fn candidate_urls(target: &TargetDescriptor) -> [String; 2] {
    let base = target.to_url();
    [format!("{}{}", base, WELL_KNOWN_PATH), format!("{}{}", base, LEGACY_PATH)]
}

/// Fetches security.txt candidates for a target, stopping at the first 200.
pub struct ProbeResolver {
    client: reqwest::Client,
}

impl ProbeResolver {
    /// Builds a resolver with its own HTTP client.
    ///
    /// # Arguments
    /// * `timeout` - Upper bound for each request, connection included.
    /// * `user_agent` - Value of the `User-Agent` header sent with every probe.
    ///
    /// # Returns
    /// The resolver, or the `reqwest` error raised while building the client.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Looks for the security.txt file of a target.
    ///
    /// The well-known URL is tried first and the legacy root URL second. The
    /// first 200 response wins. Failures of one candidate are logged and never
    /// stop the next one from being tried.
    ///
    /// # Arguments
    /// * `target` - The service to probe; its protocol is used as given.
    ///
    /// # Returns
    /// `ProbeOutcome::Found` with the body and the URL that served it, or
    /// `ProbeOutcome::NotFound` once both candidates failed.
    pub async fn resolve(&self, target: &TargetDescriptor) -> ProbeOutcome {
        for url in candidate_urls(target) {
            match self.fetch(&url).await {
                FetchOutcome::Success { url, body } => {
                    info!(url = %url, "Found security.txt.");
                    return ProbeOutcome::Found { source: url, body };
                }
                FetchOutcome::Status { url, status } => {
                    info!(url = %url, status, "Candidate did not return 200.");
                }
                FetchOutcome::Failed { url, reason } => {
                    warn!(url = %url, error = %reason, "Candidate request failed.");
                }
            }
        }
        info!(target = %target.to_url(), "security.txt not found.");
        ProbeOutcome::NotFound
    }

    /// Issues one GET with a plain-text content type hint and no retry.
    ///
    /// # Arguments
    /// * `url` - The candidate URL, parsed here so a malformed one is an outcome too.
    ///
    /// # Returns
    /// A `FetchOutcome`: `Success` only for status 200 with a readable body of
    /// at most `MAX_BODY_BYTES`, `Status` for any other status, `Failed` for
    /// everything that never produced a usable response.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        debug!(url, "Checking security.txt candidate.");

        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                return FetchOutcome::Failed { url: url.to_string(), reason: format!("Malformed URL: {}", e) };
            }
        };

        let response = match self
            .client
            .get(parsed)
            .header(CONTENT_TYPE, "text/plain")
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                return FetchOutcome::Failed { url: url.to_string(), reason: format!("HTTP request failed: {}", e) };
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return FetchOutcome::Status { url: url.to_string(), status: status.as_u16() };
        }

        match read_limited(response, MAX_BODY_BYTES).await {
            Ok(body) => {
                debug!(url, bytes = body.len(), "Read response body.");
                FetchOutcome::Success { url: url.to_string(), body }
            }
            Err(reason) => FetchOutcome::Failed { url: url.to_string(), reason },
        }
    }
}

/// Reads the body chunk by chunk and gives up as soon as it grows past `limit`.
async fn read_limited(mut response: reqwest::Response, limit: usize) -> Result<String, String> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(format!("Response body of {} bytes exceeds the {} byte limit", length, limit));
        }
    }

    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if body.len() + chunk.len() > limit {
                    return Err(format!("Response body exceeds the {} byte limit", limit));
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return Err(format!("Failed to read response body: {}", e)),
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Protocol;

    #[test]
    fn well_known_path_comes_first() {
        let target = TargetDescriptor::new(Protocol::Https, "a.example", "443").unwrap();
        assert_eq!(
            candidate_urls(&target),
            [
                "https://a.example:443/.well-known/security.txt".to_string(),
                "https://a.example:443/security.txt".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_url_is_an_outcome_not_an_error() {
        let resolver = ProbeResolver::with_client(reqwest::Client::new());
        let outcome = resolver.fetch("https://exa mple:443/security.txt").await;
        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn malformed_target_resolves_to_not_found() {
        let target = TargetDescriptor::new(Protocol::Http, "bad host", "80").unwrap();
        let resolver = ProbeResolver::with_client(reqwest::Client::new());
        assert_eq!(resolver.resolve(&target).await, ProbeOutcome::NotFound);
    }
}

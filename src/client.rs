//! Outbound HTTP for the stage solvers
//!
//! Sites vary their markup by client class, so every page fetch names the
//! [`ClientProfile`] it presents. Delegate calls use a fixed service user agent.

use crate::config::ResolverConfig;
use crate::error::{Result, StageError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Browser identity presented to content hosts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientProfile {
    /// Desktop Chrome on Windows
    Desktop,
    /// Chrome on an Android phone
    Mobile,
}

const DESKTOP_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9,hi;q=0.8"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
    ("cache-control", "max-age=0"),
];

const MOBILE_HEADERS: &[(&str, &str)] = &[
    (
        "user-agent",
        "Mozilla/5.0 (Linux; Android 14; SM-S928B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Mobile Safari/537.36",
    ),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

impl ClientProfile {
    /// Header set for this profile
    pub fn headers(&self) -> HeaderMap {
        let pairs = match self {
            ClientProfile::Desktop => DESKTOP_HEADERS,
            ClientProfile::Mobile => MOBILE_HEADERS,
        };

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers
    }
}

/// Shared HTTP client plus the per-call limits from [`ResolverConfig`]
pub struct Fetcher {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl Fetcher {
    /// Build a fetcher; the underlying connection pool is shared by every solver call
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Resolver limits this fetcher was built with
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Fetch an HTML page with the given browser identity
    ///
    /// Any status other than 200 is a fetch error.
    pub async fn fetch_html(
        &self,
        url: &str,
        profile: ClientProfile,
    ) -> std::result::Result<String, StageError> {
        tracing::debug!(url = %url, ?profile, "fetching page");

        let response = self
            .client
            .get(url)
            .headers(profile.headers())
            .timeout(self.config.page_timeout)
            .send()
            .await
            .map_err(|e| StageError::from_reqwest(url, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(StageError::Fetch(format!(
                "cannot open page, status {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| StageError::Fetch(format!("failed to read page body: {}", e)))
    }

    /// Call a resolution delegate as `<endpoint>?url=<encoded link>` and decode its JSON
    pub async fn call_delegate<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        link: &str,
        timeout: Duration,
    ) -> std::result::Result<T, StageError> {
        let url = delegate_url(endpoint, link);
        tracing::debug!(endpoint = %endpoint, link = %link, "calling delegate");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.config.delegate_user_agent)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| StageError::from_reqwest(endpoint, e))?;

        if !response.status().is_success() {
            return Err(StageError::Fetch(format!(
                "delegate returned status {}",
                response.status().as_u16()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StageError::Upstream(format!("invalid delegate response: {}", e)))
    }
}

/// Append the link as a single percent-encoded `url` query parameter
pub(crate) fn delegate_url(endpoint: &str, link: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}url={}", endpoint, separator, urlencoding::encode(link))
}

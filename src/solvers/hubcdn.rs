//! Direct CDN solver (HubCDN)
//!
//! Landing pages carry `var reurl = "...?r=<base64>"`; the base64 payload is
//! the download page, which exposes the file as `a#vd` or a script redirect.
//! Links already under `/dl/` skip the landing page.

use super::html::{anchors, decode_entities};
use super::{DirectLink, StageResult};
use crate::client::{ClientProfile, Fetcher};
use crate::error::StageError;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static REURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"var reurl = "(.*?)""#).expect("reurl pattern"));

#[allow(clippy::expect_used)]
static LOCATION_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.location\.href\s*=\s*"(.*?)""#).expect("location pattern")
});

/// Resolve a HubCDN link to the file URL
pub async fn solve_hubcdn(fetcher: &Fetcher, url: &str) -> StageResult<DirectLink> {
    let mut target = url.to_string();

    if !url.contains("/dl/") {
        let landing = fetcher.fetch_html(url, ClientProfile::Mobile).await?;
        if let Some(decoded) = redirect_target(&landing)? {
            tracing::debug!(url = %url, target = %decoded, "decoded HubCDN redirect");
            target = decoded;
        }
    }

    let page = fetcher.fetch_html(&target, ClientProfile::Mobile).await?;
    find_file_link(&page)
        .map(DirectLink::plain)
        .ok_or_else(|| StageError::NotFound("Link id='vd' not found in HTML".to_string()))
}

/// Decode the `r` parameter of the landing page's `reurl`, if the page has one
pub fn redirect_target(html: &str) -> StageResult<Option<String>> {
    let Some(raw) = REURL.captures(html).and_then(|c| c.get(1)) else {
        return Ok(None);
    };

    let redirect = decode_entities(raw.as_str());
    let parsed = url::Url::parse(&redirect)
        .map_err(|e| StageError::NotFound(format!("invalid redirect URL: {}", e)))?;

    let Some(encoded) = parsed
        .query_pairs()
        .find(|(key, _)| key == "r")
        .map(|(_, value)| value.into_owned())
    else {
        return Ok(None);
    };

    decode_base64_url(&encoded).map(Some)
}

/// The file link: `a#vd` first, then a `window.location.href` assignment
pub fn find_file_link(html: &str) -> Option<String> {
    anchors(html)
        .into_iter()
        .find(|a| a.id.as_deref() == Some("vd"))
        .map(|a| a.href)
        .or_else(|| {
            LOCATION_ASSIGN
                .captures(html)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|link| !link.is_empty())
        })
}

fn decode_base64_url(encoded: &str) -> StageResult<String> {
    let trimmed = encoded.trim().trim_end_matches('=');
    let padded = format!("{}{}", trimmed, "=".repeat((4 - trimmed.len() % 4) % 4));

    let bytes = STANDARD
        .decode(&padded)
        .or_else(|_| URL_SAFE.decode(&padded))
        .map_err(|e| StageError::NotFound(format!("undecodable redirect payload: {}", e)))?;

    String::from_utf8(bytes)
        .map(|s| s.trim().to_string())
        .map_err(|_| StageError::NotFound("redirect payload is not UTF-8".to_string()))
}

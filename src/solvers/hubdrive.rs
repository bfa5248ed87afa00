//! HubDrive extractor

use super::html::anchors;
use super::{Hop, StageResult};
use crate::client::{ClientProfile, Fetcher};
use crate::error::StageError;

/// Fetch a HubDrive file page and return the link it forwards to
pub async fn extract_hubdrive(fetcher: &Fetcher, url: &str) -> StageResult<Hop> {
    let html = fetcher.fetch_html(url, ClientProfile::Desktop).await?;
    find_target(&html).ok_or_else(|| {
        StageError::NotFound("download link not found on HubDrive page".to_string())
    })
}

/// Preference order: the green HubCloud button, the `#dl` button, then any
/// hubcloud/hubcdn anchor.
pub fn find_target(html: &str) -> Option<Hop> {
    let links = anchors(html);

    let hop = |href: &str, source: &str| Hop {
        link: href.to_string(),
        source: source.to_string(),
    };

    if let Some(a) = links
        .iter()
        .find(|a| a.has_class("btn-success") && a.href_contains("hubcloud"))
    {
        return Some(hop(&a.href, "HubDrive (Success Button)"));
    }

    if let Some(a) = links.iter().find(|a| a.id.as_deref() == Some("dl")) {
        return Some(hop(&a.href, "HubDrive (#dl)"));
    }

    links
        .iter()
        .find(|a| a.href_contains("hubcloud") || a.href_contains("hubcdn"))
        .map(|a| hop(&a.href, "HubDrive (Generic)"))
}

//! HBLinks extractor
//!
//! HBLinks pages list mirrors for one release. The first anchor pointing at a
//! known downstream host wins, checked tier by tier: HubCloud TLDs, then
//! HubDrive TLDs, then any hubcloud/hubdrive link at all.

use super::html::{Anchor, anchors};
use super::{Hop, StageResult};
use crate::client::{ClientProfile, Fetcher};
use crate::error::StageError;

const HUBCLOUD_TLDS: &[&str] = &[
    ".foo", ".fans", ".dev", ".cloud", ".icu", ".lol", ".art", ".in", ".store",
];

const HUBDRIVE_TLDS: &[&str] = &[".space", ".pro", ".in"];

/// Fetch an HBLinks page and return the best downstream link on it
pub async fn extract_hblinks(fetcher: &Fetcher, url: &str) -> StageResult<Hop> {
    let html = fetcher.fetch_html(url, ClientProfile::Desktop).await?;
    find_target(&html).ok_or_else(|| StageError::NotFound("Not Found".to_string()))
}

/// Pick the downstream link from an already-fetched page
pub fn find_target(html: &str) -> Option<Hop> {
    let links = anchors(html);

    let tiered = [("hubcloud", "HubCloud", HUBCLOUD_TLDS, 1), ("hubdrive", "HubDrive", HUBDRIVE_TLDS, 2)];
    for (host, label, tlds, priority) in tiered {
        for tld in tlds {
            let needle = format!("{}{}", host, tld);
            if let Some(found) = first_containing(&links, &needle) {
                return Some(Hop {
                    link: found.href.clone(),
                    source: format!("{}{} (Priority {})", label, tld, priority),
                });
            }
        }
    }

    links
        .iter()
        .find(|a| a.href_contains("hubcloud") || a.href_contains("hubdrive"))
        .map(|a| Hop {
            link: a.href.clone(),
            source: "HubCloud/HubDrive (Generic)".to_string(),
        })
}

fn first_containing<'a>(links: &'a [Anchor], needle: &str) -> Option<&'a Anchor> {
    links.iter().find(|a| a.href_contains(needle))
}

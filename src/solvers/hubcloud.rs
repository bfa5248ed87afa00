//! Direct-link resolver for HubCloud hosts
//!
//! HubCloud sits behind a challenge page, so resolution is delegated to an
//! external service. Its answer names the best button and lists every
//! alternative; both are passed on because consumers display them.

use super::{DirectLink, StageResult, is_success};
use crate::client::Fetcher;
use crate::error::StageError;
use crate::types::AltButton;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DirectResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    best_button_name: Option<String>,
    #[serde(default)]
    best_download_link: Option<String>,
    #[serde(default)]
    all_available_buttons: Option<Vec<AltButton>>,
    #[serde(default)]
    message: Option<String>,
}

/// Resolve a final-tier link through the direct-link service
pub async fn resolve_direct(fetcher: &Fetcher, url: &str) -> StageResult<DirectLink> {
    let config = fetcher.config();
    let response: DirectResponse = fetcher
        .call_delegate(&config.direct_endpoint, url, config.direct_timeout)
        .await?;

    let best = response
        .best_download_link
        .filter(|link| !link.trim().is_empty());

    match best {
        Some(link) if is_success(&response.status) => {
            tracing::debug!(
                url = %url,
                button = response.best_button_name.as_deref().unwrap_or("-"),
                "direct link resolved"
            );
            Ok(DirectLink {
                link,
                label: response.best_button_name.filter(|n| !n.is_empty()),
                buttons: response.all_available_buttons.unwrap_or_default(),
            })
        }
        _ => Err(StageError::Upstream(response.message.unwrap_or_else(|| {
            "no download link from API".to_string()
        }))),
    }
}

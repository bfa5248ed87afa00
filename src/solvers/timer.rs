//! Redirect-timer decoder
//!
//! Ad-wait pages hide the next link behind a countdown. An external decoding
//! service returns `{status, extracted_link, message}` for a given page.

use super::{Hop, StageResult, is_success};
use crate::client::Fetcher;
use crate::error::StageError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TimerResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    extracted_link: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Ask the timer service for the link behind a wait page
pub async fn decode_timer(fetcher: &Fetcher, url: &str) -> StageResult<Hop> {
    let config = fetcher.config();
    let response: TimerResponse = fetcher
        .call_delegate(&config.timer_endpoint, url, config.timer_timeout)
        .await?;

    if !is_success(&response.status) {
        return Err(StageError::Upstream(response.message.unwrap_or_else(|| {
            "timer service returned failure status".to_string()
        })));
    }

    match response.extracted_link {
        Some(link) if !link.trim().is_empty() => Ok(Hop {
            link: link.trim().to_string(),
            source: "Timer".to_string(),
        }),
        _ => Err(StageError::Upstream(
            "timer service returned no link".to_string(),
        )),
    }
}

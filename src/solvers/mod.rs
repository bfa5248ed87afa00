//! Stage solvers
//!
//! One solver per bypass layer. Each takes the current link, performs its own
//! fetch through the shared [`Fetcher`](crate::client::Fetcher) and returns
//! either the next hop, a direct link, or a [`StageError`]. Solvers hold no
//! state between calls.
//!
//! - [`timer`] - redirect-timer decoder (external service)
//! - [`hblinks`] - two-hop extractor for HBLinks pages
//! - [`hubdrive`] - two-hop extractor for HubDrive pages
//! - [`hubcloud`] - direct-link resolver (external service)
//! - [`hubcdn`] - single-hop direct CDN solver

pub mod hblinks;
pub mod html;
pub mod hubcdn;
pub mod hubcloud;
pub mod hubdrive;
pub mod timer;

use crate::error::StageError;
use crate::types::AltButton;

/// Result type for a single stage invocation
pub type StageResult<T> = std::result::Result<T, StageError>;

/// A stage advanced the link by one layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    /// The link to continue with
    pub link: String,
    /// Which rule produced it (e.g. "HubCloud.foo (Priority 1)")
    pub source: String,
}

/// A stage produced the terminal direct link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectLink {
    /// The direct download URL
    pub link: String,
    /// Label of the chosen button, when the stage reports one
    pub label: Option<String>,
    /// Alternative buttons offered alongside the chosen link
    pub buttons: Vec<AltButton>,
}

impl DirectLink {
    /// A direct link with no button metadata
    pub fn plain(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            label: None,
            buttons: Vec::new(),
        }
    }
}

/// Status field shared by the delegate JSON payloads
pub(crate) fn is_success(status: &str) -> bool {
    status.eq_ignore_ascii_case("success")
}

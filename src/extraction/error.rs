//! Failure taxonomy for a single extraction call.
//!
//! Browser and DOM problems are reclassified into one of these kinds at the
//! extraction boundary; the HTTP layer maps each kind to a fixed status code
//! and message (see `crate::error`).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The recording link is no longer accessible.
    #[error("access to this call recording has expired")]
    Expired,

    /// The URL does not resolve to a recording page.
    #[error("the URL does not point to a valid call recording")]
    Invalid,

    /// The transcript container never appeared before the deadline.
    #[error("transcript did not appear within {0:?}")]
    TimedOut(Duration),

    /// The container appeared but held no turn blocks.
    #[error("transcript container holds no turn blocks")]
    NoBlocksFound,

    /// The provisioner could not produce a browser session.
    #[error("browser session could not be started: {0}")]
    BrowserInitFailure(String),

    /// A configured CSS selector failed to compile.
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
}

impl ExtractError {
    /// Stable machine-readable name, used for metrics and error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Expired => "expired",
            ExtractError::Invalid => "invalid",
            ExtractError::TimedOut(_) => "timed_out",
            ExtractError::NoBlocksFound => "no_blocks_found",
            ExtractError::BrowserInitFailure(_) => "browser_init_failure",
            ExtractError::InvalidSelector(_) => "invalid_selector",
        }
    }
}

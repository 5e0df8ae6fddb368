//! # Extraction Orchestration
//!
//! One call, one browser. `TranscriptExtractor` opens a fresh session from the
//! provisioner, classifies the page, releases the session and only then parses
//! the captured markup, so the browser never outlives the classification step.
//!
//! ## Teardown guarantee:
//! The session lives inside a `SessionGuard`. Every normal path calls
//! `release()`; if the calling future is cancelled mid-wait, the guard's `Drop`
//! still terminates the browser.

use crate::browser::{BrowserProvisioner, SessionGuard};
use crate::extraction::error::ExtractError;
use crate::extraction::inspector::{inspect_blocks, BlockReport};
use crate::extraction::parser::{ParserOptions, TranscriptParser};
use crate::extraction::readiness::{Classified, PageReadinessDetector, ReadinessSettings};
use crate::extraction::types::{PageState, TranscriptEntry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of a successful extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub url: String,
    pub entries: Vec<TranscriptEntry>,
    pub total_blocks: usize,
    pub skipped_blocks: usize,
    pub elapsed_ms: u64,
}

/// Outcome of a diagnostic run. Non-ready pages are reported, not raised.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub page_state: PageState,
    pub markup: String,
    pub report: BlockReport,
}

pub struct TranscriptExtractor {
    provisioner: Arc<dyn BrowserProvisioner>,
    detector: PageReadinessDetector,
}

impl TranscriptExtractor {
    pub fn new(
        provisioner: Arc<dyn BrowserProvisioner>,
        readiness: ReadinessSettings,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            provisioner,
            detector: PageReadinessDetector::new(readiness)?,
        })
    }

    /// Render `url` and extract its transcript.
    pub async fn extract(&self, url: &str, options: ParserOptions) -> Result<Extraction, ExtractError> {
        let started = Instant::now();
        // Compile selectors before paying for a browser launch.
        let parser = TranscriptParser::new(options)?;

        let classified = self.classify(url).await?;
        self.ensure_ready(url, classified.state)?;

        let parsed = parser.parse(&classified.markup)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            url = %url,
            entries = parsed.entries.len(),
            total_blocks = parsed.total_blocks,
            skipped_blocks = parsed.skipped_blocks,
            elapsed_ms,
            "Transcript extracted"
        );

        Ok(Extraction {
            url: url.to_string(),
            entries: parsed.entries,
            total_blocks: parsed.total_blocks,
            skipped_blocks: parsed.skipped_blocks,
            elapsed_ms,
        })
    }

    /// Render `url` and describe the first `limit` turn blocks.
    pub async fn inspect(&self, url: &str, limit: usize) -> Result<Inspection, ExtractError> {
        let classified = self.classify(url).await?;
        let report = inspect_blocks(&classified.markup, limit)?;

        info!(
            url = %url,
            page_state = %classified.state,
            container_found = report.container_found,
            block_count = report.block_count,
            "Page inspected"
        );

        Ok(Inspection {
            page_state: classified.state,
            markup: classified.markup,
            report,
        })
    }

    async fn classify(&self, url: &str) -> Result<Classified, ExtractError> {
        let session = self.provisioner.open_session().await.map_err(|e| {
            warn!(url = %url, error = %e, "Browser session could not be opened");
            ExtractError::BrowserInitFailure(e.to_string())
        })?;

        let mut guard = SessionGuard::new(session, Uuid::new_v4().to_string());
        let classified = self.detector.classify(&mut guard, url).await;
        guard.release().await;

        Ok(classified)
    }

    fn ensure_ready(&self, url: &str, state: PageState) -> Result<(), ExtractError> {
        let error = match state {
            PageState::Ready => return Ok(()),
            PageState::Expired => ExtractError::Expired,
            PageState::Invalid => ExtractError::Invalid,
            PageState::TimedOut => ExtractError::TimedOut(self.detector.settings().ready_timeout),
        };
        warn!(url = %url, page_state = %state, "Page not ready for extraction");
        Err(error)
    }
}

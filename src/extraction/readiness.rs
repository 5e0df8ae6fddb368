//! # Page Readiness Detection
//!
//! Decides whether a freshly navigated recording page is worth parsing.
//!
//! ## Classification Steps:
//! 1. **Navigate** to the recording URL (navigation failures mean `Invalid`)
//! 2. **Early snapshot** after a short settle delay, checked against `PAGE_RULES`
//! 3. **Bounded wait** for the transcript container, polling until the deadline
//! 4. **Settle and re-snapshot** so lazily streamed turn blocks are included
//!
//! Error pages render quickly, so they are recognised before committing to the
//! long wait. The transcript region can exist before all of its blocks have
//! streamed in, hence the second settle delay.

use crate::browser::BrowserSession;
use crate::extraction::error::ExtractError;
use crate::extraction::selector_chain::compile;
use crate::extraction::types::PageState;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Marker element that only exists once the transcript has started rendering.
pub const TRANSCRIPT_CONTAINER: &str = "section[aria-label='Call transcript']";

/// Tags whose text never reaches the user.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// One row of the classification table: any phrase present means `state`,
/// unless `unless_contains` also appears in the page text.
#[derive(Debug, Clone, Copy)]
pub struct PhraseRule {
    pub state: PageState,
    pub phrases: &'static [&'static str],
    pub unless_contains: Option<&'static str>,
}

/// Ordered page-text rules. Earlier rows win.
///
/// The generic error row is suppressed on pages mentioning "transcript"
/// because real transcript pages carry words like "error" in unrelated UI copy.
pub const PAGE_RULES: &[PhraseRule] = &[
    PhraseRule {
        state: PageState::Expired,
        phrases: &[
            "access to this call has expired",
            "this call has expired",
            "recording has expired",
            "link has expired",
            "access expired",
        ],
        unless_contains: None,
    },
    PhraseRule {
        state: PageState::Invalid,
        phrases: &[
            "not found",
            "404",
            "access denied",
            "unauthorized",
            "forbidden",
            "page doesn't exist",
        ],
        unless_contains: Some("transcript"),
    },
];

/// Apply `rules` to already lower-cased page text.
pub fn classify_text(rules: &[PhraseRule], lowered: &str) -> Option<PageState> {
    rules
        .iter()
        .find(|rule| {
            rule.phrases.iter().any(|phrase| lowered.contains(phrase))
                && !rule.unless_contains.is_some_and(|keyword| lowered.contains(keyword))
        })
        .map(|rule| rule.state)
}

/// Concatenated text of every node a user could see.
pub fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.tree.root().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_TAGS.contains(&element.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    text
}

/// Classify raw markup with the default rule table.
pub fn classify_markup(markup: &str) -> Option<PageState> {
    let lowered = visible_text(&Html::parse_document(markup)).to_lowercase();
    classify_text(PAGE_RULES, &lowered)
}

fn contains_element(markup: &str, selector: &Selector) -> bool {
    Html::parse_document(markup).select(selector).next().is_some()
}

/// Timing knobs for the detector.
#[derive(Debug, Clone)]
pub struct ReadinessSettings {
    /// Pause before the early snapshot.
    pub initial_settle: Duration,
    /// Pause between the container appearing and the final snapshot.
    pub final_settle: Duration,
    /// Deadline for the container to appear.
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    /// Scroll to the bottom before the final settle to trigger lazy loading.
    pub scroll_before_snapshot: bool,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_millis(2_000),
            final_settle: Duration::from_millis(3_000),
            ready_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            scroll_before_snapshot: true,
        }
    }
}

/// Result of classifying a page: the state plus the last markup seen.
#[derive(Debug, Clone)]
pub struct Classified {
    pub state: PageState,
    pub markup: String,
}

pub struct PageReadinessDetector {
    settings: ReadinessSettings,
    container: Selector,
}

impl PageReadinessDetector {
    pub fn new(settings: ReadinessSettings) -> Result<Self, ExtractError> {
        Ok(Self {
            settings,
            container: compile(TRANSCRIPT_CONTAINER)?,
        })
    }

    pub fn settings(&self) -> &ReadinessSettings {
        &self.settings
    }

    /// Navigate to `url` and classify the page. Never fails: browser errors
    /// are folded into the returned state.
    pub async fn classify(&self, session: &mut dyn BrowserSession, url: &str) -> Classified {
        if let Err(e) = session.navigate(url).await {
            warn!(url = %url, error = %e, "Navigation failed, treating page as invalid");
            return Classified {
                state: PageState::Invalid,
                markup: String::new(),
            };
        }

        tokio::time::sleep(self.settings.initial_settle).await;
        let early = snapshot_or_empty(session, "early").await;

        if let Some(state) = classify_markup(&early) {
            info!(url = %url, state = %state, "Page classified from early snapshot");
            return Classified { state, markup: early };
        }

        let found = if contains_element(&early, &self.container) {
            Some(early.clone())
        } else {
            self.wait_for_container(session).await
        };

        let Some(found) = found else {
            warn!(
                url = %url,
                timeout_ms = %self.settings.ready_timeout.as_millis(),
                "Transcript container did not appear before the deadline"
            );
            return Classified {
                state: PageState::TimedOut,
                markup: early,
            };
        };

        if self.settings.scroll_before_snapshot {
            if let Err(e) = session.scroll_to_end().await {
                debug!(error = %e, "Scroll before final snapshot failed");
            }
        }
        tokio::time::sleep(self.settings.final_settle).await;

        let markup = match session.markup().await {
            Ok(markup) if contains_element(&markup, &self.container) => markup,
            Ok(_) => {
                warn!(url = %url, "Container vanished after settle, using earlier snapshot");
                found
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Final snapshot failed, using earlier snapshot");
                found
            }
        };

        info!(url = %url, markup_bytes = markup.len(), "Page ready");
        Classified {
            state: PageState::Ready,
            markup,
        }
    }

    /// Poll until the container shows up or `ready_timeout` elapses.
    async fn wait_for_container(&self, session: &mut dyn BrowserSession) -> Option<String> {
        let poll = async {
            loop {
                tokio::time::sleep(self.settings.poll_interval).await;
                match session.markup().await {
                    Ok(markup) if contains_element(&markup, &self.container) => return markup,
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "Snapshot failed while polling"),
                }
            }
        };

        tokio::time::timeout(self.settings.ready_timeout, poll).await.ok()
    }
}

async fn snapshot_or_empty(session: &mut dyn BrowserSession, checkpoint: &str) -> String {
    match session.markup().await {
        Ok(markup) => markup,
        Err(e) => {
            warn!(checkpoint = %checkpoint, error = %e, "Snapshot failed");
            String::new()
        }
    }
}

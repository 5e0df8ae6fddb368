//! # Transcript Parser
//!
//! Turns Ready markup into an ordered list of `TranscriptEntry` records.
//!
//! ## How a turn block is read:
//! - **Speaker**: speaker `SelectorChain`, element text or its `data-speaker`/`title`,
//!   then `"Unknown"` (or `"Unknown Speaker N"`)
//! - **Timestamp**: timestamp `SelectorChain`, absent when nothing matches
//! - **Utterance**: word spans joined with spaces, else the text container's text
//! - **Milliseconds** (optional): first/last timed word, else block attributes, else 0
//!
//! Blocks whose utterance is blank are skipped, never emitted.
//!
//! ## Rust Concepts:
//! - **`Html` is not `Send`**: the parsed document lives only inside `parse`, which
//!   is synchronous, so it never crosses an `.await`

use crate::extraction::error::ExtractError;
use crate::extraction::readiness::TRANSCRIPT_CONTAINER;
use crate::extraction::selector_chain::{compile, element_text, SelectorChain};
use crate::extraction::types::{OutputPreset, TranscriptEntry};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Turn block selectors, tried in order until one matches inside the container.
pub const BLOCK_SELECTORS: &[&str] = &[
    "div.TranscriptGroup-module__groupItem",
    "div[class*='TranscriptGroup-module__groupItem']",
];

pub const SPEAKER_SELECTORS: &[&str] = &[
    "span.only-speaker-visible",
    ".only-speaker-visible",
    "span[class*='speaker']",
    ".speaker-name",
    "[data-speaker]",
    "span.speaker",
    ".participant-name",
];

/// Used by the ancestor-scoped fallback when a block carries no speaker marker.
pub const SPEAKER_ANCESTOR_SCAN: &str = "[class*='speaker'], .participant-name, [data-speaker]";

pub const TIMESTAMP_SELECTORS: &[&str] = &[
    "div[class*='TranscriptGroup-module__timestamp'] span",
    "[class*='timestamp']",
    "time",
];

pub const TEXT_CONTAINER_SELECTORS: &[&str] = &[
    "div[class*='TranscriptGroup-module__textContent']",
    "[class*='textContent']",
    ".transcript-text",
];

pub const WORD_SELECTORS: &[&str] = &[
    "span[data-start-ms]",
    "span[data-start]",
    "span[data-start-time]",
    "[class*='TranscriptGroup-module__word']",
];

const START_ATTRS: &[&str] = &["data-start-ms", "data-start", "data-start-time"];
const END_ATTRS: &[&str] = &["data-end-ms", "data-end", "data-end-time"];

static RE_TRAILING_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<speaker>.*?\p{L}.*?)\s*(?P<time>\d{1,2}:\d{2}(?::\d{2})?)$")
        .expect("invalid regex: trailing time")
});

/// Behaviour switches, normally derived from an `OutputPreset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Read word/block timing attributes into `start_ms`/`end_ms`.
    pub millisecond_timing: bool,
    /// Split `"Alex Johnson 2:15"` speaker labels into speaker and timestamp.
    pub split_speaker_timestamp: bool,
    /// Name unidentified speakers `"Unknown Speaker N"` instead of `"Unknown"`.
    pub numbered_unknown_speakers: bool,
}

impl ParserOptions {
    pub fn for_preset(preset: OutputPreset) -> Self {
        Self {
            millisecond_timing: preset.millisecond_timing(),
            split_speaker_timestamp: preset.splits_speaker_timestamp(),
            numbered_unknown_speakers: false,
        }
    }
}

/// Parser output plus block counters for logging and diagnostics.
#[derive(Debug, Clone)]
pub struct ParsedTranscript {
    pub entries: Vec<TranscriptEntry>,
    pub total_blocks: usize,
    pub skipped_blocks: usize,
}

pub struct TranscriptParser {
    options: ParserOptions,
    container: Selector,
    blocks: Vec<Selector>,
    speaker: SelectorChain,
    timestamp: SelectorChain,
    text: SelectorChain,
    words: SelectorChain,
}

impl TranscriptParser {
    pub fn new(options: ParserOptions) -> Result<Self, ExtractError> {
        Ok(Self {
            options,
            container: compile(TRANSCRIPT_CONTAINER)?,
            blocks: BLOCK_SELECTORS
                .iter()
                .map(|css| compile(css))
                .collect::<Result<Vec<_>, _>>()?,
            speaker: SelectorChain::new(SPEAKER_SELECTORS)?
                .with_ancestor_scan(SPEAKER_ANCESTOR_SCAN)?
                .with_fallback_attrs(&["data-speaker", "title"]),
            timestamp: SelectorChain::new(TIMESTAMP_SELECTORS)?,
            text: SelectorChain::new(TEXT_CONTAINER_SELECTORS)?,
            words: SelectorChain::new(WORD_SELECTORS)?,
        })
    }

    /// Parse every turn block in document order.
    ///
    /// Fails with `NoBlocksFound` when the container is missing or empty.
    pub fn parse(&self, markup: &str) -> Result<ParsedTranscript, ExtractError> {
        let document = Html::parse_document(markup);
        let container = document
            .select(&self.container)
            .next()
            .ok_or(ExtractError::NoBlocksFound)?;

        let blocks = self.turn_blocks(container);
        if blocks.is_empty() {
            return Err(ExtractError::NoBlocksFound);
        }

        let mut entries = Vec::with_capacity(blocks.len());
        let mut skipped_blocks = 0;
        for (position, block) in blocks.iter().enumerate() {
            match self.parse_block(*block, container, position + 1) {
                Some(entry) => entries.push(entry),
                None => {
                    skipped_blocks += 1;
                    debug!(block_index = position + 1, "Skipping turn block with blank utterance");
                }
            }
        }

        debug!(
            total_blocks = blocks.len(),
            skipped_blocks,
            entries = entries.len(),
            "Parsed transcript"
        );

        Ok(ParsedTranscript {
            entries,
            total_blocks: blocks.len(),
            skipped_blocks,
        })
    }

    /// Outermost turn blocks inside the container, from the first block selector that matches.
    pub fn turn_blocks<'a>(&self, container: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let matched = self
            .blocks
            .iter()
            .map(|selector| container.select(selector).collect::<Vec<_>>())
            .find(|blocks| !blocks.is_empty())
            .unwrap_or_default();

        // Partial class matches can also hit nested helper elements; keep the outermost.
        let ids: HashSet<_> = matched.iter().map(|block| block.id()).collect();
        matched
            .into_iter()
            .filter(|block| !block.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
            .collect()
    }

    fn parse_block<'a>(
        &self,
        block: ElementRef<'a>,
        container: ElementRef<'a>,
        index: usize,
    ) -> Option<TranscriptEntry> {
        let text_container = self.text.first_element(block);
        let words = self.words.all_elements(text_container.unwrap_or(block));

        let utterance = if words.is_empty() {
            text_container.map(element_text).unwrap_or_default()
        } else {
            words
                .iter()
                .map(|word| element_text(*word))
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        };
        if utterance.trim().is_empty() {
            return None;
        }

        let mut speaker = self.speaker.resolve(block, container);
        let mut timestamp = self.timestamp.resolve(block, container);

        if self.options.split_speaker_timestamp {
            if let Some((name, time)) = speaker.as_deref().and_then(split_speaker_timestamp) {
                speaker = Some(name);
                timestamp = Some(time);
            }
        }

        let speaker = speaker.unwrap_or_else(|| self.default_speaker(index));

        let (start_ms, end_ms) = if self.options.millisecond_timing {
            let (start, end) = word_timing(&words)
                .or_else(|| block_timing(block, text_container))
                .unwrap_or((0, 0));
            (Some(start), Some(end))
        } else {
            (None, None)
        };

        Some(TranscriptEntry {
            speaker,
            timestamp,
            start_ms,
            end_ms,
            utterance,
        })
    }

    fn default_speaker(&self, index: usize) -> String {
        if self.options.numbered_unknown_speakers {
            format!("Unknown Speaker {}", index)
        } else {
            "Unknown".to_string()
        }
    }
}

/// Split a `"Alex Johnson 2:15"` label into `("Alex Johnson", "2:15")`.
///
/// Only fires when the label ends in a clock-like pattern and the rest
/// contains at least one letter.
pub fn split_speaker_timestamp(label: &str) -> Option<(String, String)> {
    let caps = RE_TRAILING_TIME.captures(label.trim())?;
    let speaker = caps["speaker"].trim().to_string();
    if speaker.is_empty() {
        return None;
    }
    Some((speaker, caps["time"].to_string()))
}

/// Parse an integer or fractional millisecond attribute value.
pub fn parse_millis(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
        Some(value.round() as u64)
    } else {
        None
    }
}

fn read_millis(element: ElementRef<'_>, attrs: &[&str]) -> Option<u64> {
    attrs
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .find_map(parse_millis)
}

fn has_start_attr(element: &ElementRef<'_>) -> bool {
    START_ATTRS.iter().any(|attr| element.value().attr(attr).is_some())
}

/// Start of the first timed word and end of the last one.
fn word_timing(words: &[ElementRef<'_>]) -> Option<(u64, u64)> {
    let first = words.iter().find(|word| has_start_attr(word))?;
    let last = words.iter().rev().find(|word| has_start_attr(word))?;
    Some((read_millis(*first, START_ATTRS)?, read_millis(*last, END_ATTRS)?))
}

fn block_timing<'a>(block: ElementRef<'a>, text_container: Option<ElementRef<'a>>) -> Option<(u64, u64)> {
    std::iter::once(block)
        .chain(text_container)
        .find_map(|element| Some((read_millis(element, START_ATTRS)?, read_millis(element, END_ATTRS)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fixtures;

    fn parser(preset: OutputPreset) -> TranscriptParser {
        TranscriptParser::new(ParserOptions::for_preset(preset)).unwrap()
    }

    #[test]
    fn test_legacy_layout() {
        let parsed = parser(OutputPreset::Legacy).parse(fixtures::LEGACY_PAGE).unwrap();

        assert_eq!(parsed.total_blocks, 4);
        assert_eq!(parsed.skipped_blocks, 1);
        let speakers: Vec<&str> = parsed.entries.iter().map(|e| e.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["Sarah Chen", "Marcus Webb", "Sarah Chen"]);

        let first = &parsed.entries[0];
        assert_eq!(first.timestamp.as_deref(), Some("0:05"));
        assert_eq!(first.utterance, "Thanks everyone for joining today.");
        assert_eq!(first.start_ms, None);
        assert_eq!(first.end_ms, None);

        // Speaker falls back to the data-speaker attribute of an empty marker.
        assert_eq!(parsed.entries[1].utterance, "Happy to be here.");
        // No marker inside the block: nearest preceding marker wins.
        assert_eq!(parsed.entries[2].timestamp.as_deref(), Some("0:20"));
    }

    #[test]
    fn test_word_level_timing() {
        let parsed = parser(OutputPreset::WordTiming).parse(fixtures::WORD_TIMED_PAGE).unwrap();

        assert_eq!(parsed.total_blocks, 5);
        assert_eq!(parsed.skipped_blocks, 1);
        assert_eq!(parsed.entries.len(), 4);

        let welcome = &parsed.entries[0];
        assert_eq!(welcome.utterance, "Welcome back everyone.");
        assert_eq!((welcome.start_ms, welcome.end_ms), (Some(2_000), Some(3_500)));
    }

    #[test]
    fn test_block_timing_fallback() {
        let parsed = parser(OutputPreset::WordTiming).parse(fixtures::WORD_TIMED_PAGE).unwrap();

        let update = &parsed.entries[1];
        assert_eq!(update.speaker, "Marcus Webb");
        assert_eq!(update.utterance, "Quick update.");
        assert_eq!((update.start_ms, update.end_ms), (Some(4_000), Some(6_250)));

        let untimed = &parsed.entries[2];
        assert_eq!((untimed.start_ms, untimed.end_ms), (Some(0), Some(0)));
    }

    #[test]
    fn test_inverted_timing_is_kept() {
        let parsed = parser(OutputPreset::WordTiming).parse(fixtures::WORD_TIMED_PAGE).unwrap();
        let rewind = &parsed.entries[3];
        assert_eq!((rewind.start_ms, rewind.end_ms), (Some(7_000), Some(6_000)));
    }

    #[test]
    fn test_no_blank_utterances() {
        for markup in [
            fixtures::LEGACY_PAGE,
            fixtures::WORD_TIMED_PAGE,
            fixtures::COMBINED_LABEL_PAGE,
            fixtures::ANONYMOUS_PAGE,
        ] {
            for preset in [OutputPreset::Legacy, OutputPreset::WordTiming, OutputPreset::Lines] {
                let parsed = parser(preset).parse(markup).unwrap();
                assert!(parsed.entries.iter().all(|e| !e.utterance.trim().is_empty()));
            }
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let parser = parser(OutputPreset::WordTiming);
        let first = parser.parse(fixtures::WORD_TIMED_PAGE).unwrap().entries;
        let second = parser.parse(fixtures::WORD_TIMED_PAGE).unwrap().entries;
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_container_reports_no_blocks() {
        let result = parser(OutputPreset::Legacy).parse(fixtures::EMPTY_CONTAINER_PAGE);
        assert!(matches!(result, Err(ExtractError::NoBlocksFound)));

        let result = parser(OutputPreset::Legacy).parse(fixtures::LOADING_PAGE);
        assert!(matches!(result, Err(ExtractError::NoBlocksFound)));
    }

    #[test]
    fn test_combined_speaker_label_is_split() {
        let parsed = parser(OutputPreset::Lines).parse(fixtures::COMBINED_LABEL_PAGE).unwrap();

        assert_eq!(parsed.entries[0].speaker, "Alex Johnson");
        assert_eq!(parsed.entries[0].timestamp.as_deref(), Some("2:15"));
        assert_eq!(parsed.entries[1].speaker, "R2D2");
        assert_eq!(parsed.entries[1].timestamp, None);
    }

    #[test]
    fn test_split_disabled_keeps_label() {
        let parsed = parser(OutputPreset::WordTiming).parse(fixtures::COMBINED_LABEL_PAGE).unwrap();
        assert_eq!(parsed.entries[0].speaker, "Alex Johnson 2:15");
        assert_eq!(parsed.entries[0].timestamp.as_deref(), Some("9:59"));
    }

    #[test]
    fn test_unknown_speaker_defaults() {
        let parsed = parser(OutputPreset::Legacy).parse(fixtures::ANONYMOUS_PAGE).unwrap();
        assert!(parsed.entries.iter().all(|e| e.speaker == "Unknown"));

        let numbered = TranscriptParser::new(ParserOptions {
            numbered_unknown_speakers: true,
            ..ParserOptions::for_preset(OutputPreset::Legacy)
        })
        .unwrap();
        let parsed = numbered.parse(fixtures::ANONYMOUS_PAGE).unwrap();
        assert_eq!(parsed.entries[0].speaker, "Unknown Speaker 1");
        assert_eq!(parsed.entries[1].speaker, "Unknown Speaker 2");
    }

    #[test]
    fn test_nested_partial_matches_are_not_double_counted() {
        let markup = r#"<section aria-label="Call transcript">
            <div class="TranscriptGroup-module__groupItem_a">
              <div class="TranscriptGroup-module__groupItemHeader"><span class="speaker-name">Dana</span></div>
              <div class="TranscriptGroup-module__textContent">Only once.</div>
            </div>
          </section>"#;
        let parsed = parser(OutputPreset::Legacy).parse(markup).unwrap();
        assert_eq!(parsed.total_blocks, 1);
        assert_eq!(parsed.entries[0].speaker, "Dana");
    }

    #[test]
    fn test_speaker_outside_container_is_not_borrowed() {
        let markup = r#"<html><body>
            <aside><span class="participant-name">Jordan Sidebar</span></aside>
            <section aria-label="Call transcript">
              <div class="TranscriptGroup-module__groupItem">
                <div class="TranscriptGroup-module__textContent">Hello?</div>
              </div>
            </section>
          </body></html>"#;
        let numbered = TranscriptParser::new(ParserOptions {
            numbered_unknown_speakers: true,
            ..ParserOptions::for_preset(OutputPreset::Legacy)
        })
        .unwrap();

        let parsed = numbered.parse(markup).unwrap();
        assert_eq!(parsed.entries[0].speaker, "Unknown Speaker 1");
    }

    #[test]
    fn test_speaker_group_wrapper_is_not_a_speaker() {
        let markup = r#"<html><body>
            <section aria-label="Call transcript">
              <div class="speakerGroup">
                <div class="TranscriptGroup-module__groupItem">
                  <div class="TranscriptGroup-module__textContent">Hello there.</div>
                </div>
              </div>
            </section>
          </body></html>"#;

        let parsed = parser(OutputPreset::Legacy).parse(markup).unwrap();
        assert_eq!(parsed.entries[0].speaker, "Unknown");
        assert_eq!(parsed.entries[0].utterance, "Hello there.");
    }

    #[test]
    fn test_split_speaker_timestamp() {
        assert_eq!(
            split_speaker_timestamp("Alex Johnson 2:15"),
            Some(("Alex Johnson".to_string(), "2:15".to_string()))
        );
        assert_eq!(
            split_speaker_timestamp("Agent 47 1:02:03"),
            Some(("Agent 47".to_string(), "1:02:03".to_string()))
        );
        assert_eq!(split_speaker_timestamp("R2D2"), None);
        assert_eq!(split_speaker_timestamp("12:30"), None);
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(parse_millis("1500"), Some(1_500));
        assert_eq!(parse_millis(" 1500.6 "), Some(1_501));
        assert_eq!(parse_millis("-5"), None);
        assert_eq!(parse_millis("NaN"), None);
        assert_eq!(parse_millis("abc"), None);
    }
}

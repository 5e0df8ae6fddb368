//! # Transcript Data Types
//!
//! Shared types flowing between the readiness detector, the parser, the
//! assembler and the HTTP handlers.
//!
//! ## Output Shapes:
//! Different API consumers expect different JSON for the same transcript.
//! All of them are rendered from one `TranscriptEntry` sequence:
//! - **legacy**: `{"speaker", "message"}`
//! - **word_timing**: `{"speaker", "start", "end", "start_ms", "end_ms", "utterance"}`
//! - **lines**: `"Speaker 2:15 | text"`

use crate::extraction::time_codec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One speaker turn extracted from the rendered page.
///
/// Entries are built once by the parser and never mutated afterwards;
/// `utterance` is guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    /// Display label rendered by the page itself (e.g. `"2:15"`).
    pub timestamp: Option<String>,
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
    pub utterance: String,
}

/// Classification of a page after navigation. Exactly one per extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Ready,
    Expired,
    Invalid,
    TimedOut,
}

impl PageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageState::Ready => "ready",
            PageState::Expired => "expired",
            PageState::Invalid => "invalid",
            PageState::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named extraction presets, selected per request by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPreset {
    /// `{speaker, message}` objects.
    Legacy,
    /// Structured objects with millisecond timing from word spans.
    WordTiming,
    /// Flattened `"speaker timestamp | utterance"` strings.
    Lines,
}

impl OutputPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputPreset::Legacy => "legacy",
            OutputPreset::WordTiming => "word_timing",
            OutputPreset::Lines => "lines",
        }
    }

    /// Whether this preset reads word-level timing attributes.
    pub fn millisecond_timing(&self) -> bool {
        matches!(self, OutputPreset::WordTiming)
    }

    /// Whether this preset splits `"Name 2:15"` speaker labels.
    pub fn splits_speaker_timestamp(&self) -> bool {
        !matches!(self, OutputPreset::WordTiming)
    }
}

impl fmt::Display for OutputPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "message" => Ok(OutputPreset::Legacy),
            "word_timing" | "timed" | "structured" => Ok(OutputPreset::WordTiming),
            "lines" | "line" | "flat" => Ok(OutputPreset::Lines),
            other => Err(format!(
                "unknown format '{}', expected one of: legacy, word_timing, lines",
                other
            )),
        }
    }
}

/// One transcript item as serialized in an API response.
///
/// `#[serde(untagged)]` means the enum variant name is not written to JSON;
/// each variant serializes as its bare contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TranscriptLine {
    Message {
        speaker: String,
        message: String,
    },
    Timed {
        speaker: String,
        start: String,
        end: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        start_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_ms: Option<u64>,
        utterance: String,
    },
    Flat(String),
}

/// Placeholder for a flat line whose block carried no timestamp.
const UNKNOWN_TIMESTAMP: &str = "Unknown";

impl TranscriptEntry {
    /// `"{speaker} {timestamp} | {utterance}"`; a missing timestamp reads `Unknown`.
    pub fn to_flat_line(&self) -> String {
        let timestamp = match self.timestamp.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => ts,
            _ => UNKNOWN_TIMESTAMP,
        };
        format!("{} {} | {}", self.speaker, timestamp, self.utterance)
    }

    pub fn to_line(&self, preset: OutputPreset) -> TranscriptLine {
        match preset {
            OutputPreset::Legacy => TranscriptLine::Message {
                speaker: self.speaker.clone(),
                message: self.utterance.clone(),
            },
            OutputPreset::WordTiming => {
                let label = self.timestamp.clone().unwrap_or_default();
                TranscriptLine::Timed {
                    speaker: self.speaker.clone(),
                    start: self.start_ms.map(time_codec::to_display).unwrap_or_else(|| label.clone()),
                    end: self.end_ms.map(time_codec::to_display).unwrap_or(label),
                    start_ms: self.start_ms,
                    end_ms: self.end_ms,
                    utterance: self.utterance.clone(),
                }
            }
            OutputPreset::Lines => TranscriptLine::Flat(self.to_flat_line()),
        }
    }
}

/// Render a whole entry sequence in the requested shape, preserving order.
pub fn render(entries: &[TranscriptEntry], preset: OutputPreset) -> Vec<TranscriptLine> {
    entries.iter().map(|entry| entry.to_line(preset)).collect()
}

//! # Result Assembly
//!
//! Post-extraction filtering and summary counters. Entries are only selected,
//! never modified, and their document order is preserved.

use crate::extraction::types::TranscriptEntry;
use serde::Serialize;

/// Optional post-hoc filters; all present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    /// Case-insensitive substring of the speaker name.
    pub speaker: Option<String>,
    /// Inclusive lower bound on `start_ms`.
    pub start_ms: Option<u64>,
    /// Inclusive upper bound on `end_ms`.
    pub end_ms: Option<u64>,
}

impl Filter {
    /// Whether any time bound is set (and therefore millisecond timing is needed).
    pub fn has_time_bounds(&self) -> bool {
        self.start_ms.is_some() || self.end_ms.is_some()
    }

    /// An entry without millisecond timing fails any active time bound.
    pub fn matches(&self, entry: &TranscriptEntry) -> bool {
        let speaker_ok = match self.speaker.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => entry
                .speaker
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        };

        let start_ok = match self.start_ms {
            Some(bound) => entry.start_ms.is_some_and(|start| start >= bound),
            None => true,
        };

        let end_ok = match self.end_ms {
            Some(bound) => entry.end_ms.is_some_and(|end| end <= bound),
            None => true,
        };

        speaker_ok && start_ok && end_ok
    }
}

/// Filtered entries plus the counters reported alongside them.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub entries: Vec<TranscriptEntry>,
    /// Length of `entries`, always computed after filtering.
    pub total_count: usize,
    /// Distinct speakers among `entries`, in order of first appearance.
    pub speakers: Vec<String>,
}

pub fn assemble(entries: Vec<TranscriptEntry>, filter: &Filter) -> Assembled {
    let entries: Vec<TranscriptEntry> = entries
        .into_iter()
        .filter(|entry| filter.matches(entry))
        .collect();

    let mut speakers: Vec<String> = Vec::new();
    for entry in &entries {
        if !speakers.contains(&entry.speaker) {
            speakers.push(entry.speaker.clone());
        }
    }

    Assembled {
        total_count: entries.len(),
        entries,
        speakers,
    }
}

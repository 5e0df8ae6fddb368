//! # Transcript Extraction Engine
//!
//! Turns a recording URL into an ordered list of speaker turns.
//!
//! ## Pipeline:
//! 1. **readiness**: navigate, classify the page (ready, expired, invalid, timed out)
//! 2. **parser**: walk the turn blocks of the ready markup via selector chains
//! 3. **time_codec**: render millisecond offsets for display
//! 4. **assembler**: filter entries and compute summary counters
//!
//! `engine::TranscriptExtractor` ties the steps to one browser session per call.

pub mod assembler;
pub mod engine;
pub mod error;
pub mod inspector;
pub mod parser;
pub mod readiness;
pub mod selector_chain;
pub mod time_codec;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assembler::{assemble, Filter};
pub use engine::{Extraction, TranscriptExtractor};
pub use error::ExtractError;
pub use parser::ParserOptions;
pub use readiness::ReadinessSettings;
pub use types::{render, OutputPreset, PageState};

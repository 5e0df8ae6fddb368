//! Structure dump of the first few turn blocks, used by `GET /debug` when the
//! target site's markup changes and the selector lists need updating.

use crate::extraction::error::ExtractError;
use crate::extraction::parser::{ParserOptions, TranscriptParser};
use crate::extraction::readiness::TRANSCRIPT_CONTAINER;
use crate::extraction::selector_chain::{compile, element_text};
use crate::extraction::types::OutputPreset;
use scraper::{ElementRef, Html};
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_DEPTH: usize = 3;
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Serialize)]
pub struct ElementStructure {
    pub tag: String,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementStructure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockStructure {
    pub index: usize,
    pub text_preview: String,
    #[serde(flatten)]
    pub element: ElementStructure,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub container_found: bool,
    pub block_count: usize,
    pub blocks: Vec<BlockStructure>,
}

fn describe(element: ElementRef<'_>, depth: usize) -> ElementStructure {
    let value = element.value();
    let children = if depth < MAX_DEPTH {
        element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|child| describe(child, depth + 1))
            .collect()
    } else {
        Vec::new()
    };

    ElementStructure {
        tag: value.name().to_string(),
        classes: value.classes().map(str::to_string).collect(),
        attributes: value
            .attrs()
            .filter(|(name, _)| *name != "class")
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect(),
        children,
    }
}

/// Describe up to `limit` turn blocks. Without a transcript container the
/// whole document is searched, so a renamed container still shows its blocks.
pub fn inspect_blocks(markup: &str, limit: usize) -> Result<BlockReport, ExtractError> {
    let parser = TranscriptParser::new(ParserOptions::for_preset(OutputPreset::Legacy))?;
    let container_selector = compile(TRANSCRIPT_CONTAINER)?;
    let document = Html::parse_document(markup);

    let container = document.select(&container_selector).next();
    let scope = container.unwrap_or_else(|| document.root_element());
    let blocks = parser.turn_blocks(scope);

    Ok(BlockReport {
        container_found: container.is_some(),
        block_count: blocks.len(),
        blocks: blocks
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(position, block)| BlockStructure {
                index: position + 1,
                text_preview: element_text(block).chars().take(PREVIEW_CHARS).collect(),
                element: describe(block, 0),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fixtures;

    #[test]
    fn test_report_lists_block_structure() {
        let report = inspect_blocks(fixtures::WORD_TIMED_PAGE, 2).unwrap();

        assert!(report.container_found);
        assert_eq!(report.block_count, 5);
        assert_eq!(report.blocks.len(), 2);

        let first = &report.blocks[0];
        assert_eq!(first.index, 1);
        assert_eq!(first.element.tag, "div");
        assert_eq!(first.element.classes, vec!["TranscriptGroup-module__groupItem_q1"]);
        assert_eq!(first.element.attributes.get("data-start").map(String::as_str), Some("9000"));
        assert!(!first.element.attributes.contains_key("class"));
        assert!(first.text_preview.starts_with("Sarah Chen"));
        assert_eq!(first.element.children.len(), 3);
    }

    #[test]
    fn test_report_without_container() {
        let report = inspect_blocks(fixtures::LOADING_PAGE, 5).unwrap();
        assert!(!report.container_found);
        assert_eq!(report.block_count, 0);
        assert!(report.blocks.is_empty());
    }
}

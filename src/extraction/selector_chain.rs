//! # Selector Chains
//!
//! A `SelectorChain` is an ordered list of DOM-query strategies for one logical
//! field (speaker, timestamp, text container, word spans). Strategies are tried
//! left to right and the first one yielding a non-blank value wins.
//!
//! New page layouts are supported by appending a strategy to the chain, not by
//! adding branches to the parser.
//!
//! ## Key Rust Concepts:
//! - **Lifetimes (`'a`)**: `ElementRef<'a>` borrows from the parsed document, so
//!   every element returned here lives exactly as long as that document
//! - **Iterator adapters**: `find_map` stops at the first strategy producing a value

use crate::extraction::error::ExtractError;
use scraper::{ElementRef, Selector};

/// Compile a CSS selector, reporting the offending selector text on failure.
pub fn compile(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidSelector(css.to_string()))
}

/// Collapse all whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalized text content of an element and its descendants.
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// One way of locating a field's element relative to a turn block.
pub enum Strategy {
    /// Descendants of the block matching the selector.
    Descendant(Selector),
    /// Nearest match among the block's earlier siblings, then each ancestor's
    /// earlier siblings, walking outwards until the scope element. Covers
    /// layouts that print the speaker once on a group header instead of inside
    /// every block.
    PrecedingInAncestors(Selector),
}

impl Strategy {
    fn first<'a>(&self, block: ElementRef<'a>, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match self {
            Strategy::Descendant(selector) => block.select(selector).next(),
            Strategy::PrecedingInAncestors(selector) => nearest_preceding(block, scope, selector),
        }
    }

    fn all<'a>(&self, block: ElementRef<'a>, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self {
            Strategy::Descendant(selector) => block.select(selector).collect(),
            Strategy::PrecedingInAncestors(selector) => {
                nearest_preceding(block, scope, selector).into_iter().collect()
            }
        }
    }
}

/// Ancestors of `block` are never candidates themselves, and nothing outside
/// `scope` is looked at. Only leaf elements count as speaker labels, so a
/// matching wrapper never contributes its whole text.
fn nearest_preceding<'a>(
    block: ElementRef<'a>,
    scope: ElementRef<'a>,
    selector: &Selector,
) -> Option<ElementRef<'a>> {
    if !block.ancestors().any(|ancestor| ancestor.id() == scope.id()) {
        return None;
    }

    let mut node = *block;
    while node.id() != scope.id() {
        for sibling in node.prev_siblings() {
            let Some(element) = ElementRef::wrap(sibling) else {
                continue;
            };
            // Closest to the block means last in document order.
            let label = element
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|candidate| selector.matches(candidate) && is_leaf(*candidate))
                .last();
            if label.is_some() {
                return label;
            }
        }
        node = node.parent()?;
    }
    None
}

fn is_leaf(element: ElementRef<'_>) -> bool {
    !element.children().any(|child| child.value().is_element())
}

/// Ordered fallback list of strategies for a single field.
pub struct SelectorChain {
    strategies: Vec<Strategy>,
    /// Attributes consulted, in order, when a matched element has no text.
    fallback_attrs: Vec<&'static str>,
}

impl SelectorChain {
    /// Build a chain of descendant strategies from CSS selectors, in priority order.
    pub fn new(selectors: &[&str]) -> Result<Self, ExtractError> {
        let strategies = selectors
            .iter()
            .map(|css| compile(css).map(Strategy::Descendant))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strategies,
            fallback_attrs: Vec::new(),
        })
    }

    /// Append an ancestor-scoped scan as the lowest-priority strategy.
    pub fn with_ancestor_scan(mut self, css: &str) -> Result<Self, ExtractError> {
        self.strategies.push(Strategy::PrecedingInAncestors(compile(css)?));
        Ok(self)
    }

    pub fn with_fallback_attrs(mut self, attrs: &[&'static str]) -> Self {
        self.fallback_attrs = attrs.to_vec();
        self
    }

    /// Value of a matched element: its text, or the first non-blank fallback attribute.
    pub fn element_value(&self, element: ElementRef<'_>) -> Option<String> {
        let text = element_text(element);
        if !text.is_empty() {
            return Some(text);
        }

        self.fallback_attrs
            .iter()
            .filter_map(|attr| element.value().attr(attr))
            .map(normalize_whitespace)
            .find(|value| !value.is_empty())
    }

    /// First non-blank value produced by any strategy, in chain order.
    ///
    /// Ancestor scans stay inside `scope`, normally the transcript container.
    pub fn resolve<'a>(&self, block: ElementRef<'a>, scope: ElementRef<'a>) -> Option<String> {
        self.strategies
            .iter()
            .filter_map(|strategy| strategy.first(block, scope))
            .find_map(|element| self.element_value(element))
    }

    /// First element matched by the highest-priority strategy that matches anything.
    pub fn first_element<'a>(&self, block: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.strategies.iter().find_map(|strategy| strategy.first(block, block))
    }

    /// All elements matched by the highest-priority strategy that matches anything.
    pub fn all_elements<'a>(&self, block: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.strategies
            .iter()
            .map(|strategy| strategy.all(block, block))
            .find(|matches| !matches.is_empty())
            .unwrap_or_default()
    }
}

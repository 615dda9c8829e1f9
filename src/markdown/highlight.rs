//! Highlighting engine
//!
//! `apply_highlighting` restyles one region of a storage:
//!
//! 1. The region is widened to whole paragraphs.
//! 2. Its attributes are reset to the default font and color; links,
//!    backgrounds, underline and paragraph styles are cleared.
//! 3. Every rule in the table runs over the paragraph text, merging the
//!    resolved styles of each participating capture group and then running
//!    the rule's action.
//!
//! Nothing outside the paragraph range is touched, and running the engine
//! twice over the same range leaves the same attributes as running it once.

use super::metrics::{EstimatedMetrics, TextMetrics};
use super::rules::{markdown_rules, MatchScope, SyntaxRule};
use super::style::{resolve, AttributeSet, RenderAttributes};
use crate::config::EditorConfiguration;
use crate::editor::storage::TextStorage;
use crate::string_utils::{paragraph_range, span_text, Span};
use log::{debug, trace};

static ESTIMATED_METRICS: EstimatedMetrics = EstimatedMetrics;

// ─────────────────────────────────────────────────────────────────────────────
// Document Context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-document inputs of a highlighting pass.
#[derive(Clone, Copy)]
pub struct DocumentContext<'a> {
    /// File name of the page being highlighted, if it belongs to a notebook
    pub page: Option<&'a str>,
    /// Measures marker widths for hanging indents
    pub metrics: &'a dyn TextMetrics,
}

impl Default for DocumentContext<'_> {
    fn default() -> Self {
        Self {
            page: None,
            metrics: &ESTIMATED_METRICS,
        }
    }
}

impl<'a> DocumentContext<'a> {
    pub fn new(metrics: &'a dyn TextMetrics) -> Self {
        Self {
            page: None,
            metrics,
        }
    }

    pub fn with_page(mut self, page: &'a str) -> Self {
        self.page = Some(page);
        self
    }
}

impl std::fmt::Debug for DocumentContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Restyle the paragraphs touched by `range`.
///
/// Returns the paragraph range that was restyled, or `None` when `range`
/// does not fit in the storage (nothing is touched then).
pub fn apply_highlighting(
    range: Span,
    storage: &mut dyn TextStorage,
    config: &EditorConfiguration,
    document: &DocumentContext<'_>,
) -> Option<Span> {
    if !range.fits(storage.len()) {
        debug!(
            "Skipping highlight of {:?}: buffer is {} bytes",
            range,
            storage.len()
        );
        return None;
    }

    let paragraph = paragraph_range(storage.text(), range);
    if paragraph.is_empty() {
        return Some(paragraph);
    }

    storage.set_attributes(paragraph, RenderAttributes::base(config));

    // Rules see a snapshot; actions only change attributes, never text
    let text = span_text(storage.text(), paragraph).to_owned();
    let scope = MatchScope {
        config,
        document,
        paragraph,
    };

    for rule in markdown_rules() {
        apply_rule(rule, &text, storage, &scope);
    }

    trace!("Highlighted {:?}", paragraph);
    Some(paragraph)
}

/// Restyle the whole storage.
pub fn highlight_all(
    storage: &mut dyn TextStorage,
    config: &EditorConfiguration,
    document: &DocumentContext<'_>,
) -> Option<Span> {
    let all = Span::new(0, storage.len());
    apply_highlighting(all, storage, config, document)
}

fn apply_rule(
    rule: &SyntaxRule,
    text: &str,
    storage: &mut dyn TextStorage,
    scope: &MatchScope<'_>,
) {
    // Resolve once per pass; the configuration cannot change mid-pass
    let group_attributes: Vec<AttributeSet> = rule
        .capture_styles
        .iter()
        .map(|specs| resolve(specs, scope.config))
        .collect();

    for captures in rule.pattern.captures_iter(text) {
        for (index, attributes) in group_attributes.iter().enumerate() {
            if attributes.is_empty() {
                continue;
            }
            if let Some(group) = scope.group(&captures, index) {
                storage.add_attributes(group, attributes);
            }
        }
        if let Some(action) = rule.action {
            action(storage, scope, &captures);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

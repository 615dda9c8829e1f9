//! Markdown syntax highlighting
//!
//! Highlighting is regex-driven and incremental: an edit re-styles only the
//! paragraphs it touched. Markup characters stay in the text and are hidden
//! by shrinking them to a near-zero font size.
//!
//! # Example
//! ```ignore
//! use crate::config::EditorConfiguration;
//! use crate::editor::AttributedBuffer;
//! use crate::markdown::{apply_highlighting, DocumentContext, RenderAttributes};
//! use crate::string_utils::Span;
//!
//! let config = EditorConfiguration::default();
//! let mut buffer = AttributedBuffer::new("# Hello **world**", RenderAttributes::base(&config));
//! apply_highlighting(Span::caret(0), &mut buffer, &config, &DocumentContext::default());
//! ```

pub mod highlight;
pub mod layout;
pub mod metrics;
pub mod rules;
pub mod style;

pub use highlight::{apply_highlighting, highlight_all, DocumentContext};
pub use layout::{layout_job, text_format};
pub use metrics::{EstimatedMetrics, TextMetrics};
pub use rules::{markdown_rules, SyntaxRule};
pub use style::{
    resolve, AttributeSet, ParagraphStyle, RenderAttributes, StyleSpec, TextLink, TextSize,
    HIDDEN_SIZE,
};

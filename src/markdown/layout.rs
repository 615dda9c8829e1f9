//! egui projection of highlighted storage
//!
//! Turns the attribute runs of a storage into an `egui::text::LayoutJob` that
//! a `TextEdit` layouter can return. Font descriptors map onto the named
//! variant families registered by `fonts::create_font_definitions`.
//!
//! Paragraph styles have no `LayoutJob` equivalent and are not projected;
//! hosts that need hanging indents read them from the storage directly.

use super::style::RenderAttributes;
use crate::editor::storage::TextStorage;
use crate::string_utils::{span_text, Span};
use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, Stroke};

/// Build a layout job covering the whole storage.
pub fn layout_job(storage: &dyn TextStorage, wrap_width: f32) -> LayoutJob {
    let mut job = LayoutJob::default();
    job.wrap.max_width = wrap_width;

    let text = storage.text();
    for (span, attributes) in storage.attribute_runs(Span::new(0, text.len())) {
        job.append(span_text(text, span), 0.0, text_format(&attributes));
    }
    job
}

/// egui text format for one attribute run.
pub fn text_format(attributes: &RenderAttributes) -> TextFormat {
    let underline = if attributes.underline {
        Stroke::new(1.0, attributes.color)
    } else {
        Stroke::NONE
    };
    TextFormat {
        font_id: attributes.font.egui_font_id(),
        color: attributes.color,
        background: attributes.background.unwrap_or(Color32::TRANSPARENT),
        italics: attributes.font.italic,
        underline,
        ..Default::default()
    }
}

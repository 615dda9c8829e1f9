//! Editable surface: selection plus reversible edits
//!
//! Input processors never mutate storage directly. They go through
//! `EditSurface`, whose edits each push their inverse onto the host's undo
//! stack so a list completion can be undone like any keystroke.
//!
//! `MemorySurface` is the in-memory host used by headless sessions and tests.

use super::storage::{AttributedBuffer, ChangeNotification, TextStorage};
use crate::markdown::style::{AttributeSet, RenderAttributes, TextLink};
use crate::string_utils::{clamp_span, Span};
use log::debug;

/// Default number of undo steps kept.
const MAX_UNDO_SIZE: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// EditSurface Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Storage that also owns a selection and an undo stack.
pub trait EditSurface: TextStorage {
    /// Current selection; a caret is an empty span.
    fn selection(&self) -> Span;

    fn set_selection(&mut self, selection: Span);

    /// Replace `span` with `text`, recording the inverse edit.
    ///
    /// With `move_cursor` the caret lands after the inserted text; otherwise
    /// the selection is shifted to follow the text it was on.
    fn replace_with_undo(&mut self, span: Span, text: &str, move_cursor: bool);

    /// Insert `text` at `offset`, recording the inverse edit.
    fn insert_with_undo(&mut self, offset: usize, text: &str) {
        self.replace_with_undo(Span::caret(offset), text, false);
    }
}

/// Where `offset` ends up after `replaced` is swapped for `inserted_len` bytes.
pub fn map_offset(offset: usize, replaced: Span, inserted_len: usize) -> usize {
    if offset <= replaced.start {
        offset
    } else if offset >= replaced.end() {
        offset - replaced.len + inserted_len
    } else {
        replaced.start
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Undo Records
// ─────────────────────────────────────────────────────────────────────────────

/// The edit that reverses a recorded replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InverseEdit {
    /// Span currently holding the inserted text
    span: Span,
    /// Text that was there before
    text: String,
    /// Selection before the edit
    selection: Span,
}

// ─────────────────────────────────────────────────────────────────────────────
// MemorySurface
// ─────────────────────────────────────────────────────────────────────────────

/// `AttributedBuffer` with a selection and bounded undo/redo stacks.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    buffer: AttributedBuffer,
    selection: Span,
    undo_stack: Vec<InverseEdit>,
    redo_stack: Vec<InverseEdit>,
    max_undo_size: usize,
}

impl MemorySurface {
    /// Surface over `text` with the caret at the end.
    pub fn new(text: impl Into<String>, base: RenderAttributes) -> Self {
        let buffer = AttributedBuffer::new(text, base);
        let end = buffer.len();
        Self {
            buffer,
            selection: Span::caret(end),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo_size: MAX_UNDO_SIZE,
        }
    }

    pub fn buffer(&self) -> &AttributedBuffer {
        &self.buffer
    }

    /// Replace the text and return the inverse, without touching the stacks.
    fn apply(&mut self, span: Span, text: &str, move_cursor: bool) -> Option<InverseEdit> {
        let span = clamp_span(self.buffer.text(), span)?;
        let previous = self.buffer.text()[span.as_range()].to_string();
        let inverse = InverseEdit {
            span: Span::new(span.start, text.len()),
            text: previous,
            selection: self.selection,
        };

        self.buffer.replace_characters(span, text);
        self.selection = if move_cursor {
            Span::caret(span.start + text.len())
        } else {
            let start = map_offset(self.selection.start, span, text.len());
            let end = map_offset(self.selection.end(), span, text.len());
            Span::from_bounds(start, end)
        };
        Some(inverse)
    }

    /// Undo the last recorded edit.
    ///
    /// Returns `true` if undo was performed.
    pub fn undo(&mut self) -> bool {
        let Some(edit) = self.undo_stack.pop() else {
            return false;
        };
        if let Some(redo) = self.apply(edit.span, &edit.text, false) {
            self.selection = edit.selection;
            self.redo_stack.push(redo);
            debug!("Undo restored {} bytes at {}", edit.text.len(), edit.span.start);
        }
        true
    }

    /// Redo the last undone edit.
    ///
    /// Returns `true` if redo was performed.
    pub fn redo(&mut self) -> bool {
        let Some(edit) = self.redo_stack.pop() else {
            return false;
        };
        if let Some(undo) = self.apply(edit.span, &edit.text, false) {
            self.selection = edit.selection;
            self.undo_stack.push(undo);
        }
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }
}

impl EditSurface for MemorySurface {
    fn selection(&self) -> Span {
        self.selection
    }

    fn set_selection(&mut self, selection: Span) {
        self.selection = clamp_span(self.buffer.text(), selection)
            .unwrap_or_else(|| Span::caret(self.buffer.len()));
    }

    fn replace_with_undo(&mut self, span: Span, text: &str, move_cursor: bool) {
        if let Some(inverse) = self.apply(span, text, move_cursor) {
            self.undo_stack.push(inverse);
            if self.undo_stack.len() > self.max_undo_size {
                self.undo_stack.remove(0);
            }
            self.redo_stack.clear();
        }
    }
}

impl TextStorage for MemorySurface {
    fn text(&self) -> &str {
        self.buffer.text()
    }

    fn attributes_at(&self, offset: usize) -> Option<RenderAttributes> {
        self.buffer.attributes_at(offset)
    }

    fn attribute_runs(&self, span: Span) -> Vec<(Span, RenderAttributes)> {
        self.buffer.attribute_runs(span)
    }

    fn set_attributes(&mut self, span: Span, attributes: RenderAttributes) {
        self.buffer.set_attributes(span, attributes);
    }

    fn add_attributes(&mut self, span: Span, attributes: &AttributeSet) {
        self.buffer.add_attributes(span, attributes);
    }

    fn add_link(&mut self, span: Span, link: TextLink) {
        self.buffer.add_link(span, link);
    }

    fn link_at(&self, offset: usize) -> Option<(Span, TextLink)> {
        self.buffer.link_at(offset)
    }

    fn replace_characters(&mut self, span: Span, text: &str) {
        self.buffer.replace_characters(span, text);
    }

    fn begin_editing(&mut self) {
        self.buffer.begin_editing();
    }

    fn end_editing(&mut self) {
        self.buffer.end_editing();
    }

    fn take_notifications(&mut self) -> Vec<ChangeNotification> {
        self.buffer.take_notifications()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

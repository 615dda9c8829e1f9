//! Attributed text storage
//!
//! `TextStorage` is the seam between the editing core and whatever owns the
//! text on screen. The highlighter only ever talks to this trait: it reads
//! the text, overwrites or merges attributes over spans, and tags spans with
//! links. Edits inside a `begin_editing`/`end_editing` pair are reported to
//! observers as a single change notification.
//!
//! `AttributedBuffer` is the in-memory implementation. Attributes are kept as
//! a list of runs whose lengths add up to the text length; adjacent runs with
//! equal attributes are always coalesced.

use crate::markdown::style::{AttributeSet, RenderAttributes, TextLink};
use crate::string_utils::{clamp_span, Span};
use log::trace;

// ─────────────────────────────────────────────────────────────────────────────
// Change Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Describes one batch of character edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotification {
    /// Span of the new text, in post-edit offsets
    pub edited: Span,
    /// Change in total length
    pub delta: isize,
}

impl ChangeNotification {
    /// Span the batch replaced, in pre-edit offsets.
    pub fn replaced(&self) -> Span {
        let replaced_len = self.edited.len as isize - self.delta;
        Span::new(self.edited.start, replaced_len.max(0) as usize)
    }

    /// Fold a later edit into this notification.
    ///
    /// `replaced` is the pre-edit span of the later edit, `inserted_len` the
    /// length of its replacement.
    fn absorb(self, replaced: Span, inserted_len: usize) -> Self {
        let delta = inserted_len as isize - replaced.len as isize;
        let prev = self.edited;
        let adjusted = if prev.end() <= replaced.start {
            prev
        } else if prev.start >= replaced.end() {
            Span::new(shift(prev.start, delta), prev.len)
        } else {
            let start = prev.start.min(replaced.start);
            let end = shift(prev.end(), delta).max(replaced.start + inserted_len);
            Span::from_bounds(start, end)
        };
        Self {
            edited: adjusted.union(&Span::new(replaced.start, inserted_len)),
            delta: self.delta + delta,
        }
    }
}

fn shift(offset: usize, delta: isize) -> usize {
    offset.saturating_add_signed(delta)
}

// ─────────────────────────────────────────────────────────────────────────────
// TextStorage Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable attributed text the highlighter writes into.
///
/// Spans outside the text are ignored by every mutating method.
pub trait TextStorage {
    /// Full text of the page.
    fn text(&self) -> &str;

    /// Length of the text in bytes.
    fn len(&self) -> usize {
        self.text().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attributes of the character at `offset`.
    ///
    /// At the end of the text this is the last character's attributes (the
    /// attributes new typing inherits). `None` only for empty text.
    fn attributes_at(&self, offset: usize) -> Option<RenderAttributes>;

    /// Attribute runs intersecting `span`, clipped to it.
    fn attribute_runs(&self, span: Span) -> Vec<(Span, RenderAttributes)>;

    /// Replace all attributes over `span`.
    fn set_attributes(&mut self, span: Span, attributes: RenderAttributes);

    /// Overwrite only the keys present in `attributes` over `span`.
    fn add_attributes(&mut self, span: Span, attributes: &AttributeSet);

    /// Tag `span` with a click target.
    fn add_link(&mut self, span: Span, link: TextLink);

    /// Link at `offset` together with the full contiguous span carrying it.
    fn link_at(&self, offset: usize) -> Option<(Span, TextLink)>;

    /// Replace the characters in `span` with `text`.
    ///
    /// Inserted text takes the attributes of the character before `span`.
    fn replace_characters(&mut self, span: Span, text: &str);

    /// Open an editing batch. Batches nest.
    fn begin_editing(&mut self);

    /// Close an editing batch; the outermost close publishes one notification.
    fn end_editing(&mut self);

    /// Drain the change notifications published so far, oldest first.
    ///
    /// Storage that does not track changes returns nothing.
    fn take_notifications(&mut self) -> Vec<ChangeNotification> {
        Vec::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AttributedBuffer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Run {
    start: usize,
    len: usize,
    attributes: RenderAttributes,
}

impl Run {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// In-memory attributed string.
///
/// Runs carry their start offset, so lookups are binary searches and edits
/// only merge the runs next to the span they touched.
#[derive(Debug, Clone)]
pub struct AttributedBuffer {
    text: String,
    runs: Vec<Run>,
    /// Attributes given to text inserted into an empty buffer
    base: RenderAttributes,
    editing_depth: usize,
    pending: Option<ChangeNotification>,
    notifications: Vec<ChangeNotification>,
}

impl AttributedBuffer {
    /// Create a buffer holding `text` in `base` attributes.
    pub fn new(text: impl Into<String>, base: RenderAttributes) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run {
                start: 0,
                len: text.len(),
                attributes: base.clone(),
            }]
        };
        Self {
            text,
            runs,
            base,
            editing_depth: 0,
            pending: None,
            notifications: Vec::new(),
        }
    }

    /// Whether an editing batch is open.
    pub fn is_editing(&self) -> bool {
        self.editing_depth > 0
    }

    /// Number of attribute runs (after coalescing).
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Index of the first run ending after `offset`.
    fn first_run_after(&self, offset: usize) -> usize {
        self.runs.partition_point(|run| run.end() <= offset)
    }

    /// Index of the run containing `offset`.
    fn run_index(&self, offset: usize) -> Option<usize> {
        let index = self.first_run_after(offset);
        (index < self.runs.len()).then_some(index)
    }

    /// Split the run containing `offset` so a run boundary falls on it.
    ///
    /// Returns the index of the first run starting at or after `offset`.
    fn split_at(&mut self, offset: usize) -> usize {
        let Some(index) = self.run_index(offset) else {
            return self.runs.len();
        };
        let run = &mut self.runs[index];
        if run.start == offset {
            return index;
        }
        let tail = Run {
            start: offset,
            len: run.end() - offset,
            attributes: run.attributes.clone(),
        };
        run.len = offset - run.start;
        self.runs.insert(index + 1, tail);
        index + 1
    }

    /// Merge equal neighbours among runs `from..to` and the run on each side.
    fn coalesce_around(&mut self, from: usize, to: usize) {
        let mut index = from.saturating_sub(1);
        let mut end = (to + 1).min(self.runs.len());
        while index + 1 < end {
            if self.runs[index].attributes == self.runs[index + 1].attributes {
                let next = self.runs.remove(index + 1);
                self.runs[index].len += next.len;
                end -= 1;
            } else {
                index += 1;
            }
        }
    }

    /// Apply `update` to the attributes of every run over `span`.
    fn update_span(&mut self, span: Span, mut update: impl FnMut(&mut RenderAttributes)) {
        let Some(span) = clamp_span(&self.text, span) else {
            return;
        };
        if span.is_empty() {
            return;
        }
        let first = self.split_at(span.start);
        let last = self.split_at(span.end());
        for run in &mut self.runs[first..last] {
            update(&mut run.attributes);
        }
        self.coalesce_around(first, last);
    }

    fn record_change(&mut self, replaced: Span, inserted_len: usize) {
        let delta = inserted_len as isize - replaced.len as isize;
        let notification = match self.pending.take() {
            Some(pending) => pending.absorb(replaced, inserted_len),
            None => ChangeNotification {
                edited: Span::new(replaced.start, inserted_len),
                delta,
            },
        };
        if self.is_editing() {
            self.pending = Some(notification);
        } else {
            self.notifications.push(notification);
        }
    }
}

impl TextStorage for AttributedBuffer {
    fn text(&self) -> &str {
        &self.text
    }

    fn attributes_at(&self, offset: usize) -> Option<RenderAttributes> {
        if self.text.is_empty() {
            return None;
        }
        let offset = offset.min(self.text.len() - 1);
        self.run_index(offset)
            .map(|index| self.runs[index].attributes.clone())
    }

    fn attribute_runs(&self, span: Span) -> Vec<(Span, RenderAttributes)> {
        self.runs[self.first_run_after(span.start)..]
            .iter()
            .take_while(|run| run.start < span.end())
            .filter_map(|run| {
                let start = run.start.max(span.start);
                let end = run.end().min(span.end());
                (start < end).then(|| (Span::from_bounds(start, end), run.attributes.clone()))
            })
            .collect()
    }

    fn set_attributes(&mut self, span: Span, attributes: RenderAttributes) {
        self.update_span(span, |attrs| *attrs = attributes.clone());
    }

    fn add_attributes(&mut self, span: Span, attributes: &AttributeSet) {
        if attributes.is_empty() {
            return;
        }
        self.update_span(span, |attrs| attrs.merge(attributes));
    }

    fn add_link(&mut self, span: Span, link: TextLink) {
        self.update_span(span, |attrs| attrs.link = Some(link.clone()));
    }

    fn link_at(&self, offset: usize) -> Option<(Span, TextLink)> {
        let index = self.run_index(offset)?;
        let link = self.runs[index].attributes.link.clone()?;
        let carries_link = |run: &&Run| run.attributes.link.as_ref() == Some(&link);

        let start = self.runs[..index]
            .iter()
            .rev()
            .take_while(carries_link)
            .last()
            .map_or(self.runs[index].start, |run| run.start);
        let end = self.runs[index..]
            .iter()
            .take_while(carries_link)
            .last()
            .map_or(self.runs[index].end(), Run::end);
        Some((Span::from_bounds(start, end), link))
    }

    fn replace_characters(&mut self, span: Span, text: &str) {
        let Some(span) = clamp_span(&self.text, span) else {
            return;
        };
        if span.is_empty() && text.is_empty() {
            return;
        }

        let inherited = if span.start > 0 {
            self.attributes_at(span.start - 1)
        } else {
            self.attributes_at(span.end())
        }
        .unwrap_or_else(|| self.base.clone());

        let first = self.split_at(span.start);
        let last = self.split_at(span.end());
        self.runs.drain(first..last);
        let mut after = first;
        if !text.is_empty() {
            self.runs.insert(
                first,
                Run {
                    start: span.start,
                    len: text.len(),
                    attributes: inherited,
                },
            );
            after += 1;
        }
        let delta = text.len() as isize - span.len as isize;
        for run in &mut self.runs[after..] {
            run.start = shift(run.start, delta);
        }
        self.text.replace_range(span.as_range(), text);
        self.coalesce_around(first, after);

        trace!(
            "Replaced {:?} with {} bytes (buffer now {} bytes)",
            span,
            text.len(),
            self.text.len()
        );
        self.record_change(span, text.len());
    }

    fn begin_editing(&mut self) {
        self.editing_depth += 1;
    }

    fn end_editing(&mut self) {
        if self.editing_depth == 0 {
            return;
        }
        self.editing_depth -= 1;
        if self.editing_depth == 0 {
            if let Some(notification) = self.pending.take() {
                self.notifications.push(notification);
            }
        }
    }

    fn take_notifications(&mut self) -> Vec<ChangeNotification> {
        std::mem::take(&mut self.notifications)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Spans and UTF-8 safe offset utilities
//!
//! Every offset in the crate is a UTF-8 byte offset into the page text. Hosts
//! hand us offsets from their own cursor bookkeeping, so before slicing we
//! snap them to character boundaries and clamp them to the buffer.
//!
//! # Example
//! ```ignore
//! use crate::string_utils::{paragraph_range, Span};
//!
//! let text = "# Title\nbody text\n";
//! let para = paragraph_range(text, Span::caret(10));
//! assert_eq!(para, Span::new(8, 10)); // "body text\n"
//! ```

use std::ops::Range;

// ─────────────────────────────────────────────────────────────────────────────
// Span
// ─────────────────────────────────────────────────────────────────────────────

/// Half-open interval `[start, start + len)` over buffer offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    /// Create a span from a start offset and a length.
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Zero-length span at `offset` (a cursor position).
    pub const fn caret(offset: usize) -> Self {
        Self { start: offset, len: 0 }
    }

    /// Create a span from start and end offsets. Reversed bounds are swapped.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        Self::new(lo, hi - lo)
    }

    /// Exclusive end offset.
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the span lies completely inside a buffer of `buffer_len` bytes.
    pub const fn fits(&self, buffer_len: usize) -> bool {
        self.start <= buffer_len && self.len <= buffer_len - self.start
    }

    /// Whether the two spans share at least one offset, or touch when either is empty.
    pub fn intersects(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.start <= other.end() && other.start <= self.end();
        }
        self.start < other.end() && other.start < self.end()
    }

    /// Translate a range relative to this span into absolute offsets.
    pub fn absolute(&self, relative: Range<usize>) -> Span {
        Span::from_bounds(self.start + relative.start, self.start + relative.end)
    }

    /// Smallest span covering both spans.
    pub fn union(&self, other: &Span) -> Span {
        Span::from_bounds(self.start.min(other.start), self.end().max(other.end()))
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::from_bounds(range.start, range.end)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Character Boundary Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the largest index that is less than or equal to `index`
/// and is on a UTF-8 character boundary.
///
/// If `index` is greater than the string length, returns the string length.
#[inline]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Returns the smallest index that is greater than or equal to `index`
/// and is on a UTF-8 character boundary.
#[inline]
pub fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Clamp a span to the buffer and snap both ends to character boundaries.
///
/// Returns `None` when the span starts past the end of the buffer.
pub fn clamp_span(s: &str, span: Span) -> Option<Span> {
    if span.start > s.len() {
        return None;
    }
    let start = floor_char_boundary(s, span.start);
    let end = ceil_char_boundary(s, span.end().min(s.len()));
    Some(Span::from_bounds(start, end))
}

// ─────────────────────────────────────────────────────────────────────────────
// Paragraph Boundaries
// ─────────────────────────────────────────────────────────────────────────────

/// Expand `span` to the full paragraphs (newline-delimited lines) it touches.
///
/// The result includes the trailing `\n` of the last paragraph when there is
/// one, so a paragraph range always ends on a line boundary. A caret at the
/// very end of a buffer that ends with `\n` yields an empty range: the cursor
/// sits on an empty last line.
pub fn paragraph_range(s: &str, span: Span) -> Span {
    let start = floor_char_boundary(s, span.start.min(s.len()));
    let end = span.end().min(s.len()).max(start);

    let para_start = s[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);

    // A non-empty span whose last character is a newline ends on that line.
    let search_from = if end > start { end - 1 } else { start };
    let search_from = floor_char_boundary(s, search_from);
    let para_end = s[search_from..]
        .find('\n')
        .map(|i| search_from + i + 1)
        .unwrap_or(s.len());

    Span::from_bounds(para_start, para_end)
}

/// Slice the text covered by `span`, or `""` if it does not fit.
pub fn span_text(s: &str, span: Span) -> &str {
    if !span.fits(s.len()) {
        return "";
    }
    s.get(span.as_range()).unwrap_or("")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

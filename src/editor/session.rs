//! Edit session for one open page
//!
//! The session sits between the host's text view and the core. The host
//! calls `should_change_text` before applying a keystroke and
//! `text_did_change` after; the session runs the input pipeline, restyles
//! only the paragraphs an edit touched, and tracks whether the page needs
//! saving.
//!
//! ```text
//! Clean ──should_change_text──▶ Editing ──text_did_change──▶ Dirty
//!   ▲                                                          │
//!   └──────────────────────────── persist ─────────────────────┘
//! ```

use super::input::{InputPipeline, ProcessorOutcome};
use super::latex::{LatexPreviews, LatexRenderer};
use super::storage::TextStorage;
use super::surface::{map_offset, EditSurface};
use crate::config::{EditorConfiguration, Settings};
use crate::error::{Error, Result};
use crate::markdown::highlight::{apply_highlighting, highlight_all, DocumentContext};
use crate::markdown::metrics::{EstimatedMetrics, TextMetrics};
use crate::markdown::style::TextLink;
use crate::notebook::{Notebook, PageSink};
use crate::string_utils::{paragraph_range, span_text, Span};
use image::RgbaImage;
use log::{debug, info, warn};

/// Where the page is in its edit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Matches what was last persisted
    Clean,
    /// A keystroke was accepted and the host has not applied it yet
    Editing,
    /// Has unsaved changes
    Dirty,
}

/// An image preview to show next to a link.
#[derive(Debug, Clone)]
pub struct Popover {
    /// Span of the link the preview belongs to
    pub anchor: Span,
    pub image: RgbaImage,
}

/// The keystroke between `should_change_text` and `text_did_change`.
#[derive(Debug, Clone, Copy)]
struct PendingEdit {
    range: Span,
    inserted: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// EditSession
// ─────────────────────────────────────────────────────────────────────────────

/// Controller for one page open in an `EditSurface`.
pub struct EditSession<S: EditSurface> {
    surface: S,
    config: EditorConfiguration,
    pipeline: InputPipeline,
    metrics: Box<dyn TextMetrics>,
    /// File name of the page being edited
    page: Option<String>,
    latex_previews: bool,
    previews: LatexPreviews,
    pending: Option<PendingEdit>,
    dirty: bool,
}

impl<S: EditSurface> std::fmt::Debug for EditSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("page", &self.page)
            .field("state", &self.state())
            .field("pipeline", &self.pipeline)
            .field("pending_previews", &self.previews.pending_count())
            .finish()
    }
}

impl<S: EditSurface> EditSession<S> {
    /// Session with the default markdown pipeline and LaTeX previews on.
    pub fn new(surface: S, config: EditorConfiguration) -> Self {
        Self {
            surface,
            config,
            pipeline: InputPipeline::default(),
            metrics: Box::new(EstimatedMetrics),
            page: None,
            latex_previews: true,
            previews: LatexPreviews::new(),
            pending: None,
            dirty: false,
        }
    }

    /// Session configured from user settings.
    pub fn from_settings(surface: S, settings: &Settings, host_dark_mode: bool) -> Self {
        Self::new(surface, EditorConfiguration::from_settings(settings, host_dark_mode))
            .with_pipeline(InputPipeline::markdown(settings.lists))
            .with_latex_previews(settings.latex_previews)
    }

    /// Name the page being edited; persistence and LaTeX requests use it.
    pub fn with_page(mut self, file_name: impl Into<String>) -> Self {
        self.page = Some(file_name.into());
        self
    }

    pub fn with_pipeline(mut self, pipeline: InputPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_metrics(mut self, metrics: Box<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_latex_previews(mut self, enabled: bool) -> Self {
        self.latex_previews = enabled;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access for host bookkeeping such as undo or selection changes.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn config(&self) -> &EditorConfiguration {
        &self.config
    }

    /// Swap the configuration (theme or font change) and restyle everything.
    pub fn set_config(&mut self, config: EditorConfiguration) {
        self.config = config;
        self.highlight_all();
    }

    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    pub fn text(&self) -> &str {
        self.surface.text()
    }

    pub fn state(&self) -> SessionState {
        if self.pending.is_some() {
            SessionState::Editing
        } else if self.dirty {
            SessionState::Dirty
        } else {
            SessionState::Clean
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of LaTeX renders still outstanding.
    pub fn pending_previews(&self) -> usize {
        self.previews.pending_count()
    }

    /// Restyle the paragraphs touched by `range`.
    fn highlight(&mut self, range: Span) -> Option<Span> {
        let mut document = DocumentContext::new(self.metrics.as_ref());
        if let Some(page) = self.page.as_deref() {
            document = document.with_page(page);
        }
        apply_highlighting(range, &mut self.surface, &self.config, &document)
    }

    /// Restyle the whole page, as on first open.
    pub fn highlight_all(&mut self) -> Option<Span> {
        let mut document = DocumentContext::new(self.metrics.as_ref());
        if let Some(page) = self.page.as_deref() {
            document = document.with_page(page);
        }
        highlight_all(&mut self.surface, &self.config, &document)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Host Callbacks
    // ─────────────────────────────────────────────────────────────────────────

    /// Drain the surface's change notifications.
    ///
    /// LaTeX requests follow each edit, and the result is the span covering
    /// every edit in current offsets. `None` when nothing was reported.
    fn absorb_changes(&mut self) -> Option<Span> {
        let mut touched: Option<Span> = None;
        for change in self.surface.take_notifications() {
            let replaced = change.replaced();
            let inserted = change.edited.len;
            self.previews
                .apply_edit(self.page.as_deref(), replaced, inserted);
            touched = Some(match touched {
                Some(span) => Span::from_bounds(
                    map_offset(span.start, replaced, inserted),
                    map_offset(span.end(), replaced, inserted),
                )
                .union(&change.edited),
                None => change.edited,
            });
        }
        touched
    }

    /// Restyle the paragraphs holding `edited`.
    fn restyle_edit(&mut self, edited: Span) -> Option<Span> {
        let len = self.surface.len();
        let edited = if edited.fits(len) {
            edited
        } else {
            Span::caret(edited.start.min(len))
        };
        // Text after an inserted newline now starts a paragraph of its own
        let target = if span_text(self.surface.text(), edited).contains('\n') {
            Span::from_bounds(edited.start, (edited.end() + 1).min(len))
        } else {
            edited
        };
        self.highlight(target)
    }

    /// Called before the host replaces `range` with `replacement`.
    ///
    /// Returns whether the host should apply the keystroke itself. When an
    /// input processor handled it, the buffer is already edited, the page is
    /// dirty and the touched paragraphs are restyled.
    pub fn should_change_text(&mut self, range: Span, replacement: Option<&str>) -> bool {
        self.pending = Some(PendingEdit {
            range,
            inserted: replacement.map_or(0, str::len),
        });

        let len = self.surface.len();
        let line_start = paragraph_range(self.surface.text(), Span::caret(range.start.min(len))).start;

        match self.pipeline.run(&mut self.surface, range, replacement) {
            ProcessorOutcome::Proceed => true,
            ProcessorOutcome::Handled => {
                self.pending = None;
                self.dirty = true;

                let touched = self.absorb_changes().unwrap_or_else(|| {
                    // Processors edit from the start of the line up to the caret
                    let len = self.surface.len();
                    let caret = self.surface.selection().end();
                    let touched =
                        Span::from_bounds(line_start.min(len), caret.max(line_start).min(len));
                    self.previews
                        .apply_edit(self.page.as_deref(), touched, touched.len);
                    touched
                });
                self.restyle_edit(touched);
                false
            }
        }
    }

    /// Called after the host applied the keystroke.
    ///
    /// Restyles the paragraphs around the edit and returns the restyled
    /// range.
    pub fn text_did_change(&mut self) -> Option<Span> {
        self.dirty = true;
        let pending = self.pending.take();

        let edited = match (self.absorb_changes(), pending) {
            (Some(edited), _) => edited,
            (None, Some(edit)) => {
                self.previews
                    .apply_edit(self.page.as_deref(), edit.range, edit.inserted);
                Span::new(edit.range.start, edit.inserted)
            }
            (None, None) => {
                debug!("Text changed outside a keystroke; restyling around the selection");
                Span::caret(self.surface.selection().start)
            }
        };
        self.restyle_edit(edited)
    }

    /// Run a keystroke through both callbacks, for hosts without a text view.
    ///
    /// Returns whether the default insertion was applied.
    pub fn apply_keystroke(&mut self, range: Span, text: &str) -> bool {
        if !self.should_change_text(range, Some(text)) {
            return false;
        }
        self.surface.replace_with_undo(range, text, true);
        self.text_did_change();
        true
    }

    /// Write the page through `sink` if it has unsaved changes.
    ///
    /// Returns whether anything was written.
    pub fn persist(&mut self, sink: &mut dyn PageSink) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let page = self
            .page
            .as_deref()
            .ok_or_else(|| Error::Application("No page is open in this session".to_string()))?;
        sink.write_page(page, self.surface.text())?;
        self.dirty = false;
        info!("Persisted page {}", page);
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links and Previews
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle a click at `offset`.
    ///
    /// An image link returns its preview right away. A LaTeX link submits a
    /// render request; its preview arrives later through `poll_previews`.
    pub fn click_link(
        &mut self,
        offset: usize,
        notebook: &Notebook,
        renderer: &dyn LatexRenderer,
    ) -> Result<Option<Popover>> {
        let Some((anchor, link)) = self.surface.link_at(offset) else {
            return Ok(None);
        };

        match link {
            TextLink::Image(name) => {
                let Some(stored) = notebook.image(&name) else {
                    warn!("Clicked image '{}' is not in the notebook", name);
                    return Ok(None);
                };
                let image = stored.decode()?;
                Ok(Some(Popover { anchor, image }))
            }
            TextLink::Latex(source) => {
                if self.latex_previews {
                    self.previews
                        .request(renderer, self.page.as_deref(), anchor, &source);
                } else {
                    debug!("LaTeX previews are disabled");
                }
                Ok(None)
            }
        }
    }

    /// Finished LaTeX previews whose link is still in the page unchanged.
    pub fn poll_previews(&mut self) -> Vec<Popover> {
        self.previews
            .poll(&self.surface, self.page.as_deref())
            .into_iter()
            .map(|preview| Popover {
                anchor: preview.anchor,
                image: preview.image,
            })
            .collect()
    }

    /// Drop everything outstanding for the page. Unsaved changes stay until
    /// `persist`.
    pub fn close(&mut self) {
        self.pending = None;
        self.previews.cancel_page(self.page.as_deref());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListSettings;
    use crate::editor::latex::RenderCallback;
    use crate::editor::surface::MemorySurface;
    use crate::fonts::FontKind;
    use crate::markdown::style::{RenderAttributes, HIDDEN_SIZE};
    use std::cell::RefCell;

    fn session(text: &str) -> EditSession<MemorySurface> {
        let config = EditorConfiguration::default();
        let surface = MemorySurface::new(text, RenderAttributes::base(&config));
        let mut session = EditSession::new(surface, config).with_page("Page.md");
        session.highlight_all();
        session
    }

    fn type_at_end(session: &mut EditSession<MemorySurface>, text: &str) -> bool {
        let end = session.text().len();
        session.apply_keystroke(Span::caret(end), text)
    }

    #[derive(Default)]
    struct DeferredRenderer {
        callbacks: RefCell<Vec<RenderCallback>>,
    }

    impl LatexRenderer for DeferredRenderer {
        fn render(&self, _source: &str, on_ready: RenderCallback) {
            self.callbacks.borrow_mut().push(on_ready);
        }
    }

    impl DeferredRenderer {
        fn finish_all(&self) {
            for callback in self.callbacks.borrow_mut().drain(..) {
                callback(RgbaImage::new(4, 4));
            }
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut s = session("abc");
        assert_eq!(s.state(), SessionState::Clean);

        assert!(s.should_change_text(Span::caret(3), Some("d")));
        assert_eq!(s.state(), SessionState::Editing);

        s.surface_mut().replace_with_undo(Span::caret(3), "d", true);
        s.text_did_change();
        assert_eq!(s.state(), SessionState::Dirty);

        let mut notebook = Notebook::empty();
        notebook.new_page("Page").unwrap();
        assert!(s.persist(&mut notebook).unwrap());
        assert_eq!(s.state(), SessionState::Clean);
        assert_eq!(notebook.page("Page.md").unwrap().contents, "abcd");
        assert!(!s.persist(&mut notebook).unwrap());
    }

    #[test]
    fn test_typing_restyles_edited_paragraph() {
        let mut s = session("plain\n**bold*");
        assert_eq!(s.surface().attributes_at(6).unwrap().font.size, s.config().default_font.size);

        type_at_end(&mut s, "*");
        assert_eq!(s.text(), "plain\n**bold**");
        assert_eq!(s.surface().attributes_at(6).unwrap().font.size, HIDDEN_SIZE);
        assert!(s.surface().attributes_at(8).unwrap().font.weight.is_bold());
    }

    #[test]
    fn test_handled_keystroke_marks_dirty_and_restyles() {
        let mut s = session("- item");
        assert!(!type_at_end(&mut s, "\n"));
        assert_eq!(s.text(), "- item\n- ");
        assert_eq!(s.state(), SessionState::Dirty);

        // The new bullet line carries the list paragraph style
        let bullet = s.surface().attributes_at(7).unwrap();
        assert!(bullet.paragraph.is_some());
    }

    #[test]
    fn test_deletion_restyles_line() {
        let mut s = session("ab\n# Title");
        let end = s.text().len();
        assert!(s.should_change_text(Span::new(end - 1, 1), Some("")));
        s.surface_mut().replace_with_undo(Span::new(end - 1, 1), "", true);
        assert_eq!(s.text_did_change(), Some(Span::new(3, 6)));
        assert_eq!(s.surface().attributes_at(3).unwrap().font.size, HIDDEN_SIZE);
    }

    #[test]
    fn test_restyles_what_the_host_actually_changed() {
        let mut s = session("ab\n# Title");
        // The host announces an insertion but ends up truncating the text
        assert!(s.should_change_text(Span::caret(10), Some("!!")));
        s.surface_mut().replace_with_undo(Span::new(8, 2), "", true);
        assert_eq!(s.text_did_change(), Some(Span::new(3, 5)));
    }

    #[test]
    fn test_enter_mid_heading_restyles_both_lines() {
        let mut s = session("# Title");
        let default_size = s.config().default_font.size;
        assert!(s.apply_keystroke(Span::caret(4), "\n"));
        assert_eq!(s.text(), "# Ti\ntle");

        assert!(s.surface().attributes_at(2).unwrap().font.size > default_size);
        let moved = s.surface().attributes_at(5).unwrap();
        assert_eq!(moved.font.size, default_size);
        assert_eq!(moved.color, s.config().default_color);
    }

    #[test]
    fn test_notifications_are_drained() {
        let mut s = session("");
        for _ in 0..50 {
            type_at_end(&mut s, "a");
        }
        type_at_end(&mut s, "\n");
        assert!(s.surface_mut().take_notifications().is_empty());

        let mut list = session("- item");
        type_at_end(&mut list, "\n");
        assert!(list.surface_mut().take_notifications().is_empty());
    }

    #[test]
    fn test_undo_is_restyled_on_next_change() {
        let mut s = session("**b**");
        assert!(s.should_change_text(Span::new(4, 1), Some("")));
        s.surface_mut().replace_with_undo(Span::new(4, 1), "", true);
        s.text_did_change();
        assert!(!s.surface().attributes_at(0).unwrap().is_hidden());

        // Undo happens behind the session's back; the next change picks it up
        assert!(s.surface_mut().undo());
        s.text_did_change();
        assert_eq!(s.text(), "**b**");
        assert!(s.surface().attributes_at(0).unwrap().is_hidden());
    }

    #[test]
    fn test_persist_without_page_is_error() {
        let config = EditorConfiguration::default();
        let surface = MemorySurface::new("", RenderAttributes::base(&config));
        let mut s = EditSession::new(surface, config);
        s.apply_keystroke(Span::caret(0), "x");

        let mut notebook = Notebook::empty();
        assert!(matches!(
            s.persist(&mut notebook),
            Err(Error::Application(_))
        ));
        assert!(s.is_dirty());
    }

    #[test]
    fn test_click_image_link() {
        let mut s = session("![cat](cat.png) ![dog](dog.png)");
        let mut notebook = Notebook::empty();
        let mut png = Vec::new();
        RgbaImage::new(3, 2)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        notebook.add_image("cat.png", png);
        let renderer = DeferredRenderer::default();

        let popover = s.click_link(8, &notebook, &renderer).unwrap().unwrap();
        assert_eq!(popover.anchor, Span::new(7, 7));
        assert_eq!(popover.image.dimensions(), (3, 2));

        // Missing image and plain text give nothing
        assert!(s.click_link(25, &notebook, &renderer).unwrap().is_none());
        assert!(s.click_link(15, &notebook, &renderer).unwrap().is_none());
    }

    #[test]
    fn test_latex_preview_delivery() {
        let mut s = session("x $a+b$ y");
        let notebook = Notebook::empty();
        let renderer = DeferredRenderer::default();

        assert!(s.click_link(4, &notebook, &renderer).unwrap().is_none());
        assert_eq!(s.pending_previews(), 1);
        assert!(s.poll_previews().is_empty());

        renderer.finish_all();
        let ready = s.poll_previews();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].anchor, Span::new(3, 3));
        assert_eq!(s.pending_previews(), 0);
    }

    #[test]
    fn test_latex_preview_dropped_after_edit() {
        let mut s = session("x $a+b$ y");
        let notebook = Notebook::empty();
        let renderer = DeferredRenderer::default();

        s.click_link(4, &notebook, &renderer).unwrap();
        s.apply_keystroke(Span::caret(4), "c");
        assert_eq!(s.pending_previews(), 0);

        renderer.finish_all();
        assert!(s.poll_previews().is_empty());
    }

    #[test]
    fn test_latex_preview_survives_edit_before_link() {
        let mut s = session("x $a+b$ y");
        let notebook = Notebook::empty();
        let renderer = DeferredRenderer::default();

        s.click_link(4, &notebook, &renderer).unwrap();
        s.apply_keystroke(Span::caret(0), "Z");
        s.apply_keystroke(Span::caret(1), "\n");
        assert_eq!(s.text(), "Z\nx $a+b$ y");
        assert_eq!(s.pending_previews(), 1);

        renderer.finish_all();
        let ready = s.poll_previews();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].anchor, Span::new(5, 3));
    }

    #[test]
    fn test_latex_preview_dropped_on_close() {
        let mut s = session("$x$");
        let notebook = Notebook::empty();
        let renderer = DeferredRenderer::default();

        s.click_link(1, &notebook, &renderer).unwrap();
        s.close();
        renderer.finish_all();
        assert!(s.poll_previews().is_empty());
    }

    #[test]
    fn test_latex_previews_disabled() {
        let mut s = session("$x$").with_latex_previews(false);
        let renderer = DeferredRenderer::default();
        s.click_link(1, &Notebook::empty(), &renderer).unwrap();
        assert_eq!(s.pending_previews(), 0);
        assert!(renderer.callbacks.borrow().is_empty());
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            lists: ListSettings {
                continue_lists: false,
                ..ListSettings::default()
            },
            latex_previews: false,
            ..Settings::default()
        };
        let config = EditorConfiguration::from_settings(&settings, false);
        let surface = MemorySurface::new("- item", RenderAttributes::base(&config));
        let mut s = EditSession::from_settings(surface, &settings, false);
        assert!(type_at_end(&mut s, "\n"));
        assert_eq!(s.text(), "- item\n");
    }

    #[test]
    fn test_set_config_restyles() {
        let mut s = session("`code`");
        let mut config = EditorConfiguration::default();
        config.default_font.size = 20.0;
        s.set_config(config);
        let code = s.surface().attributes_at(2).unwrap();
        assert_eq!(code.font.kind, FontKind::Monospace);
        assert_eq!(code.font.size, 20.0);
    }
}

//! End-to-end editing behaviour through the public API.

use quillmark::config::EditorConfiguration;
use quillmark::editor::{
    AttributedBuffer, EditSession, EditSurface, LatexRenderer, MemorySurface, RenderCallback,
    TextStorage,
};
use quillmark::fonts::FontKind;
use quillmark::markdown::{
    apply_highlighting, highlight_all, DocumentContext, RenderAttributes, HIDDEN_SIZE,
};
use quillmark::notebook::Notebook;
use quillmark::string_utils::Span;
use std::sync::mpsc::{channel, Sender};
use std::thread;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session(text: &str) -> EditSession<MemorySurface> {
    init_logging();
    let config = EditorConfiguration::default();
    let surface = MemorySurface::new(text, RenderAttributes::base(&config));
    let mut session = EditSession::new(surface, config).with_page("Notes.md");
    session.highlight_all();
    session
}

fn press(session: &mut EditSession<MemorySurface>, key: &str) -> bool {
    let caret = session.surface().selection();
    session.apply_keystroke(caret, key)
}

fn runs(storage: &dyn TextStorage) -> Vec<(Span, RenderAttributes)> {
    storage.attribute_runs(Span::new(0, storage.len()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Highlighting
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_highlighting_is_idempotent() {
    init_logging();
    let config = EditorConfiguration::default();
    let document = DocumentContext::default();
    let text = "# Title\n- **bold** item\n1. `code` and $x^2$\n<img src='a.png'/>\n";
    let mut buffer = AttributedBuffer::new(text, RenderAttributes::base(&config));

    highlight_all(&mut buffer, &config, &document);
    let first = runs(&buffer);
    highlight_all(&mut buffer, &config, &document);
    assert_eq!(runs(&buffer), first);

    // Restyling one line in isolation gives the same result as a full pass
    apply_highlighting(Span::caret(12), &mut buffer, &config, &document);
    assert_eq!(runs(&buffer), first);
}

#[test]
fn test_highlighting_is_local() {
    let mut s = session("# One\n**two**\n- three\n");
    let head = Span::new(0, 6);
    let before_head = s.surface().attribute_runs(head);
    let before_tail = s.surface().attribute_runs(Span::new(14, 8));

    assert!(s.should_change_text(Span::caret(9), Some("x")));
    s.surface_mut().replace_with_undo(Span::caret(9), "x", true);
    assert_eq!(s.text_did_change(), Some(Span::new(6, 9)));
    assert_eq!(s.text(), "# One\n**txwo**\n- three\n");

    // Paragraphs outside the edited one keep exactly the runs they had
    assert_eq!(s.surface().attribute_runs(head), before_head);
    let after_tail: Vec<_> = s
        .surface()
        .attribute_runs(Span::new(15, 8))
        .into_iter()
        .map(|(span, attributes)| (Span::new(span.start - 1, span.len), attributes))
        .collect();
    assert_eq!(after_tail, before_tail);

    // The edited paragraph itself was restyled
    assert_eq!(s.surface().attributes_at(6).unwrap().font.size, HIDDEN_SIZE);
    assert!(s.surface().attributes_at(9).unwrap().font.weight.is_bold());
}

#[test]
fn test_heading_wins_over_bold() {
    let s = session("# **big bold**");
    let config = s.config().clone();
    assert!(s.surface().attributes_at(0).unwrap().is_hidden());

    let inner = s.surface().attributes_at(6).unwrap();
    assert!(inner.font.size > config.default_font.size);
    assert_eq!(inner.color, config.palette.blue);
}

#[test]
fn test_bold_composes_font_weight_and_color() {
    let s = session("a **b** c");
    let body = s.surface().attributes_at(4).unwrap();
    assert_eq!(body.font.kind, FontKind::Monospace);
    assert!(body.font.weight.is_bold());
    assert_eq!(body.color, s.config().palette.red);
}

#[test]
fn test_text_round_trips_through_highlighting() {
    let text = "## Heading\n\n- a\n- b\n\n```\nfn main() {}\n```\n$\\frac{1}{2}$ ![img](p.png)\n";
    let s = session(text);
    assert_eq!(s.text(), text);
}

// ─────────────────────────────────────────────────────────────────────────────
// List Completion
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_bullet_list_continues_then_exits() {
    let mut s = session("- item");
    assert!(!press(&mut s, "\n"));
    assert_eq!(s.text(), "- item\n- ");

    assert!(!press(&mut s, "\n"));
    assert_eq!(s.text(), "- item\n");

    // Typing carries on normally on the empty line
    assert!(press(&mut s, "x"));
    assert_eq!(s.text(), "- item\nx");
}

#[test]
fn test_numbered_list_increments() {
    let mut s = session("3. foo");
    press(&mut s, "\n");
    assert_eq!(s.text(), "3. foo\n4. ");
    press(&mut s, "bar");
    press(&mut s, "\n");
    assert_eq!(s.text(), "3. foo\n4. bar\n5. ");
}

#[test]
fn test_tab_indents_at_any_column() {
    let mut s = session("- first\n- second");
    s.surface_mut().set_selection(Span::caret(12));
    assert!(!press(&mut s, "\t"));
    assert_eq!(s.text(), "- first\n\t- second");
    assert_eq!(s.surface().selection(), Span::caret(13));
}

#[test]
fn test_list_completion_is_one_undo_step() {
    let mut s = session("- item");
    press(&mut s, "\n");
    s.surface_mut().take_notifications();

    assert!(s.surface_mut().undo());
    assert_eq!(s.text(), "- item");
    assert_eq!(s.surface_mut().take_notifications().len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// LaTeX Previews
// ─────────────────────────────────────────────────────────────────────────────

/// Renders on a worker thread, like a real typesetting service.
struct ThreadedRenderer {
    done: Sender<()>,
}

impl LatexRenderer for ThreadedRenderer {
    fn render(&self, _source: &str, on_ready: RenderCallback) {
        let done = self.done.clone();
        thread::spawn(move || {
            on_ready(image::RgbaImage::new(8, 8));
            let _ = done.send(());
        });
    }
}

#[test]
fn test_latex_preview_from_worker_thread() {
    let mut s = session("Euler: $e^{i\\pi}$");
    let (done, finished) = channel();
    let renderer = ThreadedRenderer { done };

    let offset = s.text().find('$').unwrap() + 1;
    assert!(s.click_link(offset, &Notebook::empty(), &renderer).unwrap().is_none());
    finished.recv().unwrap();

    let previews = s.poll_previews();
    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].image.dimensions(), (8, 8));
    let body = s.surface().attributes_at(previews[0].anchor.start).unwrap();
    assert_eq!(body.font.kind, FontKind::Serif);
}

#[test]
fn test_stale_latex_preview_is_dropped() {
    let mut s = session("$a$ and $b$");
    let (done, finished) = channel();
    let renderer = ThreadedRenderer { done };

    s.click_link(9, &Notebook::empty(), &renderer).unwrap();
    finished.recv().unwrap();

    // Editing the linked body before polling invalidates the render
    s.surface_mut().set_selection(Span::caret(10));
    press(&mut s, "c");
    assert_eq!(s.text(), "$a$ and $bc$");
    assert!(s.poll_previews().is_empty());
}

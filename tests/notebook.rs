//! Notebook bundles and page persistence through an edit session.

use quillmark::config::EditorConfiguration;
use quillmark::editor::{EditSession, MemorySurface};
use quillmark::error::Error;
use quillmark::markdown::RenderAttributes;
use quillmark::notebook::bundle::{read_bundle, write_bundle, INFO_FILE};
use quillmark::notebook::Notebook;
use quillmark::string_utils::Span;
use std::fs;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn open_page(notebook: &Notebook, file_name: &str) -> EditSession<MemorySurface> {
    let config = EditorConfiguration::default();
    let contents = notebook.page(file_name).map_or("", |page| page.contents.as_str());
    let surface = MemorySurface::new(contents, RenderAttributes::base(&config));
    let mut session = EditSession::new(surface, config).with_page(file_name);
    session.highlight_all();
    session
}

#[test]
fn test_edit_save_and_reload() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("Journal");

    let mut notebook = Notebook::new();
    write_bundle(&mut notebook, &dir).unwrap();

    let mut session = open_page(&notebook, "Hello world.md");
    let end = session.text().len();
    session.apply_keystroke(Span::caret(end), "\n- first");
    let end = session.text().len();
    session.apply_keystroke(Span::caret(end), "\n");
    assert!(session.persist(&mut notebook).unwrap());
    assert!(notebook.is_dirty());

    assert_eq!(write_bundle(&mut notebook, &dir).unwrap(), 1);
    let reloaded = read_bundle(&dir).unwrap();
    let page = reloaded.page("Hello world.md").unwrap();
    assert_eq!(page.contents, "# Hello, world!\n- first\n- ");
    assert_eq!(page.title(), "Hello, world!");
    assert_eq!(reloaded.open_page().map(|p| p.file_name.as_str()), Some("Hello world.md"));
}

#[test]
fn test_page_titles() {
    let mut notebook = Notebook::empty();
    notebook.new_page("Plans").unwrap().contents = "## Title\nbody".into();
    notebook.new_page("Loose").unwrap().contents = "No heading\nbody".into();

    assert_eq!(notebook.page("Plans.md").unwrap().title(), "Title");
    assert_eq!(notebook.page("Loose.md").unwrap().title(), "No heading");
}

#[test]
fn test_deleted_page_can_be_restored_before_save() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut notebook = Notebook::new();
    notebook.new_page("Draft").unwrap();
    write_bundle(&mut notebook, temp.path()).unwrap();

    let deleted = notebook.delete_page("Draft.md").unwrap();
    notebook.restore_page(deleted).unwrap();
    assert_eq!(write_bundle(&mut notebook, temp.path()).unwrap(), 1);
    assert!(temp.path().join("Draft.md").exists());
}

#[test]
fn test_corrupt_bundle_is_reported() {
    init_logging();
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(INFO_FILE), "not json").unwrap();
    let err = read_bundle(temp.path()).unwrap_err();
    assert!(matches!(err, Error::BundleCorrupt { .. }));
    assert!(err.to_string().contains(INFO_FILE));
}

//! Notebook model
//!
//! A notebook is a set of markdown pages plus the images they embed. Pages
//! refer back to their notebook through a plain `DocumentId` key. On disk a
//! notebook is a bundle directory; see [`bundle`].

pub mod bundle;

use crate::error::{Error, Result};
use image::RgbaImage;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Current `info.json` schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Extension of page files.
pub const PAGE_EXTENSION: &str = "md";

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers and Config
// ─────────────────────────────────────────────────────────────────────────────

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one open notebook for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    /// A fresh id, unique within this process.
    pub fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Contents of `info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookConfig {
    pub version: u32,
    /// File name of the page that was open when the notebook was saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_page: Option<String>,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            open_page: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pages
// ─────────────────────────────────────────────────────────────────────────────

static HEADING_MARKER: OnceLock<Option<Regex>> = OnceLock::new();

fn heading_marker() -> Option<&'static Regex> {
    HEADING_MARKER
        .get_or_init(|| Regex::new(r"^#{1,6}[ \t]+").ok())
        .as_ref()
}

/// One markdown page of a notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub document: DocumentId,
    pub file_name: String,
    pub contents: String,
    /// Contents differ from what is on disk
    pub dirty: bool,
}

impl Page {
    /// A new page that has never been saved.
    pub fn new(document: DocumentId, file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            document,
            file_name: file_name.into(),
            contents: contents.into(),
            dirty: true,
        }
    }

    /// Display title: the first line, without a leading heading marker.
    pub fn title(&self) -> &str {
        let first_line = self.contents.lines().next().unwrap_or("");
        match heading_marker().and_then(|re| re.find(first_line)) {
            Some(marker) => &first_line[marker.end()..],
            None => first_line,
        }
    }
}

/// A removed page, kept so the removal can be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedPage {
    pub index: usize,
    pub page: Page,
    /// The page was the open page when it was deleted
    pub was_selected: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Images
// ─────────────────────────────────────────────────────────────────────────────

/// An image file stored in the notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookImage {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl NotebookImage {
    /// Decode the image into RGBA pixels.
    pub fn decode(&self) -> Result<RgbaImage> {
        image::load_from_memory(&self.data)
            .map(|image| image.to_rgba8())
            .map_err(|source| Error::ImageDecode {
                name: self.file_name.clone(),
                source,
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence Boundary
// ─────────────────────────────────────────────────────────────────────────────

/// Where an edit session writes page contents.
pub trait PageSink {
    fn write_page(&mut self, file_name: &str, contents: &str) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Notebook
// ─────────────────────────────────────────────────────────────────────────────

/// Pages and images of one notebook bundle.
#[derive(Debug, Clone)]
pub struct Notebook {
    pub id: DocumentId,
    pub config: NotebookConfig,
    pages: Vec<Page>,
    images: Vec<NotebookImage>,
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Notebook {
    /// A new notebook with a single greeting page.
    pub fn new() -> Self {
        let mut notebook = Self::empty();
        let page = Page::new(notebook.id, "Hello world.md", "# Hello, world!");
        notebook.config.open_page = Some(page.file_name.clone());
        notebook.pages.push(page);
        notebook
    }

    /// A notebook with no pages or images.
    pub fn empty() -> Self {
        Self::from_parts(NotebookConfig::default(), Vec::new(), Vec::new())
    }

    /// Assemble a notebook; pages are re-keyed to the new notebook id.
    pub fn from_parts(config: NotebookConfig, pages: Vec<Page>, images: Vec<NotebookImage>) -> Self {
        let id = DocumentId::next();
        let pages = pages
            .into_iter()
            .map(|page| Page { document: id, ..page })
            .collect();
        Self {
            id,
            config,
            pages,
            images,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub(crate) fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// Pages ordered by file name, for display.
    pub fn sorted_pages(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.iter().collect();
        pages.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        pages
    }

    pub fn page(&self, file_name: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.file_name == file_name)
    }

    pub fn page_mut(&mut self, file_name: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.file_name == file_name)
    }

    /// The page recorded as open, if it still exists.
    pub fn open_page(&self) -> Option<&Page> {
        self.config
            .open_page
            .as_deref()
            .and_then(|name| self.page(name))
    }

    /// Whether any page has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.pages.iter().any(|page| page.dirty)
    }

    /// Create the page `"{title}.md"` headed by the title and open it.
    pub fn new_page(&mut self, title: &str) -> Result<&mut Page> {
        let title = title.trim();
        if title.is_empty() || title.contains(['/', '\\']) {
            return Err(Error::Application(format!(
                "'{}' is not a valid page title",
                title
            )));
        }
        let file_name = format!("{}.{}", title, PAGE_EXTENSION);
        if self.page(&file_name).is_some() {
            return Err(Error::DuplicatePage(file_name));
        }

        debug!("Creating page {}", file_name);
        self.pages
            .push(Page::new(self.id, file_name.clone(), format!("# {}", title)));
        self.config.open_page = Some(file_name);
        let last = self.pages.len() - 1;
        Ok(&mut self.pages[last])
    }

    /// Remove a page, returning what is needed to restore it.
    pub fn delete_page(&mut self, file_name: &str) -> Result<DeletedPage> {
        let index = self
            .pages
            .iter()
            .position(|page| page.file_name == file_name)
            .ok_or_else(|| Error::PageNotFound(file_name.to_string()))?;

        let page = self.pages.remove(index);
        let was_selected = self.config.open_page.as_deref() == Some(file_name);
        if was_selected {
            self.config.open_page = None;
        }
        info!("Deleted page {}", file_name);
        Ok(DeletedPage {
            index,
            page,
            was_selected,
        })
    }

    /// Undo a deletion. The page comes back dirty so the next save writes it.
    pub fn restore_page(&mut self, deleted: DeletedPage) -> Result<()> {
        if self.page(&deleted.page.file_name).is_some() {
            return Err(Error::DuplicatePage(deleted.page.file_name));
        }
        let DeletedPage {
            index,
            mut page,
            was_selected,
        } = deleted;
        page.dirty = true;
        page.document = self.id;
        if was_selected {
            self.config.open_page = Some(page.file_name.clone());
        }
        let index = index.min(self.pages.len());
        self.pages.insert(index, page);
        Ok(())
    }

    pub fn images(&self) -> &[NotebookImage] {
        &self.images
    }

    pub fn image(&self, file_name: &str) -> Option<&NotebookImage> {
        self.images.iter().find(|image| image.file_name == file_name)
    }

    /// Add or replace an image.
    pub fn add_image(&mut self, file_name: impl Into<String>, data: Vec<u8>) {
        let file_name = file_name.into();
        match self.images.iter_mut().find(|image| image.file_name == file_name) {
            Some(existing) => existing.data = data,
            None => self.images.push(NotebookImage { file_name, data }),
        }
    }
}

impl PageSink for Notebook {
    fn write_page(&mut self, file_name: &str, contents: &str) -> Result<()> {
        let page = self
            .page_mut(file_name)
            .ok_or_else(|| Error::PageNotFound(file_name.to_string()))?;
        if page.contents != contents {
            page.contents = contents.to_string();
            page.dirty = true;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Notebook bundle persistence
//!
//! A bundle is a directory holding:
//!
//! - `info.json`: the notebook config (`{"version": 1, "openPage": "..."}`)
//! - one `*.md` file per page
//! - the image files pages embed
//!
//! Saving writes the config, every dirty page and any image not yet on disk,
//! and removes page files whose page no longer exists.

use super::{Notebook, NotebookConfig, NotebookImage, Page, PAGE_EXTENSION};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the config file inside a bundle.
pub const INFO_FILE: &str = "info.json";

/// File extensions loaded as notebook images.
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_page_file(path: &Path) -> bool {
    extension_of(path).as_deref() == Some(PAGE_EXTENSION)
}

fn is_image_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Regular files directly inside `dir`, sorted by name.
fn bundle_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push((name, entry.path())),
            Err(name) => warn!("Skipping non UTF-8 file name {:?}", name),
        }
    }
    files.sort();
    Ok(files)
}

// ─────────────────────────────────────────────────────────────────────────────
// Read
// ─────────────────────────────────────────────────────────────────────────────

/// Load a notebook from a bundle directory.
///
/// # Errors
///
/// `BundleCorrupt` if `info.json` is missing or invalid. Page files that are
/// not valid UTF-8 are skipped with a warning.
pub fn read_bundle(path: &Path) -> Result<Notebook> {
    let info_path = path.join(INFO_FILE);
    let info = fs::read_to_string(&info_path).map_err(|e| Error::BundleCorrupt {
        path: path.to_path_buf(),
        message: format!("cannot read {}: {}", INFO_FILE, e),
    })?;
    let config: NotebookConfig = serde_json::from_str(&info).map_err(|e| Error::BundleCorrupt {
        path: path.to_path_buf(),
        message: format!("invalid {}: {}", INFO_FILE, e),
    })?;

    let mut pages = Vec::new();
    let mut images = Vec::new();
    for (name, file_path) in bundle_files(path)? {
        if is_page_file(&file_path) {
            match fs::read_to_string(&file_path) {
                Ok(contents) => {
                    let mut page = Page::new(super::DocumentId::next(), name, contents);
                    page.dirty = false;
                    pages.push(page);
                }
                Err(e) => warn!("Skipping unreadable page {}: {}", file_path.display(), e),
            }
        } else if is_image_file(&file_path) {
            let data = fs::read(&file_path)?;
            images.push(NotebookImage {
                file_name: name,
                data,
            });
        }
    }

    info!(
        "Loaded notebook from {} ({} pages, {} images)",
        path.display(),
        pages.len(),
        images.len()
    );
    Ok(Notebook::from_parts(config, pages, images))
}

// ─────────────────────────────────────────────────────────────────────────────
// Write
// ─────────────────────────────────────────────────────────────────────────────

fn write_file(path: PathBuf, contents: &[u8]) -> Result<()> {
    fs::write(&path, contents).map_err(|source| Error::FileWrite { path, source })
}

/// Save a notebook into a bundle directory, creating it if needed.
///
/// Only dirty pages are written; their dirty flags are cleared afterwards.
/// Returns the number of pages written.
pub fn write_bundle(notebook: &mut Notebook, path: &Path) -> Result<usize> {
    if !path.exists() {
        debug!("Creating bundle directory {}", path.display());
        fs::create_dir_all(path)?;
    }

    let info = serde_json::to_string_pretty(&notebook.config)?;
    write_file(path.join(INFO_FILE), info.as_bytes())?;

    let mut written = 0;
    for page in notebook.pages_mut().iter_mut().filter(|page| page.dirty) {
        write_file(path.join(&page.file_name), page.contents.as_bytes())?;
        page.dirty = false;
        written += 1;
    }

    for image in notebook.images() {
        let image_path = path.join(&image.file_name);
        if !image_path.exists() {
            write_file(image_path, &image.data)?;
        }
    }

    // Page files of deleted pages
    for (name, file_path) in bundle_files(path)? {
        if is_page_file(&file_path) && notebook.page(&name).is_none() {
            debug!("Removing deleted page {}", file_path.display());
            fs::remove_file(&file_path)?;
        }
    }

    info!("Saved notebook to {} ({} pages written)", path.display(), written);
    Ok(written)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_bundle() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Book.notebundle");

        let mut notebook = Notebook::new();
        notebook.new_page("Ideas").unwrap().contents = "# Ideas\n- one\n".into();
        notebook.add_image("cat.png", vec![0x89, b'P', b'N', b'G']);

        assert_eq!(write_bundle(&mut notebook, &dir).unwrap(), 2);
        assert!(!notebook.is_dirty());
        assert!(dir.join(INFO_FILE).exists());

        let loaded = read_bundle(&dir).unwrap();
        assert_eq!(loaded.config, notebook.config);
        assert_eq!(loaded.pages().len(), 2);
        assert_eq!(loaded.page("Ideas.md").unwrap().contents, "# Ideas\n- one\n");
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.image("cat.png").unwrap().data.len(), 4);
        assert!(loaded.pages().iter().all(|page| page.document == loaded.id));
    }

    #[test]
    fn test_only_dirty_pages_are_written() {
        let temp = TempDir::new().unwrap();
        let mut notebook = Notebook::new();
        write_bundle(&mut notebook, temp.path()).unwrap();

        // Change the file behind the notebook's back; a clean page must not overwrite it
        fs::write(temp.path().join("Hello world.md"), "external").unwrap();
        assert_eq!(write_bundle(&mut notebook, temp.path()).unwrap(), 0);
        assert_eq!(
            fs::read_to_string(temp.path().join("Hello world.md")).unwrap(),
            "external"
        );
    }

    #[test]
    fn test_deleted_pages_are_removed() {
        let temp = TempDir::new().unwrap();
        let mut notebook = Notebook::new();
        notebook.new_page("Scratch").unwrap();
        write_bundle(&mut notebook, temp.path()).unwrap();
        assert!(temp.path().join("Scratch.md").exists());

        notebook.delete_page("Scratch.md").unwrap();
        write_bundle(&mut notebook, temp.path()).unwrap();
        assert!(!temp.path().join("Scratch.md").exists());
        assert!(temp.path().join("Hello world.md").exists());
    }

    #[test]
    fn test_missing_info_is_corrupt() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "# A").unwrap();
        assert!(matches!(
            read_bundle(temp.path()),
            Err(Error::BundleCorrupt { .. })
        ));

        fs::write(temp.path().join(INFO_FILE), "{ nope").unwrap();
        assert!(matches!(
            read_bundle(temp.path()),
            Err(Error::BundleCorrupt { .. })
        ));
    }

    #[test]
    fn test_read_skips_other_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(INFO_FILE), r#"{"version":1}"#).unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();
        fs::write(temp.path().join("Page.MD"), "# Upper").unwrap();
        fs::create_dir(temp.path().join("sub.md")).unwrap();

        let notebook = read_bundle(temp.path()).unwrap();
        assert_eq!(notebook.pages().len(), 1);
        assert_eq!(notebook.pages()[0].title(), "Upper");
        assert_eq!(notebook.config.open_page, None);
    }
}

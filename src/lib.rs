//! Quillmark - live markdown styling for text-editing surfaces
//!
//! Markdown stays plain text in the buffer. As the user types, the
//! paragraphs around each edit are restyled through regex rules: headings
//! grow, markup characters shrink out of sight, lists get hanging indents,
//! and LaTeX or image references become clickable links. Enter and Tab on
//! list lines are completed by input processors before the keystroke lands.
//!
//! Pages live in notebook bundles: a directory with `info.json`, one
//! markdown file per page, and the images the pages embed.

pub mod config;
pub mod editor;
pub mod error;
pub mod fonts;
pub mod markdown;
pub mod notebook;
pub mod string_utils;
pub mod theme;

pub use error::{Error, Result};

//! Configuration module for Quillmark
//!
//! User settings (serialized to JSON in the platform config directory) and
//! the immutable `EditorConfiguration` derived from them for each
//! highlighting pass.

mod editor;
mod persistence;
mod settings;

pub use editor::EditorConfiguration;
pub use persistence::*;
pub use settings::*;

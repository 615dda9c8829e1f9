//! Per-pass editor configuration
//!
//! `EditorConfiguration` is the read-only value the highlighter resolves
//! styles against. It is built from `Settings` once per render pass and never
//! mutated by the core.

use crate::config::Settings;
use crate::fonts::{FontDescriptor, FontKind};
use crate::theme::Palette;
use egui::Color32;

/// Fonts and colors used to resolve style specs into render attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfiguration {
    pub default_font: FontDescriptor,
    pub monospace_font: FontDescriptor,
    pub serif_font: FontDescriptor,
    pub default_color: Color32,
    pub palette: Palette,
}

impl Default for EditorConfiguration {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), false)
    }
}

impl EditorConfiguration {
    /// Build the configuration for the given settings.
    ///
    /// `host_dark_mode` decides the palette when the theme follows the system.
    pub fn from_settings(settings: &Settings, host_dark_mode: bool) -> Self {
        let palette = settings.palette_for(host_dark_mode);
        let size = settings.font_size;
        Self {
            default_font: FontDescriptor::new(&settings.font_family, FontKind::Regular, size),
            monospace_font: FontDescriptor::new(
                &settings.monospace_family,
                FontKind::Monospace,
                size,
            ),
            serif_font: FontDescriptor::new(&settings.serif_family, FontKind::Serif, size),
            default_color: palette.text,
            palette,
        }
    }

    /// The configured face for a font kind.
    ///
    /// A face with no family name falls back to the default font.
    pub fn font_for(&self, kind: FontKind) -> &FontDescriptor {
        let face = match kind {
            FontKind::Regular => &self.default_font,
            FontKind::Monospace => &self.monospace_font,
            FontKind::Serif => &self.serif_font,
        };
        if face.family.is_empty() {
            &self.default_font
        } else {
            face
        }
    }
}

//! User settings and preferences for Quillmark
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use crate::theme::Palette;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Available color themes for the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the host; resolved by `Settings::palette_for`
    System,
}

// ─────────────────────────────────────────────────────────────────────────────
// List Completion Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Behaviour switches for the list completion processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSettings {
    /// Continue bullet and numbered lists when Enter is pressed
    pub continue_lists: bool,
    /// Tab on a list line indents the whole line
    pub tab_indents_lists: bool,
    /// Enter on an empty numbered item removes the marker, like bullets do
    pub exit_empty_ordered_items: bool,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            continue_lists: true,
            tab_indents_lists: true,
            exit_empty_ordered_items: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences and application settings.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Appearance
    // ─────────────────────────────────────────────────────────────────────────
    /// Color theme (light, dark, or system)
    pub theme: Theme,

    /// Body font size (in points); heading sizes grow from this
    pub font_size: f32,

    /// Proportional body font family
    pub font_family: String,

    /// Monospace family for code, bold and headings
    pub monospace_family: String,

    /// Serif family for LaTeX bodies
    pub serif_family: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Editor Behavior
    // ─────────────────────────────────────────────────────────────────────────
    /// List completion switches
    pub lists: ListSettings,

    /// Whether clicking a LaTeX span requests a rendered preview
    pub latex_previews: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_size: 14.0,
            font_family: String::from("Inter"),
            monospace_family: String::from("JetBrainsMono"),
            serif_family: String::from("Times New Roman"),
            lists: ListSettings::default(),
            latex_previews: true,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum allowed font size.
    pub const MIN_FONT_SIZE: f32 = 8.0;
    /// Maximum allowed font size.
    pub const MAX_FONT_SIZE: f32 = 72.0;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        if !self.font_size.is_finite() {
            self.font_size = Settings::default().font_size;
        }
        self.font_size = self
            .font_size
            .clamp(Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE);

        // An unusable family name falls back to the body font
        self.font_family = self.font_family.trim().to_string();
        if self.font_family.is_empty() {
            self.font_family = Settings::default().font_family;
        }
        if self.monospace_family.trim().is_empty() {
            self.monospace_family = self.font_family.clone();
        }
        if self.serif_family.trim().is_empty() {
            self.serif_family = self.font_family.clone();
        }
    }

    /// Load settings and sanitize them to ensure validity.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Pick the palette for the configured theme.
    ///
    /// `host_dark_mode` is only consulted for `Theme::System`.
    pub fn palette_for(&self, host_dark_mode: bool) -> Palette {
        match self.theme {
            Theme::Light => Palette::light(),
            Theme::Dark => Palette::dark(),
            Theme::System => {
                if host_dark_mode {
                    Palette::dark()
                } else {
                    Palette::light()
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Theme palettes for Quillmark
//!
//! Syntax rules never name concrete colors. They name a `ColorRole` ("link",
//! "secondary text", "accent red"), and the palette picked from the user's
//! theme setting turns the role into an `egui::Color32` at resolve time.
//!
//! # Usage
//!
//! ```ignore
//! use crate::theme::{ColorRole, Palette};
//!
//! let palette = Palette::dark();
//! let link = palette.color(ColorRole::Link);
//! ```

use egui::Color32;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Color Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic color slots used by the syntax rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRole {
    /// Body text
    Text,
    /// De-emphasized markup (list markers, link brackets)
    SecondaryText,
    /// Link labels and targets
    Link,
    Red,
    Green,
    Blue,
    Cyan,
    Teal,
    Mint,
}

/// A color role with an opacity multiplier, e.g. a 10% red tint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSpec {
    pub role: ColorRole,
    /// Opacity in `0.0..=1.0`
    pub alpha: f32,
}

impl ColorSpec {
    /// Fully opaque color for `role`.
    pub const fn solid(role: ColorRole) -> Self {
        Self { role, alpha: 1.0 }
    }

    /// Translucent color for `role`.
    pub const fn tinted(role: ColorRole, alpha: f32) -> Self {
        Self { role, alpha }
    }
}

impl From<ColorRole> for ColorSpec {
    fn from(role: ColorRole) -> Self {
        ColorSpec::solid(role)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Palette
// ─────────────────────────────────────────────────────────────────────────────

/// Concrete colors for every `ColorRole`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub text: Color32,
    pub secondary_text: Color32,
    pub link: Color32,
    pub red: Color32,
    pub green: Color32,
    pub blue: Color32,
    pub cyan: Color32,
    pub teal: Color32,
    pub mint: Color32,
}

impl Default for Palette {
    fn default() -> Self {
        Self::light()
    }
}

impl Palette {
    /// Light theme palette.
    pub fn light() -> Self {
        Self {
            text: Color32::from_rgb(30, 30, 30),
            secondary_text: Color32::from_rgb(120, 120, 128),
            link: Color32::from_rgb(0, 104, 218),
            red: Color32::from_rgb(255, 56, 60),
            green: Color32::from_rgb(0, 168, 60),
            blue: Color32::from_rgb(0, 122, 255),
            cyan: Color32::from_rgb(0, 172, 210),
            teal: Color32::from_rgb(0, 150, 160),
            mint: Color32::from_rgb(0, 190, 170),
        }
    }

    /// Dark theme palette.
    pub fn dark() -> Self {
        Self {
            text: Color32::from_rgb(220, 220, 220),
            secondary_text: Color32::from_rgb(152, 152, 160),
            link: Color32::from_rgb(65, 156, 255),
            red: Color32::from_rgb(255, 66, 69),
            green: Color32::from_rgb(48, 209, 88),
            blue: Color32::from_rgb(10, 132, 255),
            cyan: Color32::from_rgb(60, 211, 254),
            teal: Color32::from_rgb(64, 200, 224),
            mint: Color32::from_rgb(99, 230, 226),
        }
    }

    /// Look up the opaque color for a role.
    pub fn color(&self, role: ColorRole) -> Color32 {
        match role {
            ColorRole::Text => self.text,
            ColorRole::SecondaryText => self.secondary_text,
            ColorRole::Link => self.link,
            ColorRole::Red => self.red,
            ColorRole::Green => self.green,
            ColorRole::Blue => self.blue,
            ColorRole::Cyan => self.cyan,
            ColorRole::Teal => self.teal,
            ColorRole::Mint => self.mint,
        }
    }

    /// Resolve a color spec, applying its opacity.
    pub fn resolve(&self, spec: ColorSpec) -> Color32 {
        let base = self.color(spec.role);
        if spec.alpha >= 1.0 {
            return base;
        }
        let alpha = (spec.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), alpha)
    }

    /// Check if this is a dark palette (useful for conditional styling).
    pub fn is_dark(&self) -> bool {
        // Dark palettes have light body text
        self.text.r() > 128
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

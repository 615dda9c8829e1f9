//! Style specs and their resolution into render attributes
//!
//! A syntax rule describes how a capture group should look with a list of
//! `StyleSpec`s. `resolve` folds such a list, left to right, into an
//! `AttributeSet`: a partial set of render attributes in which only the keys
//! the specs touched are present. Merging an `AttributeSet` into storage
//! overwrites exactly those keys and leaves the rest alone.
//!
//! Font specs compose. Each one reads the font already in the set (or the
//! configuration's default font) and changes a single trait, so
//! `[Font(Monospace), Weight(Bold), Color(Red)]` ends up bold monospace red.

use crate::config::EditorConfiguration;
use crate::fonts::{FontDescriptor, FontKind, FontWeight};
use crate::theme::ColorSpec;
use egui::Color32;
use serde::{Deserialize, Serialize};

/// Point size used to make markup characters practically invisible while
/// keeping them in the buffer.
pub const HIDDEN_SIZE: f32 = 0.001;

// ─────────────────────────────────────────────────────────────────────────────
// Style Specs
// ─────────────────────────────────────────────────────────────────────────────

/// Paragraph-level layout attributes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParagraphStyle {
    /// Indent of wrapped lines, in points
    pub head_indent: f32,
    /// Space above the paragraph, in points
    pub spacing_before: f32,
    /// Space below the paragraph, in points
    pub spacing_after: f32,
}

/// Size request for a font.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TextSize {
    /// Absolute size in points
    Points(f32),
    /// The configured body size plus a delta
    AboveBase(f32),
    /// Near-zero size that hides markup without deleting it
    Hidden,
}

/// One abstract style instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StyleSpec {
    Color(ColorSpec),
    Background(ColorSpec),
    Weight(FontWeight),
    /// Switch to a configured face, keeping size, weight and slant
    Font(FontKind),
    Italic,
    Underline(bool),
    Size(TextSize),
    Paragraph(ParagraphStyle),
}

// ─────────────────────────────────────────────────────────────────────────────
// Attribute Set
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved attributes for one capture group. `None` means "leave as is".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeSet {
    pub font: Option<FontDescriptor>,
    pub color: Option<Color32>,
    pub background: Option<Color32>,
    pub underline: Option<bool>,
    pub paragraph: Option<ParagraphStyle>,
}

impl AttributeSet {
    /// Whether merging this set would change nothing.
    pub fn is_empty(&self) -> bool {
        self.font.is_none()
            && self.color.is_none()
            && self.background.is_none()
            && self.underline.is_none()
            && self.paragraph.is_none()
    }

    /// Only a paragraph style.
    pub fn paragraph(style: ParagraphStyle) -> Self {
        Self {
            paragraph: Some(style),
            ..Self::default()
        }
    }

    /// Font already set by earlier specs, else the configured default.
    fn current_font(&self, config: &EditorConfiguration) -> FontDescriptor {
        self.font
            .clone()
            .unwrap_or_else(|| config.default_font.clone())
    }

    /// Apply one spec on top of what is already in the set.
    pub fn apply(&mut self, spec: &StyleSpec, config: &EditorConfiguration) {
        match spec {
            StyleSpec::Color(color) => self.color = Some(config.palette.resolve(*color)),
            StyleSpec::Background(color) => {
                self.background = Some(config.palette.resolve(*color))
            }
            StyleSpec::Weight(weight) => {
                self.font = Some(self.current_font(config).with_weight(*weight))
            }
            StyleSpec::Font(kind) => {
                let face = config.font_for(*kind);
                self.font = Some(self.current_font(config).with_face_of(face));
            }
            StyleSpec::Italic => self.font = Some(self.current_font(config).with_italic(true)),
            StyleSpec::Underline(on) => self.underline = Some(*on),
            StyleSpec::Size(size) => {
                let points = match size {
                    TextSize::Points(points) => *points,
                    TextSize::AboveBase(delta) => config.default_font.size + delta,
                    TextSize::Hidden => HIDDEN_SIZE,
                };
                self.font = Some(self.current_font(config).with_size(points));
            }
            StyleSpec::Paragraph(style) => self.paragraph = Some(*style),
        }
    }
}

/// Fold a spec list into a single attribute set, later specs winning.
pub fn resolve(specs: &[StyleSpec], config: &EditorConfiguration) -> AttributeSet {
    specs.iter().fold(AttributeSet::default(), |mut set, spec| {
        set.apply(spec, config);
        set
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Render Attributes
// ─────────────────────────────────────────────────────────────────────────────

/// Click target attached to a range of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextLink {
    /// Image stored in the notebook under this file name
    Image(String),
    /// LaTeX source to render on demand
    Latex(String),
}

/// Complete attribute state of a character in the storage.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderAttributes {
    pub font: FontDescriptor,
    pub color: Color32,
    pub background: Option<Color32>,
    pub underline: bool,
    pub paragraph: Option<ParagraphStyle>,
    pub link: Option<TextLink>,
}

impl RenderAttributes {
    /// Plain text: default font and color, nothing else.
    pub fn base(config: &EditorConfiguration) -> Self {
        Self {
            font: config.default_font.clone(),
            color: config.default_color,
            background: None,
            underline: false,
            paragraph: None,
            link: None,
        }
    }

    /// Overwrite the keys present in `set`.
    pub fn merge(&mut self, set: &AttributeSet) {
        if let Some(font) = &set.font {
            self.font = font.clone();
        }
        if let Some(color) = set.color {
            self.color = color;
        }
        if let Some(background) = set.background {
            self.background = Some(background);
        }
        if let Some(underline) = set.underline {
            self.underline = underline;
        }
        if let Some(paragraph) = set.paragraph {
            self.paragraph = Some(paragraph);
        }
    }

    /// Whether the character is rendered at the near-zero hidden size.
    pub fn is_hidden(&self) -> bool {
        self.font.size <= HIDDEN_SIZE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Font descriptors for Quillmark
//!
//! Highlighting never talks to a real font system. It works on small
//! `FontDescriptor` values that say which configured family to use and which
//! traits (size, weight, slant) to apply. Hosts map a descriptor onto their
//! own fonts; for egui hosts that mapping lives here too, using one named font
//! family per bold/italic variant.

use egui::{FontDefinitions, FontFamily, FontId};
use log::debug;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Font Kind and Weight
// ─────────────────────────────────────────────────────────────────────────────

/// Which configured face a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontKind {
    /// Proportional body font
    #[default]
    Regular,
    /// Code font
    Monospace,
    /// Font used for LaTeX bodies
    Serif,
}

/// Font weight, ordered from lightest to heaviest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Light,
    #[default]
    Regular,
    Medium,
    Semibold,
    Bold,
    Heavy,
}

impl FontWeight {
    /// Whether a host with only regular and bold faces should pick bold.
    pub fn is_bold(&self) -> bool {
        *self >= FontWeight::Semibold
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Font Descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// A concrete font request: family plus traits.
///
/// The `with_*` helpers each change exactly one trait and keep the others,
/// which is what lets a list of style specs compose (monospace, then bold,
/// gives bold monospace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescriptor {
    /// Family name as configured (e.g. "Inter")
    pub family: String,
    /// Which configured face the family came from
    pub kind: FontKind,
    /// Point size
    pub size: f32,
    pub weight: FontWeight,
    pub italic: bool,
}

impl FontDescriptor {
    /// Create a regular-weight, upright descriptor.
    pub fn new(family: impl Into<String>, kind: FontKind, size: f32) -> Self {
        Self {
            family: family.into(),
            kind,
            size,
            weight: FontWeight::Regular,
            italic: false,
        }
    }

    /// Same traits, family taken from `face`.
    pub fn with_face_of(&self, face: &FontDescriptor) -> Self {
        Self {
            family: face.family.clone(),
            kind: face.kind,
            ..self.clone()
        }
    }

    pub fn with_weight(&self, weight: FontWeight) -> Self {
        Self {
            weight,
            ..self.clone()
        }
    }

    pub fn with_italic(&self, italic: bool) -> Self {
        Self {
            italic,
            ..self.clone()
        }
    }

    pub fn with_size(&self, size: f32) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Name of the egui font family holding this descriptor's variant.
    ///
    /// Variants are registered as separate families named
    /// `"{family}"`, `"{family}-Bold"`, `"{family}-Italic"` and
    /// `"{family}-BoldItalic"`.
    pub fn variant_name(&self) -> String {
        match (self.weight.is_bold(), self.italic) {
            (true, true) => format!("{}-BoldItalic", self.family),
            (true, false) => format!("{}-Bold", self.family),
            (false, true) => format!("{}-Italic", self.family),
            (false, false) => self.family.clone(),
        }
    }

    /// The egui font family for this descriptor.
    pub fn egui_family(&self) -> FontFamily {
        FontFamily::Name(self.variant_name().into())
    }

    /// Create a FontId for this descriptor.
    pub fn egui_font_id(&self) -> FontId {
        FontId::new(self.size, self.egui_family())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// egui Font Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Font definitions that bind every variant family a descriptor can name.
///
/// egui panics when laying out text in an unbound `FontFamily::Name`, so each
/// configured family gets its four variants registered. Hosts that ship real
/// font files replace the bindings; by default a variant falls back to egui's
/// built-in proportional or monospace fonts.
pub fn create_font_definitions(faces: &[&FontDescriptor]) -> FontDefinitions {
    let mut fonts = FontDefinitions::default();

    for face in faces {
        let fallback = match face.kind {
            FontKind::Monospace => FontFamily::Monospace,
            FontKind::Regular | FontKind::Serif => FontFamily::Proportional,
        };
        let data = fonts.families.get(&fallback).cloned().unwrap_or_default();

        for (weight, italic) in [
            (FontWeight::Regular, false),
            (FontWeight::Bold, false),
            (FontWeight::Regular, true),
            (FontWeight::Bold, true),
        ] {
            let variant = face.with_weight(weight).with_italic(italic).variant_name();
            fonts
                .families
                .entry(FontFamily::Name(variant.into()))
                .or_insert_with(|| data.clone());
        }
    }

    debug!("Registered font variants for {} faces", faces.len());
    fonts
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

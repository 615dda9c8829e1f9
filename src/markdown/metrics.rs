//! Text measurement
//!
//! The list rule needs the rendered width of a bullet prefix to set the
//! hanging indent of wrapped lines. Hosts with a real text shaper implement
//! `TextMetrics`; everything else uses `EstimatedMetrics`, which counts
//! terminal-style display columns and scales them by the font size.

use crate::fonts::{FontDescriptor, FontKind};
use unicode_width::UnicodeWidthChar;

/// Columns a tab advances by.
const TAB_COLUMNS: usize = 4;

/// Average advance of one column, as a fraction of the point size.
const PROPORTIONAL_ADVANCE: f32 = 0.5;
const MONOSPACE_ADVANCE: f32 = 0.6;

/// Measures the rendered width of a run of text.
pub trait TextMetrics {
    /// Width in points of `text` set in `font`.
    fn measure(&self, text: &str, font: &FontDescriptor) -> f32;
}

/// Column-count estimate used when the host supplies no shaper.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMetrics;

impl TextMetrics for EstimatedMetrics {
    fn measure(&self, text: &str, font: &FontDescriptor) -> f32 {
        let columns: usize = text
            .chars()
            .map(|c| match c {
                '\t' => TAB_COLUMNS,
                _ => c.width().unwrap_or(0),
            })
            .sum();

        let advance = match font.kind {
            FontKind::Monospace => MONOSPACE_ADVANCE,
            FontKind::Regular | FontKind::Serif => PROPORTIONAL_ADVANCE,
        };
        // Bold faces run slightly wider
        let weight_factor = if font.weight.is_bold() { 1.05 } else { 1.0 };

        columns as f32 * advance * font.size * weight_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontWeight;

    fn font(kind: FontKind) -> FontDescriptor {
        FontDescriptor::new("Inter", kind, 10.0)
    }

    #[test]
    fn test_measure_scales_with_columns() {
        let metrics = EstimatedMetrics;
        let one = metrics.measure("-", &font(FontKind::Regular));
        let three = metrics.measure("- x", &font(FontKind::Regular));
        assert!((one - 5.0).abs() < f32::EPSILON);
        assert!((three - 3.0 * one).abs() < 1e-4);
    }

    #[test]
    fn test_measure_tab_and_wide_chars() {
        let metrics = EstimatedMetrics;
        let f = font(FontKind::Monospace);
        assert!((metrics.measure("\t", &f) - metrics.measure("    ", &f)).abs() < 1e-4);
        // CJK characters take two columns
        assert!((metrics.measure("中", &f) - metrics.measure("ab", &f)).abs() < 1e-4);
        assert_eq!(metrics.measure("", &f), 0.0);
    }

    #[test]
    fn test_bold_is_wider() {
        let metrics = EstimatedMetrics;
        let regular = font(FontKind::Regular);
        let heavy = regular.with_weight(FontWeight::Heavy);
        assert!(metrics.measure("-", &heavy) > metrics.measure("-", &regular));
    }
}

//! Input processing pipeline
//!
//! Before a keystroke reaches the buffer, the session offers it to an ordered
//! chain of processors. A processor either lets the keystroke through
//! (`Proceed`) or performs its own reversible edit and swallows the keystroke
//! (`Handled`). The first `Handled` stops the chain.
//!
//! The markdown pipeline continues bullet and numbered lists on Enter and
//! indents list lines on Tab.

use super::surface::EditSurface;
use crate::config::ListSettings;
use crate::string_utils::{paragraph_range, span_text, Span};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// What a processor did with a proposed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorOutcome {
    /// Let the default insertion happen
    Proceed,
    /// The processor edited the buffer itself; drop the keystroke
    Handled,
}

/// A replacement the host is about to make.
#[derive(Debug, Clone, Copy)]
pub struct ProposedEdit<'a> {
    /// Range being replaced
    pub range: Span,
    /// Text replacing it
    pub replacement: &'a str,
    /// Full line containing `range`, including its trailing newline
    pub line: Span,
    pub line_text: &'a str,
}

/// One link of the chain.
pub type InputProcessor =
    fn(&mut dyn EditSurface, &ProposedEdit<'_>, &ListSettings) -> ProcessorOutcome;

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

static BULLET_ITEM: OnceLock<Option<Regex>> = OnceLock::new();
static NUMBERED_ITEM: OnceLock<Option<Regex>> = OnceLock::new();
static NUMBERED_MARKER: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Indentation, bullet character, one space or tab.
fn bullet_item() -> Option<&'static Regex> {
    compiled(&BULLET_ITEM, r"^([ \t]*)([-*+])[ \t]")
}

/// Indentation, item number, dot, one space or tab.
fn numbered_item() -> Option<&'static Regex> {
    compiled(&NUMBERED_ITEM, r"^([ \t]*)([0-9]+)\.[ \t]")
}

/// Same shape as the ordered-list highlight rule; the number may be missing.
fn numbered_marker() -> Option<&'static Regex> {
    compiled(&NUMBERED_MARKER, r"^[ \t]*[0-9]*\.[ \t]")
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered chain of input processors.
#[derive(Clone)]
pub struct InputPipeline {
    processors: Vec<(&'static str, InputProcessor)>,
    settings: ListSettings,
}

impl std::fmt::Debug for InputPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputPipeline")
            .field("processors", &self.processor_names())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for InputPipeline {
    fn default() -> Self {
        Self::markdown(ListSettings::default())
    }
}

impl InputPipeline {
    /// The markdown processors enabled by `settings`.
    pub fn markdown(settings: ListSettings) -> Self {
        let mut processors: Vec<(&'static str, InputProcessor)> = Vec::new();
        if settings.continue_lists {
            processors.push(("unordered_list", continue_unordered_list));
            processors.push(("ordered_list", continue_ordered_list));
        }
        if settings.tab_indents_lists {
            processors.push(("list_indentation", indent_list_line));
        }
        Self {
            processors,
            settings,
        }
    }

    /// Names of the processors, in order.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|(name, _)| *name).collect()
    }

    /// Offer a proposed edit to each processor in turn.
    ///
    /// A missing replacement or an out-of-bounds range always proceeds. All
    /// processor edits happen inside one editing batch.
    pub fn run(
        &self,
        surface: &mut dyn EditSurface,
        range: Span,
        replacement: Option<&str>,
    ) -> ProcessorOutcome {
        let Some(replacement) = replacement else {
            return ProcessorOutcome::Proceed;
        };
        if !range.fits(surface.len()) {
            return ProcessorOutcome::Proceed;
        }

        let line = paragraph_range(surface.text(), range);
        let line_text = span_text(surface.text(), line).to_owned();
        let edit = ProposedEdit {
            range,
            replacement,
            line,
            line_text: &line_text,
        };

        surface.begin_editing();
        let mut outcome = ProcessorOutcome::Proceed;
        for (name, processor) in &self.processors {
            if processor(&mut *surface, &edit, &self.settings) == ProcessorOutcome::Handled {
                debug!("Input processor '{}' handled edit at {:?}", name, range);
                outcome = ProcessorOutcome::Handled;
                break;
            }
        }
        surface.end_editing();
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Processors
// ─────────────────────────────────────────────────────────────────────────────

/// Remove the marker of an empty list item.
///
/// An indented item loses one indentation character; an unindented one is
/// deleted along with its line.
fn exit_empty_item(surface: &mut dyn EditSurface, edit: &ProposedEdit<'_>, indented: bool) {
    if indented {
        surface.replace_with_undo(Span::new(edit.line.start, 1), "", false);
    } else {
        surface.replace_with_undo(edit.line, "", true);
    }
}

/// Enter on a bullet line starts the next bullet.
pub fn continue_unordered_list(
    surface: &mut dyn EditSurface,
    edit: &ProposedEdit<'_>,
    _settings: &ListSettings,
) -> ProcessorOutcome {
    if edit.replacement != "\n" {
        return ProcessorOutcome::Proceed;
    }
    let Some(captures) = bullet_item().and_then(|re| re.captures(edit.line_text)) else {
        return ProcessorOutcome::Proceed;
    };
    let (Some(indent), Some(bullet)) = (captures.get(1), captures.get(2)) else {
        return ProcessorOutcome::Proceed;
    };

    let rest = &edit.line_text[bullet.end()..];
    if rest.trim().is_empty() {
        exit_empty_item(surface, edit, !indent.is_empty());
        return ProcessorOutcome::Handled;
    }

    let continuation = format!("\n{}{} ", indent.as_str(), bullet.as_str());
    surface.replace_with_undo(edit.range, &continuation, true);
    ProcessorOutcome::Handled
}

/// Enter on a numbered line starts the next number.
///
/// Empty numbered items are continued too unless
/// `exit_empty_ordered_items` is set.
pub fn continue_ordered_list(
    surface: &mut dyn EditSurface,
    edit: &ProposedEdit<'_>,
    settings: &ListSettings,
) -> ProcessorOutcome {
    if edit.replacement != "\n" {
        return ProcessorOutcome::Proceed;
    }
    let Some(captures) = numbered_item().and_then(|re| re.captures(edit.line_text)) else {
        return ProcessorOutcome::Proceed;
    };
    let (Some(marker), Some(indent), Some(number)) =
        (captures.get(0), captures.get(1), captures.get(2))
    else {
        return ProcessorOutcome::Proceed;
    };
    let Some(next) = number
        .as_str()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(1))
    else {
        return ProcessorOutcome::Proceed;
    };

    if settings.exit_empty_ordered_items && edit.line_text[marker.end()..].trim().is_empty() {
        exit_empty_item(surface, edit, !indent.is_empty());
        return ProcessorOutcome::Handled;
    }

    let continuation = format!("\n{}{}. ", indent.as_str(), next);
    surface.replace_with_undo(edit.range, &continuation, true);
    ProcessorOutcome::Handled
}

/// Tab anywhere on a list line indents the whole line.
pub fn indent_list_line(
    surface: &mut dyn EditSurface,
    edit: &ProposedEdit<'_>,
    _settings: &ListSettings,
) -> ProcessorOutcome {
    if edit.replacement != "\t" {
        return ProcessorOutcome::Proceed;
    }
    let is_list_line = [bullet_item(), numbered_marker()]
        .into_iter()
        .flatten()
        .any(|re| re.is_match(edit.line_text));
    if !is_list_line {
        return ProcessorOutcome::Proceed;
    }

    surface.insert_with_undo(edit.line.start, "\t");
    ProcessorOutcome::Handled
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfiguration;
    use crate::editor::storage::TextStorage;
    use crate::editor::surface::MemorySurface;
    use crate::markdown::style::RenderAttributes;

    fn surface(text: &str) -> MemorySurface {
        MemorySurface::new(text, RenderAttributes::base(&EditorConfiguration::default()))
    }

    /// Press `key` with the caret at the end of the text.
    fn press(pipeline: &InputPipeline, s: &mut MemorySurface, key: &str) -> ProcessorOutcome {
        let end = s.len();
        pipeline.run(s, Span::caret(end), Some(key))
    }

    #[test]
    fn test_bullet_continues() {
        let pipeline = InputPipeline::default();
        let mut s = surface("- item");
        assert_eq!(press(&pipeline, &mut s, "\n"), ProcessorOutcome::Handled);
        assert_eq!(s.text(), "- item\n- ");
        assert_eq!(s.selection(), Span::caret(9));
    }

    #[test]
    fn test_bullet_keeps_indent_and_char() {
        let pipeline = InputPipeline::default();
        let mut s = surface("\t* nested");
        press(&pipeline, &mut s, "\n");
        assert_eq!(s.text(), "\t* nested\n\t* ");
    }

    #[test]
    fn test_empty_bullet_is_removed() {
        let pipeline = InputPipeline::default();
        let mut s = surface("- item\n- ");
        assert_eq!(press(&pipeline, &mut s, "\n"), ProcessorOutcome::Handled);
        assert_eq!(s.text(), "- item\n");
        assert_eq!(s.selection(), Span::caret(7));
    }

    #[test]
    fn test_empty_indented_bullet_outdents() {
        let pipeline = InputPipeline::default();
        let mut s = surface("- a\n\t- ");
        press(&pipeline, &mut s, "\n");
        assert_eq!(s.text(), "- a\n- ");
        assert_eq!(s.selection(), Span::caret(6));
    }

    #[test]
    fn test_numbered_list_increments() {
        let pipeline = InputPipeline::default();
        let mut s = surface("3. foo");
        assert_eq!(press(&pipeline, &mut s, "\n"), ProcessorOutcome::Handled);
        assert_eq!(s.text(), "3. foo\n4. ");

        let mut indented = surface("  9. nine");
        press(&pipeline, &mut indented, "\n");
        assert_eq!(indented.text(), "  9. nine\n  10. ");
    }

    #[test]
    fn test_empty_numbered_item_continues_by_default() {
        let pipeline = InputPipeline::default();
        let mut s = surface("1. a\n2. ");
        press(&pipeline, &mut s, "\n");
        assert_eq!(s.text(), "1. a\n2. \n3. ");
    }

    #[test]
    fn test_empty_numbered_item_exits_when_enabled() {
        let pipeline = InputPipeline::markdown(ListSettings {
            exit_empty_ordered_items: true,
            ..ListSettings::default()
        });
        let mut s = surface("1. a\n2. ");
        press(&pipeline, &mut s, "\n");
        assert_eq!(s.text(), "1. a\n");
    }

    #[test]
    fn test_huge_number_proceeds() {
        let pipeline = InputPipeline::default();
        let mut s = surface("99999999999999999999999. x");
        assert_eq!(press(&pipeline, &mut s, "\n"), ProcessorOutcome::Proceed);
    }

    #[test]
    fn test_tab_indents_from_any_column() {
        let pipeline = InputPipeline::default();
        let mut s = surface("intro\n- item text\n");
        let outcome = pipeline.run(&mut s, Span::caret(11), Some("\t"));
        assert_eq!(outcome, ProcessorOutcome::Handled);
        assert_eq!(s.text(), "intro\n\t- item text\n");

        let mut numbered = surface("1. one");
        pipeline.run(&mut numbered, Span::caret(4), Some("\t"));
        assert_eq!(numbered.text(), "\t1. one");
    }

    #[test]
    fn test_plain_lines_proceed() {
        let pipeline = InputPipeline::default();
        let mut s = surface("plain text");
        assert_eq!(press(&pipeline, &mut s, "\n"), ProcessorOutcome::Proceed);
        assert_eq!(press(&pipeline, &mut s, "\t"), ProcessorOutcome::Proceed);
        assert_eq!(press(&pipeline, &mut s, "x"), ProcessorOutcome::Proceed);
        assert_eq!(s.text(), "plain text");
    }

    #[test]
    fn test_missing_replacement_or_bad_range_proceeds() {
        let pipeline = InputPipeline::default();
        let mut s = surface("- item");
        assert_eq!(
            pipeline.run(&mut s, Span::caret(6), None),
            ProcessorOutcome::Proceed
        );
        assert_eq!(
            pipeline.run(&mut s, Span::new(4, 10), Some("\n")),
            ProcessorOutcome::Proceed
        );
        assert_eq!(s.text(), "- item");
    }

    #[test]
    fn test_disabled_processors() {
        let pipeline = InputPipeline::markdown(ListSettings {
            continue_lists: false,
            tab_indents_lists: false,
            exit_empty_ordered_items: false,
        });
        assert!(pipeline.processor_names().is_empty());
        let mut s = surface("- item");
        assert_eq!(press(&pipeline, &mut s, "\n"), ProcessorOutcome::Proceed);
    }

    #[test]
    fn test_processor_edit_is_one_notification_and_undoable() {
        let pipeline = InputPipeline::default();
        let mut s = surface("- item");
        press(&pipeline, &mut s, "\n");
        assert_eq!(s.take_notifications().len(), 1);
        assert!(s.undo());
        assert_eq!(s.text(), "- item");
    }
}

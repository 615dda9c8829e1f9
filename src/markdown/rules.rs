//! Markdown syntax rules
//!
//! The highlighter is driven by an ordered table of regular-expression rules.
//! Each rule lists, per capture group, the style specs to merge over that
//! group (index 0 is the whole match), plus an optional action that runs once
//! per match after styling: attaching link tags or computing a hanging indent.
//!
//! Rules are applied in table order and later rules win per attribute key, so
//! headings (last) override bold or code styling inside a heading line.
//!
//! Patterns only ever see one paragraph of text at a time during incremental
//! highlighting, so list and heading patterns use `[ \t]` rather than `\s`
//! and never cross a line break.

use super::highlight::DocumentContext;
use super::style::{resolve, AttributeSet, ParagraphStyle, StyleSpec, TextLink, TextSize};
use crate::config::EditorConfiguration;
use crate::editor::storage::TextStorage;
use crate::fonts::{FontKind, FontWeight};
use crate::string_utils::{span_text, Span};
use crate::theme::{ColorRole, ColorSpec};
use log::warn;
use regex::{Captures, Regex};
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Spacing below a list item, in points
const LIST_ITEM_SPACING: f32 = 2.0;

/// Spacing above and below a fenced code block, in points
const CODE_BLOCK_SPACING: f32 = 5.0;

/// Spacing above and below a heading, in points
const HEADING_SPACING_BEFORE: f32 = 10.0;
const HEADING_SPACING_AFTER: f32 = 5.0;

/// Heading sizes grow geometrically from the body size: `base + 1.8^(6 - level)`.
const HEADING_GROWTH: f32 = 1.8;

/// Opacity of the inline code background tint
const INLINE_CODE_TINT: f32 = 0.1;

// ─────────────────────────────────────────────────────────────────────────────
// Rule Types
// ─────────────────────────────────────────────────────────────────────────────

/// What a rule action can see besides the storage.
pub struct MatchScope<'a> {
    pub config: &'a EditorConfiguration,
    pub document: &'a DocumentContext<'a>,
    /// Absolute span of the paragraph text the captures are relative to
    pub paragraph: Span,
}

impl MatchScope<'_> {
    /// Absolute span of capture group `index`, if it participated.
    pub fn group(&self, captures: &Captures<'_>, index: usize) -> Option<Span> {
        captures
            .get(index)
            .map(|m| self.paragraph.absolute(m.range()))
    }
}

/// Per-match side effect run after the rule's styles are applied.
pub type RuleAction = fn(&mut dyn TextStorage, &MatchScope<'_>, &Captures<'_>);

/// One highlighting rule.
pub struct SyntaxRule {
    pub name: &'static str,
    pub pattern: Regex,
    /// Style specs per capture group; index 0 is the whole match
    pub capture_styles: Vec<Vec<StyleSpec>>,
    pub action: Option<RuleAction>,
}

impl std::fmt::Debug for SyntaxRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("groups", &self.capture_styles.len())
            .field("action", &self.action.is_some())
            .finish()
    }
}

impl SyntaxRule {
    /// Compile a rule. A malformed pattern is logged and the rule dropped.
    fn compile(
        name: &'static str,
        pattern: &str,
        capture_styles: Vec<Vec<StyleSpec>>,
        action: Option<RuleAction>,
    ) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(pattern) => Some(Self {
                name,
                pattern,
                capture_styles,
                action,
            }),
            Err(e) => {
                warn!("Dropping syntax rule '{}': {}", name, e);
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule Table
// ─────────────────────────────────────────────────────────────────────────────

static MARKDOWN_RULES: OnceLock<Vec<SyntaxRule>> = OnceLock::new();

/// The markdown rule table, compiled on first use.
pub fn markdown_rules() -> &'static [SyntaxRule] {
    MARKDOWN_RULES.get_or_init(build_rules)
}

fn color(role: ColorRole) -> StyleSpec {
    StyleSpec::Color(ColorSpec::solid(role))
}

fn hidden() -> StyleSpec {
    StyleSpec::Size(TextSize::Hidden)
}

fn build_rules() -> Vec<SyntaxRule> {
    let mut rules = vec![
        SyntaxRule::compile(
            "link",
            r"(!?)\[([^\[\]]*)\]\((.*?)\)",
            vec![
                vec![color(ColorRole::SecondaryText)],
                vec![],
                vec![color(ColorRole::Link)],
                vec![color(ColorRole::Link), StyleSpec::Underline(true)],
            ],
            Some(image_embed),
        ),
        SyntaxRule::compile(
            "unordered_list",
            r"(?m)(^[ \t]*([-*+])[ \t])([^\n]*)",
            vec![
                vec![],
                vec![],
                vec![
                    color(ColorRole::SecondaryText),
                    StyleSpec::Weight(FontWeight::Heavy),
                ],
            ],
            Some(hanging_indent),
        ),
        SyntaxRule::compile(
            "ordered_list",
            r"(?m)^[ \t]*(\d*)\.[ \t]",
            vec![vec![color(ColorRole::SecondaryText)]],
            None,
        ),
        SyntaxRule::compile(
            "latex",
            r"(\$)((?:[^\\$\n]|\\.)+?)(\$)",
            vec![
                vec![],
                vec![hidden()],
                vec![StyleSpec::Font(FontKind::Serif), color(ColorRole::Green)],
                vec![hidden()],
            ],
            Some(latex_link),
        ),
        SyntaxRule::compile(
            "bold",
            r"(\*\*)([^*\n]+?)(\*\*)",
            vec![
                vec![],
                vec![hidden()],
                vec![
                    StyleSpec::Font(FontKind::Monospace),
                    StyleSpec::Weight(FontWeight::Bold),
                    color(ColorRole::Red),
                ],
                vec![hidden()],
            ],
            None,
        ),
        SyntaxRule::compile(
            "inline_code",
            r"(`)((?:[^\\`\n]|\\.)+?)(`)",
            vec![
                vec![
                    StyleSpec::Font(FontKind::Monospace),
                    StyleSpec::Background(ColorSpec::tinted(ColorRole::Red, INLINE_CODE_TINT)),
                    color(ColorRole::Red),
                ],
                vec![hidden()],
                vec![],
                vec![hidden()],
            ],
            None,
        ),
        SyntaxRule::compile(
            "code_block",
            r"(```)([^`]+?)(```)",
            {
                let fence = vec![
                    hidden(),
                    StyleSpec::Paragraph(ParagraphStyle {
                        head_indent: 0.0,
                        spacing_before: CODE_BLOCK_SPACING,
                        spacing_after: CODE_BLOCK_SPACING,
                    }),
                ];
                vec![
                    vec![],
                    fence.clone(),
                    vec![StyleSpec::Font(FontKind::Monospace)],
                    fence,
                ]
            },
            None,
        ),
        SyntaxRule::compile(
            "html_tag",
            r#"<([a-zA-Z]+)((?:\s+[a-zA-Z]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*/>"#,
            vec![
                vec![StyleSpec::Font(FontKind::Monospace), color(ColorRole::Teal)],
                vec![color(ColorRole::Mint)],
                vec![color(ColorRole::Red)],
            ],
            Some(html_image),
        ),
    ];

    for level in 1..=6 {
        rules.push(heading_rule(level));
    }

    rules.into_iter().flatten().collect()
}

/// Heading rule for one level (1 to 6).
fn heading_rule(level: usize) -> Option<SyntaxRule> {
    let (name, color_role, weight) = match level {
        1 => ("heading_1", ColorRole::Blue, FontWeight::Heavy),
        2 => ("heading_2", ColorRole::Cyan, FontWeight::Bold),
        3 => ("heading_3", ColorRole::Text, FontWeight::Semibold),
        4 => ("heading_4", ColorRole::Text, FontWeight::Semibold),
        5 => ("heading_5", ColorRole::Text, FontWeight::Semibold),
        _ => ("heading_6", ColorRole::Text, FontWeight::Semibold),
    };
    let growth = HEADING_GROWTH.powi(6 - level as i32);

    SyntaxRule::compile(
        name,
        &format!(r"(?m)^(#{{{}}}[ \t]+)\S.*$", level),
        vec![
            vec![
                StyleSpec::Size(TextSize::AboveBase(growth)),
                color(color_role),
                StyleSpec::Weight(weight),
                StyleSpec::Font(FontKind::Monospace),
                StyleSpec::Underline(level >= 3),
                StyleSpec::Paragraph(ParagraphStyle {
                    head_indent: 0.0,
                    spacing_before: HEADING_SPACING_BEFORE,
                    spacing_after: HEADING_SPACING_AFTER,
                }),
            ],
            vec![hidden()],
        ],
        None,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule Actions
// ─────────────────────────────────────────────────────────────────────────────

/// Indent wrapped lines of a bullet item so they align after the marker.
fn hanging_indent(storage: &mut dyn TextStorage, scope: &MatchScope<'_>, captures: &Captures<'_>) {
    let (Some(prefix), Some(item)) = (scope.group(captures, 1), scope.group(captures, 0)) else {
        return;
    };

    // Measure with the attributes each marker character ends up with
    let marker = span_text(storage.text(), prefix).to_owned();
    let width: f32 = marker
        .char_indices()
        .map(|(i, c)| {
            let font = storage
                .attributes_at(prefix.start + i)
                .map(|attrs| attrs.font)
                .unwrap_or_else(|| scope.config.default_font.clone());
            let mut buf = [0u8; 4];
            scope.document.metrics.measure(c.encode_utf8(&mut buf), &font)
        })
        .sum();

    storage.add_attributes(
        item,
        &AttributeSet::paragraph(ParagraphStyle {
            head_indent: width,
            spacing_before: 0.0,
            spacing_after: LIST_ITEM_SPACING,
        }),
    );
}

/// Tag a LaTeX body with its source so a click can request a preview.
fn latex_link(storage: &mut dyn TextStorage, scope: &MatchScope<'_>, captures: &Captures<'_>) {
    if let (Some(body), Some(source)) = (scope.group(captures, 2), captures.get(2)) {
        storage.add_link(body, TextLink::Latex(source.as_str().to_string()));
    }
}

/// `![alt](file.png)` links the target to the notebook image of that name.
fn image_embed(storage: &mut dyn TextStorage, scope: &MatchScope<'_>, captures: &Captures<'_>) {
    let is_image = captures.get(1).is_some_and(|m| m.as_str() == "!");
    if !is_image {
        return;
    }
    if let (Some(target), Some(name)) = (scope.group(captures, 3), captures.get(3)) {
        let name = name.as_str().trim();
        if !name.is_empty() {
            storage.add_link(target, TextLink::Image(name.to_string()));
        }
    }
}

static SRC_ATTRIBUTE: OnceLock<Option<Regex>> = OnceLock::new();

fn src_attribute() -> Option<&'static Regex> {
    SRC_ATTRIBUTE
        .get_or_init(|| Regex::new(r#"(?i)\bsrc\s*=\s*("([^"]*)"|'([^']*)')"#).ok())
        .as_ref()
}

/// `<img src="..."/>` links the quoted source value to the notebook image.
fn html_image(storage: &mut dyn TextStorage, scope: &MatchScope<'_>, captures: &Captures<'_>) {
    let is_img = captures
        .get(1)
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("img"));
    if !is_img {
        return;
    }
    let (Some(attributes), Some(attributes_span), Some(src)) =
        (captures.get(2), scope.group(captures, 2), src_attribute())
    else {
        return;
    };

    let Some(found) = src.captures(attributes.as_str()) else {
        return;
    };
    let (Some(quoted), Some(name)) = (found.get(1), found.get(2).or_else(|| found.get(3))) else {
        return;
    };
    let value = attributes_span.absolute(quoted.range());

    storage.add_link(value, TextLink::Image(name.as_str().to_string()));
    storage.add_attributes(
        value,
        &resolve(&[color(ColorRole::Red)], scope.config),
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

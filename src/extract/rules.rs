//! Typed extraction rules.
//!
//! Ticket templates label the same concept in several ways and put the value
//! either on the label's line or in a paragraph below it. Each field is
//! therefore described as data: an ordered list of alternatives
//! ([`FirstMatch`]) or a bounded block with a single-line fallback
//! ([`BlockRule`]). Every regex is case-insensitive and multi-line.

use std::sync::LazyLock;

use regex::Regex;

/// Collapses runs of whitespace into one space.
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Matches any `Two words:` label at the start of a line.
const GENERIC_LABEL: &str = r"\n\s*[A-Za-z]+\s+[A-Za-z]+\s*:";

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?im){pattern}"))
        .unwrap_or_else(|e| panic!("invalid extraction pattern {pattern:?}: {e}"))
}

/// Collapse whitespace runs and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// One single-line capture: a label followed by the rest of its line.
#[derive(Debug, Clone)]
pub struct LineRule {
    regex: Regex,
}

impl LineRule {
    /// Rule capturing what follows `label` (optionally after `:` / whitespace).
    pub fn labelled(label: &str) -> Self {
        Self::pattern(&format!(r"{label}[:\s]*([^\r\n]+)"))
    }

    /// Rule from a full pattern whose first capture group is the value.
    pub fn pattern(pattern: &str) -> Self {
        Self {
            regex: compile(pattern),
        }
    }

    /// The trimmed first capture of the first match in `text`.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// Ordered alternatives; the first rule that matches wins.
#[derive(Debug, Clone)]
pub struct FirstMatch {
    rules: Vec<LineRule>,
}

impl FirstMatch {
    /// Alternatives built from label fragments, tried in order.
    pub fn labelled(labels: &[&str]) -> Self {
        Self {
            rules: labels.iter().map(|l| LineRule::labelled(l)).collect(),
        }
    }

    /// Alternatives from explicit rules.
    pub fn new(rules: Vec<LineRule>) -> Self {
        Self { rules }
    }

    /// Capture of the first matching rule.
    pub fn first(&self, text: &str) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| rule.capture(text))
            .map(str::to_string)
    }

    /// Captures of every matching rule, in rule order.
    pub fn candidates<'a, 't>(
        &'a self,
        text: &'t str,
    ) -> impl Iterator<Item = &'t str> + use<'a, 't> {
        self.rules.iter().filter_map(move |rule| rule.capture(text))
    }
}

/// Which tier of a [`BlockRule`] produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Paragraph bounded by the next label.
    Block,
    /// Single-line fallback.
    Line,
}

/// A value that may span several lines after its label.
///
/// The value runs from the end of the first matching start label to the
/// earliest position any terminator matches, or to the end of the text.
/// Empty lines and separator rows are dropped and the rest is joined with
/// single spaces. Only when no start label is present at all is the
/// single-line fallback consulted.
#[derive(Debug, Clone)]
pub struct BlockRule {
    starts: Vec<Regex>,
    terminators: Vec<Regex>,
    fallback: FirstMatch,
}

impl BlockRule {
    /// Build a block rule.
    ///
    /// `starts` are label fragments tried in order, `next_labels` are the
    /// labels that may follow the block (the generic `Two words:` label is
    /// always appended) and `fallback` are single-line label fragments.
    pub fn new(starts: &[&str], next_labels: &[&str], fallback: &[&str]) -> Self {
        let mut terminators: Vec<Regex> = next_labels
            .iter()
            .map(|label| compile(&format!(r"\n\s*{label}\s*:")))
            .collect();
        terminators.push(compile(GENERIC_LABEL));

        Self {
            starts: starts
                .iter()
                .map(|label| compile(&format!(r"{label}[:\s]*")))
                .collect(),
            terminators,
            fallback: FirstMatch::labelled(fallback),
        }
    }

    /// Extract the value and report which tier produced it.
    pub fn extract(&self, text: &str) -> Option<(String, Tier)> {
        let Some(start) = self.starts.iter().find_map(|re| re.find(text)) else {
            return self.fallback.first(text).map(|v| (v, Tier::Line));
        };

        let remaining = &text[start.end()..];
        let end = self
            .terminators
            .iter()
            .filter_map(|re| re.find(remaining))
            .map(|m| m.start())
            .min()
            .unwrap_or(remaining.len());

        let value = clean_block(&remaining[..end]);
        (!value.is_empty()).then_some((value, Tier::Block))
    }
}

/// Join the meaningful lines of a block with single spaces.
fn clean_block(block: &str) -> String {
    let kept: Vec<&str> = block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_separator_row(line))
        .collect();
    collapse_whitespace(&kept.join(" "))
}

/// A row made only of `=`, `-`, `_` and whitespace.
fn is_separator_row(line: &str) -> bool {
    line.chars()
        .all(|c| c == '=' || c == '-' || c == '_' || c.is_whitespace())
}

/// A field rule: either ordered single-line alternatives or a bounded block.
#[derive(Debug, Clone)]
pub enum FieldRule {
    Line(FirstMatch),
    Block(BlockRule),
}

impl FieldRule {
    /// Extract the field value from `text`.
    pub fn extract(&self, text: &str) -> Option<(String, Tier)> {
        match self {
            FieldRule::Line(rule) => rule.first(text).map(|v| (v, Tier::Line)),
            FieldRule::Block(rule) => rule.extract(text),
        }
    }
}

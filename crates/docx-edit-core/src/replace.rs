//! Literal and pattern text substitution across paragraphs and table cells.

use std::borrow::Cow;

use regex::Regex;
use tracing::debug;

use crate::error::{DocxError, Result};
use crate::model::{Document, Paragraph};

/// How a rule's `find` text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    #[default]
    Literal,
    Pattern,
}

/// One substitution, applied in the order the caller listed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    pub find: String,
    pub replace: String,
}

impl ReplacementRule {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

/// Rewrites one text unit for a single rule.
trait Matcher: std::fmt::Debug {
    fn substitute<'t>(&self, text: &'t str) -> Cow<'t, str>;
}

#[derive(Debug)]
struct LiteralMatcher {
    find: String,
    replace: String,
}

impl Matcher for LiteralMatcher {
    fn substitute<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.find.is_empty() || !text.contains(self.find.as_str()) {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.replace(self.find.as_str(), &self.replace))
        }
    }
}

/// Replacement text follows `regex` expansion rules (`$1`, `${name}`).
#[derive(Debug)]
struct PatternMatcher {
    pattern: Regex,
    replace: String,
}

impl Matcher for PatternMatcher {
    fn substitute<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replace.as_str())
    }
}

/// Applies an ordered rule list to every paragraph of a document.
///
/// Each text unit is run through the rules in order, every rule seeing the
/// output of the one before, so a later rule can match text an earlier rule
/// inserted. A unit counts as one change when its final text differs from the
/// original; it is then collapsed into a single run (paragraph properties are
/// kept, run formatting is not).
#[derive(Debug)]
pub struct ReplacementEngine {
    matchers: Vec<Box<dyn Matcher>>,
}

impl ReplacementEngine {
    /// Compiles every rule up front. In pattern mode a single bad pattern
    /// rejects the whole rule set before anything is touched.
    pub fn new(rules: &[ReplacementRule], mode: ReplaceMode) -> Result<Self> {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::with_capacity(rules.len());
        for rule in rules {
            match mode {
                ReplaceMode::Literal => matchers.push(Box::new(LiteralMatcher {
                    find: rule.find.clone(),
                    replace: rule.replace.clone(),
                })),
                ReplaceMode::Pattern => {
                    let pattern =
                        Regex::new(&rule.find).map_err(|e| DocxError::InvalidPattern {
                            pattern: rule.find.clone(),
                            reason: e.to_string(),
                        })?;
                    matchers.push(Box::new(PatternMatcher {
                        pattern,
                        replace: rule.replace.clone(),
                    }));
                }
            }
        }
        Ok(Self { matchers })
    }

    /// Rewrites document paragraphs, then every cell paragraph of every table
    /// (table order, then row-major). Returns the number of changed units.
    pub fn apply(&self, document: &mut Document) -> usize {
        if self.matchers.is_empty() {
            return 0;
        }

        let mut changes = 0;
        for paragraph in document.paragraphs_mut() {
            changes += usize::from(self.rewrite(paragraph));
        }
        for table in document.tables_mut() {
            for row in table.rows_mut() {
                for cell in row.cells_mut() {
                    for paragraph in cell.paragraphs_mut() {
                        changes += usize::from(self.rewrite(paragraph));
                    }
                }
            }
        }
        debug!("Replacement pass changed {} text units", changes);
        changes
    }

    /// Runs `text` through every rule in order.
    pub fn transform(&self, text: &str) -> String {
        self.matchers
            .iter()
            .fold(text.to_string(), |current, matcher| {
                match matcher.substitute(&current) {
                    Cow::Borrowed(_) => current,
                    Cow::Owned(changed) => changed,
                }
            })
    }

    fn rewrite(&self, paragraph: &mut Paragraph) -> bool {
        let original = paragraph.text();
        let modified = self.transform(&original);
        if modified == original {
            return false;
        }
        paragraph.set_text(&modified);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::parse_document;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>a a</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:rPr><w:i/></w:rPr><w:t>Invoice </w:t></w:r><w:r><w:t>2023-01-05</w:t></w:r></w:p>
<w:p><w:r><w:t>untouched</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>a cell</w:t></w:r></w:p><w:p><w:r><w:t>plain</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#;

    fn texts(doc: &Document) -> Vec<String> {
        doc.paragraphs().map(Paragraph::text).collect()
    }

    #[test]
    fn test_literal_counts_units_not_occurrences() {
        let mut doc = parse_document(DOC).unwrap();
        let engine =
            ReplacementEngine::new(&[ReplacementRule::new("a", "b")], ReplaceMode::Literal)
                .unwrap();
        // "a a" paragraph, then both paragraphs of the first cell
        assert_eq!(engine.apply(&mut doc), 3);
        assert_eq!(texts(&doc)[0], "b b");
        let cell = doc.table(0).unwrap().cell(0, 0).unwrap();
        assert_eq!(cell.text(), "b cell\nplbin");
    }

    #[test]
    fn test_no_match_changes_nothing() {
        let mut doc = parse_document(DOC).unwrap();
        let before = doc.clone();
        let engine =
            ReplacementEngine::new(&[ReplacementRule::new("zzz", "y")], ReplaceMode::Literal)
                .unwrap();
        assert_eq!(engine.apply(&mut doc), 0);
        assert_eq!(doc, before);
        assert_eq!(doc.to_xml(), before.to_xml());
    }

    #[test]
    fn test_later_rules_see_earlier_output() {
        let engine = ReplacementEngine::new(
            &[ReplacementRule::new("cat", "dog"), ReplacementRule::new("dog", "wolf")],
            ReplaceMode::Literal,
        )
        .unwrap();
        assert_eq!(engine.transform("cat and dog"), "wolf and wolf");
    }

    #[test]
    fn test_rule_reverting_text_is_not_a_change() {
        let mut doc = parse_document(DOC).unwrap();
        let engine = ReplacementEngine::new(
            &[ReplacementRule::new("untouched", "x"), ReplacementRule::new("x", "untouched")],
            ReplaceMode::Literal,
        )
        .unwrap();
        assert_eq!(engine.apply(&mut doc), 0);
    }

    #[test]
    fn test_pattern_rewrite_collapses_runs_but_keeps_style() {
        let mut doc = parse_document(DOC).unwrap();
        let engine = ReplacementEngine::new(
            &[ReplacementRule::new(r"(\d{4})-(\d{2})-(\d{2})", "$3.$2.$1")],
            ReplaceMode::Pattern,
        )
        .unwrap();
        assert_eq!(engine.apply(&mut doc), 1);
        let paragraph = doc.paragraphs().nth(1).unwrap();
        assert_eq!(paragraph.text(), "Invoice 05.01.2023");
        assert_eq!(paragraph.runs().count(), 1);
        assert_eq!(paragraph.style(), Some("Quote"));
    }

    #[test]
    fn test_invalid_pattern_rejects_everything() {
        let rules = [
            ReplacementRule::new("a", "b"),
            ReplacementRule::new("(unclosed", "x"),
            ReplacementRule::new("c", "d"),
        ];
        let err = ReplacementEngine::new(&rules, ReplaceMode::Pattern).unwrap_err();
        match err {
            DocxError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_same_text_literal_mode_is_not_a_pattern() {
        let engine =
            ReplacementEngine::new(&[ReplacementRule::new("(unclosed", "ok")], ReplaceMode::Literal)
                .unwrap();
        assert_eq!(engine.transform("x (unclosed"), "x ok");
    }

    #[test]
    fn test_empty_literal_never_matches() {
        let engine =
            ReplacementEngine::new(&[ReplacementRule::new("", "x")], ReplaceMode::Literal).unwrap();
        assert_eq!(engine.transform("abc"), "abc");
    }
}

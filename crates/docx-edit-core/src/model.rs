//! In-memory view of a WordprocessingML body.
//!
//! Only the parts the editing operations need are modelled: paragraphs, runs,
//! tables, rows and cells. Everything else (section properties, bookmarks,
//! drawings inside untouched runs, cell properties, ...) is carried as raw XML
//! and written back exactly as it was read.

use std::fmt;

/// Width used when splitting a new table into equal columns (6.5in in twips).
const TABLE_WIDTH_TWIPS: usize = 9360;

/// Start and end tags of an element, kept so that attributes survive rewrites.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tags {
    pub(crate) open: String,
    pub(crate) close: String,
}

impl Tags {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            open: format!("<{name}>"),
            close: format!("</{name}>"),
        }
    }
}

/// A modelled child element or an opaque one preserved verbatim.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Part<T> {
    Node(T),
    Raw(String),
}

impl<T> Part<T> {
    fn node(&self) -> Option<&T> {
        match self {
            Part::Node(node) => Some(node),
            Part::Raw(_) => None,
        }
    }

    fn node_mut(&mut self) -> Option<&mut T> {
        match self {
            Part::Node(node) => Some(node),
            Part::Raw(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BodyItem {
    Paragraph(Paragraph),
    Table(Table),
    /// Trailing `w:sectPr`; appended content goes in front of it.
    Section(String),
    Raw(String),
}

/// The main document part: an ordered sequence of paragraphs and tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Everything up to and including the body start tag.
    pub(crate) head: String,
    /// Everything from the body end tag onwards.
    pub(crate) tail: String,
    pub(crate) body: Vec<BodyItem>,
}

impl Document {
    /// Document-level paragraphs in body order (table content excluded).
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|item| match item {
            BodyItem::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.body.iter_mut().filter_map(|item| match item {
            BodyItem::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Top-level tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|item| match item {
            BodyItem::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.body.iter_mut().filter_map(|item| match item {
            BodyItem::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn table_count(&self) -> usize {
        self.tables().count()
    }

    pub fn table(&self, index: usize) -> Option<&Table> {
        self.tables().nth(index)
    }

    pub fn table_mut(&mut self, index: usize) -> Option<&mut Table> {
        self.tables_mut().nth(index)
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        let at = self.append_position();
        self.body.insert(at, BodyItem::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        let at = self.append_position();
        self.body.insert(at, BodyItem::Table(table));
    }

    fn append_position(&self) -> usize {
        match self.body.last() {
            Some(BodyItem::Section(_)) => self.body.len() - 1,
            _ => self.body.len(),
        }
    }
}

/// Paragraph properties (`w:pPr`) together with the style they name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphProperties {
    pub(crate) xml: Option<String>,
    pub(crate) style: Option<String>,
}

impl ParagraphProperties {
    /// Properties consisting of a single paragraph style reference.
    pub fn with_style(style: &str) -> Self {
        Self {
            xml: Some(format!(
                "<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>",
                crate::ooxml::escape_attr(style)
            )),
            style: Some(style.to_string()),
        }
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inline {
    Run(Run),
    /// Hyperlinks, bookmarks, field markers, ... `text` holds whatever visible
    /// text they contribute to the paragraph.
    Raw { xml: String, text: String },
}

/// A paragraph: properties plus an ordered sequence of runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub(crate) tags: Tags,
    pub(crate) properties: ParagraphProperties,
    pub(crate) content: Vec<Inline>,
}

impl Default for Paragraph {
    fn default() -> Self {
        Self {
            tags: Tags::new("w:p"),
            properties: ParagraphProperties::default(),
            content: Vec::new(),
        }
    }
}

impl Paragraph {
    /// A paragraph holding `text` in a single run.
    pub fn new(text: &str) -> Self {
        let mut paragraph = Self::default();
        paragraph.set_text(text);
        paragraph
    }

    /// A paragraph with the given paragraph style.
    pub fn styled(text: &str, style: &str) -> Self {
        let mut paragraph = Self::new(text);
        paragraph.properties = ParagraphProperties::with_style(style);
        paragraph
    }

    /// Concatenated text of every run, including runs inside hyperlinks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|inline| match inline {
                Inline::Run(run) => run.text(),
                Inline::Raw { text, .. } => text.as_str(),
            })
            .collect()
    }

    pub fn style(&self) -> Option<&str> {
        self.properties.style()
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|inline| match inline {
            Inline::Run(run) => Some(run),
            Inline::Raw { .. } => None,
        })
    }

    /// Removes all inline content. Paragraph properties are kept.
    pub fn clear(&mut self) {
        self.content.clear();
    }

    pub fn add_run(&mut self, run: Run) {
        self.content.push(Inline::Run(run));
    }

    /// Collapses the paragraph to one run bearing `text`.
    pub fn set_text(&mut self, text: &str) {
        self.clear();
        if !text.is_empty() {
            self.add_run(Run::new(text));
        }
    }

    pub fn take_properties(&mut self) -> ParagraphProperties {
        std::mem::take(&mut self.properties)
    }

    pub fn restore_properties(&mut self, properties: ParagraphProperties) {
        self.properties = properties;
    }
}

/// A run of text. Runs read from a file keep their original XML until the
/// paragraph holding them is rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub(crate) xml: Option<String>,
    pub(crate) text: String,
}

impl Run {
    pub fn new(text: &str) -> Self {
        Self {
            xml: None,
            text: text.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A table: rows of cells, plus its raw `w:tblPr`/`w:tblGrid`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(crate) tags: Tags,
    pub(crate) content: Vec<Part<Row>>,
}

impl Table {
    /// An empty `rows` x `cols` grid with equal column widths.
    pub fn blank(rows: usize, cols: usize) -> Self {
        let width = TABLE_WIDTH_TWIPS / cols.max(1);
        let mut content = vec![
            Part::Raw(
                "<w:tblPr><w:tblW w:w=\"0\" w:type=\"auto\"/><w:tblLook w:val=\"04A0\"/></w:tblPr>"
                    .to_string(),
            ),
            Part::Raw(format!(
                "<w:tblGrid>{}</w:tblGrid>",
                format!("<w:gridCol w:w=\"{width}\"/>").repeat(cols)
            )),
        ];
        for _ in 0..rows {
            content.push(Part::Node(Row {
                tags: Tags::new("w:tr"),
                content: (0..cols).map(|_| Part::Node(Cell::blank(width))).collect(),
            }));
        }
        Self {
            tags: Tags::new("w:tbl"),
            content,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.content.iter().filter_map(Part::node)
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.content.iter_mut().filter_map(Part::node_mut)
    }

    pub fn row_count(&self) -> usize {
        self.rows().count()
    }

    /// Width of the first row; editing treats it as the table's width.
    pub fn column_count(&self) -> usize {
        self.rows().next().map(Row::cell_count).unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows().nth(index)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.row(row).and_then(|r| r.cell(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows_mut()
            .nth(row)
            .and_then(|r| r.cells_mut().nth(col))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) tags: Tags,
    pub(crate) content: Vec<Part<Cell>>,
}

impl Row {
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.content.iter().filter_map(Part::node)
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.content.iter_mut().filter_map(Part::node_mut)
    }

    pub fn cell_count(&self) -> usize {
        self.cells().count()
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells().nth(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub(crate) tags: Tags,
    pub(crate) content: Vec<Part<Paragraph>>,
}

impl Cell {
    fn blank(width: usize) -> Self {
        Self {
            tags: Tags::new("w:tc"),
            content: vec![
                Part::Raw(format!(
                    "<w:tcPr><w:tcW w:w=\"{width}\" w:type=\"dxa\"/></w:tcPr>"
                )),
                Part::Node(Paragraph::default()),
            ],
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().filter_map(Part::node)
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.content.iter_mut().filter_map(Part::node_mut)
    }

    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rewrites the cell to show `text`, returning whether anything changed.
    ///
    /// Nothing happens when the trimmed current text already equals the
    /// trimmed new text. Otherwise the first paragraph gets a single run with
    /// the new text while keeping its paragraph properties, and any further
    /// paragraphs are emptied but left in place.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text().trim() == text.trim() {
            return false;
        }

        if self.paragraphs().next().is_none() {
            self.content.push(Part::Node(Paragraph::new(text)));
            return true;
        }

        let mut paragraphs = self.paragraphs_mut();
        if let Some(first) = paragraphs.next() {
            let properties = first.take_properties();
            first.clear();
            first.add_run(Run::new(text));
            first.restore_properties(properties);
        }
        for rest in paragraphs {
            rest.clear();
        }
        true
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text().trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::parse_document;
    use pretty_assertions::assert_eq;

    const CELL_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:tbl><w:tblPr/><w:tr><w:tc><w:tcPr/><w:p><w:pPr><w:pStyle w:val="Cell"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Old</w:t></w:r><w:r><w:t> value</w:t></w:r></w:p><w:p><w:r><w:t>second</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:sectPr/></w:body></w:document>"#;

    #[test]
    fn test_cell_text_joins_paragraphs() {
        let doc = parse_document(CELL_DOC).unwrap();
        let cell = doc.table(0).unwrap().cell(0, 0).unwrap();
        assert_eq!(cell.text(), "Old value\nsecond");
    }

    #[test]
    fn test_set_text_keeps_style_and_blanks_later_paragraphs() {
        let mut doc = parse_document(CELL_DOC).unwrap();
        let cell = doc.table_mut(0).unwrap().cell_mut(0, 0).unwrap();

        assert!(cell.set_text("New"));

        let paragraphs: Vec<&Paragraph> = cell.paragraphs().collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].style(), Some("Cell"));
        assert_eq!(paragraphs[0].runs().count(), 1);
        assert_eq!(paragraphs[0].text(), "New");
        assert_eq!(paragraphs[1].text(), "");
        assert_eq!(cell.to_string(), "New");
    }

    #[test]
    fn test_set_text_is_idempotent_on_trimmed_text() {
        let mut doc = parse_document(CELL_DOC).unwrap();
        let cell = doc.table_mut(0).unwrap().cell_mut(0, 0).unwrap();
        assert!(cell.set_text("X"));
        assert!(!cell.set_text("  X "));
    }

    #[test]
    fn test_blank_table_shape() {
        let table = Table::blank(3, 2);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cell(2, 1).unwrap().text(), "");
        assert!(table.cell(3, 0).is_none());
    }

    #[test]
    fn test_appended_items_precede_section_properties() {
        let mut doc = parse_document(CELL_DOC).unwrap();
        doc.push_paragraph(Paragraph::new("tail"));
        assert!(matches!(doc.body.last(), Some(BodyItem::Section(_))));
        assert_eq!(doc.paragraphs().last().unwrap().text(), "tail");
    }

    #[test]
    fn test_styled_paragraph() {
        let paragraph = Paragraph::styled("Intro", "Heading1");
        assert_eq!(paragraph.style(), Some("Heading1"));
        assert_eq!(paragraph.text(), "Intro");
    }
}

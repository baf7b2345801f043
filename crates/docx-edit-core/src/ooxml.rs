//! Reading `word/document.xml` into the model and writing it back.

use std::borrow::Cow;

use roxmltree::Node;

use crate::error::{DocxError, Result};
use crate::model::{
    BodyItem, Cell, Document, Inline, Paragraph, ParagraphProperties, Part, Row, Run, Table, Tags,
};

pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Local name of a WordprocessingML element, `None` for anything else.
fn w_name<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    if node.is_element() && node.tag_name().namespace() == Some(W_NS) {
        Some(node.tag_name().name())
    } else {
        None
    }
}

fn w_attr<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((W_NS, name))
}

fn source<'x>(xml: &'x str, node: &Node) -> &'x str {
    &xml[node.range()]
}

fn element_tags(xml: &str, node: &Node) -> Tags {
    let range = node.range();
    if let (Some(first), Some(last)) = (node.first_child(), node.last_child()) {
        return Tags {
            open: xml[range.start..first.range().start].to_string(),
            close: xml[last.range().end..range.end].to_string(),
        };
    }

    let element = &xml[range];
    match element.strip_suffix("/>") {
        Some(open) => {
            let name = element[1..]
                .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .next()
                .unwrap_or_default();
            Tags {
                open: format!("{}>", open.trim_end()),
                close: format!("</{name}>"),
            }
        }
        None => {
            let split = element.rfind("</").unwrap_or(element.len());
            Tags {
                open: element[..split].to_string(),
                close: element[split..].to_string(),
            }
        }
    }
}

/// Parses a main document part.
pub fn parse_document(xml: &str) -> Result<Document> {
    let parsed = roxmltree::Document::parse(xml)?;
    let body = parsed
        .root_element()
        .children()
        .find(|n| w_name(n) == Some("body"))
        .ok_or_else(|| DocxError::Package("document part has no body".to_string()))?;

    let tags = element_tags(xml, &body);
    let range = body.range();
    let head = format!("{}{}", &xml[..range.start], tags.open);
    let tail = format!("{}{}", tags.close, &xml[range.end..]);

    let items = body
        .children()
        .filter(Node::is_element)
        .map(|child| match w_name(&child) {
            Some("p") => BodyItem::Paragraph(parse_paragraph(xml, &child)),
            Some("tbl") => BodyItem::Table(parse_table(xml, &child)),
            Some("sectPr") => BodyItem::Section(source(xml, &child).to_string()),
            _ => BodyItem::Raw(source(xml, &child).to_string()),
        })
        .collect();

    Ok(Document {
        head,
        tail,
        body: items,
    })
}

fn parse_paragraph(xml: &str, node: &Node) -> Paragraph {
    let mut properties = ParagraphProperties::default();
    let mut content = Vec::new();

    for child in node.children().filter(Node::is_element) {
        let raw = source(xml, &child).to_string();
        match w_name(&child) {
            Some("pPr") => {
                let style = child
                    .children()
                    .find(|n| w_name(n) == Some("pStyle"))
                    .and_then(|n| w_attr(&n, "val"))
                    .map(str::to_string);
                properties = ParagraphProperties {
                    xml: Some(raw),
                    style,
                };
            }
            Some("r") => content.push(Inline::Run(Run {
                xml: Some(raw),
                text: run_text(&child),
            })),
            Some("hyperlink") => {
                let text = child
                    .children()
                    .filter(|n| w_name(n) == Some("r"))
                    .map(|r| run_text(&r))
                    .collect();
                content.push(Inline::Raw { xml: raw, text });
            }
            _ => content.push(Inline::Raw {
                xml: raw,
                text: String::new(),
            }),
        }
    }

    Paragraph {
        tags: element_tags(xml, node),
        properties,
        content,
    }
}

fn run_text(node: &Node) -> String {
    let mut text = String::new();
    for child in node.children() {
        match w_name(&child) {
            Some("t") => text.push_str(child.text().unwrap_or_default()),
            Some("tab") => text.push('\t'),
            Some("br") => {
                let kind = w_attr(&child, "type").unwrap_or("textWrapping");
                if kind == "textWrapping" {
                    text.push('\n');
                }
            }
            Some("cr") => text.push('\n'),
            Some("noBreakHyphen") => text.push('-'),
            _ => {}
        }
    }
    text
}

fn parse_table(xml: &str, node: &Node) -> Table {
    let content = node
        .children()
        .filter(Node::is_element)
        .map(|child| match w_name(&child) {
            Some("tr") => Part::Node(parse_row(xml, &child)),
            _ => Part::Raw(source(xml, &child).to_string()),
        })
        .collect();
    Table {
        tags: element_tags(xml, node),
        content,
    }
}

fn parse_row(xml: &str, node: &Node) -> Row {
    let content = node
        .children()
        .filter(Node::is_element)
        .map(|child| match w_name(&child) {
            Some("tc") => Part::Node(parse_cell(xml, &child)),
            _ => Part::Raw(source(xml, &child).to_string()),
        })
        .collect();
    Row {
        tags: element_tags(xml, node),
        content,
    }
}

fn parse_cell(xml: &str, node: &Node) -> Cell {
    let content = node
        .children()
        .filter(Node::is_element)
        .map(|child| match w_name(&child) {
            Some("p") => Part::Node(parse_paragraph(xml, &child)),
            _ => Part::Raw(source(xml, &child).to_string()),
        })
        .collect();
    Cell {
        tags: element_tags(xml, node),
        content,
    }
}

// ── Serialisation ──────────────────────────────────────────────

fn escape(text: &str, attribute: bool) -> Cow<'_, str> {
    let needs_escape = |c: char| {
        matches!(c, '&' | '<' | '>') || (attribute && c == '"') || is_forbidden(c)
    };
    if !text.chars().any(needs_escape) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c if is_forbidden(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Control characters XML 1.0 cannot carry.
fn is_forbidden(c: char) -> bool {
    (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')
}

pub(crate) fn escape_attr(text: &str) -> Cow<'_, str> {
    escape(text, true)
}

impl Document {
    /// Serialises the part back to XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.head.len() + self.tail.len() + 4096);
        out.push_str(&self.head);
        for item in &self.body {
            match item {
                BodyItem::Paragraph(p) => write_paragraph(p, &mut out),
                BodyItem::Table(t) => write_table(t, &mut out),
                BodyItem::Section(raw) | BodyItem::Raw(raw) => out.push_str(raw),
            }
        }
        out.push_str(&self.tail);
        out
    }
}

fn write_paragraph(paragraph: &Paragraph, out: &mut String) {
    out.push_str(&paragraph.tags.open);
    if let Some(properties) = &paragraph.properties.xml {
        out.push_str(properties);
    }
    for inline in &paragraph.content {
        match inline {
            Inline::Run(run) => write_run(run, out),
            Inline::Raw { xml, .. } => out.push_str(xml),
        }
    }
    out.push_str(&paragraph.tags.close);
}

/// New runs encode `\n` as a line break and `\t` as a tab.
fn write_run(run: &Run, out: &mut String) {
    if let Some(xml) = &run.xml {
        out.push_str(xml);
        return;
    }

    fn flush(segment: &mut String, out: &mut String) {
        if !segment.is_empty() {
            out.push_str("<w:t xml:space=\"preserve\">");
            out.push_str(&escape(segment, false));
            out.push_str("</w:t>");
            segment.clear();
        }
    }

    out.push_str("<w:r>");
    let mut segment = String::new();
    for c in run.text.chars() {
        match c {
            '\n' => {
                flush(&mut segment, out);
                out.push_str("<w:br/>");
            }
            '\t' => {
                flush(&mut segment, out);
                out.push_str("<w:tab/>");
            }
            '\r' => {}
            c => segment.push(c),
        }
    }
    flush(&mut segment, out);
    out.push_str("</w:r>");
}

fn write_table(table: &Table, out: &mut String) {
    out.push_str(&table.tags.open);
    for part in &table.content {
        match part {
            Part::Node(row) => write_row(row, out),
            Part::Raw(raw) => out.push_str(raw),
        }
    }
    out.push_str(&table.tags.close);
}

fn write_row(row: &Row, out: &mut String) {
    out.push_str(&row.tags.open);
    for part in &row.content {
        match part {
            Part::Node(cell) => write_cell(cell, out),
            Part::Raw(raw) => out.push_str(raw),
        }
    }
    out.push_str(&row.tags.close);
}

fn write_cell(cell: &Cell, out: &mut String) {
    out.push_str(&cell.tags.open);
    for part in &cell.content {
        match part {
            Part::Node(paragraph) => write_paragraph(paragraph, out),
            Part::Raw(raw) => out.push_str(raw),
        }
    }
    out.push_str(&cell.tags.close);
}

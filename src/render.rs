//! Read-only renderings of a document for `read_docx`.

use docx_edit_core::{Document, Paragraph};
use serde::Serialize;

pub const EMPTY_DOCUMENT: &str = "The document is empty or contains no text.";

#[derive(Debug, Serialize)]
struct DocumentJson {
    paragraphs: Vec<ParagraphJson>,
    tables: Vec<TableJson>,
}

#[derive(Debug, Serialize)]
struct ParagraphJson {
    index: usize,
    text: String,
}

#[derive(Debug, Serialize)]
struct TableJson {
    index: usize,
    rows: usize,
    columns: usize,
    cells: Vec<CellJson>,
}

#[derive(Debug, Serialize)]
struct CellJson {
    row: usize,
    column: usize,
    text: String,
}

/// Paragraphs then tables, numbered from 1. Blank paragraphs and cells are
/// left out but still take up their number.
pub fn as_text(document: &Document) -> String {
    let mut lines: Vec<String> = Vec::new();

    let paragraphs: Vec<String> = document
        .paragraphs()
        .enumerate()
        .filter_map(|(i, paragraph)| {
            let text = paragraph.text();
            (!text.trim().is_empty()).then(|| format!("[Paragraph {}] {}", i + 1, text))
        })
        .collect();
    if !paragraphs.is_empty() {
        lines.push("=== PARAGRAPHS ===".to_string());
        lines.extend(paragraphs);
    }

    if document.table_count() > 0 {
        lines.push("\n=== TABLES ===".to_string());
        for (t, table) in document.tables().enumerate() {
            lines.push(format!("\n[Table {}]", t + 1));
            for (r, row) in table.rows().enumerate() {
                let cells: Vec<String> = row
                    .cells()
                    .enumerate()
                    .filter_map(|(c, cell)| {
                        let text = cell.to_string();
                        (!text.is_empty()).then(|| format!("({},{}): {}", r + 1, c + 1, text))
                    })
                    .collect();
                if !cells.is_empty() {
                    lines.push(cells.join(" | "));
                }
            }
        }
    }

    let text = lines.join("\n");
    if text.trim().is_empty() {
        EMPTY_DOCUMENT.to_string()
    } else {
        text
    }
}

/// Pretty-printed JSON with 0-based indices.
pub fn as_json(document: &Document) -> serde_json::Result<String> {
    let json = DocumentJson {
        paragraphs: document
            .paragraphs()
            .enumerate()
            .filter(|(_, paragraph)| !paragraph.text().trim().is_empty())
            .map(|(index, paragraph)| ParagraphJson {
                index,
                text: Paragraph::text(paragraph),
            })
            .collect(),
        tables: document
            .tables()
            .enumerate()
            .map(|(index, table)| TableJson {
                index,
                rows: table.row_count(),
                columns: table.column_count(),
                cells: table
                    .rows()
                    .enumerate()
                    .flat_map(|(row, cells)| {
                        cells.cells().enumerate().filter_map(move |(column, cell)| {
                            let text = cell.to_string();
                            (!text.is_empty()).then_some(CellJson { row, column, text })
                        })
                    })
                    .collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&json)
}

/// Table count, then each table's shape and header row.
pub fn tables_summary(document: &Document) -> String {
    let mut lines = vec![format!("Tables found: {}", document.table_count())];
    for (t, table) in document.tables().enumerate() {
        lines.push(format!("\nTable {}:", t + 1));
        lines.push(format!("  Rows: {}", table.row_count()));
        lines.push(format!("  Columns: {}", table.column_count()));
        if let Some(header) = table.row(0) {
            let cells: Vec<String> = header.cells().map(|cell| cell.to_string()).collect();
            lines.push(format!("  Header: {}", cells.join(" | ")));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_edit_core::ooxml::parse_document;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Title</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Body</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t> Qty </w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p/></w:tc><w:tc><w:p><w:r><w:t>3</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#;

    #[test]
    fn test_text_rendering() {
        let doc = parse_document(DOC).unwrap();
        let expected = "=== PARAGRAPHS ===\n\
                        [Paragraph 1] Title\n\
                        [Paragraph 3] Body\n\
                        \n\
                        === TABLES ===\n\
                        \n\
                        [Table 1]\n\
                        (1,1): Name | (1,2): Qty\n\
                        (2,2): 3";
        assert_eq!(as_text(&doc), expected);
    }

    #[test]
    fn test_empty_document_text() {
        let doc = parse_document(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/></w:body></w:document>"#,
        )
        .unwrap();
        assert_eq!(as_text(&doc), EMPTY_DOCUMENT);
    }

    #[test]
    fn test_json_rendering() {
        let doc = parse_document(DOC).unwrap();
        let value: serde_json::Value = serde_json::from_str(&as_json(&doc).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "paragraphs": [
                    {"index": 0, "text": "Title"},
                    {"index": 2, "text": "Body"}
                ],
                "tables": [{
                    "index": 0,
                    "rows": 2,
                    "columns": 2,
                    "cells": [
                        {"row": 0, "column": 0, "text": "Name"},
                        {"row": 0, "column": 1, "text": "Qty"},
                        {"row": 1, "column": 1, "text": "3"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_tables_summary() {
        let doc = parse_document(DOC).unwrap();
        assert_eq!(
            tables_summary(&doc),
            "Tables found: 1\n\nTable 1:\n  Rows: 2\n  Columns: 2\n  Header: Name | Qty"
        );
    }
}

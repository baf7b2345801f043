//! Appending typed content blocks to the end of a document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{DocxError, Result};
use crate::model::{Document, Paragraph, Table};

const MAX_HEADING_LEVEL: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    #[default]
    Bullet,
    Number,
}

impl ListStyle {
    fn paragraph_style(self) -> &'static str {
        match self {
            ListStyle::Bullet => "ListBullet",
            ListStyle::Number => "ListNumber",
        }
    }
}

/// A unit of content to append.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph {
        #[serde(default)]
        text: String,
    },
    /// Level 0 is the document title, 1 to 9 are heading levels.
    Heading {
        #[serde(default)]
        text: String,
        #[serde(default = "default_heading_level")]
        level: u8,
    },
    /// The first row fixes the column count; extra cells in later rows are
    /// dropped.
    Table {
        #[serde(default, deserialize_with = "scalar_rows")]
        rows: Vec<Vec<String>>,
    },
    List {
        #[serde(default)]
        items: Vec<String>,
        #[serde(default)]
        style: ListStyle,
    },
}

fn default_heading_level() -> u8 {
    1
}

/// Table cells may be given as any JSON value and are stored as text.
fn scalar_rows<'de, D>(deserializer: D) -> std::result::Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Vec::<Vec<Value>>::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|value| match value {
                    Value::Null => String::new(),
                    Value::String(text) => text,
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

impl ContentBlock {
    /// Decodes a caller-supplied block. A missing `type` means `paragraph`.
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(DocxError::InvalidOperation(format!(
                "content block must be an object, got {value}"
            )));
        }
        let mut value = value.clone();
        if let Some(map) = value.as_object_mut() {
            map.entry("type").or_insert_with(|| Value::from("paragraph"));
        }
        let block: ContentBlock = serde_json::from_value(value)
            .map_err(|e| DocxError::InvalidOperation(format!("content block: {e}")))?;

        if let ContentBlock::Heading { level, .. } = block {
            if level > MAX_HEADING_LEVEL {
                return Err(DocxError::InvalidOperation(format!(
                    "heading level {level} is out of range 0-{MAX_HEADING_LEVEL}"
                )));
            }
        }
        Ok(block)
    }

    /// Appends the block, returning false when it has nothing to add.
    fn append_to(&self, document: &mut Document) -> bool {
        match self {
            ContentBlock::Paragraph { text } => {
                if text.is_empty() {
                    return false;
                }
                document.push_paragraph(Paragraph::new(text));
            }
            ContentBlock::Heading { text, level } => {
                if text.is_empty() {
                    return false;
                }
                let style = match level {
                    0 => "Title".to_string(),
                    n => format!("Heading{n}"),
                };
                document.push_paragraph(Paragraph::styled(text, &style));
            }
            ContentBlock::Table { rows } => {
                let columns = rows.first().map(Vec::len).unwrap_or(0);
                if columns == 0 {
                    return false;
                }
                let mut table = Table::blank(rows.len(), columns);
                for (i, row) in rows.iter().enumerate() {
                    for (j, text) in row.iter().take(columns).enumerate() {
                        let paragraph = table
                            .cell_mut(i, j)
                            .and_then(|cell| cell.paragraphs_mut().next());
                        if let Some(paragraph) = paragraph {
                            paragraph.set_text(text);
                        }
                    }
                }
                document.push_table(table);
            }
            ContentBlock::List { items, style } => {
                if items.is_empty() {
                    return false;
                }
                for item in items {
                    document.push_paragraph(Paragraph::styled(item, style.paragraph_style()));
                }
            }
        }
        true
    }
}

/// Appends content blocks in order.
#[derive(Debug, Clone, Default)]
pub struct ContentAppender {
    blocks: Vec<ContentBlock>,
}

impl ContentAppender {
    /// Decodes every block before anything is appended; one bad block
    /// rejects the whole list.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        let blocks = values
            .iter()
            .map(ContentBlock::from_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks })
    }

    /// Returns the number of blocks that added content.
    pub fn append(&self, document: &mut Document) -> usize {
        let appended = self
            .blocks
            .iter()
            .filter(|block| block.append_to(document))
            .count();
        debug!("Appended {} of {} content blocks", appended, self.blocks.len());
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::parse_document;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn empty_doc() -> Document {
        parse_document(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:sectPr/></w:body></w:document>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_blocks_append_in_order() {
        let mut doc = empty_doc();
        let appender = ContentAppender::from_values(&[
            json!({"type": "heading", "text": "Report", "level": 0}),
            json!({"text": "Intro"}),
            json!({"type": "heading", "text": "Details", "level": 2}),
            json!({"type": "list", "items": ["one", "two"], "style": "number"}),
            json!({"type": "list", "items": ["dot"]}),
        ])
        .unwrap();
        assert_eq!(appender.append(&mut doc), 5);

        let styled: Vec<(String, Option<String>)> = doc
            .paragraphs()
            .map(|p| (p.text(), p.style().map(str::to_string)))
            .collect();
        assert_eq!(
            styled,
            vec![
                ("Report".to_string(), Some("Title".to_string())),
                ("Intro".to_string(), None),
                ("Details".to_string(), Some("Heading2".to_string())),
                ("one".to_string(), Some("ListNumber".to_string())),
                ("two".to_string(), Some("ListNumber".to_string())),
                ("dot".to_string(), Some("ListBullet".to_string())),
            ]
        );
    }

    #[test]
    fn test_table_uses_first_row_width() {
        let mut doc = empty_doc();
        let appender = ContentAppender::from_values(&[json!({
            "type": "table",
            "rows": [["a", "b"], ["c", "d", "dropped"], [1, null]]
        })])
        .unwrap();
        assert_eq!(appender.append(&mut doc), 1);

        let table = doc.table(0).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row(1).unwrap().cell_count(), 2);
        assert_eq!(table.cell(1, 1).unwrap().text(), "d");
        assert_eq!(table.cell(2, 0).unwrap().text(), "1");
        assert_eq!(table.cell(2, 1).unwrap().text(), "");
    }

    #[test]
    fn test_whitespace_cells_are_written_verbatim() {
        let mut doc = empty_doc();
        let appender = ContentAppender::from_values(&[json!({
            "type": "table",
            "rows": [["   ", " x "]]
        })])
        .unwrap();
        assert_eq!(appender.append(&mut doc), 1);

        let table = doc.table(0).unwrap();
        assert_eq!(table.cell(0, 0).unwrap().text(), "   ");
        assert_eq!(table.cell(0, 1).unwrap().text(), " x ");
    }

    #[test]
    fn test_empty_blocks_are_skipped() {
        let mut doc = empty_doc();
        let appender = ContentAppender::from_values(&[
            json!({"type": "paragraph", "text": ""}),
            json!({"type": "heading"}),
            json!({"type": "table", "rows": [[]]}),
            json!({"type": "list", "items": []}),
        ])
        .unwrap();
        assert_eq!(appender.append(&mut doc), 0);
        assert_eq!(doc, empty_doc());
    }

    #[test]
    fn test_bad_block_rejects_all() {
        let err = ContentAppender::from_values(&[
            json!({"type": "paragraph", "text": "fine"}),
            json!({"type": "image", "src": "x.png"}),
        ])
        .unwrap_err();
        assert!(matches!(err, DocxError::InvalidOperation(_)));

        let err =
            ContentBlock::from_value(&json!({"type": "heading", "text": "x", "level": 12}))
                .unwrap_err();
        assert!(err.to_string().contains("heading level 12"));
    }
}

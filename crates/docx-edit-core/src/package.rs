//! The `.docx` ZIP container.
//!
//! A package is read fully into memory, its main document part parsed into a
//! [`Document`], and on save every entry is written back in its original order
//! with only the main document part replaced.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use docx_rs::{
    AbstractNumbering, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat, Numbering,
    NumberingId, SpecialIndentType, Start, Style, StyleType,
};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxError, Result};
use crate::model::Document;
use crate::ooxml::parse_document;

const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

// Numbering instances behind the list styles of a blank document. Id 1 is
// taken by the default numbering docx-rs always emits.
const NUMBER_ABSTRACT_ID: usize = 10;
const NUMBER_NUM_ID: usize = 11;
const BULLET_ABSTRACT_ID: usize = 20;
const BULLET_NUM_ID: usize = 21;

/// A single-level list definition.
fn list_levels(id: usize, format: &str, text: &str) -> AbstractNumbering {
    AbstractNumbering::new(id).add_level(
        Level::new(
            0,
            Start::new(1),
            NumberFormat::new(format),
            LevelText::new(text),
            LevelJc::new("left"),
        )
        .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
    )
}

/// A paragraph style whose paragraphs are items of numbering `num_id`.
fn list_style(id: &str, name: &str, num_id: usize) -> Style {
    let mut style = Style::new(id, StyleType::Paragraph).name(name);
    style.paragraph_property = style
        .paragraph_property
        .numbering(NumberingId::new(num_id), IndentLevel::new(0));
    style
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    is_dir: bool,
    data: Vec<u8>,
}

/// An opened `.docx` package.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<Entry>,
    document_part: String,
    document: Document,
}

impl DocxPackage {
    /// Loads a package from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let package = Self::from_bytes(&bytes)?;
        info!("Opened document from {:?} ({} bytes)", path, bytes.len());
        Ok(package)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push(Entry { name, is_dir, data });
        }

        let document_part = main_document_part(&entries);
        let entry = entries
            .iter()
            .find(|e| e.name == document_part)
            .ok_or_else(|| {
                DocxError::Package(format!("Part '{}' not found in DOCX", document_part))
            })?;
        let xml = std::str::from_utf8(&entry.data)
            .map_err(|e| DocxError::Package(format!("{document_part} is not UTF-8: {e}")))?;
        let document = parse_document(xml.trim_start_matches('\u{feff}'))?;
        debug!("Parsed main document part {}", document_part);

        Ok(Self {
            entries,
            document_part,
            document,
        })
    }

    /// A new empty document carrying the heading, title and list styles the
    /// appender refers to.
    pub fn blank() -> Result<Self> {
        let mut docx = Docx::new().add_style(
            Style::new("Title", StyleType::Paragraph)
                .name("Title")
                .size(56),
        );
        for level in 1..=9usize {
            let size = 36usize.saturating_sub(level * 2).max(22);
            docx = docx.add_style(
                Style::new(&format!("Heading{level}"), StyleType::Paragraph)
                    .name(&format!("heading {level}"))
                    .size(size)
                    .bold(),
            );
        }
        docx = docx
            .add_abstract_numbering(list_levels(BULLET_ABSTRACT_ID, "bullet", "\u{2022}"))
            .add_numbering(Numbering::new(BULLET_NUM_ID, BULLET_ABSTRACT_ID))
            .add_abstract_numbering(list_levels(NUMBER_ABSTRACT_ID, "decimal", "%1."))
            .add_numbering(Numbering::new(NUMBER_NUM_ID, NUMBER_ABSTRACT_ID))
            .add_style(list_style("ListBullet", "List Bullet", BULLET_NUM_ID))
            .add_style(list_style("ListNumber", "List Number", NUMBER_NUM_ID));

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| DocxError::Package(format!("Failed to build blank document: {e}")))?;
        Self::from_bytes(buffer.get_ref())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Serialises the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.clone(), options)?;
                continue;
            }
            writer.start_file(entry.name.clone(), options)?;
            if entry.name == self.document_part {
                writer.write_all(self.document.to_xml().as_bytes())?;
            } else {
                writer.write_all(&entry.data)?;
            }
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Writes the package to `path`, creating parent directories first.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        write_file(path, &bytes)?;
        info!("Saved document to {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }
}

/// Writes `bytes` to `path`, creating parent directories first.
///
/// The bytes go to a temporary file next to the target which then replaces
/// it, so a symlink at `path` is replaced rather than written through. An
/// existing regular target keeps its permissions.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    if let Ok(existing) = fs::symlink_metadata(path) {
        if existing.is_file() {
            fs::set_permissions(temp.path(), existing.permissions())?;
        }
    }
    temp.persist(path).map_err(|e| DocxError::Io(e.error))?;
    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

/// Resolves the main document part through `_rels/.rels`.
fn main_document_part(entries: &[Entry]) -> String {
    let target = entries
        .iter()
        .find(|e| e.name == "_rels/.rels")
        .and_then(|e| std::str::from_utf8(&e.data).ok())
        .and_then(|xml| {
            let doc = roxmltree::Document::parse(xml.trim_start_matches('\u{feff}')).ok()?;
            let target = doc
                .descendants()
                .filter(|n| n.tag_name().name() == "Relationship")
                .find(|n| n.attribute("Type") == Some(OFFICE_DOCUMENT_REL))
                .and_then(|n| n.attribute("Target"))
                .map(|t| t.trim_start_matches('/').to_string());
            target
        });
    target.unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Paragraph;
    use tempfile::TempDir;

    #[test]
    fn test_blank_package_has_empty_body() {
        let package = DocxPackage::blank().unwrap();
        assert_eq!(package.document().paragraphs().count(), 0);
        assert_eq!(package.document().table_count(), 0);
    }

    #[test]
    fn test_blank_list_styles_carry_numbering() {
        let package = DocxPackage::blank().unwrap();
        let part = |name: &str| {
            let entry = package.entries.iter().find(|e| e.name == name).unwrap();
            String::from_utf8(entry.data.clone()).unwrap()
        };

        let styles = part("word/styles.xml");
        let styles = roxmltree::Document::parse(&styles).unwrap();
        for (style_id, num_id) in [("ListBullet", "21"), ("ListNumber", "11")] {
            let style = styles
                .descendants()
                .filter(|n| n.tag_name().name() == "style")
                .find(|n| n.attributes().any(|a| a.name() == "styleId" && a.value() == style_id))
                .unwrap();
            assert!(
                style.descendants().any(|n| n.tag_name().name() == "numId"
                    && n.attributes().any(|a| a.name() == "val" && a.value() == num_id)),
                "{style_id} has no numId {num_id}"
            );
        }

        let numbering = part("word/numbering.xml");
        let numbering = roxmltree::Document::parse(&numbering).unwrap();
        let formats: Vec<&str> = numbering
            .descendants()
            .filter(|n| n.tag_name().name() == "numFmt")
            .filter_map(|n| n.attributes().find(|a| a.name() == "val").map(|a| a.value()))
            .collect();
        assert!(formats.contains(&"bullet"));
        assert!(formats.contains(&"decimal"));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/out.docx");

        let mut package = DocxPackage::blank().unwrap();
        package
            .document_mut()
            .push_paragraph(Paragraph::styled("Report", "Heading1"));
        package.document_mut().push_paragraph(Paragraph::new("Body text"));
        package.save(&path).unwrap();

        let reopened = DocxPackage::open(&path).unwrap();
        let texts: Vec<String> = reopened.document().paragraphs().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["Report".to_string(), "Body text".to_string()]);
        assert_eq!(
            reopened.document().paragraphs().next().unwrap().style(),
            Some("Heading1")
        );
    }

    #[test]
    fn test_entries_other_than_document_survive() {
        let package = DocxPackage::blank().unwrap();
        let bytes = package.to_bytes().unwrap();
        let reopened = DocxPackage::from_bytes(&bytes).unwrap();
        let names: Vec<&str> = package.entries.iter().map(|e| e.name.as_str()).collect();
        let reopened_names: Vec<&str> = reopened.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, reopened_names);
        assert_eq!(reopened.document_part, "word/document.xml");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_replaces_symlink_instead_of_following_it() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("elsewhere.docx");
        let link = dir.path().join("out.docx");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_file(&link, b"payload").unwrap();

        assert!(!target.exists());
        assert!(!fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&link).unwrap(), b"payload");
    }

    #[test]
    fn test_garbage_is_package_error() {
        let err = DocxPackage::from_bytes(b"not a zip").unwrap_err();
        assert!(matches!(err, DocxError::Package(_)));
    }
}

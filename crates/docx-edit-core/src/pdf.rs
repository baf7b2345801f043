//! Page-indexed PDF text extraction.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use chrono::NaiveDateTime;
use lopdf::{Dictionary, Object};
use tracing::{info, warn};

use crate::error::Result;

const NOT_SPECIFIED: &str = "Not specified";

/// Document information dictionary entries shown to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Anything that can hand out text one page at a time.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of the 1-based page `number`.
    fn page_text(&self, number: usize) -> Result<String>;

    fn metadata(&self) -> PdfMetadata;
}

/// A PDF file loaded through `lopdf`.
pub struct PdfFile {
    document: lopdf::Document,
    pages: Vec<u32>,
}

impl PdfFile {
    pub fn open(path: &Path) -> Result<Self> {
        let document = lopdf::Document::load(path)?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        info!("Opened PDF {:?} with {} pages", path, pages.len());
        Ok(Self { document, pages })
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.document.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.document.get_object(*id).ok()?.as_dict().ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl PageSource for PdfFile {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, number: usize) -> Result<String> {
        match number.checked_sub(1).and_then(|i| self.pages.get(i)) {
            Some(&page) => Ok(self.document.extract_text(&[page])?),
            None => Ok(String::new()),
        }
    }

    fn metadata(&self) -> PdfMetadata {
        let Some(info) = self.info_dictionary() else {
            return PdfMetadata::default();
        };
        let entry = |key: &[u8]| -> Option<String> {
            let text = match info.get(key).ok()? {
                Object::String(bytes, _) => decode_text_string(bytes),
                _ => return None,
            };
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        };
        PdfMetadata {
            title: entry(b"Title"),
            author: entry(b"Author"),
            created: entry(b"CreationDate").map(|d| format_pdf_date(&d)),
            modified: entry(b"ModDate").map(|d| format_pdf_date(&d)),
        }
    }
}

/// PDF text strings are UTF-16BE with a byte order mark or PDFDocEncoding,
/// which agrees with Latin-1 for printable text.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Renders `D:YYYYMMDDHHmmSS...` as `YYYY-MM-DD HH:MM:SS`; anything that does
/// not parse is returned as it was.
pub fn format_pdf_date(raw: &str) -> String {
    let digits: String = raw
        .trim_start_matches("D:")
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let padded = match digits.len() {
        14.. => digits[..14].to_string(),
        8 => format!("{digits}000000"),
        _ => return raw.to_string(),
    };
    NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S")
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Resolves a page selection such as `"1-3,5"` into ascending, distinct
/// 1-based page numbers.
///
/// Range bounds are clamped into `1..=total`; single pages outside that span
/// and items that are not numbers are ignored. No selection, or one that
/// selects nothing, means every page.
pub fn parse_page_range(spec: Option<&str>, total: usize) -> Vec<usize> {
    let all = || (1..=total).collect::<Vec<_>>();
    let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
        return all();
    };

    let clamp = |page: i64| -> usize {
        usize::try_from(page.max(1)).unwrap_or(1).min(total.max(1))
    };
    let mut pages = BTreeSet::new();
    for item in spec.split(',').map(str::trim) {
        if let Some((start, end)) = item.split_once('-') {
            let (Ok(start), Ok(end)) = (start.trim().parse::<i64>(), end.trim().parse::<i64>())
            else {
                continue;
            };
            if total > 0 {
                pages.extend(clamp(start)..=clamp(end));
            }
        } else if let Ok(page) = item.parse::<usize>() {
            if (1..=total).contains(&page) {
                pages.insert(page);
            }
        }
    }

    if pages.is_empty() {
        all()
    } else {
        pages.into_iter().collect()
    }
}

/// Builds the metadata and per-page text report for the selected pages.
pub fn render_report(
    source: &impl PageSource,
    page_range: Option<&str>,
    include_metadata: bool,
) -> String {
    let total = source.page_count();
    let mut out = String::new();

    if include_metadata {
        let meta = source.metadata();
        let shown = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_SPECIFIED.into());
        let _ = writeln!(out, "=== PDF INFORMATION ===");
        let _ = writeln!(out, "Title: {}", shown(&meta.title));
        let _ = writeln!(out, "Author: {}", shown(&meta.author));
        let _ = writeln!(out, "Created: {}", shown(&meta.created));
        let _ = writeln!(out, "Modified: {}", shown(&meta.modified));
        let _ = writeln!(out, "Pages: {total}");
        let _ = writeln!(out);
    }

    let _ = write!(out, "=== CONTENT ===");
    for page in parse_page_range(page_range, total) {
        let text = source.page_text(page).unwrap_or_else(|err| {
            warn!("Could not extract text from page {}: {}", page, err);
            String::new()
        });
        let _ = write!(out, "\n--- Page {page} ---\n");
        let text = text.trim();
        if text.is_empty() {
            out.push_str("[Page contains no extractable text]");
        } else {
            out.push_str(text);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocxError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, 5, vec![1, 2, 3, 4, 5])]
    #[case(Some(""), 3, vec![1, 2, 3])]
    #[case(Some("2,4"), 5, vec![2, 4])]
    #[case(Some("4-2,1"), 5, vec![1])]
    #[case(Some("3-99"), 5, vec![3, 4, 5])]
    #[case(Some("0-2"), 5, vec![1, 2])]
    #[case(Some("2,2,1-2"), 5, vec![1, 2])]
    #[case(Some("7,x,-"), 3, vec![1, 2, 3])]
    #[case(Some("5,1"), 5, vec![1, 5])]
    fn test_parse_page_range(
        #[case] spec: Option<&str>,
        #[case] total: usize,
        #[case] expected: Vec<usize>,
    ) {
        assert_eq!(parse_page_range(spec, total), expected);
    }

    #[test]
    fn test_no_pages() {
        assert!(parse_page_range(Some("1-3"), 0).is_empty());
    }

    #[test]
    fn test_pdf_dates() {
        assert_eq!(format_pdf_date("D:20230105123000+01'00'"), "2023-01-05 12:30:00");
        assert_eq!(format_pdf_date("D:20230105"), "2023-01-05 00:00:00");
        assert_eq!(format_pdf_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_text_string_decoding() {
        assert_eq!(decode_text_string(b"Caf\xe9"), "Café");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    struct FakePdf(Vec<&'static str>);

    impl PageSource for FakePdf {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, number: usize) -> Result<String> {
            match self.0.get(number - 1) {
                Some(&"<broken>") => Err(DocxError::Pdf("bad content stream".into())),
                Some(text) => Ok(text.to_string()),
                None => Ok(String::new()),
            }
        }

        fn metadata(&self) -> PdfMetadata {
            PdfMetadata {
                title: Some("Quarterly".into()),
                ..PdfMetadata::default()
            }
        }
    }

    #[test]
    fn test_report_layout() {
        let pdf = FakePdf(vec!["first page\n", "  ", "<broken>"]);
        let report = render_report(&pdf, None, true);
        let expected = "=== PDF INFORMATION ===\n\
                        Title: Quarterly\n\
                        Author: Not specified\n\
                        Created: Not specified\n\
                        Modified: Not specified\n\
                        Pages: 3\n\
                        \n\
                        === CONTENT ===\n\
                        --- Page 1 ---\n\
                        first page\n\
                        \n\
                        --- Page 2 ---\n\
                        [Page contains no extractable text]\n\
                        \n\
                        --- Page 3 ---\n\
                        [Page contains no extractable text]\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_report_without_metadata() {
        let pdf = FakePdf(vec!["a", "b"]);
        let report = render_report(&pdf, Some("2"), false);
        assert_eq!(report, "=== CONTENT ===\n--- Page 2 ---\nb\n");
    }
}

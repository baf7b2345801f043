//! Sandboxed reading and editing of DOCX documents, plus PDF text extraction.
//!
//! Every path goes through a [`PathSandbox`] before it is touched. Documents
//! are loaded into a [`DocxPackage`], mutated by the [`ReplacementEngine`],
//! [`TableEditor`] or [`ContentAppender`], then saved.

pub mod append;
pub mod error;
pub mod model;
pub mod ooxml;
pub mod package;
pub mod pdf;
pub mod replace;
pub mod sandbox;
pub mod table;

pub use append::{ContentAppender, ContentBlock, ListStyle};
pub use error::{DocxError, Result};
pub use model::{Cell, Document, Paragraph, Row, Run, Table};
pub use package::DocxPackage;
pub use pdf::{PageSource, PdfFile, PdfMetadata};
pub use replace::{ReplaceMode, ReplacementEngine, ReplacementRule};
pub use sandbox::PathSandbox;
pub use table::{EditOutcome, TableEditor, TableOperation, TableStructure};

//! The tool surface: five operations that take caller arguments and always
//! answer with a human-readable string.

use std::fs;
use std::path::{Path, PathBuf};

use docx_edit_core::package::write_file;
use docx_edit_core::pdf::{render_report, PdfFile};
use docx_edit_core::{
    ContentAppender, DocxError, DocxPackage, EditOutcome, PathSandbox, ReplaceMode,
    ReplacementEngine, ReplacementRule, Result, TableEditor, TableStructure,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::render;

pub const TOOL_NAMES: [&str; 5] = [
    "read_pdf",
    "read_docx",
    "edit_docx",
    "edit_docx_table",
    "create_docx",
];

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadPdfRequest {
    pub file_path: String,
    #[serde(default)]
    pub page_range: Option<String>,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadDocxRequest {
    pub file_path: String,
    /// `json` selects the JSON rendering; anything else is plain text.
    #[serde(default = "default_format")]
    pub format_type: String,
    #[serde(default)]
    pub tables_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditDocxRequest {
    pub file_path: String,
    /// `{find: replace}` pairs, applied in the order given.
    #[serde(default)]
    pub replacements: Option<Map<String, Value>>,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub append_content: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditTableRequest {
    pub file_path: String,
    pub table_index: i64,
    #[serde(default)]
    pub operations: Vec<Value>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub show_structure: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDocxRequest {
    pub file_path: String,
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub template_path: Option<String>,
}

/// Turns a failure into the message returned to the caller. Path and
/// argument problems are reported as they are; anything else is prefixed
/// with what was being attempted.
fn failure(context: &str, err: DocxError) -> String {
    match err {
        DocxError::AccessDenied { .. }
        | DocxError::NotFound(_)
        | DocxError::AlreadyExists(_)
        | DocxError::InvalidIndex(_)
        | DocxError::InvalidPattern { .. }
        | DocxError::InvalidOperation(_) => format!("Error: {err}"),
        other => format!("Error {context}: {other}"),
    }
}

fn replacement_rules(replacements: &Map<String, Value>) -> Result<Vec<ReplacementRule>> {
    replacements
        .iter()
        .map(|(find, replace)| match replace {
            Value::String(text) => Ok(ReplacementRule::new(find.as_str(), text.as_str())),
            other => Err(DocxError::InvalidOperation(format!(
                "replacement for '{find}' must be a string, got {other}"
            ))),
        })
        .collect()
}

/// Gives `target` the exact bytes of `source`.
fn copy_unchanged(source: &Path, target: &Path) -> Result<()> {
    write_file(target, &fs::read(source)?)
}

/// The tool implementations, bound to one sandbox.
#[derive(Debug, Clone)]
pub struct DocxTools {
    sandbox: PathSandbox,
}

impl DocxTools {
    pub fn new(sandbox: PathSandbox) -> Self {
        Self { sandbox }
    }

    /// Decodes `arguments` for `tool` and runs it.
    pub fn call(&self, tool: &str, arguments: Value) -> String {
        fn decode<T: for<'de> Deserialize<'de>>(arguments: Value) -> serde_json::Result<T> {
            serde_json::from_value(arguments)
        }

        let result = match tool {
            "read_pdf" => decode::<ReadPdfRequest>(arguments).map(|r| self.read_pdf(&r)),
            "read_docx" => decode::<ReadDocxRequest>(arguments).map(|r| self.read_docx(&r)),
            "edit_docx" => decode::<EditDocxRequest>(arguments).map(|r| self.edit_docx(&r)),
            "edit_docx_table" => {
                decode::<EditTableRequest>(arguments).map(|r| self.edit_docx_table(&r))
            }
            "create_docx" => {
                decode::<CreateDocxRequest>(arguments).map(|r| self.create_docx(&r))
            }
            other => {
                warn!("Unknown tool requested: {}", other);
                return format!(
                    "Error: Unknown tool '{other}'. Available tools: {}",
                    TOOL_NAMES.join(", ")
                );
            }
        };
        result.unwrap_or_else(|e| format!("Error: Invalid arguments for {tool}: {e}"))
    }

    /// Extracts text from the selected pages of a PDF.
    #[instrument(level = "debug", skip_all, fields(file = %request.file_path))]
    pub fn read_pdf(&self, request: &ReadPdfRequest) -> String {
        let run = || -> Result<String> {
            let path = self.sandbox.validate(&request.file_path, true)?;
            let pdf = PdfFile::open(&path)?;
            Ok(render_report(
                &pdf,
                request.page_range.as_deref(),
                request.include_metadata,
            ))
        };
        run().unwrap_or_else(|e| failure("reading PDF file", e))
    }

    /// Renders a document as text, JSON or a table summary.
    #[instrument(level = "debug", skip_all, fields(file = %request.file_path))]
    pub fn read_docx(&self, request: &ReadDocxRequest) -> String {
        let run = || -> Result<String> {
            let path = self.sandbox.validate(&request.file_path, true)?;
            let package = DocxPackage::open(&path)?;
            let document = package.document();

            if request.tables_only {
                return Ok(render::tables_summary(document));
            }
            if request.format_type.eq_ignore_ascii_case("json") {
                return render::as_json(document)
                    .map_err(|e| DocxError::Package(format!("cannot encode JSON: {e}")));
            }
            Ok(render::as_text(document))
        };
        run().unwrap_or_else(|e| failure("reading DOCX file", e))
    }

    /// Applies replacements, then appends content, then saves.
    #[instrument(level = "debug", skip_all, fields(file = %request.file_path))]
    pub fn edit_docx(&self, request: &EditDocxRequest) -> String {
        let run = || -> Result<String> {
            let input = self.sandbox.validate(&request.file_path, true)?;
            let output = match &request.output_path {
                Some(output) => self.sandbox.validate(output, false)?,
                None => input.clone(),
            };

            let mode = if request.use_regex {
                ReplaceMode::Pattern
            } else {
                ReplaceMode::Literal
            };
            let rules = match &request.replacements {
                Some(replacements) => replacement_rules(replacements)?,
                None => Vec::new(),
            };
            let engine = ReplacementEngine::new(&rules, mode)?;
            let appender = match &request.append_content {
                Some(blocks) => ContentAppender::from_values(blocks)?,
                None => ContentAppender::default(),
            };

            let mut package = DocxPackage::open(&input)?;
            let replaced = engine.apply(package.document_mut());
            let appended = appender.append(package.document_mut());
            let changes = replaced + appended;

            if changes == 0 {
                if output != input {
                    copy_unchanged(&input, &output)?;
                }
                info!("No changes made to {:?}", input);
                return Ok("No changes were made to the file.".to_string());
            }

            package.save(&output)?;
            info!(
                "Edited {:?}: {} replacements, {} appended blocks",
                output, replaced, appended
            );
            Ok(self.saved_message(&input, &output, request, changes))
        };
        run().unwrap_or_else(|e| failure("editing DOCX file", e))
    }

    fn saved_message(
        &self,
        input: &Path,
        output: &Path,
        request: &EditDocxRequest,
        changes: usize,
    ) -> String {
        match request.output_path.as_deref() {
            Some(shown) if output != input => {
                format!("File saved as {shown}. Changes made: {changes}.")
            }
            _ => format!("File {} updated. Changes made: {changes}.", request.file_path),
        }
    }

    /// Structure preview, dry-run or a real batch edit of one table.
    #[instrument(
        level = "debug",
        skip_all,
        fields(file = %request.file_path, table = request.table_index)
    )]
    pub fn edit_docx_table(&self, request: &EditTableRequest) -> String {
        let run = || -> Result<String> {
            let input = self.sandbox.validate(&request.file_path, true)?;
            let output = match &request.output_path {
                Some(output) if !request.dry_run && !request.show_structure => {
                    self.sandbox.validate(output, false)?
                }
                _ => input.clone(),
            };

            let mut package = DocxPackage::open(&input)?;
            let total = package.document().table_count();
            let index = usize::try_from(request.table_index)
                .ok()
                .filter(|&i| i < total)
                .ok_or_else(|| {
                    DocxError::InvalidIndex(format!(
                        "Table with index {} not found. Total tables: {total}.",
                        request.table_index
                    ))
                })?;
            let editor = TableEditor::from_values(&request.operations);

            let Some(table) = package.document_mut().table_mut(index) else {
                return Err(DocxError::InvalidIndex(format!(
                    "Table with index {index} not found. Total tables: {total}."
                )));
            };
            if request.show_structure {
                return Ok(TableStructure::of(index, table).to_string());
            }
            if request.dry_run {
                return Ok(editor.dry_run(table).to_string());
            }

            let outcome = editor.apply(table);
            if outcome.change_count() > 0 {
                package.save(&output)?;
                info!(
                    "Table {} of {:?}: {} cells changed, saved to {:?}",
                    index,
                    input,
                    outcome.change_count(),
                    output
                );
            }
            Ok(self.table_report(index, &input, &output, request, &outcome))
        };
        run().unwrap_or_else(|e| failure("editing table in DOCX file", e))
    }

    fn table_report(
        &self,
        index: usize,
        input: &Path,
        output: &Path,
        request: &EditTableRequest,
        outcome: &EditOutcome,
    ) -> String {
        let mut lines = Vec::new();
        if outcome.change_count() > 0 {
            match request.output_path.as_deref() {
                Some(shown) if output != input => {
                    lines.push(format!("Table {index} saved as {shown}."))
                }
                _ => lines.push(format!(
                    "Table {index} in file {} updated.",
                    request.file_path
                )),
            }
            lines.push(format!("Cells changed: {}", outcome.change_count()));
            lines.push("\nChanges made:".to_string());
            lines.extend(outcome.changes.iter().map(|change| {
                format!(
                    "Cell ({},{}): '{}' -> '{}'",
                    change.row, change.column, change.previous, change.text
                )
            }));
        } else {
            lines.push(format!("No changes were made to table {index}."));
        }

        if !outcome.errors.is_empty() {
            lines.push("\nErrors during execution:".to_string());
            lines.extend(
                outcome
                    .errors
                    .iter()
                    .map(|failed| format!("Operation {}: {}", failed.index, failed.error)),
            );
        }
        lines.join("\n")
    }

    /// Creates a new document, optionally from a template.
    #[instrument(level = "debug", skip_all, fields(file = %request.file_path))]
    pub fn create_docx(&self, request: &CreateDocxRequest) -> String {
        let run = || -> Result<String> {
            let target = self.sandbox.validate(&request.file_path, false)?;
            if target.exists() {
                return Err(DocxError::AlreadyExists(PathBuf::from(&request.file_path)));
            }
            let appender = ContentAppender::from_values(&request.content)?;

            let mut package = match &request.template_path {
                Some(template) => {
                    let template = self.sandbox.validate(template, true)?;
                    DocxPackage::open(&template)?
                }
                None => DocxPackage::blank()?,
            };
            let appended = appender.append(package.document_mut());
            package.save(&target)?;

            let size = fs::metadata(&target)?.len();
            if size == 0 {
                warn!("Created {:?} but it is empty", target);
                return Ok(format!(
                    "Warning: File {} was created but has zero size.",
                    request.file_path
                ));
            }
            info!("Created {:?} with {} content blocks ({} bytes)", target, appended, size);
            Ok(format!("File {} created successfully.", request.file_path))
        };
        run().unwrap_or_else(|e| failure("creating DOCX file", e))
    }
}

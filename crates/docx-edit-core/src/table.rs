//! Bounds-checked table editing: structure preview, dry-run and real edits.
//!
//! Operations form a partial-success batch. Each one is checked against the
//! table as it stands; an operation that fails is recorded and skipped while
//! the rest of the batch still runs.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DocxError, Result};
use crate::model::Table;

/// Cell text longer than this is shortened in the structure preview.
const PREVIEW_LIMIT: usize = 15;
const PREVIEW_KEEP: usize = 12;

/// One structural edit, addressed by 0-based row and column indices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableOperation {
    Cell {
        #[serde(default)]
        row: i64,
        #[serde(default)]
        column: i64,
        #[serde(default)]
        text: String,
    },
    RowRange {
        #[serde(default)]
        row_start: i64,
        #[serde(default)]
        row_end: i64,
        #[serde(default)]
        column: i64,
        #[serde(default)]
        text: String,
    },
    Column {
        #[serde(default)]
        column: i64,
        #[serde(default)]
        text: String,
        #[serde(default)]
        skip_header: bool,
    },
}

impl TableOperation {
    /// Decodes a caller-supplied operation. A missing `type` means `cell`.
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(DocxError::InvalidOperation(format!(
                "expected an object, got {value}"
            )));
        }
        let mut value = value.clone();
        if let Some(map) = value.as_object_mut() {
            map.entry("type").or_insert_with(|| Value::from("cell"));
        }
        serde_json::from_value(value).map_err(|e| DocxError::InvalidOperation(e.to_string()))
    }

    pub fn text(&self) -> &str {
        match self {
            TableOperation::Cell { text, .. }
            | TableOperation::RowRange { text, .. }
            | TableOperation::Column { text, .. } => text,
        }
    }

    /// The cells this operation writes, in row order.
    ///
    /// Row indices are checked against the row count and the column against
    /// the width of the first row. A row range whose start lies after its end
    /// is empty. A target missing from a shorter row fails
    /// the whole operation.
    pub fn targets(&self, table: &Table) -> Result<Vec<(usize, usize)>> {
        let rows = table.row_count();
        let columns = table.column_count();

        let targets: Vec<(usize, usize)> = match *self {
            TableOperation::Cell { row, column, .. } => {
                let row = checked(row, rows).ok_or_else(|| {
                    DocxError::InvalidIndex(format!(
                        "Invalid row index {row}. Valid values: {}",
                        valid_range(rows)
                    ))
                })?;
                let column = column_index(column, columns)?;
                vec![(row, column)]
            }
            TableOperation::RowRange {
                row_start,
                row_end,
                column,
                ..
            } => {
                let (start, end) = checked(row_start, rows)
                    .zip(checked(row_end, rows))
                    .ok_or_else(|| {
                        DocxError::InvalidIndex(format!(
                            "Invalid row range {row_start}-{row_end}. Valid values: {}",
                            valid_range(rows)
                        ))
                    })?;
                let column = column_index(column, columns)?;
                // start > end selects no rows
                (start..=end).map(|row| (row, column)).collect()
            }
            TableOperation::Column {
                column,
                skip_header,
                ..
            } => {
                let column = column_index(column, columns)?;
                let first = usize::from(skip_header);
                (first..rows).map(|row| (row, column)).collect()
            }
        };

        if let Some((row, column)) = targets
            .iter()
            .copied()
            .find(|&(row, column)| table.cell(row, column).is_none())
        {
            return Err(DocxError::InvalidIndex(format!(
                "Row {row} has no cell at column {column}"
            )));
        }
        Ok(targets)
    }
}

fn checked(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

fn column_index(column: i64, columns: usize) -> Result<usize> {
    checked(column, columns).ok_or_else(|| {
        DocxError::InvalidIndex(format!(
            "Invalid column index {column}. Valid values: {}",
            valid_range(columns)
        ))
    })
}

fn valid_range(len: usize) -> String {
    match len {
        0 => "none".to_string(),
        n => format!("0-{}", n - 1),
    }
}

/// Shortens text for the structure preview.
fn preview_text(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "[empty]".to_string();
    }
    if text.chars().count() > PREVIEW_LIMIT {
        let kept: String = text.chars().take(PREVIEW_KEEP).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

/// A snapshot of a table's shape and contents for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStructure {
    pub index: usize,
    pub rows: usize,
    pub columns: usize,
    pub cells: Vec<Vec<String>>,
}

impl TableStructure {
    pub fn of(index: usize, table: &Table) -> Self {
        Self {
            index,
            rows: table.row_count(),
            columns: table.column_count(),
            cells: table
                .rows()
                .map(|row| row.cells().map(|cell| cell.text()).collect())
                .collect(),
        }
    }
}

impl fmt::Display for TableStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table {} structure:", self.index)?;
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(f, "Columns: {}", self.columns)?;

        let headers: Vec<String> = (0..self.columns).map(|c| format!("Col {c}")).collect();
        writeln!(f)?;
        write!(f, "| Row # | {} |", headers.join(" | "))?;
        write!(f, "\n|-------|")?;
        for header in &headers {
            write!(f, "{}|", "-".repeat(header.len() + 2))?;
        }
        for (r, row) in self.cells.iter().enumerate() {
            let shown: Vec<String> = row.iter().map(|text| preview_text(text)).collect();
            write!(f, "\n| {r:5} | {} |", shown.join(" | "))?;
        }
        Ok(())
    }
}

/// Current and would-be text of one targeted cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPreview {
    pub row: usize,
    pub column: usize,
    pub current: String,
}

/// What one operation would do, or why it cannot run.
#[derive(Debug)]
pub struct OperationPreview {
    pub index: usize,
    pub operation: Option<TableOperation>,
    pub outcome: Result<Vec<CellPreview>>,
}

/// Dry-run result for a whole batch.
#[derive(Debug)]
pub struct DryRunReport {
    pub operations: Vec<OperationPreview>,
}

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dry run of table operations (no changes will be made):")?;
        for preview in &self.operations {
            let k = preview.index;
            let (operation, cells) = match (&preview.operation, &preview.outcome) {
                (Some(operation), Ok(cells)) => (operation, cells),
                (_, Err(err)) => {
                    write!(f, "\n❌ Operation {k}: {err}")?;
                    continue;
                }
                (None, Ok(_)) => continue,
            };
            let text = operation.text();
            match operation {
                TableOperation::Cell { .. } => {
                    for cell in cells {
                        write!(
                            f,
                            "\n✓ Operation {k}: update cell ({},{})",
                            cell.row, cell.column
                        )?;
                        write!(f, "\n   Current text: '{}'", cell.current)?;
                        write!(f, "\n   New text: '{text}'")?;
                    }
                }
                TableOperation::RowRange {
                    row_start,
                    row_end,
                    column,
                    ..
                } => {
                    write!(
                        f,
                        "\n✓ Operation {k}: update rows {row_start}-{row_end}, column {column}"
                    )?;
                    for cell in cells {
                        write!(f, "\n   Row {}: '{}' -> '{text}'", cell.row, cell.current)?;
                    }
                }
                TableOperation::Column {
                    column,
                    skip_header,
                    ..
                } => {
                    let note = if *skip_header { " (header skipped)" } else { "" };
                    write!(f, "\n✓ Operation {k}: update every cell in column {column}{note}")?;
                    for cell in cells {
                        write!(f, "\n   Row {}: '{}' -> '{text}'", cell.row, cell.current)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A cell whose text was actually rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub row: usize,
    pub column: usize,
    pub previous: String,
    pub text: String,
}

/// An operation that was skipped.
#[derive(Debug)]
pub struct OperationError {
    pub index: usize,
    pub error: DocxError,
}

/// Result of a real edit.
#[derive(Debug, Default)]
pub struct EditOutcome {
    pub changes: Vec<CellChange>,
    pub errors: Vec<OperationError>,
}

impl EditOutcome {
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// An ordered batch of table operations. Operations that could not be
/// decoded stay in the batch as failures so indices line up with the input.
#[derive(Debug)]
pub struct TableEditor {
    operations: Vec<Result<TableOperation>>,
}

impl TableEditor {
    pub fn new(operations: Vec<TableOperation>) -> Self {
        Self {
            operations: operations.into_iter().map(Ok).collect(),
        }
    }

    pub fn from_values(values: &[Value]) -> Self {
        Self {
            operations: values.iter().map(TableOperation::from_value).collect(),
        }
    }

    /// Validates every operation and reports what it would change.
    pub fn dry_run(&self, table: &Table) -> DryRunReport {
        let operations = self
            .operations
            .iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Err(err) => OperationPreview {
                    index,
                    operation: None,
                    outcome: Err(DocxError::InvalidOperation(describe(err))),
                },
                Ok(operation) => OperationPreview {
                    index,
                    operation: Some(operation.clone()),
                    outcome: operation.targets(table).map(|targets| {
                        targets
                            .into_iter()
                            .map(|(row, column)| CellPreview {
                                row,
                                column,
                                current: table
                                    .cell(row, column)
                                    .map(|cell| cell.to_string())
                                    .unwrap_or_default(),
                            })
                            .collect()
                    }),
                },
            })
            .collect();
        DryRunReport { operations }
    }

    /// Runs the batch against `table`. Failing operations are skipped.
    pub fn apply(&self, table: &mut Table) -> EditOutcome {
        let mut outcome = EditOutcome::default();
        for (index, slot) in self.operations.iter().enumerate() {
            let operation = match slot {
                Ok(operation) => operation,
                Err(err) => {
                    warn!("Skipping table operation {}: {}", index, err);
                    outcome.errors.push(OperationError {
                        index,
                        error: DocxError::InvalidOperation(describe(err)),
                    });
                    continue;
                }
            };
            let targets = match operation.targets(table) {
                Ok(targets) => targets,
                Err(error) => {
                    warn!("Skipping table operation {}: {}", index, error);
                    outcome.errors.push(OperationError { index, error });
                    continue;
                }
            };

            let text = operation.text();
            for (row, column) in targets {
                let Some(cell) = table.cell_mut(row, column) else {
                    continue;
                };
                let previous = cell.to_string();
                if cell.set_text(text) {
                    outcome.changes.push(CellChange {
                        row,
                        column,
                        previous,
                        text: text.to_string(),
                    });
                }
            }
        }
        debug!(
            "Table batch: {} cells changed, {} operations failed",
            outcome.changes.len(),
            outcome.errors.len()
        );
        outcome
    }
}

/// Message of a decoding failure without the variant prefix added twice.
fn describe(err: &DocxError) -> String {
    match err {
        DocxError::InvalidOperation(message) => message.clone(),
        other => other.to_string(),
    }
}

//! Copy display fields from record files into the archive workbook.
//!
//! The archive is an `.xlsx` workbook whose first row holds column headers.
//! For every row with a catalog number the matching `<catalog>.json` record
//! is located in the records directory and five display columns are filled
//! from it. The workbook is only written back when the sync is not a dry run.

use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::catalog;
use crate::error::{LookupError, Result};
use crate::io::is_safe_file_stem;

pub const DEFAULT_SHEET: &str = "采购统计";
pub const DEFAULT_CATALOG_COLUMN: &str = "catelog";
pub const DEFAULT_JSON_DIR: &str = "out";

/// Appended to the archive file stem to name the missing report
const MISSING_REPORT_SUFFIX: &str = "_未命中报告.csv";

/// Spreadsheet tools expect it to detect UTF-8 CSV
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Row holding the column headers (1-based)
const HEADER_ROW: u32 = 1;

// ============================================================================
// Field Specs
// ============================================================================

/// One target column and where to find its value in a record.
pub struct FieldSpec {
    pub column: &'static str,
    /// Dotted paths, tried in order; the first truthy value wins
    pub paths: &'static [&'static str],
    /// Separator for list values
    pub joiner: &'static str,
    /// Whether an object value is kept (as compact JSON) or discarded
    pub keep_objects: bool,
}

pub const FIELD_SPECS: [FieldSpec; 5] = [
    FieldSpec {
        column: "产品名称",
        paths: &["title.product_name", "title.raw", "title"],
        joiner: " / ",
        keep_objects: false,
    },
    FieldSpec {
        column: "版本",
        paths: &["title.edition_name", "version", "annotations.version", "notes.version"],
        joiner: " / ",
        keep_objects: true,
    },
    FieldSpec {
        column: "版本详情",
        paths: &["media_compact", "format_compact", "media", "format"],
        joiner: " + ",
        keep_objects: true,
    },
    FieldSpec {
        column: "歌手",
        paths: &["artist_credit", "artists_credit", "artists_joined"],
        joiner: " / ",
        keep_objects: true,
    },
    FieldSpec {
        column: "Barcode",
        paths: &["identifiers.barcode", "barcode"],
        joiner: ", ",
        keep_objects: true,
    },
];

fn lookup_path<'v>(record: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(record, |cur, key| cur.as_object()?.get(key))
}

/// null, false, 0, "" and empty containers count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl FieldSpec {
    /// Display text for this column, or `None` when the record has nothing usable.
    pub fn extract(&self, record: &Value) -> Option<String> {
        let value = self
            .paths
            .iter()
            .filter_map(|path| lookup_path(record, path))
            .find(|v| is_truthy(v))?;

        match value {
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(render_scalar)
                    .collect::<Vec<_>>()
                    .join(self.joiner),
            ),
            Value::Object(_) if !self.keep_objects => None,
            Value::Object(_) => Some(value.to_string()),
            other => Some(render_scalar(other)),
        }
    }
}

// ============================================================================
// Record Files
// ============================================================================

/// Candidate file names for a catalog cell: as typed, with unified
/// separators, then the first element of a range. Duplicates and names that
/// would leave `json_dir` are dropped.
pub fn record_file_candidates(json_dir: &Path, catalog_cell: &str) -> Vec<PathBuf> {
    let base = catalog_cell.trim();
    if base.is_empty() {
        return Vec::new();
    }

    let mut names = vec![base.to_string()];
    for name in [catalog::unify_separators(base), catalog::first_of_range(base)] {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
        .into_iter()
        .filter(|name| is_safe_file_stem(name))
        .map(|name| json_dir.join(format!("{}.json", name)))
        .collect()
}

/// Load the record for a catalog cell.
///
/// Only the first existing candidate is read; if it is not a non-empty JSON
/// object the record counts as missing.
pub fn load_record(json_dir: &Path, catalog_cell: &str) -> Option<Value> {
    let path = record_file_candidates(json_dir, catalog_cell)
        .into_iter()
        .find(|p| p.is_file())?;

    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()));

    match parsed {
        Ok(value) if value.as_object().is_some_and(|o| !o.is_empty()) => Some(value),
        Ok(_) => {
            warn!("Ignoring {}: not a JSON object", path.display());
            None
        }
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            None
        }
    }
}

// ============================================================================
// Sync
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SyncMode {
    /// Write only blank cells (empty or a single space)
    #[default]
    FillOnly,
    /// Always write
    Overwrite,
}

#[derive(Clone, Debug)]
pub struct SyncOptions {
    pub sheet: String,
    pub json_dir: PathBuf,
    pub mode: SyncMode,
    pub catalog_column: String,
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sheet: DEFAULT_SHEET.to_string(),
            json_dir: PathBuf::from(DEFAULT_JSON_DIR),
            mode: SyncMode::FillOnly,
            catalog_column: DEFAULT_CATALOG_COLUMN.to_string(),
            dry_run: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingRow {
    /// Zero-based position of the data row (the header row excluded)
    pub row_index: usize,
    pub catalog: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub rows_with_catalog: usize,
    pub rows_matched: usize,
    pub cells_updated: usize,
    pub added_columns: Vec<String>,
    pub missing: Vec<MissingRow>,
    pub committed: bool,
}

fn is_blank(cell: &str) -> bool {
    matches!(cell, "" | " ")
}

/// 1-based column of each header cell, by header text.
fn header_columns(sheet: &Worksheet) -> Vec<(String, u32)> {
    let (max_col, _) = sheet.get_highest_column_and_row();
    (1..=max_col)
        .map(|col| (sheet.get_value((col, HEADER_ROW)), col))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn find_column(headers: &[(String, u32)], name: &str) -> Option<u32> {
    headers.iter().find(|(h, _)| h == name).map(|(_, col)| *col)
}

/// Fill the display columns of one worksheet from the record files.
pub fn sync_worksheet(sheet: &mut Worksheet, opts: &SyncOptions) -> Result<SyncReport> {
    let headers = header_columns(sheet);
    let Some(catalog_col) = find_column(&headers, &opts.catalog_column) else {
        return Err(LookupError::Sheet(format!(
            "sheet '{}' does not contain column '{}'",
            opts.sheet, opts.catalog_column
        )));
    };

    let mut report = SyncReport::default();
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let mut next_col = max_col + 1;

    let mut target_cols = Vec::with_capacity(FIELD_SPECS.len());
    for spec in &FIELD_SPECS {
        let col = match find_column(&headers, spec.column) {
            Some(col) => col,
            None => {
                sheet
                    .get_cell_mut((next_col, HEADER_ROW))
                    .set_value_string(spec.column);
                report.added_columns.push(spec.column.to_string());
                next_col += 1;
                next_col - 1
            }
        };
        target_cols.push(col);
    }

    for row in (HEADER_ROW + 1)..=max_row {
        let row_index = (row - HEADER_ROW - 1) as usize;
        let cell = sheet.get_value((catalog_col, row));
        let catalog = cell.trim();
        if catalog.is_empty() {
            continue;
        }
        report.rows_with_catalog += 1;

        let Some(record) = load_record(&opts.json_dir, catalog) else {
            report.missing.push(MissingRow {
                row_index,
                catalog: catalog.to_string(),
            });
            continue;
        };
        report.rows_matched += 1;

        for (spec, &col) in FIELD_SPECS.iter().zip(&target_cols) {
            let Some(new_value) = spec.extract(&record) else {
                continue;
            };
            if opts.mode == SyncMode::FillOnly && !is_blank(&sheet.get_value((col, row))) {
                continue;
            }
            sheet.get_cell_mut((col, row)).set_value_string(new_value);
            report.cells_updated += 1;
        }
        debug!("Row {} ({}) synced", row_index, catalog);
    }

    Ok(report)
}

/// Sync the sheet named in `opts` inside an open workbook.
pub fn sync_workbook(book: &mut Spreadsheet, opts: &SyncOptions) -> Result<SyncReport> {
    let sheet = book
        .get_sheet_by_name_mut(&opts.sheet)
        .ok_or_else(|| LookupError::Sheet(format!("workbook has no sheet '{}'", opts.sheet)))?;
    sync_worksheet(sheet, opts)
}

/// Read the workbook, sync it and write it back in place unless `opts.dry_run`.
pub fn sync_archive(archive: &Path, opts: &SyncOptions) -> Result<SyncReport> {
    let mut book = umya_spreadsheet::reader::xlsx::read(archive).map_err(|e| {
        LookupError::Sheet(format!("failed to read {}: {}", archive.display(), e))
    })?;

    let mut report = sync_workbook(&mut book, opts)?;

    if !opts.dry_run {
        umya_spreadsheet::writer::xlsx::write(&book, archive).map_err(|e| {
            LookupError::Sheet(format!("failed to write {}: {}", archive.display(), e))
        })?;
        report.committed = true;
    }
    Ok(report)
}

/// `<archive stem>_未命中报告.csv`, next to the archive.
pub fn missing_report_path(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    archive.with_file_name(format!("{}{}", stem, MISSING_REPORT_SUFFIX))
}

/// CSV with a UTF-8 BOM: `row_index,<catalog column>` then one line per row.
pub fn write_missing_report(path: &Path, catalog_column: &str, missing: &[MissingRow]) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(["row_index", catalog_column])?;
    for row in missing {
        writer.write_record([row.row_index.to_string().as_str(), row.catalog.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

//! sheet-sync: copy display fields from normalized record files into the
//! archive workbook.
//!
//! Usage: sheet-sync --excel 海淘复盘.xlsx [--sheet 采购统计] [--json-dir out]
//!                   [--mode fill-only|overwrite] [--catalog-col catelog] [--dry-run]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mb_lookup::sheet::{
    missing_report_path, sync_archive, write_missing_report, SyncMode, SyncOptions,
    DEFAULT_CATALOG_COLUMN, DEFAULT_JSON_DIR, DEFAULT_SHEET,
};

#[derive(Parser)]
#[command(name = "sheet-sync")]
#[command(about = "Sync normalized record JSON into the archive workbook")]
struct Args {
    /// Archive workbook (.xlsx), rewritten in place
    #[arg(long, alias = "archive")]
    excel: PathBuf,

    #[arg(long, default_value = DEFAULT_SHEET)]
    sheet: String,

    /// Directory holding <catalog>.json records
    #[arg(long, default_value = DEFAULT_JSON_DIR)]
    json_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = SyncMode::FillOnly)]
    mode: SyncMode,

    /// Column holding the catalog number
    #[arg(long, default_value = DEFAULT_CATALOG_COLUMN)]
    catalog_col: String,

    /// Compute updates without saving the workbook
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let opts = SyncOptions {
        sheet: args.sheet,
        json_dir: args.json_dir,
        mode: args.mode,
        catalog_column: args.catalog_col,
        dry_run: args.dry_run,
    };
    let report = sync_archive(&args.excel, &opts).with_context(|| {
        format!("Failed to sync sheet '{}' of {}", opts.sheet, args.excel.display())
    })?;

    if !report.added_columns.is_empty() {
        info!("[SUMMARY] Added columns: {:?}", report.added_columns);
    }
    info!(
        "[SUMMARY] Rows with catalog: {}, matched: {}, cells updated: {}",
        report.rows_with_catalog, report.rows_matched, report.cells_updated
    );
    if !report.committed {
        info!("[SUMMARY] Dry run, workbook not saved");
    }
    info!("[SUMMARY] Missing: {}", report.missing.len());

    if !report.missing.is_empty() {
        let path = missing_report_path(&args.excel);
        write_missing_report(&path, &opts.catalog_column, &report.missing)
            .with_context(|| format!("Failed to write missing report {}", path.display()))?;
        warn!("[SUMMARY] Missing report saved to: {}", path.display());
    }

    Ok(())
}

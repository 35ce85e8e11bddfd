//! Lookup pipeline: catalog input -> best release -> normalized record -> file.
//!
//! Single lookups and batches run the same steps. They differ in how a
//! schema failure is treated: a single lookup still writes the record, a
//! batch skips it. A batch never stops on a bad item; every failure is
//! logged with its catalog number and counted.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::catalog;
use crate::error::{LookupError, Result};
use crate::io;
use crate::models::{BatchStats, NormalizedRecord};
use crate::normalize::Normalizer;
use crate::progress::BatchProgress;
use crate::record;
use crate::schema::{RecordSchema, SchemaViolation};
use crate::source::ReleaseSource;

/// Log a progress line every this many batch items in log-only mode
const LOG_INTERVAL: u64 = 50;

// ============================================================================
// Batch Input
// ============================================================================

/// `file=PATH` (one catalog number per line) or `dir=PATH` (every `*.txt` inside).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchInput {
    File(PathBuf),
    Dir(PathBuf),
}

impl FromStr for BatchInput {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some(("file", path)) if !path.is_empty() => Ok(BatchInput::File(PathBuf::from(path))),
            Some(("dir", path)) if !path.is_empty() => Ok(BatchInput::Dir(PathBuf::from(path))),
            _ => Err("expected 'file=PATH' or 'dir=PATH'".to_string()),
        }
    }
}

impl BatchInput {
    /// Raw catalog inputs in file order (directory files sorted by name).
    pub fn catalog_inputs(&self) -> Result<Vec<String>> {
        match self {
            BatchInput::File(path) => io::read_lines(path),
            BatchInput::Dir(dir) => {
                let mut inputs = Vec::new();
                for file in io::list_batch_files(dir)? {
                    inputs.extend(io::read_lines(&file)?);
                }
                Ok(inputs)
            }
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug)]
pub enum SingleOutcome {
    /// Record written; violations were reported but did not block the write
    Written { violations: Vec<SchemaViolation> },
    NotFound,
}

#[derive(Debug)]
pub enum BatchItemOutcome {
    Written(PathBuf),
    NotFound,
    SchemaRejected(Vec<SchemaViolation>),
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct LookupPipeline<'a> {
    source: &'a dyn ReleaseSource,
    normalizer: Normalizer<'a>,
    schema: Option<&'a RecordSchema>,
    with_cover: bool,
    /// Batch progress as log lines every N items instead of a bar
    log_every: Option<u64>,
}

impl<'a> LookupPipeline<'a> {
    pub fn new(
        source: &'a dyn ReleaseSource,
        normalizer: Normalizer<'a>,
        schema: Option<&'a RecordSchema>,
        with_cover: bool,
    ) -> Self {
        Self {
            source,
            normalizer,
            schema,
            with_cover,
            log_every: None,
        }
    }

    /// Hide the progress bar and log a progress line every [`LOG_INTERVAL`] items.
    pub fn with_log_only(mut self, log_only: bool) -> Self {
        self.log_every = log_only.then_some(LOG_INTERVAL);
        self
    }

    /// Look up one raw input (range inputs use their first element).
    ///
    /// `Ok(None)` when no release carries the catalog number.
    pub fn build_record(&self, raw_input: &str) -> Result<Option<NormalizedRecord>> {
        let catalog = catalog::first_of_range(raw_input);
        let Some(result) = self.source.lookup(&catalog, self.with_cover)? else {
            return Ok(None);
        };
        Ok(Some(
            record::assemble(&result, &self.normalizer).with_compact_input(raw_input),
        ))
    }

    fn violations(&self, record: &NormalizedRecord) -> Result<Vec<SchemaViolation>> {
        match self.schema {
            Some(schema) => Ok(schema.validate(&serde_json::to_value(record)?)),
            None => Ok(Vec::new()),
        }
    }

    /// Single lookup. Writes to `out`, or stdout when `None`.
    pub fn run_single(&self, raw_input: &str, out: Option<&Path>) -> Result<SingleOutcome> {
        let catalog = catalog::first_of_range(raw_input);
        let Some(record) = self.build_record(raw_input)? else {
            warn!("[NOT FOUND] {}", catalog);
            return Ok(SingleOutcome::NotFound);
        };

        let violations = self.violations(&record)?;
        for v in &violations {
            warn!("[SCHEMA ERROR] {} -> {}", catalog, v);
        }

        io::write_json(&record, out)?;
        if let Some(path) = out {
            info!("Wrote {}", path.display());
        }
        Ok(SingleOutcome::Written { violations })
    }

    /// One batch item, written to `<out_dir>/<catalog>.json`.
    pub fn process_batch_item(&self, raw_input: &str, out_dir: &Path) -> Result<BatchItemOutcome> {
        let catalog = catalog::first_of_range(raw_input);
        if !io::is_safe_file_stem(&catalog) {
            return Err(LookupError::UnsafeFileName(catalog));
        }
        let Some(record) = self.build_record(raw_input)? else {
            return Ok(BatchItemOutcome::NotFound);
        };

        let violations = self.violations(&record)?;
        if !violations.is_empty() {
            return Ok(BatchItemOutcome::SchemaRejected(violations));
        }

        let path = out_dir.join(format!("{}.json", catalog));
        io::write_json(&record, Some(&path))?;
        Ok(BatchItemOutcome::Written(path))
    }

    /// Run every input in order. Failures are logged and counted, never fatal.
    pub fn run_batch(&self, inputs: &[String], out_dir: &Path) -> BatchStats {
        let start = Instant::now();
        let mut progress = BatchProgress::new(inputs.len() as u64, self.log_every);
        let mut stats = BatchStats {
            total: inputs.len(),
            ..Default::default()
        };

        for raw in inputs {
            let catalog = catalog::first_of_range(raw);
            match self.process_batch_item(raw, out_dir) {
                Ok(BatchItemOutcome::Written(path)) => {
                    stats.written += 1;
                    progress.suspend(|| info!("Wrote {}", path.display()));
                }
                Ok(BatchItemOutcome::NotFound) => {
                    stats.not_found += 1;
                    progress.suspend(|| warn!("[NOT FOUND] {}", catalog));
                }
                Ok(BatchItemOutcome::SchemaRejected(violations)) => {
                    stats.schema_rejected += 1;
                    progress.suspend(|| {
                        for v in &violations {
                            warn!("[SCHEMA ERROR] {} -> {}", catalog, v);
                        }
                    });
                }
                Err(e) => {
                    stats.errors += 1;
                    progress.suspend(|| error!("[ERROR] {}: {}", catalog, e));
                }
            }
            progress.advance(&catalog);
        }

        progress.finish();
        stats.elapsed_seconds = start.elapsed().as_secs_f64();
        stats
    }
}

// ============================================================================
// TESTS
// ============================================================================

//! mb-lookup: look up releases by catalog number in a local MusicBrainz
//! database and emit normalized JSON records.
//!
//! Usage:
//!   mb-lookup --db mb.sqlite3 --catalog PCCG-01965 [--out rec.json] [--validate] [--with-cover]
//!   mb-lookup --db mb.sqlite3 --batch file=list.txt [--out out/] [--stats stats.json]
//!   mb-lookup --db mb.sqlite3 --batch dir=lists/ --log-only

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mb_lookup::config::MappingTables;
use mb_lookup::normalize::Normalizer;
use mb_lookup::pipeline::{BatchInput, LookupPipeline, SingleOutcome};
use mb_lookup::schema::RecordSchema;
use mb_lookup::source::{SqliteReleaseSource, DEFAULT_TARGET_COUNTRY};

/// Batch output directory when `--out` is not given
const DEFAULT_BATCH_OUT: &str = "out";

#[derive(Parser)]
#[command(name = "mb-lookup")]
#[command(about = "Look up releases by catalog number in a local MusicBrainz database and emit normalized JSON")]
struct Args {
    /// Catalog number, e.g. PCCG-01965 (ranges like PCCG-01965~7 use the first element)
    #[arg(long, conflicts_with = "batch", required_unless_present = "batch")]
    catalog: Option<String>,

    /// Batch input: file=PATH (one catalog number per line) or dir=PATH (all *.txt files)
    #[arg(long)]
    batch: Option<BatchInput>,

    /// Output file (single) or output directory (batch). Single mode prints to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Validate records against the schema
    #[arg(long)]
    validate: bool,

    /// Include one cover image (front preferred)
    #[arg(long)]
    with_cover: bool,

    /// Schema file (defaults to the bundled mb-album-v1 schema)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Label alias table (defaults to the bundled table)
    #[arg(long)]
    label_alias: Option<PathBuf>,

    /// Format mapping table (defaults to the bundled table)
    #[arg(long)]
    format_map: Option<PathBuf>,

    /// MusicBrainz SQLite database
    #[arg(long, env = "MB_DB")]
    db: PathBuf,

    /// ISO 3166-1 code whose releases are preferred
    #[arg(long, env = "MB_COUNTRY", default_value = DEFAULT_TARGET_COUNTRY)]
    country: String,

    /// Log-only mode: no progress bars, periodic progress lines instead
    #[arg(long)]
    log_only: bool,

    /// Write batch stats as JSON to this file
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so single-mode JSON on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let tables = MappingTables::load(args.label_alias.as_deref(), args.format_map.as_deref())
        .context("Failed to load mapping tables")?;

    let schema = if args.validate {
        let schema = match &args.schema {
            Some(path) => RecordSchema::load(path),
            None => RecordSchema::bundled(),
        };
        Some(schema.context("Failed to load record schema")?)
    } else {
        None
    };

    let source = SqliteReleaseSource::open(&args.db, &args.country)
        .with_context(|| format!("Failed to open MusicBrainz database {}", args.db.display()))?;

    let pipeline = LookupPipeline::new(
        &source,
        Normalizer::new(&tables),
        schema.as_ref(),
        args.with_cover,
    )
    .with_log_only(args.log_only);

    if let Some(batch) = &args.batch {
        let inputs = batch
            .catalog_inputs()
            .context("Failed to read batch input")?;
        let out_dir = args.out.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_BATCH_OUT));
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        info!("Batch: {} inputs -> {}", inputs.len(), out_dir.display());
        let stats = pipeline.run_batch(&inputs, &out_dir);

        info!("{:=<60}", "");
        info!("Batch complete!");
        info!("  Total:           {}", stats.total);
        info!("  Written:         {} ({:.1}%)", stats.written, stats.hit_rate());
        info!("  Not found:       {}", stats.not_found);
        info!("  Schema rejected: {}", stats.schema_rejected);
        info!("  Errors:          {}", stats.errors);
        info!("  Elapsed:         {:.1}s", stats.elapsed_seconds);
        info!("{:=<60}", "");

        if let Some(path) = &args.stats {
            stats
                .write_to_file(path)
                .with_context(|| format!("Failed to write stats to {}", path.display()))?;
            info!("Stats written to {}", path.display());
        }
        return Ok(());
    }

    let Some(catalog) = &args.catalog else {
        bail!("either --catalog or --batch is required");
    };

    match pipeline
        .run_single(catalog, args.out.as_deref())
        .with_context(|| format!("Lookup failed for {}", catalog))?
    {
        SingleOutcome::Written { violations } => {
            if !violations.is_empty() {
                warn!("{} schema violation(s); record written anyway", violations.len());
            }
            Ok(())
        }
        SingleOutcome::NotFound => bail!("[NOT FOUND] {}", catalog),
    }
}

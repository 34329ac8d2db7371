//! gridstream CLI: export JSON-lines rows to CSV, XLSX or SpreadsheetML.

mod logging;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use gridstream_core::cancel::CancellationToken;
use gridstream_core::config::{BooleanStyle, ExportConfig, OverflowPolicy};
use gridstream_core::limits::OutputFormat;
use gridstream_core::schema::{Column, ColumnKind, ColumnSchema};
use gridstream_exec::{ExportOutcome, ExportSession};
use gridstream_io::sink::{CellSink, CsvSink, NullSink, XlsxSink, XmlSink};
use gridstream_io::source::jsonl::JsonRow;
use gridstream_io::source::{JsonlSource, Limit, Peekable};

#[derive(Parser)]
#[command(name = "gridstream")]
#[command(about = "Stream rows into spreadsheets within cell, sheet and memory limits", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a JSON-lines file (one object per line)
    Export(ExportArgs),

    /// Print the ceilings of each output format
    Limits {
        /// Only this format (csv, xlsx, xml)
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Input JSON-lines file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Output format; inferred from the output extension when absent
    #[arg(short, long)]
    format: Option<String>,

    /// Column as `name[:kind[:header]]`; repeat in order. Inferred from the
    /// first row when absent.
    #[arg(short, long = "column")]
    columns: Vec<String>,

    /// UTF-16 code units per cell (overrides config; capped by the format)
    #[arg(long)]
    max_cell_length: Option<usize>,

    /// Rows per sheet including the header (0 disables; capped by the format)
    #[arg(long)]
    max_rows_per_sheet: Option<u32>,

    /// Writer memory budget in bytes (0 = unbounded)
    #[arg(long)]
    memory_budget: Option<u64>,

    /// Oversized cell policy: chunk, truncate, chunk-across-sheets
    #[arg(long)]
    policy: Option<String>,

    /// Marker appended to truncated cells
    #[arg(long)]
    overflow_marker: Option<String>,

    /// Flush the output every N rows (0 disables)
    #[arg(long)]
    flush_interval: Option<u64>,

    /// Base sheet name
    #[arg(long)]
    sheet_name: Option<String>,

    /// Write booleans as 1/0
    #[arg(long)]
    boolean_digits: bool,

    /// Stop after N rows
    #[arg(long)]
    limit: Option<u64>,

    /// Cancel after this many seconds; the output is finalized with the rows
    /// written so far
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Run the full layout against a counting null sink; no output is created
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Export(args) => {
            if let Err(e) = run_export(args) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Limits { format } => {
            if let Err(e) = print_limits(format.as_deref()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_export(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let format = resolve_format(args.format.as_deref(), &args.output)?;

    let mut config = ExportConfig::from_env();
    if let Some(v) = args.max_cell_length {
        config.max_cell_text_length = Some(v);
    }
    if let Some(v) = args.max_rows_per_sheet {
        config.max_rows_per_sheet = Some(v);
    }
    if let Some(v) = args.memory_budget {
        config.memory_budget_bytes = v;
    }
    if let Some(p) = args.policy.as_deref() {
        config.overflow_policy = p.parse::<OverflowPolicy>()?;
    }
    if let Some(m) = args.overflow_marker {
        config.overflow_marker = m;
    }
    if let Some(v) = args.flush_interval {
        config.flush_interval_rows = v;
    }
    if let Some(name) = args.sheet_name {
        config.sheet_name = name;
    }
    if args.boolean_digits {
        config.boolean_style = BooleanStyle::Digits;
    }

    let mut source = Peekable::new(JsonlSource::open(&args.input)?);
    let schema = if args.columns.is_empty() {
        infer_schema(source.peek()?)?
    } else {
        ColumnSchema::new(
            args.columns
                .iter()
                .map(|c| Column::parse(c))
                .collect::<Result<Vec<_>, _>>()?,
        )?
    };

    let sink: Box<dyn CellSink> = if args.dry_run {
        Box::new(NullSink::new(format.limits()))
    } else {
        match format {
            OutputFormat::Csv => Box::new(CsvSink::create(&args.output)?),
            OutputFormat::Xlsx => Box::new(XlsxSink::create(&args.output, &config.sheet_name)?),
            OutputFormat::Xml => Box::new(XmlSink::create(&args.output, &config.sheet_name)?),
        }
    };

    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        %format,
        columns = schema.len(),
        dry_run = args.dry_run,
        "export starting"
    );

    let session = ExportSession::new(config, schema, sink)?;
    let cancel = CancellationToken::new();
    if let Some(secs) = args.timeout_secs {
        cancel_after(&cancel, Duration::from_secs(secs));
    }
    let outcome = match args.limit {
        Some(n) => session.run(Limit::new(source, n), &cancel)?,
        None => session.run(source, &cancel)?,
    };

    if let ExportOutcome::Cancelled(report) = &outcome {
        tracing::warn!(rows = report.logical_rows, "export cancelled");
    }
    println!("{}", serde_json::to_string_pretty(outcome.report())?);
    Ok(())
}

/// Cancel `token` from a background thread once `after` has passed.
fn cancel_after(token: &CancellationToken, after: Duration) -> thread::JoinHandle<()> {
    let token = token.clone();
    thread::spawn(move || {
        thread::sleep(after);
        token.cancel();
    })
}

fn resolve_format(
    explicit: Option<&str>,
    output: &Path,
) -> Result<OutputFormat, Box<dyn std::error::Error>> {
    if let Some(f) = explicit {
        return Ok(f.parse::<OutputFormat>()?);
    }
    output
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
        .ok_or_else(|| "cannot infer the output format; pass --format".into())
}

/// Columns from the keys of the first row, in key order.
fn infer_schema(first: Option<&JsonRow>) -> Result<ColumnSchema, Box<dyn std::error::Error>> {
    let first = first.ok_or("input is empty; pass --column to export a header-only file")?;
    let columns = first
        .keys()
        .map(|k| Column::new(k.as_str(), ColumnKind::Generic))
        .collect();
    Ok(ColumnSchema::new(columns)?)
}

fn print_limits(format: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let formats = match format {
        Some(f) => vec![f.parse::<OutputFormat>()?],
        None => OutputFormat::ALL.to_vec(),
    };
    for f in formats {
        let limits = f.limits();
        println!(
            "{f}: max_cell_text_length={} max_rows_per_sheet={} max_columns={}",
            show(limits.max_cell_text_length),
            show(limits.max_rows_per_sheet),
            show(limits.max_columns),
        );
    }
    Ok(())
}

fn show<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "unlimited".to_string(), |v| v.to_string())
}

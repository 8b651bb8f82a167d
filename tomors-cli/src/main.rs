//! tomors CLI: validate and ingest Data Exchange tomography files.
//!
//! This binary wraps the ingestion pipeline for quick checks of HDF5 files
//! and for the rotation-center diagnostic sweep.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tomors_algorithms::{BackProjector, CenterSweep};
use tomors_core::{
    Dataset, DatasetSummary, DiagnosticLog, FieldKind, FieldStatus, Origin, Severity,
    SliceParams, ValidationReport,
};
use tomors_io::{ReadOptions, Reader};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    TomorsIo(#[from] tomors_io::Error),

    #[error("Algorithm error: {0}")]
    Algorithms(#[from] tomors_algorithms::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid log level '{0}'")]
    LogLevel(String),
}

/// Validated ingestion of Data Exchange tomography datasets.
#[derive(Parser)]
#[command(name = "tomors")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Minimum severity of printed diagnostics (DEBUG, INFO, WARNING, ERROR)
    #[arg(long, global = true, default_value = "INFO")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a file without reading its arrays
    Inspect {
        /// Input HDF5 file
        input: PathBuf,

        /// Print the validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read a file and summarize the resulting dataset
    Ingest {
        /// Input HDF5 file
        input: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        /// Print the dataset summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconstruct one slice at a range of rotation centers
    DiagnoseCenter {
        /// Input HDF5 file
        input: PathBuf,

        /// Directory receiving one `<center>.tif` per candidate
        #[arg(short, long)]
        output: PathBuf,

        /// Slice to reconstruct (default: middle slice)
        #[arg(long)]
        slice: Option<usize>,

        /// First candidate center (default: detector middle - 20)
        #[arg(long)]
        center_start: Option<f32>,

        /// End of the candidate range, exclusive (default: detector middle + 20)
        #[arg(long)]
        center_end: Option<f32>,

        /// Distance between candidates (default: 1)
        #[arg(long)]
        center_step: Option<f32>,

        #[command(flatten)]
        window: WindowArgs,
    },
}

/// Slicing window of a read; omitted bounds cover the whole axis.
#[derive(Args, Debug, Clone, Copy)]
struct WindowArgs {
    /// First projection
    #[arg(long)]
    proj_start: Option<usize>,
    /// End projection, exclusive
    #[arg(long)]
    proj_end: Option<usize>,
    /// Projection step
    #[arg(long)]
    proj_step: Option<usize>,
    /// First slice (row)
    #[arg(long)]
    slice_start: Option<usize>,
    /// End slice, exclusive
    #[arg(long)]
    slice_end: Option<usize>,
    /// Slice step
    #[arg(long)]
    slice_step: Option<usize>,
    /// First pixel (column)
    #[arg(long)]
    pixel_start: Option<usize>,
    /// End pixel, exclusive
    #[arg(long)]
    pixel_end: Option<usize>,
    /// Pixel step
    #[arg(long)]
    pixel_step: Option<usize>,
    /// First white-field shot
    #[arg(long)]
    white_start: Option<usize>,
    /// End white-field shot, exclusive
    #[arg(long)]
    white_end: Option<usize>,
    /// First dark-field shot
    #[arg(long)]
    dark_start: Option<usize>,
    /// End dark-field shot, exclusive
    #[arg(long)]
    dark_end: Option<usize>,
}

impl From<WindowArgs> for SliceParams {
    fn from(args: WindowArgs) -> Self {
        SliceParams::default()
            .with_projections(args.proj_start, args.proj_end, args.proj_step)
            .with_slices(args.slice_start, args.slice_end, args.slice_step)
            .with_pixels(args.pixel_start, args.pixel_end, args.pixel_step)
            .with_white(args.white_start, args.white_end)
            .with_dark(args.dark_start, args.dark_end)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let threshold =
        Severity::parse(&cli.log_level).ok_or_else(|| CliError::LogLevel(cli.log_level.clone()))?;
    init_logging(threshold);

    match cli.command {
        Commands::Inspect { input, json } => {
            let mut log = DiagnosticLog::new(threshold);
            let report = Reader::hdf5().validate(&input, &mut log)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", format_report(&input, &report));
            }
            Ok(exit_code(report.file_check()))
        }

        Commands::Ingest {
            input,
            window,
            json,
        } => {
            let dataset = ingest(&input, window, &cli.log_level)?;
            let summary = dataset.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(exit_code(dataset.is_ready()))
        }

        Commands::DiagnoseCenter {
            input,
            output,
            slice,
            center_start,
            center_end,
            center_step,
            window,
        } => {
            let dataset = ingest(&input, window, &cli.log_level)?;
            if !dataset.is_ready() {
                eprintln!("{} was rejected; see {}", input.display(), log_path(&input));
                return Ok(ExitCode::FAILURE);
            }
            let mut sweep = CenterSweep::new().with_centers(center_start, center_end, center_step);
            sweep.slice = slice;
            let written = sweep.run(&dataset, &BackProjector, &output)?;
            println!(
                "Wrote {} reconstructions to {}",
                written.len(),
                output.display()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Routes `log` records to stderr; `RUST_LOG` overrides the threshold.
fn init_logging(threshold: Severity) {
    let default_filter = log::LevelFilter::from(threshold).to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

fn ingest(input: &Path, window: WindowArgs, log_level: &str) -> Result<Dataset> {
    let options = ReadOptions::new()
        .with_window(window.into())
        .with_log_level(log_level);
    Ok(tomors_io::read_exchange(input, &options)?)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn log_path(input: &Path) -> String {
    input.with_extension("log").display().to_string()
}

/// Per-field table of a validation report. The diagnostics themselves
/// reach stderr through the logger.
fn format_report(input: &Path, report: &ValidationReport) -> String {
    let mut out = format!("File: {}\n", input.display());
    for kind in FieldKind::ALL {
        let shape = report
            .shapes
            .get(kind)
            .map_or_else(|| "-".to_string(), |shape| format!("{shape:?}"));
        out.push_str(&format!(
            "{:<11} {:<16} {}\n",
            kind,
            shape,
            describe_status(report.status(kind))
        ));
    }
    out.push_str(&format!(
        "File check: {}\n",
        if report.file_check() { "ok" } else { "failed" }
    ));
    out
}

fn print_summary(summary: &DatasetSummary) {
    if let Some(source) = &summary.source {
        println!("File: {}", source.display());
    }
    println!("Created: {}", summary.created);
    println!("Status: {:?}", summary.status);
    if let Some(window) = &summary.window {
        let show = |w: tomors_core::Window| format!("{}..{} step {}", w.start, w.end, w.step);
        println!("Projections: {}", show(window.projections));
        println!("Slices: {}", show(window.slices));
        println!("Pixels: {}", show(window.pixels));
    }
    println!();
    for field in &summary.fields {
        let shape = field
            .shape
            .as_ref()
            .map_or_else(|| "-".to_string(), |shape| format!("{shape:?}"));
        let precision = field
            .precision
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        let origin = match field.origin {
            Some(Origin::File) => "file",
            Some(Origin::Memory) => "memory",
            Some(Origin::Synthetic) => "synthetic",
            None => "-",
        };
        println!(
            "{:<11} {:<16} {:<4} {:<9} {}",
            field.kind,
            shape,
            precision,
            origin,
            describe_status(&field.status)
        );
    }
}

fn describe_status(status: &FieldStatus) -> String {
    match status {
        FieldStatus::Missing => "missing".to_string(),
        FieldStatus::Invalid(defect) => format!("invalid: {defect}"),
        FieldStatus::Valid => "valid".to_string(),
    }
}

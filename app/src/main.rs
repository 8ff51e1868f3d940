// ==============================================================================
// main.rs - Cohort Statistics Entry Point
// ==============================================================================
// Description: Load both OASIS cohorts, run one analysis category and write
//              the report to stdout or a file
// Author: Matt Barham
// Created: 2026-10-14
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cohort_stats::analysis::{run_analysis, AnalysisCategory, AnalysisOptions, DEFAULT_HISTOGRAM_BINS};
use cohort_stats::dataset::{Cohorts, DataPaths, DEFAULT_CROSS_SECTIONAL_FILE, DEFAULT_LONGITUDINAL_FILE};
use cohort_stats::output::{render_json, render_text, OutputFormat, ReportWriter};
use cohort_stats::summarizer::SummaryOptions;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the cohort CSV files
    #[arg(short, long, env = "COHORT_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Cross-sectional file, relative to the data directory unless absolute
    #[arg(long, env = "CROSS_SECTIONAL_FILE", default_value = DEFAULT_CROSS_SECTIONAL_FILE)]
    cross_sectional: PathBuf,

    /// Longitudinal file, relative to the data directory unless absolute
    #[arg(long, env = "LONGITUDINAL_FILE", default_value = DEFAULT_LONGITUDINAL_FILE)]
    longitudinal: PathBuf,

    /// Analysis category (descriptive, education, correlation, predictive)
    #[arg(short, long, default_value = "descriptive")]
    category: String,

    /// Output format (json, text, sqlite)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file (stdout when omitted; required for sqlite)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also compare eTIV and MMSE and fit MMSE on education
    #[arg(long)]
    extended: bool,

    /// Histogram bins per variable and group
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    bins: usize,
}

fn main() -> Result<()> {
    // Initialize tracing (stderr, so stdout carries only the report)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cohort_stats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let category: AnalysisCategory = args.category.parse()?;
    let format: OutputFormat = args.format.parse()?;
    if format.requires_file() && args.output.is_none() {
        anyhow::bail!("--output is required for {} output", format.extension());
    }
    if args.bins == 0 {
        anyhow::bail!("--bins must be at least 1");
    }

    info!("Cohort statistics starting ({} analysis)", category);

    let paths = DataPaths::resolve(&args.data_dir, &args.cross_sectional, &args.longitudinal);
    let cohorts = Cohorts::load(&paths).context("Failed to load cohort datasets")?;

    let options = AnalysisOptions {
        summary: if args.extended {
            SummaryOptions::extended().with_regression()
        } else {
            SummaryOptions::default()
        },
        histogram_bins: args.bins,
    };

    let report = run_analysis(&cohorts, category, &options);

    match &args.output {
        Some(path) => {
            let written = ReportWriter::new(&cohorts).write(&report, format, path)?;
            info!("Report written: {:?}", written);
        }
        None => {
            let rendered = match format {
                OutputFormat::Json => render_json(&report)?,
                _ => render_text(&report)?,
            };
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("Failed to write report to stdout")?;
            if !rendered.ends_with('\n') {
                writeln!(stdout).context("Failed to write report to stdout")?;
            }
        }
    }

    Ok(())
}

//! Horserace CLI - derive model features from race result CSVs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use horserace::data::write_csv;
use horserace::{
    DataErrorPolicy, FeaturePipeline, PipelineConfig, PipelineReport, RaceTable,
    DEFAULT_OUTPUT_FILE,
};

#[derive(Parser)]
#[command(name = "horserace")]
#[command(author, version, about = "Horse racing feature pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive features and write the enriched table
    Preprocess {
        /// Input results CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV
        #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
        output: PathBuf,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Record data-quality errors instead of aborting
        #[arg(long)]
        flag_errors: bool,
    },

    /// Show distance quantile buckets for a results CSV
    Bins {
        /// Input results CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Number of buckets
        #[arg(long)]
        bins: Option<usize>,
    },

    /// Print the active lookup tables
    Lookup {
        /// Only print one table
        #[arg(short, long, value_enum)]
        table: Option<TableKind>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TableKind {
    Going,
    Type,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Preprocess {
            input,
            output,
            report,
            flag_errors,
        } => {
            let config = if flag_errors {
                config.with_policy(DataErrorPolicy::Flag)
            } else {
                config
            };
            run_preprocess(config, &input, &output, report.as_deref())?;
        }
        Commands::Bins { input, bins } => {
            let config = match bins {
                Some(n) => config.with_distance_bins(n),
                None => config,
            };
            show_bins(config, &input)?;
        }
        Commands::Lookup { table } => {
            show_lookup(config, table)?;
        }
    }

    Ok(())
}

fn run_preprocess(
    config: PipelineConfig,
    input: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    println!(
        "{}: {} -> {}",
        "Preprocessing".green(),
        input.display(),
        output.display()
    );

    let table =
        RaceTable::load(input).with_context(|| format!("Failed to load CSV from {:?}", input))?;
    if table.is_empty() {
        println!("{}", "Input has no rows; writing headers only.".yellow());
    }

    let index_column = config.index_column.clone();
    let pipeline = FeaturePipeline::new(config).context("Failed to build pipeline")?;
    let result = pipeline
        .run(&table)
        .with_context(|| format!("Feature derivation failed for {:?}", input))?;

    write_csv(&result.frame, output, &index_column)
        .with_context(|| format!("Failed to write {:?}", output))?;

    print_report(&result.report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&result.report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!();
    println!("{}", "Summary".yellow().bold());
    println!("{}", "-".repeat(40));
    println!("{:<28} {:>10}", "Rows", report.rows);
    println!("{:<28} {:>10}", "Races", report.races);
    println!("{:<28} {:>10}", "Places scored as last", report.filled_places);
    println!("{:<28} {:>10}", "Positions clamped", report.clamped_positions);
    println!("{:<28} {:>10}", "Missing weight", report.missing_weight);
    println!("{:<28} {:>10}", "Missing distance", report.missing_distance);
    println!(
        "{:<28} {:>10}",
        "Unmapped going",
        report.unmapped.going_rows()
    );
    println!(
        "{:<28} {:>10}",
        "Unmapped race type",
        report.unmapped.race_type_rows()
    );

    if !report.distance_edges.is_empty() {
        let edges: Vec<String> = report
            .distance_edges
            .iter()
            .map(|e| format!("{:.2}", e))
            .collect();
        println!("{:<28} {}", "Distance edges", edges.join(" | "));
    }
    if report.distance_bins_collapsed {
        println!(
            "{}",
            "Duplicate distance edges were dropped; fewer buckets than requested".yellow()
        );
    }

    if !report.issues.is_empty() {
        println!();
        println!(
            "{} {} data-quality issues flagged",
            "Warning".yellow(),
            report.issues.len()
        );
        for issue in report.issues.iter().take(10) {
            println!("  [{}] {}", issue.code, issue.message);
        }
        if report.issues.len() > 10 {
            println!("  ... and {} more", report.issues.len() - 10);
        }
    }
}

fn show_bins(config: PipelineConfig, input: &Path) -> Result<()> {
    let table =
        RaceTable::load(input).with_context(|| format!("Failed to load CSV from {:?}", input))?;
    let pipeline = FeaturePipeline::new(config).context("Failed to build pipeline")?;

    let Some((bins, counts)) = pipeline.fit_distance_bins(&table)? else {
        println!("{}", "No parseable distances found.".red());
        return Ok(());
    };

    println!("{}", "Distance buckets (furlongs):".yellow().bold());
    println!("{:>3} {:<20} {:>8}", "#", "Interval", "Rows");
    println!("{}", "-".repeat(33));
    for (i, (label, count)) in bins.labels().iter().zip(&counts).enumerate() {
        println!("{:>3} {:<20} {:>8}", i, label, count);
    }

    if bins.collapsed() {
        println!();
        println!(
            "{}",
            format!(
                "Only {} distinct buckets; repeated distances share an edge.",
                bins.len()
            )
            .yellow()
        );
    }

    Ok(())
}

fn show_lookup(config: PipelineConfig, table: Option<TableKind>) -> Result<()> {
    let pipeline = FeaturePipeline::new(config).context("Failed to build pipeline")?;
    let tables = pipeline.tables();

    println!("Lookup tables version {}", tables.version.cyan());

    if table != Some(TableKind::Type) {
        println!();
        println!("{}", "Going:".yellow().bold());
        for (code, bin) in tables.sorted_going() {
            println!("  {:<8} {}", code, bin);
        }
    }

    if table != Some(TableKind::Going) {
        println!();
        println!("{}", "Race type:".yellow().bold());
        for (label, bin) in tables.sorted_race_type() {
            println!("  {:<20} {}", label, bin);
        }
    }

    Ok(())
}

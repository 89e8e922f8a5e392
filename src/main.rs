use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, Subcommand};
use log::info;

use nutriclean::data::export::to_record_batch;
use nutriclean::data::loader::DEFAULT_SHEET;
use nutriclean::{Normalizer, PipelineConfig};

/// nutriclean - normalize product nutrition tables
#[derive(Parser)]
#[command(name = "nutriclean")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON pipeline file
    Run {
        /// Pipeline configuration
        config: PathBuf,
        /// Input file, overrides the pipeline's `input`
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output file, overrides the pipeline's `output`
        #[arg(long)]
        output: Option<PathBuf>,
        /// Worksheet name, overrides the pipeline's `sheet`
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Display table information
    Info {
        path: PathBuf,
        #[arg(long, default_value = DEFAULT_SHEET)]
        sheet: String,
    },
    /// Display the first N rows
    Head {
        path: PathBuf,
        /// Number of rows to display
        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,
        #[arg(long, default_value = DEFAULT_SHEET)]
        sheet: String,
    },
    /// Convert between file formats
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_SHEET)]
        sheet: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, input, output, sheet } => cmd_run(&config, input, output, sheet),
        Commands::Info { path, sheet } => cmd_info(&path, &sheet),
        Commands::Head { path, rows, sheet } => cmd_head(&path, rows, &sheet),
        Commands::Convert { input, output, sheet } => cmd_convert(&input, &output, &sheet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path, sheet: &str) -> Result<Normalizer> {
    Normalizer::load(path, sheet).with_context(|| format!("Failed to load {}", path.display()))
}

fn save(normalizer: &Normalizer, path: &Path) -> Result<()> {
    if !normalizer.save(path) {
        anyhow::bail!("Failed to save {}", path.display());
    }
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    sheet: Option<String>,
) -> Result<()> {
    let mut config = PipelineConfig::from_path(config_path)
        .with_context(|| format!("Invalid pipeline {}", config_path.display()))?;
    if input.is_some() {
        config.input = input;
    }
    if output.is_some() {
        config.output = output;
    }
    if let Some(sheet) = sheet {
        config.sheet = sheet;
    }

    let input = config.input.clone().context("No input file given")?;
    let output = config.output.clone().context("No output file given")?;

    let mut normalizer = load(&input, &config.sheet)?;
    info!("Loaded {} rows × {} columns", normalizer.num_rows(), normalizer.num_columns());
    config.run(&mut normalizer).context("Pipeline failed")?;
    save(&normalizer, &output)?;

    println!(
        "Cleaned {} -> {} ({} rows, {} columns)",
        input.display(),
        output.display(),
        normalizer.num_rows(),
        normalizer.num_columns()
    );
    Ok(())
}

fn cmd_info(path: &Path, sheet: &str) -> Result<()> {
    let normalizer = load(path, sheet)?;
    let table = normalizer.table();

    println!("File: {}", path.display());
    println!("Rows: {}", table.num_rows());
    println!("Columns: {}", table.num_columns());
    for col in table.columns() {
        let unique = table.unique_count(&col.name)?;
        println!("  {} ({}, {unique} unique)", col.name, col.kind());
    }
    Ok(())
}

fn cmd_head(path: &Path, rows: usize, sheet: &str) -> Result<()> {
    let normalizer = load(path, sheet)?;
    let batch = to_record_batch(&normalizer.preview(rows))?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, sheet: &str) -> Result<()> {
    let normalizer = load(input, sheet)?;
    save(&normalizer, output)?;
    println!(
        "Converted {} -> {} ({} rows)",
        input.display(),
        output.display(),
        normalizer.num_rows()
    );
    Ok(())
}

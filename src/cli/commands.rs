use crate::analyzers::AirQualityAnalyzer;
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::curation::CurationLog;
use crate::error::{ProcessingError, Result};
use crate::fetch::{RateLimitedFetcher, ReqwestHttpClient};
use crate::pipeline::{CollectOutput, IntegrateOutput, ParquetExport, Pipeline};
use crate::processors::{BulkCollector, Validator};
use crate::utils::constants::FINAL_DATASET_FILE;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Collect {
            input,
            limit,
            data_dir,
        } => {
            let pipeline = pipeline(&settings, data_dir, limit, cli.quiet);
            let collector = collector(&settings)?;
            let mut log = CurationLog::new();

            println!("Collecting air quality data...");
            println!("Reference dataset: {}", input.display());

            let output = pipeline.collect(&input, &collector, &mut log).await?;
            print_collection(&output);

            let log_path = pipeline.export_log(&log)?;
            println!("Curation log saved: {} ({} steps)", log_path.display(), log.len());
        }

        Commands::Integrate {
            readings,
            reference,
            data_dir,
            parquet,
            compression,
        } => {
            let pipeline = pipeline(&settings, data_dir, None, cli.quiet);
            let export = parquet.map(|path| ParquetExport { path, compression });
            let mut log = CurationLog::new();

            println!("Integrating air quality data...");

            let spinner = ProgressReporter::new_spinner("Merging and validating...", cli.quiet);
            let output = pipeline.integrate(
                reference.as_deref(),
                readings.as_deref(),
                export.as_ref(),
                &mut log,
            )?;
            spinner.finish_with_message(&format!("Integrated {} records", output.records.len()));
            print_integration(&output);

            let log_path = pipeline.export_log(&log)?;
            println!("Curation log saved: {} ({} steps)", log_path.display(), log.len());
        }

        Commands::Run {
            input,
            limit,
            data_dir,
            parquet,
            compression,
        } => {
            let pipeline = pipeline(&settings, data_dir, limit, cli.quiet);
            let collector = collector(&settings)?;
            let export = parquet.map(|path| ParquetExport { path, compression });
            let mut log = CurationLog::new();

            println!("=== Collection ===");
            let collected = pipeline.collect(&input, &collector, &mut log).await?;
            print_collection(&collected);

            println!("\n=== Integration ===");
            let integrated = pipeline.integrate(
                Some(collected.reference_path.as_path()),
                Some(collected.readings_path.as_path()),
                export.as_ref(),
                &mut log,
            )?;
            print_integration(&integrated);

            let log_path = pipeline.export_log(&log)?;
            println!("Curation log saved: {} ({} steps)", log_path.display(), log.len());
            println!("Pipeline complete!");
        }

        Commands::Summarize { input, data_dir } => {
            let path = input.unwrap_or_else(|| {
                data_dir
                    .unwrap_or_else(|| settings.output.data_dir.clone())
                    .join(FINAL_DATASET_FILE)
            });

            println!("Analyzing final dataset: {}", path.display());
            let stats = AirQualityAnalyzer::new().analyze_csv(&path)?;
            println!("\n{}", stats.summary());
        }
    }

    Ok(())
}

fn pipeline(
    settings: &Settings,
    data_dir: Option<PathBuf>,
    limit: Option<usize>,
    quiet: bool,
) -> Pipeline {
    let data_dir = data_dir.unwrap_or_else(|| settings.output.data_dir.clone());
    let limit = limit.unwrap_or(settings.collection.city_limit);
    Pipeline::new(CsvWriter::new(data_dir), limit).with_quiet(quiet)
}

fn collector(settings: &Settings) -> Result<BulkCollector> {
    let api_key = settings.require_api_key()?;
    let fetcher = RateLimitedFetcher::new(
        Arc::new(ReqwestHttpClient::new()),
        settings.endpoint(),
        api_key,
    )
    .with_policy(settings.retry_policy());

    Ok(BulkCollector::new(fetcher).with_inter_request_delay(settings.inter_request_delay()))
}

fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                ProcessingError::Config(format!("Cannot open log file {}: {}", path.display(), e))
            })?;
            Some(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}

fn print_collection(output: &CollectOutput) {
    let result = &output.result;

    println!(
        "\nReference: {} cities, {:.1}% with population, {} with invalid coordinates",
        output.audit.total_cities,
        output.audit.population_coverage_pct,
        output.audit.invalid_coordinates
    );
    println!("Selected: {} cities -> {}", output.selected.len(), output.reference_path.display());
    println!(
        "Collected: {} readings ({} successful, {} errors) in {:.1}s",
        result.readings.len(),
        result.success_count(),
        result.error_count(),
        result.duration.as_secs_f64()
    );
    for (kind, count) in result.error_breakdown() {
        println!("  - {}: {}", kind, count);
    }
    println!("Raw readings: {}", output.readings_path.display());
    if let Some(path) = &output.errors_path {
        println!("Errors: {}", path.display());
    }
}

fn print_integration(output: &IntegrateOutput) {
    println!("Readings: {}", output.readings_path.display());
    println!(
        "Merge: {} matched, {} reference only, {} readings without a reference row",
        output.merge.matched, output.merge.reference_only, output.merge.readings_only
    );
    if output.merge.duplicate_reading_keys > 0 {
        println!(
            "Ignored {} duplicate readings",
            output.merge.duplicate_reading_keys
        );
    }

    println!("\n{}", Validator::new().generate_summary(&output.validation));
    println!("\nFinal dataset: {}", output.final_path.display());

    if let Some(info) = &output.parquet {
        println!("\n{}", info.summary());
    }
}

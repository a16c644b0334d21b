use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "airq-processor")]
#[command(about = "Collect air quality readings for the world's largest cities and integrate them with population data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Settings file (TOML, YAML or JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Only log warnings and hide progress bars")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select the most populous cities and collect a reading for each
    Collect {
        #[arg(short, long, help = "Reference cities CSV (SimpleMaps layout)")]
        input: PathBuf,

        #[arg(short, long, help = "Number of cities to collect [default: from settings]")]
        limit: Option<usize>,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        data_dir: Option<PathBuf>,
    },

    /// Merge stored readings with the selected cities and validate the result
    Integrate {
        #[arg(short, long, help = "Readings CSV [default: latest raw_air_quality_*.csv]")]
        readings: Option<PathBuf>,

        #[arg(long, help = "Selected cities CSV [default: {data_dir}/raw_top_cities.csv]")]
        reference: Option<PathBuf>,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        data_dir: Option<PathBuf>,

        #[arg(long, help = "Also write the final table to this Parquet file")]
        parquet: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,
    },

    /// Collect then integrate in one run
    Run {
        #[arg(short, long, help = "Reference cities CSV (SimpleMaps layout)")]
        input: PathBuf,

        #[arg(short, long, help = "Number of cities to collect [default: from settings]")]
        limit: Option<usize>,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        data_dir: Option<PathBuf>,

        #[arg(long, help = "Also write the final table to this Parquet file")]
        parquet: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,
    },

    /// Print descriptive statistics for a final integrated table
    Summarize {
        #[arg(short, long, help = "Final dataset CSV [default: {data_dir}/integrated_cities_air_quality_final.csv]")]
        input: Option<PathBuf>,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        data_dir: Option<PathBuf>,
    },
}

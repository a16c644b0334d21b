//! Stage orchestration shared by the CLI commands.
//!
//! `collect` covers reference loading through raw artifact storage;
//! `integrate` covers the merge through the final table. Both append to the
//! caller's curation log; exporting it is left to the caller.

use crate::curation::CurationLog;
use crate::error::Result;
use crate::models::{AirQualityReading, CityRecord, MergedRecord};
use crate::processors::{
    BulkCollector, CitySelector, CollectionResult, Integrator, MergeReport, ReferenceAudit,
    ValidationReport, Validator,
};
use crate::readers::{CityReader, ReadingReader};
use crate::utils::constants::REFERENCE_FILE;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, ParquetFileInfo, ParquetWriter};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct CollectOutput {
    pub audit: ReferenceAudit,
    pub selected: Vec<CityRecord>,
    pub result: CollectionResult,
    pub reference_path: PathBuf,
    pub readings_path: PathBuf,
    pub errors_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct IntegrateOutput {
    pub readings_path: PathBuf,
    pub merge: MergeReport,
    pub validation: ValidationReport,
    pub records: Vec<MergedRecord>,
    pub final_path: PathBuf,
    pub parquet: Option<ParquetFileInfo>,
}

/// Parquet export request for the final table.
#[derive(Debug, Clone)]
pub struct ParquetExport {
    pub path: PathBuf,
    pub compression: String,
}

pub struct Pipeline {
    writer: CsvWriter,
    selector: CitySelector,
    quiet: bool,
}

impl Pipeline {
    pub fn new(writer: CsvWriter, city_limit: usize) -> Self {
        Self {
            writer,
            selector: CitySelector::new(city_limit),
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn data_dir(&self) -> &Path {
        self.writer.data_dir()
    }

    /// Select the most populous cities from `reference`, collect a reading
    /// for each and persist the raw artifacts.
    pub async fn collect(
        &self,
        reference: &Path,
        collector: &BulkCollector,
        log: &mut CurationLog,
    ) -> Result<CollectOutput> {
        let cities = CityReader::new().read_cities(reference)?;
        let audit = self.selector.audit(&cities, log);
        let selected = self.selector.select(&cities, log);
        let reference_path = self.writer.write_reference(&selected, log)?;

        let progress = ProgressReporter::new(
            selected.len() as u64,
            "Collecting air quality readings...",
            self.quiet,
        );
        let result = collector.collect(&selected, log, Some(&progress)).await;
        progress.finish_with_message(&format!(
            "Collected {} readings ({} errors)",
            result.readings.len(),
            result.error_count()
        ));

        let readings_path = self.writer.write_readings(&result.readings, log)?;
        let errors_path = self.writer.write_errors(&result.errors, log)?;

        Ok(CollectOutput {
            audit,
            selected,
            result,
            reference_path,
            readings_path,
            errors_path,
        })
    }

    /// Merge the stored reference table with a readings file (the latest one
    /// in the data directory when `readings` is `None`), validate and write
    /// the final table.
    pub fn integrate(
        &self,
        reference: Option<&Path>,
        readings: Option<&Path>,
        parquet: Option<&ParquetExport>,
        log: &mut CurationLog,
    ) -> Result<IntegrateOutput> {
        let reading_reader = ReadingReader::new();
        let (readings_path, readings) = match readings {
            Some(path) => (path.to_path_buf(), reading_reader.read_readings(path)?),
            None => reading_reader.read_latest_readings(self.data_dir())?,
        };

        let reference_path = reference
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir().join(REFERENCE_FILE));
        let cities = CityReader::new().read_cities(&reference_path)?;
        log.log_step(
            "Data Load",
            format!(
                "Loaded {} reference cities and {} readings from {}",
                cities.len(),
                readings.len(),
                readings_path.display()
            ),
        );

        log_cleaning(&readings, log);

        let merge = Integrator::new().integrate(&cities, &readings, log);
        let validated = Validator::new().validate(merge.records, log);

        let final_path = self.writer.write_final_dataset(&validated.records, log)?;

        let parquet = match parquet {
            Some(export) => {
                let writer = ParquetWriter::new().with_compression(&export.compression)?;
                writer.write_records(&validated.records, &export.path)?;
                log.log_step(
                    "Parquet Export",
                    format!("Wrote {} records to {}", validated.records.len(), export.path.display()),
                );
                Some(writer.get_file_info(&export.path)?)
            }
            None => None,
        };

        Ok(IntegrateOutput {
            readings_path,
            merge: merge.report,
            validation: validated.report,
            records: validated.records,
            final_path,
            parquet,
        })
    }

    pub fn export_log(&self, log: &CurationLog) -> Result<PathBuf> {
        self.writer.write_curation_log(log)
    }
}

/// Record the cleaning the readers already applied, plus the missing-AQI
/// count and the categorical values seen in the readings.
fn log_cleaning(readings: &[AirQualityReading], log: &mut CurationLog) {
    log.log_step("Cleaning Start", "Beginning data cleaning and standardization");
    log.log_step(
        "Cleaning - Column Names",
        "Standardized column names to snake_case",
    );
    log.log_step(
        "Cleaning - Data Types",
        "Standardized numeric and string data types",
    );

    let missing_aqi = readings.iter().filter(|r| r.aqi.is_none()).count();
    log.log_step(
        "Cleaning - Missing Values",
        format!("{} cities missing AQI data, flagged for transparency", missing_aqi),
    );

    let categories: BTreeSet<&str> = readings
        .iter()
        .filter_map(|r| r.aqi_category.as_deref())
        .collect();
    let pollutants: BTreeSet<&str> = readings
        .iter()
        .filter_map(|r| r.dominant_pollutant.as_deref())
        .collect();
    tracing::info!("AQI categories: {:?}", categories);
    tracing::info!("Pollutants: {:?}", pollutants);
    log.log_step(
        "Cleaning - Categories",
        format!(
            "Reviewed {} AQI categories and {} dominant pollutants",
            categories.len(),
            pollutants.len()
        ),
    );
}

use crate::curation::CurationLog;
use crate::error::Result;
use crate::models::{AirQualityReading, CityRecord, CollectionError, MergedRecord};
use crate::utils::constants::{
    COLLECTION_ERRORS_PREFIX, CURATION_LOG_PREFIX, FINAL_DATASET_FILE, RAW_READINGS_PREFIX,
    REFERENCE_FILE,
};
use crate::utils::timestamped_csv_path;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

const REFERENCE_COLUMNS: [&str; 7] = [
    "city",
    "country",
    "latitude",
    "longitude",
    "population",
    "iso2",
    "iso3",
];

const READING_COLUMNS: [&str; 9] = [
    "city",
    "country",
    "latitude",
    "longitude",
    "aqi",
    "aqi_category",
    "dominant_pollutant",
    "collection_timestamp",
    "status",
];

const ERROR_COLUMNS: [&str; 5] = ["city", "country", "error_type", "detail", "timestamp"];

/// Persists every CSV artifact of a run under one data directory.
///
/// Timestamped filenames share the instant the writer was created, so the
/// files of one run sort together.
pub struct CsvWriter {
    data_dir: PathBuf,
    run_started: DateTime<Local>,
}

impl CsvWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            run_started: Local::now(),
        }
    }

    pub fn with_run_started(mut self, run_started: DateTime<Local>) -> Self {
        self.run_started = run_started;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn write_reference(&self, cities: &[CityRecord], log: &mut CurationLog) -> Result<PathBuf> {
        let path = self.data_dir.join(REFERENCE_FILE);
        write_csv(&path, &REFERENCE_COLUMNS, cities)?;
        log.log_step(
            "Data Storage",
            format!("Saved {} reference cities: {}", cities.len(), path.display()),
        );
        Ok(path)
    }

    pub fn write_readings(
        &self,
        readings: &[AirQualityReading],
        log: &mut CurationLog,
    ) -> Result<PathBuf> {
        let path = self.timestamped(RAW_READINGS_PREFIX);
        write_csv(&path, &READING_COLUMNS, readings)?;
        log.log_step("Data Storage", format!("Saved raw API data: {}", path.display()));
        Ok(path)
    }

    /// Writes the error log only when there is something to record.
    pub fn write_errors(
        &self,
        errors: &[CollectionError],
        log: &mut CurationLog,
    ) -> Result<Option<PathBuf>> {
        if errors.is_empty() {
            return Ok(None);
        }

        let path = self.timestamped(COLLECTION_ERRORS_PREFIX);
        write_csv(&path, &ERROR_COLUMNS, errors)?;
        log.log_step(
            "Error Logging",
            format!("Saved {} errors to {}", errors.len(), path.display()),
        );
        Ok(Some(path))
    }

    pub fn write_final_dataset(
        &self,
        records: &[MergedRecord],
        log: &mut CurationLog,
    ) -> Result<PathBuf> {
        let path = self.data_dir.join(FINAL_DATASET_FILE);
        write_csv(&path, &MergedRecord::COLUMNS, records)?;
        log.log_step(
            "Final Dataset",
            format!("Created final integrated dataset: {}", path.display()),
        );
        Ok(path)
    }

    pub fn write_curation_log(&self, log: &CurationLog) -> Result<PathBuf> {
        let path = self.timestamped(CURATION_LOG_PREFIX);
        log.export(&path)?;
        Ok(path)
    }

    fn timestamped(&self, prefix: &str) -> PathBuf {
        timestamped_csv_path(&self.data_dir, prefix, &self.run_started)
    }
}

/// Header is written explicitly so an empty table still carries its columns.
fn write_csv<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);

    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

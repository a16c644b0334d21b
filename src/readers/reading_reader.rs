use crate::error::Result;
use crate::models::{AirQualityReading, MergedRecord};
use crate::utils::constants::RAW_READINGS_PREFIX;
use crate::utils::filename::find_latest_csv;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Reads tables this crate wrote earlier: raw readings and the final dataset.
pub struct ReadingReader;

impl ReadingReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_readings(&self, path: &Path) -> Result<Vec<AirQualityReading>> {
        let readings = read_csv(File::open(path)?)?;
        tracing::debug!("Read {} readings from {}", readings.len(), path.display());
        Ok(readings)
    }

    /// Load the most recently written raw readings file in `data_dir`.
    pub fn read_latest_readings(
        &self,
        data_dir: &Path,
    ) -> Result<(PathBuf, Vec<AirQualityReading>)> {
        let path = find_latest_csv(data_dir, RAW_READINGS_PREFIX)?;
        tracing::info!("Using latest readings file: {}", path.display());
        let readings = self.read_readings(&path)?;
        Ok((path, readings))
    }

    pub fn read_final_dataset(&self, path: &Path) -> Result<Vec<MergedRecord>> {
        read_csv(File::open(path)?)
    }
}

impl Default for ReadingReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_csv<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}

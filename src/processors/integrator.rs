use crate::curation::CurationLog;
use crate::models::{AirQualityReading, CityKey, CityRecord, MergedRecord};
use std::collections::{HashMap, HashSet};

/// Join diagnostics, equivalent to a merge indicator column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub reference_rows: usize,
    /// Reference rows with a reading on the same key.
    pub matched: usize,
    /// Reference rows with no reading.
    pub reference_only: usize,
    /// Distinct reading keys that matched no reference row.
    pub readings_only: usize,
    /// Readings ignored because an earlier reading had the same key.
    pub duplicate_reading_keys: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub records: Vec<MergedRecord>,
    pub report: MergeReport,
}

/// Left-joins the reference table with collected readings on (name, country).
///
/// Every reference row appears exactly once in the output, in input order.
/// When the readings table repeats a key, only its first reading is attached.
#[derive(Debug, Default)]
pub struct Integrator;

impl Integrator {
    pub fn new() -> Self {
        Self
    }

    pub fn integrate(
        &self,
        cities: &[CityRecord],
        readings: &[AirQualityReading],
        log: &mut CurationLog,
    ) -> MergeOutcome {
        log.log_step(
            "Integration Start",
            "Beginning merge of population and air quality data",
        );

        let (index, duplicate_reading_keys) = self.index_readings(readings);
        if duplicate_reading_keys > 0 {
            log.log_step(
                "Integration - Duplicate Readings",
                format!(
                    "{} readings share a key with an earlier reading; first occurrence kept",
                    duplicate_reading_keys
                ),
            );
        }

        let mut report = MergeReport {
            reference_rows: cities.len(),
            duplicate_reading_keys,
            ..MergeReport::default()
        };

        let mut records = Vec::with_capacity(cities.len());
        let mut reference_keys = HashSet::with_capacity(cities.len());

        for city in cities {
            let key = city.key();
            let reading = index.get(&key).copied();

            if reading.is_some() {
                report.matched += 1;
            } else {
                report.reference_only += 1;
            }

            records.push(MergedRecord::from_parts(city, reading));
            reference_keys.insert(key);
        }

        report.readings_only = index
            .keys()
            .filter(|key| !reference_keys.contains(*key))
            .count();

        tracing::info!(
            matched = report.matched,
            reference_only = report.reference_only,
            readings_only = report.readings_only,
            "Merge indicator"
        );

        log.log_step(
            "Integration - Merge",
            format!(
                "Merged {} records ({} matched, {} reference only)",
                records.len(),
                report.matched,
                report.reference_only
            ),
        );

        MergeOutcome { records, report }
    }

    /// First reading per key, plus the number of later duplicates ignored.
    fn index_readings<'a>(
        &self,
        readings: &'a [AirQualityReading],
    ) -> (HashMap<CityKey, &'a AirQualityReading>, usize) {
        let mut index = HashMap::with_capacity(readings.len());
        let mut duplicates = 0;

        for reading in readings {
            let key = reading.key();
            if index.contains_key(&key) {
                duplicates += 1;
            } else {
                index.insert(key, reading);
            }
        }

        (index, duplicates)
    }
}

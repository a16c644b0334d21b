use crate::curation::CurationLog;
use crate::models::{CityKey, MergedRecord};
use crate::utils::constants::{MAX_VALID_AQI, MIN_VALID_AQI};
use std::collections::HashSet;

/// Documented index ranges per category label, Universal AQI then US EPA.
const AQI_CATEGORY_RANGES: &[(&str, f64, f64)] = &[
    ("Excellent air quality", 80.0, 100.0),
    ("Good air quality", 60.0, 79.0),
    ("Moderate air quality", 40.0, 59.0),
    ("Low air quality", 20.0, 39.0),
    ("Poor air quality", 0.0, 19.0),
    ("Good", 0.0, 50.0),
    ("Moderate", 51.0, 100.0),
    ("Unhealthy for Sensitive Groups", 101.0, 150.0),
    ("Unhealthy", 151.0, 200.0),
    ("Very Unhealthy", 201.0, 300.0),
    ("Hazardous", 301.0, 500.0),
];

pub fn category_range(category: &str) -> Option<(f64, f64)> {
    AQI_CATEGORY_RANGES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(category.trim()))
        .map(|(_, min, max)| (*min, *max))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub key: CityKey,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationType {
    CoordinatesOutOfRange,
    AqiOutsideCategoryRange,
    AqiOutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCompleteness {
    pub column: &'static str,
    pub null_count: usize,
    pub completeness_pct: f64,
}

impl ColumnCompleteness {
    pub fn null_pct(&self) -> f64 {
        100.0 - self.completeness_pct
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub input_records: usize,
    pub total_records: usize,
    pub duplicates_removed: usize,
    /// Keys that occurred more than once, in first-seen order.
    pub duplicate_keys: Vec<CityKey>,
    pub invalid_coordinates: usize,
    pub violations: Vec<Violation>,
    /// One entry per column, in output column order.
    pub completeness: Vec<ColumnCompleteness>,
}

impl ValidationReport {
    pub fn null_count(&self, column: &str) -> Option<usize> {
        self.completeness
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.null_count)
    }

    pub fn aqi_violations(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.violation_type != ViolationType::CoordinatesOutOfRange)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub records: Vec<MergedRecord>,
    pub report: ValidationReport,
}

/// Final-table checks: deduplicate, audit nulls, check ranges, compute completeness.
///
/// Only deduplication changes the table; everything else is reported. The
/// validator never fails.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, records: Vec<MergedRecord>, log: &mut CurationLog) -> ValidationOutcome {
        log.log_step(
            "Validation Start",
            "Running final validation checks on integrated data",
        );

        let mut report = ValidationReport {
            input_records: records.len(),
            ..ValidationReport::default()
        };

        let records = self.remove_duplicates(records, &mut report);
        if report.duplicates_removed > 0 {
            log.log_step(
                "Validation - Duplicates",
                format!("Removed {} duplicate records", report.duplicates_removed),
            );
        } else {
            log.log_step("Validation - Duplicates", "No duplicates found");
        }
        report.total_records = records.len();

        report.completeness = self.column_completeness(&records);
        let missing: Vec<String> = report
            .completeness
            .iter()
            .filter(|c| c.null_count > 0)
            .map(|c| format!("'{}': {}", c.column, c.null_count))
            .collect();
        log.log_step(
            "Validation - Missing Values",
            format!("Missing value counts: {{{}}}", missing.join(", ")),
        );

        self.check_ranges(&records, &mut report);
        self.log_value_ranges(&records);
        log.log_step(
            "Validation - Data Ranges",
            format!(
                "{} records with invalid coordinates, {} aqi values outside documented range",
                report.invalid_coordinates,
                report.aqi_violations()
            ),
        );

        let per_column: Vec<String> = report
            .completeness
            .iter()
            .map(|c| format!("{}: {:.1}%", c.column, c.completeness_pct))
            .collect();
        log.log_step(
            "Validation - Completeness",
            format!("Column completeness: {}", per_column.join(", ")),
        );

        ValidationOutcome { records, report }
    }

    /// Keep the first occurrence of each key, stable on input order.
    fn remove_duplicates(
        &self,
        records: Vec<MergedRecord>,
        report: &mut ValidationReport,
    ) -> Vec<MergedRecord> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut reported = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            let key = record.key();
            if seen.contains(&key) {
                report.duplicates_removed += 1;
                if reported.insert(key.clone()) {
                    tracing::warn!(city = %key, "Duplicate key dropped");
                    report.duplicate_keys.push(key);
                }
            } else {
                seen.insert(key);
                kept.push(record);
            }
        }

        kept
    }

    fn column_completeness(&self, records: &[MergedRecord]) -> Vec<ColumnCompleteness> {
        let mut null_counts = [0usize; 12];
        for record in records {
            for (count, is_null) in null_counts.iter_mut().zip(record.null_mask()) {
                if is_null {
                    *count += 1;
                }
            }
        }

        let total = records.len();
        MergedRecord::COLUMNS
            .into_iter()
            .zip(null_counts)
            .map(|(column, null_count)| ColumnCompleteness {
                column,
                null_count,
                completeness_pct: if total == 0 {
                    100.0
                } else {
                    100.0 * (1.0 - null_count as f64 / total as f64)
                },
            })
            .collect()
    }

    fn check_ranges(&self, records: &[MergedRecord], report: &mut ValidationReport) {
        for record in records {
            if record.has_out_of_range_coordinates() {
                report.invalid_coordinates += 1;
                report.violations.push(Violation {
                    key: record.key(),
                    violation_type: ViolationType::CoordinatesOutOfRange,
                    details: format!(
                        "coordinates ({}, {}) outside [-90, 90] x [-180, 180]",
                        record.latitude, record.longitude
                    ),
                });
            }

            if let Some(aqi) = record.aqi {
                self.check_aqi(record, aqi, report);
            }
        }
    }

    fn check_aqi(&self, record: &MergedRecord, aqi: f64, report: &mut ValidationReport) {
        let known_range = record.aqi_category.as_deref().and_then(category_range);

        match known_range {
            Some((min, max)) if !(min..=max).contains(&aqi) => {
                report.violations.push(Violation {
                    key: record.key(),
                    violation_type: ViolationType::AqiOutsideCategoryRange,
                    details: format!(
                        "aqi {} outside [{}, {}] for category '{}'",
                        aqi,
                        min,
                        max,
                        record.aqi_category.as_deref().unwrap_or_default()
                    ),
                });
            }
            Some(_) => {}
            None if !(MIN_VALID_AQI..=MAX_VALID_AQI).contains(&aqi) => {
                report.violations.push(Violation {
                    key: record.key(),
                    violation_type: ViolationType::AqiOutOfRange,
                    details: format!(
                        "aqi {} outside [{}, {}]",
                        aqi, MIN_VALID_AQI, MAX_VALID_AQI
                    ),
                });
            }
            None => {}
        }
    }

    fn log_value_ranges(&self, records: &[MergedRecord]) {
        let span = |values: Vec<f64>| -> Option<(f64, f64)> {
            values
                .into_iter()
                .filter(|v| !v.is_nan())
                .fold(None, |acc, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
        };

        let population = span(records.iter().filter_map(|r| r.population).collect());
        let aqi = span(records.iter().filter_map(|r| r.aqi).collect());
        let latitude = span(records.iter().map(|r| r.latitude).collect());
        let longitude = span(records.iter().map(|r| r.longitude).collect());

        tracing::info!(
            population = ?population,
            aqi = ?aqi,
            latitude = ?latitude,
            longitude = ?longitude,
            "Observed value ranges"
        );
    }

    /// Human-readable summary of a report.
    pub fn generate_summary(&self, report: &ValidationReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Validation Report ===\n");
        summary.push_str(&format!("Input Records: {}\n", report.input_records));
        summary.push_str(&format!("Final Records: {}\n", report.total_records));
        summary.push_str(&format!(
            "Duplicates Removed: {}\n",
            report.duplicates_removed
        ));
        summary.push_str(&format!(
            "Invalid Coordinates: {}\n",
            report.invalid_coordinates
        ));
        summary.push_str(&format!("AQI Range Issues: {}\n", report.aqi_violations()));

        summary.push_str("\nCompleteness:\n");
        for column in &report.completeness {
            summary.push_str(&format!(
                "  {}: {:.1}% ({} missing)\n",
                column.column, column.completeness_pct, column.null_count
            ));
        }

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {}: {}\n",
                    i + 1,
                    violation.key,
                    violation.details
                ));
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AirQualityReading, AqiMeasurement, CityRecord};
    use chrono::Utc;

    fn merged(name: &str, population: f64, aqi: Option<f64>, category: Option<&str>) -> MergedRecord {
        let city = CityRecord::new(name, "India", 19.07, 72.87, Some(population))
            .with_iso_codes("IN", "IND");
        let reading = aqi.map(|aqi| {
            AirQualityReading::success(
                &city,
                AqiMeasurement {
                    aqi: Some(aqi),
                    category: category.map(str::to_string),
                    dominant_pollutant: Some("pm10".to_string()),
                },
                Utc::now(),
            )
        });
        MergedRecord::from_parts(&city, reading.as_ref())
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let records = vec![
            merged("Mumbai", 24_973_000.0, Some(45.0), Some("Moderate air quality")),
            merged("Pune", 7_000_000.0, Some(62.0), Some("Good air quality")),
            merged("Mumbai", 1.0, Some(10.0), Some("Poor air quality")),
        ];
        let mut log = CurationLog::new();

        let outcome = Validator::new().validate(records, &mut log);

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].city, "Mumbai");
        assert_eq!(outcome.records[0].population, Some(24_973_000.0));
        assert_eq!(outcome.records[1].city, "Pune");
        assert_eq!(outcome.report.duplicates_removed, 1);
        assert_eq!(outcome.report.duplicate_keys, vec![CityKey::new("Mumbai", "India")]);

        let step = log.steps_named("Validation - Duplicates").next().unwrap();
        assert_eq!(step.details, "Removed 1 duplicate records");
    }

    #[test]
    fn test_validation_is_idempotent() {
        let records = vec![
            merged("Delhi", 3.0, Some(150.0), Some("Unhealthy for Sensitive Groups")),
            merged("Delhi", 2.0, None, None),
            merged("Delhi", 1.0, None, None),
        ];
        let validator = Validator::new();
        let mut log = CurationLog::new();

        let first = validator.validate(records, &mut log);
        assert_eq!(first.report.duplicates_removed, 2);
        assert_eq!(first.report.duplicate_keys.len(), 1);

        let second = validator.validate(first.records.clone(), &mut log);
        assert_eq!(second.report.duplicates_removed, 0);
        assert_eq!(second.records, first.records);

        let last = log.steps_named("Validation - Duplicates").last().unwrap();
        assert_eq!(last.details, "No duplicates found");
    }

    #[test]
    fn test_completeness_and_null_fraction_sum_to_100() {
        let records = vec![
            merged("Chennai", 11_000_000.0, Some(55.0), Some("Moderate air quality")),
            merged("Kolkata", 15_000_000.0, None, None),
            merged("Jaipur", 4_000_000.0, None, None),
        ];
        let mut log = CurationLog::new();

        let outcome = Validator::new().validate(records, &mut log);
        let report = &outcome.report;

        assert_eq!(report.completeness.len(), MergedRecord::COLUMNS.len());
        assert_eq!(report.null_count("aqi"), Some(2));
        assert_eq!(report.null_count("city"), Some(0));

        let aqi = report.completeness.iter().find(|c| c.column == "aqi").unwrap();
        assert!((aqi.completeness_pct - 100.0 / 3.0).abs() < 1e-9);

        for column in &report.completeness {
            let fraction = 100.0 * column.null_count as f64 / report.total_records as f64;
            assert!((column.completeness_pct + fraction - 100.0).abs() < 1e-9);
            assert!((column.completeness_pct + column.null_pct() - 100.0).abs() < 1e-9);
        }

        let missing = log.steps_named("Validation - Missing Values").next().unwrap();
        assert!(missing.details.contains("'aqi': 2"));
        assert!(!missing.details.contains("'city'"));
    }

    #[test]
    fn test_range_checks_report_without_dropping() {
        let mut bad_coords = merged("Lucknow", 3_000_000.0, Some(40.0), Some("Good"));
        bad_coords.latitude = 95.0;
        let records = vec![
            bad_coords,
            merged("Patna", 2_000_000.0, Some(90.0), Some("Good air quality")),
            merged("Surat", 6_000_000.0, Some(612.0), Some("Beyond Index")),
            merged("Nagpur", 2_500_000.0, Some(72.0), Some("Good air quality")),
        ];
        let mut log = CurationLog::new();

        let outcome = Validator::new().validate(records, &mut log);

        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.report.invalid_coordinates, 1);
        assert_eq!(outcome.report.aqi_violations(), 2);

        let types: Vec<ViolationType> = outcome
            .report
            .violations
            .iter()
            .map(|v| v.violation_type)
            .collect();
        assert_eq!(
            types,
            vec![
                ViolationType::CoordinatesOutOfRange,
                ViolationType::AqiOutsideCategoryRange,
                ViolationType::AqiOutOfRange,
            ]
        );

        let summary = Validator::new().generate_summary(&outcome.report);
        assert!(summary.contains("Invalid Coordinates: 1"));
        assert!(summary.contains("AQI Range Issues: 2"));
    }

    #[test]
    fn test_empty_table_still_logs_every_step() {
        let mut log = CurationLog::new();

        let outcome = Validator::new().validate(Vec::new(), &mut log);

        assert!(outcome.records.is_empty());
        assert!(outcome
            .report
            .completeness
            .iter()
            .all(|c| c.completeness_pct == 100.0));
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_category_lookup_is_case_insensitive() {
        assert_eq!(category_range("good air quality"), Some((60.0, 79.0)));
        assert_eq!(category_range("Hazardous"), Some((301.0, 500.0)));
        assert_eq!(category_range("unknown"), None);
    }
}

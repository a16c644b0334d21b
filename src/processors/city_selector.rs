use crate::curation::CurationLog;
use crate::models::CityRecord;
use crate::utils::constants::DEFAULT_CITY_LIMIT;
use std::collections::HashMap;

/// Quality figures for the raw reference dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceAudit {
    pub total_cities: usize,
    /// Columns with at least one null, with their counts.
    pub missing_by_column: Vec<(&'static str, usize)>,
    /// Rows whose key occurs more than once (every occurrence counted).
    pub duplicate_rows: usize,
    pub population_coverage_pct: f64,
    /// Rows with missing or out-of-bounds coordinates.
    pub invalid_coordinates: usize,
}

/// Audits the reference dataset and picks the most populous cities.
pub struct CitySelector {
    limit: usize,
}

impl CitySelector {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn audit(&self, cities: &[CityRecord], log: &mut CurationLog) -> ReferenceAudit {
        log.log_step(
            "Data Load",
            format!("Loaded {} cities from reference dataset", cities.len()),
        );

        let null_counts = [
            ("population", cities.iter().filter(|c| c.population.is_none()).count()),
            ("iso2", cities.iter().filter(|c| c.iso2.is_none()).count()),
            ("iso3", cities.iter().filter(|c| c.iso3.is_none()).count()),
            ("latitude", cities.iter().filter(|c| c.latitude.is_nan()).count()),
            ("longitude", cities.iter().filter(|c| c.longitude.is_nan()).count()),
        ];
        let missing_by_column: Vec<(&'static str, usize)> =
            null_counts.into_iter().filter(|(_, n)| *n > 0).collect();
        log.log_step(
            "Validation - Missing Values",
            format!("{} columns have missing values", missing_by_column.len()),
        );

        let mut key_counts = HashMap::new();
        for city in cities {
            *key_counts.entry(city.key()).or_insert(0usize) += 1;
        }
        let duplicate_rows: usize = key_counts.values().filter(|n| **n > 1).sum();
        log.log_step(
            "Validation - Duplicates",
            format!("Found {} duplicate city-country combinations", duplicate_rows),
        );

        let with_population = cities.iter().filter(|c| c.population.is_some()).count();
        let population_coverage_pct = if cities.is_empty() {
            0.0
        } else {
            100.0 * with_population as f64 / cities.len() as f64
        };
        log.log_step(
            "Validation - Population Data",
            format!("{:.1}% of cities have population data", population_coverage_pct),
        );

        let invalid_coordinates = cities.iter().filter(|c| !c.has_valid_coordinates()).count();
        log.log_step(
            "Validation - Coordinates",
            format!("{} cities with invalid coordinates", invalid_coordinates),
        );

        ReferenceAudit {
            total_cities: cities.len(),
            missing_by_column,
            duplicate_rows,
            population_coverage_pct,
            invalid_coordinates,
        }
    }

    /// Top `limit` cities by population among rows with population and
    /// coordinates. Ties keep input order.
    pub fn select(&self, cities: &[CityRecord], log: &mut CurationLog) -> Vec<CityRecord> {
        let mut eligible: Vec<&CityRecord> = cities
            .iter()
            .filter(|c| c.population.is_some() && c.has_coordinates())
            .collect();

        eligible.sort_by(|a, b| {
            let pa = a.population.unwrap_or_default();
            let pb = b.population.unwrap_or_default();
            pb.total_cmp(&pa)
        });

        let selected: Vec<CityRecord> = eligible.into_iter().take(self.limit).cloned().collect();

        if let (Some(first), Some(last)) = (selected.first(), selected.last()) {
            tracing::info!(
                "Population range: {:.0} to {:.0}",
                last.population.unwrap_or_default(),
                first.population.unwrap_or_default()
            );
        }

        log.log_step(
            "Data Selection",
            format!("Selected top {} cities by population", selected.len()),
        );

        selected
    }
}

impl Default for CitySelector {
    fn default() -> Self {
        Self::new(DEFAULT_CITY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CityRecord> {
        vec![
            CityRecord::new("Cairo", "Egypt", 30.04, 31.24, Some(20_296_000.0)),
            CityRecord::new("Giza", "Egypt", 30.01, 31.21, None),
            CityRecord::new("Alexandria", "Egypt", 31.2, 29.92, Some(5_381_000.0)),
            CityRecord::new("Cairo", "Egypt", 30.05, 31.25, Some(10.0)),
            CityRecord::new("Lost", "Egypt", f64::NAN, 31.0, Some(90_000_000.0)),
            CityRecord::new("Luxor", "Egypt", 25.69, 32.64, Some(5_381_000.0)),
        ]
    }

    #[test]
    fn test_audit_counts() {
        let mut log = CurationLog::new();
        let audit = CitySelector::new(2).audit(&sample(), &mut log);

        assert_eq!(audit.total_cities, 6);
        assert_eq!(audit.duplicate_rows, 2);
        assert_eq!(audit.invalid_coordinates, 1);
        assert!((audit.population_coverage_pct - 500.0 / 6.0).abs() < 1e-9);
        assert!(audit.missing_by_column.contains(&("population", 1)));
        assert!(audit.missing_by_column.contains(&("latitude", 1)));
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_select_top_by_population() {
        let mut log = CurationLog::new();
        let selected = CitySelector::new(3).select(&sample(), &mut log);

        let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
        // "Lost" has no latitude and "Giza" no population; equal populations keep input order.
        assert_eq!(names, vec!["Cairo", "Alexandria", "Luxor"]);
        assert_eq!(
            log.steps_named("Data Selection").next().unwrap().details,
            "Selected top 3 cities by population"
        );
    }

    #[test]
    fn test_limit_larger_than_input() {
        let mut log = CurationLog::new();
        let selected = CitySelector::new(100).select(&sample(), &mut log);
        assert_eq!(selected.len(), 4);
    }
}

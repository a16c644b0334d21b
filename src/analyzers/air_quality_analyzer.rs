use crate::error::{ProcessingError, Result};
use crate::models::MergedRecord;
use crate::readers::ReadingReader;
use std::collections::BTreeMap;
use std::path::Path;

/// Descriptive statistics for one numeric column, nulls excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `NaN` with fewer than two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            f64::NAN
        };

        Some(Self {
            count,
            mean,
            std,
            min: values[0],
            q25: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q75: quantile(&values, 0.75),
            max: values[count - 1],
        })
    }

    fn row(&self, label: &str) -> String {
        format!(
            "{:<12} {:>6} {:>14.2} {:>14.2} {:>14.2} {:>14.2} {:>14.2} {:>14.2} {:>14.2}",
            label, self.count, self.mean, self.std, self.min, self.q25, self.median, self.q75, self.max
        )
    }
}

/// Linear interpolation between closest ranks over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Pearson correlation over paired values; `None` when undefined.
fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[derive(Debug, Clone)]
pub struct DatasetStatistics {
    pub total_records: usize,
    pub complete_records: usize,
    pub population: Option<ColumnStats>,
    pub aqi: Option<ColumnStats>,
    pub category_counts: BTreeMap<String, usize>,
    pub pollutant_counts: BTreeMap<String, usize>,
    pub population_aqi_correlation: Option<f64>,
}

impl DatasetStatistics {
    pub fn completeness_pct(&self) -> f64 {
        if self.total_records == 0 {
            return 100.0;
        }
        self.complete_records as f64 / self.total_records as f64 * 100.0
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Records: {} total", self.total_records),
            format!(
                "AQI coverage: {}/{} ({:.1}%)",
                self.complete_records,
                self.total_records,
                self.completeness_pct()
            ),
            String::new(),
            format!(
                "{:<12} {:>6} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
                "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
            ),
        ];

        for (label, stats) in [("population", &self.population), ("aqi", &self.aqi)] {
            match stats {
                Some(stats) => lines.push(stats.row(label)),
                None => lines.push(format!("{:<12} {:>6}", label, 0)),
            }
        }

        lines.push(String::new());
        lines.push("AQI categories:".to_string());
        for (category, count) in &self.category_counts {
            lines.push(format!("  - {}: {}", category, count));
        }

        lines.push("Dominant pollutants:".to_string());
        for (pollutant, count) in &self.pollutant_counts {
            lines.push(format!("  - {}: {}", pollutant, count));
        }

        lines.push(String::new());
        match self.population_aqi_correlation {
            Some(r) => lines.push(format!("Correlation population vs aqi: {:.3}", r)),
            None => lines.push("Correlation population vs aqi: undefined".to_string()),
        }

        lines.join("\n")
    }
}

/// Summarizes a final integrated table.
pub struct AirQualityAnalyzer;

impl AirQualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_csv(&self, path: &Path) -> Result<DatasetStatistics> {
        let records = ReadingReader::new().read_final_dataset(path)?;
        if records.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No records found in {}",
                path.display()
            )));
        }
        Ok(self.calculate_statistics(&records))
    }

    pub fn calculate_statistics(&self, records: &[MergedRecord]) -> DatasetStatistics {
        let populations: Vec<f64> = records.iter().filter_map(|r| r.population).collect();
        let aqis: Vec<f64> = records.iter().filter_map(|r| r.aqi).collect();
        let pairs: Vec<(f64, f64)> = records
            .iter()
            .filter_map(|r| Some((r.population?, r.aqi?)))
            .collect();

        let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut pollutant_counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            if let Some(category) = &record.aqi_category {
                *category_counts.entry(category.clone()).or_insert(0) += 1;
            }
            if let Some(pollutant) = &record.dominant_pollutant {
                *pollutant_counts.entry(pollutant.clone()).or_insert(0) += 1;
            }
        }

        DatasetStatistics {
            total_records: records.len(),
            complete_records: records.iter().filter(|r| r.is_complete()).count(),
            population: ColumnStats::from_values(populations),
            aqi: ColumnStats::from_values(aqis),
            category_counts,
            pollutant_counts,
            population_aqi_correlation: pearson(&pairs),
        }
    }
}

impl Default for AirQualityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AirQualityReading, AqiMeasurement, CityRecord};
    use chrono::Utc;

    fn record(name: &str, population: f64, aqi: Option<f64>, pollutant: &str) -> MergedRecord {
        let city = CityRecord::new(name, "Chile", -33.45, -70.66, Some(population));
        let reading = aqi.map(|aqi| {
            AirQualityReading::success(
                &city,
                AqiMeasurement {
                    aqi: Some(aqi),
                    category: Some("Good air quality".to_string()),
                    dominant_pollutant: Some(pollutant.to_string()),
                },
                Utc::now(),
            )
        });
        MergedRecord::from_parts(&city, reading.as_ref())
    }

    #[test]
    fn test_quantiles_interpolate() {
        let stats = ColumnStats::from_values(vec![4.0, 1.0, 3.0, 2.0]).unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.q25 - 1.75).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.q75 - 3.25).abs() < 1e-12);
        assert!((stats.std - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_has_undefined_std() {
        let stats = ColumnStats::from_values(vec![7.0]).unwrap();
        assert!(stats.std.is_nan());
        assert_eq!(stats.median, 7.0);
        assert!(ColumnStats::from_values(vec![]).is_none());
    }

    #[test]
    fn test_statistics_skip_missing_aqi() {
        let records = vec![
            record("Santiago", 100.0, Some(10.0), "pm25"),
            record("Valparaiso", 200.0, Some(20.0), "pm25"),
            record("Concepcion", 300.0, Some(30.0), "o3"),
            record("Antofagasta", 400.0, None, "pm25"),
        ];

        let stats = AirQualityAnalyzer::new().calculate_statistics(&records);

        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.complete_records, 3);
        assert_eq!(stats.aqi.as_ref().unwrap().count, 3);
        assert_eq!(stats.population.as_ref().unwrap().count, 4);
        assert_eq!(stats.pollutant_counts.get("pm25"), Some(&2));
        assert_eq!(stats.pollutant_counts.get("o3"), Some(&1));
        assert_eq!(stats.category_counts.get("Good air quality"), Some(&3));

        let r = stats.population_aqi_correlation.unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        assert!(stats.summary().contains("AQI coverage: 3/4 (75.0%)"));
    }

    #[test]
    fn test_correlation_undefined_for_constant_column() {
        let records = vec![
            record("Santiago", 100.0, Some(10.0), "pm25"),
            record("Valparaiso", 200.0, Some(10.0), "pm25"),
        ];

        let stats = AirQualityAnalyzer::new().calculate_statistics(&records);
        assert_eq!(stats.population_aqi_correlation, None);
    }
}

use crate::curation::CurationLog;
use crate::fetch::{FetchError, LookupResponse, RateLimitedFetcher};
use crate::models::{AirQualityReading, AqiMeasurement, CityRecord, CollectionError, ErrorKind};
use crate::utils::constants::DEFAULT_INTER_REQUEST_DELAY_MS;
use crate::utils::progress::ProgressReporter;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Cities between progress lines in the log.
const REPORT_EVERY: usize = 50;

/// Everything produced by one collection run.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    /// One reading per input city, in input order.
    pub readings: Vec<AirQualityReading>,
    pub errors: Vec<CollectionError>,
    pub duration: Duration,
}

impl CollectionResult {
    pub fn success_count(&self) -> usize {
        self.readings.iter().filter(|r| r.is_success()).count()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn error_breakdown(&self) -> BTreeMap<ErrorKind, usize> {
        let mut breakdown = BTreeMap::new();
        for error in &self.errors {
            *breakdown.entry(error.error_type).or_insert(0) += 1;
        }
        breakdown
    }
}

/// Drives the fetcher over an ordered city list, one lookup per city.
///
/// A fixed courtesy delay follows every lookup regardless of outcome. No
/// failure ever stops the run.
pub struct BulkCollector {
    fetcher: RateLimitedFetcher,
    inter_request_delay: Duration,
}

impl BulkCollector {
    pub fn new(fetcher: RateLimitedFetcher) -> Self {
        Self {
            fetcher,
            inter_request_delay: Duration::from_millis(DEFAULT_INTER_REQUEST_DELAY_MS),
        }
    }

    pub fn with_inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Collect readings for every city.
    pub async fn collect(
        &self,
        cities: &[CityRecord],
        log: &mut CurationLog,
        progress: Option<&ProgressReporter>,
    ) -> CollectionResult {
        let started = Instant::now();
        let sleeper = self.fetcher.sleeper();
        let mut readings = Vec::with_capacity(cities.len());
        let mut errors = Vec::new();

        log.log_step(
            "API Collection Start",
            format!("Beginning collection for {} cities", cities.len()),
        );

        for (index, city) in cities.iter().enumerate() {
            if let Some(progress) = progress {
                progress.set_message(&city.key().to_string());
            }

            match self.lookup(city).await {
                Ok(measurement) => {
                    tracing::debug!(city = %city.key(), aqi = ?measurement.aqi, "Collected reading");
                    readings.push(AirQualityReading::success(city, measurement, Utc::now()));
                }
                Err(error) => {
                    tracing::warn!(city = %city.key(), kind = %error.kind(), "Lookup failed: {}", error);
                    let now = Utc::now();
                    errors.push(CollectionError::new(city, error.kind(), error.detail(), now));
                    readings.push(AirQualityReading::failed(city, now));
                }
            }

            if let Some(progress) = progress {
                progress.increment(1);
            }
            if (index + 1) % REPORT_EVERY == 0 {
                tracing::info!("{}/{}", index + 1, cities.len());
            }

            sleeper.sleep(self.inter_request_delay).await;
        }

        let duration = started.elapsed();
        log.log_step(
            "API Collection Complete",
            format!(
                "Collected {} records in {:.1}s, {} errors",
                readings.len(),
                duration.as_secs_f64(),
                errors.len()
            ),
        );

        CollectionResult {
            readings,
            errors,
            duration,
        }
    }

    async fn lookup(&self, city: &CityRecord) -> Result<AqiMeasurement, FetchError> {
        let body = self.fetcher.fetch(city.latitude, city.longitude).await?;
        let response = LookupResponse::parse(&body).map_err(|e| FetchError::Exception {
            message: format!("invalid response body: {}", e),
        })?;
        Ok(response.measurement())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fetcher::tests::{RecordingSleeper, ScriptedClient};
    use crate::fetch::{lookup_endpoint, HttpError, HttpResponse};
    use crate::models::ReadingStatus;
    use std::sync::Arc;

    const AQI_BODY: &str = r#"{"indexes":[{"aqi":64,"category":"Good air quality","dominantPollutant":"pm25"}]}"#;

    fn cities(n: usize) -> Vec<CityRecord> {
        (0..n)
            .map(|i| {
                CityRecord::new(
                    format!("City {}", i),
                    "Testland",
                    10.0 + i as f64,
                    20.0 + i as f64,
                    Some(1_000_000.0 - i as f64),
                )
            })
            .collect()
    }

    fn collector(
        script: Vec<Result<HttpResponse, HttpError>>,
    ) -> (BulkCollector, Arc<RecordingSleeper>) {
        let client = Arc::new(ScriptedClient::new(script));
        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = RateLimitedFetcher::new(client, lookup_endpoint("https://host/v1/"), "k")
            .with_sleeper(sleeper.clone());
        (BulkCollector::new(fetcher), sleeper)
    }

    #[tokio::test]
    async fn test_all_success() {
        let (collector, sleeper) = collector(vec![
            Ok(HttpResponse::ok_json(AQI_BODY)),
            Ok(HttpResponse::ok_json(AQI_BODY)),
            Ok(HttpResponse::ok_json(AQI_BODY)),
        ]);
        let mut log = CurationLog::new();

        let result = collector.collect(&cities(3), &mut log, None).await;

        assert_eq!(result.readings.len(), 3);
        assert_eq!(result.success_count(), 3);
        assert_eq!(result.error_count(), 0);
        assert!(result
            .readings
            .iter()
            .all(|r| r.aqi == Some(64.0) && r.dominant_pollutant.as_deref() == Some("pm25")));

        // Courtesy delay after every city.
        assert_eq!(sleeper.recorded(), vec![Duration::from_millis(250); 3]);

        let complete = log.steps_named("API Collection Complete").next().unwrap();
        assert!(complete.details.ends_with(", 0 errors"));
        assert_eq!(log.steps_named("API Collection Start").count(), 1);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_run() {
        let (collector, _) = collector(vec![
            Ok(HttpResponse::new(500, "")),
            Err(HttpError::Transport("reset".to_string())),
            Ok(HttpResponse::ok_json("not json")),
            Ok(HttpResponse::ok_json("{}")),
        ]);
        let mut log = CurationLog::new();
        let input = cities(4);

        let result = collector.collect(&input, &mut log, None).await;

        assert_eq!(result.readings.len(), 4);
        assert_eq!(result.error_count(), 3);

        let names: Vec<&str> = result.readings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["City 0", "City 1", "City 2", "City 3"]);

        assert_eq!(result.errors[0].error_type, ErrorKind::HttpError);
        assert_eq!(result.errors[0].detail.as_deref(), Some("500"));
        assert_eq!(result.errors[1].error_type, ErrorKind::Exception);
        assert_eq!(result.errors[2].error_type, ErrorKind::Exception);
        assert!(result.errors[2]
            .detail
            .as_deref()
            .unwrap()
            .starts_with("invalid response body"));

        assert_eq!(result.readings[2].status, ReadingStatus::Error);
        assert_eq!(result.readings[2].aqi, None);

        // A 200 without indexes is a success with null measurements.
        assert_eq!(result.readings[3].status, ReadingStatus::Success);
        assert_eq!(result.readings[3].aqi, None);

        let breakdown = result.error_breakdown();
        assert_eq!(breakdown.get(&ErrorKind::Exception), Some(&2));
        assert_eq!(breakdown.get(&ErrorKind::HttpError), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (collector, sleeper) = collector(vec![]);
        let mut log = CurationLog::new();

        let result = collector.collect(&[], &mut log, None).await;

        assert!(result.readings.is_empty());
        assert!(result.errors.is_empty());
        assert!(sleeper.recorded().is_empty());
        assert_eq!(log.len(), 2);
    }
}

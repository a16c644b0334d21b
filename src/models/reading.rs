use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CityKey, CityRecord};
use crate::utils::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Success,
    Error,
}

/// Error taxonomy recorded for an entity whose lookup did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RateLimitedExhausted,
    HttpError,
    Exception,
    MaxRetries,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimitedExhausted => "rate_limited_exhausted",
            ErrorKind::HttpError => "http_error",
            ErrorKind::Exception => "exception",
            ErrorKind::MaxRetries => "max_retries",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurement fields extracted from the first index of a lookup response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AqiMeasurement {
    pub aqi: Option<f64>,
    pub category: Option<String>,
    pub dominant_pollutant: Option<String>,
}

/// One collected row of the raw readings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    #[serde(rename = "city")]
    pub name: String,
    pub country: String,
    #[serde(alias = "lat", deserialize_with = "lenient::f64_or_nan")]
    pub latitude: f64,
    #[serde(alias = "lon", deserialize_with = "lenient::f64_or_nan")]
    pub longitude: f64,
    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub aqi: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub aqi_category: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub dominant_pollutant: Option<String>,
    pub collection_timestamp: DateTime<Utc>,
    pub status: ReadingStatus,
}

impl AirQualityReading {
    pub fn success(
        city: &CityRecord,
        measurement: AqiMeasurement,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: city.name.clone(),
            country: city.country.clone(),
            latitude: city.latitude,
            longitude: city.longitude,
            aqi: measurement.aqi,
            aqi_category: measurement.category,
            dominant_pollutant: measurement.dominant_pollutant,
            collection_timestamp: collected_at,
            status: ReadingStatus::Success,
        }
    }

    /// Placeholder row for an entity whose lookup failed; all measurements are null.
    pub fn failed(city: &CityRecord, collected_at: DateTime<Utc>) -> Self {
        Self {
            status: ReadingStatus::Error,
            ..Self::success(city, AqiMeasurement::default(), collected_at)
        }
    }

    pub fn key(&self) -> CityKey {
        CityKey::new(self.name.clone(), self.country.clone())
    }

    pub fn is_success(&self) -> bool {
        self.status == ReadingStatus::Success
    }
}

/// Audit row for a failed lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionError {
    #[serde(rename = "city")]
    pub name: String,
    pub country: String,
    pub error_type: ErrorKind,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CollectionError {
    pub fn new(
        city: &CityRecord,
        error_type: ErrorKind,
        detail: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name: city.name.clone(),
            country: city.country.clone(),
            error_type,
            detail,
            timestamp,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{AirQualityReading, CityKey, CityRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityFlag {
    Complete,
    MissingAqi,
}

impl DataQualityFlag {
    pub fn from_aqi(aqi: Option<f64>) -> Self {
        match aqi {
            Some(_) => DataQualityFlag::Complete,
            None => DataQualityFlag::MissingAqi,
        }
    }
}

/// Row of the final integrated table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MergedRecord {
    pub city: String,
    pub country: String,
    pub iso2: Option<String>,
    pub iso3: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub population: Option<f64>,
    pub aqi: Option<f64>,
    pub aqi_category: Option<String>,
    pub dominant_pollutant: Option<String>,
    pub data_quality_flag: DataQualityFlag,
    pub collection_timestamp: Option<DateTime<Utc>>,
}

impl MergedRecord {
    pub const COLUMNS: [&'static str; 12] = [
        "city",
        "country",
        "iso2",
        "iso3",
        "latitude",
        "longitude",
        "population",
        "aqi",
        "aqi_category",
        "dominant_pollutant",
        "data_quality_flag",
        "collection_timestamp",
    ];

    /// Left-join row: reference fields plus whatever the matching reading carries.
    pub fn from_parts(city: &CityRecord, reading: Option<&AirQualityReading>) -> Self {
        let aqi = reading.and_then(|r| r.aqi);

        Self {
            city: city.name.clone(),
            country: city.country.clone(),
            iso2: city.iso2.clone(),
            iso3: city.iso3.clone(),
            latitude: city.latitude,
            longitude: city.longitude,
            population: city.population,
            aqi,
            aqi_category: reading.and_then(|r| r.aqi_category.clone()),
            dominant_pollutant: reading.and_then(|r| r.dominant_pollutant.clone()),
            data_quality_flag: DataQualityFlag::from_aqi(aqi),
            collection_timestamp: reading.map(|r| r.collection_timestamp),
        }
    }

    pub fn key(&self) -> CityKey {
        CityKey::new(self.city.clone(), self.country.clone())
    }

    /// Null mask aligned with [`MergedRecord::COLUMNS`]. `NaN` coordinates count as null.
    pub fn null_mask(&self) -> [bool; 12] {
        [
            self.city.is_empty(),
            self.country.is_empty(),
            self.iso2.is_none(),
            self.iso3.is_none(),
            self.latitude.is_nan(),
            self.longitude.is_nan(),
            self.population.is_none(),
            self.aqi.is_none(),
            self.aqi_category.is_none(),
            self.dominant_pollutant.is_none(),
            false,
            self.collection_timestamp.is_none(),
        ]
    }

    /// Coordinates that are present but outside WGS84 bounds.
    pub fn has_out_of_range_coordinates(&self) -> bool {
        self.validate().is_err()
    }

    pub fn is_complete(&self) -> bool {
        self.data_quality_flag == DataQualityFlag::Complete
    }
}

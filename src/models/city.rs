use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::lenient;

/// Composite key shared by every table in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityKey {
    pub name: String,
    pub country: String,
}

impl CityKey {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }
}

impl std::fmt::Display for CityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.name, self.country)
    }
}

/// One row of the reference population dataset.
///
/// Column names follow the SimpleMaps world cities export (`city`, `lat`,
/// `lng`); the normalized names are accepted as well.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CityRecord {
    #[serde(rename = "city")]
    pub name: String,

    pub country: String,

    #[serde(alias = "lat", deserialize_with = "lenient::f64_or_nan")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[serde(alias = "lng", deserialize_with = "lenient::f64_or_nan")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[serde(default, deserialize_with = "lenient::optional_f64")]
    pub population: Option<f64>,

    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub iso2: Option<String>,

    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub iso3: Option<String>,
}

impl CityRecord {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        latitude: f64,
        longitude: f64,
        population: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            latitude,
            longitude,
            population,
            iso2: None,
            iso3: None,
        }
    }

    pub fn with_iso_codes(mut self, iso2: impl Into<String>, iso3: impl Into<String>) -> Self {
        self.iso2 = Some(iso2.into());
        self.iso3 = Some(iso3.into());
        self
    }

    pub fn key(&self) -> CityKey {
        CityKey::new(self.name.clone(), self.country.clone())
    }

    pub fn has_coordinates(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }

    /// True when both coordinates are present and inside WGS84 bounds.
    pub fn has_valid_coordinates(&self) -> bool {
        self.has_coordinates() && self.validate().is_ok()
    }
}

use serde::Deserialize;

use crate::models::AqiMeasurement;

/// Expected shape of a current-conditions lookup response.
///
/// Every field is optional; absent fields become nulls rather than errors.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub indexes: Vec<AqiIndex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AqiIndex {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub aqi: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub dominant_pollutant: Option<String>,
}

impl LookupResponse {
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Measurement from the first index, or all-null when there is none.
    pub fn measurement(&self) -> AqiMeasurement {
        self.indexes
            .first()
            .map(|index| AqiMeasurement {
                aqi: index.aqi,
                category: index.category.clone(),
                dominant_pollutant: index.dominant_pollutant.clone(),
            })
            .unwrap_or_default()
    }
}

//! Lenient field deserializers for loosely typed CSV input.
//!
//! Numeric columns are coerced: a blank or unparseable cell becomes a null
//! instead of failing the whole file.

use serde::{Deserialize, Deserializer};

fn parse_number(raw: Option<String>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| !value.is_nan())
}

pub fn optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(parse_number(raw))
}

/// Required numeric column; a missing value is carried as `NaN`.
pub fn f64_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(parse_number(raw).unwrap_or(f64::NAN))
}

pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

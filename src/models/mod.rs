pub mod city;
pub mod curation;
pub mod merged;
pub mod reading;

pub use city::{CityKey, CityRecord};
pub use curation::CurationLogEntry;
pub use merged::{DataQualityFlag, MergedRecord};
pub use reading::{AirQualityReading, AqiMeasurement, CollectionError, ErrorKind, ReadingStatus};

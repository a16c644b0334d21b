use crate::error::{ProcessingError, Result};
use crate::models::CityRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 2] = ["city", "country"];

/// Reads the reference population table.
/// Cells are trimmed before parsing.
pub struct CityReader;

impl CityReader {
    pub fn new() -> Self {
        Self
    }

    /// Read every city row from a CSV file with a header line.
    pub fn read_cities(&self, path: &Path) -> Result<Vec<CityRecord>> {
        let file = File::open(path)?;
        let cities = self.read_from(file)?;
        tracing::debug!("Read {} cities from {}", cities.len(), path.display());
        Ok(cities)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<Vec<CityRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ProcessingError::MissingData(format!(
                    "Reference dataset has no '{}' column",
                    column
                )));
            }
        }

        let mut cities = Vec::new();
        for row in csv_reader.deserialize() {
            let city: CityRecord = row?;
            cities.push(city);
        }

        Ok(cities)
    }
}

impl Default for CityReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_simplemaps_layout() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(
            temp_file,
            "city,city_ascii,lat,lng,country,iso2,iso3,admin_name,capital,population,id"
        )?;
        writeln!(
            temp_file,
            "Tokyo,Tokyo,35.6897,139.6922,Japan,JP,JPN,Tokyo,primary,37732000,1392685764"
        )?;
        writeln!(
            temp_file,
            " Jakarta ,Jakarta,-6.1750,106.8275,Indonesia,ID,IDN,Jakarta,primary,,1360771077"
        )?;
        writeln!(
            temp_file,
            "Atlantis,Atlantis,n/a,10.0,Nowhere,,,,,unknown,1"
        )?;

        let cities = CityReader::new().read_cities(temp_file.path())?;

        assert_eq!(cities.len(), 3);
        assert_eq!(cities[0].name, "Tokyo");
        assert_eq!(cities[0].population, Some(37_732_000.0));
        assert_eq!(cities[0].iso3.as_deref(), Some("JPN"));
        assert_eq!(cities[1].name, "Jakarta");
        assert_eq!(cities[1].population, None);
        assert!(cities[2].latitude.is_nan());
        assert_eq!(cities[2].iso2, None);
        assert_eq!(cities[2].population, None);

        Ok(())
    }

    #[test]
    fn test_normalized_column_names() -> Result<()> {
        let data = "city,country,latitude,longitude,population\nLima,Peru,-12.06,-77.04,8852000\n";
        let cities = CityReader::new().read_from(data.as_bytes())?;

        assert_eq!(cities.len(), 1);
        assert!((cities[0].longitude - -77.04).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_missing_required_column() {
        let data = "name,lat,lng\nLima,-12.06,-77.04\n";
        let result = CityReader::new().read_from(data.as_bytes());
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }
}

use crate::error::{ProcessingError, Result};
use crate::models::MergedRecord;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Columnar export of the final integrated table.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write merged records to a Parquet file. An empty table still
    /// produces a file carrying the schema.
    pub fn write_records(&self, records: &[MergedRecord], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        if !records.is_empty() {
            let batch = self.records_to_batch(records, schema)?;
            writer.write(&batch)?;
        }
        writer.close()?;

        tracing::info!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        let fields = vec![
            Field::new("city", DataType::Utf8, false),
            Field::new("country", DataType::Utf8, false),
            Field::new("iso2", DataType::Utf8, true),
            Field::new("iso3", DataType::Utf8, true),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
            Field::new("population", DataType::Float64, true),
            Field::new("aqi", DataType::Float64, true),
            Field::new("aqi_category", DataType::Utf8, true),
            Field::new("dominant_pollutant", DataType::Utf8, true),
            Field::new("data_quality_flag", DataType::Utf8, false),
            Field::new(
                "collection_timestamp",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                true,
            ),
        ];

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(&self, records: &[MergedRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        // NaN coordinates are written as nulls.
        let coordinate = |value: f64| if value.is_nan() { None } else { Some(value) };

        let cities: Vec<&str> = records.iter().map(|r| r.city.as_str()).collect();
        let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
        let iso2: Vec<Option<&str>> = records.iter().map(|r| r.iso2.as_deref()).collect();
        let iso3: Vec<Option<&str>> = records.iter().map(|r| r.iso3.as_deref()).collect();
        let latitudes: Vec<Option<f64>> = records.iter().map(|r| coordinate(r.latitude)).collect();
        let longitudes: Vec<Option<f64>> = records.iter().map(|r| coordinate(r.longitude)).collect();
        let populations: Vec<Option<f64>> = records.iter().map(|r| r.population).collect();
        let aqis: Vec<Option<f64>> = records.iter().map(|r| r.aqi).collect();
        let categories: Vec<Option<&str>> =
            records.iter().map(|r| r.aqi_category.as_deref()).collect();
        let pollutants: Vec<Option<&str>> =
            records.iter().map(|r| r.dominant_pollutant.as_deref()).collect();
        let flags: Vec<&str> = records
            .iter()
            .map(|r| if r.is_complete() { "complete" } else { "missing_aqi" })
            .collect();
        let timestamps: Vec<Option<i64>> = records
            .iter()
            .map(|r| r.collection_timestamp.map(|t| t.timestamp_millis()))
            .collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(cities)),
                Arc::new(StringArray::from(countries)),
                Arc::new(StringArray::from(iso2)),
                Arc::new(StringArray::from(iso3)),
                Arc::new(Float64Array::from(latitudes)),
                Arc::new(Float64Array::from(longitudes)),
                Arc::new(Float64Array::from(populations)),
                Arc::new(Float64Array::from(aqis)),
                Arc::new(StringArray::from(categories)),
                Arc::new(StringArray::from(pollutants)),
                Arc::new(StringArray::from(flags)),
                Arc::new(TimestampMillisecondArray::from(timestamps).with_timezone("UTC")),
            ],
        )?;

        Ok(batch)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AirQualityReading, AqiMeasurement, CityRecord};
    use chrono::Utc;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::NamedTempFile;

    fn records() -> Vec<MergedRecord> {
        let karachi = CityRecord::new("Karachi", "Pakistan", 24.86, 67.01, Some(16_459_000.0))
            .with_iso_codes("PK", "PAK");
        let lahore = CityRecord::new("Lahore", "Pakistan", 31.55, 74.34, Some(13_095_000.0));
        let reading = AirQualityReading::success(
            &karachi,
            AqiMeasurement {
                aqi: Some(88.0),
                category: Some("Moderate".to_string()),
                dominant_pollutant: Some("pm10".to_string()),
            },
            Utc::now(),
        );

        vec![
            MergedRecord::from_parts(&karachi, Some(&reading)),
            MergedRecord::from_parts(&lahore, None),
        ]
    }

    #[test]
    fn test_write_empty_records() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_records(&[], temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 0);
        Ok(())
    }

    #[test]
    fn test_write_preserves_nulls() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_records(&records(), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 2);
        assert!(info.summary().contains("Total rows: 2"));

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(temp_file.path())?)?
            .build()?;
        let batch = reader.into_iter().next().unwrap()?;
        let schema = batch.schema();
        let aqi_index = schema.index_of("aqi")?;
        let iso2_index = schema.index_of("iso2")?;

        assert_eq!(batch.column(aqi_index).null_count(), 1);
        assert_eq!(batch.column(iso2_index).null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_records(&records(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-max").is_err());
        Ok(())
    }
}

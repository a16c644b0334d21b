/// Air quality API
pub const DEFAULT_BASE_URL: &str = "https://airquality.googleapis.com/v1/";
pub const LOOKUP_PATH: &str = "currentConditions:lookup";
pub const HTTP_OK: u16 = 200;
pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Collection defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: f64 = 2.0;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_INTER_REQUEST_DELAY_MS: u64 = 250;
pub const DEFAULT_CITY_LIMIT: usize = 500;
pub const MAX_BACKOFF_SECS: u64 = 300;
pub const MAX_ATTEMPTS_LIMIT: u32 = 20;
pub const MAX_BACKOFF_BASE: f64 = 10.0;

/// File names
pub const DEFAULT_DATA_DIR: &str = "data";
pub const REFERENCE_FILE: &str = "raw_top_cities.csv";
pub const FINAL_DATASET_FILE: &str = "integrated_cities_air_quality_final.csv";
pub const RAW_READINGS_PREFIX: &str = "raw_air_quality";
pub const COLLECTION_ERRORS_PREFIX: &str = "collection_errors";
pub const CURATION_LOG_PREFIX: &str = "curation_log";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// AQI bounds used when the category is not recognised
pub const MIN_VALID_AQI: f64 = 0.0;
pub const MAX_VALID_AQI: f64 = 500.0;

/// Parquet
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

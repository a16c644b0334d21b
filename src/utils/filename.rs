use crate::error::{ProcessingError, Result};
use crate::utils::constants::TIMESTAMP_FORMAT;
use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};

/// `{dir}/{prefix}_{YYYYMMDD_HHMMSS}.csv` for the instant `at`.
pub fn timestamped_csv_path<Tz: TimeZone>(dir: &Path, prefix: &str, at: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let filename = format!("{}_{}.csv", prefix, at.format(TIMESTAMP_FORMAT));
    dir.join(filename)
}

/// Most recently modified `{prefix}_*.csv` in `dir`.
pub fn find_latest_csv(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let wanted = format!("{}_", prefix);
    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(&wanted) && n.ends_with(".csv"))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        let modified = std::fs::metadata(&path)?.modified()?;
        let newer = latest
            .as_ref()
            .map_or(true, |(current, _)| modified >= *current);
        if newer {
            latest = Some((modified, path));
        }
    }

    latest.map(|(_, path)| path).ok_or_else(|| {
        ProcessingError::MissingData(format!(
            "No {}_*.csv file found in {}",
            prefix,
            dir.display()
        ))
    })
}

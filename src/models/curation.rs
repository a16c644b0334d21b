use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit entry. Entries are immutable once appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub step: String,
    pub details: String,
}

//! Append-only audit trail of pipeline steps.
//!
//! A `CurationLog` is created once per run, passed by `&mut` into each stage
//! and exported explicitly at the end. Nothing here is global.

use crate::error::Result;
use crate::models::CurationLogEntry;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CurationLog {
    entries: Vec<CurationLogEntry>,
}

impl CurationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped step.
    pub fn log_step(&mut self, step: impl Into<String>, details: impl Into<String>) {
        self.log_step_at(Utc::now(), step, details);
    }

    pub fn log_step_at(
        &mut self,
        timestamp: DateTime<Utc>,
        step: impl Into<String>,
        details: impl Into<String>,
    ) {
        let entry = CurationLogEntry {
            timestamp,
            step: step.into(),
            details: details.into(),
        };

        tracing::info!(step = %entry.step, "{}", entry.details);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CurationLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for a given step name, in insertion order.
    pub fn steps_named<'a>(&'a self, step: &'a str) -> impl Iterator<Item = &'a CurationLogEntry> {
        self.entries.iter().filter(move |e| e.step == step)
    }

    /// Serialize the full ordered log as CSV (`timestamp,step,details`).
    pub fn export_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for entry in &self.entries {
            csv_writer.serialize(entry)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.export_to_writer(file)?;
        tracing::info!(
            "Curation log saved: {} ({} steps)",
            path.display(),
            self.entries.len()
        );
        Ok(())
    }
}

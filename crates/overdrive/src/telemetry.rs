//! Periodic metrics rows for offline analysis.
//!
//! One CSV row per reporting period: timestamp, smoothed frame time and
//! the budgets in effect. The file is opened in append mode so a session
//! continues the previous one; the header is only written to an empty
//! file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::budget::BudgetMb;
use crate::error::Result;

const HEADER: [&str; 7] = [
    "time",
    "ema_ms",
    "exterior_texture_mb",
    "interior_geometry_mb",
    "interior_texture_mb",
    "interior_water_mb",
    "actor_memory_mb",
];

/// Appends metrics rows to a CSV sink.
#[derive(Debug)]
pub struct Telemetry<W: Write> {
    writer: csv::Writer<W>,
}

impl Telemetry<File> {
    /// Opens (or creates) the metrics file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Fails when the file or its directory cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        Self::from_writer(file, fresh)
    }
}

impl<W: Write> Telemetry<W> {
    /// Wraps an arbitrary sink, writing the header when `fresh` is set.
    ///
    /// # Errors
    ///
    /// Fails when the header cannot be written.
    pub fn from_writer(writer: W, fresh: bool) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        if fresh {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(Self { writer })
    }

    /// Appends one row and flushes it, so rows survive a crash of the host
    /// process.
    ///
    /// # Errors
    ///
    /// Fails when the row cannot be written.
    pub fn record(&mut self, at: DateTime<Local>, ema_ms: f64, budget: BudgetMb) -> Result<()> {
        self.writer.write_record([
            at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            format!("{ema_ms:.2}"),
            budget.exterior_texture.to_string(),
            budget.interior_geometry.to_string(),
            budget.interior_texture.to_string(),
            budget.interior_water.to_string(),
            budget.actor_memory.to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

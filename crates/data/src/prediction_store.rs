//! Durable, append-mostly log of prediction records.
//!
//! Records live one per line in a JSONL file. New records are appended;
//! resolving a record loads the whole log, mutates the matching entry and
//! rewrites the file, so every update costs O(n) in the size of the log.
//!
//! The store is safe to share between threads of one process: writers are
//! serialized behind a lock and readers never observe a half-written file
//! because rewrites go through a temporary file and a rename. Separate
//! processes writing the same log are not coordinated.

use chrono::{DateTime, Duration, Utc};
use forecast_core::{MarketOutcome, PredictionRecord};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::persisted::PersistedPrediction;

/// JSONL-backed prediction log.
#[derive(Debug)]
pub struct PredictionStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl PredictionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record.
    ///
    /// A pending record is refused (returns `false`) when the same market
    /// already has a pending record in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or written.
    pub fn append(&self, record: &PredictionRecord) -> StoreResult<bool> {
        let _guard = self.lock.write();

        if !record.is_resolved() {
            let existing = self.read_records()?;
            if existing
                .iter()
                .any(|r| r.market_id == record.market_id && !r.is_resolved())
            {
                warn!(
                    market_id = %record.market_id,
                    "Market already has a pending prediction, not recording another"
                );
                return Ok(false);
            }
        }

        self.ensure_parent()?;
        let line = serde_json::to_string(&PersistedPrediction::from_record(record))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        info!(
            market_id = %record.market_id,
            position = %record.recommended_position,
            probability = record.predicted_probability,
            model_version = %record.model_version,
            resolved = record.is_resolved(),
            "Recorded prediction"
        );
        Ok(true)
    }

    /// Loads every record in append order.
    ///
    /// Lines that fail to parse are skipped with a warning. A missing log
    /// is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unreadable`] if the log exists but cannot be opened or read.
    pub fn load_all(&self) -> StoreResult<Vec<PredictionRecord>> {
        let _guard = self.lock.read();
        self.read_records()
    }

    /// Atomically replaces the whole log with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement file cannot be written or renamed.
    pub fn save_all(&self, records: &[PredictionRecord]) -> StoreResult<()> {
        let _guard = self.lock.write();
        self.write_records(records)
    }

    /// Resolves the first pending record for `market_id`.
    ///
    /// Returns `false` when the market has no pending record, which makes
    /// repeated resolution attempts harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or rewritten.
    pub fn update_outcome(
        &self,
        market_id: &str,
        outcome: MarketOutcome,
        resolved_at: DateTime<Utc>,
        final_price: Option<f64>,
    ) -> StoreResult<bool> {
        let _guard = self.lock.write();
        let mut records = self.read_records()?;

        let Some(record) = records
            .iter_mut()
            .find(|r| r.market_id == market_id && !r.is_resolved())
        else {
            warn!(market_id, "No pending prediction found for market");
            return Ok(false);
        };

        record.resolve(outcome, resolved_at, final_price);
        info!(
            market_id,
            outcome = %outcome,
            correct = ?record.was_correct(),
            brier = ?record.score().map(|s| s.brier_score),
            "Updated prediction outcome"
        );

        self.write_records(&records)?;
        Ok(true)
    }

    /// Records whose prediction was made within the last `days` days.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn records_since(&self, days: i64) -> StoreResult<Vec<PredictionRecord>> {
        let cutoff = Utc::now() - Duration::days(days);
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|r| r.prediction_timestamp > cutoff)
            .collect())
    }

    /// Records that have not been resolved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn pending(&self) -> StoreResult<Vec<PredictionRecord>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|r| !r.is_resolved())
            .collect())
    }

    /// Recomputes every derived field from the stored inputs and rewrites the log.
    ///
    /// Returns the number of resolved records that were rescored.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or rewritten.
    pub fn rescore_all(&self) -> StoreResult<usize> {
        let _guard = self.lock.write();
        let mut records = self.read_records()?;

        let mut rescored = 0;
        for record in records.iter_mut().filter(|r| r.is_resolved()) {
            record.rescore();
            rescored += 1;
        }

        self.write_records(&records)?;
        info!(rescored, total = records.len(), "Re-derived prediction scores");
        Ok(rescored)
    }

    fn read_records(&self) -> StoreResult<Vec<PredictionRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No prediction log yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Unreadable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // raw bytes: a line that is not UTF-8 is skipped like any other bad line
        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = match line {
                Ok(line) => line,
                // opening a directory succeeds on unix; the first read is what fails
                Err(source) if index == 0 => {
                    return Err(StoreError::Unreadable {
                        path: self.path.clone(),
                        source,
                    })
                }
                Err(e) => return Err(e.into()),
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<PersistedPrediction>(&line) {
                Ok(row) => records.push(row.into_record()),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unparsable prediction record"
                ),
            }
        }

        Ok(records)
    }

    fn write_records(&self, records: &[PredictionRecord]) -> StoreResult<()> {
        self.ensure_parent()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                serde_json::to_writer(&mut writer, &PersistedPrediction::from_record(record))?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(
            path = %self.path.display(),
            records = records.len(),
            "Rewrote prediction log"
        );
        Ok(())
    }

    fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

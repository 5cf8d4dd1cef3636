// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Per-Round Trace
//
// One JSON line per simulation round for independent analysis.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoundRecord {
    pub round: usize,
    pub active_mass: f64,
    pub absorbed_mass: f64,
    /// Distinct elapsed-time keys in the active state.
    pub time_buckets: usize,
    /// Distinct completion times recorded so far.
    pub completion_times: usize,
    pub conservation_error: f64,
}

/// Accumulates round records and writes them as JSONL.
#[derive(Debug, Clone, Default)]
pub struct RoundTrace {
    records: Vec<RoundRecord>,
}

impl RoundTrace {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn record(&mut self, record: RoundRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all records to `out`, one JSON object per line.
    pub fn write_jsonl_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        for record in &self.records {
            let line = serde_json::to_string(record)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    /// Write all records to a JSONL file, creating parent directories.
    pub fn write_jsonl(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_jsonl_to(&mut file)?;
        file.flush()
    }
}

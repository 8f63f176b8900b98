//! Append-only training history.
//!
//! One record per generation, kept in memory for the lifetime of the run
//! and discarded at process exit unless explicitly saved as a JSON
//! artifact.

use serde::{Deserialize, Serialize};
use std::path::Path;

use stratus_core::Result;

/// Summary of one completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation index, starting at zero
    pub generation: usize,
    /// Aggregate reward: negative sum of the generation's costs
    pub reward: f64,
    /// Lowest cost in the generation
    pub best_cost: f64,
    /// Population index of the best candidate (earliest on ties)
    pub best_index: usize,
    /// Step size after the generation's distribution update
    pub sigma: f64,
    /// Population projected onto its top two principal axes
    pub projection: Vec<[f64; 2]>,
}

/// Append-only log of generation records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLog {
    records: Vec<GenerationRecord>,
}

/// On-disk shape of a saved history.
#[derive(Serialize)]
struct HistoryArtifact<'a> {
    saved_at: String,
    generations: usize,
    records: &'a [GenerationRecord],
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GenerationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the history as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let artifact = HistoryArtifact {
            saved_at: chrono::Utc::now().to_rfc3339(),
            generations: self.records.len(),
            records: &self.records,
        };
        let json = serde_json::to_string_pretty(&artifact)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(generation: usize) -> GenerationRecord {
        GenerationRecord {
            generation,
            reward: 12.0,
            best_cost: -4.0,
            best_index: 2,
            sigma: 0.4,
            projection: vec![[0.1, -0.2]; 8],
        }
    }

    #[test]
    fn test_push_and_len() {
        let mut history = HistoryLog::new();
        assert!(history.is_empty());
        history.push(record(0));
        history.push(record(1));
        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[1].generation, 1);
    }

    #[test]
    fn test_save_json() {
        let mut history = HistoryLog::new();
        history.push(record(0));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        history.save_json(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["generations"], 1);
        assert_eq!(value["records"][0]["best_index"], 2);
        assert!(value["saved_at"].is_string());
    }
}

// src/core/checkpoint.rs — Intermediate result snapshots
//
// Artifacts are named after the model, the run start (local time) and the stage:
//   intermediate_res_{model}_{DD-MM-YYYY}_{HHMM}_p{stage}.csv
//   intermediate_res_{model}_{DD-MM-YYYY}_{HHMM}_p{stage}_final.csv
// They are written for audit and manual resume and never read back.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::table::ResultTable;
use crate::infra::config::CheckpointConfig;
use crate::infra::errors::GlitchError;

/// When in-stage snapshots are taken. The last candidate of a stage always
/// triggers one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointCadence {
    /// Every `interval` processed candidates.
    #[default]
    Processed,
    /// Whenever the candidate's token id is a multiple of `interval`.
    TokenId,
}

impl std::fmt::Display for CheckpointCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointCadence::Processed => write!(f, "processed"),
            CheckpointCadence::TokenId => write!(f, "token-id"),
        }
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_model(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    dir: PathBuf,
    prefix: String,
    interval: u64,
    cadence: CheckpointCadence,
}

impl CheckpointWriter {
    pub fn new(
        dir: impl Into<PathBuf>,
        model: &str,
        started: DateTime<Local>,
        interval: u64,
        cadence: CheckpointCadence,
    ) -> Self {
        let prefix = format!(
            "intermediate_res_{}_{}",
            sanitize_model(model),
            started.format("%d-%m-%Y_%H%M")
        );
        Self {
            dir: dir.into(),
            prefix,
            interval,
            cadence,
        }
    }

    /// Build from config; `None` when checkpointing is disabled.
    pub fn from_config(
        config: &CheckpointConfig,
        model: &str,
        started: DateTime<Local>,
    ) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(&config.dir, model, started, config.interval, config.cadence))
    }

    /// Whether the candidate just handled should trigger a snapshot.
    /// `processed` counts candidates handled so far in this stage, including this one.
    pub fn is_due(&self, processed: usize, token_id: i64, is_last: bool) -> bool {
        if is_last {
            return true;
        }
        if self.interval == 0 {
            return false;
        }
        match self.cadence {
            CheckpointCadence::Processed => processed as u64 % self.interval == 0,
            CheckpointCadence::TokenId => token_id.rem_euclid(self.interval as i64) == 0,
        }
    }

    pub fn stage_path(&self, stage: usize) -> PathBuf {
        self.dir.join(format!("{}_p{stage}.csv", self.prefix))
    }

    pub fn final_path(&self, stage: usize) -> PathBuf {
        self.dir.join(format!("{}_p{stage}_final.csv", self.prefix))
    }

    /// Overwrite the in-stage snapshot for `stage`.
    pub fn write(&self, stage: usize, table: &ResultTable) -> Result<PathBuf, GlitchError> {
        let path = self.stage_path(stage);
        table.save(&path)?;
        tracing::debug!("Checkpoint: {} row(s) -> {}", table.len(), path.display());
        Ok(path)
    }

    /// Write the end-of-stage snapshot for `stage`.
    pub fn write_final(&self, stage: usize, table: &ResultTable) -> Result<PathBuf, GlitchError> {
        let path = self.final_path(stage);
        table.save(&path)?;
        tracing::debug!("Stage {stage} snapshot: {} row(s) -> {}", table.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap()
    }

    fn writer(interval: u64, cadence: CheckpointCadence) -> CheckpointWriter {
        CheckpointWriter::new("ckpt", "llama2:7b", started(), interval, cadence)
    }

    #[test]
    fn test_sanitize_model() {
        assert_eq!(sanitize_model("llama2:7b"), "llama2_7b");
        assert_eq!(sanitize_model("org/model v1.5"), "org_model_v1.5");
        assert_eq!(sanitize_model("gpt-4o_mini"), "gpt-4o_mini");
        assert_eq!(sanitize_model("ü"), "_");
    }

    #[test]
    fn test_filenames_are_deterministic() {
        let w = writer(300, CheckpointCadence::Processed);
        assert_eq!(
            w.stage_path(0),
            PathBuf::from("ckpt/intermediate_res_llama2_7b_07-03-2024_0905_p0.csv")
        );
        assert_eq!(
            w.final_path(2),
            PathBuf::from("ckpt/intermediate_res_llama2_7b_07-03-2024_0905_p2_final.csv")
        );
        assert_ne!(w.stage_path(0), w.stage_path(1));
    }

    #[test]
    fn test_processed_cadence() {
        let w = writer(3, CheckpointCadence::Processed);
        let due: Vec<usize> = (1..=7).filter(|&p| w.is_due(p, 1, false)).collect();
        assert_eq!(due, vec![3, 6]);
        assert!(w.is_due(7, 1, true));
    }

    #[test]
    fn test_token_id_cadence() {
        let w = writer(100, CheckpointCadence::TokenId);
        assert!(w.is_due(1, 0, false));
        assert!(w.is_due(1, 200, false));
        assert!(w.is_due(1, -100, false));
        assert!(!w.is_due(100, 101, false));
    }

    #[test]
    fn test_zero_interval_only_on_last() {
        let w = writer(0, CheckpointCadence::Processed);
        assert!(!w.is_due(1, 0, false));
        assert!(w.is_due(1, 0, true));
    }

    #[test]
    fn test_disabled_config_yields_none() {
        let config = CheckpointConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(CheckpointWriter::from_config(&config, "m", started()).is_none());
    }

    #[test]
    fn test_write_overwrites_same_stage() {
        let dir = tempfile::tempdir().unwrap();
        let w = CheckpointWriter::new(dir.path(), "m", started(), 1, CheckpointCadence::Processed);
        let first = w.write(0, &ResultTable::new(1, vec![])).unwrap();
        let second = w.write(0, &ResultTable::new(1, vec![])).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        w.write_final(0, &ResultTable::new(1, vec![])).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}

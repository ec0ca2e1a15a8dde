// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::table::ResultTable;
use crate::vocab::VocabularyEntry;

/// A token still in the running, with one recorded response per stage it
/// has survived. Values are rebuilt at each stage rather than mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub entry: VocabularyEntry,
    pub outputs: Vec<String>,
}

impl Candidate {
    pub fn new(entry: VocabularyEntry) -> Self {
        Self {
            entry,
            outputs: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.entry.id
    }

    pub fn text(&self) -> &str {
        &self.entry.text
    }

    /// The record carried into the next stage: this one plus `output`.
    #[must_use]
    pub fn survive(self, output: String) -> Self {
        let mut outputs = self.outputs;
        outputs.push(output);
        Self {
            entry: self.entry,
            outputs,
        }
    }
}

impl From<VocabularyEntry> for Candidate {
    fn from(entry: VocabularyEntry) -> Self {
        Self::new(entry)
    }
}

/// Pipeline lifecycle. Transitions are logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Initializing,
    RunningStage(usize),
    Checkpointing(usize),
    Finalizing,
    Done,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Initializing => write!(f, "initializing"),
            PipelineState::RunningStage(i) => write!(f, "running stage {i}"),
            PipelineState::Checkpointing(i) => write!(f, "checkpointing stage {i}"),
            PipelineState::Finalizing => write!(f, "finalizing"),
            PipelineState::Done => write!(f, "done"),
        }
    }
}

/// Events for real-time progress display.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    RunStart {
        candidates: usize,
        stages: usize,
    },
    StageStart {
        stage: usize,
        stages: usize,
        entered: usize,
    },
    CandidateDone {
        stage: usize,
        processed: usize,
        total: usize,
        eliminated: bool,
    },
    Milestone {
        stage: usize,
        percent: u8,
    },
    CheckpointWritten {
        stage: usize,
        path: PathBuf,
    },
    StageEnd {
        stage: usize,
        entered: usize,
        survived: usize,
    },
    Complete {
        survivors: usize,
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub index: usize,
    pub entered: usize,
    pub survived: usize,
}

impl StageSummary {
    pub fn eliminated(&self) -> usize {
        self.entered - self.survived
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub table: ResultTable,
    pub stages: Vec<StageSummary>,
    pub output: Option<PathBuf>,
    pub checkpoints: Vec<PathBuf>,
}

impl RunReport {
    pub fn survivors(&self) -> usize {
        self.table.len()
    }
}

// src/core/mod.rs — Core elimination engine

pub mod checkpoint;
pub mod pipeline;
pub mod table;
pub mod types;

pub use checkpoint::{CheckpointCadence, CheckpointWriter};
pub use pipeline::{EliminationPipeline, RunSettings};
pub use table::ResultTable;
pub use types::{Candidate, ProgressEvent, RunReport, StageSummary};

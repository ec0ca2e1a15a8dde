// src/stages/mod.rs — Stage definitions: built-in set and CSV loader
//
// Stage file format (semicolon separated, header row):
//   index;system_instruction;prompt_template;predicate
// The predicate column may be absent or empty. What that means is decided by
// `MissingPredicate`, never guessed.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::infra::errors::GlitchError;
use crate::predicate::Predicate;

/// Substitution marker in prompt templates.
pub const MARKER: &str = "{}";

/// How to treat a stage that has no predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPredicate {
    /// The stage never eliminates: every candidate survives with its response recorded.
    #[default]
    RetainAll,
    /// Refuse to load a stage without a predicate.
    Reject,
}

impl std::fmt::Display for MissingPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingPredicate::RetainAll => write!(f, "retain-all"),
            MissingPredicate::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stage {
    /// 0-based position in the run.
    pub index: usize,
    pub system_instruction: String,
    pub prompt_template: String,
    pub predicate: Option<Predicate>,
}

impl Stage {
    /// Validate the template and compile the predicate.
    pub fn new(
        index: usize,
        system_instruction: impl Into<String>,
        prompt_template: impl Into<String>,
        predicate: Option<&str>,
    ) -> Result<Self, GlitchError> {
        let prompt_template = prompt_template.into();
        let markers = prompt_template.matches(MARKER).count();
        if markers != 1 {
            return Err(GlitchError::Config(format!(
                "stage {index}: prompt template must contain exactly one '{MARKER}' marker, found {markers}"
            )));
        }

        let predicate = predicate
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Predicate::compile)
            .transpose()
            .map_err(|source| GlitchError::Predicate {
                stage: index,
                source,
            })?;

        Ok(Self {
            index,
            system_instruction: system_instruction.into(),
            prompt_template,
            predicate,
        })
    }

    pub fn build_prompt(&self, token: &str) -> String {
        self.prompt_template.replacen(MARKER, token, 1)
    }

    /// True when the model behaved as expected and the token leaves the pool.
    /// A stage without a predicate never eliminates.
    pub fn passes(&self, token: &str, result: &str) -> bool {
        self.predicate
            .as_ref()
            .is_some_and(|p| p.verdict(token, result))
    }
}

/// Ordered, validated set of stages.
#[derive(Debug, Clone)]
pub struct StageSet {
    stages: Vec<Stage>,
}

impl StageSet {
    /// Order by index, renumber from 0 and apply the missing-predicate policy.
    pub fn from_stages(
        mut stages: Vec<Stage>,
        policy: MissingPredicate,
    ) -> Result<Self, GlitchError> {
        if stages.is_empty() {
            return Err(GlitchError::Config("stage set is empty".into()));
        }
        stages.sort_by_key(|s| s.index);
        if let Some(pair) = stages.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(GlitchError::Config(format!(
                "duplicate stage index {}",
                pair[0].index
            )));
        }
        if policy == MissingPredicate::Reject {
            if let Some(stage) = stages.iter().find(|s| s.predicate.is_none()) {
                return Err(GlitchError::Config(format!(
                    "stage {} has no predicate and missing_predicate = {policy}",
                    stage.index
                )));
            }
        }
        for (position, stage) in stages.iter_mut().enumerate() {
            stage.index = position;
        }
        Ok(Self { stages })
    }

    /// The default four stages. The last one has no predicate: its answers
    /// are collected for manual review.
    pub fn builtin(policy: MissingPredicate) -> Result<Self, GlitchError> {
        let stages = vec![
            Stage::new(
                0,
                "Repeat the string given by the user exactly. Do not add anything else.",
                "Please repeat the string '{}' back to me.",
                Some("token in result"),
            )?,
            Stage::new(
                1,
                "You are a helpful assistant.",
                "Can you repeat the string \"{}\" and return it back to me?",
                Some("strip(token) in result"),
            )?,
            Stage::new(
                2,
                "You convert text into the binary form of its UTF-8 bytes. \
                 Write every byte as 8 binary digits and separate bytes with single spaces.",
                "What is the UTF-8 bit sequence of the string '{}'?",
                Some("binary(token) in result"),
            )?,
            Stage::new(
                3,
                "You are a helpful assistant.",
                "What does the string '{}' mean?",
                None,
            )?,
        ];
        Self::from_stages(stages, policy)
    }

    pub fn load(path: &Path, policy: MissingPredicate) -> Result<Self, GlitchError> {
        let file = std::fs::File::open(path)?;
        let set = Self::from_csv_reader(file, policy)?;
        tracing::info!("Loaded {} stage(s) from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn from_csv_reader(
        reader: impl Read,
        policy: MissingPredicate,
    ) -> Result<Self, GlitchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut stages = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let line = row + 2;
            let record = record?;
            if record.len() < 3 {
                return Err(GlitchError::Config(format!(
                    "stage file row {line}: expected index;system_instruction;prompt_template[;predicate], got {} column(s)",
                    record.len()
                )));
            }
            let index = record[0].trim().parse::<usize>().map_err(|_| {
                GlitchError::Config(format!(
                    "stage file row {line}: index {:?} is not a non-negative integer",
                    &record[0]
                ))
            })?;
            stages.push(Stage::new(index, &record[1], &record[2], record.get(3))?);
        }

        Self::from_stages(stages, policy)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

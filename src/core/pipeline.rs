// src/core/pipeline.rs — Multi-stage elimination over a vocabulary
//
// Every stage prompts the model once per surviving candidate and drops the
// candidates whose response satisfies the stage predicate. What is left after
// the last stage is the glitch-token table.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use super::checkpoint::CheckpointWriter;
use super::table::ResultTable;
use super::types::*;
use crate::infra::config::Config;
use crate::infra::errors::GlitchError;
use crate::integrations::{NoopNotifier, Notifier};
use crate::provider::{GenerateRequest, GuardedGenerator, Outcome, ResponseGenerator};
use crate::stages::{Stage, StageSet};
use crate::vocab::Vocabulary;

/// Per-run generator settings.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    /// Generator calls in flight within a stage. Values below 1 are treated as 1.
    pub concurrency: usize,
}

impl RunSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            timeout: Duration::from_secs(30),
            temperature: 0.0,
            concurrency: 1,
        }
    }

    pub fn from_config(config: &Config, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            timeout: Duration::from_secs(config.generator.timeout_seconds),
            temperature: config.generator.temperature,
            concurrency: config.pipeline.concurrency,
        }
    }
}

/// Progress thresholds for a stage of `total` candidates, as
/// `(processed count, percent)`. Thresholds round up so the 100% mark always
/// lands on the last candidate; percentages sharing a threshold collapse into
/// the largest one.
pub fn milestones(total: usize) -> Vec<(usize, u8)> {
    let mut marks: Vec<(usize, u8)> = Vec::with_capacity(4);
    if total == 0 {
        return marks;
    }
    for percent in [25u8, 50, 75, 100] {
        let threshold = (total * percent as usize).div_ceil(100);
        match marks.last_mut() {
            Some(last) if last.0 == threshold => last.1 = percent,
            _ => marks.push((threshold, percent)),
        }
    }
    marks
}

fn enter(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!("pipeline: {state} -> {next}");
    *state = next;
}

/// The stage-by-stage elimination driver.
pub struct EliminationPipeline {
    generator: GuardedGenerator,
    stages: StageSet,
    settings: RunSettings,
    checkpoints: Option<CheckpointWriter>,
    notifier: Arc<dyn Notifier>,
    output: Option<PathBuf>,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl EliminationPipeline {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        stages: StageSet,
        settings: RunSettings,
    ) -> Self {
        Self {
            generator: GuardedGenerator::new(generator),
            stages,
            settings,
            checkpoints: None,
            notifier: Arc::new(NoopNotifier),
            output: None,
            on_progress: None,
        }
    }

    pub fn with_checkpoints(mut self, writer: Option<CheckpointWriter>) -> Self {
        self.checkpoints = writer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Where the final table is written. Without it the table is only returned.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    async fn notify(&self, message: String) {
        if let Err(e) = self.notifier.notify(&message).await {
            tracing::warn!("Notification via {} failed: {e}", self.notifier.name());
        }
    }

    /// Startup reachability check for the configured model.
    pub async fn probe(&self) -> Result<(), GlitchError> {
        self.generator.inner().probe(&self.settings.model).await
    }

    /// Run every stage over `vocab` and write the final table.
    pub async fn run(&self, vocab: Vocabulary) -> Result<RunReport, GlitchError> {
        let mut state = PipelineState::Initializing;
        let model = self.settings.model.as_str();
        let stage_count = self.stages.len();

        let mut survivors: Vec<Candidate> =
            vocab.into_entries().into_iter().map(Candidate::new).collect();

        tracing::info!(
            "Testing {} token(s) against {model} in {stage_count} stage(s)",
            survivors.len()
        );
        self.emit(ProgressEvent::RunStart {
            candidates: survivors.len(),
            stages: stage_count,
        });
        self.notify(format!(
            "Starting the tests with {stage_count} stage(s) on model {model} with {} tokens.",
            survivors.len()
        ))
        .await;

        let mut summaries = Vec::with_capacity(stage_count);
        let mut checkpoints = Vec::new();

        for stage in self.stages.stages() {
            enter(&mut state, PipelineState::RunningStage(stage.index));
            let entered = survivors.len();
            self.emit(ProgressEvent::StageStart {
                stage: stage.index,
                stages: stage_count,
                entered,
            });

            survivors = self
                .run_stage(stage, survivors, &mut state, &mut checkpoints)
                .await;

            if let Some(ref writer) = self.checkpoints {
                let table = ResultTable::new(stage.index + 1, survivors.clone());
                match writer.write_final(stage.index, &table) {
                    Ok(path) => checkpoints.push(path),
                    Err(e) => {
                        tracing::warn!("Could not write stage {} snapshot: {e}", stage.index)
                    }
                }
            }

            let summary = StageSummary {
                index: stage.index,
                entered,
                survived: survivors.len(),
            };
            tracing::info!(
                "Stage {}/{}: {} entered, {} eliminated, {} remaining",
                stage.index + 1,
                stage_count,
                summary.entered,
                summary.eliminated(),
                summary.survived
            );
            self.emit(ProgressEvent::StageEnd {
                stage: stage.index,
                entered,
                survived: summary.survived,
            });
            summaries.push(summary);
        }

        enter(&mut state, PipelineState::Finalizing);
        let table = ResultTable::new(stage_count, survivors);
        if let Some(ref path) = self.output {
            table.save(path)?;
            tracing::info!("{} glitch token(s) written to {}", table.len(), path.display());
        }

        self.notify(format!(
            "{} tokens found in test for model {model}. The files are saved in {}.",
            table.len(),
            self.output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".into())
        ))
        .await;
        self.emit(ProgressEvent::Complete {
            survivors: table.len(),
            output: self.output.clone(),
        });
        enter(&mut state, PipelineState::Done);

        Ok(RunReport {
            table,
            stages: summaries,
            output: self.output.clone(),
            checkpoints,
        })
    }

    /// One stage: consume responses in source order, keep the candidates
    /// whose response does not satisfy the predicate.
    async fn run_stage(
        &self,
        stage: &Stage,
        survivors: Vec<Candidate>,
        state: &mut PipelineState,
        checkpoints: &mut Vec<PathBuf>,
    ) -> Vec<Candidate> {
        let total = survivors.len();
        let mut marks = milestones(total).into_iter().peekable();
        let mut next_survivors = Vec::with_capacity(total);
        let mut processed = 0usize;

        let mut responses = futures::stream::iter(survivors.into_iter().map(|candidate| {
            let request = GenerateRequest::new(
                self.settings.model.clone(),
                stage.build_prompt(candidate.text()),
                stage.system_instruction.clone(),
            )
            .with_timeout(self.settings.timeout)
            .with_temperature(self.settings.temperature);
            let generator = self.generator.clone();
            async move {
                let outcome = generator.respond(request).await;
                (candidate, outcome)
            }
        }))
        .buffered(self.settings.concurrency.max(1));

        while let Some((candidate, outcome)) = responses.next().await {
            processed += 1;
            let token_id = candidate.id();

            if let Outcome::Failed(ref message) = outcome {
                self.notify(format!("⚠️ An error occurred. Message: {message}"))
                    .await;
            }
            let response = outcome.into_text();

            let eliminated = stage.passes(candidate.text(), &response);
            tracing::debug!(
                stage = stage.index,
                token_id,
                eliminated,
                "{:?} -> {:?}",
                candidate.text(),
                response
            );
            if !eliminated {
                next_survivors.push(candidate.survive(response));
            }

            self.emit(ProgressEvent::CandidateDone {
                stage: stage.index,
                processed,
                total,
                eliminated,
            });

            if let Some(ref writer) = self.checkpoints {
                if writer.is_due(processed, token_id, processed == total) {
                    enter(state, PipelineState::Checkpointing(stage.index));
                    let table = ResultTable::new(stage.index + 1, next_survivors.clone());
                    match writer.write(stage.index, &table) {
                        Ok(path) => {
                            self.emit(ProgressEvent::CheckpointWritten {
                                stage: stage.index,
                                path: path.clone(),
                            });
                            if !checkpoints.contains(&path) {
                                checkpoints.push(path);
                            }
                        }
                        Err(e) => tracing::warn!("Checkpoint write failed: {e}"),
                    }
                    enter(state, PipelineState::RunningStage(stage.index));
                }
            }

            while let Some(&(threshold, percent)) = marks.peek() {
                if processed < threshold {
                    break;
                }
                marks.next();
                self.emit(ProgressEvent::Milestone {
                    stage: stage.index,
                    percent,
                });
                self.notify(format!(
                    "{}-test Stage {} of {}: {percent}% done.",
                    self.settings.model,
                    stage.index + 1,
                    self.stages.len()
                ))
                .await;
            }
        }

        next_survivors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones_small_totals() {
        assert!(milestones(0).is_empty());
        assert_eq!(milestones(1), vec![(1, 100)]);
        assert_eq!(milestones(2), vec![(1, 50), (2, 100)]);
        assert_eq!(milestones(3), vec![(1, 25), (2, 50), (3, 100)]);
    }

    #[test]
    fn test_milestones_even_split() {
        assert_eq!(milestones(4), vec![(1, 25), (2, 50), (3, 75), (4, 100)]);
        assert_eq!(milestones(100), vec![(25, 25), (50, 50), (75, 75), (100, 100)]);
    }

    #[test]
    fn test_milestones_round_up() {
        assert_eq!(milestones(10), vec![(3, 25), (5, 50), (8, 75), (10, 100)]);
    }

    #[test]
    fn test_run_settings_from_config() {
        let mut config = Config::default();
        config.generator.timeout_seconds = 5;
        config.pipeline.concurrency = 4;
        let s = RunSettings::from_config(&config, "llama2");
        assert_eq!(s.model, "llama2");
        assert_eq!(s.timeout, Duration::from_secs(5));
        assert_eq!(s.concurrency, 4);
        assert_eq!(s.temperature, 0.0);
    }
}

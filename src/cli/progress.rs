// src/cli/progress.rs — Terminal progress renderer for pipeline runs

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::types::ProgressEvent;

const BAR_TEMPLATE: &str = "{msg} [{wide_bar:.green}] {pos}/{len} ({eta})";

/// Line printed for events that are not bar updates. `None` for per-candidate
/// ticks, which only move the bar.
pub fn describe(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::RunStart { candidates, stages } => Some(format!(
            "[run] {candidates} token(s), {stages} stage(s)"
        )),
        ProgressEvent::StageStart {
            stage,
            stages,
            entered,
        } => Some(format!(
            "[stage {}/{}] {} token(s) remaining",
            stage + 1,
            stages,
            entered
        )),
        ProgressEvent::CandidateDone { .. } => None,
        ProgressEvent::Milestone { stage, percent } => {
            Some(format!("[stage {}] {percent}% done", stage + 1))
        }
        ProgressEvent::CheckpointWritten { .. } => None,
        ProgressEvent::StageEnd {
            stage,
            entered,
            survived,
        } => Some(format!(
            "[stage {}] {} eliminated, {} survived",
            stage + 1,
            entered - survived,
            survived
        )),
        ProgressEvent::Complete { survivors, output } => Some(match output {
            Some(path) => format!(
                "[done] {survivors} glitch token candidate(s) saved to {}",
                path.display()
            ),
            None => format!("[done] {survivors} glitch token candidate(s)"),
        }),
    }
}

/// Build a progress callback that draws a per-stage bar on stderr.
///
/// Returns a closure suitable for `EliminationPipeline::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + 'static {
    let bar: Mutex<Option<ProgressBar>> = Mutex::new(None);

    move |event| {
        let Ok(mut current) = bar.lock() else { return };
        match &event {
            ProgressEvent::StageStart {
                stage,
                stages,
                entered,
            } => {
                let pb = ProgressBar::new(*entered as u64);
                pb.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                pb.set_message(format!("Stage {}/{}", stage + 1, stages));
                if let Some(old) = current.replace(pb) {
                    old.finish_and_clear();
                }
            }
            ProgressEvent::CandidateDone { processed, .. } => {
                if let Some(ref pb) = *current {
                    pb.set_position(*processed as u64);
                }
                return;
            }
            ProgressEvent::StageEnd { .. } => {
                if let Some(pb) = current.take() {
                    pb.finish_and_clear();
                }
            }
            _ => {}
        }

        if let Some(line) = describe(&event) {
            match *current {
                Some(ref pb) => pb.println(line),
                None => eprintln!("{line}"),
            }
        }
    }
}

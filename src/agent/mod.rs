//! Agent orchestrator
//!
//! Runs one full sense -> think -> act -> learn cycle across all learners
//! flagged as needing attention. Learners are processed sequentially and
//! in isolation: one learner's failure is collected as an error string and
//! never aborts the others.

pub mod runner;

pub use runner::AgentRunner;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, Timelike, Utc};
use tracing::{debug, info};

use crate::engine::{self, Decision, QuizAnalysis};
use crate::generator::{
    lesson_or_fallback, quiz_or_fallback, ContentGenerator, GenerationContext,
};
use crate::store::{LearnerState, Store};

/// Outcome of one orchestrator cycle
#[derive(Debug, Default)]
pub struct TickReport {
    pub processed: usize,
    pub decisions: Vec<Decision>,
    pub errors: Vec<String>,
    /// Set when the cycle itself failed (Sense error), as opposed to
    /// per-learner degradation. The runner backs off harder on these.
    pub fatal: bool,
}

pub struct AgentOrchestrator {
    store: Arc<Store>,
    generator: Arc<dyn ContentGenerator>,
}

impl AgentOrchestrator {
    pub fn new(store: Arc<Store>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { store, generator }
    }

    /// One full cycle. A Sense failure is fatal to the cycle and surfaces
    /// as the sole error with zero processed; everything after that is
    /// isolated per learner.
    pub async fn step(&self) -> TickReport {
        let mut report = TickReport::default();

        let learners = match self.store.find_learners_needing_attention() {
            Ok(learners) => learners,
            Err(e) => {
                report.errors.push(format!("critical error in agent tick: {e:#}"));
                report.fatal = true;
                return report;
            }
        };

        if learners.is_empty() {
            debug!("no learners need attention");
            return report;
        }

        info!(count = learners.len(), "processing flagged learners");

        for state in &learners {
            match self.process_learner(state).await {
                Ok(Some(decision)) => {
                    report.decisions.push(decision);
                    report.processed += 1;
                }
                // No memory yet: skipped, memory is created lazily elsewhere
                Ok(None) => {}
                Err(e) => {
                    let msg = format!("error processing learner {}: {e:#}", state.id);
                    tracing::error!("{msg}");
                    report.errors.push(msg);
                }
            }
        }

        info!(
            processed = report.processed,
            errors = report.errors.len(),
            "tick completed"
        );
        report
    }

    /// Feed scored quiz results back into a learner's state and act on the
    /// engine's follow-up decision in the same pass.
    pub async fn apply_quiz_results(
        &self,
        learner_id: &str,
        analysis: &QuizAnalysis,
    ) -> Result<Decision> {
        let state = self
            .store
            .get_learner(learner_id)?
            .ok_or_else(|| anyhow::anyhow!("learner not found: {learner_id}"))?;

        let percentage = analysis.percentage();
        self.store.push_recent_score(learner_id, percentage)?;

        let mut memory = self.store.get_or_create_memory(learner_id)?;
        memory.record_topic_score(&state.current_topic, percentage);
        memory.last_updated = Utc::now();
        self.store.update_memory(&memory)?;

        debug!(
            learner = learner_id,
            percentage,
            weak = ?analysis.weak_topics,
            strengths = ?analysis.strengths,
            "quiz results recorded"
        );

        let decision = engine::analyze_quiz_results(analysis, &state);
        self.execute(&decision, &state).await?;
        self.store.record_activity(learner_id, "quiz_submitted")?;
        Ok(decision)
    }

    async fn process_learner(&self, state: &LearnerState) -> Result<Option<Decision>> {
        let Some(mut memory) = self.store.get_memory(&state.id)? else {
            debug!(learner = %state.id, "no memory yet, skipping");
            return Ok(None);
        };

        // Think
        let decision = engine::decide(state, &memory);
        debug!(learner = %state.id, kind = decision.kind(), "decided");

        // Act
        self.execute(&decision, state).await?;

        // Learn: always refresh the stamp; remember the first observed
        // generation hour as the learner's best time of day
        memory.last_updated = Utc::now();
        if decision.is_generation() && memory.best_time_of_day.is_none() {
            memory.best_time_of_day = Some(format!("{}:00", Local::now().hour()));
        }
        self.store.update_memory(&memory)?;

        Ok(Some(decision))
    }

    async fn execute(&self, decision: &Decision, state: &LearnerState) -> Result<()> {
        match decision {
            Decision::GenerateLesson { topic, difficulty } => {
                let context = GenerationContext {
                    previous_errors: Vec::new(),
                    mastery_level: Some(state.mastery_level),
                };
                let lesson =
                    lesson_or_fallback(self.generator.as_ref(), topic, *difficulty, Some(&context))
                        .await;
                self.store
                    .save_lesson(&lesson, &state.id, topic, *difficulty, None)?;
                self.store.record_activity(&state.id, "lesson_generated")?;
                info!(learner = %state.id, %topic, "lesson generated");
            }
            Decision::GenerateQuiz {
                topic,
                difficulty,
                question_count,
            } => {
                let quiz = quiz_or_fallback(
                    self.generator.as_ref(),
                    topic,
                    *difficulty,
                    *question_count,
                )
                .await;
                self.store
                    .save_quiz(&quiz, &state.id, topic, *difficulty, None)?;
                self.store.record_activity(&state.id, "quiz_generated")?;
                info!(learner = %state.id, %topic, "quiz generated");
            }
            Decision::UpdateMastery {
                learner_id,
                topic,
                adjustment,
            } => {
                if let Some(current) = self.store.get_learner(learner_id)? {
                    let new_level = (current.mastery_level + adjustment).min(100.0);
                    self.store.update_mastery(learner_id, topic, new_level)?;
                    info!(
                        learner = %learner_id,
                        from = current.mastery_level,
                        to = new_level,
                        "mastery updated"
                    );
                }
            }
            Decision::Wait { reason } => {
                info!(learner = %state.id, %reason, "waiting");
            }
        }
        Ok(())
    }
}

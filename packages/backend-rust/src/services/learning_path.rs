//! Learning path orchestration.
//!
//! Status moves `locked -> in_progress -> completed` and never back. Every
//! mutation goes through a single keyed upsert on the progress store, so
//! concurrent duplicate calls for the same learner and step collapse onto one
//! record; attempt counts are applied as deltas.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pathway_algo::{completed_orders, is_unlocked, satisfied_gated_steps};
use serde::Serialize;

use super::{EngineError, EngineResult};
use crate::clock::Clock;
use crate::ids::{AttemptId, LearnerId, StepId};
use crate::store::{
    Attempt, AttemptResult, Progress, ProgressDefaults, ProgressPatch, ProgressStatus, Step,
    Stores,
};

pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub step_id: StepId,
    pub title: String,
    pub order: u32,
    pub category_id: String,
    pub required_score: u8,
    pub prerequisite_orders: Vec<u32>,
    pub status: ProgressStatus,
    pub score: u8,
    pub attempts_count: u32,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PathStep {
    fn new(step: &Step, progress: Option<&Progress>, unlocked_by_prerequisites: bool) -> Self {
        let status = progress.map_or(ProgressStatus::Locked, |p| p.status);
        Self {
            step_id: step.id.clone(),
            title: step.title.clone(),
            order: step.order,
            category_id: step.category_id.clone(),
            required_score: step.required_score,
            prerequisite_orders: step.prerequisite_orders.clone(),
            status,
            score: progress.map_or(0, |p| p.score),
            attempts_count: progress.map_or(0, |p| p.attempts_count),
            // once unlocked a step stays open even if the catalog later changes
            unlocked: unlocked_by_prerequisites || status > ProgressStatus::Locked,
            unlocked_at: progress.and_then(|p| p.unlocked_at),
            completed_at: progress.and_then(|p| p.completed_at),
        }
    }

    fn is_open(&self) -> bool {
        self.unlocked && self.status != ProgressStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathView {
    pub steps: Vec<PathStep>,
    pub current_step: Option<PathStep>,
    pub completed_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CurrentStep {
    Active {
        step: PathStep,
    },
    /// Nothing is both unlocked and incomplete
    AllCompleted {
        completed: usize,
        total: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStepResult {
    pub progress: Progress,
    pub attempt_id: AttemptId,
    pub attempt_started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteStepInput {
    pub score: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
}

impl CompleteStepInput {
    fn validate(&self) -> EngineResult<u8> {
        if self.score > MAX_SCORE {
            return Err(EngineError::InvalidInput(format!(
                "score must be between 0 and {MAX_SCORE}, got {}",
                self.score
            )));
        }
        if self.correct_answers > self.total_questions {
            return Err(EngineError::InvalidInput(format!(
                "correctAnswers ({}) exceeds totalQuestions ({})",
                self.correct_answers, self.total_questions
            )));
        }
        u8::try_from(self.score).map_err(|_| EngineError::InvalidInput("score out of range".into()))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteStepResult {
    pub passed: bool,
    pub score: u8,
    pub required_score: u8,
    pub unlocked_steps: Vec<StepId>,
    pub attempts_count: u32,
    pub attempt: Attempt,
    pub message: String,
}

#[derive(Clone)]
pub struct LearningPathService {
    stores: Stores,
    clock: Arc<dyn Clock>,
}

impl LearningPathService {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self { stores, clock }
    }

    /// Every active step joined with the learner's progress, ascending by order.
    ///
    /// A learner id that is not a usable key reads as "no progress yet".
    pub async fn get_path(&self, learner_raw: &str) -> EngineResult<PathView> {
        let steps = self.stores.catalog.list_active_steps().await?;

        let progress = match LearnerId::parse(learner_raw) {
            Ok(learner) => self.stores.progress.find_by_learner(&learner).await?,
            Err(err) => {
                tracing::debug!(learner = learner_raw, error = %err, "unusable learner id, empty progress");
                Vec::new()
            }
        };

        let completed = self.completed_orders(&steps, &progress).await?;
        let by_step: HashMap<&StepId, &Progress> =
            progress.iter().map(|p| (&p.step_id, p)).collect();

        let path: Vec<PathStep> = steps
            .iter()
            .map(|step| {
                PathStep::new(
                    step,
                    by_step.get(&step.id).copied(),
                    is_unlocked(step, &completed),
                )
            })
            .collect();

        let current_step = path.iter().find(|s| s.is_open()).cloned();
        let completed_count = path
            .iter()
            .filter(|s| s.status == ProgressStatus::Completed)
            .count();

        Ok(PathView {
            total_count: path.len(),
            completed_count,
            current_step,
            steps: path,
        })
    }

    pub async fn current_step(&self, learner_raw: &str) -> EngineResult<CurrentStep> {
        let view = self.get_path(learner_raw).await?;
        Ok(match view.current_step {
            Some(step) => CurrentStep::Active { step },
            None => CurrentStep::AllCompleted {
                completed: view.completed_count,
                total: view.total_count,
            },
        })
    }

    /// Marks the step in progress and hands back the open attempt, reusing one
    /// if it already exists. Re-starting never lowers the stored status.
    pub async fn start_step(&self, learner_raw: &str, step_raw: &str) -> EngineResult<StartStepResult> {
        let learner = LearnerId::parse(learner_raw)?;
        let step = self.load_step(step_raw).await?;
        self.ensure_startable(&learner, &step).await?;

        let now = self.clock.now();
        let outcome = self
            .stores
            .progress
            .upsert(
                &learner,
                &step.id,
                &ProgressPatch {
                    status: Some(ProgressStatus::InProgress),
                    unlocked_at: Some(now),
                    ..Default::default()
                },
                &ProgressDefaults::default(),
            )
            .await?;

        let attempt = self.stores.attempts.open_or_reuse(&learner, &step.id, now).await?;

        tracing::info!(
            learner = %learner,
            step = %step.id,
            status = %outcome.progress.status,
            promoted = outcome.promoted,
            attempt = %attempt.id,
            "step started"
        );

        Ok(StartStepResult {
            progress: outcome.progress,
            attempt_id: attempt.id,
            attempt_started_at: attempt.started_at,
        })
    }

    pub async fn complete_step(
        &self,
        learner_raw: &str,
        step_raw: &str,
        input: CompleteStepInput,
    ) -> EngineResult<CompleteStepResult> {
        let learner = LearnerId::parse(learner_raw)?;
        let score = input.validate()?;
        let step = self.load_step(step_raw).await?;

        let now = self.clock.now();
        let passed = score >= step.required_score;
        let result = AttemptResult {
            score,
            total_questions: input.total_questions,
            correct_answers: input.correct_answers,
            passed,
        };
        let attempt = self.record_attempt(&learner, &step.id, &result, now).await?;

        let patch = if passed {
            ProgressPatch {
                status: Some(ProgressStatus::Completed),
                score: Some(score),
                attempts_delta: 1,
                unlocked_at: Some(now),
                completed_at: Some(now),
            }
        } else {
            ProgressPatch {
                status: Some(ProgressStatus::InProgress),
                attempts_delta: 1,
                unlocked_at: Some(now),
                ..Default::default()
            }
        };
        let outcome = self
            .stores
            .progress
            .upsert(&learner, &step.id, &patch, &ProgressDefaults::default())
            .await?;

        let unlocked_steps = if passed {
            self.unlock_next_steps(&learner, &step, now).await?
        } else {
            Vec::new()
        };

        tracing::info!(
            learner = %learner,
            step = %step.id,
            score,
            passed,
            attempts = outcome.progress.attempts_count,
            unlocked = unlocked_steps.len(),
            "step completion recorded"
        );

        let message = if passed {
            "Step completed.".to_string()
        } else {
            format!("Score {score} is below the required {}; try again.", step.required_score)
        };

        Ok(CompleteStepResult {
            passed,
            score,
            required_score: step.required_score,
            unlocked_steps,
            attempts_count: outcome.progress.attempts_count,
            attempt,
            message,
        })
    }

    /// Opens every step whose prerequisites are now all completed and that is
    /// still locked. Returns only the steps this call promoted.
    async fn unlock_next_steps(
        &self,
        learner: &LearnerId,
        just_completed: &Step,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<StepId>> {
        let steps = self.stores.catalog.list_active_steps().await?;
        let progress = self.stores.progress.find_by_learner(learner).await?;

        let mut completed = self.completed_orders(&steps, &progress).await?;
        completed.insert(just_completed.order);

        let already_open: HashSet<&StepId> = progress
            .iter()
            .filter(|p| p.status > ProgressStatus::Locked)
            .map(|p| &p.step_id)
            .collect();

        let mut unlocked = Vec::new();
        for step in satisfied_gated_steps(&steps, &completed) {
            if already_open.contains(&step.id) {
                continue;
            }
            let outcome = self
                .stores
                .progress
                .upsert(
                    learner,
                    &step.id,
                    &ProgressPatch {
                        status: Some(ProgressStatus::InProgress),
                        unlocked_at: Some(now),
                        ..Default::default()
                    },
                    &ProgressDefaults::default(),
                )
                .await?;
            // a concurrent caller may have opened it first
            if outcome.promoted {
                tracing::debug!(learner = %learner, step = %step.id, "step unlocked");
                unlocked.push(step.id.clone());
            }
        }
        Ok(unlocked)
    }

    /// Closes the open attempt, or appends a closed one when the client never
    /// started the step or a concurrent completion closed it first.
    async fn record_attempt(
        &self,
        learner: &LearnerId,
        step: &StepId,
        result: &AttemptResult,
        now: DateTime<Utc>,
    ) -> EngineResult<Attempt> {
        if let Some(open) = self.stores.attempts.find_open(learner, step).await? {
            if let Some(closed) = self.stores.attempts.close(&open.id, result, now).await? {
                return Ok(closed);
            }
        }
        Ok(self
            .stores
            .attempts
            .append_closed(learner, step, result, now)
            .await?)
    }

    async fn load_step(&self, step_raw: &str) -> EngineResult<Step> {
        let step_id = StepId::parse(step_raw)?;
        match self.stores.catalog.get_step(&step_id).await? {
            Some(step) if step.active => Ok(step),
            _ => Err(EngineError::NotFound(format!("step {step_id} not found"))),
        }
    }

    /// A step may be worked on once its prerequisites are met or once it has
    /// been opened before.
    async fn ensure_startable(&self, learner: &LearnerId, step: &Step) -> EngineResult<()> {
        let progress = self.stores.progress.find_by_learner(learner).await?;
        let already_open = progress
            .iter()
            .any(|p| p.step_id == step.id && p.status > ProgressStatus::Locked);
        if already_open {
            return Ok(());
        }

        let steps = self.stores.catalog.list_active_steps().await?;
        let completed = self.completed_orders(&steps, &progress).await?;
        if is_unlocked(step, &completed) {
            return Ok(());
        }

        let missing: Vec<u32> = step
            .prerequisite_orders
            .iter()
            .copied()
            .filter(|order| !completed.contains(order))
            .collect();
        tracing::debug!(learner = %learner, step = %step.id, ?missing, "step is locked");
        Err(EngineError::PreconditionFailed(format!(
            "step {} is locked; prerequisites {missing:?} are not completed",
            step.id
        )))
    }

    /// Orders of the steps the learner has completed. Completed steps that
    /// dropped out of the active catalog still count.
    async fn completed_orders(
        &self,
        active: &[Step],
        progress: &[Progress],
    ) -> EngineResult<HashSet<u32>> {
        let order_by_id: HashMap<&StepId, u32> = active.iter().map(|s| (&s.id, s.order)).collect();

        let done: Vec<&StepId> = progress
            .iter()
            .filter(|p| p.status == ProgressStatus::Completed)
            .map(|p| &p.step_id)
            .collect();

        let mut extra_orders = HashMap::new();
        for id in done.iter().filter(|id| !order_by_id.contains_key(*id)) {
            if let Some(step) = self.stores.catalog.get_step(id).await? {
                extra_orders.insert((*id).clone(), step.order);
            }
        }

        Ok(completed_orders(done, |id| {
            order_by_id
                .get(*id)
                .copied()
                .or_else(|| extra_orders.get(*id).copied())
        }))
    }
}

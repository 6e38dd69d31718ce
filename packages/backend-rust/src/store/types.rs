use std::fmt;

use chrono::{DateTime, Utc};
use pathway_algo::{Gated, ReviewState, ScheduledReview};
use serde::{Deserialize, Serialize};

use crate::ids::{AttemptId, ItemId, LearnerId, StepId};

// ==================== Step Catalog ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    #[serde(default)]
    pub title: String,
    pub order: u32,
    pub category_id: String,
    /// Minimum score (0-100) that counts as a pass
    #[serde(default = "default_required_score")]
    pub required_score: u8,
    #[serde(default)]
    pub prerequisite_orders: Vec<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_required_score() -> u8 {
    80
}

fn default_active() -> bool {
    true
}

impl Gated for Step {
    fn order(&self) -> u32 {
        self.order
    }

    fn prerequisite_orders(&self) -> &[u32] {
        &self.prerequisite_orders
    }
}

// ==================== Progress ====================

/// Ordered so that `a < b` means `b` is further along; status only ever moves up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Locked,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Locked => "locked",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }

    pub const fn rank(self) -> i64 {
        match self {
            ProgressStatus::Locked => 0,
            ProgressStatus::InProgress => 1,
            ProgressStatus::Completed => 2,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "locked" => Some(ProgressStatus::Locked),
            "in_progress" => Some(ProgressStatus::InProgress),
            "completed" => Some(ProgressStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub learner_id: LearnerId,
    pub step_id: StepId,
    pub status: ProgressStatus,
    /// Last achieved score
    pub score: u8,
    pub attempts_count: u32,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields written only when the upsert creates the record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDefaults {
    pub status: ProgressStatus,
    pub score: u8,
    pub attempts_count: u32,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for ProgressDefaults {
    fn default() -> Self {
        Self {
            status: ProgressStatus::Locked,
            score: 0,
            attempts_count: 0,
            unlocked_at: None,
            completed_at: None,
        }
    }
}

/// Changes applied on every upsert, to a fresh record as well as an existing one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressPatch {
    /// Promote-only: ignored unless it ranks above the stored status
    pub status: Option<ProgressStatus>,
    pub score: Option<u8>,
    pub attempts_delta: u32,
    /// Written only if the record has no unlock timestamp yet
    pub unlocked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpsert {
    pub progress: Progress,
    /// The status rank rose; an insert counts when it lands above `locked`
    pub promoted: bool,
}

impl ProgressPatch {
    /// Mutates `progress` in place and reports whether the status moved up.
    pub fn apply(&self, progress: &mut Progress) -> bool {
        let mut promoted = false;
        if let Some(status) = self.status {
            if status > progress.status {
                progress.status = status;
                promoted = true;
            }
        }
        if let Some(score) = self.score {
            progress.score = score;
        }
        progress.attempts_count = progress.attempts_count.saturating_add(self.attempts_delta);
        if progress.unlocked_at.is_none() {
            progress.unlocked_at = self.unlocked_at;
        }
        if self.completed_at.is_some() {
            progress.completed_at = self.completed_at;
        }
        promoted
    }

    /// The record an upsert creates when no row exists for the key.
    pub fn insert(
        &self,
        learner_id: &LearnerId,
        step_id: &StepId,
        defaults: &ProgressDefaults,
    ) -> ProgressUpsert {
        let mut progress = Progress {
            learner_id: learner_id.clone(),
            step_id: step_id.clone(),
            status: defaults.status,
            score: defaults.score,
            attempts_count: defaults.attempts_count,
            unlocked_at: defaults.unlocked_at,
            completed_at: defaults.completed_at,
        };
        self.apply(&mut progress);
        let promoted = progress.status > ProgressStatus::Locked;
        ProgressUpsert { progress, promoted }
    }
}

// ==================== Attempt Log ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub learner_id: LearnerId,
    pub step_id: StepId,
    pub score: u8,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub started_at: DateTime<Utc>,
    /// `None` while the attempt is open
    pub completed_at: Option<DateTime<Utc>>,
    pub passed: bool,
}

impl Attempt {
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptResult {
    pub score: u8,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub passed: bool,
}

// ==================== Review Items ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub repetitions: u32,
    pub last_reviewed_at: DateTime<Utc>,
    pub next_review_at: DateTime<Utc>,
}

impl ReviewItem {
    pub fn from_schedule(learner_id: &LearnerId, item_id: &ItemId, review: &ScheduledReview) -> Self {
        Self {
            learner_id: learner_id.clone(),
            item_id: item_id.clone(),
            interval_days: review.state.interval_days,
            ease_factor: review.state.ease_factor,
            repetitions: review.state.repetitions,
            last_reviewed_at: review.last_reviewed_at,
            next_review_at: review.next_review_at,
        }
    }

    pub fn state(&self) -> ReviewState {
        ReviewState {
            interval_days: self.interval_days,
            ease_factor: self.ease_factor,
            repetitions: self.repetitions,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: ItemId,
    pub word: String,
    pub translation: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub category_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ids() -> (LearnerId, StepId) {
        (LearnerId::parse("u1").unwrap(), StepId::parse("s1").unwrap())
    }

    #[test]
    fn status_order_is_monotonic() {
        assert!(ProgressStatus::Locked < ProgressStatus::InProgress);
        assert!(ProgressStatus::InProgress < ProgressStatus::Completed);
        for status in [ProgressStatus::Locked, ProgressStatus::InProgress, ProgressStatus::Completed] {
            assert_eq!(ProgressStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn patch_never_demotes() {
        let (learner, step) = ids();
        let mut progress = ProgressPatch {
            status: Some(ProgressStatus::Completed),
            ..Default::default()
        }
        .insert(&learner, &step, &ProgressDefaults::default())
        .progress;

        let promoted = ProgressPatch {
            status: Some(ProgressStatus::InProgress),
            ..Default::default()
        }
        .apply(&mut progress);
        assert!(!promoted);
        assert_eq!(progress.status, ProgressStatus::Completed);
    }

    #[test]
    fn unlocked_at_is_set_once() {
        let (learner, step) = ids();
        let first = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let patch = |at| ProgressPatch {
            status: Some(ProgressStatus::InProgress),
            unlocked_at: Some(at),
            ..Default::default()
        };
        let mut progress = patch(first)
            .insert(&learner, &step, &ProgressDefaults::default())
            .progress;
        patch(later).apply(&mut progress);
        assert_eq!(progress.unlocked_at, Some(first));
    }

    #[test]
    fn insert_combines_defaults_and_patch() {
        let (learner, step) = ids();
        let outcome = ProgressPatch {
            attempts_delta: 1,
            ..Default::default()
        }
        .insert(
            &learner,
            &step,
            &ProgressDefaults {
                status: ProgressStatus::InProgress,
                ..Default::default()
            },
        );
        assert!(outcome.promoted);
        assert_eq!(outcome.progress.attempts_count, 1);
        assert_eq!(outcome.progress.status, ProgressStatus::InProgress);

        let locked = ProgressPatch::default().insert(&learner, &step, &ProgressDefaults::default());
        assert!(!locked.promoted);
    }
}

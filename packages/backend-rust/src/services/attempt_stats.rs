use serde::Serialize;

use super::EngineResult;
use crate::ids::{LearnerId, StepId};
use crate::store::{Attempt, Stores};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStats {
    pub total_attempts: usize,
    pub passed_attempts: usize,
    /// Over closed attempts only
    pub best_score: u8,
    pub average_score: f64,
    pub last_attempt: Option<Attempt>,
}

impl AttemptStats {
    /// `attempts` newest first, as the log returns them.
    pub fn from_attempts(attempts: &[Attempt]) -> Self {
        let closed: Vec<&Attempt> = attempts.iter().filter(|a| !a.is_open()).collect();
        let best_score = closed.iter().map(|a| a.score).max().unwrap_or(0);
        let average_score = if closed.is_empty() {
            0.0
        } else {
            let sum: u32 = closed.iter().map(|a| u32::from(a.score)).sum();
            let avg = f64::from(sum) / closed.len() as f64;
            (avg * 100.0).round() / 100.0
        };

        Self {
            total_attempts: attempts.len(),
            passed_attempts: closed.iter().filter(|a| a.passed).count(),
            best_score,
            average_score,
            last_attempt: attempts.first().cloned(),
        }
    }
}

#[derive(Clone)]
pub struct AttemptService {
    stores: Stores,
}

impl AttemptService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn list_attempts(&self, learner_raw: &str, step_raw: &str) -> EngineResult<Vec<Attempt>> {
        let learner = LearnerId::parse(learner_raw)?;
        let step = StepId::parse(step_raw)?;
        Ok(self.stores.attempts.list(&learner, &step).await?)
    }

    pub async fn attempt_stats(&self, learner_raw: &str, step_raw: &str) -> EngineResult<AttemptStats> {
        let attempts = self.list_attempts(learner_raw, step_raw).await?;
        Ok(AttemptStats::from_attempts(&attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AttemptId;
    use chrono::{Duration, TimeZone, Utc};

    fn attempt(score: u8, passed: bool, open: bool, minutes: i64) -> Attempt {
        let started = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap() + Duration::minutes(minutes);
        Attempt {
            id: AttemptId::generate(),
            learner_id: LearnerId::parse("u1").unwrap(),
            step_id: StepId::parse("s1").unwrap(),
            score,
            total_questions: 10,
            correct_answers: u32::from(score / 10),
            started_at: started,
            completed_at: (!open).then_some(started),
            passed,
        }
    }

    #[test]
    fn stats_ignore_open_attempts_for_scores() {
        let attempts = vec![
            attempt(0, false, true, 3),
            attempt(90, true, false, 2),
            attempt(60, false, false, 1),
        ];
        let stats = AttemptStats::from_attempts(&attempts);
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.passed_attempts, 1);
        assert_eq!(stats.best_score, 90);
        assert!((stats.average_score - 75.0).abs() < f64::EPSILON);
        assert!(stats.last_attempt.unwrap().is_open());
    }

    #[test]
    fn empty_log_has_zeroed_stats() {
        let stats = AttemptStats::from_attempts(&[]);
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.best_score, 0);
        assert!(stats.last_attempt.is_none());
    }
}

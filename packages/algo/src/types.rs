//! Common Types and Constants
//!
//! Shared value types used by the unlock resolver, the review scheduler and
//! catalog validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Ease factor assigned to an item that has never been reviewed
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound for the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Lowest grade that counts as a successful recall
pub const PASSING_GRADE: u8 = 3;

/// Interval after the first successful review (days)
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second successful review (days)
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Upper bound for a grown interval (days)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Offset used for `Rating::Hard` instead of the day-scale interval
pub const HARD_RETRY_OFFSET_SECS: i64 = 60;

// ==================== Review Types ====================

/// Qualitative recall rating submitted by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// SM-2 quality grade (0-5 scale)
    pub const fn grade(self) -> u8 {
        match self {
            Rating::Again => 0,
            Rating::Hard => 3,
            Rating::Good => 4,
            Rating::Easy => 5,
        }
    }

    pub const fn is_pass(self) -> bool {
        self.grade() >= PASSING_GRADE
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRating(pub String);

impl fmt::Display for UnknownRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rating '{}', expected again|hard|good|easy", self.0)
    }
}

impl std::error::Error for UnknownRating {}

impl FromStr for Rating {
    type Err = UnknownRating;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Rating::Again),
            "hard" => Ok(Rating::Hard),
            "good" => Ok(Rating::Good),
            "easy" => Ok(Rating::Easy),
            other => Err(UnknownRating(other.to_string())),
        }
    }
}

/// Memory-strength state of one learner/item pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Current interval in whole days
    pub interval_days: u32,
    pub ease_factor: f64,
    /// Consecutive successful reviews
    pub repetitions: u32,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            interval_days: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            repetitions: 0,
        }
    }
}

/// Output of one scheduling step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReview {
    pub state: ReviewState,
    pub last_reviewed_at: DateTime<Utc>,
    pub next_review_at: DateTime<Utc>,
}

// ==================== Curriculum Types ====================

/// A catalog entry that participates in the prerequisite graph.
///
/// Prerequisites reference other entries by their `order`, never by id.
pub trait Gated {
    fn order(&self) -> u32;
    fn prerequisite_orders(&self) -> &[u32];
}

/// Minimal owned node, handy for tests and validation tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNode {
    pub order: u32,
    #[serde(default)]
    pub prerequisites: Vec<u32>,
}

impl StepNode {
    pub fn new(order: u32, prerequisites: impl Into<Vec<u32>>) -> Self {
        Self {
            order,
            prerequisites: prerequisites.into(),
        }
    }
}

impl Gated for StepNode {
    fn order(&self) -> u32 {
        self.order
    }

    fn prerequisite_orders(&self) -> &[u32] {
        &self.prerequisites
    }
}

impl<T: Gated + ?Sized> Gated for &T {
    fn order(&self) -> u32 {
        (**self).order()
    }

    fn prerequisite_orders(&self) -> &[u32] {
        (**self).prerequisite_orders()
    }
}

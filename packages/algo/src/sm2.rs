//! SM-2 Review Scheduler
//!
//! Maps a prior review state and a qualitative rating to the next state and
//! due date. Intervals are whole days.
//!
//! `Rating::Hard` keeps the SM-2 state update but schedules the next review
//! one minute out instead of `interval` days.

use chrono::{DateTime, Duration, Utc};

use crate::types::{
    Rating, ReviewState, ScheduledReview, FIRST_INTERVAL_DAYS, HARD_RETRY_OFFSET_SECS,
    MAX_INTERVAL_DAYS, MIN_EASE_FACTOR, SECOND_INTERVAL_DAYS,
};

/// Runs one SM-2 step. `prior = None` means the item was never reviewed.
pub fn schedule(prior: Option<&ReviewState>, rating: Rating, now: DateTime<Utc>) -> ScheduledReview {
    let prior = prior.copied().unwrap_or_default();
    let state = next_state(&prior, rating);

    let offset = if rating == Rating::Hard {
        Duration::seconds(HARD_RETRY_OFFSET_SECS)
    } else {
        Duration::days(i64::from(state.interval_days))
    };

    ScheduledReview {
        state,
        last_reviewed_at: now,
        next_review_at: now
            .checked_add_signed(offset)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

/// State transition without the timing part
pub fn next_state(prior: &ReviewState, rating: Rating) -> ReviewState {
    if !rating.is_pass() {
        return ReviewState {
            interval_days: FIRST_INTERVAL_DAYS,
            ease_factor: sanitize_ease(prior.ease_factor),
            repetitions: 0,
        };
    }

    let interval_days = match prior.repetitions {
        0 => FIRST_INTERVAL_DAYS,
        1 => SECOND_INTERVAL_DAYS,
        _ => grow_interval(prior.interval_days, prior.ease_factor),
    };

    ReviewState {
        interval_days,
        ease_factor: next_ease(prior.ease_factor, rating.grade()),
        repetitions: prior.repetitions.saturating_add(1),
    }
}

/// EF' = max(1.3, EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)))
pub fn next_ease(ease_factor: f64, grade: u8) -> f64 {
    let miss = f64::from(5u8.saturating_sub(grade));
    let adjusted = sanitize_ease(ease_factor) + (0.1 - miss * (0.08 + miss * 0.02));
    adjusted.max(MIN_EASE_FACTOR)
}

fn grow_interval(interval_days: u32, ease_factor: f64) -> u32 {
    let grown = (f64::from(interval_days) * sanitize_ease(ease_factor)).round();
    // A stored zero interval with repetitions >= 2 only comes from damaged data.
    (grown as u32).clamp(FIRST_INTERVAL_DAYS, MAX_INTERVAL_DAYS)
}

fn sanitize_ease(ease_factor: f64) -> f64 {
    if ease_factor.is_finite() {
        ease_factor.max(MIN_EASE_FACTOR)
    } else {
        MIN_EASE_FACTOR
    }
}

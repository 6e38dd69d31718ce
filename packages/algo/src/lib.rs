//! # pathway-algo - curriculum progression algorithms
//!
//! Pure Rust, I/O-free building blocks for the progression engine:
//!
//! - **Unlock Resolver** - prerequisite gating over step `order` values
//! - **SM-2 Scheduler** - next review date from a recall rating
//! - **Catalog Validation** - duplicate orders, dangling references, cycles
//! - **Seeded Sampling** - reproducible selection without replacement
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashSet;
//! use pathway_algo::{is_unlocked, schedule, Rating, StepNode};
//!
//! let step = StepNode::new(2, vec![1]);
//! let completed: HashSet<u32> = [1].into_iter().collect();
//! assert!(is_unlocked(&step, &completed));
//!
//! let review = schedule(None, Rating::Good, chrono::Utc::now());
//! assert_eq!(review.state.interval_days, 1);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod catalog;
pub mod sampling;
pub mod sm2;
pub mod types;
pub mod unlock;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use catalog::{validate_catalog, CatalogIssue};
pub use sampling::sample_without_replacement;
pub use sm2::{next_ease, next_state, schedule};
pub use unlock::{completed_orders, is_unlocked, satisfied_gated_steps};

//! Seeded Sampling
//!
//! Selection without replacement driven by an explicit seed, so that callers
//! can reproduce a batch in tests instead of depending on global randomness.

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Picks up to `amount` distinct elements from `pool`.
///
/// The same `(pool, amount, seed)` always yields the same selection.
pub fn sample_without_replacement<T: Clone>(pool: &[T], amount: usize, seed: u64) -> Vec<T> {
    let amount = amount.min(pool.len());
    if amount == 0 {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    index::sample(&mut rng, pool.len(), amount)
        .into_iter()
        .map(|idx| pool[idx].clone())
        .collect()
}

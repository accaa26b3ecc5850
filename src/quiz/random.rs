//! Injectable random source
//!
//! Recommendation sampling goes through this trait so tests can pin the
//! selection.

use rand::seq::index::sample;

/// Source of index samples for recommendation selection
pub trait RandomSource: Send {
    /// Choose `count` distinct indices from `0..len`, uniformly and without
    /// replacement; returns fewer when `len < count`
    fn sample_indices(&mut self, len: usize, count: usize) -> Vec<usize>;
}

/// The default source backed by the thread-local RNG
#[derive(Debug, Default)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn sample_indices(&mut self, len: usize, count: usize) -> Vec<usize> {
        let mut rng = rand::thread_rng();
        sample(&mut rng, len, count.min(len)).into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_distinct_and_in_range() {
        let mut source = ThreadRngSource;
        for _ in 0..50 {
            let picked = source.sample_indices(5, 2);
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
            assert!(picked.iter().all(|&i| i < 5));
        }
    }

    #[test]
    fn test_sample_caps_at_len() {
        let mut source = ThreadRngSource;
        let picked = source.sample_indices(1, 2);
        assert_eq!(picked, vec![0]);
    }
}

//! Synthetic value generator
//!
//! Stands in for a real telemetry source: a single bounded counter that
//! advances by one on every read and wraps back to zero once it passes
//! its ceiling.

use tokio::sync::Mutex;

/// Default ceiling of the synthetic counter
pub const DEFAULT_MAX_VALUE: i64 = 30;

/// Bounded, wrapping counter shared by all resolutions of one provider
#[derive(Debug)]
pub struct SyntheticGenerator {
    count: Mutex<i64>,
    max: i64,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self::with_max(DEFAULT_MAX_VALUE)
    }

    pub fn with_max(max: i64) -> Self {
        Self {
            count: Mutex::new(0),
            max,
        }
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    /// Advance the counter and return the new value.
    ///
    /// The series is `1, 2, ..., max, 0, 1, ...`: the reset to zero happens
    /// only once the incremented value exceeds `max`, and zero is returned.
    pub async fn next_value(&self) -> i64 {
        let mut count = self.count.lock().await;
        *count += 1;
        if *count > self.max {
            *count = 0;
        }
        *count
    }

    /// Current value without advancing
    pub async fn current(&self) -> i64 {
        *self.count.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sequence_wraps_after_max() {
        let generator = SyntheticGenerator::new();

        let mut values = Vec::new();
        for _ in 0..=DEFAULT_MAX_VALUE {
            values.push(generator.next_value().await);
        }

        let mut expected: Vec<i64> = (1..=DEFAULT_MAX_VALUE).collect();
        expected.push(0);
        assert_eq!(values, expected);

        // Period is max + 1
        assert_eq!(generator.next_value().await, 1);
    }

    #[tokio::test]
    async fn test_starts_at_zero() {
        let generator = SyntheticGenerator::new();
        assert_eq!(generator.current().await, 0);
        assert_eq!(generator.max(), 30);
    }

    #[tokio::test]
    async fn test_custom_max() {
        let generator = SyntheticGenerator::with_max(2);
        let mut values = Vec::new();
        for _ in 0..6 {
            values.push(generator.next_value().await);
        }
        assert_eq!(values, vec![1, 2, 0, 1, 2, 0]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let generator = Arc::new(SyntheticGenerator::new());

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let generator = generator.clone();
                tokio::spawn(async move { generator.next_value().await })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            seen.insert(handle.await.unwrap());
        }

        let expected: HashSet<i64> = (1..=25).collect();
        assert_eq!(seen, expected);
        assert_eq!(generator.current().await, 25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_wrap_without_lost_updates() {
        let generator = Arc::new(SyntheticGenerator::new());
        let period = DEFAULT_MAX_VALUE + 1;

        let handles: Vec<_> = (0..2 * period)
            .map(|_| {
                let generator = generator.clone();
                tokio::spawn(async move { generator.next_value().await })
            })
            .collect();

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for handle in handles {
            *counts.entry(handle.await.unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), period as usize);
        for value in 0..=DEFAULT_MAX_VALUE {
            assert_eq!(counts.get(&value), Some(&2), "value {value}");
        }
        assert_eq!(generator.current().await, 0);
    }
}

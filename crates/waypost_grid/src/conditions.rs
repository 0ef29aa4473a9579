//! # Network Conditions
//!
//! Latency presets for reply delivery.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Network conditions for simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// Base latency in milliseconds.
    pub base_latency_ms: u32,
    /// Jitter (variance) in milliseconds.
    pub jitter_ms: u32,
    /// Reply loss percentage (0-100).
    pub reply_loss_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        base_latency_ms: 1,
        jitter_ms: 0,
        reply_loss_percent: 0,
    };

    /// Good network conditions (fiber).
    pub const GOOD: Self = Self {
        base_latency_ms: 20,
        jitter_ms: 5,
        reply_loss_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        base_latency_ms: 50,
        jitter_ms: 20,
        reply_loss_percent: 1,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        base_latency_ms: 100,
        jitter_ms: 50,
        reply_loss_percent: 5,
    };

    /// Looks up a preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "perfect" => Some(Self::PERFECT),
            "good" => Some(Self::GOOD),
            "average" => Some(Self::AVERAGE),
            "poor" => Some(Self::POOR),
            _ => None,
        }
    }

    /// Generates a latency value with jitter.
    #[must_use]
    pub fn generate_latency(&self, rng_value: u32) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            i64::from(rng_value % (self.jitter_ms * 2)) - i64::from(self.jitter_ms)
        } else {
            0
        };
        let latency = (i64::from(self.base_latency_ms) + jitter).max(0);
        Duration::from_millis(latency.unsigned_abs())
    }

    /// Returns true if the reply should be lost.
    #[must_use]
    pub fn should_drop(&self, rng_value: u32) -> bool {
        (rng_value % 100) < u32::from(self.reply_loss_percent)
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::PERFECT
    }
}

/// Seeded source of per-reply latency and loss decisions.
#[derive(Debug)]
pub struct Jitter {
    conditions: NetworkConditions,
    rng: StdRng,
}

impl Jitter {
    /// Creates a deterministic source for `conditions`.
    #[must_use]
    pub fn new(conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            conditions,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Conditions in effect.
    #[must_use]
    pub fn conditions(&self) -> &NetworkConditions {
        &self.conditions
    }

    /// Latency for the next reply, or `None` if it is lost.
    pub fn next_delivery(&mut self) -> Option<Duration> {
        if self.conditions.should_drop(self.rng.gen()) {
            return None;
        }
        Some(self.conditions.generate_latency(self.rng.gen()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_stays_in_jitter_band() {
        let conditions = NetworkConditions::GOOD;
        for value in [0, 1, 7, 9, 10, 1000] {
            let latency = conditions.generate_latency(value);
            assert!(latency >= Duration::from_millis(15));
            assert!(latency < Duration::from_millis(25));
        }
    }

    #[test]
    fn test_perfect_never_drops() {
        let mut jitter = Jitter::new(NetworkConditions::PERFECT, 7);
        for _ in 0..1000 {
            assert_eq!(jitter.next_delivery(), Some(Duration::from_millis(1)));
        }
    }

    #[test]
    fn test_seeded_jitter_is_deterministic() {
        let mut a = Jitter::new(NetworkConditions::POOR, 42);
        let mut b = Jitter::new(NetworkConditions::POOR, 42);
        for _ in 0..100 {
            assert_eq!(a.next_delivery(), b.next_delivery());
        }
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(NetworkConditions::preset("Average"), Some(NetworkConditions::AVERAGE));
        assert!(NetworkConditions::preset("satellite").is_none());
    }
}

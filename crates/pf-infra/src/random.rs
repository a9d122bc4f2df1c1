use std::sync::{Mutex, PoisonError};

use pf_core::ports::RandomSourcePort;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Thread-local generator; what the binary uses.
pub struct ThreadRandomSource;

impl RandomSourcePort for ThreadRandomSource {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Reproducible sequence for demos and soak runs.
pub struct SeededRandomSource {
    rng: Mutex<StdRng>,
}

impl SeededRandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSourcePort for SeededRandomSource {
    fn next_f64(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_unit_interval() {
        let source = ThreadRandomSource;
        for _ in 0..1000 {
            let sample = source.next_f64();
            assert!((0.0..1.0).contains(&sample));
        }
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let a = SeededRandomSource::new(42);
        let b = SeededRandomSource::new(42);
        let left: Vec<f64> = (0..16).map(|_| a.next_f64()).collect();
        let right: Vec<f64> = (0..16).map(|_| b.next_f64()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn chance_converges_to_probability() {
        let source = SeededRandomSource::new(7);
        let hits = (0..10_000).filter(|_| source.chance(0.1)).count();
        assert!((800..1200).contains(&hits), "hits = {hits}");
    }
}

/// Source of uniform randomness for the simulations.
pub trait RandomSourcePort: Send + Sync {
    /// Uniform sample in `[0, 1)`.
    fn next_f64(&self) -> f64;

    /// Uniform sample in `[0, max)`.
    fn uniform(&self, max: f64) -> f64 {
        self.next_f64() * max
    }

    /// `true` with probability `p`.
    fn chance(&self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Index in `0..len`; `len` must be non-zero.
    fn pick_index(&self, len: usize) -> usize {
        ((self.next_f64() * len as f64) as usize).min(len.saturating_sub(1))
    }
}

//! Random sources for list shuffling

/// Source of uniform indices
pub trait RandomIndex {
    /// An index in `0..bound`, `bound` is never zero
    fn index(&mut self, bound: usize) -> usize;
}

/// SplitMix64 golden ratio constant
const GOLDEN: u64 = 0x9e3779b97f4a7c15;

/// Small seeded generator, reproducible across platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        SplitMix64 { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// Float in `[0, 1)` from the top 53 bits
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl RandomIndex for SplitMix64 {
    fn index(&mut self, bound: usize) -> usize {
        ((self.next_f64() * bound as f64) as usize).min(bound.saturating_sub(1))
    }
}
